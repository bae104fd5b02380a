//! # Seed Data Generator
//!
//! Populates the database with sample clients, products and orders for
//! development.
//!
//! ## Usage
//! ```bash
//! # Seed 20 clients and 20 products (default)
//! cargo run -p orderdesk-db --bin seed
//!
//! # Seed a custom amount
//! cargo run -p orderdesk-db --bin seed -- --count 50
//!
//! # Specify database path
//! cargo run -p orderdesk-db --bin seed -- --db ./data/orderdesk.db
//! ```
//!
//! ## Generated Data
//! - Clients with distinct names, emails and addresses
//! - Products with a price of $1.99 - $9.99 and stock of 5 - 54
//! - One order per client for the first few clients, each with its bill
//!
//! Placing an order goes through the same steps a desk would: take the
//! stock, write the order, then write the bill.

use std::env;

use chrono::Utc;
use orderdesk_core::{Bill, Client, Order, Product};
use orderdesk_db::{Database, DbConfig, DbError, EntityDao};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const FIRST_NAMES: &[&str] = &[
    "Ada", "Grace", "Alan", "Edsger", "Barbara", "Donald", "Frances", "John", "Margaret", "Ken",
];

const LAST_NAMES: &[&str] = &[
    "Lovelace", "Hopper", "Turing", "Dijkstra", "Liskov", "Knuth", "Allen", "Backus", "Hamilton",
    "Thompson",
];

const STREETS: &[&str] = &["Analytical St", "Compiler Ave", "Lambda Rd", "Kernel Way", "Heap Ln"];

const ITEMS: &[&str] = &[
    "Widget", "Gadget", "Sprocket", "Gizmo", "Flange", "Bracket", "Hinge", "Spindle", "Valve",
    "Gasket",
];

const FINISHES: &[&str] = &["Steel", "Brass"];

/// Orders placed on a fresh database.
const ORDERS_TO_PLACE: usize = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 20;
    let mut db_path = String::from("./orderdesk_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(20);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("OrderDesk Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Clients and products to generate (default: 20)");
                println!("  -d, --db <PATH>    Database file path (default: ./orderdesk_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 OrderDesk Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!("Count:    {}", count);
    println!();

    // Connecting creates every table and guard
    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Schema ready");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating data...");
    let start = std::time::Instant::now();

    let clients: Vec<Client> = (0..count).map(generate_client).collect();
    let products: Vec<Product> = (0..count).map(generate_product).collect();

    let inserted = db.clients().insert_batch(&clients).await?;
    println!("  Inserted {} clients", inserted);

    let inserted = db.products().insert_batch(&products).await?;
    println!("  Inserted {} products", inserted);

    // Batch inserts do not report keys, so read them back
    let clients = db.clients().find_all().await?;
    let products = db.products().find_all().await?;

    let mut placed = 0;
    for (client, product) in clients.iter().zip(products.iter()).take(ORDERS_TO_PLACE) {
        let (Some(client_id), Some(product_id)) = (client.id, product.id) else {
            continue;
        };
        let quantity = (placed % 3 + 1) as i64;

        match place_order(&db, client_id, product_id, product.price, quantity).await {
            Ok(order_id) => {
                info!(order_id, client = %client.full_name(), "Order placed");
                placed += 1;
            }
            Err(e) if e.is_constraint_violation() => {
                warn!(product = %product.name, error = %e, "Order skipped");
            }
            Err(e) => return Err(e.into()),
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Placed {} orders in {:?}", placed, elapsed);

    // Verify the joined listing
    println!();
    println!("Orders:");
    for details in db.orders().detailed_orders().await? {
        println!(
            "  #{} {} bought {} x {} for ${:.2}",
            details.order_id,
            details.client_name,
            details.quantity,
            details.product_name,
            details.total_price
        );
    }

    if let Some(last) = db.orders().last_id().await? {
        let bill = db.bills().find_by_order_id(last).await?;
        println!();
        println!(
            "  Last order: #{} (billed: {})",
            last,
            bill.map(|b| format!("${:.2}", b.amount))
                .unwrap_or_else(|| "no".to_string())
        );
    }

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

/// Initializes logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show every statement the DAOs run
/// - Default: INFO level, sqlx at WARN
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Takes the stock, then writes the order and its bill.
async fn place_order(
    db: &Database,
    client_id: i64,
    product_id: i64,
    price: f64,
    quantity: i64,
) -> Result<i64, DbError> {
    db.products().decrease_stock(product_id, quantity).await?;

    let now = Utc::now();
    let total_price = price * quantity as f64;

    let order_id = db
        .orders()
        .insert(&Order {
            id: None,
            client_id,
            product_id,
            quantity,
            total_price,
            order_date: now,
        })
        .await?;

    db.bills()
        .insert(&Bill {
            id: None,
            order_id,
            amount: total_price,
            timestamp: now,
        })
        .await?;

    Ok(order_id)
}

/// Generates a single client with distinct contact details.
fn generate_client(seed: usize) -> Client {
    let first_name = FIRST_NAMES[seed % FIRST_NAMES.len()];
    let last_name = LAST_NAMES[(seed / FIRST_NAMES.len() + seed) % LAST_NAMES.len()];

    Client {
        id: None,
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: format!(
            "{}.{}{}@example.com",
            first_name.to_lowercase(),
            last_name.to_lowercase(),
            seed
        ),
        address: format!("{} {}", seed + 1, STREETS[seed % STREETS.len()]),
    }
}

/// Generates a single product with a price and stock level.
fn generate_product(seed: usize) -> Product {
    let item = ITEMS[seed % ITEMS.len()];
    let finish = FINISHES[(seed / ITEMS.len()) % FINISHES.len()];

    // $1.99 - $9.99
    let price_cents = 199 + ((seed * 17) % 801) as i64;

    Product {
        id: None,
        name: format!("{} {} #{:03}", finish, item, seed),
        price: price_cents as f64 / 100.0,
        stock: 5 + (seed % 50) as i64,
    }
}
