//! # Domain Entities
//!
//! The four persisted entity types and the read-only order projection.
//!
//! ## Tables
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   clients ◄──────── orders ────────► products                           │
//! │   (id ★)          client_id FK       (id ★)                             │
//! │                   product_id FK                                         │
//! │                       ▲                                                 │
//! │                       │ order_id (no FK)                                │
//! │                     bills  ← every column immutable, append-only        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Keys are `Option<i64>`: `None` before insert, `Some` once the store has
//! generated one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MappingError;
use crate::metadata::{ColumnDescriptor, Declaration, Entity};
use crate::value::{Record, ValueKind};

// =============================================================================
// Product
// =============================================================================

/// A sellable item with a stock level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Option<i64>,
    pub name: String,
    pub price: f64,
    pub stock: i64,
}

impl Entity for Product {
    fn declare() -> Declaration<Self> {
        Declaration::<Self>::new()
            .table("products")
            .column(key_column(), |p| p.id.into())
            .column(ColumnDescriptor::new("name", "VARCHAR(300)").not_null(), |p| {
                p.name.clone().into()
            })
            .column(ColumnDescriptor::new("price", "DOUBLE PRECISION").not_null(), |p| {
                p.price.into()
            })
            .column(ColumnDescriptor::new("stock", "INTEGER").not_null(), |p| {
                p.stock.into()
            })
    }

    fn from_record(record: &Record) -> Result<Self, MappingError> {
        Ok(Product {
            id: record.get("id")?,
            name: record.get("name")?,
            price: record.get("price")?,
            stock: record.get("stock")?,
        })
    }
}

// =============================================================================
// Client
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: Option<i64>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub address: String,
}

impl Client {
    /// "First Last", as shown in order listings.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Entity for Client {
    fn declare() -> Declaration<Self> {
        Declaration::<Self>::new()
            .table("clients")
            .column(key_column(), |c| c.id.into())
            .column(ColumnDescriptor::new("first_name", "VARCHAR(100)").not_null(), |c| {
                c.first_name.clone().into()
            })
            .column(ColumnDescriptor::new("last_name", "VARCHAR(100)").not_null(), |c| {
                c.last_name.clone().into()
            })
            .column(ColumnDescriptor::new("email", "VARCHAR(150)").not_null(), |c| {
                c.email.clone().into()
            })
            .column(ColumnDescriptor::new("address", "VARCHAR(300)").not_null(), |c| {
                c.address.clone().into()
            })
    }

    fn from_record(record: &Record) -> Result<Self, MappingError> {
        Ok(Client {
            id: record.get("id")?,
            first_name: record.get("first_name")?,
            last_name: record.get("last_name")?,
            email: record.get("email")?,
            address: record.get("address")?,
        })
    }
}

// =============================================================================
// Order
// =============================================================================

/// One client buying a quantity of one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Option<i64>,
    pub client_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub total_price: f64,
    pub order_date: DateTime<Utc>,
}

impl Entity for Order {
    fn declare() -> Declaration<Self> {
        Declaration::<Self>::new()
            .table("orders")
            .column(key_column(), |o| o.id.into())
            .column(
                ColumnDescriptor::new("client_id", "INT")
                    .not_null()
                    .references("clients", "id"),
                |o| o.client_id.into(),
            )
            .column(
                ColumnDescriptor::new("product_id", "INT")
                    .not_null()
                    .references("products", "id"),
                |o| o.product_id.into(),
            )
            .column(ColumnDescriptor::new("quantity", "INT").not_null(), |o| {
                o.quantity.into()
            })
            .column(
                ColumnDescriptor::new("total_price", "DOUBLE PRECISION").not_null(),
                |o| o.total_price.into(),
            )
            .column(ColumnDescriptor::new("order_date", "TIMESTAMP").not_null(), |o| {
                o.order_date.into()
            })
    }

    fn from_record(record: &Record) -> Result<Self, MappingError> {
        Ok(Order {
            id: record.get("id")?,
            client_id: record.get("client_id")?,
            product_id: record.get("product_id")?,
            quantity: record.get("quantity")?,
            total_price: record.get("total_price")?,
            order_date: record.get("order_date")?,
        })
    }
}

// =============================================================================
// Bill
// =============================================================================

/// Append-only receipt for an order. No column may change once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: Option<i64>,
    pub order_id: i64,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
}

impl Entity for Bill {
    fn declare() -> Declaration<Self> {
        Declaration::<Self>::new()
            .table("bills")
            .column(key_column(), |b| b.id.into())
            .column(
                ColumnDescriptor::new("order_id", "INT").not_null().immutable(),
                |b| b.order_id.into(),
            )
            .column(
                ColumnDescriptor::new("amount", "DOUBLE PRECISION")
                    .not_null()
                    .immutable(),
                |b| b.amount.into(),
            )
            .column(
                ColumnDescriptor::new("timestamp", "TIMESTAMP")
                    .not_null()
                    .immutable(),
                |b| b.timestamp.into(),
            )
    }

    fn from_record(record: &Record) -> Result<Self, MappingError> {
        Ok(Bill {
            id: record.get("id")?,
            order_id: record.get("order_id")?,
            amount: record.get("amount")?,
            timestamp: record.get("timestamp")?,
        })
    }
}

// =============================================================================
// Order Details (projection)
// =============================================================================

/// Joined, read-only view of an order. Not an entity: it has no table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub order_id: i64,
    pub client_name: String,
    pub product_name: String,
    pub quantity: i64,
    pub total_price: f64,
    pub order_date: DateTime<Utc>,
}

impl OrderDetails {
    /// Columns the join query must produce, with the kind each decodes as.
    pub const COLUMNS: [(&'static str, ValueKind); 6] = [
        ("order_id", ValueKind::Integer),
        ("client_name", ValueKind::Text),
        ("product_name", ValueKind::Text),
        ("quantity", ValueKind::Integer),
        ("total_price", ValueKind::Real),
        ("order_date", ValueKind::Timestamp),
    ];

    pub fn from_record(record: &Record) -> Result<Self, MappingError> {
        Ok(OrderDetails {
            order_id: record.get("order_id")?,
            client_name: record.get("client_name")?,
            product_name: record.get("product_name")?,
            quantity: record.get("quantity")?,
            total_price: record.get("total_price")?,
            order_date: record.get("order_date")?,
        })
    }
}

/// Every entity keys on an integer `id` that is never rewritten.
fn key_column() -> ColumnDescriptor {
    ColumnDescriptor::new("id", "INTEGER")
        .primary_key()
        .not_null()
        .immutable()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_all_entities_describe() {
        assert_eq!(Product::descriptor().unwrap().table_name(), "products");
        assert_eq!(Client::descriptor().unwrap().table_name(), "clients");
        assert_eq!(Order::descriptor().unwrap().table_name(), "orders");
        assert_eq!(Bill::descriptor().unwrap().table_name(), "bills");

        for key in [
            Product::descriptor().unwrap().primary_key().name(),
            Client::descriptor().unwrap().primary_key().name(),
            Order::descriptor().unwrap().primary_key().name(),
            Bill::descriptor().unwrap().primary_key().name(),
        ] {
            assert_eq!(key, "id");
        }
    }

    #[test]
    fn test_bill_guards_every_non_key_column() {
        let descriptor = Bill::descriptor().unwrap();
        let guarded: Vec<_> = descriptor.guarded_columns().map(|c| c.name()).collect();

        assert_eq!(guarded, vec!["order_id", "amount", "timestamp"]);
        // Key is immutable by construction and never guarded
        assert!(Product::descriptor().unwrap().guarded_columns().next().is_none());
    }

    #[test]
    fn test_column_kinds() {
        let descriptor = Order::descriptor().unwrap();

        assert_eq!(descriptor.column("quantity").unwrap().column.kind(), ValueKind::Integer);
        assert_eq!(descriptor.column("total_price").unwrap().column.kind(), ValueKind::Real);
        assert_eq!(
            descriptor.column("order_date").unwrap().column.kind(),
            ValueKind::Timestamp
        );
    }

    #[test]
    fn test_order_details_from_record() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let record = Record::new()
            .with("order_id", 1_i64)
            .with("client_name", "Ada Lovelace")
            .with("product_name", "Widget")
            .with("quantity", 2_i64)
            .with("total_price", 19.98)
            .with("order_date", at);

        let details = OrderDetails::from_record(&record).unwrap();

        assert_eq!(details.client_name, "Ada Lovelace");
        assert_eq!(details.order_date, at);
    }

    #[test]
    fn test_full_name() {
        let client = Client {
            id: None,
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            address: "12 Analytical St".to_string(),
        };

        assert_eq!(client.full_name(), "Ada Lovelace");
    }
}
