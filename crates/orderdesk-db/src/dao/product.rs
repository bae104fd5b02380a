//! # Product DAO
//!
//! Generic CRUD plus the stock decrement used when an order is placed.
//!
//! ## Stock Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    UPDATE products SET stock = stock - ?                                │
//! │     WHERE id = ? AND stock >= ?                                         │
//! │     RETURNING stock                                                     │
//! │       │                                                                 │
//! │       ├── row returned ──► COMMIT, Ok(remaining)                        │
//! │       │                                                                 │
//! │       └── no row ──► SELECT stock WHERE id = ?                          │
//! │                        ├── none  ──► ROLLBACK, NotFound                 │
//! │                        └── some  ──► ROLLBACK, ConstraintViolation      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The guarded UPDATE checks and decrements in one statement, so two
//! concurrent orders can never both take the last unit.

use std::sync::Arc;

use async_trait::async_trait;
use orderdesk_core::Product;
use sqlx::{Connection, SqliteConnection};
use tracing::{debug, info};

use super::{failed, finish, Dao, EntityDao};
use crate::error::{DbError, DbResult};
use crate::provider::ConnectionProvider;

const DECREASE_STOCK_SQL: &str =
    "UPDATE products SET stock = stock - ? WHERE id = ? AND stock >= ? RETURNING stock";

const STOCK_SQL: &str = "SELECT stock FROM products WHERE id = ?";

/// DAO for [`Product`].
///
/// ## Usage
/// ```rust,ignore
/// let products = db.products();
/// let id = products.insert(&widget).await?;
/// let remaining = products.decrease_stock(id, 3).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductDao {
    dao: Dao<Product>,
}

impl ProductDao {
    pub fn new(provider: Arc<dyn ConnectionProvider>) -> Self {
        ProductDao {
            dao: Dao::new(provider),
        }
    }

    /// Takes `quantity` units out of a product's stock.
    ///
    /// ## Arguments
    /// * `id` - Product key
    /// * `quantity` - Units to remove, must be positive
    ///
    /// ## Returns
    /// * `Ok(i64)` - Stock left afterwards
    /// * `Err(DbError::NotFound)` - No such product
    /// * `Err(DbError::ConstraintViolation)` - Not enough stock, or a
    ///   non-positive quantity; stock is unchanged
    pub async fn decrease_stock(&self, id: i64, quantity: i64) -> DbResult<i64> {
        if quantity <= 0 {
            return Err(DbError::ConstraintViolation(format!(
                "quantity must be positive, got {quantity}"
            )));
        }

        debug!(id, quantity, "Decreasing stock");

        let mut conn = self.dao.provider().acquire().await?;
        let mut tx = conn.begin().await?;

        let outcome = take_stock(&mut tx, id, quantity).await;

        let remaining = finish(tx, outcome, "products").await?;
        info!(id, quantity, remaining, "Stock decreased");
        Ok(remaining)
    }
}

/// Guarded decrement on an open transaction. Leaves stock untouched on error.
async fn take_stock(conn: &mut SqliteConnection, id: i64, quantity: i64) -> DbResult<i64> {
    let remaining = sqlx::query_scalar::<_, i64>(DECREASE_STOCK_SQL)
        .bind(quantity)
        .bind(id)
        .bind(quantity)
        .fetch_optional(&mut *conn)
        .await
        .map_err(failed("products", "decrease_stock"))?;

    if let Some(remaining) = remaining {
        return Ok(remaining);
    }

    let stock = sqlx::query_scalar::<_, i64>(STOCK_SQL)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(failed("products", "decrease_stock"))?;

    match stock {
        None => Err(DbError::not_found("Product", id)),
        Some(available) => Err(DbError::ConstraintViolation(format!(
            "not enough stock for product {id}: requested {quantity}, available {available}"
        ))),
    }
}

#[async_trait]
impl EntityDao<Product> for ProductDao {
    fn dao(&self) -> &Dao<Product> {
        &self.dao
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::tests::test_db;

    fn widget() -> Product {
        Product {
            id: None,
            name: "Widget".to_string(),
            price: 9.99,
            stock: 10,
        }
    }

    #[tokio::test]
    async fn test_decrease_stock_scenario() {
        let db = test_db().await;
        let products = db.products();
        let id = products.insert(&widget()).await.unwrap();

        assert_eq!(products.decrease_stock(id, 3).await.unwrap(), 7);

        let err = products.decrease_stock(id, 20).await.unwrap_err();
        assert!(matches!(err, DbError::ConstraintViolation(_)));

        let stored = products.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.stock, 7);
    }

    #[tokio::test]
    async fn test_decrease_stock_to_zero() {
        let db = test_db().await;
        let products = db.products();
        let id = products.insert(&widget()).await.unwrap();

        assert_eq!(products.decrease_stock(id, 10).await.unwrap(), 0);
        assert!(products.decrease_stock(id, 1).await.is_err());
    }

    #[tokio::test]
    async fn test_decrease_stock_unknown_product() {
        let db = test_db().await;

        let err = db.products().decrease_stock(77, 1).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_decrease_stock_rejects_non_positive() {
        let db = test_db().await;
        let products = db.products();
        let id = products.insert(&widget()).await.unwrap();

        assert!(products.decrease_stock(id, 0).await.unwrap_err().is_constraint_violation());
        assert!(products.decrease_stock(id, -5).await.unwrap_err().is_constraint_violation());
        assert_eq!(products.find_by_id(id).await.unwrap().unwrap().stock, 10);
    }
}
