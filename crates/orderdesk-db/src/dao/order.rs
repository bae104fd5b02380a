//! # Order DAO
//!
//! Generic CRUD plus the joined order listing.
//!
//! ## Detailed Orders
//! ```text
//! orders o ──client_id──► clients c   (first_name || ' ' || last_name)
//!          ──product_id─► products p  (name)
//!       │
//!       ▼
//! OrderDetails { order_id, client_name, product_name, quantity, total_price, order_date }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use orderdesk_core::{Order, OrderDetails};
use tracing::debug;

use super::{failed, Dao, EntityDao};
use crate::error::DbResult;
use crate::provider::ConnectionProvider;
use crate::row::decode_row;

const DETAILED_ORDERS_SQL: &str = "\
    SELECT o.id AS order_id, \
           c.first_name || ' ' || c.last_name AS client_name, \
           p.name AS product_name, \
           o.quantity AS quantity, \
           o.total_price AS total_price, \
           o.order_date AS order_date \
    FROM orders o \
    JOIN clients c ON o.client_id = c.id \
    JOIN products p ON o.product_id = p.id \
    ORDER BY o.id ASC";

/// DAO for [`Order`].
#[derive(Debug, Clone)]
pub struct OrderDao {
    dao: Dao<Order>,
}

impl OrderDao {
    pub fn new(provider: Arc<dyn ConnectionProvider>) -> Self {
        OrderDao {
            dao: Dao::new(provider),
        }
    }

    /// Every order joined with its client's full name and product name,
    /// ordered by order id.
    pub async fn detailed_orders(&self) -> DbResult<Vec<OrderDetails>> {
        let mut conn = self.dao.provider().acquire().await?;
        let rows = sqlx::query(DETAILED_ORDERS_SQL)
            .fetch_all(&mut *conn)
            .await
            .map_err(failed("orders", "detailed_orders"))?;

        let details = rows
            .iter()
            .map(|row| {
                let record = decode_row(row, OrderDetails::COLUMNS)?;
                OrderDetails::from_record(&record)
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = details.len(), "Fetched detailed orders");
        Ok(details)
    }

    /// Key of the most recent order, `None` when there are none.
    pub async fn last_id(&self) -> DbResult<Option<i64>> {
        self.dao.max_key().await
    }
}

#[async_trait]
impl EntityDao<Order> for OrderDao {
    fn dao(&self) -> &Dao<Order> {
        &self.dao
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
