//! # Bill DAO
//!
//! Bills are append-only. The DAO refuses updates outright, and the
//! database guards on every bill column reject any that get past it.

use std::sync::Arc;

use async_trait::async_trait;
use orderdesk_core::{Bill, Value};
use tracing::warn;

use super::{Dao, EntityDao};
use crate::error::{DbError, DbResult};
use crate::provider::ConnectionProvider;

/// DAO for [`Bill`].
#[derive(Debug, Clone)]
pub struct BillDao {
    dao: Dao<Bill>,
}

impl BillDao {
    pub fn new(provider: Arc<dyn ConnectionProvider>) -> Self {
        BillDao {
            dao: Dao::new(provider),
        }
    }

    /// The bill issued for an order, if any.
    pub async fn find_by_order_id(&self, order_id: i64) -> DbResult<Option<Bill>> {
        let bills = self
            .dao
            .find_where("order_id", Value::Integer(order_id))
            .await?;
        Ok(bills.into_iter().next())
    }
}

#[async_trait]
impl EntityDao<Bill> for BillDao {
    fn dao(&self) -> &Dao<Bill> {
        &self.dao
    }

    /// Always fails: bills never change. No connection is acquired.
    async fn update(&self, bill: &Bill) -> DbResult<()> {
        warn!(id = ?bill.id, "Rejected update of immutable bill");
        Err(DbError::unsupported("update", "Bill"))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
