//! # Connection Provider
//!
//! The injected source of connections every DAO draws from.
//!
//! ## Acquire / Release
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Dao::insert(&entity)                                                  │
//! │       │                                                                 │
//! │       ├── provider.acquire().await  ──► PoolConnection<Sqlite>          │
//! │       │        (Connectivity error if the pool cannot supply one)       │
//! │       │                                                                 │
//! │       ├── execute statement(s)                                          │
//! │       │                                                                 │
//! │       └── connection dropped ──► returned to the pool                   │
//! │             on Ok, on Err, and on early `?` return alike                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Release is the connection's `Drop`, so no exit path can leak one.

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::Sqlite;

use crate::error::DbResult;

/// Hands out one connection per logical DAO operation.
///
/// Implementations must be safe to share across tasks. The DAO never holds
/// a connection across more than one operation.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Acquires a connection. Dropping it releases it.
    async fn acquire(&self) -> DbResult<PoolConnection<Sqlite>>;
}
