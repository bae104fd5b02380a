//! # orderdesk-db: Database Layer for OrderDesk
//!
//! Executes the statements orderdesk-core derives from entity metadata,
//! against SQLite through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        OrderDesk Data Flow                              │
//! │                                                                         │
//! │  Business layer (db.products().decrease_stock(id, 3))                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   orderdesk-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │     DAOs      │    │    Guards    │  │   │
//! │  │   │   (pool.rs)   │    │   (dao/*)     │    │  (guard.rs)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ Dao<T>        │───►│ prevent_     │  │   │
//! │  │   │ Connection    │    │ ProductDao    │    │ update_*     │  │   │
//! │  │   │ Provider      │    │ OrderDao ...  │    │ triggers     │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`provider`] - The injected connection source
//! - [`dao`] - Generic and specialized DAOs
//! - [`guard`] - Immutability guard installation
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use orderdesk_db::{Database, DbConfig, EntityDao};
//!
//! let db = Database::new(DbConfig::from_env()?).await?;
//!
//! let id = db.products().insert(&widget).await?;
//! db.products().decrease_stock(id, 3).await?;
//! let orders = db.orders().detailed_orders().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod dao;
pub mod error;
pub mod guard;
pub mod pool;
pub mod provider;
mod row;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use provider::ConnectionProvider;

// DAO re-exports for convenience
pub use dao::bill::BillDao;
pub use dao::client::ClientDao;
pub use dao::order::OrderDao;
pub use dao::product::ProductDao;
pub use dao::{Dao, EntityDao};
