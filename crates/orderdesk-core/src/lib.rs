//! # orderdesk-core: Entity Mapping Kernel
//!
//! The pure half of the OrderDesk data layer. Entity types declare their
//! table once; everything else (schema text, CRUD statements, parameter
//! lists, row materialization) is derived from that declaration.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        OrderDesk Data Layer                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               ★ orderdesk-core (THIS CRATE) ★                   │   │
//! │  │                                                                 │   │
//! │  │   metadata ──► introspect ──► sql ───────┐                      │   │
//! │  │   (declare)    (validate,    (statement  │                      │   │
//! │  │                 cache)        text)      ├──► Statement         │   │
//! │  │                         └──► mapper ─────┘    + Record ↔ T      │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO ASYNC                               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                orderdesk-db (Database Layer)                    │   │
//! │  │        sqlx/SQLite execution, guards, generic + typed DAOs      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`metadata`] - Table/column descriptors and the [`Entity`] trait
//! - [`introspect`] - Declaration validation and the descriptor cache
//! - [`value`] - Dynamic column values and [`Record`]
//! - [`sql`] - Statement builder
//! - [`mapper`] - Entity ↔ parameters / record
//! - [`model`] - Product, Client, Order, Bill, OrderDetails
//! - [`error`] - MetadataError, MappingError
//!
//! ## Example Usage
//!
//! ```rust
//! use orderdesk_core::{sql, Entity, Product};
//!
//! let descriptor = Product::descriptor().unwrap();
//! let widget = Product { id: None, name: "Widget".into(), price: 9.99, stock: 10 };
//!
//! let stmt = sql::insert(descriptor, &widget);
//! assert_eq!(stmt.sql, "INSERT INTO products (name, price, stock) VALUES (?, ?, ?)");
//! assert_eq!(stmt.params.len(), 3);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod introspect;
pub mod mapper;
pub mod metadata;
pub mod model;
pub mod sql;
pub mod value;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{MappingError, MetadataError};
pub use introspect::describe;
pub use metadata::{
    BoundColumn, ColumnDescriptor, Declaration, Entity, EntityDescriptor, Getter, TableDescriptor,
};
pub use model::{Bill, Client, Order, OrderDetails, Product};
pub use sql::Statement;
pub use value::{FromValue, Record, Value, ValueKind};
