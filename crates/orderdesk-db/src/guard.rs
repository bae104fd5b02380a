//! # Immutability Guards
//!
//! Installs one trigger per non-updatable, non-key column.
//!
//! ## Install Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  for each guarded column of the entity                                 │
//! │       │                                                                 │
//! │       ├── name = prevent_update_<table>_<column>                        │
//! │       ├── SELECT 1 FROM sqlite_master WHERE type='trigger' AND name=?   │
//! │       │       found ──► skip                                            │
//! │       └── CREATE TRIGGER IF NOT EXISTS name ...                         │
//! │               a racing creator that got there first is a no-op         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Runs on the caller's connection, inside the same transaction as the
//! table creation.

use orderdesk_core::{sql, EntityDescriptor};
use sqlx::SqliteConnection;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

/// Installs the missing guards for `descriptor` and returns their names.
///
/// Guards that already exist are left alone and not reported.
pub async fn install<T>(
    conn: &mut SqliteConnection,
    descriptor: &EntityDescriptor<T>,
) -> DbResult<Vec<String>> {
    let table = descriptor.table_name();
    let mut installed = Vec::new();

    for bound in descriptor.guarded_columns() {
        let column = bound.name();
        let name = sql::guard_name(table, column);

        if guard_exists(conn, &name).await? {
            debug!(guard = %name, "Immutability guard already present");
            continue;
        }

        sqlx::query(&sql::create_guard(table, column))
            .execute(&mut *conn)
            .await
            .map_err(|err| DbError::from(err).into_schema(name.as_str()))?;

        info!(table = %table, column = %column, guard = %name, "Installed immutability guard");
        installed.push(name);
    }

    Ok(installed)
}

/// Whether a trigger with this name exists.
pub async fn guard_exists(conn: &mut SqliteConnection, name: &str) -> DbResult<bool> {
    let found = sqlx::query_scalar::<_, i64>(sql::GUARD_EXISTS_SQL)
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(found.is_some())
}
