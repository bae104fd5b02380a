//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  DbConfig::new(path) / DbConfig::from_env()                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool (+ schema if enabled)       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │                           │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  (max_connections)        │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       │ ConnectionProvider::acquire, one per DAO operation             │
//! │       ▼                                                                 │
//! │  db.products() / db.clients() / db.orders() / db.bills()               │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Environment
//! | Variable                           | Default          |
//! |------------------------------------|------------------|
//! | `ORDERDESK_DB_PATH`                | `./orderdesk.db` |
//! | `ORDERDESK_DB_MAX_CONNECTIONS`     | `5`              |
//! | `ORDERDESK_DB_CONNECT_TIMEOUT_SECS`| `30`             |

use async_trait::async_trait;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqlitePool};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::dao::bill::BillDao;
use crate::dao::client::ClientDao;
use crate::dao::order::OrderDao;
use crate::dao::product::ProductDao;
use crate::dao::EntityDao;
use crate::error::{DbError, DbResult};
use crate::provider::ConnectionProvider;

const IN_MEMORY: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/orderdesk.db")
///     .max_connections(5)
///     .min_connections(1);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file, or `:memory:`.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// How long `acquire` waits for a free connection.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection. `None` keeps them open.
    /// Default: 10 minutes
    pub idle_timeout: Option<Duration>,

    /// Whether to create all tables and guards on connect.
    /// Default: true
    pub create_schema: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// ## Arguments
    /// * `path` - Path to the SQLite database file. Will be created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Some(Duration::from_secs(600)),
            create_schema: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to create the schema on connect.
    pub fn create_schema(mut self, create: bool) -> Self {
        self.create_schema = create;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let db = Database::new(DbConfig::in_memory()).await?;
    /// // Every call gets its own isolated database
    /// ```
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: None, // Closing the last connection drops the data
            create_schema: true,
        }
    }

    /// Loads configuration from `ORDERDESK_DB_*` environment variables.
    pub fn from_env() -> DbResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through `lookup`, applying defaults for unset keys.
    ///
    /// ## Returns
    /// * `Err(DbError::InvalidConfig)` - A value is set but cannot be parsed
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DbResult<Self> {
        let path = lookup("ORDERDESK_DB_PATH").unwrap_or_else(|| "./orderdesk.db".to_string());
        let mut config = DbConfig::new(path);

        if let Some(raw) = lookup("ORDERDESK_DB_MAX_CONNECTIONS") {
            config.max_connections = raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|max| *max > 0)
                .ok_or_else(|| invalid("ORDERDESK_DB_MAX_CONNECTIONS", &raw))?;
        }

        if let Some(raw) = lookup("ORDERDESK_DB_CONNECT_TIMEOUT_SECS") {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| invalid("ORDERDESK_DB_CONNECT_TIMEOUT_SECS", &raw))?;
            config.connect_timeout = Duration::from_secs(secs);
        }

        config.min_connections = config.min_connections.min(config.max_connections);
        Ok(config)
    }

    /// Whether this configuration targets a private in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY
    }
}

fn invalid(key: &str, raw: &str) -> DbError {
    DbError::InvalidConfig(format!("{key} has invalid value '{raw}'"))
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle: the production [`ConnectionProvider`] plus DAO access.
///
/// Cloning is cheap; clones share the pool.
///
/// ## Usage
/// ```rust,ignore
/// let db = Database::new(DbConfig::from_env()?).await?;
/// let id = db.products().insert(&widget).await?;
/// db.products().decrease_stock(id, 3).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite:
    ///    - WAL mode for concurrent reads (file databases)
    ///    - NORMAL synchronous
    ///    - Foreign keys enabled
    /// 3. Creates the connection pool
    /// 4. Creates tables and guards (if enabled)
    ///
    /// ## Returns
    /// * `Ok(Database)` - Ready-to-use database handle
    /// * `Err(DbError::Connectivity)` - Pool could not be opened
    /// * `Err(DbError::Schema)` - Schema creation failed
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let base_options = if config.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::Connectivity(e.to_string()))?
        } else {
            // sqlite://path creates file if not exists
            let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());
            SqliteConnectOptions::from_str(&connect_url)
                .map_err(|e| DbError::Connectivity(e.to_string()))?
                .journal_mode(SqliteJournalMode::Wal)
                .create_if_missing(true)
        };

        let connect_options = base_options
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has them disabled by default for backwards compatibility
            .foreign_keys(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.idle_timeout.map(|_| Duration::from_secs(1800)))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::Connectivity(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            "Database pool created"
        );

        let db = Database { pool };

        if config.create_schema {
            db.create_schema().await?;
        }

        Ok(db)
    }

    /// Creates every table and guard, parents before children.
    ///
    /// Idempotent: safe to run against an existing database.
    pub async fn create_schema(&self) -> DbResult<()> {
        info!("Creating schema");

        let mut installed = self.clients().create_if_not_exists().await?;
        installed.extend(self.products().create_if_not_exists().await?);
        installed.extend(self.orders().create_if_not_exists().await?);
        installed.extend(self.bills().create_if_not_exists().await?);

        info!(guards = installed.len(), "Schema ready");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    ///
    /// ## Usage
    /// For advanced queries not covered by DAOs.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// This database as a shareable provider, for building DAOs by hand.
    pub fn provider(&self) -> Arc<dyn ConnectionProvider> {
        Arc::new(self.clone())
    }

    /// Returns the product DAO.
    pub fn products(&self) -> ProductDao {
        ProductDao::new(self.provider())
    }

    /// Returns the client DAO.
    pub fn clients(&self) -> ClientDao {
        ClientDao::new(self.provider())
    }

    /// Returns the order DAO.
    pub fn orders(&self) -> OrderDao {
        OrderDao::new(self.provider())
    }

    /// Returns the bill DAO.
    pub fn bills(&self) -> BillDao {
        BillDao::new(self.provider())
    }

    /// Closes the database connection pool.
    ///
    /// ## Note
    /// After calling close, every acquire fails with `Connectivity`.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .is_ok()
    }
}

#[async_trait]
impl ConnectionProvider for Database {
    async fn acquire(&self) -> DbResult<PoolConnection<Sqlite>> {
        self.pool.acquire().await.map_err(|err| {
            warn!(error = %err, "Failed to acquire connection");
            DbError::Connectivity(err.to_string())
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[tokio::test]
    async fn test_in_memory_database() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert!(db.health_check().await);
        assert_eq!(db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_create_schema_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        db.create_schema().await.unwrap();
        db.create_schema().await.unwrap();

        let guards: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'trigger'",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(guards, 3);
    }

    #[tokio::test]
    async fn test_closed_pool_is_connectivity_error() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.close().await;

        let err = db.products().count().await.unwrap_err();
        assert!(matches!(err, DbError::Connectivity(_)));
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2)
            .create_schema(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert!(!config.create_schema);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }

    #[test]
    fn test_config_from_lookup_defaults() {
        let config = DbConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.database_path, PathBuf::from("./orderdesk.db"));
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_config_from_lookup_overrides() {
        let config = DbConfig::from_lookup(lookup(&[
            ("ORDERDESK_DB_PATH", "/var/lib/orderdesk.db"),
            ("ORDERDESK_DB_MAX_CONNECTIONS", "1"),
            ("ORDERDESK_DB_CONNECT_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/var/lib/orderdesk.db"));
        assert_eq!(config.max_connections, 1);
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_config_from_lookup_rejects_garbage() {
        let err = DbConfig::from_lookup(lookup(&[("ORDERDESK_DB_MAX_CONNECTIONS", "many")]))
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidConfig(_)));

        let err = DbConfig::from_lookup(lookup(&[("ORDERDESK_DB_MAX_CONNECTIONS", "0")]))
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidConfig(_)));

        let err = DbConfig::from_lookup(lookup(&[("ORDERDESK_DB_CONNECT_TIMEOUT_SECS", "-1")]))
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidConfig(_)));
    }
}
