//! # DAO Module
//!
//! The generic data-access façade and the per-entity DAOs built on it.
//!
//! ## Layering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ProductDao / OrderDao / BillDao        ClientDao = Dao<Client>        │
//! │  (impl EntityDao<T>, extra queries,     (nothing to specialize)        │
//! │   type-level overrides)                                                 │
//! │       │                                                                 │
//! │       │  fn dao(&self) -> &Dao<T>                                      │
//! │       ▼                                                                 │
//! │  Dao<T: Entity>                                                        │
//! │  ├── T::descriptor()        ← cached metadata, MetadataError before I/O│
//! │  ├── orderdesk_core::sql    ← statement text + params                  │
//! │  ├── row::decode_entity     ← SqliteRow → Record → T                    │
//! │  └── provider.acquire()     ← one connection per operation             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Table States
//! `Absent → Ready` through [`Dao::create_if_not_exists`], which is safe to
//! repeat. CRUD against an absent table surfaces the store's own
//! "no such table" failure as [`DbError::QueryFailed`].

pub mod bill;
pub mod client;
pub mod order;
pub mod product;

use async_trait::async_trait;
use orderdesk_core::{sql, Entity, EntityDescriptor, Value};
use sqlx::{Connection, Sqlite, Transaction};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{DbError, DbResult};
use crate::guard;
use crate::provider::ConnectionProvider;
use crate::row::{bind_values, decode_entity};

// =============================================================================
// Generic DAO
// =============================================================================

/// CRUD for one entity type, with every statement derived from its metadata.
///
/// ## Example
/// ```rust,ignore
/// let dao: Dao<Product> = Dao::new(db.provider());
/// dao.create_if_not_exists().await?;
///
/// let id = dao.insert(&widget).await?;
/// let found = dao.find_by_id(id).await?;
/// ```
pub struct Dao<T> {
    provider: Arc<dyn ConnectionProvider>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Clone for Dao<T> {
    fn clone(&self) -> Self {
        Dao {
            provider: Arc::clone(&self.provider),
            _entity: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Dao<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dao")
            .field("entity", &std::any::type_name::<T>())
            .finish_non_exhaustive()
    }
}

impl<T: Entity> Dao<T> {
    /// Creates a DAO drawing connections from `provider`.
    pub fn new(provider: Arc<dyn ConnectionProvider>) -> Self {
        Dao {
            provider,
            _entity: PhantomData,
        }
    }

    /// The validated metadata for `T`.
    pub fn descriptor(&self) -> DbResult<&'static EntityDescriptor<T>> {
        Ok(T::descriptor()?)
    }

    /// Creates the table and its immutability guards if they are missing.
    ///
    /// Table and guards are created in one transaction. A second call is a
    /// no-op and returns an empty list.
    ///
    /// ## Returns
    /// * `Ok(Vec<String>)` - Names of the guards this call installed
    /// * `Err(DbError::Schema)` - The store rejected the DDL
    pub async fn create_if_not_exists(&self) -> DbResult<Vec<String>> {
        let descriptor = self.descriptor()?;
        let table = descriptor.table_name();
        let ddl = sql::create_table(descriptor);

        debug!(table = %table, "Ensuring table exists");

        let mut conn = self.provider.acquire().await?;
        let mut tx = conn.begin().await?;

        let outcome = async {
            sqlx::query(&ddl)
                .execute(&mut *tx)
                .await
                .map_err(|err| DbError::from(err).into_schema(table))?;
            guard::install(&mut tx, descriptor).await
        }
        .await;

        let installed = finish(tx, outcome, table).await?;
        info!(table = %table, guards = installed.len(), "Table ready");
        Ok(installed)
    }

    /// Inserts one entity. Its key field is ignored.
    ///
    /// ## Returns
    /// * `Ok(i64)` - The key the store generated
    pub async fn insert(&self, entity: &T) -> DbResult<i64> {
        let descriptor = self.descriptor()?;
        let stmt = sql::insert(descriptor, entity);

        let mut conn = self.provider.acquire().await?;
        let result = bind_values(sqlx::query(&stmt.sql), &stmt.params)
            .execute(&mut *conn)
            .await
            .map_err(failed(descriptor.table_name(), "insert"))?;

        let id = result.last_insert_rowid();
        debug!(table = %descriptor.table_name(), id, "Inserted row");
        Ok(id)
    }

    /// Inserts every entity with one multi-row statement in one transaction.
    ///
    /// All or nothing: on failure the transaction is rolled back before the
    /// connection is released. An empty slice is a no-op and acquires
    /// nothing.
    ///
    /// ## Returns
    /// * `Ok(u64)` - Rows inserted
    pub async fn insert_batch(&self, entities: &[T]) -> DbResult<u64> {
        let descriptor = self.descriptor()?;
        let table = descriptor.table_name();
        let Some(stmt) = sql::insert_batch(descriptor, entities) else {
            return Ok(0);
        };

        debug!(table = %table, rows = entities.len(), params = stmt.params.len(), "Batch insert");

        let mut conn = self.provider.acquire().await?;
        let mut tx = conn.begin().await?;

        let outcome = async {
            let result = bind_values(sqlx::query(&stmt.sql), &stmt.params)
                .execute(&mut *tx)
                .await
                .map_err(failed(table, "insert_batch"))?;
            Ok::<_, DbError>(result.rows_affected())
        }
        .await;

        finish(tx, outcome, table).await
    }

    /// Fetches one entity by key.
    ///
    /// ## Returns
    /// * `Ok(Some(T))` - Row found
    /// * `Ok(None)` - No row with that key
    pub async fn find_by_id(&self, id: i64) -> DbResult<Option<T>> {
        let descriptor = self.descriptor()?;
        let stmt = sql::select_by_key(descriptor, id);

        let mut conn = self.provider.acquire().await?;
        let row = bind_values(sqlx::query(&stmt.sql), &stmt.params)
            .fetch_optional(&mut *conn)
            .await
            .map_err(failed(descriptor.table_name(), "find_by_id"))?;

        match row {
            Some(row) => Ok(Some(decode_entity(&row, descriptor)?)),
            None => Ok(None),
        }
    }

    /// Fetches every entity, ordered by key ascending.
    pub async fn find_all(&self) -> DbResult<Vec<T>> {
        let descriptor = self.descriptor()?;
        let query = sql::select_all(descriptor);

        let mut conn = self.provider.acquire().await?;
        let rows = sqlx::query(&query)
            .fetch_all(&mut *conn)
            .await
            .map_err(failed(descriptor.table_name(), "find_all"))?;

        let entities = rows
            .iter()
            .map(|row| decode_entity(row, descriptor))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(table = %descriptor.table_name(), count = entities.len(), "Fetched rows");
        Ok(entities)
    }

    /// Fetches entities whose `column` equals `value`, ordered by key.
    ///
    /// ## Returns
    /// * `Err(DbError::Metadata)` - `T` declares no such column
    pub async fn find_where(&self, column: &str, value: Value) -> DbResult<Vec<T>> {
        let descriptor = self.descriptor()?;
        let stmt = sql::select_where(descriptor, column, value)?;

        let mut conn = self.provider.acquire().await?;
        let rows = bind_values(sqlx::query(&stmt.sql), &stmt.params)
            .fetch_all(&mut *conn)
            .await
            .map_err(failed(descriptor.table_name(), "find_where"))?;

        let entities = rows
            .iter()
            .map(|row| decode_entity(row, descriptor))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entities)
    }

    /// Rewrites every non-key column of the row the entity's key points at.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Key unset, or no row has it
    /// * `Err(DbError::ConstraintViolation)` - A guard or constraint fired
    pub async fn update(&self, entity: &T) -> DbResult<()> {
        let descriptor = self.descriptor()?;
        let table = descriptor.table_name();

        let id = match descriptor.primary_key().read(entity) {
            Value::Integer(id) => id,
            _ => return Err(DbError::not_found(descriptor.entity_name(), "<unassigned>")),
        };

        let stmt = sql::update(descriptor, entity);

        let mut conn = self.provider.acquire().await?;
        let result = bind_values(sqlx::query(&stmt.sql), &stmt.params)
            .execute(&mut *conn)
            .await
            .map_err(failed(table, "update"))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(descriptor.entity_name(), id));
        }

        debug!(table = %table, id, "Updated row");
        Ok(())
    }

    /// Deletes by key.
    ///
    /// ## Returns
    /// * `Ok(true)` - A row was removed
    /// * `Ok(false)` - No row had that key
    pub async fn delete(&self, id: i64) -> DbResult<bool> {
        let descriptor = self.descriptor()?;
        let stmt = sql::delete(descriptor, id);

        let mut conn = self.provider.acquire().await?;
        let result = bind_values(sqlx::query(&stmt.sql), &stmt.params)
            .execute(&mut *conn)
            .await
            .map_err(failed(descriptor.table_name(), "delete"))?;

        Ok(result.rows_affected() > 0)
    }

    /// Number of rows in the table.
    pub async fn count(&self) -> DbResult<i64> {
        let descriptor = self.descriptor()?;
        let query = sql::count(descriptor);

        let mut conn = self.provider.acquire().await?;
        let count = sqlx::query_scalar::<_, i64>(&query)
            .fetch_one(&mut *conn)
            .await
            .map_err(failed(descriptor.table_name(), "count"))?;

        Ok(count)
    }

    /// Highest key in the table, `None` when it is empty.
    pub async fn max_key(&self) -> DbResult<Option<i64>> {
        let descriptor = self.descriptor()?;
        let query = sql::max_key(descriptor);

        let mut conn = self.provider.acquire().await?;
        let max = sqlx::query_scalar::<_, Option<i64>>(&query)
            .fetch_one(&mut *conn)
            .await
            .map_err(failed(descriptor.table_name(), "max_key"))?;

        Ok(max)
    }

    pub(crate) fn provider(&self) -> &Arc<dyn ConnectionProvider> {
        &self.provider
    }
}

// =============================================================================
// Override Point
// =============================================================================

/// The public CRUD contract, forwarded to a [`Dao`] by default.
///
/// Specialized DAOs implement this and override individual methods; the
/// override is chosen by type, not by a runtime flag.
///
/// ## Example
/// ```rust,ignore
/// #[async_trait]
/// impl EntityDao<Bill> for BillDao {
///     fn dao(&self) -> &Dao<Bill> { &self.dao }
///
///     async fn update(&self, _bill: &Bill) -> DbResult<()> {
///         Err(DbError::unsupported("update", "Bill"))
///     }
/// }
/// ```
#[async_trait]
pub trait EntityDao<T: Entity>: Send + Sync {
    fn dao(&self) -> &Dao<T>;

    async fn create_if_not_exists(&self) -> DbResult<Vec<String>> {
        self.dao().create_if_not_exists().await
    }

    async fn insert(&self, entity: &T) -> DbResult<i64> {
        self.dao().insert(entity).await
    }

    async fn insert_batch(&self, entities: &[T]) -> DbResult<u64> {
        self.dao().insert_batch(entities).await
    }

    async fn find_by_id(&self, id: i64) -> DbResult<Option<T>> {
        self.dao().find_by_id(id).await
    }

    async fn find_all(&self) -> DbResult<Vec<T>> {
        self.dao().find_all().await
    }

    async fn update(&self, entity: &T) -> DbResult<()> {
        self.dao().update(entity).await
    }

    async fn delete(&self, id: i64) -> DbResult<bool> {
        self.dao().delete(id).await
    }

    async fn count(&self) -> DbResult<i64> {
        self.dao().count().await
    }
}

impl<T: Entity> EntityDao<T> for Dao<T> {
    fn dao(&self) -> &Dao<T> {
        self
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Commits on success; rolls back explicitly on failure and returns the
/// original error.
pub(crate) async fn finish<T>(
    tx: Transaction<'_, Sqlite>,
    outcome: DbResult<T>,
    table: &str,
) -> DbResult<T> {
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            warn!(table = %table, error = %err, "Rolling back transaction");
            if let Err(rollback_err) = tx.rollback().await {
                error!(table = %table, error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

/// Maps and logs a failed statement.
pub(crate) fn failed<'a>(
    table: &'a str,
    operation: &'static str,
) -> impl FnOnce(sqlx::Error) -> DbError + 'a {
    move |err| {
        let err = DbError::from(err);
        warn!(table = %table, operation, error = %err, "Statement failed");
        err
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use async_trait::async_trait;
    use orderdesk_core::{
        Bill, ColumnDescriptor, Declaration, MappingError, MetadataError, Product, Record,
    };
    use sqlx::pool::PoolConnection;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider that counts acquires before delegating to a real database.
    pub(crate) struct CountingProvider {
        inner: Database,
        acquired: AtomicUsize,
    }

    impl CountingProvider {
        pub(crate) fn new(inner: Database) -> Arc<Self> {
            Arc::new(CountingProvider {
                inner,
                acquired: AtomicUsize::new(0),
            })
        }

        pub(crate) fn acquired(&self) -> usize {
            self.acquired.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ConnectionProvider for CountingProvider {
        async fn acquire(&self) -> DbResult<PoolConnection<Sqlite>> {
            self.acquired.fetch_add(1, Ordering::SeqCst);
            self.inner.acquire().await
        }
    }

    pub(crate) async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn product(name: &str, price: f64, stock: i64) -> Product {
        Product {
            id: None,
            name: name.to_string(),
            price,
            stock,
        }
    }

    #[tokio::test]
    async fn test_insert_find_round_trip() {
        let db = test_db().await;
        let dao: Dao<Product> = Dao::new(db.provider());
        let widget = product("Widget", 9.99, 10);

        let id = dao.insert(&widget).await.unwrap();
        let found = dao.find_by_id(id).await.unwrap().unwrap();

        assert_eq!(found.id, Some(id));
        assert_eq!(found.name, widget.name);
        assert_eq!(found.price, widget.price);
        assert_eq!(found.stock, widget.stock);
    }

    #[tokio::test]
    async fn test_find_by_id_missing_is_none() {
        let db = test_db().await;
        let dao: Dao<Product> = Dao::new(db.provider());

        assert!(dao.find_by_id(404).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_batch_and_find_all_order() {
        let db = test_db().await;
        let dao: Dao<Product> = Dao::new(db.provider());
        let batch = vec![
            product("a", 1.0, 1),
            product("b", 2.0, 2),
            product("c", 3.0, 3),
        ];

        assert_eq!(dao.insert_batch(&batch).await.unwrap(), 3);

        let all = dao.find_all().await.unwrap();
        let names: Vec<_> = all.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(all.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn test_empty_batch_acquires_nothing() {
        let db = test_db().await;
        let counting = CountingProvider::new(db);
        let dao: Dao<Product> = Dao::new(counting.clone());

        assert_eq!(dao.insert_batch(&[]).await.unwrap(), 0);
        assert_eq!(counting.acquired(), 0);
    }

    #[tokio::test]
    async fn test_failed_batch_rolls_back() {
        let db = test_db().await;
        let orders = db.orders();
        let at = chrono::Utc::now();

        // Second order references a client that does not exist
        let client_id = db
            .clients()
            .insert(&orderdesk_core::Client {
                id: None,
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                email: "ada@example.com".into(),
                address: "12 Analytical St".into(),
            })
            .await
            .unwrap();
        let product_id = db.products().insert(&product("Widget", 9.99, 10)).await.unwrap();

        let order = |client_id| orderdesk_core::Order {
            id: None,
            client_id,
            product_id,
            quantity: 1,
            total_price: 9.99,
            order_date: at,
        };

        let err = orders
            .insert_batch(&[order(client_id), order(client_id + 100)])
            .await
            .unwrap_err();

        assert!(err.is_constraint_violation());
        assert_eq!(orders.count().await.unwrap(), 0);
        // The connection went back to the pool in a usable state
        assert!(db.health_check().await);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = test_db().await;
        let dao: Dao<Product> = Dao::new(db.provider());

        let id = dao.insert(&product("Widget", 9.99, 10)).await.unwrap();
        let mut widget = dao.find_by_id(id).await.unwrap().unwrap();
        widget.price = 12.5;
        dao.update(&widget).await.unwrap();

        assert_eq!(dao.find_by_id(id).await.unwrap().unwrap().price, 12.5);

        assert!(dao.delete(id).await.unwrap());
        assert!(!dao.delete(id).await.unwrap());
        assert_eq!(dao.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let db = test_db().await;
        let dao: Dao<Product> = Dao::new(db.provider());

        let mut ghost = product("Ghost", 1.0, 1);
        assert!(dao.update(&ghost).await.unwrap_err().is_not_found());

        ghost.id = Some(99);
        assert!(dao.update(&ghost).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_create_if_not_exists_twice() {
        let db = Database::new(DbConfig::in_memory().create_schema(false))
            .await
            .unwrap();
        let bills = db.bills();

        let first = bills.create_if_not_exists().await.unwrap();
        let second = bills.create_if_not_exists().await.unwrap();

        assert_eq!(first.len(), 3);
        assert!(second.is_empty());

        let triggers: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'trigger' AND tbl_name = 'bills'",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(triggers, 3);
    }

    #[tokio::test]
    async fn test_max_key() {
        let db = test_db().await;
        let dao: Dao<Product> = Dao::new(db.provider());

        assert_eq!(dao.max_key().await.unwrap(), None);
        dao.insert(&product("a", 1.0, 1)).await.unwrap();
        let last = dao.insert(&product("b", 1.0, 1)).await.unwrap();
        assert_eq!(dao.max_key().await.unwrap(), Some(last));
    }

    #[tokio::test]
    async fn test_highest_key_is_reused_after_delete() {
        let db = test_db().await;
        let dao: Dao<Product> = Dao::new(db.provider());

        let first = dao.insert(&product("a", 1.0, 1)).await.unwrap();
        let second = dao.insert(&product("b", 1.0, 1)).await.unwrap();
        assert!(dao.delete(second).await.unwrap());

        // Rowid alias keys are max(id) + 1, not a never-reused sequence
        let third = dao.insert(&product("c", 1.0, 1)).await.unwrap();
        assert_eq!(third, second);
        assert!(third > first);
    }

    #[derive(Debug)]
    struct Keyless;

    impl Entity for Keyless {
        fn declare() -> Declaration<Self> {
            Declaration::<Self>::new().table("keyless").column(
                ColumnDescriptor::new("name", "TEXT"),
                |_| Value::Null,
            )
        }

        fn from_record(_record: &Record) -> Result<Self, MappingError> {
            Ok(Keyless)
        }
    }

    #[tokio::test]
    async fn test_metadata_error_before_io() {
        let db = test_db().await;
        let counting = CountingProvider::new(db);
        let dao: Dao<Keyless> = Dao::new(counting.clone());

        let err = dao.find_all().await.unwrap_err();

        assert!(matches!(
            err,
            DbError::Metadata(MetadataError::MissingPrimaryKey { found: 0, .. })
        ));
        assert_eq!(counting.acquired(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_concurrent_create_if_not_exists() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("race.db"))
            .max_connections(8)
            .create_schema(false);
        let db = Database::new(config).await.unwrap();

        let creators: Vec<_> = (0..8)
            .map(|_| {
                let dao: Dao<Bill> = Dao::new(db.provider());
                tokio::spawn(async move { dao.create_if_not_exists().await })
            })
            .collect();

        let mut installed = 0;
        for creator in creators {
            installed += creator.await.unwrap().unwrap().len();
        }

        // Each guard counted once, by whichever creator got there first
        assert_eq!(installed, 3);
        let triggers: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'trigger' AND tbl_name = 'bills'",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(triggers, 3);
    }

    #[derive(Debug)]
    struct Malformed;

    impl Entity for Malformed {
        fn declare() -> Declaration<Self> {
            Declaration::<Self>::new()
                .table("malformed")
                .column(
                    ColumnDescriptor::new("id", "INTEGER").primary_key(),
                    |_| Value::Null,
                )
                .column(ColumnDescriptor::new("size", "VARCHAR(("), |_| Value::Null)
        }

        fn from_record(_record: &Record) -> Result<Self, MappingError> {
            Ok(Malformed)
        }
    }

    #[tokio::test]
    async fn test_rejected_ddl_is_schema_error() {
        let db = test_db().await;
        let dao: Dao<Malformed> = Dao::new(db.provider());

        let err = dao.create_if_not_exists().await.unwrap_err();

        assert!(matches!(err, DbError::Schema { ref object, .. } if object == "malformed"));
        assert!(db.health_check().await);
    }
}
