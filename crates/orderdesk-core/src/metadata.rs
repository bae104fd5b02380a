//! # Metadata Model
//!
//! Declarative descriptors attached to entity types.
//!
//! ## Declaration → Descriptor
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  impl Entity for Product                                               │
//! │      fn declare() → Declaration<Product>                               │
//! │          .table("products")                                            │
//! │          .column(ColumnDescriptor::new("id", "INTEGER")                │
//! │                      .primary_key(), |p| p.id.into())                  │
//! │          .column(ColumnDescriptor::new("name", "VARCHAR(300)")         │
//! │                      .not_null(), |p| p.name.clone().into())           │
//! │       │                                                                 │
//! │       │  introspect::describe (validated once, cached forever)         │
//! │       ▼                                                                 │
//! │  EntityDescriptor<Product>                                             │
//! │      table: "products"                                                 │
//! │      columns: [id ★, name, price, stock]   ★ = primary key             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A declaration is raw and unchecked. An [`EntityDescriptor`] only exists
//! once validation has passed, so code holding one may rely on its
//! invariants: a table name, unique column names, exactly one primary key.

use std::fmt;

use crate::error::{MappingError, MetadataError};
use crate::introspect;
use crate::value::{Record, Value, ValueKind};

// =============================================================================
// Table & Column Descriptors
// =============================================================================

/// Names the relational table an entity type maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDescriptor {
    pub name: String,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        TableDescriptor { name: name.into() }
    }
}

/// Metadata for one persisted field.
///
/// Defaults mirror a plain nullable, updatable, non-key column. Use the
/// builder methods to narrow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub sql_type: String,
    pub is_primary_key: bool,
    pub is_nullable: bool,
    pub is_updatable: bool,
    pub foreign_key_table: Option<String>,
    pub foreign_key_column: Option<String>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        ColumnDescriptor {
            name: name.into(),
            sql_type: sql_type.into(),
            is_primary_key: false,
            is_nullable: true,
            is_updatable: true,
            foreign_key_table: None,
            foreign_key_column: None,
        }
    }

    /// Marks the column as the entity's primary key.
    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.is_nullable = false;
        self
    }

    /// Marks the column as non-updatable. Non-key immutable columns get a
    /// database-side guard when the table is created.
    pub fn immutable(mut self) -> Self {
        self.is_updatable = false;
        self
    }

    /// Declares a foreign key to `table(column)`.
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.foreign_key_table = Some(table.into());
        self.foreign_key_column = Some(column.into());
        self
    }

    /// The foreign-key target, when both halves are present.
    pub fn foreign_key(&self) -> Option<(&str, &str)> {
        match (&self.foreign_key_table, &self.foreign_key_column) {
            (Some(table), Some(column)) => Some((table.as_str(), column.as_str())),
            _ => None,
        }
    }

    /// Storage kind derived from the declared SQL type.
    ///
    /// The primary key is always an integer identity, whatever its declared type.
    pub fn kind(&self) -> ValueKind {
        if self.is_primary_key {
            ValueKind::Integer
        } else {
            ValueKind::from_sql_type(&self.sql_type)
        }
    }

    /// Whether this column needs an immutability guard.
    #[inline]
    pub fn is_guarded(&self) -> bool {
        !self.is_updatable && !self.is_primary_key
    }
}

// =============================================================================
// Field Binding
// =============================================================================

/// Reads one column's value out of an entity.
pub type Getter<T> = fn(&T) -> Value;

/// A column descriptor bound to the getter of a concrete entity type.
pub struct BoundColumn<T> {
    pub column: ColumnDescriptor,
    pub get: Getter<T>,
}

impl<T> BoundColumn<T> {
    /// Reads this column's value from `entity`.
    #[inline]
    pub fn read(&self, entity: &T) -> Value {
        (self.get)(entity)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.column.name
    }
}

impl<T> fmt::Debug for BoundColumn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundColumn")
            .field("column", &self.column)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Declaration
// =============================================================================

/// The raw, unvalidated static declaration of an entity type.
pub struct Declaration<T> {
    pub(crate) table: Option<TableDescriptor>,
    pub(crate) columns: Vec<BoundColumn<T>>,
}

impl<T> Declaration<T> {
    pub fn new() -> Self {
        Declaration {
            table: None,
            columns: Vec::new(),
        }
    }

    /// Names the table this entity maps to.
    pub fn table(mut self, name: impl Into<String>) -> Self {
        self.table = Some(TableDescriptor::new(name));
        self
    }

    /// Appends a column. Declaration order is column order everywhere.
    pub fn column(mut self, column: ColumnDescriptor, get: Getter<T>) -> Self {
        self.columns.push(BoundColumn { column, get });
        self
    }
}

impl<T> Default for Declaration<T> {
    fn default() -> Self {
        Declaration::new()
    }
}

// =============================================================================
// Entity Descriptor
// =============================================================================

/// Validated metadata for one entity type.
///
/// Built only by [`introspect::describe`]; never mutated afterwards.
pub struct EntityDescriptor<T> {
    pub(crate) entity: &'static str,
    pub(crate) table: TableDescriptor,
    pub(crate) columns: Vec<BoundColumn<T>>,
    pub(crate) primary_key: usize,
}

impl<T> EntityDescriptor<T> {
    /// Short type name of the entity, for messages.
    pub fn entity_name(&self) -> &'static str {
        self.entity
    }

    pub fn table(&self) -> &TableDescriptor {
        &self.table
    }

    pub fn table_name(&self) -> &str {
        &self.table.name
    }

    /// All columns in declaration order.
    pub fn columns(&self) -> &[BoundColumn<T>] {
        &self.columns
    }

    pub fn primary_key(&self) -> &BoundColumn<T> {
        &self.columns[self.primary_key]
    }

    /// Every column except the primary key, in declaration order.
    pub fn non_key_columns(&self) -> impl Iterator<Item = &BoundColumn<T>> {
        let key = self.primary_key;
        self.columns
            .iter()
            .enumerate()
            .filter(move |(index, _)| *index != key)
            .map(|(_, bound)| bound)
    }

    /// Columns that need an immutability guard.
    pub fn guarded_columns(&self) -> impl Iterator<Item = &BoundColumn<T>> {
        self.columns.iter().filter(|bound| bound.column.is_guarded())
    }

    /// Columns that declare a foreign-key target.
    pub fn foreign_key_columns(&self) -> impl Iterator<Item = &BoundColumn<T>> {
        self.columns
            .iter()
            .filter(|bound| bound.column.foreign_key().is_some())
    }

    /// Looks up a column by name, ignoring ASCII case as SQLite does.
    pub fn column(&self, name: &str) -> Result<&BoundColumn<T>, MetadataError> {
        self.columns
            .iter()
            .find(|bound| bound.column.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| MetadataError::UnknownColumn {
                entity: self.entity,
                column: name.to_string(),
            })
    }
}

impl<T> fmt::Debug for EntityDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("entity", &self.entity)
            .field("table", &self.table)
            .field("columns", &self.columns)
            .field("primary_key", &self.primary_key().column.name)
            .finish()
    }
}

// =============================================================================
// Entity Trait
// =============================================================================

/// A plain data record mapped to exactly one relational table.
///
/// ## Implementing
/// ```rust,ignore
/// impl Entity for Product {
///     fn declare() -> Declaration<Self> { /* table + columns */ }
///
///     fn from_record(record: &Record) -> Result<Self, MappingError> {
///         Ok(Product {
///             id: record.get("id")?,
///             name: record.get("name")?,
///             ...
///         })
///     }
/// }
/// ```
pub trait Entity: Sized + Send + Sync + 'static {
    /// The static declaration table for this type.
    fn declare() -> Declaration<Self>;

    /// Builds one entity from the named values of a row.
    fn from_record(record: &Record) -> Result<Self, MappingError>;

    /// Cached, validated descriptor for this type.
    fn descriptor() -> Result<&'static EntityDescriptor<Self>, MetadataError> {
        introspect::describe_cached::<Self>()
    }
}
