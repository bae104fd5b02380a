//! # Column Values
//!
//! The dynamic value type that flows between entities and statements.
//!
//! ## Value Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Entity field ──getter──► Value ──bind──► statement parameter           │
//! │                                                                         │
//! │  Result row ──decode(kind)──► Record { column → Value }                 │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │                     Entity::from_record(record.get::<T>(...))           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The [`ValueKind`] of a column is derived once from its declared SQL type and
//! decides how the db layer decodes it.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::error::MappingError;

// =============================================================================
// Value Kind
// =============================================================================

/// Storage class of a column, derived from its declared SQL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Integer,
    Real,
    Text,
    Boolean,
    Timestamp,
}

impl ValueKind {
    /// Derives the kind from a declared SQL type.
    ///
    /// ## Mapping
    /// ```text
    /// INT, INTEGER, BIGINT, SMALLINT ...      → Integer
    /// BOOL, BOOLEAN                           → Boolean
    /// TIMESTAMP, DATETIME, DATE              → Timestamp
    /// CHAR, VARCHAR(n), TEXT, CLOB            → Text
    /// REAL, DOUBLE PRECISION, FLOAT, NUMERIC  → Real
    /// anything else                           → Text
    /// ```
    pub fn from_sql_type(sql_type: &str) -> Self {
        let upper = sql_type.trim().to_ascii_uppercase();
        let base = upper.split('(').next().unwrap_or_default().trim();

        if base.starts_with("BOOL") {
            ValueKind::Boolean
        } else if base.starts_with("TIMESTAMP") || base == "DATETIME" || base == "DATE" {
            ValueKind::Timestamp
        } else if base.contains("INT") {
            ValueKind::Integer
        } else if base.contains("CHAR") || base.contains("CLOB") || base.contains("TEXT") {
            ValueKind::Text
        } else if base.contains("REAL")
            || base.contains("FLOA")
            || base.contains("DOUB")
            || base == "NUMERIC"
            || base == "DECIMAL"
        {
            ValueKind::Real
        } else {
            ValueKind::Text
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Integer => write!(f, "INTEGER"),
            ValueKind::Real => write!(f, "REAL"),
            ValueKind::Text => write!(f, "TEXT"),
            ValueKind::Boolean => write!(f, "BOOLEAN"),
            ValueKind::Timestamp => write!(f, "TIMESTAMP"),
        }
    }
}

// =============================================================================
// Value
// =============================================================================

/// A single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Returns the kind of a non-null value.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Value::Null => None,
            Value::Integer(_) => Some(ValueKind::Integer),
            Value::Real(_) => Some(ValueKind::Real),
            Value::Text(_) => Some(ValueKind::Text),
            Value::Boolean(_) => Some(ValueKind::Boolean),
            Value::Timestamp(_) => Some(ValueKind::Timestamp),
        }
    }

    /// Name used in mismatch messages.
    fn type_name(&self) -> String {
        self.kind()
            .map(|kind| kind.to_string())
            .unwrap_or_else(|| "NULL".to_string())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

// =============================================================================
// Typed Extraction
// =============================================================================

/// Conversion from a column value into a field type.
pub trait FromValue: Sized {
    fn from_value(column: &str, value: &Value) -> Result<Self, MappingError>;
}

fn mismatch(column: &str, expected: ValueKind, found: &Value) -> MappingError {
    match found {
        Value::Null => MappingError::UnexpectedNull {
            column: column.to_string(),
        },
        other => MappingError::TypeMismatch {
            column: column.to_string(),
            expected,
            found: other.type_name(),
        },
    }
}

impl FromValue for i64 {
    fn from_value(column: &str, value: &Value) -> Result<Self, MappingError> {
        match value {
            Value::Integer(v) => Ok(*v),
            other => Err(mismatch(column, ValueKind::Integer, other)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(column: &str, value: &Value) -> Result<Self, MappingError> {
        match value {
            Value::Integer(v) => i32::try_from(*v).map_err(|_| MappingError::TypeMismatch {
                column: column.to_string(),
                expected: ValueKind::Integer,
                found: format!("INTEGER {} out of i32 range", v),
            }),
            other => Err(mismatch(column, ValueKind::Integer, other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(column: &str, value: &Value) -> Result<Self, MappingError> {
        match value {
            Value::Real(v) => Ok(*v),
            // SQLite may hand back an integral REAL as an integer
            Value::Integer(v) => Ok(*v as f64),
            other => Err(mismatch(column, ValueKind::Real, other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(column: &str, value: &Value) -> Result<Self, MappingError> {
        match value {
            Value::Boolean(v) => Ok(*v),
            Value::Integer(0) => Ok(false),
            Value::Integer(1) => Ok(true),
            other => Err(mismatch(column, ValueKind::Boolean, other)),
        }
    }
}

impl FromValue for String {
    fn from_value(column: &str, value: &Value) -> Result<Self, MappingError> {
        match value {
            Value::Text(v) => Ok(v.clone()),
            other => Err(mismatch(column, ValueKind::Text, other)),
        }
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(column: &str, value: &Value) -> Result<Self, MappingError> {
        match value {
            Value::Timestamp(v) => Ok(*v),
            other => Err(mismatch(column, ValueKind::Timestamp, other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(column: &str, value: &Value) -> Result<Self, MappingError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(column, other).map(Some),
        }
    }
}

// =============================================================================
// Record
// =============================================================================

/// Named values accumulated from one result row.
///
/// Columns keep the order they were inserted in. Inserting an existing
/// column replaces its value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Record::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Record {
            values: Vec::with_capacity(capacity),
        }
    }

    /// Sets a column's value.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.values.iter_mut().find(|(name, _)| *name == column) {
            Some(slot) => slot.1 = value,
            None => self.values.push((column, value)),
        }
    }

    /// Builder-style [`Record::insert`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Returns the raw value of a column.
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.value(column).is_some()
    }

    /// Reads a column as a typed field value.
    ///
    /// ## Returns
    /// * `Ok(T)` - Column present and convertible
    /// * `Err(MappingError::MissingColumn)` - Column absent
    /// * `Err(MappingError::TypeMismatch | UnexpectedNull)` - Wrong kind of value
    pub fn get<T: FromValue>(&self, column: &str) -> Result<T, MappingError> {
        let value = self
            .value(column)
            .ok_or_else(|| MappingError::missing(column))?;
        T::from_value(column, value)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_kind_from_sql_type() {
        assert_eq!(ValueKind::from_sql_type("INTEGER"), ValueKind::Integer);
        assert_eq!(ValueKind::from_sql_type("int"), ValueKind::Integer);
        assert_eq!(ValueKind::from_sql_type("BIGINT"), ValueKind::Integer);
        assert_eq!(ValueKind::from_sql_type("VARCHAR(300)"), ValueKind::Text);
        assert_eq!(ValueKind::from_sql_type("DOUBLE PRECISION"), ValueKind::Real);
        assert_eq!(ValueKind::from_sql_type("NUMERIC(10, 2)"), ValueKind::Real);
        assert_eq!(ValueKind::from_sql_type("TIMESTAMP"), ValueKind::Timestamp);
        assert_eq!(ValueKind::from_sql_type("boolean"), ValueKind::Boolean);
        assert_eq!(ValueKind::from_sql_type("BLOBBY"), ValueKind::Text);
    }

    #[test]
    fn test_option_into_value() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(7_i64)), Value::Integer(7));
        assert_eq!(Value::from("Widget"), Value::Text("Widget".to_string()));
    }

    #[test]
    fn test_record_typed_get() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let record = Record::new()
            .with("id", 3_i64)
            .with("price", 9.99)
            .with("name", "Widget")
            .with("note", None::<String>)
            .with("placed_at", at);

        assert_eq!(record.get::<i64>("id").unwrap(), 3);
        assert_eq!(record.get::<Option<i64>>("id").unwrap(), Some(3));
        assert_eq!(record.get::<f64>("price").unwrap(), 9.99);
        assert_eq!(record.get::<String>("name").unwrap(), "Widget");
        assert_eq!(record.get::<Option<String>>("note").unwrap(), None);
        assert_eq!(record.get::<DateTime<Utc>>("placed_at").unwrap(), at);
    }

    #[test]
    fn test_record_errors() {
        let record = Record::new().with("name", "Widget").with("stock", None::<i64>);

        assert_eq!(
            record.get::<i64>("missing"),
            Err(MappingError::missing("missing"))
        );
        assert!(matches!(
            record.get::<i64>("name"),
            Err(MappingError::TypeMismatch { expected: ValueKind::Integer, .. })
        ));
        assert!(matches!(
            record.get::<i64>("stock"),
            Err(MappingError::UnexpectedNull { .. })
        ));
    }

    #[test]
    fn test_record_insert_replaces() {
        let mut record = Record::new().with("stock", 10_i64);
        record.insert("stock", 7_i64);

        assert_eq!(record.len(), 1);
        assert_eq!(record.get::<i64>("stock").unwrap(), 7);
    }

    #[test]
    fn test_integer_widening_and_narrowing() {
        assert_eq!(f64::from_value("price", &Value::Integer(10)).unwrap(), 10.0);
        assert!(i32::from_value("qty", &Value::Integer(i64::MAX)).is_err());
        assert!(bool::from_value("flag", &Value::Integer(1)).unwrap());
    }
}
