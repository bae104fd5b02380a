//! # Error Types
//!
//! Error types for the pure half of the data layer.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  orderdesk-core errors (this file)                                     │
//! │  ├── MetadataError   - Entity declaration is absent or malformed       │
//! │  └── MappingError    - Row ↔ entity conversion failed                  │
//! │                                                                         │
//! │  orderdesk-db errors (separate crate)                                  │
//! │  └── DbError         - Wraps both, plus store/connection failures      │
//! │                                                                         │
//! │  Flow: MetadataError / MappingError → DbError → calling business layer │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both enums are raised before or after I/O, never during it: a
//! `MetadataError` means no statement was ever sent, a `MappingError` means
//! the store answered but its answer did not fit the entity.

use thiserror::Error;

use crate::value::ValueKind;

// =============================================================================
// Metadata Error
// =============================================================================

/// The entity type's declaration cannot be turned into a descriptor.
///
/// Fatal to every operation on that type. Raised at introspection time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    /// The declaration names no table (or a blank one).
    #[error("{entity} declares no table")]
    MissingTable { entity: &'static str },

    /// Exactly one primary-key column is required.
    ///
    /// ## When This Occurs
    /// - No column is marked `primary_key()`
    /// - Two or more are (composite keys are rejected, never silently
    ///   narrowed to the first one)
    #[error("{entity} must declare exactly one primary key column, found {found}")]
    MissingPrimaryKey { entity: &'static str, found: usize },

    /// The declaration has no columns at all.
    #[error("{entity} declares no columns")]
    NoColumns { entity: &'static str },

    /// Two columns share a name (compared case-insensitively, as SQLite does).
    #[error("{entity} declares column '{column}' more than once")]
    DuplicateColumn { entity: &'static str, column: String },

    /// Only one half of a foreign-key target was given.
    #[error("{entity}.{column} must name both a foreign key table and column, or neither")]
    IncompleteForeignKey { entity: &'static str, column: String },

    /// A table, column, or foreign-key name is not a plain SQL identifier.
    #[error("{entity} uses invalid identifier '{identifier}'")]
    InvalidIdentifier {
        entity: &'static str,
        identifier: String,
    },

    /// A caller referenced a column the entity does not declare.
    #[error("{entity} has no column '{column}'")]
    UnknownColumn { entity: &'static str, column: String },
}

// =============================================================================
// Mapping Error
// =============================================================================

/// A row could not become an entity, or a value could not become a field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MappingError {
    /// A column present in the metadata is absent from the result row.
    #[error("column '{column}' is missing from the row")]
    MissingColumn { column: String },

    /// The stored value has a different kind than the field expects.
    #[error("column '{column}' expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: ValueKind,
        found: String,
    },

    /// A NULL arrived for a field that cannot hold one.
    #[error("column '{column}' is NULL but the field is not optional")]
    UnexpectedNull { column: String },

    /// The driver could not decode the stored value.
    #[error("column '{column}' could not be decoded: {message}")]
    Decode { column: String, message: String },
}

impl MappingError {
    /// Creates a MissingColumn error.
    pub fn missing(column: impl Into<String>) -> Self {
        MappingError::MissingColumn {
            column: column.into(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = MetadataError::MissingPrimaryKey {
            entity: "Product",
            found: 2,
        };
        assert_eq!(
            err.to_string(),
            "Product must declare exactly one primary key column, found 2"
        );

        let err = MappingError::TypeMismatch {
            column: "price".to_string(),
            expected: ValueKind::Real,
            found: "TEXT".to_string(),
        };
        assert_eq!(err.to_string(), "column 'price' expected REAL, found TEXT");
    }

    #[test]
    fn test_missing_helper() {
        assert_eq!(
            MappingError::missing("stock"),
            MappingError::MissingColumn {
                column: "stock".to_string()
            }
        );
    }
}
