//! # Database Error Types
//!
//! The error taxonomy every DAO operation reports.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  MetadataError ──┐    (before any I/O)                                 │
//! │  MappingError  ──┤    (row did not fit the entity)                     │
//! │  sqlx::Error   ──┤    (classified by From below)                       │
//! │                  ▼                                                      │
//! │  DbError (this module) ← one taxonomy, never swallowed                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Calling business layer ← decides on logging, retry, user message      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use orderdesk_core::{MappingError, MetadataError};
use sqlx::error::ErrorKind;
use thiserror::Error;

/// SQLite primary result code for every constraint failure, trigger aborts included.
const SQLITE_CONSTRAINT: i64 = 19;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// The entity type's declaration is malformed. No statement was sent.
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// A row could not become an entity.
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// Table or guard creation failed for a reason other than "already exists".
    #[error("Schema setup failed for {object}: {message}")]
    Schema { object: String, message: String },

    /// The store rejected the write.
    ///
    /// ## When This Occurs
    /// - An immutability guard fired
    /// - A foreign key points at a missing row
    /// - NOT NULL / UNIQUE / CHECK failed
    /// - A domain precondition failed (e.g. not enough stock)
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// The DAO for this entity forbids the operation. Raised before acquiring
    /// a connection.
    #[error("{operation} is not supported for {entity}")]
    UnsupportedOperation {
        operation: &'static str,
        entity: &'static str,
    },

    /// The connection provider could not supply or keep a connection.
    #[error("Connection failed: {0}")]
    Connectivity(String),

    /// The targeted row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Any other store failure.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Configuration could not be loaded.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates an UnsupportedOperation error.
    pub fn unsupported(operation: &'static str, entity: &'static str) -> Self {
        DbError::UnsupportedOperation { operation, entity }
    }

    /// Re-tags a generic query failure raised while creating `object` as a
    /// schema failure. Constraint, connectivity and other errors pass through.
    pub fn into_schema(self, object: impl Into<String>) -> Self {
        match self {
            DbError::QueryFailed(message) => DbError::Schema {
                object: object.into(),
                message,
            },
            other => other,
        }
    }

    /// True for store-side rejections and for operations a DAO forbids.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            DbError::ConstraintViolation(_) | DbError::UnsupportedOperation { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound { .. })
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// Database (UNIQUE/FK/NOT NULL/CHECK, trigger abort)  → ConstraintViolation
/// Database (anything else)                            → QueryFailed
/// PoolTimedOut / PoolClosed / Io / Tls / Configuration → Connectivity
/// RowNotFound                                         → NotFound
/// ColumnNotFound / ColumnDecode / Decode              → Mapping
/// Other                                               → QueryFailed
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                let primary_code = db_err
                    .code()
                    .and_then(|code| code.parse::<i64>().ok())
                    .map(|code| code & 0xff);

                let is_constraint = matches!(
                    db_err.kind(),
                    ErrorKind::UniqueViolation
                        | ErrorKind::ForeignKeyViolation
                        | ErrorKind::NotNullViolation
                        | ErrorKind::CheckViolation
                ) || primary_code == Some(SQLITE_CONSTRAINT)
                    || message.contains("constraint failed")
                    || message.ends_with("is immutable");

                if is_constraint {
                    DbError::ConstraintViolation(message)
                } else {
                    DbError::QueryFailed(message)
                }
            }

            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),

            sqlx::Error::PoolTimedOut => {
                DbError::Connectivity("Timed out waiting for a pooled connection".to_string())
            }

            sqlx::Error::PoolClosed => DbError::Connectivity("Pool is closed".to_string()),

            sqlx::Error::Io(io_err) => DbError::Connectivity(io_err.to_string()),

            err @ (sqlx::Error::Tls(_) | sqlx::Error::Configuration(_)) => {
                DbError::Connectivity(err.to_string())
            }

            sqlx::Error::ColumnNotFound(column) => MappingError::missing(column).into(),

            sqlx::Error::ColumnDecode { index, source } => MappingError::Decode {
                column: index,
                message: source.to_string(),
            }
            .into(),

            sqlx::Error::Decode(source) => MappingError::Decode {
                column: "unknown".to_string(),
                message: source.to_string(),
            }
            .into(),

            other => DbError::QueryFailed(other.to_string()),
        }
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================
