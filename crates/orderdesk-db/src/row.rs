//! Parameter binding and row decoding between core [`Value`]s and sqlx.

use chrono::{DateTime, Utc};
use orderdesk_core::{mapper, Entity, EntityDescriptor, MappingError, Record, Value, ValueKind};
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Row, Sqlite};

/// Binds each value in order to the query's positional placeholders.
pub(crate) fn bind_values<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    values: &'q [Value],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for value in values {
        query = match value {
            Value::Null => query.bind(None::<i64>),
            Value::Integer(v) => query.bind(*v),
            Value::Real(v) => query.bind(*v),
            Value::Text(v) => query.bind(v.as_str()),
            Value::Boolean(v) => query.bind(*v),
            Value::Timestamp(v) => query.bind(*v),
        };
    }
    query
}

/// Reads the named columns of one row into a [`Record`].
///
/// Decoding is by declared kind, not by the store's reported type: SQLite
/// types values, not columns, and computed columns report none.
pub(crate) fn decode_row<'a>(
    row: &SqliteRow,
    columns: impl IntoIterator<Item = (&'a str, ValueKind)>,
) -> Result<Record, MappingError> {
    let mut record = Record::new();
    for (name, kind) in columns {
        record.insert(name, decode_value(row, name, kind)?);
    }
    Ok(record)
}

/// Decodes one row straight into an entity.
pub(crate) fn decode_entity<T: Entity>(
    row: &SqliteRow,
    descriptor: &EntityDescriptor<T>,
) -> Result<T, MappingError> {
    let record = decode_row(
        row,
        descriptor
            .columns()
            .iter()
            .map(|bound| (bound.name(), bound.column.kind())),
    )?;
    mapper::from_record(&record, descriptor)
}

fn decode_value(row: &SqliteRow, name: &str, kind: ValueKind) -> Result<Value, MappingError> {
    let decoded = match kind {
        ValueKind::Integer => row.try_get_unchecked::<Option<i64>, _>(name).map(Value::from),
        ValueKind::Real => row.try_get_unchecked::<Option<f64>, _>(name).map(Value::from),
        ValueKind::Text => row.try_get_unchecked::<Option<String>, _>(name).map(Value::from),
        ValueKind::Boolean => row.try_get_unchecked::<Option<bool>, _>(name).map(Value::from),
        ValueKind::Timestamp => row
            .try_get_unchecked::<Option<DateTime<Utc>>, _>(name)
            .map(Value::from),
    };

    decoded.map_err(|err| match err {
        sqlx::Error::ColumnNotFound(_) => MappingError::missing(name),
        other => MappingError::Decode {
            column: name.to_string(),
            message: other.to_string(),
        },
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::tests::test_db;
    use crate::EntityDao;
    use orderdesk_core::Product;

    #[tokio::test]
    async fn test_row_missing_column_is_mapping_error() {
        let db = test_db().await;
        db.products()
            .insert(&Product {
                id: None,
                name: "Widget".to_string(),
                price: 9.99,
                stock: 10,
            })
            .await
            .unwrap();

        let row = sqlx::query("SELECT id FROM products")
            .fetch_one(db.pool())
            .await
            .unwrap();
        let descriptor = Product::descriptor().unwrap();

        let err = decode_entity(&row, descriptor).unwrap_err();
        assert_eq!(err, MappingError::missing("name"));
    }

    #[tokio::test]
    async fn test_bound_values_round_trip_through_sqlite() {
        let db = test_db().await;
        let values = vec![Value::Integer(7), Value::Text("seven".to_string()), Value::Null];

        let row = bind_values(sqlx::query("SELECT ? AS n, ? AS label, ? AS gone"), &values)
            .fetch_one(db.pool())
            .await
            .unwrap();
        let record = decode_row(
            &row,
            [
                ("n", ValueKind::Integer),
                ("label", ValueKind::Text),
                ("gone", ValueKind::Text),
            ],
        )
        .unwrap();

        assert_eq!(record.get::<i64>("n").unwrap(), 7);
        assert_eq!(record.get::<String>("label").unwrap(), "seven");
        assert_eq!(record.get::<Option<String>>("gone").unwrap(), None);
    }
}
