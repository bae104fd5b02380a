//! # Entity Mapper
//!
//! Entity → parameter list, and record → entity, driven by the same
//! bound columns the statement builder uses.
//!
//! ```text
//!   entity ──to_params──► [Value; C]          (descriptor order)
//!   Record ──from_record──► check every column present ──► T::from_record
//! ```

use crate::error::MappingError;
use crate::metadata::{BoundColumn, Entity, EntityDescriptor};
use crate::value::{Record, Value};

/// Reads each column's value from `entity`, in the order given.
pub fn to_params<'a, T: 'a>(
    entity: &T,
    columns: impl IntoIterator<Item = &'a BoundColumn<T>>,
) -> Vec<Value> {
    columns.into_iter().map(|bound| bound.read(entity)).collect()
}

/// Parameters for INSERT and the SET clause of UPDATE: every column but the key.
pub fn to_params_without_key<T>(entity: &T, descriptor: &EntityDescriptor<T>) -> Vec<Value> {
    to_params(entity, descriptor.non_key_columns())
}

/// Every column value, key included, as a [`Record`].
pub fn to_record<T>(entity: &T, descriptor: &EntityDescriptor<T>) -> Record {
    let mut record = Record::with_capacity(descriptor.columns().len());
    for bound in descriptor.columns() {
        record.insert(bound.name(), bound.read(entity));
    }
    record
}

/// Builds one entity from a decoded row.
///
/// Every declared column must be present in the record. Extra columns are
/// ignored. Mapping the same record twice yields equal entities.
///
/// ## Returns
/// * `Err(MappingError::MissingColumn)` - A declared column is absent
/// * `Err(MappingError)` - Whatever `T::from_record` reports
pub fn from_record<T: Entity>(
    record: &Record,
    descriptor: &EntityDescriptor<T>,
) -> Result<T, MappingError> {
    if let Some(missing) = descriptor
        .columns()
        .iter()
        .find(|bound| !record.contains(bound.name()))
    {
        return Err(MappingError::missing(missing.name()));
    }

    T::from_record(record)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Client, Product};

    fn widget() -> Product {
        Product {
            id: Some(1),
            name: "Widget".to_string(),
            price: 9.99,
            stock: 10,
        }
    }

    #[test]
    fn test_to_params_descriptor_order() {
        let descriptor = Product::descriptor().unwrap();

        assert_eq!(
            to_params_without_key(&widget(), descriptor),
            vec![
                Value::Text("Widget".to_string()),
                Value::Real(9.99),
                Value::Integer(10)
            ]
        );
        assert_eq!(
            to_params(&widget(), descriptor.columns()).first(),
            Some(&Value::Integer(1))
        );
    }

    #[test]
    fn test_record_round_trip_is_deterministic() {
        let descriptor = Product::descriptor().unwrap();
        let record = to_record(&widget(), descriptor);

        let first = from_record(&record, descriptor).unwrap();
        let second = from_record(&record, descriptor).unwrap();

        assert_eq!(first, widget());
        assert_eq!(first, second);
    }

    #[test]
    fn test_from_record_missing_column() {
        let descriptor = Client::descriptor().unwrap();
        let record = Record::new()
            .with("id", 1_i64)
            .with("first_name", "Ada")
            .with("last_name", "Lovelace")
            .with("address", "12 Analytical St");

        assert_eq!(
            from_record(&record, descriptor),
            Err(MappingError::missing("email"))
        );
    }

    #[test]
    fn test_from_record_ignores_extra_columns() {
        let descriptor = Product::descriptor().unwrap();
        let record = to_record(&widget(), descriptor).with("rank", 3_i64);

        assert_eq!(from_record(&record, descriptor).unwrap(), widget());
    }
}
