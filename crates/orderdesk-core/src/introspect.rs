//! # Schema Introspection
//!
//! Turns an entity type's static declaration into a validated
//! [`EntityDescriptor`].
//!
//! ## Validation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  T::declare()                                                           │
//! │     │                                                                   │
//! │     ├── table present and non-blank?        else MissingTable           │
//! │     ├── table is a plain identifier?        else InvalidIdentifier      │
//! │     ├── at least one column?                else NoColumns              │
//! │     ├── per column:                                                     │
//! │     │     name is a plain identifier?       else InvalidIdentifier      │
//! │     │     name unique (case-insensitive)?   else DuplicateColumn        │
//! │     │     FK table/column both or neither?  else IncompleteForeignKey   │
//! │     │     FK names plain identifiers?       else InvalidIdentifier      │
//! │     └── exactly one primary key?            else MissingPrimaryKey      │
//! │                                                                         │
//! │  → EntityDescriptor<T>                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Caching
//! [`describe_cached`] validates each type once and hands out a `&'static`
//! descriptor for the rest of the process. Descriptors are immutable and
//! never freed.

use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::{OnceLock, PoisonError, RwLock};

use crate::error::MetadataError;
use crate::metadata::{Entity, EntityDescriptor};

type DescriptorCache = RwLock<HashMap<TypeId, &'static (dyn Any + Send + Sync)>>;

static CACHE: OnceLock<DescriptorCache> = OnceLock::new();

// =============================================================================
// Describe
// =============================================================================

/// Validates `T`'s declaration and builds a fresh descriptor.
///
/// Pure: calling it twice yields descriptors with identical content.
/// Prefer [`Entity::descriptor`], which caches the result.
///
/// ## Returns
/// * `Ok(EntityDescriptor<T>)` - Declaration is well-formed
/// * `Err(MetadataError)` - First problem found, see module docs for order
pub fn describe<T: Entity>() -> Result<EntityDescriptor<T>, MetadataError> {
    let entity = entity_name::<T>();
    let declaration = T::declare();

    let table = match declaration.table {
        Some(table) if !table.name.trim().is_empty() => table,
        _ => return Err(MetadataError::MissingTable { entity }),
    };
    check_identifier(entity, &table.name)?;

    if declaration.columns.is_empty() {
        return Err(MetadataError::NoColumns { entity });
    }

    let mut seen = HashSet::with_capacity(declaration.columns.len());
    let mut keys = Vec::new();

    for (index, bound) in declaration.columns.iter().enumerate() {
        let column = &bound.column;
        check_identifier(entity, &column.name)?;

        if !seen.insert(column.name.to_ascii_lowercase()) {
            return Err(MetadataError::DuplicateColumn {
                entity,
                column: column.name.clone(),
            });
        }

        match (&column.foreign_key_table, &column.foreign_key_column) {
            (Some(fk_table), Some(fk_column)) => {
                check_identifier(entity, fk_table)?;
                check_identifier(entity, fk_column)?;
            }
            (None, None) => {}
            _ => {
                return Err(MetadataError::IncompleteForeignKey {
                    entity,
                    column: column.name.clone(),
                })
            }
        }

        if column.is_primary_key {
            keys.push(index);
        }
    }

    let primary_key = match keys.as_slice() {
        [key] => *key,
        _ => {
            return Err(MetadataError::MissingPrimaryKey {
                entity,
                found: keys.len(),
            })
        }
    };

    Ok(EntityDescriptor {
        entity,
        table,
        columns: declaration.columns,
        primary_key,
    })
}

/// Returns the process-wide descriptor for `T`, building it on first use.
///
/// A failed declaration is not cached; every call reports the error again.
pub fn describe_cached<T: Entity>() -> Result<&'static EntityDescriptor<T>, MetadataError> {
    let cache = CACHE.get_or_init(|| RwLock::new(HashMap::new()));
    let key = TypeId::of::<T>();

    if let Some(found) = cache
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return Ok(downcast(*found));
    }

    let descriptor = describe::<T>()?;

    let mut map = cache.write().unwrap_or_else(PoisonError::into_inner);
    // Another thread may have won the race; its descriptor has the same content
    let entry = map.entry(key).or_insert_with(|| {
        let leaked: &'static EntityDescriptor<T> = Box::leak(Box::new(descriptor));
        leaked as &'static (dyn Any + Send + Sync)
    });

    Ok(downcast(*entry))
}

fn downcast<T: Entity>(entry: &'static (dyn Any + Send + Sync)) -> &'static EntityDescriptor<T> {
    match entry.downcast_ref::<EntityDescriptor<T>>() {
        Some(descriptor) => descriptor,
        None => unreachable!("descriptor cache keyed by TypeId holds a foreign type"),
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Short type name (`Product`, not `orderdesk_core::model::Product`).
pub(crate) fn entity_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

/// True for `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check_identifier(entity: &'static str, name: &str) -> Result<(), MetadataError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(MetadataError::InvalidIdentifier {
            entity,
            identifier: name.to_string(),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
