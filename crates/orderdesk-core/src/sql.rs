//! # SQL Statement Builder
//!
//! Pure text generation from an [`EntityDescriptor`]. Nothing in here
//! touches a connection.
//!
//! ## Statement Shapes (SQLite)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CREATE TABLE IF NOT EXISTS products (                                  │
//! │      id INTEGER,                          ← key: always INTEGER         │
//! │      name VARCHAR(300) NOT NULL,          ← declared type + nullability │
//! │      ...,                                                               │
//! │      PRIMARY KEY (id),                    ← makes id the rowid alias    │
//! │      FOREIGN KEY (x) REFERENCES t(y)      ← one per FK column           │
//! │  )                                                                      │
//! │                                                                         │
//! │  INSERT INTO products (name, price, stock)                              │
//! │      VALUES (?, ?, ?), (?, ?, ?)          ← K groups, K×C params        │
//! │                                                                         │
//! │  SELECT id, name, price, stock FROM products WHERE id = ?               │
//! │  SELECT id, name, price, stock FROM products ORDER BY id ASC            │
//! │  UPDATE products SET name = ?, price = ?, stock = ? WHERE id = ?        │
//! │  DELETE FROM products WHERE id = ?                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Reuse
//! A rowid-alias key is `max(id) + 1` on insert, so deleting the row that
//! holds the highest key frees that key for the next insert. Stores with
//! a never-reused identity column behave differently. A reference without
//! a foreign key, such as `bills.order_id`, can therefore end up pointing
//! at a newer row once its target is deleted.
//!
//! Identifiers are spliced in as-is. That is sound because introspection
//! only lets plain `[A-Za-z_][A-Za-z0-9_]*` identifiers through.

use crate::error::MetadataError;
use crate::mapper;
use crate::metadata::{BoundColumn, EntityDescriptor};
use crate::value::Value;

// =============================================================================
// Statement
// =============================================================================

/// SQL text plus its positional parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Statement {
            sql: sql.into(),
            params,
        }
    }

    /// Number of `?` placeholders in the text.
    pub fn placeholder_count(&self) -> usize {
        self.sql.matches('?').count()
    }
}

// =============================================================================
// CREATE TABLE
// =============================================================================

/// The clauses inside `CREATE TABLE (...)`, in order: one per column, the
/// primary key constraint, then one per foreign key.
pub fn create_table_clauses<T>(descriptor: &EntityDescriptor<T>) -> Vec<String> {
    let mut clauses = Vec::with_capacity(descriptor.columns().len() + 1);

    for bound in descriptor.columns() {
        let column = &bound.column;
        if column.is_primary_key {
            // Declared type ignored: the key is always the integer rowid alias
            clauses.push(format!("{} INTEGER", column.name));
        } else if column.is_nullable {
            clauses.push(format!("{} {}", column.name, column.sql_type));
        } else {
            clauses.push(format!("{} {} NOT NULL", column.name, column.sql_type));
        }
    }

    clauses.push(format!("PRIMARY KEY ({})", descriptor.primary_key().name()));

    for bound in descriptor.foreign_key_columns() {
        if let Some((table, column)) = bound.column.foreign_key() {
            clauses.push(format!(
                "FOREIGN KEY ({}) REFERENCES {}({})",
                bound.name(),
                table,
                column
            ));
        }
    }

    clauses
}

/// `CREATE TABLE IF NOT EXISTS` for the entity's table.
pub fn create_table<T>(descriptor: &EntityDescriptor<T>) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        descriptor.table_name(),
        create_table_clauses(descriptor).join(", ")
    )
}

// =============================================================================
// INSERT
// =============================================================================

/// Multi-row INSERT text for `rows` entities, key column omitted.
/// `rows` is at least 1.
///
/// An entity whose only column is the key inserts `(key) VALUES (NULL)`
/// groups so the store still generates one key per row.
fn insert_sql<T>(descriptor: &EntityDescriptor<T>, rows: usize) -> String {
    let columns: Vec<&str> = descriptor.non_key_columns().map(BoundColumn::name).collect();

    let (column_list, group) = if columns.is_empty() {
        (descriptor.primary_key().name().to_string(), "(NULL)".to_string())
    } else {
        (columns.join(", "), placeholder_group(columns.len()))
    };

    let groups = vec![group; rows].join(", ");

    format!(
        "INSERT INTO {} ({}) VALUES {}",
        descriptor.table_name(),
        column_list,
        groups
    )
}

/// Single-row INSERT.
pub fn insert<T>(descriptor: &EntityDescriptor<T>, entity: &T) -> Statement {
    Statement::new(
        insert_sql(descriptor, 1),
        mapper::to_params_without_key(entity, descriptor),
    )
}

/// One INSERT carrying every entity: K groups, K×C parameters, input order.
///
/// ## Returns
/// * `Some(Statement)` - For one or more entities
/// * `None` - For an empty slice, which has no valid INSERT
///
/// ## Example
/// ```rust,ignore
/// let stmt = sql::insert_batch(Product::descriptor()?, &products).unwrap();
/// assert_eq!(stmt.params.len(), products.len() * 3);
/// ```
pub fn insert_batch<T>(descriptor: &EntityDescriptor<T>, entities: &[T]) -> Option<Statement> {
    if entities.is_empty() {
        return None;
    }

    let params = entities
        .iter()
        .flat_map(|entity| mapper::to_params_without_key(entity, descriptor))
        .collect();

    Some(Statement::new(insert_sql(descriptor, entities.len()), params))
}

// =============================================================================
// SELECT
// =============================================================================

/// Comma-separated column list in declaration order.
pub fn column_list<T>(descriptor: &EntityDescriptor<T>) -> String {
    descriptor
        .columns()
        .iter()
        .map(BoundColumn::name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// SELECT one row by primary key.
pub fn select_by_key<T>(descriptor: &EntityDescriptor<T>, key: i64) -> Statement {
    Statement::new(
        format!(
            "SELECT {} FROM {} WHERE {} = ?",
            column_list(descriptor),
            descriptor.table_name(),
            descriptor.primary_key().name()
        ),
        vec![Value::Integer(key)],
    )
}

/// SELECT every row, ordered by primary key ascending.
pub fn select_all<T>(descriptor: &EntityDescriptor<T>) -> String {
    format!(
        "SELECT {} FROM {} ORDER BY {} ASC",
        column_list(descriptor),
        descriptor.table_name(),
        descriptor.primary_key().name()
    )
}

/// SELECT rows whose `column` equals `value`, ordered by primary key.
///
/// ## Returns
/// * `Err(MetadataError::UnknownColumn)` - Entity declares no such column
pub fn select_where<T>(
    descriptor: &EntityDescriptor<T>,
    column: &str,
    value: Value,
) -> Result<Statement, MetadataError> {
    let column = descriptor.column(column)?;

    Ok(Statement::new(
        format!(
            "SELECT {} FROM {} WHERE {} = ? ORDER BY {} ASC",
            column_list(descriptor),
            descriptor.table_name(),
            column.name(),
            descriptor.primary_key().name()
        ),
        vec![value],
    ))
}

pub fn count<T>(descriptor: &EntityDescriptor<T>) -> String {
    format!("SELECT COUNT(*) FROM {}", descriptor.table_name())
}

/// Highest key in the table; NULL when empty.
pub fn max_key<T>(descriptor: &EntityDescriptor<T>) -> String {
    format!(
        "SELECT MAX({}) FROM {}",
        descriptor.primary_key().name(),
        descriptor.table_name()
    )
}

// =============================================================================
// UPDATE / DELETE
// =============================================================================

/// UPDATE every non-key column by primary key. The key parameter is last.
///
/// Immutable columns are still written. Their guard only rejects a
/// changed value, so rewriting the stored value passes.
pub fn update<T>(descriptor: &EntityDescriptor<T>, entity: &T) -> Statement {
    let key = descriptor.primary_key();
    let assignments: Vec<String> = descriptor
        .non_key_columns()
        .map(|bound| format!("{} = ?", bound.name()))
        .collect();

    let set_clause = if assignments.is_empty() {
        format!("{} = {}", key.name(), key.name())
    } else {
        assignments.join(", ")
    };

    let mut params = mapper::to_params_without_key(entity, descriptor);
    params.push(key.read(entity));

    Statement::new(
        format!(
            "UPDATE {} SET {} WHERE {} = ?",
            descriptor.table_name(),
            set_clause,
            key.name()
        ),
        params,
    )
}

pub fn delete<T>(descriptor: &EntityDescriptor<T>, key: i64) -> Statement {
    Statement::new(
        format!(
            "DELETE FROM {} WHERE {} = ?",
            descriptor.table_name(),
            descriptor.primary_key().name()
        ),
        vec![Value::Integer(key)],
    )
}

// =============================================================================
// Immutability Guards
// =============================================================================

/// Looks a trigger up by name. Bind the guard name.
pub const GUARD_EXISTS_SQL: &str = "SELECT 1 FROM sqlite_master WHERE type = 'trigger' AND name = ?";

/// Deterministic guard name for `(table, column)`, lower-cased.
pub fn guard_name(table: &str, column: &str) -> String {
    format!("prevent_update_{}_{}", table, column).to_ascii_lowercase()
}

/// Trigger that aborts any UPDATE changing `column`'s value.
///
/// `IS NOT` compares NULLs as values, so NULL → 'x' is a change too.
pub fn create_guard(table: &str, column: &str) -> String {
    format!(
        "CREATE TRIGGER IF NOT EXISTS {name} BEFORE UPDATE OF {column} ON {table} \
         FOR EACH ROW WHEN NEW.{column} IS NOT OLD.{column} \
         BEGIN SELECT RAISE(ABORT, '{column} is immutable'); END",
        name = guard_name(table, column),
        column = column,
        table = table
    )
}

fn placeholder_group(width: usize) -> String {
    format!("({})", vec!["?"; width].join(", "))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Entity;
    use crate::model::{Bill, Order, Product};
    use chrono::{TimeZone, Utc};

    fn widget(name: &str, stock: i64) -> Product {
        Product {
            id: None,
            name: name.to_string(),
            price: 9.99,
            stock,
        }
    }

    #[test]
    fn test_create_table_product() {
        let descriptor = Product::descriptor().unwrap();

        assert_eq!(
            create_table(descriptor),
            "CREATE TABLE IF NOT EXISTS products (id INTEGER, name VARCHAR(300) NOT NULL, \
             price DOUBLE PRECISION NOT NULL, stock INTEGER NOT NULL, PRIMARY KEY (id))"
        );
    }

    #[test]
    fn test_create_table_clause_counts() {
        let descriptor = Order::descriptor().unwrap();
        let clauses = create_table_clauses(descriptor);

        let non_key = descriptor.non_key_columns().count();
        let foreign_keys = descriptor.foreign_key_columns().count();
        assert_eq!(non_key, 5);
        assert_eq!(foreign_keys, 2);

        let primary = clauses.iter().filter(|c| c.starts_with("PRIMARY KEY")).count();
        let foreign = clauses.iter().filter(|c| c.starts_with("FOREIGN KEY")).count();
        assert_eq!(clauses.len(), (non_key + 1) + 1 + foreign_keys);
        assert_eq!(primary, 1);
        assert_eq!(foreign, 2);
        assert!(clauses.contains(&"FOREIGN KEY (client_id) REFERENCES clients(id)".to_string()));
    }

    #[test]
    fn test_insert_batch_groups_and_params() {
        let descriptor = Product::descriptor().unwrap();
        let products = vec![widget("a", 1), widget("b", 2), widget("c", 3)];

        let stmt = insert_batch(descriptor, &products).unwrap();

        assert_eq!(
            stmt.sql,
            "INSERT INTO products (name, price, stock) VALUES (?, ?, ?), (?, ?, ?), (?, ?, ?)"
        );
        assert_eq!(stmt.params.len(), 3 * 3);
        assert_eq!(stmt.placeholder_count(), stmt.params.len());
        // Entity by entity, column by column
        assert_eq!(stmt.params[0], Value::Text("a".to_string()));
        assert_eq!(stmt.params[3], Value::Text("b".to_string()));
        assert_eq!(stmt.params[8], Value::Integer(3));
    }

    #[test]
    fn test_insert_batch_empty_has_no_statement() {
        let descriptor = Product::descriptor().unwrap();

        assert!(insert_batch(descriptor, &[]).is_none());

        let single = insert_batch(descriptor, &[widget("a", 1)]).unwrap();
        assert_eq!(single, insert(descriptor, &widget("a", 1)));
    }

    #[test]
    fn test_insert_skips_key_even_when_set() {
        let descriptor = Product::descriptor().unwrap();
        let mut product = widget("Widget", 10);
        product.id = Some(42);

        let stmt = insert(descriptor, &product);

        assert!(!stmt.params.contains(&Value::Integer(42)));
        assert_eq!(stmt.params.len(), 3);
    }

    #[test]
    fn test_select_statements() {
        let descriptor = Product::descriptor().unwrap();

        let by_key = select_by_key(descriptor, 5);
        assert_eq!(
            by_key.sql,
            "SELECT id, name, price, stock FROM products WHERE id = ?"
        );
        assert_eq!(by_key.params, vec![Value::Integer(5)]);

        assert_eq!(
            select_all(descriptor),
            "SELECT id, name, price, stock FROM products ORDER BY id ASC"
        );
        assert_eq!(count(descriptor), "SELECT COUNT(*) FROM products");
        assert_eq!(max_key(descriptor), "SELECT MAX(id) FROM products");
    }

    #[test]
    fn test_select_where_unknown_column() {
        let descriptor = Bill::descriptor().unwrap();

        let stmt = select_where(descriptor, "order_id", Value::Integer(3)).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT id, order_id, amount, timestamp FROM bills WHERE order_id = ? ORDER BY id ASC"
        );

        // Matched like SQLite matches identifiers; the declared spelling is emitted
        let mixed = select_where(descriptor, "Order_ID", Value::Integer(3)).unwrap();
        assert_eq!(mixed, stmt);

        assert!(matches!(
            select_where(descriptor, "nope", Value::Null),
            Err(MetadataError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn test_update_key_param_last() {
        let descriptor = Product::descriptor().unwrap();
        let mut product = widget("Widget", 7);
        product.id = Some(11);

        let stmt = update(descriptor, &product);

        assert_eq!(
            stmt.sql,
            "UPDATE products SET name = ?, price = ?, stock = ? WHERE id = ?"
        );
        assert_eq!(stmt.params.last(), Some(&Value::Integer(11)));
        assert_eq!(stmt.params.len(), 4);
    }

    #[test]
    fn test_delete() {
        let descriptor = Order::descriptor().unwrap();
        let stmt = delete(descriptor, 2);

        assert_eq!(stmt.sql, "DELETE FROM orders WHERE id = ?");
        assert_eq!(stmt.params, vec![Value::Integer(2)]);
    }

    #[test]
    fn test_guard_text() {
        assert_eq!(guard_name("Bills", "Amount"), "prevent_update_bills_amount");

        let ddl = create_guard("bills", "amount");
        assert!(ddl.starts_with("CREATE TRIGGER IF NOT EXISTS prevent_update_bills_amount"));
        assert!(ddl.contains("BEFORE UPDATE OF amount ON bills"));
        assert!(ddl.contains("WHEN NEW.amount IS NOT OLD.amount"));
        assert!(ddl.contains("RAISE(ABORT, 'amount is immutable')"));
    }

    #[test]
    fn test_bill_params_follow_declaration() {
        let descriptor = Bill::descriptor().unwrap();
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let bill = Bill {
            id: None,
            order_id: 4,
            amount: 19.98,
            timestamp: at,
        };

        let stmt = insert(descriptor, &bill);

        assert_eq!(
            stmt.params,
            vec![Value::Integer(4), Value::Real(19.98), Value::Timestamp(at)]
        );
    }
}
