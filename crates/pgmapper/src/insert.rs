//! INSERT statement building for row objects.
//!
//! Two shapes are produced:
//!
//! - a multi-row bulk insert, with `$k` numbering continuous across the batch:
//!   `INSERT INTO t (a, b) VALUES ($1, $2), ($3, $4)`
//! - a single-row insert with a `RETURNING` clause, numbering from `$1` per row:
//!   `INSERT INTO t (a, b) VALUES ($1, $2) RETURNING id`
//!
//! Values are read from each [`Record`] through the ordered [`FieldMapping`]s;
//! a row that lacks a mapped field binds NULL for that column.

use crate::error::{MapperError, MapperResult};
use crate::mapping::FieldMapping;
use crate::value::{Record, Value};
use std::fmt::Write;

/// Maximum number of bind parameters in one PostgreSQL statement.
pub const MAX_BIND_PARAMS: usize = 65_535;

static NULL: Value = Value::Null;

/// A bulk insert ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement<'r> {
    pub sql: String,
    /// Row values flattened in placeholder order.
    pub args: Vec<&'r Value>,
}

/// A single-row `RETURNING` insert ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturningInsert<'r, 'm> {
    pub sql: String,
    pub args: Vec<&'r Value>,
    /// Generated columns in `RETURNING` order; the returned values are written
    /// back to these object fields.
    pub generated: &'m [FieldMapping],
}

fn column_list(mappings: &[FieldMapping]) -> String {
    mappings
        .iter()
        .map(|m| m.data_field.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Append `($start, $start+1, ...)` for one row and collect its values.
fn push_row<'r>(
    sql: &mut String,
    columns: &[FieldMapping],
    row: &'r Record,
    start: usize,
    args: &mut Vec<&'r Value>,
) {
    sql.push('(');
    for (i, mapping) in columns.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        let _ = write!(sql, "${}", start + i);
        args.push(row.get(&mapping.object_field).unwrap_or(&NULL));
    }
    sql.push(')');
}

fn check_bind_limit(count: usize) -> MapperResult<()> {
    if count > MAX_BIND_PARAMS {
        return Err(MapperError::TooManyParameters(count));
    }
    Ok(())
}

/// Build one multi-row INSERT for `rows`.
///
/// Placeholders are numbered continuously across the whole batch, so row 2
/// starts where row 1 ended. The caller is expected to skip empty batches and
/// to split batches with [`rows_per_statement`]; a batch needing more than
/// [`MAX_BIND_PARAMS`] values fails with [`MapperError::TooManyParameters`].
pub fn build_bulk_insert<'r>(
    table: &str,
    columns: &[FieldMapping],
    rows: &'r [Record],
) -> MapperResult<InsertStatement<'r>> {
    check_bind_limit(rows.len() * columns.len())?;
    let mut sql = format!("INSERT INTO {} ({}) VALUES ", table, column_list(columns));
    let mut args = Vec::with_capacity(rows.len() * columns.len());

    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        push_row(&mut sql, columns, row, args.len() + 1, &mut args);
    }

    Ok(InsertStatement { sql, args })
}

/// Build a single-row INSERT with a `RETURNING` clause for the generated columns.
pub fn build_returning_insert<'r, 'm>(
    table: &str,
    columns: &[FieldMapping],
    generated: &'m [FieldMapping],
    row: &'r Record,
) -> MapperResult<ReturningInsert<'r, 'm>> {
    check_bind_limit(columns.len())?;
    let mut sql = format!("INSERT INTO {} ({}) VALUES ", table, column_list(columns));
    let mut args = Vec::with_capacity(columns.len());
    push_row(&mut sql, columns, row, 1, &mut args);
    let _ = write!(sql, " RETURNING {}", column_list(generated));

    Ok(ReturningInsert {
        sql,
        args,
        generated,
    })
}

/// Write `RETURNING` values back into `row`, positionally matched to `generated`.
pub fn apply_generated(
    row: &mut Record,
    generated: &[FieldMapping],
    values: Vec<Value>,
) -> MapperResult<()> {
    if values.len() != generated.len() {
        return Err(MapperError::decode(
            "RETURNING",
            format!(
                "expected {} generated values, got {}",
                generated.len(),
                values.len()
            ),
        ));
    }

    for (mapping, value) in generated.iter().zip(values) {
        row.insert(mapping.object_field.clone(), value);
    }
    Ok(())
}

/// How many rows fit in one bulk statement without exceeding [`MAX_BIND_PARAMS`].
///
/// Never less than 1. A single row wider than the limit still cannot be sent;
/// [`build_bulk_insert`] rejects it.
pub fn rows_per_statement(column_count: usize) -> usize {
    (MAX_BIND_PARAMS / column_count.max(1)).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_columns() -> Vec<FieldMapping> {
        vec![
            FieldMapping::new("Name", "name"),
            FieldMapping::new("Email", "email"),
        ]
    }

    fn user(name: &str, email: &str) -> Record {
        Record::new().with("Name", name).with("Email", email)
    }

    #[test]
    fn bulk_numbering_continues_across_rows() {
        let rows = vec![user("a", "a@x"), user("b", "b@x")];
        let stmt = build_bulk_insert("users", &user_columns(), &rows).unwrap();

        assert_eq!(
            stmt.sql,
            "INSERT INTO users (name, email) VALUES ($1, $2), ($3, $4)"
        );
        assert_eq!(
            stmt.args,
            vec![
                &Value::from("a"),
                &Value::from("a@x"),
                &Value::from("b"),
                &Value::from("b@x"),
            ]
        );
    }

    #[test]
    fn bulk_single_row() {
        let rows = vec![user("a", "a@x")];
        let stmt = build_bulk_insert("users", &user_columns(), &rows).unwrap();
        assert_eq!(stmt.sql, "INSERT INTO users (name, email) VALUES ($1, $2)");
        assert_eq!(stmt.args.len(), 2);
    }

    #[test]
    fn bulk_follows_mapping_order_not_record_order() {
        let columns = vec![FieldMapping::same("z"), FieldMapping::same("a")];
        let rows = vec![Record::new().with("a", 1).with("z", 2)];
        let stmt = build_bulk_insert("t", &columns, &rows).unwrap();
        assert_eq!(stmt.sql, "INSERT INTO t (z, a) VALUES ($1, $2)");
        assert_eq!(stmt.args, vec![&Value::Int(2), &Value::Int(1)]);
    }

    #[test]
    fn bulk_binds_null_for_absent_field() {
        let columns = vec![FieldMapping::same("name"), FieldMapping::same("bio")];
        let rows = vec![Record::new().with("name", "a")];
        let stmt = build_bulk_insert("users", &columns, &rows).unwrap();
        assert_eq!(stmt.sql, "INSERT INTO users (name, bio) VALUES ($1, $2)");
        assert_eq!(stmt.args, vec![&Value::from("a"), &Value::Null]);
    }

    #[test]
    fn returning_binds_null_for_absent_field() {
        let generated = vec![FieldMapping::new("ID", "id")];
        let row = Record::new().with("Name", "b");
        let stmt = build_returning_insert("users", &user_columns(), &generated, &row).unwrap();
        assert_eq!(stmt.args, vec![&Value::from("b"), &Value::Null]);
    }

    #[test]
    fn statements_over_bind_limit_are_rejected() {
        let wide: Vec<FieldMapping> = (0..MAX_BIND_PARAMS + 1)
            .map(|i| FieldMapping::same(format!("c{i}")))
            .collect();
        let rows = vec![Record::new()];
        let err = build_bulk_insert("t", &wide, &rows).unwrap_err();
        assert!(matches!(err, MapperError::TooManyParameters(n) if n == MAX_BIND_PARAMS + 1));

        let generated = vec![FieldMapping::same("id")];
        let err = build_returning_insert("t", &wide, &generated, &rows[0]).unwrap_err();
        assert!(matches!(err, MapperError::TooManyParameters(_)));

        let two = vec![FieldMapping::same("a"), FieldMapping::same("b")];
        let rows = vec![Record::new(); rows_per_statement(2) + 1];
        assert!(build_bulk_insert("t", &two, &rows).is_err());
        assert!(build_bulk_insert("t", &two, &rows[..rows_per_statement(2)]).is_ok());
    }

    #[test]
    fn returning_restarts_numbering_per_row() {
        let generated = vec![FieldMapping::new("ID", "id")];
        let columns = user_columns();
        let rows = vec![user("a", "a@x"), user("b", "b@x")];

        for row in &rows {
            let stmt = build_returning_insert("users", &columns, &generated, row).unwrap();
            assert_eq!(
                stmt.sql,
                "INSERT INTO users (name, email) VALUES ($1, $2) RETURNING id"
            );
            assert_eq!(stmt.args.len(), 2);
            assert_eq!(stmt.generated, generated.as_slice());
        }
    }

    #[test]
    fn returning_lists_all_generated_columns() {
        let generated = vec![
            FieldMapping::new("ID", "id"),
            FieldMapping::new("CreatedAt", "created_at"),
        ];
        let row = user("a", "a@x");
        let stmt = build_returning_insert("users", &user_columns(), &generated, &row).unwrap();
        assert!(stmt.sql.ends_with(" RETURNING id, created_at"));
    }

    #[test]
    fn generated_values_are_written_back_in_order() {
        let generated = vec![
            FieldMapping::new("ID", "id"),
            FieldMapping::new("Version", "version"),
        ];
        let mut row = user("a", "a@x");
        apply_generated(&mut row, &generated, vec![Value::Int(7), Value::Int(1)]).unwrap();

        assert_eq!(row.get("ID"), Some(&Value::Int(7)));
        assert_eq!(row.get("Version"), Some(&Value::Int(1)));
        assert_eq!(row.get("Name"), Some(&Value::from("a")));
    }

    #[test]
    fn write_back_rejects_wrong_arity() {
        let generated = vec![FieldMapping::new("ID", "id")];
        let mut row = user("a", "a@x");
        let err = apply_generated(&mut row, &generated, vec![]).unwrap_err();
        assert!(matches!(err, MapperError::Decode { .. }));
        assert!(row.get("ID").is_none());
    }

    #[test]
    fn chunk_size_respects_bind_limit() {
        assert_eq!(rows_per_statement(1), MAX_BIND_PARAMS);
        assert_eq!(rows_per_statement(3), 21_845);
        assert_eq!(rows_per_statement(0), MAX_BIND_PARAMS);
        assert_eq!(rows_per_statement(100_000), 1);
    }
}
