//! CRUD execution over any [`GenericClient`].
//!
//! These functions are what [`PostgresAdapter`](crate::PostgresAdapter) runs on a
//! pooled connection. They are public so callers can run the same operations
//! on a connection or transaction they own.

use crate::client::GenericClient;
use crate::error::{MapperError, MapperResult};
use crate::insert::{apply_generated, build_bulk_insert, build_returning_insert, rows_per_statement};
use crate::mapping::{Action, DeleteKey, Operation};
use crate::row::{records_from_rows, values_from_row};
use crate::template::Template;
use crate::trace::{QueryKind, log_sql};
use crate::value::{Record, Value};
use tokio_postgres::types::ToSql;

fn sql_params<'a>(values: &[&'a Value]) -> Vec<&'a (dyn ToSql + Sync)> {
    values.iter().map(|v| *v as &(dyn ToSql + Sync)).collect()
}

/// Run a `{name}` query and decode every row.
///
/// Zero rows is [`MapperError::NotFound`] unless `op.multi` is set.
pub async fn fetch(
    conn: &impl GenericClient,
    op: &Operation,
    params: &Record,
) -> MapperResult<Vec<Record>> {
    let template = Template::parse(&op.statement);
    let args = template.bind(params)?;
    log_sql(QueryKind::Fetch, template.sql(), args.len());

    let rows = conn.query(template.sql(), &sql_params(&args)).await?;
    let records = records_from_rows(&rows)?;

    if records.is_empty() && !op.multi {
        return Err(MapperError::not_found(format!(
            "no rows for `{}`",
            op.statement
        )));
    }
    Ok(records)
}

/// Insert `objects` into the table named by `op.statement`.
///
/// With generated columns each object is inserted on its own with `RETURNING`
/// and receives the generated values. Without them the batch goes out as
/// multi-row inserts, split only when the bind-parameter limit requires it.
/// A failure part way through leaves earlier rows inserted.
pub async fn insert(
    conn: &impl GenericClient,
    op: &Operation,
    objects: &mut [Record],
) -> MapperResult<()> {
    if objects.is_empty() {
        return Ok(());
    }

    if op.generated.is_empty() {
        insert_bulk(conn, op, objects).await
    } else {
        insert_returning(conn, op, objects).await
    }
}

async fn insert_returning(
    conn: &impl GenericClient,
    op: &Operation,
    objects: &mut [Record],
) -> MapperResult<()> {
    for row in objects.iter_mut() {
        let values = {
            let stmt =
                build_returning_insert(&op.statement, &op.properties, &op.generated, row)?;
            log_sql(QueryKind::InsertReturning, &stmt.sql, stmt.args.len());
            let returned = conn.query_one(&stmt.sql, &sql_params(&stmt.args)).await?;
            values_from_row(&returned)?
        };
        apply_generated(row, &op.generated, values)?;
    }
    Ok(())
}

async fn insert_bulk(
    conn: &impl GenericClient,
    op: &Operation,
    objects: &[Record],
) -> MapperResult<()> {
    for chunk in objects.chunks(rows_per_statement(op.properties.len())) {
        let stmt = build_bulk_insert(&op.statement, &op.properties, chunk)?;
        log_sql(QueryKind::InsertBulk, &stmt.sql, stmt.args.len());
        conn.execute(&stmt.sql, &sql_params(&stmt.args)).await?;
    }
    Ok(())
}

/// Run the `op.statement` template once per object, binding from that object.
///
/// An object whose statement touches no rows is [`MapperError::NotFound`].
pub async fn update(
    conn: &impl GenericClient,
    op: &Operation,
    objects: &[Record],
) -> MapperResult<()> {
    let template = Template::parse(&op.statement);
    for obj in objects {
        let args = template.bind(obj)?;
        log_sql(QueryKind::Update, template.sql(), args.len());
        let affected = conn.execute(template.sql(), &sql_params(&args)).await?;
        if affected == 0 {
            return Err(MapperError::not_found("update affected no rows"));
        }
    }
    Ok(())
}

/// Run the `op.statement` template once per key.
///
/// A bare [`DeleteKey::Id`] binds as `{id}`. A key that deletes nothing is
/// [`MapperError::NotFound`].
pub async fn delete(
    conn: &impl GenericClient,
    op: &Operation,
    keys: &[DeleteKey],
) -> MapperResult<()> {
    let template = Template::parse(&op.statement);
    for key in keys {
        let params = key.to_params();
        let args = template.bind(&params)?;
        log_sql(QueryKind::Delete, template.sql(), args.len());
        let affected = conn.execute(template.sql(), &sql_params(&args)).await?;
        if affected == 0 {
            return Err(MapperError::not_found("delete affected no rows"));
        }
    }
    Ok(())
}

/// Run a custom statement and decode whatever rows it returns.
pub async fn execute(
    conn: &impl GenericClient,
    action: &Action,
    params: &Record,
) -> MapperResult<Vec<Record>> {
    let template = Template::parse(&action.statement);
    let args = template.bind(params)?;
    log_sql(QueryKind::Execute, template.sql(), args.len());

    let rows = conn.query(template.sql(), &sql_params(&args)).await?;
    records_from_rows(&rows)
}

#[cfg(test)]
mod tests;
