//! `tracing` events for executed SQL.
//!
//! Every statement is logged at DEBUG under the `pgmapper.sql` target before it
//! runs. Install any `tracing` subscriber to see them.

/// Longest SQL (in bytes) emitted in a log event.
pub const MAX_LOGGED_SQL: usize = 200;

/// The adapter operation issuing a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Fetch,
    InsertBulk,
    InsertReturning,
    Update,
    Delete,
    Execute,
}

impl QueryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryKind::Fetch => "fetch",
            QueryKind::InsertBulk => "insert_bulk",
            QueryKind::InsertReturning => "insert_returning",
            QueryKind::Update => "update",
            QueryKind::Delete => "delete",
            QueryKind::Execute => "execute",
        }
    }
}

pub(crate) fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

pub(crate) fn log_sql(kind: QueryKind, sql: &str, param_count: usize) {
    let shown = truncate_sql_bytes(sql, MAX_LOGGED_SQL);
    tracing::debug!(
        target: "pgmapper.sql",
        op = kind.as_str(),
        param_count,
        truncated = shown.len() < sql.len(),
        sql = %shown,
    );
}
