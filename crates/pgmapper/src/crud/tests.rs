use super::*;
use crate::insert::MAX_BIND_PARAMS;
use crate::mapping::FieldMapping;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio_postgres::Row;

/// One statement as the client saw it.
#[derive(Debug, Clone, PartialEq)]
struct Call {
    sql: String,
    params: Vec<String>,
}

/// Records every statement and answers `execute` with scripted row counts.
/// `query` always returns no rows.
#[derive(Default)]
struct ScriptedClient {
    calls: Mutex<Vec<Call>>,
    affected: Mutex<VecDeque<u64>>,
}

impl ScriptedClient {
    fn affecting(counts: impl IntoIterator<Item = u64>) -> Self {
        Self {
            affected: Mutex::new(counts.into_iter().collect()),
            ..Self::default()
        }
    }

    fn record(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) {
        let params = params.iter().map(|p| format!("{p:?}")).collect();
        self.calls.lock().unwrap().push(Call {
            sql: sql.to_string(),
            params,
        });
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl GenericClient for ScriptedClient {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> MapperResult<Vec<Row>> {
        self.record(sql, params);
        Ok(Vec::new())
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> MapperResult<u64> {
        self.record(sql, params);
        Ok(self.affected.lock().unwrap().pop_front().unwrap_or(1))
    }
}

#[tokio::test]
async fn empty_insert_issues_nothing() {
    let conn = ScriptedClient::default();
    let op = Operation::new("users").property(FieldMapping::same("name"));
    insert(&conn, &op, &mut []).await.unwrap();

    let op = op.generated(FieldMapping::same("id"));
    insert(&conn, &op, &mut []).await.unwrap();
    assert!(conn.calls().is_empty());
}

#[tokio::test]
async fn bulk_insert_is_one_statement_under_the_limit() {
    let conn = ScriptedClient::default();
    let op = Operation::new("users")
        .property(FieldMapping::same("name"))
        .property(FieldMapping::same("email"));
    let mut rows = vec![
        Record::new().with("name", "a").with("email", "a@x"),
        Record::new().with("name", "b"),
    ];
    insert(&conn, &op, &mut rows).await.unwrap();

    let calls = conn.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].sql,
        "INSERT INTO users (name, email) VALUES ($1, $2), ($3, $4)"
    );
    assert_eq!(calls[0].params[3], "Null");
}

#[tokio::test]
async fn bulk_insert_splits_at_bind_limit() {
    let conn = ScriptedClient::default();
    let columns = 30_000;
    let op = Operation::new("wide")
        .properties((0..columns).map(|i| FieldMapping::same(format!("c{i}"))));
    let mut rows = vec![Record::new(); 3];
    insert(&conn, &op, &mut rows).await.unwrap();

    let counts: Vec<usize> = conn.calls().iter().map(|c| c.params.len()).collect();
    assert_eq!(rows_per_statement(columns), 2);
    assert_eq!(counts, vec![2 * columns, columns]);
    assert!(counts.iter().all(|&n| n <= MAX_BIND_PARAMS));
}

#[tokio::test]
async fn returning_insert_needs_a_returned_row() {
    let conn = ScriptedClient::default();
    let op = Operation::new("users")
        .property(FieldMapping::same("name"))
        .generated(FieldMapping::same("id"));
    let mut rows = vec![Record::new().with("name", "a"), Record::new().with("name", "b")];
    let err = insert(&conn, &op, &mut rows).await.unwrap_err();

    assert!(err.is_not_found());
    let calls = conn.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].sql,
        "INSERT INTO users (name) VALUES ($1) RETURNING id"
    );
    assert!(!rows[0].contains_key("id"));
}

#[tokio::test]
async fn fetch_single_without_rows_is_not_found() {
    let conn = ScriptedClient::default();
    let op = Operation::new("SELECT * FROM users WHERE id = {id}");
    let err = fetch(&conn, &op, &Record::new().with("id", 1))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(conn.calls()[0].sql, "SELECT * FROM users WHERE id = $1");
}

#[tokio::test]
async fn fetch_multi_without_rows_is_empty() {
    let conn = ScriptedClient::default();
    let op = Operation::new("SELECT * FROM users WHERE age > {age}").multi();
    let rows = fetch(&conn, &op, &Record::new().with("age", 30)).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn missing_parameter_never_reaches_the_client() {
    let conn = ScriptedClient::default();
    let op = Operation::new("SELECT * FROM users WHERE id = {id}");
    let err = fetch(&conn, &op, &Record::new()).await.unwrap_err();
    assert!(err.is_missing_parameter());
    assert!(conn.calls().is_empty());
}

#[tokio::test]
async fn execute_without_rows_is_not_an_error() {
    let conn = ScriptedClient::default();
    let action = Action::new("CALL refresh_stats({day})");
    let rows = execute(&conn, &action, &Record::new().with("day", "mon"))
        .await
        .unwrap();
    assert!(rows.is_empty());
    assert_eq!(conn.calls()[0].sql, "CALL refresh_stats($1)");
}

#[tokio::test]
async fn update_stops_at_first_unmatched_object() {
    let conn = ScriptedClient::affecting([1, 0, 1]);
    let op = Operation::new("UPDATE users SET name = {name} WHERE id = {id}");
    let objects = vec![
        Record::new().with("id", 1).with("name", "a"),
        Record::new().with("id", 2).with("name", "b"),
        Record::new().with("id", 3).with("name", "c"),
    ];
    let err = update(&conn, &op, &objects).await.unwrap_err();

    assert!(err.is_not_found());
    let calls = conn.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].sql, "UPDATE users SET name = $1 WHERE id = $2");
    assert_eq!(calls[1].params, vec!["Text(\"b\")", "Int(2)"]);
}

#[tokio::test]
async fn delete_binds_bare_id_as_id_param() {
    let conn = ScriptedClient::default();
    let op = Operation::new("DELETE FROM users WHERE id = {id}");
    delete(&conn, &op, &[DeleteKey::from(7), DeleteKey::Params(Record::new().with("id", 8))])
        .await
        .unwrap();

    let calls = conn.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].sql, "DELETE FROM users WHERE id = $1");
    assert_eq!(calls[0].params, vec!["Int(7)"]);
    assert_eq!(calls[1].params, vec!["Int(8)"]);
}

#[tokio::test]
async fn delete_with_no_affected_rows_is_not_found() {
    let conn = ScriptedClient::affecting([0]);
    let op = Operation::new("DELETE FROM users WHERE id = {id}");
    let err = delete(&conn, &op, &[DeleteKey::from(7)]).await.unwrap_err();
    assert!(err.is_not_found());
}
