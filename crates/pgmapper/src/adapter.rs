//! The PostgreSQL adapter a data mapper registers for `postgresql` sources.

use crate::config::AdapterConfig;
use crate::crud;
use crate::client::GenericClient;
use crate::error::{MapperError, MapperResult};
use crate::mapping::{Action, DeleteKey, Operation};
use crate::pool::{create_pool, create_pool_with_tls};
use crate::value::Record;
use deadpool_postgres::Pool;
use serde_json::{Map, Value as JsonValue};
use std::future::Future;
use std::sync::Arc;
use tokio_postgres::Socket;
use tokio_postgres::tls::{MakeTlsConnect, TlsConnect};

type PoolFactory = Arc<dyn Fn(&AdapterConfig) -> MapperResult<Pool> + Send + Sync>;

/// The operations a data mapper drives on a storage backend.
pub trait Adapter: Send + Sync {
    /// Adapter type identifier used for registration.
    fn name(&self) -> &'static str;

    /// Open the backend using a source's key/value configuration.
    fn connect(
        &mut self,
        config: &Map<String, JsonValue>,
    ) -> impl Future<Output = MapperResult<()>> + Send;

    /// Release all connections. Closing an unconnected adapter is not an error.
    fn close(&mut self) -> MapperResult<()>;

    /// Read records; zero rows is `NotFound` unless the operation is `multi`.
    fn fetch(
        &self,
        op: &Operation,
        params: &Record,
    ) -> impl Future<Output = MapperResult<Vec<Record>>> + Send;

    /// Create records, writing generated columns back into `objects`.
    fn insert(
        &self,
        op: &Operation,
        objects: &mut [Record],
    ) -> impl Future<Output = MapperResult<()>> + Send;

    /// Modify records; an object matching no row is `NotFound`.
    fn update(
        &self,
        op: &Operation,
        objects: &[Record],
    ) -> impl Future<Output = MapperResult<()>> + Send;

    /// Remove records; a key matching no row is `NotFound`.
    fn delete(
        &self,
        op: &Operation,
        keys: &[DeleteKey],
    ) -> impl Future<Output = MapperResult<()>> + Send;

    /// Run a custom statement or stored procedure.
    fn execute(
        &self,
        action: &Action,
        params: &Record,
    ) -> impl Future<Output = MapperResult<Vec<Record>>> + Send;
}

/// PostgreSQL implementation of [`Adapter`].
///
/// Owns its connection pool: created by [`connect`](Adapter::connect), released
/// by [`close`](Adapter::close). Every data operation checks out one pooled
/// connection for its duration.
///
/// Sources with `sslmode = require` need an adapter built with
/// [`with_tls`](PostgresAdapter::with_tls); without a connector such a source
/// is rejected at connect time.
///
/// # Example
///
/// ```ignore
/// use pgmapper::prelude::*;
///
/// let mut adapter = PostgresAdapter::new();
/// adapter
///     .connect_with_config(AdapterConfig::new().database("app").password("secret"))
///     .await?;
///
/// let op = Operation::new("SELECT id, name FROM users WHERE id = {id}");
/// let users = adapter.fetch(&op, &Record::new().with("id", 1)).await?;
/// adapter.close()?;
/// ```
#[derive(Default)]
pub struct PostgresAdapter {
    config: AdapterConfig,
    pool: Option<Pool>,
    tls: Option<PoolFactory>,
}

impl PostgresAdapter {
    pub const NAME: &'static str = "postgresql";

    /// Create an unconnected adapter with default pool settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an unconnected adapter that opens connections through `tls`.
    ///
    /// The connector is used for every `sslmode`; `prefer` negotiates TLS and
    /// `require` insists on it.
    pub fn with_tls<T>(tls: T) -> Self
    where
        T: MakeTlsConnect<Socket> + Clone + Sync + Send + 'static,
        T::Stream: Sync + Send,
        T::TlsConnect: Sync + Send,
        <T::TlsConnect as TlsConnect<Socket>>::Future: Send,
    {
        Self {
            tls: Some(Arc::new(move |config: &AdapterConfig| {
                create_pool_with_tls(config, tls.clone())
            })),
            ..Self::default()
        }
    }

    pub fn has_tls(&self) -> bool {
        self.tls.is_some()
    }

    /// Settings of the current (or last) connection.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.pool.is_some()
    }

    /// The underlying pool, if connected.
    pub fn pool(&self) -> Option<&Pool> {
        self.pool.as_ref()
    }

    /// Build the pool from `config` and verify it with a round trip.
    ///
    /// An existing pool is closed first. If the ping fails the new pool is closed
    /// and the adapter stays unconnected.
    pub async fn connect_with_config(&mut self, config: AdapterConfig) -> MapperResult<()> {
        if let Some(old) = self.pool.take() {
            old.close();
        }

        let pool = match &self.tls {
            Some(make_pool) => make_pool(&config)?,
            None if config.requires_tls() => {
                return Err(MapperError::Config(
                    "sslmode 'require' needs a TLS connector, see PostgresAdapter::with_tls"
                        .to_string(),
                ));
            }
            None => create_pool(&config)?,
        };
        if let Err(err) = ping(&pool).await {
            pool.close();
            tracing::warn!(
                target: "pgmapper.adapter",
                host = %config.host,
                port = config.port,
                database = %config.database,
                error = %err,
                "failed to ping database",
            );
            return Err(MapperError::Connection(format!(
                "failed to ping database: {err}"
            )));
        }

        tracing::info!(
            target: "pgmapper.adapter",
            host = %config.host,
            port = config.port,
            database = %config.database,
            max_connections = config.max_connections,
            "connected",
        );
        self.config = config;
        self.pool = Some(pool);
        Ok(())
    }

    /// Drop idle connections older than `conn_max_age` and trim the idle set to
    /// `max_idle`. Returns how many connections were removed.
    pub fn prune_idle(&self) -> usize {
        let Some(pool) = &self.pool else {
            return 0;
        };

        let max_age = self.config.conn_max_age_duration();
        let max_idle = self.config.max_idle;
        let mut kept = 0;
        let result = pool.retain(|_, metrics| {
            if kept >= max_idle || metrics.age() >= max_age {
                return false;
            }
            kept += 1;
            true
        });

        let removed = result.removed.len();
        tracing::debug!(target: "pgmapper.adapter", removed, kept, "pruned idle connections");
        removed
    }

    async fn client(&self) -> MapperResult<deadpool_postgres::Client> {
        let pool = self.pool.as_ref().ok_or(MapperError::NotConnected)?;
        Ok(pool.get().await?)
    }
}

async fn ping(pool: &Pool) -> MapperResult<()> {
    let client = pool.get().await?;
    GenericClient::execute(&client, "SELECT 1", &[]).await?;
    Ok(())
}

impl Adapter for PostgresAdapter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn connect(&mut self, config: &Map<String, JsonValue>) -> MapperResult<()> {
        self.connect_with_config(AdapterConfig::from_map(config)).await
    }

    fn close(&mut self) -> MapperResult<()> {
        if let Some(pool) = self.pool.take() {
            pool.close();
            tracing::info!(target: "pgmapper.adapter", "closed");
        }
        Ok(())
    }

    async fn fetch(&self, op: &Operation, params: &Record) -> MapperResult<Vec<Record>> {
        let client = self.client().await?;
        crud::fetch(&client, op, params).await
    }

    async fn insert(&self, op: &Operation, objects: &mut [Record]) -> MapperResult<()> {
        let client = self.client().await?;
        crud::insert(&client, op, objects).await
    }

    async fn update(&self, op: &Operation, objects: &[Record]) -> MapperResult<()> {
        let client = self.client().await?;
        crud::update(&client, op, objects).await
    }

    async fn delete(&self, op: &Operation, keys: &[DeleteKey]) -> MapperResult<()> {
        let client = self.client().await?;
        crud::delete(&client, op, keys).await
    }

    async fn execute(&self, action: &Action, params: &Record) -> MapperResult<Vec<Record>> {
        let client = self.client().await?;
        crud::execute(&client, action, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::FieldMapping;

    #[test]
    fn name_is_postgresql() {
        assert_eq!(PostgresAdapter::new().name(), "postgresql");
    }

    #[test]
    fn new_adapter_has_pool_defaults() {
        let a = PostgresAdapter::new();
        assert!(!a.is_connected());
        assert_eq!(a.config().max_connections, 10);
        assert_eq!(a.config().max_idle, 5);
        assert_eq!(a.config().conn_max_age_secs, 3600);
    }

    #[test]
    fn close_without_connect_is_ok() {
        let mut a = PostgresAdapter::new();
        assert!(a.close().is_ok());
        assert!(a.close().is_ok());
    }

    #[test]
    fn prune_without_pool_removes_nothing() {
        assert_eq!(PostgresAdapter::new().prune_idle(), 0);
    }

    #[tokio::test]
    async fn fetch_without_connect_fails() {
        let a = PostgresAdapter::new();
        let op = Operation::new("SELECT id FROM users WHERE id = {id}");
        let err = a.fetch(&op, &Record::new().with("id", 1)).await.unwrap_err();
        assert!(matches!(err, MapperError::NotConnected));
    }

    #[tokio::test]
    async fn insert_without_connect_fails() {
        let a = PostgresAdapter::new();
        let op = Operation::new("users").property(FieldMapping::same("name"));
        let mut objects = vec![Record::new().with("name", "test")];
        let err = a.insert(&op, &mut objects).await.unwrap_err();
        assert!(matches!(err, MapperError::NotConnected));
    }

    #[tokio::test]
    async fn update_without_connect_fails() {
        let a = PostgresAdapter::new();
        let op = Operation::new("UPDATE users SET name = {name} WHERE id = {id}");
        let objects = vec![Record::new().with("id", 1).with("name", "test")];
        let err = a.update(&op, &objects).await.unwrap_err();
        assert!(matches!(err, MapperError::NotConnected));
    }

    #[tokio::test]
    async fn delete_without_connect_fails() {
        let a = PostgresAdapter::new();
        let op = Operation::new("DELETE FROM users WHERE id = {id}");
        let err = a.delete(&op, &[DeleteKey::from(1)]).await.unwrap_err();
        assert!(matches!(err, MapperError::NotConnected));
    }

    #[tokio::test]
    async fn execute_without_connect_fails() {
        let a = PostgresAdapter::new();
        let action = Action::new("SELECT COUNT(*) AS count FROM users");
        let err = a.execute(&action, &Record::new()).await.unwrap_err();
        assert!(matches!(err, MapperError::NotConnected));
    }

    #[tokio::test]
    async fn require_without_tls_connector_is_config_error() {
        let mut a = PostgresAdapter::new();
        let mut config = Map::new();
        config.insert("sslmode".into(), JsonValue::from("require"));
        config.insert("host".into(), JsonValue::from("db.invalid"));
        let err = a.connect(&config).await.unwrap_err();
        assert!(matches!(err, MapperError::Config(ref m) if m.contains("TLS")));
        assert!(!a.is_connected());
    }

    #[test]
    fn with_tls_keeps_defaults() {
        let a = PostgresAdapter::with_tls(tokio_postgres::NoTls);
        assert!(a.has_tls());
        assert!(!a.is_connected());
        assert!(!PostgresAdapter::new().has_tls());
        assert_eq!(a.config().max_connections, 10);
    }

    #[tokio::test]
    async fn connect_with_bad_sslmode_stays_unconnected() {
        let mut a = PostgresAdapter::new();
        let mut config = Map::new();
        config.insert("sslmode".into(), JsonValue::from("bogus"));
        let err = a.connect(&config).await.unwrap_err();
        assert!(matches!(err, MapperError::Config(_)));
        assert!(!a.is_connected());
    }
}
