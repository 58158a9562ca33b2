//! Adapter configuration.
//!
//! The data mapper hands each source its connection settings as a loose
//! key/value map. [`AdapterConfig::from_map`] reads the keys below, falling back
//! to defaults when a key is absent or holds the wrong JSON type:
//!
//! | key                    | default     |
//! |------------------------|-------------|
//! | `host`                 | `localhost` |
//! | `port`                 | `5432`      |
//! | `user`                 | `postgres`  |
//! | `password`             | empty       |
//! | `database`             | empty       |
//! | `sslmode`              | `disable`   |
//! | `max_connections`      | `10`        |
//! | `max_idle`             | `5`         |
//! | `conn_max_age_seconds` | `3600`      |

use crate::error::{MapperError, MapperResult};
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use std::time::Duration;
use tokio_postgres::config::{Host, SslMode};

pub const CONFIG_HOST: &str = "host";
pub const CONFIG_PORT: &str = "port";
pub const CONFIG_USER: &str = "user";
pub const CONFIG_PASSWORD: &str = "password";
pub const CONFIG_DATABASE: &str = "database";
pub const CONFIG_SSL_MODE: &str = "sslmode";
pub const CONFIG_MAX_CONN: &str = "max_connections";
pub const CONFIG_MAX_IDLE: &str = "max_idle";
pub const CONFIG_CONN_AGE: &str = "conn_max_age_seconds";

/// Connection and pool settings for [`PostgresAdapter`](crate::PostgresAdapter).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    #[serde(rename = "sslmode")]
    pub ssl_mode: String,
    /// Pool size.
    pub max_connections: usize,
    /// Idle connections kept by [`PostgresAdapter::prune_idle`](crate::PostgresAdapter::prune_idle).
    pub max_idle: usize,
    /// Idle connections older than this are dropped by `prune_idle`.
    #[serde(rename = "conn_max_age_seconds")]
    pub conn_max_age_secs: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            database: String::new(),
            ssl_mode: "disable".to_string(),
            max_connections: 10,
            max_idle: 5,
            conn_max_age_secs: 3600,
        }
    }
}

impl AdapterConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a mapper source config map, keeping defaults for absent or mistyped keys.
    pub fn from_map(config: &Map<String, JsonValue>) -> Self {
        let d = Self::default();
        Self {
            host: get_string(config, CONFIG_HOST, &d.host),
            port: u16::try_from(get_int(config, CONFIG_PORT, i64::from(d.port)))
                .unwrap_or(d.port),
            user: get_string(config, CONFIG_USER, &d.user),
            password: get_string(config, CONFIG_PASSWORD, &d.password),
            database: get_string(config, CONFIG_DATABASE, &d.database),
            ssl_mode: get_string(config, CONFIG_SSL_MODE, &d.ssl_mode),
            max_connections: get_usize(config, CONFIG_MAX_CONN, d.max_connections),
            max_idle: get_usize(config, CONFIG_MAX_IDLE, d.max_idle),
            conn_max_age_secs: u64::try_from(get_int(
                config,
                CONFIG_CONN_AGE,
                d.conn_max_age_secs as i64,
            ))
            .unwrap_or(d.conn_max_age_secs),
        }
    }

    /// Read a `postgres://` URL or libpq key/value string, such as `DATABASE_URL`.
    ///
    /// Pool settings keep their defaults.
    pub fn from_url(url: &str) -> MapperResult<Self> {
        let pg: tokio_postgres::Config = url
            .parse()
            .map_err(|e: tokio_postgres::Error| MapperError::Config(e.to_string()))?;

        let mut config = Self::default();
        if let Some(Host::Tcp(host)) = pg.get_hosts().first() {
            config.host = host.clone();
        }
        if let Some(port) = pg.get_ports().first() {
            config.port = *port;
        }
        if let Some(user) = pg.get_user() {
            config.user = user.to_string();
        }
        if let Some(password) = pg.get_password() {
            config.password = String::from_utf8_lossy(password).into_owned();
        }
        if let Some(dbname) = pg.get_dbname() {
            config.database = dbname.to_string();
        }
        config.ssl_mode = match pg.get_ssl_mode() {
            SslMode::Disable => "disable",
            SslMode::Require => "require",
            _ => "prefer",
        }
        .to_string();
        Ok(config)
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set `sslmode` (`disable`, `prefer` or `require`).
    pub fn ssl_mode(mut self, mode: impl Into<String>) -> Self {
        self.ssl_mode = mode.into();
        self
    }

    pub fn max_connections(mut self, n: usize) -> Self {
        self.max_connections = n;
        self
    }

    pub fn max_idle(mut self, n: usize) -> Self {
        self.max_idle = n;
        self
    }

    pub fn conn_max_age(mut self, age: Duration) -> Self {
        self.conn_max_age_secs = age.as_secs();
        self
    }

    /// Whether `sslmode` refuses plaintext connections.
    pub fn requires_tls(&self) -> bool {
        self.ssl_mode == "require"
    }

    pub fn conn_max_age_duration(&self) -> Duration {
        Duration::from_secs(self.conn_max_age_secs)
    }

    /// libpq-style key/value connection string.
    ///
    /// The password is included verbatim; do not log the result.
    pub fn dsn(&self) -> String {
        format!(
            "host={} port={} user={} password={} dbname={} sslmode={}",
            self.host, self.port, self.user, self.password, self.database, self.ssl_mode
        )
    }

    /// Build the driver configuration.
    pub fn to_pg_config(&self) -> MapperResult<tokio_postgres::Config> {
        let ssl_mode = match self.ssl_mode.as_str() {
            "disable" => SslMode::Disable,
            "prefer" => SslMode::Prefer,
            "require" => SslMode::Require,
            other => {
                return Err(MapperError::Config(format!(
                    "unsupported sslmode '{}'",
                    other
                )));
            }
        };

        let mut pg = tokio_postgres::Config::new();
        pg.host(&self.host)
            .port(self.port)
            .user(&self.user)
            .ssl_mode(ssl_mode);
        if !self.password.is_empty() {
            pg.password(&self.password);
        }
        if !self.database.is_empty() {
            pg.dbname(&self.database);
        }
        Ok(pg)
    }
}

fn get_string(config: &Map<String, JsonValue>, key: &str, default: &str) -> String {
    match config.get(key) {
        Some(JsonValue::String(s)) => s.clone(),
        _ => default.to_string(),
    }
}

/// Integers and floats (truncated toward zero) are accepted.
fn get_int(config: &Map<String, JsonValue>, key: &str, default: i64) -> i64 {
    match config.get(key) {
        Some(JsonValue::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(default),
        _ => default,
    }
}

fn get_usize(config: &Map<String, JsonValue>, key: &str, default: usize) -> usize {
    usize::try_from(get_int(config, key, default as i64)).unwrap_or(default)
}
