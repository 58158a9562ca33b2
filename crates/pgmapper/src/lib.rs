//! # pgmapper
//!
//! A PostgreSQL adapter for record-oriented data mappers.
//!
//! ## Features
//!
//! - **Named parameters**: statements are written with `{field}` placeholders and
//!   translated to PostgreSQL's positional `$1, $2, ...` form
//! - **Record mapping**: rows decode into [`Record`]s, string-keyed maps of [`Value`]s
//! - **Bulk inserts**: many objects go out as one multi-row `INSERT`, split only at
//!   the bind-parameter limit
//! - **Generated columns**: `INSERT ... RETURNING` writes server-assigned values
//!   back into each object
//! - **Transaction-friendly**: the [`crud`] functions accept anything implementing
//!   [`GenericClient`]
//!
//! ## Templates
//!
//! ```
//! use pgmapper::{Record, Value, extract, translate};
//!
//! let sql = "SELECT * FROM users WHERE id = {id} AND name = {name}";
//! assert_eq!(translate(sql), "SELECT * FROM users WHERE id = $1 AND name = $2");
//!
//! let row = Record::new().with("id", 1).with("name", "alice");
//! let args = extract(sql, &row).unwrap();
//! assert_eq!(args, vec![Value::Int(1), Value::from("alice")]);
//! ```
//!
//! ## Adapter
//!
//! ```ignore
//! use pgmapper::prelude::*;
//!
//! let mut adapter = PostgresAdapter::new();
//! adapter.connect(&source_config).await?;
//!
//! let op = Operation::new("users")
//!     .property(FieldMapping::same("name"))
//!     .generated(FieldMapping::same("id"));
//! let mut users = vec![Record::new().with("name", "alice")];
//! adapter.insert(&op, &mut users).await?;
//! assert!(users[0].contains_key("id"));
//! ```

pub mod adapter;
pub mod client;
pub mod config;
pub mod crud;
pub mod error;
pub mod insert;
pub mod mapping;
pub mod pool;
pub mod prelude;
pub mod row;
pub mod template;
pub mod trace;
pub mod value;

pub use adapter::{Adapter, PostgresAdapter};
pub use client::GenericClient;
pub use config::AdapterConfig;
pub use error::{MapperError, MapperResult};
pub use insert::{
    InsertStatement, MAX_BIND_PARAMS, ReturningInsert, apply_generated, build_bulk_insert,
    build_returning_insert,
};
pub use mapping::{Action, DeleteKey, FieldMapping, Operation};
pub use pool::{create_pool, create_pool_with_manager_config, create_pool_with_tls};
pub use row::{record_from_row, records_from_rows};
pub use template::{Template, extract, placeholder_names, translate};
pub use trace::QueryKind;
pub use value::{Interval, Record, Value};
