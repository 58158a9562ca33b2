//! Convenient imports for typical `pgmapper` usage.
//!
//! ```ignore
//! use pgmapper::prelude::*;
//! ```

pub use crate::{
    Action, Adapter, AdapterConfig, DeleteKey, FieldMapping, GenericClient, MapperError,
    MapperResult, Operation, PostgresAdapter, Record, Value,
};
