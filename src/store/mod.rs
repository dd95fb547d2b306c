//! Queryable data store backends.
//!
//! The aggregator only ever talks to a [`Store`]: one `execute` call that
//! takes a [`Query`] and returns JSON rows. [`RestStore`] speaks PostgREST
//! over HTTP; [`MemoryStore`] evaluates queries over in-memory rows and backs
//! tests and offline fixture files.

pub mod memory;
pub mod rest;

pub use memory::MemoryStore;
pub use rest::{RestStore, RestStoreConfig};

use crate::error::StoreError;
use crate::query::Query;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// One row as returned by the store.
pub type Row = Map<String, Value>;

#[async_trait]
pub trait Store: Send + Sync {
    /// Run a read query and return the matching rows.
    async fn execute(&self, query: &Query) -> Result<Vec<Row>, StoreError>;

    /// Backend name for logging.
    fn backend_type(&self) -> &'static str;
}

/// Decode raw rows into typed records.
pub fn decode_rows<T: DeserializeOwned>(table: &str, rows: Vec<Row>) -> Result<Vec<T>, StoreError> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(Value::Object(row))
                .map_err(|e| StoreError::Decode(format!("{}: {}", table, e)))
        })
        .collect()
}
