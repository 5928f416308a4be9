use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use crate::error::Result;

/// Field name to opaque value, as produced and consumed by the workload
/// harness.
pub type Record = HashMap<String, Vec<u8>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    NotFound,
}

#[async_trait]
pub trait Client: Send + 'static {
    /// Read a single record by key. `None` when the key does not exist.
    async fn read(
        &self,
        table: &str,
        key: &str,
        fields: Option<&HashSet<String>>,
    ) -> Result<Option<Record>>;

    /// Scan at most `record_count` records starting from a key
    async fn scan(
        &self,
        table: &str,
        start_key: &str,
        record_count: usize,
        fields: Option<&HashSet<String>>,
    ) -> Result<Vec<Record>>;

    /// Overwrite the given fields of an existing record
    async fn update(&mut self, table: &str, key: &str, values: &Record) -> Result<Status>;

    /// Insert a new record
    async fn insert(&mut self, table: &str, key: &str, values: &Record) -> Result<()>;

    /// Delete a record
    async fn delete(&mut self, table: &str, key: &str) -> Result<()>;

    /// Flush anything still buffered. Must run before the client is dropped.
    async fn cleanup(&mut self) -> Result<()>;
}
