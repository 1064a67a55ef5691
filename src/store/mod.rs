//! Store client: a thin façade over the keyed table.
//!
//! Four primitive operations (point-get, point-put, point-delete,
//! range-query/scan). Absence is data, not an error: `get` returns
//! `Ok(None)` for a missing key and `delete` of an absent key succeeds.
//! The client performs no retries — retry policy belongs to callers.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::codec::{RawRecord, RecordKey};
use crate::config::Config;
use crate::index::{QuerySpec, ScanSpec};

pub mod memory;

#[cfg(feature = "dynamo")]
pub mod dynamo;

pub use memory::MemoryTableStore;

#[cfg(feature = "dynamo")]
pub use dynamo::DynamoTableStore;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during store operations.
///
/// Any transport or storage fault surfaces as `Unavailable`; whether that is
/// retryable is the caller's decision.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("unknown store type: {0}")]
    UnknownStoreType(String),
}

/// Interface to the keyed table holding all five entity kinds.
///
/// Implementations:
/// - `MemoryTableStore`: in-process table with index emulation (tests, dev)
/// - `DynamoTableStore`: DynamoDB (feature `dynamo`)
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Point read. A missing key is `Ok(None)`, never an error.
    async fn get(&self, key: &RecordKey) -> Result<Option<RawRecord>>;

    /// Full overwrite of the record at its embedded `pk`/`sk` key.
    ///
    /// Unconditional: there is no optimistic-lock check, so two concurrent
    /// writers to the same key resolve last-write-wins and a lost update is
    /// possible. Documented limitation, not masked.
    async fn put(&self, record: RawRecord) -> Result<()>;

    /// Point delete. Idempotent: deleting an absent key succeeds.
    async fn delete(&self, key: &RecordKey) -> Result<()>;

    /// Range read against the primary key or a named index. `limit`
    /// truncates the first page; pagination beyond it is out of scope.
    async fn query(&self, spec: &QuerySpec) -> Result<Vec<RawRecord>>;

    /// Filtered full-table read for administrative listings.
    async fn scan(&self, spec: &ScanSpec) -> Result<Vec<RawRecord>>;
}

/// Initialize a table store from configuration.
pub async fn init_store(config: &Config) -> Result<Arc<dyn TableStore>> {
    info!(store = %config.store.store_type, table = %config.store.table, "Initializing table store");

    match config.store.store_type.as_str() {
        "memory" => Ok(Arc::new(MemoryTableStore::new())),
        #[cfg(feature = "dynamo")]
        "dynamo" => {
            let store =
                DynamoTableStore::new(&config.store.table, config.store.endpoint_url.as_deref())
                    .await?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "dynamo"))]
        "dynamo" => Err(StoreError::UnknownStoreType(
            "dynamo (feature not enabled)".to_string(),
        )),
        other => Err(StoreError::UnknownStoreType(other.to_string())),
    }
}
