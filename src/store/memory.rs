//! In-memory table store with index emulation.
//!
//! Reproduces the store semantics the services rely on, in particular the
//! attribute-presence rule: a record missing an index's partition (or sort)
//! attribute is invisible to that index. Used for tests and local
//! development; carries failure-injection switches for exercising the
//! `StoreUnavailable` paths.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{Result, StoreError, TableStore};
use crate::codec::{kind_of, AttrValue, RawRecord, RecordKey};
use crate::index::{QuerySpec, ScanSpec};

/// In-memory `TableStore` backed by a `pk`/`sk`-keyed map.
#[derive(Default)]
pub struct MemoryTableStore {
    records: RwLock<HashMap<(String, String), RawRecord>>,
    fail_reads: RwLock<bool>,
    fail_writes: RwLock<bool>,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every get/query/scan fail with `StoreError::Unavailable`.
    pub async fn set_fail_reads(&self, fail: bool) {
        *self.fail_reads.write().await = fail;
    }

    /// Make every put/delete fail with `StoreError::Unavailable`.
    pub async fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.write().await = fail;
    }

    /// Number of stored records (test helper).
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn string_attr(record: &RawRecord, name: &str) -> Option<String> {
        match record.get(name) {
            Some(AttrValue::S(s)) => Some(s.clone()),
            _ => None,
        }
    }

    fn check(flag: bool, op: &str) -> Result<()> {
        if flag {
            Err(StoreError::Unavailable(format!("injected {op} failure")))
        } else {
            Ok(())
        }
    }
}

fn cmp_attr(a: &AttrValue, b: &AttrValue) -> Ordering {
    match (a, b) {
        (AttrValue::S(x), AttrValue::S(y)) => x.cmp(y),
        (AttrValue::N(x), AttrValue::N(y)) => x.cmp(y),
        // Mixed types never share a real index; order them stably anyway.
        (AttrValue::N(_), AttrValue::S(_)) => Ordering::Less,
        (AttrValue::S(_), AttrValue::N(_)) => Ordering::Greater,
    }
}

#[async_trait]
impl TableStore for MemoryTableStore {
    async fn get(&self, key: &RecordKey) -> Result<Option<RawRecord>> {
        Self::check(*self.fail_reads.read().await, "get")?;
        let records = self.records.read().await;
        Ok(records.get(&(key.pk.clone(), key.sk.clone())).cloned())
    }

    async fn put(&self, record: RawRecord) -> Result<()> {
        Self::check(*self.fail_writes.read().await, "put")?;
        let pk = Self::string_attr(&record, "pk")
            .ok_or_else(|| StoreError::Unavailable("record has no pk attribute".to_string()))?;
        let sk = Self::string_attr(&record, "sk")
            .ok_or_else(|| StoreError::Unavailable("record has no sk attribute".to_string()))?;

        let kind = kind_of(&record).map(|k| k.as_str()).unwrap_or("unknown");
        debug!(%pk, %sk, kind, "put record");
        self.records.write().await.insert((pk, sk), record);
        Ok(())
    }

    async fn delete(&self, key: &RecordKey) -> Result<()> {
        Self::check(*self.fail_writes.read().await, "delete")?;
        self.records
            .write()
            .await
            .remove(&(key.pk.clone(), key.sk.clone()));
        Ok(())
    }

    async fn query(&self, spec: &QuerySpec) -> Result<Vec<RawRecord>> {
        Self::check(*self.fail_reads.read().await, "query")?;

        let (partition_attr, sort_attr) = match spec.index {
            Some(index) => (index.partition_attr(), index.sort_attr()),
            None => ("pk", Some("sk")),
        };

        let records = self.records.read().await;
        let mut matched: Vec<RawRecord> = records
            .values()
            .filter(|record| {
                Self::string_attr(record, partition_attr).as_deref()
                    == Some(spec.partition_value.as_str())
            })
            // A record missing the index's sort attribute is not in the index.
            .filter(|record| sort_attr.map_or(true, |attr| record.contains_key(attr)))
            .filter(|record| match (&spec.sort_prefix, sort_attr) {
                (Some(prefix), Some(attr)) => Self::string_attr(record, attr)
                    .is_some_and(|value| value.starts_with(prefix.as_str())),
                (Some(_), None) => false,
                (None, _) => true,
            })
            .cloned()
            .collect();
        drop(records);

        if let Some(attr) = sort_attr {
            matched.sort_by(|a, b| {
                match (a.get(attr), b.get(attr)) {
                    (Some(x), Some(y)) => cmp_attr(x, y),
                    _ => Ordering::Equal,
                }
                // Tie-break on the primary sort key for determinism.
                .then_with(|| {
                    Self::string_attr(a, "sk")
                        .unwrap_or_default()
                        .cmp(&Self::string_attr(b, "sk").unwrap_or_default())
                })
            });
        }
        if spec.descending {
            matched.reverse();
        }
        if let Some(limit) = spec.limit {
            matched.truncate(limit as usize);
        }

        debug!(
            index = ?spec.index.map(|i| i.as_str()),
            partition = %spec.partition_value,
            count = matched.len(),
            "query"
        );
        Ok(matched)
    }

    async fn scan(&self, spec: &ScanSpec) -> Result<Vec<RawRecord>> {
        Self::check(*self.fail_reads.read().await, "scan")?;

        let records = self.records.read().await;
        let mut matched: Vec<RawRecord> = records
            .values()
            .filter(|record| {
                Self::string_attr(record, "pk")
                    .is_some_and(|pk| pk.starts_with(spec.pk_prefix.as_str()))
                    && Self::string_attr(record, "sk").as_deref() == Some(spec.sk_equals.as_str())
            })
            .cloned()
            .collect();

        matched.sort_by_key(|record| Self::string_attr(record, "pk").unwrap_or_default());
        Ok(matched)
    }
}
