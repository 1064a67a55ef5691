//! Thread service: conversation threads scoped under a group.

use std::sync::Arc;

use tracing::debug;

use super::{new_id, now_millis, require, Result};
use crate::codec::{self, RecordKey};
use crate::index;
use crate::model::{EntityKind, Thread};
use crate::store::TableStore;

pub struct ThreadService {
    store: Arc<dyn TableStore>,
}

impl ThreadService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Create a thread. `lastMessageAt` is seeded with the creation time so
    /// a fresh thread is present in the recency index before its first
    /// message arrives.
    pub async fn create(&self, group_id: &str, thread_name: &str, color: &str) -> Result<Thread> {
        require(group_id, "group id")?;
        require(thread_name, "thread name")?;

        let now = now_millis();
        let thread = Thread {
            thread_id: new_id(),
            group_id: group_id.to_string(),
            thread_name: thread_name.to_string(),
            color: color.to_string(),
            created_at: now,
            last_message_at: Some(now),
        };
        self.store.put(codec::encode_thread(&thread)).await?;
        debug!(thread_id = %thread.thread_id, %group_id, "created thread");
        Ok(thread)
    }

    pub async fn get(&self, group_id: &str, thread_id: &str) -> Result<Option<Thread>> {
        require(group_id, "group id")?;
        require(thread_id, "thread id")?;
        let found = self
            .store
            .get(&RecordKey::thread(group_id, thread_id))
            .await?;
        found
            .as_ref()
            .map(codec::decode_thread)
            .transpose()
            .map_err(Into::into)
    }

    pub async fn of_group(&self, group_id: &str) -> Result<Vec<Thread>> {
        let records = self.store.query(&index::threads_of_group(group_id)?).await?;
        records
            .iter()
            .map(|r| codec::decode_thread(r).map_err(Into::into))
            .collect()
    }

    /// Threads of a group, most recently active first.
    ///
    /// The recency index is keyed on the shared `GROUP#` partition, so on a
    /// store whose indexes admit every record carrying the sort attribute
    /// the group's own metadata row can appear here. Records of any other
    /// kind are filtered out before decoding.
    pub async fn of_group_by_recency(
        &self,
        group_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Thread>> {
        let records = self
            .store
            .query(&index::threads_of_group_by_recency(group_id, limit)?)
            .await?;
        records
            .iter()
            .filter(|r| codec::kind_of(r).is_ok_and(|k| k == EntityKind::Thread))
            .map(|r| codec::decode_thread(r).map_err(Into::into))
            .collect()
    }

    /// Full-record overwrite.
    pub async fn update(&self, thread: &Thread) -> Result<()> {
        require(&thread.thread_id, "thread id")?;
        require(&thread.group_id, "group id")?;
        self.store.put(codec::encode_thread(thread)).await?;
        Ok(())
    }

    pub async fn delete(&self, group_id: &str, thread_id: &str) -> Result<()> {
        require(group_id, "group id")?;
        require(thread_id, "thread id")?;
        self.store
            .delete(&RecordKey::thread(group_id, thread_id))
            .await?;
        Ok(())
    }
}
