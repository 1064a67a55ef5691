//! Message service.
//!
//! Messages are append-only: this service has no `update` operation, and
//! that absence is deliberate. `delete` exists for administrative repair
//! only and is not part of any user-facing flow.

use std::sync::Arc;

use tracing::debug;

use super::{new_id, now_millis, require, Result};
use crate::codec::{self, RecordKey};
use crate::index::{self, DEFAULT_RECENCY_LIMIT};
use crate::model::Message;
use crate::store::TableStore;

pub struct MessageService {
    store: Arc<dyn TableStore>,
    recency_limit: u32,
}

impl MessageService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self::with_recency_limit(store, DEFAULT_RECENCY_LIMIT)
    }

    /// Construct with a configured cap for recency-ordered reads
    /// (`query.recency_limit`).
    pub fn with_recency_limit(store: Arc<dyn TableStore>, recency_limit: u32) -> Self {
        Self {
            store,
            recency_limit,
        }
    }

    pub async fn create(
        &self,
        sender_user_id: &str,
        group_id: &str,
        thread_id: &str,
        content: &str,
    ) -> Result<Message> {
        require(sender_user_id, "sender user id")?;
        require(group_id, "group id")?;
        require(thread_id, "thread id")?;
        require(content, "content")?;

        let message = Message {
            message_id: new_id(),
            thread_id: thread_id.to_string(),
            group_id: group_id.to_string(),
            sender_user_id: sender_user_id.to_string(),
            content: content.to_string(),
            created_at: now_millis(),
        };
        self.store.put(codec::encode_message(&message)).await?;
        debug!(message_id = %message.message_id, %thread_id, "created message");
        Ok(message)
    }

    pub async fn get(&self, thread_id: &str, message_id: &str) -> Result<Option<Message>> {
        require(thread_id, "thread id")?;
        require(message_id, "message id")?;
        let found = self
            .store
            .get(&RecordKey::message(thread_id, message_id))
            .await?;
        found
            .as_ref()
            .map(codec::decode_message)
            .transpose()
            .map_err(Into::into)
    }

    pub async fn of_thread(&self, thread_id: &str) -> Result<Vec<Message>> {
        let records = self
            .store
            .query(&index::messages_of_thread(thread_id)?)
            .await?;
        records
            .iter()
            .map(|r| codec::decode_message(r).map_err(Into::into))
            .collect()
    }

    /// All messages of a group across its threads.
    pub async fn of_group(&self, group_id: &str) -> Result<Vec<Message>> {
        let records = self
            .store
            .query(&index::messages_of_group(group_id)?)
            .await?;
        records
            .iter()
            .map(|r| codec::decode_message(r).map_err(Into::into))
            .collect()
    }

    /// Newest messages first. When the caller omits `limit` the service's
    /// configured cap applies.
    pub async fn of_thread_by_recency(
        &self,
        thread_id: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Message>> {
        let limit = limit.unwrap_or(self.recency_limit);
        let records = self
            .store
            .query(&index::messages_of_thread_by_recency(thread_id, Some(limit))?)
            .await?;
        records
            .iter()
            .map(|r| codec::decode_message(r).map_err(Into::into))
            .collect()
    }

    /// Administrative delete. Not reachable from any user-facing flow.
    pub async fn delete(&self, thread_id: &str, message_id: &str) -> Result<()> {
        require(thread_id, "thread id")?;
        require(message_id, "message id")?;
        self.store
            .delete(&RecordKey::message(thread_id, message_id))
            .await?;
        Ok(())
    }
}
