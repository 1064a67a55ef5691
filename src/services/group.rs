//! Group service.

use std::sync::Arc;

use tracing::debug;

use super::{new_id, now_millis, require, Result};
use crate::codec::{self, RecordKey};
use crate::index;
use crate::model::Group;
use crate::store::TableStore;

pub struct GroupService {
    store: Arc<dyn TableStore>,
}

impl GroupService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, group_name: &str, emoticon: &str) -> Result<Group> {
        require(group_name, "group name")?;

        let group = Group {
            group_id: new_id(),
            group_name: group_name.to_string(),
            emoticon: emoticon.to_string(),
            created_at: now_millis(),
            last_message_at: None,
        };
        self.store.put(codec::encode_group(&group)).await?;
        debug!(group_id = %group.group_id, "created group");
        Ok(group)
    }

    pub async fn get(&self, group_id: &str) -> Result<Option<Group>> {
        require(group_id, "group id")?;
        let found = self.store.get(&RecordKey::group_metadata(group_id)).await?;
        found
            .as_ref()
            .map(codec::decode_group)
            .transpose()
            .map_err(Into::into)
    }

    /// Administrative listing of all groups.
    pub async fn list(&self) -> Result<Vec<Group>> {
        let records = self.store.scan(&index::all_groups()).await?;
        records
            .iter()
            .map(|r| codec::decode_group(r).map_err(Into::into))
            .collect()
    }

    /// Full-record overwrite.
    pub async fn update(&self, group: &Group) -> Result<()> {
        require(&group.group_id, "group id")?;
        self.store.put(codec::encode_group(group)).await?;
        Ok(())
    }

    pub async fn delete(&self, group_id: &str) -> Result<()> {
        require(group_id, "group id")?;
        self.store
            .delete(&RecordKey::group_metadata(group_id))
            .await?;
        Ok(())
    }
}
