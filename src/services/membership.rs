//! Membership service: the N:N user↔group relation.
//!
//! A membership record exists iff the user is currently a member; there is
//! no redundant member list anywhere else. Memberships are created and
//! deleted as a unit, never partially updated.

use std::sync::Arc;

use tracing::debug;

use super::{now_millis, require, Result, ServiceError};
use crate::codec::{self, RecordKey};
use crate::index;
use crate::model::Membership;
use crate::store::TableStore;

pub struct MembershipService {
    store: Arc<dyn TableStore>,
}

impl MembershipService {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Join a user to a group. A duplicate (user, group) pair is a
    /// `Conflict`: re-joining would silently clobber `joinedAt` otherwise.
    ///
    /// Implemented as read-then-put; with no conditional writes on the
    /// store, two racing joins can both pass the read. The loser's record
    /// wins the overwrite, which is indistinguishable from a clean join.
    pub async fn create(&self, user_id: &str, group_id: &str) -> Result<Membership> {
        require(user_id, "user id")?;
        require(group_id, "group id")?;

        if self.get(user_id, group_id).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "user '{user_id}' is already a member of group '{group_id}'"
            )));
        }

        let membership = Membership {
            user_id: user_id.to_string(),
            group_id: group_id.to_string(),
            joined_at: now_millis(),
        };
        self.store.put(codec::encode_membership(&membership)).await?;
        debug!(%user_id, %group_id, "created membership");
        Ok(membership)
    }

    pub async fn get(&self, user_id: &str, group_id: &str) -> Result<Option<Membership>> {
        require(user_id, "user id")?;
        require(group_id, "group id")?;
        let found = self
            .store
            .get(&RecordKey::membership(user_id, group_id))
            .await?;
        found
            .as_ref()
            .map(codec::decode_membership)
            .transpose()
            .map_err(Into::into)
    }

    /// All groups a user belongs to.
    pub async fn of_user(&self, user_id: &str) -> Result<Vec<Membership>> {
        let records = self
            .store
            .query(&index::memberships_of_user(user_id)?)
            .await?;
        records
            .iter()
            .map(|r| codec::decode_membership(r).map_err(Into::into))
            .collect()
    }

    /// All members of a group, via the inverted index.
    pub async fn of_group(&self, group_id: &str) -> Result<Vec<Membership>> {
        let records = self
            .store
            .query(&index::memberships_of_group(group_id)?)
            .await?;
        records
            .iter()
            .map(|r| codec::decode_membership(r).map_err(Into::into))
            .collect()
    }

    /// Leave a group. Idempotent.
    pub async fn delete(&self, user_id: &str, group_id: &str) -> Result<()> {
        require(user_id, "user id")?;
        require(group_id, "group id")?;
        self.store
            .delete(&RecordKey::membership(user_id, group_id))
            .await?;
        Ok(())
    }
}
