//! Entity services: one per entity kind, built on the index router and the
//! table store.
//!
//! Conventions shared by every service:
//! - the store is injected (`Arc<dyn TableStore>`), never a global
//! - `create` stamps `createdAt` and generates the id; ids are never
//!   caller-supplied
//! - `update` is a full-record overwrite; callers read-modify-write
//! - a missing record is `Ok(None)`, never an error

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::codec::CodecError;
use crate::config::Config;
use crate::index::AccessPatternError;
use crate::store::{StoreError, TableStore};

pub mod group;
pub mod membership;
pub mod message;
pub mod thread;
pub mod user;

pub use group::GroupService;
pub use membership::MembershipService;
pub use message::MessageService;
pub use thread::ThreadService;
pub use user::UserService;

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors surfaced by entity services.
///
/// "Not found" is deliberately absent: services return it as `Ok(None)` so
/// the caller decides whether absence is expected.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("malformed record: {0}")]
    Malformed(#[from] CodecError),
}

impl From<AccessPatternError> for ServiceError {
    fn from(err: AccessPatternError) -> Self {
        ServiceError::InvalidInput(err.to_string())
    }
}

/// Bundle of all five services over one shared store.
#[derive(Clone)]
pub struct Services {
    pub users: Arc<UserService>,
    pub groups: Arc<GroupService>,
    pub memberships: Arc<MembershipService>,
    pub threads: Arc<ThreadService>,
    pub messages: Arc<MessageService>,
}

impl Services {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self {
            users: Arc::new(UserService::new(store.clone())),
            groups: Arc::new(GroupService::new(store.clone())),
            memberships: Arc::new(MembershipService::new(store.clone())),
            threads: Arc::new(ThreadService::new(store.clone())),
            messages: Arc::new(MessageService::new(store)),
        }
    }

    /// Construct with configured query behavior (`query.recency_limit`).
    pub fn from_config(store: Arc<dyn TableStore>, config: &Config) -> Self {
        let mut services = Self::new(store.clone());
        services.messages = Arc::new(MessageService::with_recency_limit(
            store,
            config.query.recency_limit,
        ));
        services
    }
}

/// Current time as epoch milliseconds.
pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Fresh entity id.
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub(crate) fn require(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(ServiceError::InvalidInput(format!(
            "{name} must not be empty"
        )))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests;
