//! Connection tracking and message fan-out.
//!
//! A user's live connection is a single optional `wssId` attribute on their
//! profile record; presence of the attribute is what makes the user visible
//! in the connection index. Fan-out resolves a group's members, keeps the
//! online ones, and pushes to each connection concurrently. A failed push
//! never fails the send and never affects the other recipients.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use crate::model::{Message, Thread, User};
use crate::services::{MembershipService, Result, ServiceError, UserService};

/// Errors raised by a push transport. These stay inside the broadcaster;
/// callers only ever see them aggregated in a [`DeliveryReport`].
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// The connection id no longer maps to a live connection.
    #[error("connection '{0}' is gone")]
    ConnectionGone(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

/// One live push channel keyed by connection id. The production transport
/// wraps the websocket gateway; tests substitute an in-memory recorder.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn push_to_connection(
        &self,
        connection_id: &str,
        payload: &MessagePayload,
    ) -> std::result::Result<(), PushError>;
}

/// Wire payload delivered to each recipient connection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    /// Always `"message"`; lets clients dispatch on payload type.
    pub action: &'static str,
    pub message: Message,
    pub user: SenderInfo,
    pub thread: ThreadInfo,
    pub time_stamp: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderInfo {
    pub user_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadInfo {
    pub thread_name: String,
    pub thread_color: String,
}

/// Outcome of one fan-out. `attempted` counts online recipients; offline
/// members are skipped silently and appear in no counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Tracks which connection, if any, a user currently holds.
pub struct ConnectionRegistry {
    users: Arc<UserService>,
}

impl ConnectionRegistry {
    pub fn new(users: Arc<UserService>) -> Self {
        Self { users }
    }

    /// Bind a connection id to a user. A user reconnecting before the old
    /// connection's disconnect arrives simply overwrites the stale id.
    pub async fn connect(&self, user_id: &str, connection_id: &str) -> Result<()> {
        let mut user = self
            .users
            .get(user_id)
            .await?
            .ok_or_else(|| ServiceError::InvalidInput(format!("user '{user_id}' not found")))?;
        user.wss_id = Some(connection_id.to_string());
        self.users.update(&user).await?;
        debug!(%user_id, %connection_id, "user connected");
        Ok(())
    }

    /// Clear whichever user holds this connection id. Idempotent: a
    /// connection id nobody holds (already cleared, or overwritten by a
    /// reconnect) is a no-op.
    pub async fn disconnect(&self, connection_id: &str) -> Result<()> {
        let Some(mut user) = self.users.get_by_connection_id(connection_id).await? else {
            debug!(%connection_id, "disconnect for unknown connection, ignoring");
            return Ok(());
        };
        user.wss_id = None;
        self.users.update(&user).await?;
        debug!(user_id = %user.user_id, %connection_id, "user disconnected");
        Ok(())
    }
}

/// Fans a message out to every online member of a group.
pub struct Broadcaster {
    memberships: Arc<MembershipService>,
    users: Arc<UserService>,
    transport: Arc<dyn PushTransport>,
}

impl Broadcaster {
    pub fn new(
        memberships: Arc<MembershipService>,
        users: Arc<UserService>,
        transport: Arc<dyn PushTransport>,
    ) -> Self {
        Self {
            memberships,
            users,
            transport,
        }
    }

    /// Resolve the group's online members and push to each concurrently.
    ///
    /// Errors while resolving recipients (membership query, user lookups)
    /// are returned; push failures are counted per-recipient and logged,
    /// never raised.
    pub async fn broadcast(
        &self,
        group_id: &str,
        message: &Message,
        thread: &Thread,
        sender_name: &str,
        timestamp: i64,
    ) -> Result<DeliveryReport> {
        let members = self.memberships.of_group(group_id).await?;

        let lookups = members.iter().map(|m| self.users.get(&m.user_id));
        let mut online: Vec<User> = Vec::new();
        for (member, resolved) in members.iter().zip(join_all(lookups).await) {
            match resolved? {
                Some(user) if user.wss_id.is_some() => online.push(user),
                Some(_) => {}
                None => {
                    // Membership pointing at a deleted user; skip it.
                    warn!(user_id = %member.user_id, %group_id, "member has no user record");
                }
            }
        }

        let payload = MessagePayload {
            action: "message",
            message: message.clone(),
            user: SenderInfo {
                user_name: sender_name.to_string(),
            },
            thread: ThreadInfo {
                thread_name: thread.thread_name.clone(),
                thread_color: thread.color.clone(),
            },
            time_stamp: timestamp,
        };

        let pushes = online.iter().filter_map(|user| {
            user.wss_id.as_deref().map(|connection_id| {
                let payload = &payload;
                async move {
                    (
                        user.user_id.as_str(),
                        connection_id,
                        self.transport.push_to_connection(connection_id, payload).await,
                    )
                }
            })
        });

        let mut report = DeliveryReport {
            attempted: online.len(),
            ..DeliveryReport::default()
        };
        for (user_id, connection_id, result) in join_all(pushes).await {
            match result {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    warn!(%user_id, %connection_id, error = %err, "push failed");
                    report.failed += 1;
                }
            }
        }

        debug!(
            %group_id,
            message_id = %message.message_id,
            attempted = report.attempted,
            delivered = report.delivered,
            failed = report.failed,
            "fan-out complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests;
