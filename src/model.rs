//! Logical entity records stored in the chat table.
//!
//! Five entity kinds share one physical table, disambiguated by key prefix.
//! The `Entity` enum is the closed tagged-variant view produced by the codec,
//! so callers never re-parse `pk`/`sk` prefixes themselves.

use serde::{Deserialize, Serialize};

/// A registered account.
///
/// `wss_id` holds at most one live connection id. It is `None` while the
/// user is offline; the encoded record then carries no `wssId` attribute at
/// all, which keeps offline users out of the connection index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub user_name: String,
    pub email: String,
    pub password: String,
    pub date_of_birth: String,
    /// Epoch milliseconds, stamped once at creation.
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wss_id: Option<String>,
}

/// A chat group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub group_id: String,
    pub group_name: String,
    pub emoticon: String,
    pub created_at: i64,
    /// Denormalized copy of the newest message timestamp in the group.
    /// Refreshed best-effort on message send; may lag the true newest message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<i64>,
}

/// The N:N user↔group relation. Presence of this record is the sole source
/// of truth for group membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub user_id: String,
    pub group_id: String,
    pub joined_at: i64,
}

/// A conversation thread scoped under its owning group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub thread_id: String,
    pub group_id: String,
    pub thread_name: String,
    pub color: String,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<i64>,
}

/// A message. Append-only: created once, never updated; deletion exists only
/// as an administrative operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub message_id: String,
    pub thread_id: String,
    pub group_id: String,
    pub sender_user_id: String,
    pub content: String,
    pub created_at: i64,
}

/// Discriminant for the five entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Group,
    Membership,
    Thread,
    Message,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Group => "group",
            EntityKind::Membership => "membership",
            EntityKind::Thread => "thread",
            EntityKind::Message => "message",
        }
    }
}

/// Closed tagged-variant view over all entity kinds, produced by the codec.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    User(User),
    Group(Group),
    Membership(Membership),
    Thread(Thread),
    Message(Message),
}

impl Entity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::User(_) => EntityKind::User,
            Entity::Group(_) => EntityKind::Group,
            Entity::Membership(_) => EntityKind::Membership,
            Entity::Thread(_) => EntityKind::Thread,
            Entity::Message(_) => EntityKind::Message,
        }
    }
}
