//! Entity codec: bidirectional mapping between logical entities and the flat
//! key/attribute records stored in the table.
//!
//! Decoding is strict: a missing or wrongly-typed required attribute is a
//! `CodecError`, never a silent default. Encoding omits unset optional
//! fields entirely — no null placeholders — so attribute absence keeps a
//! record out of any index keyed on that attribute.

use std::collections::HashMap;

use crate::model::{Entity, EntityKind, Group, Membership, Message, Thread, User};

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors produced while decoding a raw record.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("missing required attribute '{0}'")]
    MissingAttribute(&'static str),

    #[error("attribute '{0}' has the wrong type")]
    WrongType(&'static str),

    #[error("unrecognized key shape: pk='{pk}', sk='{sk}'")]
    UnknownKeyShape { pk: String, sk: String },
}

/// A single stored attribute value. The table only ever holds strings and
/// integer numbers (epoch-millisecond timestamps).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    S(String),
    N(i64),
}

/// A flat record as stored in the table.
pub type RawRecord = HashMap<String, AttrValue>;

/// Key prefixes and fixed sort keys.
pub const USER_PREFIX: &str = "USER#";
pub const GROUP_PREFIX: &str = "GROUP#";
pub const THREAD_PREFIX: &str = "THREAD#";
pub const MESSAGE_PREFIX: &str = "MESSAGE#";
pub const PROFILE_SK: &str = "PROFILE";
pub const METADATA_SK: &str = "METADATA";

/// Composite primary key of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub pk: String,
    pub sk: String,
}

impl RecordKey {
    pub fn user_profile(user_id: &str) -> Self {
        Self {
            pk: format!("{USER_PREFIX}{user_id}"),
            sk: PROFILE_SK.to_string(),
        }
    }

    pub fn group_metadata(group_id: &str) -> Self {
        Self {
            pk: format!("{GROUP_PREFIX}{group_id}"),
            sk: METADATA_SK.to_string(),
        }
    }

    pub fn membership(user_id: &str, group_id: &str) -> Self {
        Self {
            pk: format!("{USER_PREFIX}{user_id}"),
            sk: format!("{GROUP_PREFIX}{group_id}"),
        }
    }

    pub fn thread(group_id: &str, thread_id: &str) -> Self {
        Self {
            pk: format!("{GROUP_PREFIX}{group_id}"),
            sk: format!("{THREAD_PREFIX}{thread_id}"),
        }
    }

    pub fn message(thread_id: &str, message_id: &str) -> Self {
        Self {
            pk: format!("{THREAD_PREFIX}{thread_id}"),
            sk: format!("{MESSAGE_PREFIX}{message_id}"),
        }
    }
}

fn req_s(record: &RawRecord, name: &'static str) -> Result<String> {
    match record.get(name) {
        Some(AttrValue::S(s)) => Ok(s.clone()),
        Some(_) => Err(CodecError::WrongType(name)),
        None => Err(CodecError::MissingAttribute(name)),
    }
}

fn req_n(record: &RawRecord, name: &'static str) -> Result<i64> {
    match record.get(name) {
        Some(AttrValue::N(n)) => Ok(*n),
        Some(_) => Err(CodecError::WrongType(name)),
        None => Err(CodecError::MissingAttribute(name)),
    }
}

fn opt_s(record: &RawRecord, name: &'static str) -> Result<Option<String>> {
    match record.get(name) {
        Some(AttrValue::S(s)) => Ok(Some(s.clone())),
        Some(_) => Err(CodecError::WrongType(name)),
        None => Ok(None),
    }
}

fn opt_n(record: &RawRecord, name: &'static str) -> Result<Option<i64>> {
    match record.get(name) {
        Some(AttrValue::N(n)) => Ok(Some(*n)),
        Some(_) => Err(CodecError::WrongType(name)),
        None => Ok(None),
    }
}

fn put_s(record: &mut RawRecord, name: &str, value: &str) {
    record.insert(name.to_string(), AttrValue::S(value.to_string()));
}

fn put_n(record: &mut RawRecord, name: &str, value: i64) {
    record.insert(name.to_string(), AttrValue::N(value));
}

/// Classify a raw record by its key shape.
pub fn kind_of(record: &RawRecord) -> Result<EntityKind> {
    let pk = req_s(record, "pk")?;
    let sk = req_s(record, "sk")?;
    match () {
        _ if pk.starts_with(USER_PREFIX) && sk == PROFILE_SK => Ok(EntityKind::User),
        _ if pk.starts_with(GROUP_PREFIX) && sk == METADATA_SK => Ok(EntityKind::Group),
        _ if pk.starts_with(USER_PREFIX) && sk.starts_with(GROUP_PREFIX) => {
            Ok(EntityKind::Membership)
        }
        _ if pk.starts_with(GROUP_PREFIX) && sk.starts_with(THREAD_PREFIX) => {
            Ok(EntityKind::Thread)
        }
        _ if pk.starts_with(THREAD_PREFIX) && sk.starts_with(MESSAGE_PREFIX) => {
            Ok(EntityKind::Message)
        }
        _ => Err(CodecError::UnknownKeyShape { pk, sk }),
    }
}

/// Decode a raw record into the matching entity variant.
pub fn decode(record: &RawRecord) -> Result<Entity> {
    match kind_of(record)? {
        EntityKind::User => decode_user(record).map(Entity::User),
        EntityKind::Group => decode_group(record).map(Entity::Group),
        EntityKind::Membership => decode_membership(record).map(Entity::Membership),
        EntityKind::Thread => decode_thread(record).map(Entity::Thread),
        EntityKind::Message => decode_message(record).map(Entity::Message),
    }
}

/// Encode any entity variant into a raw record.
pub fn encode(entity: &Entity) -> RawRecord {
    match entity {
        Entity::User(u) => encode_user(u),
        Entity::Group(g) => encode_group(g),
        Entity::Membership(m) => encode_membership(m),
        Entity::Thread(t) => encode_thread(t),
        Entity::Message(m) => encode_message(m),
    }
}

pub fn encode_user(user: &User) -> RawRecord {
    let key = RecordKey::user_profile(&user.user_id);
    let mut record = RawRecord::new();
    put_s(&mut record, "pk", &key.pk);
    put_s(&mut record, "sk", &key.sk);
    put_s(&mut record, "userId", &user.user_id);
    put_s(&mut record, "userName", &user.user_name);
    put_s(&mut record, "email", &user.email);
    put_s(&mut record, "password", &user.password);
    put_s(&mut record, "dateOfBirth", &user.date_of_birth);
    put_n(&mut record, "createdAt", user.created_at);
    if let Some(url) = &user.user_image_url {
        put_s(&mut record, "userImageUrl", url);
    }
    if let Some(wss) = &user.wss_id {
        put_s(&mut record, "wssId", wss);
    }
    record
}

pub fn decode_user(record: &RawRecord) -> Result<User> {
    Ok(User {
        user_id: req_s(record, "userId")?,
        user_name: req_s(record, "userName")?,
        email: req_s(record, "email")?,
        password: req_s(record, "password")?,
        date_of_birth: req_s(record, "dateOfBirth")?,
        created_at: req_n(record, "createdAt")?,
        user_image_url: opt_s(record, "userImageUrl")?,
        wss_id: opt_s(record, "wssId")?,
    })
}

pub fn encode_group(group: &Group) -> RawRecord {
    let key = RecordKey::group_metadata(&group.group_id);
    let mut record = RawRecord::new();
    put_s(&mut record, "pk", &key.pk);
    put_s(&mut record, "sk", &key.sk);
    put_s(&mut record, "groupId", &group.group_id);
    put_s(&mut record, "groupName", &group.group_name);
    put_s(&mut record, "emoticon", &group.emoticon);
    put_n(&mut record, "createdAt", group.created_at);
    if let Some(at) = group.last_message_at {
        put_n(&mut record, "lastMessageAt", at);
    }
    record
}

pub fn decode_group(record: &RawRecord) -> Result<Group> {
    Ok(Group {
        group_id: req_s(record, "groupId")?,
        group_name: req_s(record, "groupName")?,
        emoticon: req_s(record, "emoticon")?,
        created_at: req_n(record, "createdAt")?,
        last_message_at: opt_n(record, "lastMessageAt")?,
    })
}

pub fn encode_membership(membership: &Membership) -> RawRecord {
    let key = RecordKey::membership(&membership.user_id, &membership.group_id);
    let mut record = RawRecord::new();
    put_s(&mut record, "pk", &key.pk);
    put_s(&mut record, "sk", &key.sk);
    put_s(&mut record, "userId", &membership.user_id);
    put_s(&mut record, "groupId", &membership.group_id);
    put_n(&mut record, "joinedAt", membership.joined_at);
    record
}

pub fn decode_membership(record: &RawRecord) -> Result<Membership> {
    Ok(Membership {
        user_id: req_s(record, "userId")?,
        group_id: req_s(record, "groupId")?,
        joined_at: req_n(record, "joinedAt")?,
    })
}

pub fn encode_thread(thread: &Thread) -> RawRecord {
    let key = RecordKey::thread(&thread.group_id, &thread.thread_id);
    let mut record = RawRecord::new();
    put_s(&mut record, "pk", &key.pk);
    put_s(&mut record, "sk", &key.sk);
    put_s(&mut record, "threadId", &thread.thread_id);
    put_s(&mut record, "groupId", &thread.group_id);
    put_s(&mut record, "threadName", &thread.thread_name);
    put_s(&mut record, "color", &thread.color);
    put_n(&mut record, "createdAt", thread.created_at);
    if let Some(at) = thread.last_message_at {
        put_n(&mut record, "lastMessageAt", at);
    }
    record
}

pub fn decode_thread(record: &RawRecord) -> Result<Thread> {
    Ok(Thread {
        thread_id: req_s(record, "threadId")?,
        group_id: req_s(record, "groupId")?,
        thread_name: req_s(record, "threadName")?,
        color: req_s(record, "color")?,
        created_at: req_n(record, "createdAt")?,
        last_message_at: opt_n(record, "lastMessageAt")?,
    })
}

pub fn encode_message(message: &Message) -> RawRecord {
    let key = RecordKey::message(&message.thread_id, &message.message_id);
    let mut record = RawRecord::new();
    put_s(&mut record, "pk", &key.pk);
    put_s(&mut record, "sk", &key.sk);
    put_s(&mut record, "messageId", &message.message_id);
    put_s(&mut record, "threadId", &message.thread_id);
    put_s(&mut record, "groupId", &message.group_id);
    put_s(&mut record, "senderUserId", &message.sender_user_id);
    put_s(&mut record, "content", &message.content);
    put_n(&mut record, "createdAt", message.created_at);
    // Group-scoped message index key pair.
    put_s(
        &mut record,
        "gsi1pk",
        &format!("{GROUP_PREFIX}{}", message.group_id),
    );
    put_s(
        &mut record,
        "gsi1sk",
        &format!(
            "{THREAD_PREFIX}{}#{MESSAGE_PREFIX}{}",
            message.thread_id, message.message_id
        ),
    );
    record
}

pub fn decode_message(record: &RawRecord) -> Result<Message> {
    Ok(Message {
        message_id: req_s(record, "messageId")?,
        thread_id: req_s(record, "threadId")?,
        group_id: req_s(record, "groupId")?,
        sender_user_id: req_s(record, "senderUserId")?,
        content: req_s(record, "content")?,
        created_at: req_n(record, "createdAt")?,
    })
}

#[cfg(test)]
mod tests;
