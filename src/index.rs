//! Index router: one pure builder per access pattern.
//!
//! Each builder turns validated logical inputs into the physical query
//! parameters (index name, partition value, optional sort prefix, order,
//! cap). Builders perform no I/O; empty required inputs fail fast instead of
//! producing a query that would walk the whole table.

use crate::codec::{
    GROUP_PREFIX, MESSAGE_PREFIX, METADATA_SK, PROFILE_SK, THREAD_PREFIX, USER_PREFIX,
};

/// Result type for access-pattern builders.
pub type Result<T> = std::result::Result<T, AccessPatternError>;

/// A required input to an access pattern was empty or malformed.
#[derive(Debug, thiserror::Error)]
#[error("invalid access pattern input: {0} must not be empty")]
pub struct AccessPatternError(pub &'static str);

/// Default result cap for recency-ordered message reads when the caller
/// does not supply one.
pub const DEFAULT_RECENCY_LIMIT: u32 = 10;

/// Named secondary indexes on the chat table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexName {
    /// Equality lookup on `email`.
    UserEmail,
    /// Equality lookup on `wssId`. Records without a live connection carry
    /// no `wssId` attribute and are therefore invisible here.
    UserConnection,
    /// Inverted primary key (`sk` as partition): memberships of a group.
    MembershipGroup,
    /// Group-scoped message index (`gsi1pk`/`gsi1sk`).
    GroupMessages,
    /// Threads of a group ordered by `lastMessageAt`.
    ThreadRecency,
    /// Messages of a thread ordered by `createdAt`.
    MessageRecency,
}

impl IndexName {
    /// Physical index name as provisioned on the table.
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexName::UserEmail => "gsi_user_email",
            IndexName::UserConnection => "gsi_user_connection",
            IndexName::MembershipGroup => "gsi_membership_group",
            IndexName::GroupMessages => "gsi_group_messages",
            IndexName::ThreadRecency => "lsi_thread_recency",
            IndexName::MessageRecency => "lsi_message_recency",
        }
    }

    /// Attribute the index partitions on.
    pub fn partition_attr(&self) -> &'static str {
        match self {
            IndexName::UserEmail => "email",
            IndexName::UserConnection => "wssId",
            IndexName::MembershipGroup => "sk",
            IndexName::GroupMessages => "gsi1pk",
            IndexName::ThreadRecency | IndexName::MessageRecency => "pk",
        }
    }

    /// Attribute the index sorts on, if any.
    pub fn sort_attr(&self) -> Option<&'static str> {
        match self {
            IndexName::UserEmail | IndexName::UserConnection => None,
            IndexName::MembershipGroup => Some("pk"),
            IndexName::GroupMessages => Some("gsi1sk"),
            IndexName::ThreadRecency => Some("lastMessageAt"),
            IndexName::MessageRecency => Some("createdAt"),
        }
    }
}

/// Physical parameters for one range read. `index: None` targets the
/// primary key. `limit` truncates the first page; there is no pagination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub index: Option<IndexName>,
    pub partition_value: String,
    /// `begins_with` condition on the index's sort attribute.
    pub sort_prefix: Option<String>,
    pub descending: bool,
    pub limit: Option<u32>,
}

impl QuerySpec {
    fn on_primary(partition_value: String) -> Self {
        Self {
            index: None,
            partition_value,
            sort_prefix: None,
            descending: false,
            limit: None,
        }
    }

    fn on_index(index: IndexName, partition_value: String) -> Self {
        Self {
            index: Some(index),
            partition_value,
            sort_prefix: None,
            descending: false,
            limit: None,
        }
    }
}

/// Physical parameters for a full-table scan filtered by key shape.
/// Administrative listings only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSpec {
    pub pk_prefix: String,
    pub sk_equals: String,
}

fn non_empty<'a>(value: &'a str, name: &'static str) -> Result<&'a str> {
    if value.trim().is_empty() {
        Err(AccessPatternError(name))
    } else {
        Ok(value)
    }
}

/// Equality lookup of a user by email.
pub fn users_by_email(email: &str) -> Result<QuerySpec> {
    let email = non_empty(email, "email")?;
    Ok(QuerySpec::on_index(IndexName::UserEmail, email.to_string()))
}

/// Equality lookup of a user by live connection id.
pub fn users_by_connection_id(connection_id: &str) -> Result<QuerySpec> {
    let id = non_empty(connection_id, "connection id")?;
    Ok(QuerySpec::on_index(IndexName::UserConnection, id.to_string()))
}

/// All memberships of one user, via the primary key. The sort prefix keeps
/// the user's profile row out of the result.
pub fn memberships_of_user(user_id: &str) -> Result<QuerySpec> {
    let user_id = non_empty(user_id, "user id")?;
    let mut spec = QuerySpec::on_primary(format!("{USER_PREFIX}{user_id}"));
    spec.sort_prefix = Some(GROUP_PREFIX.to_string());
    Ok(spec)
}

/// All memberships of one group, via the inverted index.
pub fn memberships_of_group(group_id: &str) -> Result<QuerySpec> {
    let group_id = non_empty(group_id, "group id")?;
    Ok(QuerySpec::on_index(
        IndexName::MembershipGroup,
        format!("{GROUP_PREFIX}{group_id}"),
    ))
}

/// All threads of a group in sort-key order.
pub fn threads_of_group(group_id: &str) -> Result<QuerySpec> {
    let group_id = non_empty(group_id, "group id")?;
    let mut spec = QuerySpec::on_primary(format!("{GROUP_PREFIX}{group_id}"));
    spec.sort_prefix = Some(THREAD_PREFIX.to_string());
    Ok(spec)
}

/// Threads of a group, most recently active first.
pub fn threads_of_group_by_recency(group_id: &str, limit: Option<u32>) -> Result<QuerySpec> {
    let group_id = non_empty(group_id, "group id")?;
    let mut spec = QuerySpec::on_index(
        IndexName::ThreadRecency,
        format!("{GROUP_PREFIX}{group_id}"),
    );
    spec.descending = true;
    spec.limit = limit;
    Ok(spec)
}

/// All messages of a thread in sort-key order.
pub fn messages_of_thread(thread_id: &str) -> Result<QuerySpec> {
    let thread_id = non_empty(thread_id, "thread id")?;
    let mut spec = QuerySpec::on_primary(format!("{THREAD_PREFIX}{thread_id}"));
    spec.sort_prefix = Some(MESSAGE_PREFIX.to_string());
    Ok(spec)
}

/// All messages of a group across its threads, via the group message index.
pub fn messages_of_group(group_id: &str) -> Result<QuerySpec> {
    let group_id = non_empty(group_id, "group id")?;
    Ok(QuerySpec::on_index(
        IndexName::GroupMessages,
        format!("{GROUP_PREFIX}{group_id}"),
    ))
}

/// Newest messages of a thread, newest first, capped at `limit`
/// (default [`DEFAULT_RECENCY_LIMIT`]).
pub fn messages_of_thread_by_recency(thread_id: &str, limit: Option<u32>) -> Result<QuerySpec> {
    let thread_id = non_empty(thread_id, "thread id")?;
    let mut spec = QuerySpec::on_index(
        IndexName::MessageRecency,
        format!("{THREAD_PREFIX}{thread_id}"),
    );
    spec.descending = true;
    spec.limit = Some(limit.unwrap_or(DEFAULT_RECENCY_LIMIT));
    Ok(spec)
}

/// Administrative scan for all user profiles.
pub fn all_users() -> ScanSpec {
    ScanSpec {
        pk_prefix: USER_PREFIX.to_string(),
        sk_equals: PROFILE_SK.to_string(),
    }
}

/// Administrative scan for all group metadata rows.
pub fn all_groups() -> ScanSpec {
    ScanSpec {
        pk_prefix: GROUP_PREFIX.to_string(),
        sk_equals: METADATA_SK.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_reject_empty_inputs() {
        assert!(users_by_email("").is_err());
        assert!(users_by_connection_id("  ").is_err());
        assert!(memberships_of_user("").is_err());
        assert!(memberships_of_group("").is_err());
        assert!(threads_of_group("").is_err());
        assert!(threads_of_group_by_recency("", None).is_err());
        assert!(messages_of_thread("").is_err());
        assert!(messages_of_group("").is_err());
        assert!(messages_of_thread_by_recency("", None).is_err());
    }

    #[test]
    fn membership_queries_target_both_sides_of_the_relation() {
        let by_user = memberships_of_user("u-1").unwrap();
        assert_eq!(by_user.index, None);
        assert_eq!(by_user.partition_value, "USER#u-1");
        assert_eq!(by_user.sort_prefix.as_deref(), Some("GROUP#"));

        let by_group = memberships_of_group("g-1").unwrap();
        assert_eq!(by_group.index, Some(IndexName::MembershipGroup));
        assert_eq!(by_group.partition_value, "GROUP#g-1");
    }

    #[test]
    fn recency_queries_are_descending() {
        let threads = threads_of_group_by_recency("g-1", Some(5)).unwrap();
        assert!(threads.descending);
        assert_eq!(threads.limit, Some(5));
        assert_eq!(threads.index, Some(IndexName::ThreadRecency));

        let messages = messages_of_thread_by_recency("t-1", None).unwrap();
        assert!(messages.descending);
        assert_eq!(messages.limit, Some(DEFAULT_RECENCY_LIMIT));
    }

    #[test]
    fn connection_lookup_is_keyed_on_the_wss_attribute() {
        let spec = users_by_connection_id("conn-9").unwrap();
        assert_eq!(spec.index, Some(IndexName::UserConnection));
        assert_eq!(spec.partition_value, "conn-9");
        assert_eq!(IndexName::UserConnection.partition_attr(), "wssId");
    }

    #[test]
    fn admin_scans_filter_by_key_shape() {
        let users = all_users();
        assert_eq!(users.pk_prefix, "USER#");
        assert_eq!(users.sk_equals, "PROFILE");

        let groups = all_groups();
        assert_eq!(groups.pk_prefix, "GROUP#");
        assert_eq!(groups.sk_equals, "METADATA");
    }
}
