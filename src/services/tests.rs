use std::sync::Arc;

use super::*;
use crate::codec;
use crate::model::Message;
use crate::store::MemoryTableStore;

fn services() -> (Arc<MemoryTableStore>, Services) {
    let store = Arc::new(MemoryTableStore::new());
    let services = Services::new(store.clone());
    (store, services)
}

#[tokio::test]
async fn register_then_login_scenario() {
    let (_, svc) = services();

    let registered = svc
        .users
        .register("ada", "a@x.com", "1990-12-10", "correct horse", None)
        .await
        .unwrap();

    // Wrong password is invalid input, not "not found".
    let err = svc.users.login("a@x.com", "wrong").await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    // Correct password returns the record created at registration,
    // password field included (observed behavior, see UserService::login).
    let logged_in = svc
        .users
        .login("a@x.com", "correct horse")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(logged_in, registered);
    assert_eq!(logged_in.password, "correct horse");

    // Unknown email is absence, not an error.
    assert!(svc.users.login("b@x.com", "pw").await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_registration_is_a_conflict() {
    let (_, svc) = services();
    svc.users
        .register("ada", "a@x.com", "1990-12-10", "pw", None)
        .await
        .unwrap();

    let err = svc
        .users
        .register("impostor", "a@x.com", "1991-01-01", "pw2", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn missing_records_are_none_not_errors() {
    let (_, svc) = services();
    assert!(svc.users.get("ghost").await.unwrap().is_none());
    assert!(svc.groups.get("ghost").await.unwrap().is_none());
    assert!(svc.memberships.get("ghost", "ghost").await.unwrap().is_none());
    assert!(svc.threads.get("ghost", "ghost").await.unwrap().is_none());
    assert!(svc.messages.get("ghost", "ghost").await.unwrap().is_none());
}

#[tokio::test]
async fn empty_inputs_fail_fast() {
    let (_, svc) = services();
    assert!(matches!(
        svc.users.get("").await,
        Err(ServiceError::InvalidInput(_))
    ));
    assert!(matches!(
        svc.groups.create("", "🙂").await,
        Err(ServiceError::InvalidInput(_))
    ));
    assert!(matches!(
        svc.messages.of_thread("").await,
        Err(ServiceError::InvalidInput(_))
    ));
}

#[tokio::test]
async fn rejoining_a_group_is_a_conflict() {
    let (_, svc) = services();
    let group = svc.groups.create("club", "🙂").await.unwrap();

    svc.memberships.create("u-1", &group.group_id).await.unwrap();
    let err = svc
        .memberships
        .create("u-1", &group.group_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    // Exactly one membership survives.
    let members = svc.memberships.of_group(&group.group_id).await.unwrap();
    assert_eq!(members.len(), 1);
}

#[tokio::test]
async fn leave_then_rejoin_succeeds() {
    let (_, svc) = services();
    svc.memberships.create("u-1", "g-1").await.unwrap();
    svc.memberships.delete("u-1", "g-1").await.unwrap();
    assert!(svc.memberships.get("u-1", "g-1").await.unwrap().is_none());
    svc.memberships.create("u-1", "g-1").await.unwrap();
}

#[tokio::test]
async fn update_is_read_modify_write() {
    let (_, svc) = services();
    let group = svc.groups.create("club", "🙂").await.unwrap();

    let mut current = svc.groups.get(&group.group_id).await.unwrap().unwrap();
    current.last_message_at = Some(1_700_000_000_000);
    svc.groups.update(&current).await.unwrap();

    let reread = svc.groups.get(&group.group_id).await.unwrap().unwrap();
    assert_eq!(reread.last_message_at, Some(1_700_000_000_000));
    assert_eq!(reread.group_name, "club");
}

#[tokio::test]
async fn message_recency_returns_newest_two_in_order() {
    let (store, svc) = services();

    // Fixed timestamps: service-side stamping has millisecond resolution,
    // too coarse to order back-to-back creates deterministically.
    for (id, at) in [("m1", 10), ("m2", 20), ("m3", 30), ("m4", 40), ("m5", 50)] {
        store
            .put(codec::encode_message(&Message {
                message_id: id.into(),
                thread_id: "t-1".into(),
                group_id: "g-1".into(),
                sender_user_id: "u-1".into(),
                content: id.into(),
                created_at: at,
            }))
            .await
            .unwrap();
    }

    let newest = svc
        .messages
        .of_thread_by_recency("t-1", Some(2))
        .await
        .unwrap();
    let ids: Vec<&str> = newest.iter().map(|m| m.message_id.as_str()).collect();
    assert_eq!(ids, vec!["m5", "m4"]);
}

#[tokio::test]
async fn configured_recency_limit_caps_unbounded_reads() {
    let store = Arc::new(MemoryTableStore::new());
    let mut config = crate::config::Config::default();
    config.query.recency_limit = 3;
    let svc = Services::from_config(store.clone(), &config);

    for (id, at) in [("m1", 10), ("m2", 20), ("m3", 30), ("m4", 40), ("m5", 50)] {
        store
            .put(codec::encode_message(&Message {
                message_id: id.into(),
                thread_id: "t-1".into(),
                group_id: "g-1".into(),
                sender_user_id: "u-1".into(),
                content: id.into(),
                created_at: at,
            }))
            .await
            .unwrap();
    }

    // No caller-supplied limit: the configured cap applies.
    let newest = svc
        .messages
        .of_thread_by_recency("t-1", None)
        .await
        .unwrap();
    assert_eq!(newest.len(), 3);
    assert_eq!(newest[0].message_id, "m5");

    // An explicit limit still wins over the configured one.
    let two = svc
        .messages
        .of_thread_by_recency("t-1", Some(2))
        .await
        .unwrap();
    assert_eq!(two.len(), 2);
}

#[tokio::test]
async fn messages_of_group_spans_threads() {
    let (_, svc) = services();
    svc.messages.create("u-1", "g-1", "t-1", "one").await.unwrap();
    svc.messages.create("u-1", "g-1", "t-2", "two").await.unwrap();
    svc.messages.create("u-1", "g-9", "t-9", "other").await.unwrap();

    let in_group = svc.messages.of_group("g-1").await.unwrap();
    assert_eq!(in_group.len(), 2);
    assert!(in_group.iter().all(|m| m.group_id == "g-1"));
}

#[tokio::test]
async fn thread_recency_orders_by_activity() {
    let (_, svc) = services();
    let quiet = svc.threads.create("g-1", "quiet", "#111").await.unwrap();
    let busy = svc.threads.create("g-1", "busy", "#222").await.unwrap();

    let mut bumped = busy.clone();
    bumped.last_message_at = Some(now_millis() + 60_000);
    svc.threads.update(&bumped).await.unwrap();

    let ordered = svc.threads.of_group_by_recency("g-1", None).await.unwrap();
    assert_eq!(ordered[0].thread_id, busy.thread_id);
    assert_eq!(ordered[1].thread_id, quiet.thread_id);
}

#[tokio::test]
async fn store_faults_propagate_as_store_errors() {
    let (store, svc) = services();
    store.set_fail_writes(true).await;

    let err = svc.groups.create("club", "🙂").await.unwrap_err();
    assert!(matches!(err, ServiceError::Store(_)));
}
