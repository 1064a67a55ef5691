use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::*;
use crate::model::Thread;
use crate::services::Services;
use crate::store::MemoryTableStore;

/// Records every push; fails pushes to connection ids in `failing`.
#[derive(Default)]
struct RecordingTransport {
    pushed: Mutex<Vec<(String, MessagePayload)>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingTransport {
    async fn fail_connection(&self, connection_id: &str) {
        self.failing.lock().await.insert(connection_id.to_string());
    }

    async fn pushed_connections(&self) -> Vec<String> {
        self.pushed.lock().await.iter().map(|(c, _)| c.clone()).collect()
    }
}

#[async_trait]
impl PushTransport for RecordingTransport {
    async fn push_to_connection(
        &self,
        connection_id: &str,
        payload: &MessagePayload,
    ) -> std::result::Result<(), PushError> {
        if self.failing.lock().await.contains(connection_id) {
            return Err(PushError::ConnectionGone(connection_id.to_string()));
        }
        self.pushed
            .lock()
            .await
            .push((connection_id.to_string(), payload.clone()));
        Ok(())
    }
}

struct Fixture {
    services: Services,
    registry: ConnectionRegistry,
    broadcaster: Broadcaster,
    transport: Arc<RecordingTransport>,
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryTableStore::new());
    let services = Services::new(store);
    let transport = Arc::new(RecordingTransport::default());
    Fixture {
        registry: ConnectionRegistry::new(services.users.clone()),
        broadcaster: Broadcaster::new(
            services.memberships.clone(),
            services.users.clone(),
            transport.clone(),
        ),
        services,
        transport,
    }
}

async fn member(fx: &Fixture, name: &str, group_id: &str) -> String {
    let user = fx
        .services
        .users
        .create(name, &format!("{name}@x.com"), "1990-01-01", "pw", None)
        .await
        .unwrap();
    fx.services
        .memberships
        .create(&user.user_id, group_id)
        .await
        .unwrap();
    user.user_id
}

fn sample_thread(group_id: &str) -> Thread {
    Thread {
        thread_id: "t-1".into(),
        group_id: group_id.into(),
        thread_name: "general".into(),
        color: "#fff".into(),
        created_at: 1,
        last_message_at: Some(1),
    }
}

fn sample_message(group_id: &str, sender: &str) -> Message {
    Message {
        message_id: "m-1".into(),
        thread_id: "t-1".into(),
        group_id: group_id.into(),
        sender_user_id: sender.into(),
        content: "hello".into(),
        created_at: 2,
    }
}

#[tokio::test]
async fn broadcast_reaches_only_online_members() {
    let fx = fixture();
    let alice = member(&fx, "alice", "g-1").await;
    let bob = member(&fx, "bob", "g-1").await;
    let _carol = member(&fx, "carol", "g-1").await;

    fx.registry.connect(&alice, "conn-a").await.unwrap();
    fx.registry.connect(&bob, "conn-b").await.unwrap();
    // carol stays offline

    let report = fx
        .broadcaster
        .broadcast(
            "g-1",
            &sample_message("g-1", &alice),
            &sample_thread("g-1"),
            "alice",
            2,
        )
        .await
        .unwrap();

    assert_eq!(
        report,
        DeliveryReport {
            attempted: 2,
            delivered: 2,
            failed: 0
        }
    );
    let mut connections = fx.transport.pushed_connections().await;
    connections.sort();
    assert_eq!(connections, vec!["conn-a", "conn-b"]);
}

#[tokio::test]
async fn one_failed_push_does_not_block_the_others() {
    let fx = fixture();
    let alice = member(&fx, "alice", "g-1").await;
    let bob = member(&fx, "bob", "g-1").await;

    fx.registry.connect(&alice, "conn-a").await.unwrap();
    fx.registry.connect(&bob, "conn-b").await.unwrap();
    fx.transport.fail_connection("conn-a").await;

    let report = fx
        .broadcaster
        .broadcast(
            "g-1",
            &sample_message("g-1", &alice),
            &sample_thread("g-1"),
            "alice",
            2,
        )
        .await
        .unwrap();

    assert_eq!(report.attempted, 2);
    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(fx.transport.pushed_connections().await, vec!["conn-b"]);
}

#[tokio::test]
async fn broadcast_to_empty_group_delivers_nothing() {
    let fx = fixture();
    let report = fx
        .broadcaster
        .broadcast(
            "g-empty",
            &sample_message("g-empty", "u-1"),
            &sample_thread("g-empty"),
            "nobody",
            2,
        )
        .await
        .unwrap();
    assert_eq!(report, DeliveryReport::default());
}

#[tokio::test]
async fn payload_carries_sender_and_thread_context() {
    let fx = fixture();
    let alice = member(&fx, "alice", "g-1").await;
    fx.registry.connect(&alice, "conn-a").await.unwrap();

    fx.broadcaster
        .broadcast(
            "g-1",
            &sample_message("g-1", &alice),
            &sample_thread("g-1"),
            "alice",
            42,
        )
        .await
        .unwrap();

    let pushed = fx.transport.pushed.lock().await;
    let (_, payload) = &pushed[0];
    let json = serde_json::to_value(payload).unwrap();
    assert_eq!(json["action"], "message");
    assert_eq!(json["user"]["userName"], "alice");
    assert_eq!(json["thread"]["threadName"], "general");
    assert_eq!(json["thread"]["threadColor"], "#fff");
    assert_eq!(json["timeStamp"], 42);
    assert_eq!(json["message"]["content"], "hello");
}

#[tokio::test]
async fn reconnect_overwrites_the_previous_connection() {
    let fx = fixture();
    let alice = member(&fx, "alice", "g-1").await;

    fx.registry.connect(&alice, "conn-old").await.unwrap();
    fx.registry.connect(&alice, "conn-new").await.unwrap();

    assert!(fx
        .services
        .users
        .get_by_connection_id("conn-old")
        .await
        .unwrap()
        .is_none());
    let holder = fx
        .services
        .users
        .get_by_connection_id("conn-new")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(holder.user_id, alice);
}

#[tokio::test]
async fn disconnect_clears_the_connection_and_is_idempotent() {
    let fx = fixture();
    let alice = member(&fx, "alice", "g-1").await;
    fx.registry.connect(&alice, "conn-a").await.unwrap();

    fx.registry.disconnect("conn-a").await.unwrap();
    let user = fx.services.users.get(&alice).await.unwrap().unwrap();
    assert!(user.wss_id.is_none());

    // A second disconnect for the same id is a no-op, not an error.
    fx.registry.disconnect("conn-a").await.unwrap();
    fx.registry.disconnect("conn-never-seen").await.unwrap();
}

#[tokio::test]
async fn connect_requires_an_existing_user() {
    let fx = fixture();
    let err = fx.registry.connect("ghost", "conn-a").await.unwrap_err();
    assert!(matches!(err, crate::services::ServiceError::InvalidInput(_)));
}
