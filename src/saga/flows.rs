//! The two compound-write flows built on the saga coordinator.
//!
//! Group creation compensates: a group must never exist without its founder
//! membership. Message send tolerates: once the message row is written it is
//! durably sent, and the denormalized recency timestamps degrade to
//! staleness rather than triggering rollback.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use super::{Saga, SagaOutcome, SagaStep, StepAction};
use crate::fanout::{Broadcaster, DeliveryReport};
use crate::model::{Group, Message};
use crate::services::{now_millis, require, ServiceError, Services};
use crate::store::StoreError;

/// Result of a message send: the durably persisted message and what
/// happened during fan-out.
#[derive(Debug)]
pub struct SendReceipt {
    pub message: Message,
    pub delivery: DeliveryReport,
}

fn missing_saga_state(what: &str) -> ServiceError {
    ServiceError::Store(StoreError::Unavailable(format!("saga state missing: {what}")))
}

/// Create a group together with its founder's membership.
///
/// On membership failure the just-created group row is deleted; if that
/// compensating delete also fails, the orphaned group (a group with zero
/// memberships) has already been logged at error level by the coordinator
/// and the original membership error is returned.
pub async fn create_group_with_founder(
    services: &Services,
    founder_user_id: &str,
    group_name: &str,
    emoticon: &str,
) -> Result<Group, ServiceError> {
    require(founder_user_id, "founder user id")?;
    require(group_name, "group name")?;

    let created: Arc<Mutex<Option<Group>>> = Arc::new(Mutex::new(None));

    let create_group: StepAction = {
        let groups = services.groups.clone();
        let slot = created.clone();
        let group_name = group_name.to_string();
        let emoticon = emoticon.to_string();
        Box::new(move || {
            let groups = groups.clone();
            let slot = slot.clone();
            let group_name = group_name.clone();
            let emoticon = emoticon.clone();
            Box::pin(async move {
                let group = groups.create(&group_name, &emoticon).await?;
                *slot.lock().await = Some(group);
                Ok(())
            })
        })
    };

    let delete_group: StepAction = {
        let groups = services.groups.clone();
        let slot = created.clone();
        Box::new(move || {
            let groups = groups.clone();
            let slot = slot.clone();
            Box::pin(async move {
                match slot.lock().await.as_ref() {
                    Some(group) => groups.delete(&group.group_id).await,
                    None => Ok(()),
                }
            })
        })
    };

    let create_membership: StepAction = {
        let memberships = services.memberships.clone();
        let slot = created.clone();
        let founder = founder_user_id.to_string();
        Box::new(move || {
            let memberships = memberships.clone();
            let slot = slot.clone();
            let founder = founder.clone();
            Box::pin(async move {
                let group_id = slot
                    .lock()
                    .await
                    .as_ref()
                    .map(|g| g.group_id.clone())
                    .ok_or_else(|| missing_saga_state("group was not created"))?;
                memberships.create(&founder, &group_id).await?;
                Ok(())
            })
        })
    };

    let outcome = Saga::new("create_group_with_founder")
        .step(SagaStep::compensable(
            "create_group",
            create_group,
            delete_group,
        ))
        .step(SagaStep::pivotal("create_founder_membership", create_membership))
        .run()
        .await;

    match outcome {
        SagaOutcome::Committed => {
            let group = created.lock().await.take();
            group.ok_or_else(|| missing_saga_state("committed without a group"))
        }
        SagaOutcome::Failed { error, .. } => Err(error),
        // Compensation failure was logged by the coordinator; the caller
        // sees the original error that broke the saga.
        SagaOutcome::Orphaned { error, .. } => Err(error),
    }
}

/// Persist a message, refresh the denormalized recency timestamps, and fan
/// the message out to the group's online members.
///
/// The recency updates and the fan-out are best-effort: after the message
/// row is written, nothing makes the send fail.
pub async fn send_message(
    services: &Services,
    broadcaster: &Broadcaster,
    sender_user_id: &str,
    group_id: &str,
    thread_id: &str,
    content: &str,
) -> Result<SendReceipt, ServiceError> {
    let thread = services
        .threads
        .get(group_id, thread_id)
        .await?
        .ok_or_else(|| ServiceError::InvalidInput(format!("thread '{thread_id}' not found")))?;
    let sender = services
        .users
        .get(sender_user_id)
        .await?
        .ok_or_else(|| ServiceError::InvalidInput(format!("user '{sender_user_id}' not found")))?;
    let group = services
        .groups
        .get(group_id)
        .await?
        .ok_or_else(|| ServiceError::InvalidInput(format!("group '{group_id}' not found")))?;

    let timestamp = now_millis();
    let sent: Arc<Mutex<Option<Message>>> = Arc::new(Mutex::new(None));

    let create_message: StepAction = {
        let messages = services.messages.clone();
        let slot = sent.clone();
        let sender_id = sender_user_id.to_string();
        let group_id = group_id.to_string();
        let thread_id = thread_id.to_string();
        let content = content.to_string();
        Box::new(move || {
            let messages = messages.clone();
            let slot = slot.clone();
            let sender_id = sender_id.clone();
            let group_id = group_id.clone();
            let thread_id = thread_id.clone();
            let content = content.clone();
            Box::pin(async move {
                let message = messages
                    .create(&sender_id, &group_id, &thread_id, &content)
                    .await?;
                *slot.lock().await = Some(message);
                Ok(())
            })
        })
    };

    let touch_thread: StepAction = {
        let threads = services.threads.clone();
        let mut thread = thread.clone();
        thread.last_message_at = Some(timestamp);
        Box::new(move || {
            let threads = threads.clone();
            let thread = thread.clone();
            Box::pin(async move { threads.update(&thread).await })
        })
    };

    let touch_group: StepAction = {
        let groups = services.groups.clone();
        let mut group = group.clone();
        group.last_message_at = Some(timestamp);
        Box::new(move || {
            let groups = groups.clone();
            let group = group.clone();
            Box::pin(async move { groups.update(&group).await })
        })
    };

    let outcome = Saga::new("send_message")
        .step(SagaStep::pivotal("create_message", create_message))
        .step(SagaStep::tolerant("touch_thread_recency", touch_thread))
        .step(SagaStep::tolerant("touch_group_recency", touch_group))
        .run()
        .await;

    let message = match outcome {
        SagaOutcome::Committed => sent
            .lock()
            .await
            .take()
            .ok_or_else(|| missing_saga_state("committed without a message"))?,
        SagaOutcome::Failed { error, .. } | SagaOutcome::Orphaned { error, .. } => {
            return Err(error)
        }
    };

    // The message is durable; delivery problems are reported, never raised.
    let delivery = match broadcaster
        .broadcast(group_id, &message, &thread, &sender.user_name, timestamp)
        .await
    {
        Ok(report) => report,
        Err(err) => {
            warn!(%group_id, error = %err, "fan-out aborted after durable send");
            DeliveryReport::default()
        }
    };

    Ok(SendReceipt { message, delivery })
}
