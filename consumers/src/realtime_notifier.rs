//! Realtime notifier consumer: push the event to every connected viewer.

use comments_core::consumer::{ConsumerError, EventConsumer};
use comments_core::event::IntegrationEvent;
use comments_core::push::PushChannel;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Consumer group under which the notifier subscribes to `comment-events`.
pub const REALTIME_NOTIFIER_GROUP: &str = "comment-realtime-notifier";

/// Event name clients listen for on the push channel.
pub const COMMENT_CREATED_PUSH_EVENT: &str = "CommentCreated";

/// Broadcasts each created comment to all currently connected viewers.
///
/// Fan-out is at-most-once per client and best-effort: no acks, no replay
/// buffer, no backlog for late joiners. Delivered independently of the
/// search indexer; a push failure is logged and swallowed by the runner
/// without touching the indexer's outcome.
pub struct RealtimeNotifierConsumer {
    channel: Arc<dyn PushChannel>,
}

impl RealtimeNotifierConsumer {
    /// Create the notifier over a push channel.
    #[must_use]
    pub fn new(channel: Arc<dyn PushChannel>) -> Self {
        Self { channel }
    }
}

impl EventConsumer for RealtimeNotifierConsumer {
    fn name(&self) -> &str {
        REALTIME_NOTIFIER_GROUP
    }

    fn consume(
        &self,
        event: &IntegrationEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), ConsumerError>> + Send + '_>> {
        let payload = match event {
            IntegrationEvent::CommentCreated(created) => serde_json::to_value(created),
        };

        Box::pin(async move {
            let payload = payload.map_err(|e| ConsumerError::Encode(e.to_string()))?;
            self.channel
                .broadcast_all(COMMENT_CREATED_PUSH_EVENT, payload)
                .await?;
            tracing::info!("comment broadcast to connected viewers");
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use comments_core::comment::CommentId;
    use comments_core::event::CommentCreated;
    use comments_testing::{FailingPushChannel, RecordingPushChannel};

    fn created_event() -> IntegrationEvent {
        IntegrationEvent::CommentCreated(CommentCreated {
            comment_id: CommentId::generate(),
            user_name: "alice".to_string(),
            email: "alice@example.com".to_string(),
            text: "hello".to_string(),
            created_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn broadcasts_the_denormalized_fields() {
        let channel = Arc::new(RecordingPushChannel::new());
        let consumer = RealtimeNotifierConsumer::new(channel.clone());

        consumer.consume(&created_event()).await.unwrap();

        let broadcasts = channel.broadcasts();
        assert_eq!(broadcasts.len(), 1);
        let (event_name, payload) = &broadcasts[0];
        assert_eq!(event_name, COMMENT_CREATED_PUSH_EVENT);
        assert_eq!(payload.get("userName").and_then(|v| v.as_str()), Some("alice"));
        assert!(payload.get("commentId").is_some());
        assert!(payload.get("createdAt").is_some());
    }

    #[tokio::test]
    async fn push_failure_surfaces_to_the_runner() {
        let consumer = RealtimeNotifierConsumer::new(Arc::new(FailingPushChannel));

        let result = consumer.consume(&created_event()).await;

        assert!(matches!(result, Err(ConsumerError::Push(_))));
    }
}
