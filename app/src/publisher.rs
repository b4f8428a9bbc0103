//! Event capture and transactional publishing.
//!
//! After a unit of work commits, the publisher is handed every comment
//! aggregate that was touched and still has pending events. For each
//! aggregate it clears the pending events exactly once (a no-op for
//! aggregates with none) and hands one integration event per domain event to
//! the broker, in the order the aggregates were enumerated.
//!
//! # Failure policy
//!
//! Durability of the fact and durability of its propagation are decoupled.
//! If publishing fails after the commit already succeeded, the write is NOT
//! rolled back: the comment exists, but propagation is lost for that event.
//! The loss is surfaced to operators via an error-level log line carrying
//! the comment id, never silently hidden and never retried here. (An outbox
//! table with a relay process would upgrade this to at-least-once; that is
//! a deliberate non-feature, see DESIGN.md.)

use comments_core::comment::{Comment, CommentId, DomainEvent};
use comments_core::event::{
    CommentCreated, Event, IntegrationEvent, SerializedEvent, COMMENT_EVENTS_TOPIC,
};
use comments_core::event_bus::EventBus;
use std::sync::Arc;

/// Publishes integration events for committed aggregates.
pub struct TransactionalPublisher {
    event_bus: Arc<dyn EventBus>,
    topic: String,
}

impl TransactionalPublisher {
    /// Creates a publisher targeting the default comment-events topic.
    #[must_use]
    pub fn new(event_bus: Arc<dyn EventBus>) -> Self {
        Self {
            event_bus,
            topic: COMMENT_EVENTS_TOPIC.to_string(),
        }
    }

    /// Overrides the target topic.
    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Harvests pending events from the committed aggregates and publishes
    /// one integration event per harvested event.
    ///
    /// Must only be called after the storage commit succeeded: the
    /// integration events are built from the now-durable comment fields.
    /// Aggregates without pending events are skipped (harvesting is
    /// idempotent). Publish failures are logged and swallowed.
    pub async fn publish_committed(&self, comments: &mut [Comment]) {
        for comment in comments.iter_mut() {
            for event in comment.take_events() {
                match event {
                    DomainEvent::CommentCreated { comment_id } => {
                        let integration = IntegrationEvent::CommentCreated(CommentCreated {
                            comment_id,
                            user_name: comment.user_name().to_string(),
                            email: comment.email().to_string(),
                            text: comment.text().to_string(),
                            created_at: comment.created_at(),
                        });
                        self.publish(comment_id, &integration).await;
                    }
                }
            }
        }
    }

    async fn publish(&self, comment_id: CommentId, event: &IntegrationEvent) {
        let serialized = match SerializedEvent::from_event(event, None) {
            Ok(serialized) => serialized,
            Err(error) => {
                tracing::error!(
                    comment_id = %comment_id,
                    error = %error,
                    "failed to serialize integration event; propagation lost"
                );
                return;
            }
        };

        match self.event_bus.publish(&self.topic, &serialized).await {
            Ok(()) => {
                tracing::debug!(
                    comment_id = %comment_id,
                    event_type = event.event_type(),
                    topic = %self.topic,
                    "integration event published"
                );
            }
            Err(error) => {
                // The comment is durable but will stay absent from search
                // and realtime for this delivery unless reconciled manually.
                tracing::error!(
                    comment_id = %comment_id,
                    event_type = event.event_type(),
                    topic = %self.topic,
                    error = %error,
                    "publish failed after commit; propagation lost for this event"
                );
            }
        }
    }
}
