//! Broker abstraction between the publisher and the consumers.
//!
//! The write path commits to storage first, then hands one integration event
//! per harvested domain event to the [`EventBus`]. Two consumers (the search
//! indexer and the realtime notifier) subscribe independently; the bus
//! delivers at least once per consumer group, so handlers must be idempotent
//! or loss-tolerant.
//!
//! ```text
//! ┌──────────────┐
//! │ create       │
//! │ comment      │
//! └──────┬───────┘
//!        ▼
//! ┌──────────────┐
//! │ 1. commit    │◄── source of truth
//! │   (storage)  │
//! └──────┬───────┘
//!        ▼
//! ┌──────────────┐
//! │ 2. publish   │◄── best-effort after commit
//! │  (event bus) │
//! └──────┬───────┘
//!    ┌───┴────┐
//!    ▼        ▼
//! ┌──────┐ ┌────────┐
//! │search│ │realtime│
//! │index │ │notifier│
//! └──────┘ └────────┘
//! ```
//!
//! If publishing fails after the commit succeeded, the write is **not**
//! rolled back: the comment exists but its propagation is lost for that
//! delivery. The publisher logs this loudly; see the application crate.

use crate::event::SerializedEvent;
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during event bus operations.
#[derive(Error, Debug, Clone)]
pub enum EventBusError {
    /// Failed to connect to the broker.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Failed to publish an event to a topic.
    #[error("publish failed for topic '{topic}': {reason}")]
    PublishFailed {
        /// The topic that failed.
        topic: String,
        /// The reason for failure.
        reason: String,
    },

    /// Failed to subscribe to topics.
    #[error("subscription failed for topics {topics:?}: {reason}")]
    SubscriptionFailed {
        /// The topics that failed to subscribe.
        topics: Vec<String>,
        /// The reason for failure.
        reason: String,
    },

    /// Failed to deserialize an event.
    #[error("deserialization failed: {0}")]
    DeserializationFailed(String),

    /// Network or transport error.
    #[error("transport error: {0}")]
    TransportError(String),

    /// Generic error for other failures.
    #[error("event bus error: {0}")]
    Other(String),
}

/// Stream of events from a subscription.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<SerializedEvent, EventBusError>> + Send>>;

/// Single-publisher/multi-consumer transport between the transactional
/// publisher and the consumers.
///
/// # Delivery Semantics
///
/// - **At-least-once** per consumer group: a consumer may see the same event
///   twice, so side effects must be idempotent (index upsert) or
///   loss-tolerant (push fan-out)
/// - **No cross-event ordering guarantee** is required by consumers: each
///   integration event is self-contained
///
/// # Dyn Compatibility
///
/// Methods return explicit `Pin<Box<dyn Future>>` instead of `async fn` so
/// the bus can be shared as `Arc<dyn EventBus>` across the publisher and the
/// consumer runners.
pub trait EventBus: Send + Sync {
    /// Publish an event to a topic.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::PublishFailed`] if the broker rejects or
    /// cannot accept the event.
    fn publish(
        &self,
        topic: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>>;

    /// Subscribe to one or more topics and receive a stream of events.
    ///
    /// Each subscription is an independent consumer: two subscribers to the
    /// same topic each receive every event (multi-consumer fan-out).
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::SubscriptionFailed`] if the subscription
    /// cannot be established.
    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>>;
}
