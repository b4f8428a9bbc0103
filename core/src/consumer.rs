//! Consumer boundary: one side effect per integration event.
//!
//! Consumers are isolated units of work over the same event stream, not a
//! pipeline: the search indexer and the realtime notifier each run under
//! their own broker subscription, and one failing never prevents or delays
//! the other. A consumer's error is caught at its boundary by the runner,
//! logged, and swallowed.

use crate::event::IntegrationEvent;
use crate::push::PushError;
use crate::search::SearchError;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Error type for consumer execution.
#[derive(Error, Debug)]
pub enum ConsumerError {
    /// The broker subscription could not be established.
    #[error("subscription failed: {0}")]
    Subscription(String),

    /// The event payload could not be decoded.
    #[error("failed to decode integration event: {0}")]
    Decode(String),

    /// The event payload could not be re-encoded for the side effect.
    #[error("failed to encode payload: {0}")]
    Encode(String),

    /// The search index rejected the side effect.
    #[error(transparent)]
    Search(#[from] SearchError),

    /// The push channel rejected the side effect.
    #[error(transparent)]
    Push(#[from] PushError),
}

/// A registered consumer of integration events.
///
/// Implementations match on the [`IntegrationEvent`] variants they care
/// about (the union is compile-time enumerable) and perform exactly one
/// side effect against their own external system. Consumers must not share
/// mutable state with each other.
pub trait EventConsumer: Send + Sync {
    /// Stable consumer name, used for the broker consumer group and logs.
    fn name(&self) -> &str;

    /// Applies this consumer's side effect for one event.
    ///
    /// Must be idempotent under redelivery (the broker is at-least-once) or
    /// loss-tolerant by design.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerError`]; the runner logs it and continues with the
    /// next event.
    fn consume(
        &self,
        event: &IntegrationEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), ConsumerError>> + Send + '_>>;
}
