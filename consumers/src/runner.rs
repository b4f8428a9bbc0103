//! Drives one consumer over the comment-events stream.
//!
//! ```text
//! ┌─────────────┐
//! │   Broker    │
//! └──────┬──────┘
//!        │ events (own consumer group)
//!        ▼
//! ┌──────────────┐
//! │ConsumerRunner│──▶ decode ──▶ dispatch ──▶ side effect
//! └──────────────┘         │            │
//!                     log & skip   log & continue
//! ```
//!
//! Two runners, one for the search indexer and one for the realtime notifier,
//! run concurrently and independently. A per-event failure is logged and
//! swallowed at this boundary; it never stops the stream, and it never
//! touches the other runner. Shutdown is cooperative via a watch channel:
//! cancellation aborts the in-flight handler for the current event without
//! affecting the other consumer or the committed comment.

use crate::retry::RetryPolicy;
use comments_core::consumer::{ConsumerError, EventConsumer};
use comments_core::event::{IntegrationEvent, SerializedEvent};
use comments_core::event_bus::EventBus;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::watch;

/// Orchestrates one consumer's subscription, dispatch, and shutdown.
pub struct ConsumerRunner {
    consumer: Arc<dyn EventConsumer>,
    event_bus: Arc<dyn EventBus>,
    topic: String,
    retry: Option<RetryPolicy>,
    shutdown: watch::Receiver<bool>,
}

impl ConsumerRunner {
    /// Create a runner for `consumer` on `topic`.
    ///
    /// The `event_bus` must be configured with this consumer's own consumer
    /// group so its delivery is independent of every other consumer.
    ///
    /// Returns the runner and a shutdown sender; send `true` to stop it.
    #[must_use]
    pub fn new(
        consumer: Arc<dyn EventConsumer>,
        event_bus: Arc<dyn EventBus>,
        topic: impl Into<String>,
    ) -> (Self, watch::Sender<bool>) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let runner = Self {
            consumer,
            event_bus,
            topic: topic.into(),
            retry: None,
            shutdown: shutdown_rx,
        };

        (runner, shutdown_tx)
    }

    /// Enable retrying failed handlers under the given policy.
    ///
    /// Without a policy a failed event is logged and dropped, matching the
    /// no-retry/no-dead-letter default of the pipeline.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Subscribe and process events until a shutdown signal arrives.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerError::Subscription`] when the broker subscription
    /// cannot be established. Per-event failures do not surface here.
    pub async fn start(&mut self) -> Result<(), ConsumerError> {
        let consumer_name = self.consumer.name().to_string();
        tracing::info!(
            consumer = %consumer_name,
            topic = %self.topic,
            retry = self.retry.is_some(),
            "starting consumer runner"
        );

        let mut event_stream = self
            .event_bus
            .subscribe(&[self.topic.as_str()])
            .await
            .map_err(|e| ConsumerError::Subscription(e.to_string()))?;

        while !*self.shutdown.borrow() {
            tokio::select! {
                maybe_event = event_stream.next() => {
                    let Some(event_result) = maybe_event else {
                        tracing::warn!(consumer = %consumer_name, "event stream ended");
                        break;
                    };
                    match event_result {
                        Ok(serialized) => self.process(&consumer_name, &serialized).await,
                        Err(e) => {
                            tracing::error!(
                                consumer = %consumer_name,
                                error = %e,
                                "error receiving event from broker"
                            );
                            // Stream errors are transient; the bus reconnects.
                        }
                    }
                }

                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        tracing::info!(consumer = %consumer_name, "shutdown signal received");
                        break;
                    }
                }
            }
        }

        tracing::info!(consumer = %consumer_name, "consumer runner stopped");
        Ok(())
    }

    /// Decode and dispatch a single event, isolating every failure.
    async fn process(&self, consumer_name: &str, serialized: &SerializedEvent) {
        let event = match IntegrationEvent::from_serialized(serialized) {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(
                    consumer = %consumer_name,
                    event_type = %serialized.event_type,
                    error = %e,
                    "failed to decode event; skipping"
                );
                return;
            }
        };

        let mut shutdown = self.shutdown.clone();
        tokio::select! {
            result = self.dispatch(&event) => {
                if let Err(e) = result {
                    tracing::error!(
                        consumer = %consumer_name,
                        event_type = %serialized.event_type,
                        error = %e,
                        "consumer failed; event dropped"
                    );
                }
            }
            _ = shutdown.changed() => {
                // Abort this consumer's side effect for this event only.
                tracing::warn!(
                    consumer = %consumer_name,
                    event_type = %serialized.event_type,
                    "cancelled while handling event"
                );
            }
        }
    }

    async fn dispatch(&self, event: &IntegrationEvent) -> Result<(), ConsumerError> {
        let Some(policy) = &self.retry else {
            return self.consumer.consume(event).await;
        };

        let mut attempt = 0;
        loop {
            match self.consumer.consume(event).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < policy.max_retries => {
                    let delay = policy.delay_for_attempt(attempt);
                    tracing::warn!(
                        consumer = self.consumer.name(),
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "consumer failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use comments_core::comment::CommentId;
    use comments_core::event::{CommentCreated, COMMENT_EVENTS_TOPIC};
    use comments_testing::InMemoryEventBus;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Counts deliveries; fails the first `fail_first` of them.
    struct CountingConsumer {
        calls: AtomicUsize,
        fail_first: usize,
    }

    impl CountingConsumer {
        fn new(fail_first: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl EventConsumer for CountingConsumer {
        fn name(&self) -> &str {
            "counting-consumer"
        }

        fn consume(
            &self,
            _event: &IntegrationEvent,
        ) -> Pin<Box<dyn Future<Output = Result<(), ConsumerError>> + Send + '_>> {
            Box::pin(async move {
                let call = self.calls.fetch_add(1, Ordering::SeqCst);
                if call < self.fail_first {
                    Err(ConsumerError::Decode("injected failure".to_string()))
                } else {
                    Ok(())
                }
            })
        }
    }

    fn publish_sample(bus: &InMemoryEventBus) -> impl Future<Output = ()> + '_ {
        let event = IntegrationEvent::CommentCreated(CommentCreated {
            comment_id: CommentId::generate(),
            user_name: "alice".to_string(),
            email: "alice@example.com".to_string(),
            text: "hello".to_string(),
            created_at: Utc::now(),
        });
        let serialized = SerializedEvent::from_event(&event, None).unwrap();
        async move {
            bus.publish(COMMENT_EVENTS_TOPIC, &serialized).await.unwrap();
        }
    }

    #[tokio::test]
    async fn delivers_events_to_the_consumer() {
        let bus = Arc::new(InMemoryEventBus::new());
        let consumer = Arc::new(CountingConsumer::new(0));
        let (mut runner, shutdown) =
            ConsumerRunner::new(consumer.clone(), bus.clone(), COMMENT_EVENTS_TOPIC);

        let handle = tokio::spawn(async move { runner.start().await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        publish_sample(&bus).await;
        publish_sample(&bus).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        shutdown.send(true).unwrap();
        handle.await.unwrap().unwrap();

        assert_eq!(consumer.calls(), 2);
    }

    #[tokio::test]
    async fn a_failing_event_does_not_stop_the_stream() {
        let bus = Arc::new(InMemoryEventBus::new());
        let consumer = Arc::new(CountingConsumer::new(1));
        let (mut runner, shutdown) =
            ConsumerRunner::new(consumer.clone(), bus.clone(), COMMENT_EVENTS_TOPIC);

        let handle = tokio::spawn(async move { runner.start().await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        publish_sample(&bus).await; // fails, logged, dropped
        publish_sample(&bus).await; // still delivered
        tokio::time::sleep(Duration::from_millis(50)).await;

        shutdown.send(true).unwrap();
        handle.await.unwrap().unwrap();

        assert_eq!(consumer.calls(), 2);
    }

    #[tokio::test]
    async fn retry_policy_gives_failed_events_more_attempts() {
        let bus = Arc::new(InMemoryEventBus::new());
        let consumer = Arc::new(CountingConsumer::new(2));
        let (runner, shutdown) =
            ConsumerRunner::new(consumer.clone(), bus.clone(), COMMENT_EVENTS_TOPIC);
        let mut runner = runner.with_retry_policy(
            RetryPolicy::builder()
                .max_retries(3)
                .initial_delay(Duration::from_millis(1))
                .build(),
        );

        let handle = tokio::spawn(async move { runner.start().await });
        tokio::time::sleep(Duration::from_millis(50)).await;

        publish_sample(&bus).await; // fails twice, succeeds on third attempt
        tokio::time::sleep(Duration::from_millis(100)).await;

        shutdown.send(true).unwrap();
        handle.await.unwrap().unwrap();

        assert_eq!(consumer.calls(), 3);
    }

    #[tokio::test]
    async fn subscription_failure_surfaces() {
        let bus = Arc::new(comments_testing::FailingEventBus::new());
        let consumer = Arc::new(CountingConsumer::new(0));
        let (mut runner, _shutdown) = ConsumerRunner::new(consumer, bus, COMMENT_EVENTS_TOPIC);

        let result = runner.start().await;
        assert!(matches!(result, Err(ConsumerError::Subscription(_))));
    }
}
