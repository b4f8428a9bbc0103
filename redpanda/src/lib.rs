//! Kafka-compatible broker transport for `comment-events`.
//!
//! One producer (the write path's transactional publisher) and two
//! consumers (the search indexer and the realtime notifier) share a single
//! topic. The bus is constructed per role:
//!
//! - [`RedpandaEventBus::publisher`] for the write path: publish only
//! - [`RedpandaEventBus::consumer`] for a consumer runner: bound to that
//!   consumer's group, so the broker delivers every event to both consumers
//!   and tracks their progress independently
//!
//! # Delivery Semantics
//!
//! Producing is the pipeline's single post-commit publish attempt. There is
//! no outbox and no retry behind it, so the producer waits for full broker
//! acknowledgment: either the event is in the topic or the publisher gets
//! an error it can surface to operators.
//!
//! Consuming is at-least-once. Offsets are committed manually, only after
//! an event has been handed to the runner's stream; a crash before the
//! commit redelivers instead of losing. Both consumers tolerate redelivery
//! (the index upsert is idempotent, the push fan-out is loss-tolerant).
//! A new consumer group starts at the tip of the topic: the realtime
//! channel has no replay semantics, and the search index is repaired by an
//! out-of-band reindex, not by replaying history.
//!
//! # Example
//!
//! ```no_run
//! use comments_redpanda::RedpandaEventBus;
//! use comments_core::event_bus::EventBus;
//! use comments_core::event::{SerializedEvent, COMMENT_EVENTS_TOPIC};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bus = RedpandaEventBus::publisher("localhost:9092")?;
//! let event = SerializedEvent::new("CommentCreated.v1".to_string(), vec![1, 2, 3], None);
//! bus.publish(COMMENT_EVENTS_TOPIC, &event).await?;
//! # Ok(())
//! # }
//! ```

use comments_core::event::SerializedEvent;
use comments_core::event_bus::{EventBus, EventBusError, EventStream};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Message};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Producer acknowledgment mode: all in-sync replicas.
///
/// The publish after commit is the only delivery attempt this pipeline
/// makes, so it must either land or fail loudly.
const PRODUCER_ACKS: &str = "all";

/// How long one publish may wait for broker acknowledgment.
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// Events buffered between the broker consumer and a runner.
///
/// Comment traffic is low-volume; a small buffer bounds memory while still
/// absorbing bursts without stalling the broker stream.
const EVENT_BUFFER: usize = 256;

/// Kafka-compatible transport for comment integration events.
///
/// Construction fixes the role: a publisher bus cannot subscribe and a
/// consumer bus cannot publish, which keeps the write path and the two
/// consumer daemons from accidentally sharing a consumer group or an
/// unacknowledged producer.
pub struct RedpandaEventBus {
    /// Producer, present only on a publisher-role bus.
    producer: Option<FutureProducer>,
    /// Broker addresses, kept for creating subscribers.
    brokers: String,
    /// Consumer group, present only on a consumer-role bus.
    consumer_group: Option<String>,
}

impl RedpandaEventBus {
    /// Creates a publish-only bus for the write path.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::ConnectionFailed`] if the producer cannot
    /// be created from the given broker list.
    pub fn publisher(brokers: &str) -> Result<Self, EventBusError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("acks", PRODUCER_ACKS)
            .create()
            .map_err(|e| {
                EventBusError::ConnectionFailed(format!("failed to create producer: {e}"))
            })?;

        tracing::info!(brokers = %brokers, acks = PRODUCER_ACKS, "publisher transport ready");

        Ok(Self {
            producer: Some(producer),
            brokers: brokers.to_string(),
            consumer_group: None,
        })
    }

    /// Creates a consume-only bus bound to one consumer group.
    ///
    /// Each consumer of `comment-events` must use its own group
    /// (`comment-search-indexer`, `comment-realtime-notifier`) so delivery
    /// and failure stay independent between them. The broker connection is
    /// established on [`EventBus::subscribe`].
    #[must_use]
    pub fn consumer(brokers: &str, consumer_group: &str) -> Self {
        Self {
            producer: None,
            brokers: brokers.to_string(),
            consumer_group: Some(consumer_group.to_string()),
        }
    }
}

impl EventBus for RedpandaEventBus {
    fn publish(
        &self,
        topic: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
        let topic = topic.to_string();
        let event = event.clone();

        Box::pin(async move {
            let Some(producer) = self.producer.as_ref() else {
                return Err(EventBusError::PublishFailed {
                    topic,
                    reason: "bus was built for consuming; create it with RedpandaEventBus::publisher"
                        .to_string(),
                });
            };

            let payload =
                bincode::serialize(&event).map_err(|e| EventBusError::PublishFailed {
                    topic: topic.clone(),
                    reason: format!("failed to serialize event: {e}"),
                })?;

            // Unkeyed: a comment's lifecycle emits exactly one event, so
            // there is no intra-entity order to preserve and any partition
            // will do.
            let record = FutureRecord::<(), _>::to(&topic).payload(&payload);

            match producer.send(record, Timeout::After(PUBLISH_TIMEOUT)).await {
                Ok(_) => {
                    tracing::debug!(
                        topic = %topic,
                        event_type = %event.event_type,
                        "event published"
                    );
                    Ok(())
                }
                Err((kafka_error, _)) => Err(EventBusError::PublishFailed {
                    topic,
                    reason: kafka_error.to_string(),
                }),
            }
        })
    }

    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>> {
        let topics: Vec<String> = topics.iter().map(|s| (*s).to_string()).collect();
        let brokers = self.brokers.clone();
        let consumer_group = self.consumer_group.clone();

        Box::pin(async move {
            let Some(group) = consumer_group else {
                return Err(EventBusError::SubscriptionFailed {
                    topics,
                    reason: "bus was built for publishing; create it with RedpandaEventBus::consumer"
                        .to_string(),
                });
            };

            let consumer: StreamConsumer = ClientConfig::new()
                .set("bootstrap.servers", &brokers)
                .set("group.id", &group)
                // Offsets advance only after handoff to the runner.
                .set("enable.auto.commit", "false")
                // New groups start at the tip: no replay semantics here.
                .set("auto.offset.reset", "latest")
                .create()
                .map_err(|e| EventBusError::SubscriptionFailed {
                    topics: topics.clone(),
                    reason: format!("failed to create consumer: {e}"),
                })?;

            let topic_refs: Vec<&str> = topics.iter().map(String::as_str).collect();
            consumer
                .subscribe(&topic_refs)
                .map_err(|e| EventBusError::SubscriptionFailed {
                    topics: topics.clone(),
                    reason: format!("failed to subscribe to topics: {e}"),
                })?;

            tracing::info!(topics = ?topics, consumer_group = %group, "subscribed to topics");

            let (tx, rx) = tokio::sync::mpsc::channel(EVENT_BUFFER);
            tokio::spawn(pump_events(consumer, tx));

            let stream = async_stream::stream! {
                let mut rx = rx;
                while let Some(result) = rx.recv().await {
                    yield result;
                }
            };

            Ok(Box::pin(stream) as EventStream)
        })
    }
}

/// Forwards broker messages to a runner, committing each offset only after
/// the handoff succeeded.
async fn pump_events(
    consumer: StreamConsumer,
    tx: tokio::sync::mpsc::Sender<Result<SerializedEvent, EventBusError>>,
) {
    use futures::StreamExt;

    let mut stream = consumer.stream();

    while let Some(next) = stream.next().await {
        let message = match next {
            Ok(message) => message,
            Err(e) => {
                // Transient broker error: surface it and keep pumping; the
                // client reconnects on its own.
                if tx
                    .send(Err(EventBusError::TransportError(e.to_string())))
                    .await
                    .is_err()
                {
                    return;
                }
                continue;
            }
        };

        match decode_envelope(&message) {
            Some(result) => {
                if tx.send(result).await.is_err() {
                    // Runner gone. Leave the offset uncommitted so the next
                    // member of this group sees the event again.
                    tracing::debug!("runner dropped its stream; stopping consumer task");
                    return;
                }
            }
            None => {
                tracing::warn!(
                    topic = message.topic(),
                    offset = message.offset(),
                    "skipping event with empty payload"
                );
            }
        }

        // Commit after handoff (or deliberate skip): a crash before this
        // point redelivers rather than loses.
        if let Err(e) = consumer.commit_message(&message, CommitMode::Async) {
            tracing::warn!(
                topic = message.topic(),
                offset = message.offset(),
                error = %e,
                "offset commit failed; event may be redelivered"
            );
        }
    }

    tracing::debug!("broker stream ended");
}

/// Decodes a broker message into the event envelope.
///
/// Returns `None` for messages without a payload; those carry nothing a
/// consumer could act on and are skipped (and committed) by the pump.
fn decode_envelope(
    message: &BorrowedMessage<'_>,
) -> Option<Result<SerializedEvent, EventBusError>> {
    let payload = message.payload()?;
    Some(bincode::deserialize(payload).map_err(|e| {
        EventBusError::DeserializationFailed(format!(
            "undecodable event on {}: {e}",
            message.topic()
        ))
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use comments_core::event::COMMENT_EVENTS_TOPIC;

    #[test]
    fn redpanda_event_bus_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<RedpandaEventBus>();
        assert_sync::<RedpandaEventBus>();
    }

    #[tokio::test]
    async fn consuming_bus_refuses_to_publish() {
        let bus = RedpandaEventBus::consumer("localhost:9092", "comment-search-indexer");
        let event = SerializedEvent::new("CommentCreated.v1".to_string(), vec![1], None);

        let result = bus.publish(COMMENT_EVENTS_TOPIC, &event).await;

        assert!(matches!(result, Err(EventBusError::PublishFailed { .. })));
    }

    #[tokio::test]
    async fn publishing_bus_refuses_to_subscribe() {
        let bus = RedpandaEventBus::publisher("localhost:9092").unwrap();

        let result = bus.subscribe(&[COMMENT_EVENTS_TOPIC]).await;

        assert!(matches!(
            result,
            Err(EventBusError::SubscriptionFailed { .. })
        ));
    }
}
