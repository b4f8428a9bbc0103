//! In-memory broker double.

use comments_core::event::SerializedEvent;
use comments_core::event_bus::{EventBus, EventBusError, EventStream};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use tokio::sync::mpsc;

struct Subscriber {
    topics: Vec<String>,
    sender: mpsc::UnboundedSender<Result<SerializedEvent, EventBusError>>,
}

/// In-memory event bus with per-subscriber fan-out.
///
/// Every subscriber receives every event published to a matching topic after
/// it subscribed: the multi-consumer shape of the real broker, without the
/// broker. Published events are also recorded for direct assertions.
#[derive(Default)]
pub struct InMemoryEventBus {
    subscribers: Mutex<Vec<Subscriber>>,
    published: Mutex<Vec<(String, SerializedEvent)>>,
}

impl InMemoryEventBus {
    /// Create a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events published so far, with their topics.
    #[must_use]
    pub fn published(&self) -> Vec<(String, SerializedEvent)> {
        self.published.lock().unwrap().clone()
    }

    /// Number of events published so far.
    #[must_use]
    pub fn published_count(&self) -> usize {
        self.published.lock().unwrap().len()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }
}

impl EventBus for InMemoryEventBus {
    fn publish(
        &self,
        topic: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
        let topic = topic.to_string();
        let event = event.clone();
        Box::pin(async move {
            self.published
                .lock()
                .unwrap()
                .push((topic.clone(), event.clone()));

            // Fan out to matching subscribers, dropping the disconnected.
            self.subscribers.lock().unwrap().retain(|subscriber| {
                if subscriber.topics.iter().any(|t| *t == topic) {
                    subscriber.sender.send(Ok(event.clone())).is_ok()
                } else {
                    !subscriber.sender.is_closed()
                }
            });

            Ok(())
        })
    }

    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>> {
        let topics: Vec<String> = topics.iter().map(|t| (*t).to_string()).collect();
        Box::pin(async move {
            let (sender, receiver) = mpsc::unbounded_channel();
            self.subscribers
                .lock()
                .unwrap()
                .push(Subscriber { topics, sender });

            let stream = async_stream::stream! {
                let mut receiver = receiver;
                while let Some(item) = receiver.recv().await {
                    yield item;
                }
            };

            Ok(Box::pin(stream) as EventStream)
        })
    }
}

/// Event bus whose publish always fails, for testing the
/// publish-after-commit failure path.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingEventBus;

impl FailingEventBus {
    /// Create the failing bus.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl EventBus for FailingEventBus {
    fn publish(
        &self,
        topic: &str,
        _event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
        let topic = topic.to_string();
        Box::pin(async move {
            Err(EventBusError::PublishFailed {
                topic,
                reason: "injected broker failure".to_string(),
            })
        })
    }

    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>> {
        let topics: Vec<String> = topics.iter().map(|t| (*t).to_string()).collect();
        Box::pin(async move {
            Err(EventBusError::SubscriptionFailed {
                topics,
                reason: "injected broker failure".to_string(),
            })
        })
    }
}
