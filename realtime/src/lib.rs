//! Connection registry backing the all-clients broadcast capability.
//!
//! The websocket (or other persistent-transport) layer registers each
//! connection here and forwards whatever arrives on its receiver; the
//! realtime notifier consumer only sees the [`PushChannel`] trait. The
//! registry is the single shared structure, guarded by a concurrent map
//! rather than source-level shared mutable state.
//!
//! Fan-out semantics match the push contract: at-most-once per connected
//! client, best-effort. A client connected before the push and disconnected
//! after sees nothing; a newly connecting client gets no backlog; a client
//! whose buffer is full simply misses that message.

use comments_core::push::{PushChannel, PushError};
use dashmap::DashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

/// Default per-connection message buffer.
pub const DEFAULT_CONNECTION_BUFFER: usize = 64;

/// Unique identifier of one live connection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message pushed to a connected viewer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushMessage {
    /// Event name clients dispatch on (e.g. `"CommentCreated"`).
    pub event: String,
    /// Denormalized event payload.
    pub payload: serde_json::Value,
}

/// Concurrent registry of active viewer connections.
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, mpsc::Sender<PushMessage>>,
    buffer: usize,
}

impl ConnectionRegistry {
    /// Create a registry with the default per-connection buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_CONNECTION_BUFFER)
    }

    /// Create a registry with a custom per-connection buffer.
    #[must_use]
    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            connections: DashMap::new(),
            buffer,
        }
    }

    /// Registers a new connection and returns its id plus the receiving end
    /// the transport should drain into the socket.
    #[must_use]
    pub fn register(&self) -> (ConnectionId, mpsc::Receiver<PushMessage>) {
        let id = ConnectionId::generate();
        let (sender, receiver) = mpsc::channel(self.buffer);
        self.connections.insert(id, sender);
        tracing::debug!(connection_id = %id, "viewer connected");
        (id, receiver)
    }

    /// Removes a connection (on socket close).
    pub fn unregister(&self, id: ConnectionId) {
        if self.connections.remove(&id).is_some() {
            tracing::debug!(connection_id = %id, "viewer disconnected");
        }
    }

    /// Number of currently registered connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PushChannel for ConnectionRegistry {
    fn broadcast_all(
        &self,
        event_name: &str,
        payload: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<(), PushError>> + Send + '_>> {
        let event_name = event_name.to_string();
        Box::pin(async move {
            let mut stale = Vec::new();
            let mut delivered = 0usize;

            for entry in self.connections.iter() {
                let message = PushMessage {
                    event: event_name.clone(),
                    payload: payload.clone(),
                };
                match entry.value().try_send(message) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        // Lagging client: this push is lost for it.
                        tracing::debug!(connection_id = %entry.key(), "viewer lagging, push dropped");
                    }
                    Err(TrySendError::Closed(_)) => stale.push(*entry.key()),
                }
            }

            for id in stale {
                self.connections.remove(&id);
                tracing::debug!(connection_id = %id, "pruned closed connection");
            }

            tracing::debug!(event = %event_name, delivered, "broadcast complete");
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_every_connected_viewer() {
        let registry = ConnectionRegistry::new();
        let (_id_a, mut rx_a) = registry.register();
        let (_id_b, mut rx_b) = registry.register();

        registry
            .broadcast_all("CommentCreated", serde_json::json!({ "text": "hi" }))
            .await
            .unwrap();

        let message_a = rx_a.recv().await.unwrap();
        let message_b = rx_b.recv().await.unwrap();
        assert_eq!(message_a.event, "CommentCreated");
        assert_eq!(message_a, message_b);
    }

    #[tokio::test]
    async fn unregistered_connections_receive_nothing() {
        let registry = ConnectionRegistry::new();
        let (id, mut receiver) = registry.register();
        registry.unregister(id);

        registry
            .broadcast_all("CommentCreated", serde_json::json!({}))
            .await
            .unwrap();

        assert!(receiver.try_recv().is_err());
        assert_eq!(registry.connection_count(), 0);
    }

    #[tokio::test]
    async fn dropped_receivers_are_pruned_on_broadcast() {
        let registry = ConnectionRegistry::new();
        let (_id, receiver) = registry.register();
        drop(receiver);

        registry
            .broadcast_all("CommentCreated", serde_json::json!({}))
            .await
            .unwrap();

        assert_eq!(registry.connection_count(), 0);
    }

    #[tokio::test]
    async fn lagging_viewer_misses_messages_without_blocking() {
        let registry = ConnectionRegistry::with_buffer(1);
        let (_id, mut receiver) = registry.register();

        registry
            .broadcast_all("CommentCreated", serde_json::json!({ "n": 1 }))
            .await
            .unwrap();
        // Buffer full: this one is dropped for the lagging viewer.
        registry
            .broadcast_all("CommentCreated", serde_json::json!({ "n": 2 }))
            .await
            .unwrap();

        let first = receiver.recv().await.unwrap();
        assert_eq!(first.payload, serde_json::json!({ "n": 1 }));
        assert!(receiver.try_recv().is_err());
        // Still registered: a full buffer is not a disconnect.
        assert_eq!(registry.connection_count(), 1);
    }

    #[tokio::test]
    async fn late_joiners_get_no_backlog() {
        let registry = ConnectionRegistry::new();

        registry
            .broadcast_all("CommentCreated", serde_json::json!({ "n": 1 }))
            .await
            .unwrap();

        let (_id, mut receiver) = registry.register();
        assert!(receiver.try_recv().is_err());
    }
}
