//! Push-channel boundary for realtime notifications.
//!
//! Connected viewers receive a lightweight payload the moment a comment is
//! created, independent of cache state. Fan-out is at-most-once per
//! connected client and best-effort: no acknowledgments, no replay buffer,
//! no backlog for late joiners.

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Error type for push operations.
#[derive(Error, Debug, Clone)]
pub enum PushError {
    /// The push transport failed.
    #[error("push channel error: {0}")]
    Channel(String),
}

/// All-clients broadcast capability.
///
/// Backed by a concurrent registry of active connections; see the
/// `comments-realtime` crate for the production implementation.
pub trait PushChannel: Send + Sync {
    /// Broadcasts `payload` under `event_name` to every currently connected
    /// viewer. Clients that disconnect mid-broadcast or lag behind simply
    /// miss the message.
    ///
    /// # Errors
    ///
    /// Returns [`PushError`] when the transport itself fails; per-client
    /// delivery problems are not errors.
    fn broadcast_all(
        &self,
        event_name: &str,
        payload: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<(), PushError>> + Send + '_>>;
}
