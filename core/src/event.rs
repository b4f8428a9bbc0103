//! Integration events and their wire format.
//!
//! After a unit of work commits, every harvested domain event is translated
//! into exactly one [`IntegrationEvent`]: a flattened, transport-safe copy of
//! the facts consumers need, decoupled from the aggregate's internal shape so
//! that consumers never depend on the storage schema.
//!
//! Events are serialized with `bincode` inside a [`SerializedEvent`]
//! envelope. The envelope carries a versioned event-type string (e.g.
//! `"CommentCreated.v1"`) so consumers can route and evolve schemas without
//! inspecting payload bytes.

use crate::comment::CommentId;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Broker topic carrying all comment integration events.
pub const COMMENT_EVENTS_TOPIC: &str = "comment-events";

/// Error types for event serialization.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize an event to bytes.
    #[error("failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize an event from bytes.
    #[error("failed to deserialize event: {0}")]
    DeserializationError(String),
}

/// An event that can be published to the broker.
///
/// The `event_type()` string is stable and versioned (`"CommentCreated.v1"`)
/// so a schema change becomes a new version rather than a silent break.
pub trait Event: Send + Sync + 'static {
    /// Returns the versioned event type identifier.
    fn event_type(&self) -> &'static str;

    /// Serialize this event to bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if the event cannot be
    /// serialized.
    fn to_bytes(&self) -> Result<Vec<u8>, EventError>
    where
        Self: Serialize,
    {
        bincode::serialize(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Deserialize an event from bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DeserializationError`] if the bytes do not
    /// decode into this event type.
    fn from_bytes(bytes: &[u8]) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        bincode::deserialize(bytes).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

/// Denormalized payload of a created comment.
///
/// Carries everything the search indexer and the realtime notifier need,
/// copied out of the now-durable aggregate at publish time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentCreated {
    /// Identity of the created comment.
    pub comment_id: CommentId,
    /// Author name.
    pub user_name: String,
    /// Author email.
    pub email: String,
    /// Comment body text.
    pub text: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// All integration event variants, one handler per variant.
///
/// New event types are new variants plus new handlers: the set is
/// compile-time enumerable, so a consumer that forgets a variant fails to
/// build instead of silently dropping events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum IntegrationEvent {
    /// A comment was created and committed.
    CommentCreated(CommentCreated),
}

impl Event for IntegrationEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::CommentCreated(_) => "CommentCreated.v1",
        }
    }
}

impl IntegrationEvent {
    /// Decodes an integration event from its broker envelope.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DeserializationError`] if the payload does not
    /// decode into a known variant.
    pub fn from_serialized(serialized: &SerializedEvent) -> Result<Self, EventError> {
        Self::from_bytes(&serialized.data)
    }
}

/// A serialized event ready for the broker.
///
/// This is the wire format between the publisher and the consumers: the
/// versioned type name, the bincode payload, and optional JSON metadata.
/// The envelope itself is serializable so broker implementations can put it
/// on the wire without knowing the payload type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SerializedEvent {
    /// The event type identifier (e.g. `"CommentCreated.v1"`).
    pub event_type: String,

    /// The bincode-serialized event data.
    pub data: Vec<u8>,

    /// Optional metadata (correlation ids, originating request, ...).
    pub metadata: Option<serde_json::Value>,
}

impl SerializedEvent {
    /// Create a new serialized event.
    #[must_use]
    pub const fn new(
        event_type: String,
        data: Vec<u8>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            event_type,
            data,
            metadata,
        }
    }

    /// Create a serialized event from an [`Event`] value.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if the event cannot be
    /// serialized.
    pub fn from_event<E: Event + Serialize>(
        event: &E,
        metadata: Option<serde_json::Value>,
    ) -> Result<Self, EventError> {
        Ok(Self {
            event_type: event.event_type().to_string(),
            data: event.to_bytes()?,
            metadata,
        })
    }
}

impl fmt::Display for SerializedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SerializedEvent {{ type: {}, size: {} bytes }}",
            self.event_type,
            self.data.len()
        )
    }
}
