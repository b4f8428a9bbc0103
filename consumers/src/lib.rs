//! # Comments Consumers
//!
//! The two independent consumers of `comment-events` and the runner that
//! drives them:
//!
//! - [`SearchIndexerConsumer`]: upserts one search document per comment
//! - [`RealtimeNotifierConsumer`]: broadcasts the event to connected viewers
//! - [`ConsumerRunner`]: subscribes a consumer under its own consumer
//!   group, dispatches events, isolates failures, and honors shutdown
//! - [`RetryPolicy`]: optional exponential backoff for failed handlers
//!
//! Each consumer is an isolated unit of work over the same event: the
//! indexer failing never prevents or delays the notifier, and vice versa.

pub mod config;
pub mod realtime_notifier;
pub mod retry;
pub mod runner;
pub mod search_indexer;

pub use config::ConsumerConfig;
pub use realtime_notifier::{RealtimeNotifierConsumer, COMMENT_CREATED_PUSH_EVENT, REALTIME_NOTIFIER_GROUP};
pub use retry::RetryPolicy;
pub use runner::ConsumerRunner;
pub use search_indexer::{SearchIndexerConsumer, SEARCH_INDEXER_GROUP};
