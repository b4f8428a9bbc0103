//! # Comments Core
//!
//! Domain model and boundary traits for the threaded-comment service.
//!
//! This crate provides the fundamental abstractions shared by every other
//! workspace member:
//!
//! - **Comment aggregate**: a comment, its optional attachment, and the
//!   domain events it accumulates until a unit of work commits
//! - **Integration events**: the transport-safe, denormalized messages
//!   published to the broker after a commit, consumed independently by the
//!   search indexer and the realtime notifier
//! - **Boundary traits**: repository, cache, search index, push channel,
//!   event bus and supporting services, each abstracted behind a trait so
//!   implementations stay swappable and testable
//! - **Read-side projections**: the pure tree assembler and the paging
//!   types (including the exact cache-key rendering)
//!
//! ## Architecture Principles
//!
//! - One committed write fans out to three consumers (search, realtime,
//!   cached listing) with different freshness guarantees
//! - Durability of the fact and durability of its propagation are
//!   decoupled: the commit never waits on the broker
//! - Dependency injection via traits; no hidden I/O in the domain

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

pub mod cache;
pub mod clock;
pub mod comment;
pub mod consumer;
pub mod dto;
pub mod event;
pub mod event_bus;
pub mod paging;
pub mod push;
pub mod repository;
pub mod search;
pub mod services;
pub mod tree;

pub use comment::{Attachment, AttachmentId, AttachmentKind, Comment, CommentId, DomainEvent};
pub use dto::{AttachmentDto, CommentDto};
pub use event::{CommentCreated, Event, IntegrationEvent, SerializedEvent, COMMENT_EVENTS_TOPIC};
pub use paging::{PageRequest, PagedResult, SortDirection, SortField};
