//! # Comments Testing
//!
//! In-memory doubles for every boundary trait in `comments-core`, providing
//! fast, deterministic test infrastructure:
//!
//! - [`FixedClock`]: deterministic time
//! - [`InMemoryCommentRepository`]: `HashMap`-backed storage
//! - [`InMemoryCacheService`]: byte cache with real expiry
//! - [`InMemorySearchIndex`]: upsert map with substring search and a
//!   failure toggle for fault injection
//! - [`RecordingPushChannel`] / [`FailingPushChannel`]: broadcast capture
//! - [`InMemoryEventBus`] / [`FailingEventBus`]: broker double with
//!   per-subscriber fan-out
//! - CAPTCHA / file storage / sanitizer fakes for the write path

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Test utilities document panics where critical

pub mod cache;
pub mod clock;
pub mod event_bus;
pub mod push;
pub mod repository;
pub mod search;
pub mod services;

pub use cache::InMemoryCacheService;
pub use clock::FixedClock;
pub use event_bus::{FailingEventBus, InMemoryEventBus};
pub use push::{FailingPushChannel, RecordingPushChannel};
pub use repository::InMemoryCommentRepository;
pub use search::InMemorySearchIndex;
pub use services::{
    AcceptAllCaptcha, InMemoryFileStorage, PassthroughSanitizer, RejectAllCaptcha,
};
