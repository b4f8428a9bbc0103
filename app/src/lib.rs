//! # Comments App
//!
//! Application services gluing the domain to its collaborators:
//!
//! - [`publisher::TransactionalPublisher`]: harvests domain events from
//!   committed aggregates and forwards integration events to the broker
//!   (commit first, publish best-effort after)
//! - [`create::CommentService`]: the synchronous write path: validate,
//!   commit, then hand off to the publisher
//! - [`queries::CommentQueries`]: the read path: read-through cached
//!   listing, nested-thread lookup, live search

pub mod create;
pub mod publisher;
pub mod queries;

pub use create::{AttachmentUpload, CommentService, CreateCommentError, CreateCommentRequest};
pub use publisher::TransactionalPublisher;
pub use queries::{CommentQueries, QueryError, LISTING_CACHE_TTL};
