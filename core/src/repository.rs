//! Repository boundary for comment storage.
//!
//! The relational engine behind this trait is an external collaborator; the
//! core only relies on the contract below. Implementations live in the
//! `comments-postgres` crate (production) and `comments-testing` (in-memory).

use crate::comment::{Comment, CommentId};
use crate::paging::PageRequest;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Error type for repository operations.
#[derive(Error, Debug, Clone)]
pub enum RepositoryError {
    /// Storage backend failure (connection, constraint, transaction).
    #[error("storage error: {0}")]
    Storage(String),

    /// A stored row could not be mapped back into the domain model.
    #[error("failed to decode stored row: {0}")]
    Decode(String),
}

/// Storage boundary for the comment aggregate.
pub trait CommentRepository: Send + Sync {
    /// Persists a new comment (and its attachment, if any) in one
    /// transaction. Returning `Ok` means the write is durable; only then may
    /// integration events be published.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Storage`] when the commit fails; in that
    /// case nothing was persisted and no event must be published.
    fn insert(
        &self,
        comment: &Comment,
    ) -> Pin<Box<dyn Future<Output = Result<(), RepositoryError>> + Send + '_>>;

    /// Fetches a single comment without its replies.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] on backend or decode failures.
    fn get_by_id(
        &self,
        id: CommentId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Comment>, RepositoryError>> + Send + '_>>;

    /// Fetches a comment together with its full descendant set, flat.
    ///
    /// The returned vector contains the node itself plus every transitive
    /// reply, in no particular nesting; the tree assembler shapes it.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] on backend or decode failures.
    fn get_by_id_with_replies(
        &self,
        id: CommentId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Vec<Comment>>, RepositoryError>> + Send + '_>>;

    /// Fetches one page of top-level comments plus the total top-level
    /// count, ordered by the request's sort field and direction.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] on backend or decode failures.
    fn get_top_level_paged(
        &self,
        request: PageRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(Vec<Comment>, u64), RepositoryError>> + Send + '_>>;
}
