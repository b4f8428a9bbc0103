//! Search-index boundary.
//!
//! One denormalized document per comment, keyed by comment id,
//! last-write-wins. Upserts are idempotent so broker redelivery leaves
//! exactly one document per id. Search queries always run live against the
//! index; results are never cached.

use crate::comment::CommentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Error type for search operations.
#[derive(Error, Debug, Clone)]
pub enum SearchError {
    /// Could not reach the search backend.
    #[error("search backend unavailable: {0}")]
    Connection(String),

    /// An index (write) operation failed.
    #[error("index operation failed: {0}")]
    Index(String),

    /// A search (read) operation failed.
    #[error("search query failed: {0}")]
    Query(String),
}

/// Denormalized search document for one comment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDocument {
    /// Comment identity; the document key.
    pub id: CommentId,
    /// Author name.
    pub user_name: String,
    /// Author email.
    pub email: String,
    /// Comment body text.
    pub text: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// One page of search hits: matching comment ids plus the total match count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchHits {
    /// Matching comment ids, page-local, best-match first.
    pub ids: Vec<CommentId>,
    /// Total number of matches across all pages.
    pub total_count: u64,
}

/// Full-text index boundary.
pub trait SearchIndex: Send + Sync {
    /// Upserts the document for a comment, keyed by its id.
    ///
    /// Idempotent: indexing the same document twice leaves one document.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] when the backend rejects the write; callers
    /// on the consumer path log and swallow it.
    fn index(
        &self,
        document: &CommentDocument,
    ) -> Pin<Box<dyn Future<Output = Result<(), SearchError>> + Send + '_>>;

    /// Runs a live full-text query over author name, email and text.
    ///
    /// `page` is 1-based.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] when the query cannot be executed.
    fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Pin<Box<dyn Future<Output = Result<SearchHits, SearchError>> + Send + '_>>;
}
