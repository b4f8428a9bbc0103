//! The read path: cached listing, nested threads, live search.
//!
//! Three different freshness guarantees meet here:
//!
//! - the paginated listing is served through a read-through cache with a
//!   fixed TTL and no write-time invalidation, so it may lag a new comment
//!   by up to the TTL
//! - the by-id thread query always hits storage
//! - search always runs live against the index and is never cached; its
//!   freshness is bounded by consumer lag instead

use comments_core::cache::{CacheError, CacheService};
use comments_core::comment::CommentId;
use comments_core::dto::CommentDto;
use comments_core::paging::{PageRequest, PagedResult, LISTING_CACHE_PREFIX};
use comments_core::repository::{CommentRepository, RepositoryError};
use comments_core::search::{SearchError, SearchIndex};
use comments_core::tree::assemble_thread;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// How long a cached listing page stays valid.
pub const LISTING_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Failures of the read path.
#[derive(Error, Debug)]
pub enum QueryError {
    /// The storage backend failed.
    #[error(transparent)]
    Storage(#[from] RepositoryError),

    /// The search backend failed.
    #[error(transparent)]
    Search(#[from] SearchError),

    /// The cache backend failed during an explicit cache operation.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Read-side query service.
pub struct CommentQueries {
    repository: Arc<dyn CommentRepository>,
    cache: Arc<dyn CacheService>,
    search: Arc<dyn SearchIndex>,
    cache_ttl: Duration,
}

impl CommentQueries {
    /// Wires the read path with the default listing TTL.
    #[must_use]
    pub fn new(
        repository: Arc<dyn CommentRepository>,
        cache: Arc<dyn CacheService>,
        search: Arc<dyn SearchIndex>,
    ) -> Self {
        Self {
            repository,
            cache,
            search,
            cache_ttl: LISTING_CACHE_TTL,
        }
    }

    /// Overrides the listing TTL (tests use short windows).
    #[must_use]
    pub const fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// One page of top-level comments, read-through cached.
    ///
    /// On a miss the page is computed from storage and stored under the
    /// request's deterministic key. Two concurrent misses may both compute
    /// and both write; they produce the same value, so the race is wasted
    /// work, not a correctness problem. Cache backend failures degrade to a
    /// storage read rather than failing the request.
    ///
    /// Listing items carry empty `replies`; nested threads come from
    /// [`Self::get_with_replies`].
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Storage`] when the storage read fails.
    pub async fn list(
        &self,
        request: PageRequest,
    ) -> Result<PagedResult<CommentDto>, QueryError> {
        let key = request.cache_key();

        match self.cache.get(&key).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(page) => {
                    tracing::trace!(key = %key, "listing served from cache");
                    return Ok(page);
                }
                Err(error) => {
                    tracing::warn!(key = %key, error = %error, "ignoring undecodable cache entry");
                }
            },
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(key = %key, error = %error, "cache read failed; falling back to storage");
            }
        }

        let (comments, total_count) = self.repository.get_top_level_paged(request).await?;
        let items: Vec<CommentDto> = comments.iter().map(CommentDto::from_comment).collect();
        let page = PagedResult::new(items, total_count, request.page, request.page_size);

        match serde_json::to_vec(&page) {
            Ok(bytes) => {
                if let Err(error) = self.cache.set(&key, &bytes, self.cache_ttl).await {
                    tracing::warn!(key = %key, error = %error, "failed to populate listing cache");
                }
            }
            Err(error) => {
                tracing::warn!(key = %key, error = %error, "failed to encode listing page for cache");
            }
        }

        Ok(page)
    }

    /// Drops every cached listing page.
    ///
    /// Operator entry point for manual reconciliation: after an
    /// out-of-band backfill or reindex, flushing makes the next read of
    /// every page recompute from storage instead of waiting out the TTL.
    /// The write path never calls this; creating a comment leaves the
    /// cache untouched by design.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Cache`] when the cache backend fails.
    pub async fn flush_listing_cache(&self) -> Result<(), QueryError> {
        tracing::info!(prefix = LISTING_CACHE_PREFIX, "flushing cached listing pages");
        self.cache.remove_by_prefix(LISTING_CACHE_PREFIX).await?;
        Ok(())
    }

    /// A comment with its full reply tree, oldest replies first at every
    /// level. Always computed from storage.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Storage`] when the storage read fails.
    pub async fn get_with_replies(
        &self,
        id: CommentId,
    ) -> Result<Option<CommentDto>, QueryError> {
        let rows = self.repository.get_by_id_with_replies(id).await?;
        Ok(rows.and_then(|rows| assemble_thread(id, rows)))
    }

    /// Full-text search over comments, hydrating each hit into its thread.
    ///
    /// Executed live against the index on every call; search results are
    /// never cached. Hits whose comment has been deleted between indexing
    /// and hydration are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Search`] when the index query fails and
    /// [`QueryError::Storage`] when hydration fails.
    pub async fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Result<PagedResult<CommentDto>, QueryError> {
        let hits = self.search.search(query, page, page_size).await?;

        let mut items = Vec::with_capacity(hits.ids.len());
        for id in hits.ids {
            if let Some(rows) = self.repository.get_by_id_with_replies(id).await? {
                if let Some(dto) = assemble_thread(id, rows) {
                    items.push(dto);
                }
            }
        }

        Ok(PagedResult::new(items, hits.total_count, page, page_size))
    }
}
