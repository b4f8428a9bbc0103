//! Cache boundary for the paginated listing.
//!
//! The cache is a shared, external key-value store holding full serialized
//! pages under deterministic keys (see [`crate::paging::PageRequest::cache_key`]).
//! Population is read-triggered only and freshness is bounded by the TTL:
//! the write path never invalidates, so readers of the plain listing may see
//! up to TTL-old data. The one invalidation capability,
//! [`CacheService::remove_by_prefix`], backs the operator-triggered flush
//! used for manual reconciliation (e.g. after an out-of-band backfill) and
//! is never called when a comment is created.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Error type for cache operations.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// Could not reach the cache backend.
    #[error("cache connection failed: {0}")]
    Connection(String),

    /// A cache command failed.
    #[error("cache operation failed: {0}")]
    Operation(String),
}

/// Byte-valued key-value cache with per-entry absolute expiry.
///
/// Values are opaque bytes; the read side serializes whole pages to JSON
/// before storing them, so two hits within the TTL window return
/// byte-identical results.
pub trait CacheService: Send + Sync {
    /// Returns the cached value if present and unexpired.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the backend cannot be reached.
    fn get(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>, CacheError>> + Send + '_>>;

    /// Stores a value under `key` with an absolute expiry of `ttl` from now.
    ///
    /// Concurrent writers racing on the same key are acceptable: they all
    /// compute the same value from the same storage state, so last write
    /// wins without a correctness problem.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the backend cannot be reached.
    fn set(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<(), CacheError>> + Send + '_>>;

    /// Removes every key starting with `prefix`.
    ///
    /// Backs the operator flush of cached listing pages (manual
    /// reconciliation); the write path deliberately never calls it, so
    /// listing freshness stays bounded by the TTL, not by invalidation.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] when the backend cannot be reached.
    fn remove_by_prefix(
        &self,
        prefix: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), CacheError>> + Send + '_>>;
}
