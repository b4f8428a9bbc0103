//! Redis implementation of the cache-service boundary.
//!
//! Listing pages are stored as opaque bytes under their deterministic keys
//! with a per-entry TTL (`SET ... EX`). Expiry is the only freshness
//! mechanism on the write path: creating a comment never invalidates.
//! `remove_by_prefix` (SCAN + batched DEL) backs the operator flush of
//! cached listing pages for manual reconciliation.

use comments_core::cache::{CacheError, CacheService};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Redis-backed cache service.
///
/// Holds a [`ConnectionManager`], which multiplexes and reconnects on its
/// own; clones share the underlying connection.
#[derive(Clone)]
pub struct RedisCacheService {
    connection: ConnectionManager,
}

impl RedisCacheService {
    /// Connects to Redis and prepares the managed connection.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Connection`] when the URL is invalid or the
    /// server cannot be reached.
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client =
            redis::Client::open(redis_url).map_err(|e| CacheError::Connection(e.to_string()))?;
        let connection = client
            .get_connection_manager()
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        Ok(Self { connection })
    }

    /// Wraps an existing managed connection.
    #[must_use]
    pub const fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

impl CacheService for RedisCacheService {
    fn get(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>, CacheError>> + Send + '_>> {
        let key = key.to_string();
        let mut connection = self.connection.clone();
        Box::pin(async move {
            let value: Option<Vec<u8>> = connection
                .get(&key)
                .await
                .map_err(|e| CacheError::Operation(e.to_string()))?;
            Ok(value)
        })
    }

    fn set(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<(), CacheError>> + Send + '_>> {
        let key = key.to_string();
        let value = value.to_vec();
        let mut connection = self.connection.clone();
        Box::pin(async move {
            // SET with EX gives the entry its absolute expiry; concurrent
            // writers racing on the same key are last-write-wins.
            connection
                .set_ex::<_, _, ()>(&key, value, ttl.as_secs().max(1))
                .await
                .map_err(|e| CacheError::Operation(e.to_string()))?;
            Ok(())
        })
    }

    fn remove_by_prefix(
        &self,
        prefix: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), CacheError>> + Send + '_>> {
        let pattern = format!("{prefix}*");
        let mut scan_connection = self.connection.clone();
        let mut del_connection = self.connection.clone();
        Box::pin(async move {
            let mut keys: Vec<String> = Vec::new();
            {
                let mut iter = scan_connection
                    .scan_match::<_, String>(&pattern)
                    .await
                    .map_err(|e| CacheError::Operation(e.to_string()))?;
                while let Some(key) = iter.next_item().await {
                    keys.push(key);
                }
            }

            if !keys.is_empty() {
                tracing::debug!(pattern = %pattern, count = keys.len(), "removing cached entries");
                del_connection
                    .del::<_, ()>(keys)
                    .await
                    .map_err(|e| CacheError::Operation(e.to_string()))?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redis_cache_service_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<RedisCacheService>();
        assert_sync::<RedisCacheService>();
    }
}
