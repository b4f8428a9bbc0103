//! In-memory cache service with real expiry.

use comments_core::cache::{CacheError, CacheService};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::RwLock;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

/// `HashMap`-backed cache with absolute per-entry expiry.
#[derive(Debug, Default)]
pub struct InMemoryCacheService {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryCacheService {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts raw bytes without expiry, bypassing the trait (for seeding
    /// corrupt or hand-crafted entries).
    pub fn put_raw(&self, key: &str, value: Vec<u8>) {
        self.entries.write().unwrap().insert(
            key.to_string(),
            Entry {
                value,
                expires_at: None,
            },
        );
    }

    /// Number of entries, including expired ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }

    /// Whether a key is present (ignores expiry).
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.read().unwrap().contains_key(key)
    }
}

impl CacheService for InMemoryCacheService {
    fn get(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Vec<u8>>, CacheError>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let mut entries = self.entries.write().unwrap();
            match entries.get(&key) {
                Some(entry) => {
                    if entry.expires_at.is_some_and(|at| Instant::now() >= at) {
                        entries.remove(&key);
                        Ok(None)
                    } else {
                        Ok(Some(entry.value.clone()))
                    }
                }
                None => Ok(None),
            }
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
        Box::pin(async move {
            self.entries.write().unwrap().insert(
                key,
                Entry {
                    value,
                    expires_at: Some(Instant::now() + ttl),
                },
            );
            Ok(())
        })
    }

    fn remove_by_prefix(
        &self,
        prefix: &str,
    ) -> Pin<Box<dyn Future<Output = Result<(), CacheError>> + Send + '_>> {
        let prefix = prefix.to_string();
        Box::pin(async move {
            self.entries
                .write()
                .unwrap()
                .retain(|key, _| !key.starts_with(&prefix));
            Ok(())
        })
    }
}
