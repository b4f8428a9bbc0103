//! Meilisearch implementation of the search-index boundary.
//!
//! One index (`comments`) keyed by comment id. Documents are written with
//! add-or-replace semantics, so redelivered events upsert instead of
//! duplicating: last write per id wins, no document history.
//!
//! Index existence is checked once per process lifetime and then cached as
//! "known to exist". A stale positive is acceptable; deleting the index is
//! an out-of-band administrative action, not a runtime concern.
//!
//! Search queries always run live; nothing on this path is cached.

use comments_core::search::{CommentDocument, SearchError, SearchHits, SearchIndex};
use meilisearch_sdk::client::Client;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};

/// Name of the comment index.
pub const COMMENT_INDEX: &str = "comments";

/// Primary key of comment documents.
const PRIMARY_KEY: &str = "id";

/// Meilisearch-backed comment index.
pub struct MeiliCommentIndex {
    client: Client,
    index_ready: AtomicBool,
}

impl MeiliCommentIndex {
    /// Connects a client to a Meilisearch instance.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Connection`] when the URL or key is rejected
    /// by the client.
    pub fn new(url: &str, api_key: Option<&str>) -> Result<Self, SearchError> {
        let client =
            Client::new(url, api_key).map_err(|e| SearchError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            index_ready: AtomicBool::new(false),
        })
    }

    /// Ensures the index exists, remembering a positive answer for the rest
    /// of the process lifetime.
    async fn ensure_index(&self) -> Result<(), SearchError> {
        if self.index_ready.load(Ordering::Acquire) {
            return Ok(());
        }

        if self.client.get_index(COMMENT_INDEX).await.is_err() {
            self.client
                .create_index(COMMENT_INDEX, Some(PRIMARY_KEY))
                .await
                .map_err(|e| SearchError::Index(e.to_string()))?;
            // Creation is queued by the engine; losing a race against a
            // concurrent creator resolves to the same index.
            tracing::info!(index = COMMENT_INDEX, "created search index");
        }

        self.index_ready.store(true, Ordering::Release);
        Ok(())
    }
}

impl SearchIndex for MeiliCommentIndex {
    fn index(
        &self,
        document: &CommentDocument,
    ) -> Pin<Box<dyn Future<Output = Result<(), SearchError>> + Send + '_>> {
        let document = document.clone();
        Box::pin(async move {
            self.ensure_index().await?;

            self.client
                .index(COMMENT_INDEX)
                .add_or_replace(&[document], Some(PRIMARY_KEY))
                .await
                .map_err(|e| SearchError::Index(e.to_string()))?;

            Ok(())
        })
    }

    fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Pin<Box<dyn Future<Output = Result<SearchHits, SearchError>> + Send + '_>> {
        let query = query.to_string();
        Box::pin(async move {
            self.ensure_index().await?;

            let offset = (page.saturating_sub(1) as usize) * page_size as usize;
            let results = self
                .client
                .index(COMMENT_INDEX)
                .search()
                .with_query(&query)
                .with_offset(offset)
                .with_limit(page_size as usize)
                .execute::<CommentDocument>()
                .await
                .map_err(|e| SearchError::Query(e.to_string()))?;

            let total_count = results
                .estimated_total_hits
                .unwrap_or(results.hits.len()) as u64;
            let ids = results
                .hits
                .into_iter()
                .map(|hit| hit.result.id)
                .collect();

            Ok(SearchHits { ids, total_count })
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use comments_core::comment::CommentId;

    #[test]
    fn meili_comment_index_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<MeiliCommentIndex>();
        assert_sync::<MeiliCommentIndex>();
    }

    #[test]
    fn document_fields_serialize_camel_case() {
        let document = CommentDocument {
            id: CommentId::generate(),
            user_name: "alice".to_string(),
            email: "alice@example.com".to_string(),
            text: "hello".to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&document).unwrap();
        assert!(json.get("userName").is_some());
        assert!(json.get("createdAt").is_some());
        assert!(json.get("id").is_some());
    }
}
