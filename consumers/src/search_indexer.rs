//! Search indexer consumer: one denormalized document per comment.

use comments_core::consumer::{ConsumerError, EventConsumer};
use comments_core::event::IntegrationEvent;
use comments_core::search::{CommentDocument, SearchIndex};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Consumer group under which the indexer subscribes to `comment-events`.
pub const SEARCH_INDEXER_GROUP: &str = "comment-search-indexer";

/// Upserts a search document for every created comment.
///
/// The upsert is keyed by comment id and idempotent, so broker redelivery
/// leaves exactly one document. A failed upsert is logged and swallowed by
/// the runner: the comment stays searchable-absent until a future event for
/// the same id or an out-of-band reindex.
pub struct SearchIndexerConsumer {
    index: Arc<dyn SearchIndex>,
}

impl SearchIndexerConsumer {
    /// Create the indexer over a search index.
    #[must_use]
    pub fn new(index: Arc<dyn SearchIndex>) -> Self {
        Self { index }
    }
}

impl EventConsumer for SearchIndexerConsumer {
    fn name(&self) -> &str {
        SEARCH_INDEXER_GROUP
    }

    fn consume(
        &self,
        event: &IntegrationEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), ConsumerError>> + Send + '_>> {
        let document = match event {
            IntegrationEvent::CommentCreated(created) => CommentDocument {
                id: created.comment_id,
                user_name: created.user_name.clone(),
                email: created.email.clone(),
                text: created.text.clone(),
                created_at: created.created_at,
            },
        };

        Box::pin(async move {
            self.index.index(&document).await?;
            tracing::info!(comment_id = %document.id, "comment indexed");
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use comments_core::comment::CommentId;
    use comments_core::event::CommentCreated;
    use comments_testing::InMemorySearchIndex;

    fn created_event() -> IntegrationEvent {
        IntegrationEvent::CommentCreated(CommentCreated {
            comment_id: CommentId::generate(),
            user_name: "alice".to_string(),
            email: "alice@example.com".to_string(),
            text: "hello".to_string(),
            created_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn indexes_the_created_comment() {
        let index = Arc::new(InMemorySearchIndex::new());
        let consumer = SearchIndexerConsumer::new(index.clone());
        let event = created_event();
        let IntegrationEvent::CommentCreated(ref created) = event;
        let id = created.comment_id;

        consumer.consume(&event).await.unwrap();

        assert!(index.contains(id));
    }

    #[tokio::test]
    async fn redelivery_leaves_exactly_one_document() {
        let index = Arc::new(InMemorySearchIndex::new());
        let consumer = SearchIndexerConsumer::new(index.clone());
        let event = created_event();

        consumer.consume(&event).await.unwrap();
        consumer.consume(&event).await.unwrap();

        assert_eq!(index.document_count(), 1);
    }

    #[tokio::test]
    async fn index_failure_surfaces_to_the_runner() {
        let index = Arc::new(InMemorySearchIndex::new());
        index.set_failing(true);
        let consumer = SearchIndexerConsumer::new(index.clone());

        let result = consumer.consume(&created_event()).await;

        assert!(matches!(result, Err(ConsumerError::Search(_))));
        assert_eq!(index.document_count(), 0);
    }
}
