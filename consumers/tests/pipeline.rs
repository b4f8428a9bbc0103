//! End-to-end pipeline scenarios over in-memory collaborators.
//!
//! One committed write, three consumers: these tests wire the real write
//! path, publisher, consumer runners and read path together over the
//! in-memory doubles and exercise the failure-isolation and freshness
//! contracts end to end.

#![allow(clippy::unwrap_used)]

use comments_app::{
    CommentQueries, CommentService, CreateCommentRequest, TransactionalPublisher,
};
use comments_consumers::{
    ConsumerRunner, RealtimeNotifierConsumer, SearchIndexerConsumer, COMMENT_CREATED_PUSH_EVENT,
};
use comments_core::comment::CommentId;
use comments_core::event::COMMENT_EVENTS_TOPIC;
use comments_core::event_bus::EventBus;
use comments_core::paging::PageRequest;
use comments_core::search::{CommentDocument, SearchIndex};
use comments_testing::{
    AcceptAllCaptcha, FixedClock, InMemoryCacheService, InMemoryCommentRepository,
    InMemoryEventBus, InMemoryFileStorage, InMemorySearchIndex, PassthroughSanitizer,
    RecordingPushChannel,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

struct Pipeline {
    repository: Arc<InMemoryCommentRepository>,
    bus: Arc<InMemoryEventBus>,
    index: Arc<InMemorySearchIndex>,
    push: Arc<RecordingPushChannel>,
    cache: Arc<InMemoryCacheService>,
    service: CommentService,
    queries: CommentQueries,
    shutdowns: Vec<watch::Sender<bool>>,
    handles: Vec<JoinHandle<()>>,
}

impl Pipeline {
    async fn start() -> Self {
        let repository = Arc::new(InMemoryCommentRepository::new());
        let bus = Arc::new(InMemoryEventBus::new());
        let index = Arc::new(InMemorySearchIndex::new());
        let push = Arc::new(RecordingPushChannel::new());
        let cache = Arc::new(InMemoryCacheService::new());

        let service = CommentService::new(
            repository.clone(),
            TransactionalPublisher::new(bus.clone()),
            Arc::new(AcceptAllCaptcha),
            Arc::new(InMemoryFileStorage::new()),
            Arc::new(PassthroughSanitizer),
            Arc::new(FixedClock::test_clock()),
        );
        let queries = CommentQueries::new(repository.clone(), cache.clone(), index.clone());

        let (mut indexer_runner, indexer_shutdown) = ConsumerRunner::new(
            Arc::new(SearchIndexerConsumer::new(index.clone())),
            bus.clone(),
            COMMENT_EVENTS_TOPIC,
        );
        let (mut notifier_runner, notifier_shutdown) = ConsumerRunner::new(
            Arc::new(RealtimeNotifierConsumer::new(push.clone())),
            bus.clone(),
            COMMENT_EVENTS_TOPIC,
        );

        let indexer_handle = tokio::spawn(async move {
            indexer_runner.start().await.unwrap();
        });
        let notifier_handle = tokio::spawn(async move {
            notifier_runner.start().await.unwrap();
        });

        // Give both runners time to subscribe before the first publish.
        tokio::time::sleep(Duration::from_millis(50)).await;

        Self {
            repository,
            bus,
            index,
            push,
            cache,
            service,
            queries,
            shutdowns: vec![indexer_shutdown, notifier_shutdown],
            handles: vec![indexer_handle, notifier_handle],
        }
    }

    async fn stop(self) {
        for shutdown in &self.shutdowns {
            shutdown.send(true).ok();
        }
        for handle in self.handles {
            handle.await.unwrap();
        }
    }

    fn request(text: &str) -> CreateCommentRequest {
        CreateCommentRequest {
            user_name: "alice".to_string(),
            email: "alice@example.com".to_string(),
            home_page: None,
            text: text.to_string(),
            parent_comment_id: None,
            captcha_key: "key".to_string(),
            captcha_answer: "answer".to_string(),
            attachment: None,
        }
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test]
async fn one_write_reaches_both_consumers() {
    let pipeline = Pipeline::start().await;

    let dto = pipeline
        .service
        .create(Pipeline::request("hello world"))
        .await
        .unwrap();
    settle().await;

    // Searchable.
    assert!(pipeline.index.contains(dto.id));
    // Pushed to connected viewers.
    let broadcasts = pipeline.push.broadcasts();
    assert_eq!(broadcasts.len(), 1);
    assert_eq!(broadcasts[0].0, COMMENT_CREATED_PUSH_EVENT);
    // Durable.
    assert!(pipeline.repository.get(dto.id).is_some());

    pipeline.stop().await;
}

#[tokio::test]
async fn indexer_failure_never_blocks_the_notifier() {
    let pipeline = Pipeline::start().await;
    pipeline.index.set_failing(true);

    let dto = pipeline
        .service
        .create(Pipeline::request("search will miss this"))
        .await
        .unwrap();
    settle().await;

    // The indexer failed: logged, swallowed, nothing indexed.
    assert_eq!(pipeline.index.document_count(), 0);
    // The realtime push was still delivered.
    assert_eq!(pipeline.push.broadcast_count(), 1);
    // The comment is durably stored.
    let stored = pipeline.repository.get(dto.id).unwrap();

    // A later manual reindex makes it searchable.
    pipeline.index.set_failing(false);
    pipeline
        .index
        .index(&CommentDocument {
            id: stored.id(),
            user_name: stored.user_name().to_string(),
            email: stored.email().to_string(),
            text: stored.text().to_string(),
            created_at: stored.created_at(),
        })
        .await
        .unwrap();
    assert!(pipeline.index.contains(dto.id));

    pipeline.stop().await;
}

#[tokio::test]
async fn redelivered_event_indexes_exactly_one_document() {
    let pipeline = Pipeline::start().await;

    pipeline
        .service
        .create(Pipeline::request("delivered twice"))
        .await
        .unwrap();
    settle().await;

    // Simulate broker redelivery of the identical event.
    let (topic, event) = pipeline.bus.published()[0].clone();
    pipeline.bus.publish(&topic, &event).await.unwrap();
    settle().await;

    assert_eq!(pipeline.index.document_count(), 1);

    pipeline.stop().await;
}

#[tokio::test]
async fn cached_listing_lags_while_realtime_does_not() {
    let pipeline = Pipeline::start().await;

    pipeline
        .service
        .create(Pipeline::request("first"))
        .await
        .unwrap();
    settle().await;

    // Prime the cache with a one-comment page.
    let request = PageRequest::default();
    let before = pipeline.queries.list(request).await.unwrap();
    assert_eq!(before.total_count, 1);
    assert!(pipeline.cache.contains_key(&request.cache_key()));

    // A second comment arrives.
    pipeline
        .service
        .create(Pipeline::request("second"))
        .await
        .unwrap();
    settle().await;

    // Realtime viewers saw both immediately...
    assert_eq!(pipeline.push.broadcast_count(), 2);
    // ...while the cached listing still shows the old page.
    let after = pipeline.queries.list(request).await.unwrap();
    assert_eq!(after.total_count, 1);
    assert_eq!(after, before);

    // An operator flush is the one way to freshen the listing early.
    pipeline.queries.flush_listing_cache().await.unwrap();
    let flushed = pipeline.queries.list(request).await.unwrap();
    assert_eq!(flushed.total_count, 2);

    pipeline.stop().await;
}

#[tokio::test]
async fn concurrent_cold_reads_converge_on_the_same_cached_value() {
    let repository = Arc::new(InMemoryCommentRepository::new());
    let cache = Arc::new(InMemoryCacheService::new());
    let index = Arc::new(InMemorySearchIndex::new());

    let service = CommentService::new(
        repository.clone(),
        TransactionalPublisher::new(Arc::new(InMemoryEventBus::new())),
        Arc::new(AcceptAllCaptcha),
        Arc::new(InMemoryFileStorage::new()),
        Arc::new(PassthroughSanitizer),
        Arc::new(FixedClock::test_clock()),
    );
    service.create(Pipeline::request("solo")).await.unwrap();

    let queries = Arc::new(CommentQueries::new(
        repository.clone(),
        cache.clone(),
        index,
    ));
    let request = PageRequest::default();

    let a = {
        let queries = queries.clone();
        tokio::spawn(async move { queries.list(request).await.unwrap() })
    };
    let b = {
        let queries = queries.clone();
        tokio::spawn(async move { queries.list(request).await.unwrap() })
    };
    let (page_a, page_b) = (a.await.unwrap(), b.await.unwrap());

    // Both computed the same deterministic value; last write won without
    // corruption, and the cached entry matches what both returned.
    assert_eq!(page_a, page_b);
    let cached = cache.contains_key(&request.cache_key());
    assert!(cached);
    let third = queries.list(request).await.unwrap();
    assert_eq!(third, page_a);
}

#[tokio::test]
async fn nested_replies_read_back_as_a_tree() {
    let pipeline = Pipeline::start().await;

    let c1 = pipeline
        .service
        .create(Pipeline::request("top"))
        .await
        .unwrap();
    let mut reply = Pipeline::request("reply");
    reply.parent_comment_id = Some(c1.id);
    let c2 = pipeline.service.create(reply).await.unwrap();
    let mut nested = Pipeline::request("nested reply");
    nested.parent_comment_id = Some(c2.id);
    let c3 = pipeline.service.create(nested).await.unwrap();
    settle().await;

    let tree = pipeline
        .queries
        .get_with_replies(c1.id)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(tree.id, c1.id);
    assert_eq!(tree.replies.len(), 1);
    assert_eq!(tree.replies[0].id, c2.id);
    assert_eq!(tree.replies[0].replies.len(), 1);
    assert_eq!(tree.replies[0].replies[0].id, c3.id);
    assert!(tree.replies[0].replies[0].replies.is_empty());

    // The listing counts only the top-level comment.
    let page = pipeline.queries.list(PageRequest::default()).await.unwrap();
    assert_eq!(page.total_count, 1);

    pipeline.stop().await;
}

#[tokio::test]
async fn search_results_hydrate_into_threads() {
    let pipeline = Pipeline::start().await;

    let root = pipeline
        .service
        .create(Pipeline::request("findable text"))
        .await
        .unwrap();
    let mut reply = Pipeline::request("a reply");
    reply.parent_comment_id = Some(root.id);
    pipeline.service.create(reply).await.unwrap();
    settle().await;

    let results = pipeline.queries.search("findable", 1, 10).await.unwrap();

    assert_eq!(results.total_count, 1);
    assert_eq!(results.items[0].id, root.id);
    assert_eq!(results.items[0].replies.len(), 1);

    pipeline.stop().await;
}

#[tokio::test]
async fn late_viewer_gets_no_backlog_from_the_pipeline() {
    // Uses the real registry rather than the recorder to cover the
    // consumer-to-registry path.
    use comments_realtime::ConnectionRegistry;

    let repository = Arc::new(InMemoryCommentRepository::new());
    let bus = Arc::new(InMemoryEventBus::new());
    let registry = Arc::new(ConnectionRegistry::new());

    let service = CommentService::new(
        repository,
        TransactionalPublisher::new(bus.clone()),
        Arc::new(AcceptAllCaptcha),
        Arc::new(InMemoryFileStorage::new()),
        Arc::new(PassthroughSanitizer),
        Arc::new(FixedClock::test_clock()),
    );

    let (mut runner, shutdown) = ConsumerRunner::new(
        Arc::new(RealtimeNotifierConsumer::new(registry.clone())),
        bus,
        COMMENT_EVENTS_TOPIC,
    );
    let handle = tokio::spawn(async move { runner.start().await.unwrap() });
    tokio::time::sleep(Duration::from_millis(50)).await;

    // A viewer connected before the write sees the push.
    let (_early_id, mut early_rx) = registry.register();

    service.create(Pipeline::request("hello")).await.unwrap();
    settle().await;

    let message = early_rx.recv().await.unwrap();
    assert_eq!(message.event, COMMENT_CREATED_PUSH_EVENT);
    assert_eq!(
        message.payload.get("text").and_then(|v| v.as_str()),
        Some("hello")
    );

    // A viewer connecting after the write gets no backlog.
    let (_late_id, mut late_rx) = registry.register();
    assert!(late_rx.try_recv().is_err());

    shutdown.send(true).ok();
    handle.await.unwrap();
}

#[tokio::test]
async fn ghost_search_hits_are_skipped_after_deletion() {
    let pipeline = Pipeline::start().await;

    // An id that was indexed but never stored (or since deleted).
    pipeline.index.seed(CommentDocument {
        id: CommentId::generate(),
        user_name: "ghost".to_string(),
        email: "ghost@example.com".to_string(),
        text: "vanished".to_string(),
        created_at: chrono::Utc::now(),
    });

    let results = pipeline.queries.search("vanished", 1, 10).await.unwrap();
    assert!(results.items.is_empty());

    pipeline.stop().await;
}
