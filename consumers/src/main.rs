//! Consumer daemon: runs the search indexer and the realtime notifier.
//!
//! Each consumer subscribes to `comment-events` under its own consumer
//! group, so the broker delivers every event to both and their failures
//! stay isolated. Ctrl-C signals both runners to shut down cooperatively.

use anyhow::Result;
use comments_consumers::{
    ConsumerConfig, ConsumerRunner, RealtimeNotifierConsumer, SearchIndexerConsumer,
    REALTIME_NOTIFIER_GROUP, SEARCH_INDEXER_GROUP,
};
use comments_core::event::COMMENT_EVENTS_TOPIC;
use comments_realtime::ConnectionRegistry;
use comments_redpanda::RedpandaEventBus;
use comments_search::MeiliCommentIndex;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ConsumerConfig::from_env();
    tracing::info!(brokers = %config.brokers, meili_url = %config.meili_url, "starting comment consumers");

    let index = Arc::new(MeiliCommentIndex::new(
        &config.meili_url,
        config.meili_api_key.as_deref(),
    )?);
    let registry = Arc::new(ConnectionRegistry::new());

    // One bus per consumer: each needs its own consumer group.
    let indexer_bus = Arc::new(RedpandaEventBus::consumer(
        &config.brokers,
        SEARCH_INDEXER_GROUP,
    ));
    let notifier_bus = Arc::new(RedpandaEventBus::consumer(
        &config.brokers,
        REALTIME_NOTIFIER_GROUP,
    ));

    let (indexer_runner, indexer_shutdown) = ConsumerRunner::new(
        Arc::new(SearchIndexerConsumer::new(index)),
        indexer_bus,
        COMMENT_EVENTS_TOPIC,
    );
    let (notifier_runner, notifier_shutdown) = ConsumerRunner::new(
        Arc::new(RealtimeNotifierConsumer::new(registry)),
        notifier_bus,
        COMMENT_EVENTS_TOPIC,
    );

    let mut indexer_runner = match config.retry_policy() {
        Some(policy) => indexer_runner.with_retry_policy(policy.clone()),
        None => indexer_runner,
    };
    let mut notifier_runner = match config.retry_policy() {
        Some(policy) => notifier_runner.with_retry_policy(policy),
        None => notifier_runner,
    };

    let indexer_handle = tokio::spawn(async move { indexer_runner.start().await });
    let notifier_handle = tokio::spawn(async move { notifier_runner.start().await });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    indexer_shutdown.send(true).ok();
    notifier_shutdown.send(true).ok();

    if let Err(e) = indexer_handle.await? {
        tracing::error!(error = %e, "search indexer runner exited with error");
    }
    if let Err(e) = notifier_handle.await? {
        tracing::error!(error = %e, "realtime notifier runner exited with error");
    }

    Ok(())
}
