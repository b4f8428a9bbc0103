//! Environment configuration for the consumer daemon.

use crate::retry::RetryPolicy;
use std::env;

/// Runtime configuration, read from the environment with local-dev defaults.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Kafka-compatible broker addresses, comma-separated.
    pub brokers: String,
    /// Meilisearch endpoint.
    pub meili_url: String,
    /// Meilisearch API key, if the instance requires one.
    pub meili_api_key: Option<String>,
    /// Retry attempts for failed consumer side effects; 0 disables retry.
    pub retry_max_attempts: usize,
}

impl ConsumerConfig {
    /// Loads configuration from the environment.
    pub fn from_env() -> Self {
        Self {
            brokers: var_or("COMMENTS_BROKERS", "localhost:9092"),
            meili_url: var_or("COMMENTS_MEILI_URL", "http://localhost:7700"),
            meili_api_key: env::var("COMMENTS_MEILI_API_KEY").ok(),
            retry_max_attempts: var_or("COMMENTS_CONSUMER_RETRIES", "0")
                .parse()
                .unwrap_or(0),
        }
    }

    /// Retry policy derived from the configuration, if enabled.
    #[must_use]
    pub fn retry_policy(&self) -> Option<RetryPolicy> {
        if self.retry_max_attempts == 0 {
            None
        } else {
            Some(
                RetryPolicy::builder()
                    .max_retries(self.retry_max_attempts)
                    .build(),
            )
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        tracing::info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_retries_means_no_policy() {
        let config = ConsumerConfig {
            brokers: "localhost:9092".to_string(),
            meili_url: "http://localhost:7700".to_string(),
            meili_api_key: None,
            retry_max_attempts: 0,
        };
        assert!(config.retry_policy().is_none());
    }

    #[test]
    fn nonzero_retries_build_a_policy() {
        let config = ConsumerConfig {
            brokers: "localhost:9092".to_string(),
            meili_url: "http://localhost:7700".to_string(),
            meili_api_key: None,
            retry_max_attempts: 4,
        };
        let policy = config.retry_policy().map(|p| p.max_retries);
        assert_eq!(policy, Some(4));
    }
}
