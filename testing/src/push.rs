//! Push-channel doubles.

use comments_core::push::{PushChannel, PushError};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

/// Records every broadcast for assertions.
#[derive(Debug, Default)]
pub struct RecordingPushChannel {
    broadcasts: Mutex<Vec<(String, serde_json::Value)>>,
}

impl RecordingPushChannel {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All broadcasts so far, in order.
    #[must_use]
    pub fn broadcasts(&self) -> Vec<(String, serde_json::Value)> {
        self.broadcasts.lock().unwrap().clone()
    }

    /// Number of broadcasts so far.
    #[must_use]
    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.lock().unwrap().len()
    }
}

impl PushChannel for RecordingPushChannel {
    fn broadcast_all(
        &self,
        event_name: &str,
        payload: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<(), PushError>> + Send + '_>> {
        let event_name = event_name.to_string();
        Box::pin(async move {
            self.broadcasts.lock().unwrap().push((event_name, payload));
            Ok(())
        })
    }
}

/// Push channel that always fails, for fault-injection scenarios.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingPushChannel;

impl PushChannel for FailingPushChannel {
    fn broadcast_all(
        &self,
        _event_name: &str,
        _payload: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<(), PushError>> + Send + '_>> {
        Box::pin(async move {
            Err(PushError::Channel(
                "injected push channel failure".to_string(),
            ))
        })
    }
}
