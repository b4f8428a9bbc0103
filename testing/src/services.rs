//! Fakes for the write path's supporting services.

use comments_core::services::{
    CaptchaError, CaptchaService, FileStorage, FileStorageError, HtmlSanitizer, StoredFile,
};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// CAPTCHA service that accepts every answer.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAllCaptcha;

impl CaptchaService for AcceptAllCaptcha {
    fn verify(
        &self,
        _key: &str,
        _answer: &str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, CaptchaError>> + Send + '_>> {
        Box::pin(async { Ok(true) })
    }
}

/// CAPTCHA service that rejects every answer.
#[derive(Debug, Default, Clone, Copy)]
pub struct RejectAllCaptcha;

impl CaptchaService for RejectAllCaptcha {
    fn verify(
        &self,
        _key: &str,
        _answer: &str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, CaptchaError>> + Send + '_>> {
        Box::pin(async { Ok(false) })
    }
}

/// File storage holding uploads in a map, with sequential stored names.
#[derive(Debug, Default)]
pub struct InMemoryFileStorage {
    files: Mutex<HashMap<String, Vec<u8>>>,
    counter: AtomicU64,
}

impl InMemoryFileStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored files.
    #[must_use]
    pub fn stored_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    /// Bytes stored under a name, if any.
    #[must_use]
    pub fn get(&self, stored_file_name: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(stored_file_name).cloned()
    }
}

impl FileStorage for InMemoryFileStorage {
    fn store(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Pin<Box<dyn Future<Output = Result<StoredFile, FileStorageError>> + Send + '_>> {
        let file_name = file_name.to_string();
        let content_type = content_type.to_string();
        let bytes = bytes.to_vec();
        Box::pin(async move {
            let sequence = self.counter.fetch_add(1, Ordering::SeqCst);
            let stored_file_name = format!("{sequence}-{file_name}");
            let size_bytes = bytes.len() as u64;
            self.files
                .lock()
                .unwrap()
                .insert(stored_file_name.clone(), bytes);
            Ok(StoredFile {
                stored_file_name,
                content_type,
                size_bytes,
            })
        })
    }
}

/// Sanitizer that returns its input untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughSanitizer;

impl HtmlSanitizer for PassthroughSanitizer {
    fn sanitize(&self, input: &str) -> String {
        input.to_string()
    }
}
