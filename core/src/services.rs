//! Supporting service boundaries consumed by the write path.
//!
//! CAPTCHA verification, file storage and HTML sanitization are external
//! collaborators: the pipeline only depends on the traits below. Production
//! implementations (image rendering, disk/object storage, tag filtering)
//! live outside this workspace; the testing crate ships fakes.

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Error type for CAPTCHA verification.
#[derive(Error, Debug, Clone)]
pub enum CaptchaError {
    /// The CAPTCHA backend failed.
    #[error("captcha service error: {0}")]
    Backend(String),
}

/// CAPTCHA challenge verification.
pub trait CaptchaService: Send + Sync {
    /// Checks a submitted answer against the challenge identified by `key`.
    ///
    /// Returns `Ok(false)` for a wrong answer; errors are reserved for
    /// backend failures.
    ///
    /// # Errors
    ///
    /// Returns [`CaptchaError`] when the verification backend fails.
    fn verify(
        &self,
        key: &str,
        answer: &str,
    ) -> Pin<Box<dyn Future<Output = Result<bool, CaptchaError>> + Send + '_>>;
}

/// Error type for file storage.
#[derive(Error, Debug, Clone)]
pub enum FileStorageError {
    /// The storage backend failed.
    #[error("file storage error: {0}")]
    Backend(String),
}

/// Result of storing an uploaded file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredFile {
    /// Filename under which the file was stored.
    pub stored_file_name: String,
    /// Content type after any processing (e.g. image re-encoding).
    pub content_type: String,
    /// Stored size in bytes.
    pub size_bytes: u64,
}

/// File/image storage boundary. Image resizing happens behind this trait.
pub trait FileStorage: Send + Sync {
    /// Stores an uploaded file and returns its stored identity.
    ///
    /// # Errors
    ///
    /// Returns [`FileStorageError`] when the file cannot be stored.
    fn store(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Pin<Box<dyn Future<Output = Result<StoredFile, FileStorageError>> + Send + '_>>;
}

/// HTML sanitization boundary for comment bodies.
///
/// Pure and synchronous: given untrusted input, returns the subset safe to
/// render.
pub trait HtmlSanitizer: Send + Sync {
    /// Sanitizes an untrusted comment body.
    fn sanitize(&self, input: &str) -> String;
}
