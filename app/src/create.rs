//! The write path: validate, commit, then propagate.
//!
//! Creation is synchronous relative to the originating request up to and
//! including the storage commit; everything after (indexing, realtime push)
//! happens behind the broker. A submitting user sees success as soon as the
//! commit succeeds, regardless of what later happens to propagation.

use crate::publisher::TransactionalPublisher;
use comments_core::clock::Clock;
use comments_core::comment::{
    Attachment, AttachmentKind, Comment, CommentId, DomainError, Email, HomePage, UserName,
};
use comments_core::dto::CommentDto;
use comments_core::repository::{CommentRepository, RepositoryError};
use comments_core::services::{
    CaptchaError, CaptchaService, FileStorage, FileStorageError, HtmlSanitizer,
};
use std::sync::Arc;
use thiserror::Error;

/// Maximum accepted size for a plain-text attachment.
pub const MAX_TEXT_ATTACHMENT_BYTES: usize = 100 * 1024;

/// Image content types accepted for attachments.
pub const ACCEPTED_IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/gif"];

/// An uploaded file accompanying a new comment.
#[derive(Clone, Debug)]
pub struct AttachmentUpload {
    /// Original filename.
    pub file_name: String,
    /// MIME content type as submitted.
    pub content_type: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// Input for creating a comment.
#[derive(Clone, Debug)]
pub struct CreateCommentRequest {
    /// Author name.
    pub user_name: String,
    /// Author email.
    pub email: String,
    /// Optional author homepage.
    pub home_page: Option<String>,
    /// Comment body (untrusted; sanitized before storage).
    pub text: String,
    /// Parent comment when this is a reply.
    pub parent_comment_id: Option<CommentId>,
    /// CAPTCHA challenge key.
    pub captcha_key: String,
    /// CAPTCHA answer.
    pub captcha_answer: String,
    /// Optional attachment.
    pub attachment: Option<AttachmentUpload>,
}

/// Failures of the write path. All of these happen before the commit, so a
/// failed request can simply be retried as a whole.
#[derive(Error, Debug)]
pub enum CreateCommentError {
    /// A domain validation rule was broken.
    #[error(transparent)]
    Validation(#[from] DomainError),

    /// The CAPTCHA answer was wrong.
    #[error("captcha verification failed")]
    InvalidCaptcha,

    /// The CAPTCHA backend failed.
    #[error(transparent)]
    Captcha(#[from] CaptchaError),

    /// The referenced parent comment does not exist.
    #[error("parent comment {0} does not exist")]
    ParentNotFound(CommentId),

    /// The attachment content type is not supported.
    #[error("unsupported attachment content type: {0}")]
    UnsupportedAttachment(String),

    /// A text attachment exceeded [`MAX_TEXT_ATTACHMENT_BYTES`].
    #[error("text attachment exceeds {MAX_TEXT_ATTACHMENT_BYTES} bytes")]
    AttachmentTooLarge,

    /// Storing the attachment file failed.
    #[error(transparent)]
    Files(#[from] FileStorageError),

    /// The storage commit failed; nothing was persisted or published.
    #[error(transparent)]
    Storage(#[from] RepositoryError),
}

/// The comment write-path service.
pub struct CommentService {
    repository: Arc<dyn CommentRepository>,
    publisher: TransactionalPublisher,
    captcha: Arc<dyn CaptchaService>,
    files: Arc<dyn FileStorage>,
    sanitizer: Arc<dyn HtmlSanitizer>,
    clock: Arc<dyn Clock>,
}

impl CommentService {
    /// Wires the write path.
    #[must_use]
    pub fn new(
        repository: Arc<dyn CommentRepository>,
        publisher: TransactionalPublisher,
        captcha: Arc<dyn CaptchaService>,
        files: Arc<dyn FileStorage>,
        sanitizer: Arc<dyn HtmlSanitizer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            publisher,
            captcha,
            files,
            sanitizer,
            clock,
        }
    }

    /// Creates a comment: validate, commit, then best-effort propagate.
    ///
    /// On success the comment is durable and the returned DTO reflects it.
    /// Propagation failures after the commit do not surface here; readers
    /// may transiently miss the comment in search and in the cached listing
    /// while seeing it immediately on the realtime channel.
    ///
    /// # Errors
    ///
    /// Returns [`CreateCommentError`]; all variants occur strictly before
    /// the commit, so retrying the whole request is safe.
    pub async fn create(
        &self,
        request: CreateCommentRequest,
    ) -> Result<CommentDto, CreateCommentError> {
        if !self
            .captcha
            .verify(&request.captcha_key, &request.captcha_answer)
            .await?
        {
            return Err(CreateCommentError::InvalidCaptcha);
        }

        let user_name = UserName::new(request.user_name)?;
        let email = Email::new(request.email)?;
        let home_page = HomePage::new(request.home_page.as_deref())?;
        let text = self.sanitizer.sanitize(&request.text);

        if let Some(parent_id) = request.parent_comment_id {
            if self.repository.get_by_id(parent_id).await?.is_none() {
                return Err(CreateCommentError::ParentNotFound(parent_id));
            }
        }

        let mut comment = Comment::create(
            user_name,
            email,
            home_page,
            text,
            request.parent_comment_id,
            self.clock.now(),
        );

        if let Some(upload) = request.attachment {
            let attachment = self.store_attachment(upload).await?;
            comment.attach(attachment)?;
        }

        // The commit. From here on the fact is durable and the request
        // succeeds no matter what happens to propagation.
        self.repository.insert(&comment).await?;

        tracing::info!(
            comment_id = %comment.id(),
            parent_comment_id = ?comment.parent_comment_id(),
            "comment committed"
        );

        self.publisher
            .publish_committed(std::slice::from_mut(&mut comment))
            .await;

        Ok(CommentDto::from_comment(&comment))
    }

    async fn store_attachment(
        &self,
        upload: AttachmentUpload,
    ) -> Result<Attachment, CreateCommentError> {
        let kind = if ACCEPTED_IMAGE_TYPES.contains(&upload.content_type.as_str()) {
            AttachmentKind::Image
        } else if upload.content_type == "text/plain" {
            if upload.bytes.len() > MAX_TEXT_ATTACHMENT_BYTES {
                return Err(CreateCommentError::AttachmentTooLarge);
            }
            AttachmentKind::Text
        } else {
            return Err(CreateCommentError::UnsupportedAttachment(
                upload.content_type,
            ));
        };

        let stored = self
            .files
            .store(&upload.file_name, &upload.content_type, &upload.bytes)
            .await?;

        Ok(Attachment::create(
            upload.file_name,
            stored.stored_file_name,
            stored.content_type,
            stored.size_bytes,
            kind,
        ))
    }
}
