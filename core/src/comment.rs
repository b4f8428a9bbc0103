//! The comment aggregate, its attachment, and the domain events it records.
//!
//! A [`Comment`] is the aggregate root of the write side. Creating one
//! records a [`DomainEvent::CommentCreated`] in the aggregate's pending-event
//! list; the transactional publisher harvests that list exactly once after
//! the storage commit succeeds and translates each entry into an integration
//! event for the broker.
//!
//! # Invariants
//!
//! - A comment's parent, if present, must already exist; since ids are never
//!   reused and a comment can only reference a pre-existing parent,
//!   parent/child edges form a forest by construction.
//! - Pending events are attached at creation, cleared exactly once when
//!   harvested, and never re-populated for an already-persisted comment
//!   (rehydration constructors start with an empty list).
//! - Persisted fields are immutable apart from attaching the single optional
//!   file attachment.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

/// Maximum length of an author name.
pub const MAX_USER_NAME_LEN: usize = 50;
/// Maximum length of an author email address.
pub const MAX_EMAIL_LEN: usize = 254;
/// Maximum length of an author homepage URL.
pub const MAX_HOME_PAGE_LEN: usize = 2048;

#[allow(clippy::unwrap_used)] // hardcoded pattern, verified by tests
static USER_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").unwrap());

#[allow(clippy::unwrap_used)] // hardcoded pattern, verified by tests
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

/// Validation failures raised while constructing domain values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Author name was empty or whitespace.
    #[error("user name is required")]
    EmptyUserName,

    /// Author name exceeded [`MAX_USER_NAME_LEN`] characters.
    #[error("user name must not exceed {MAX_USER_NAME_LEN} characters")]
    UserNameTooLong,

    /// Author name contained characters outside `[a-zA-Z0-9_]`.
    #[error("user name must contain only latin letters, digits and underscores")]
    InvalidUserName,

    /// Email was empty or whitespace.
    #[error("email is required")]
    EmptyEmail,

    /// Email exceeded [`MAX_EMAIL_LEN`] characters.
    #[error("email must not exceed {MAX_EMAIL_LEN} characters")]
    EmailTooLong,

    /// Email did not look like `local@domain.tld`.
    #[error("email format is invalid")]
    InvalidEmail,

    /// Homepage URL exceeded [`MAX_HOME_PAGE_LEN`] characters.
    #[error("home page URL must not exceed {MAX_HOME_PAGE_LEN} characters")]
    HomePageTooLong,

    /// Homepage was not an absolute http/https URL.
    #[error("home page must be a valid HTTP or HTTPS URL")]
    InvalidHomePage,

    /// A second attachment was offered to a comment that already has one.
    #[error("comment already has an attachment")]
    AttachmentAlreadySet,
}

/// Time-sortable unique identifier for a comment (UUID v7).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CommentId(Uuid);

impl CommentId {
    /// Generates a fresh, time-sortable id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wraps an existing UUID (e.g. one read back from storage).
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an attachment (UUID v7).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachmentId(Uuid);

impl AttachmentId {
    /// Generates a fresh, time-sortable id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn into_uuid(self) -> Uuid {
        self.0
    }
}

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated author name: 1–50 latin letters, digits or underscores.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserName(String);

impl UserName {
    /// Validates and wraps an author name.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::EmptyUserName`], [`DomainError::UserNameTooLong`]
    /// or [`DomainError::InvalidUserName`] when the input breaks a rule.
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DomainError::EmptyUserName);
        }
        if value.chars().count() > MAX_USER_NAME_LEN {
            return Err(DomainError::UserNameTooLong);
        }
        if !USER_NAME_RE.is_match(&value) {
            return Err(DomainError::InvalidUserName);
        }
        Ok(Self(value))
    }

    /// Returns the validated string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated, lowercase-normalized email address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Email(String);

impl Email {
    /// Validates and wraps an email address, normalizing it to lowercase.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::EmptyEmail`], [`DomainError::EmailTooLong`] or
    /// [`DomainError::InvalidEmail`] when the input breaks a rule.
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DomainError::EmptyEmail);
        }
        if value.chars().count() > MAX_EMAIL_LEN {
            return Err(DomainError::EmailTooLong);
        }
        if !EMAIL_RE.is_match(&value) {
            return Err(DomainError::InvalidEmail);
        }
        Ok(Self(value.to_lowercase()))
    }

    /// Returns the validated string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Validated absolute http/https homepage URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HomePage(String);

impl HomePage {
    /// Validates an optional homepage value.
    ///
    /// Empty or whitespace-only input is treated as "not provided" and maps
    /// to `Ok(None)`, mirroring an optional form field.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::HomePageTooLong`] or
    /// [`DomainError::InvalidHomePage`] when a non-empty value breaks a rule.
    pub fn new(value: Option<&str>) -> Result<Option<Self>, DomainError> {
        let Some(value) = value else {
            return Ok(None);
        };
        if value.trim().is_empty() {
            return Ok(None);
        }
        if value.chars().count() > MAX_HOME_PAGE_LEN {
            return Err(DomainError::HomePageTooLong);
        }
        let parsed = Url::parse(value).map_err(|_| DomainError::InvalidHomePage)?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(DomainError::InvalidHomePage);
        }
        Ok(Some(Self(value.to_string())))
    }

    /// Returns the validated string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for HomePage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of file attached to a comment.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttachmentKind {
    /// An image attachment (resized by the file pipeline before storage).
    Image,
    /// A plain-text attachment.
    Text,
}

impl AttachmentKind {
    /// Stable storage representation of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Text => "text",
        }
    }

    /// Parses the storage representation back into a kind.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "image" => Some(Self::Image),
            "text" => Some(Self::Text),
            _ => None,
        }
    }
}

impl fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// File attached to a comment. Owned by exactly one comment (1:1) and
/// cascade-deleted with it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    id: AttachmentId,
    file_name: String,
    stored_file_name: String,
    content_type: String,
    file_size_bytes: u64,
    kind: AttachmentKind,
}

impl Attachment {
    /// Creates a new attachment with a fresh id.
    #[must_use]
    pub fn create(
        file_name: String,
        stored_file_name: String,
        content_type: String,
        file_size_bytes: u64,
        kind: AttachmentKind,
    ) -> Self {
        Self {
            id: AttachmentId::generate(),
            file_name,
            stored_file_name,
            content_type,
            file_size_bytes,
            kind,
        }
    }

    /// Reconstructs a persisted attachment from storage fields.
    #[must_use]
    pub const fn rehydrate(
        id: AttachmentId,
        file_name: String,
        stored_file_name: String,
        content_type: String,
        file_size_bytes: u64,
        kind: AttachmentKind,
    ) -> Self {
        Self {
            id,
            file_name,
            stored_file_name,
            content_type,
            file_size_bytes,
            kind,
        }
    }

    /// Attachment identifier.
    #[must_use]
    pub const fn id(&self) -> AttachmentId {
        self.id
    }

    /// Original filename as uploaded.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Filename under which the file is stored.
    #[must_use]
    pub fn stored_file_name(&self) -> &str {
        &self.stored_file_name
    }

    /// MIME content type.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Size of the stored file in bytes.
    #[must_use]
    pub const fn file_size_bytes(&self) -> u64 {
        self.file_size_bytes
    }

    /// Kind of the attachment.
    #[must_use]
    pub const fn kind(&self) -> AttachmentKind {
        self.kind
    }
}

/// In-memory, pre-commit record of something that happened to a comment.
///
/// Harvested and discarded once translated into an integration event; see
/// [`Comment::take_events`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomainEvent {
    /// A comment was created.
    CommentCreated {
        /// Identity of the created comment.
        comment_id: CommentId,
    },
}

/// The comment aggregate root.
///
/// The aggregate exclusively owns its pending-event list; nothing external
/// may mutate persisted fields after creation, apart from attaching the
/// single optional file attachment before the commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comment {
    id: CommentId,
    user_name: String,
    email: String,
    home_page: Option<String>,
    text: String,
    created_at: DateTime<Utc>,
    parent_comment_id: Option<CommentId>,
    attachment: Option<Attachment>,
    pending_events: Vec<DomainEvent>,
}

impl Comment {
    /// Creates a new comment and records its `CommentCreated` domain event.
    ///
    /// `parent_comment_id` must reference an existing comment; the caller is
    /// responsible for that check (the application layer does it against the
    /// repository before constructing the aggregate).
    #[must_use]
    pub fn create(
        user_name: UserName,
        email: Email,
        home_page: Option<HomePage>,
        text: String,
        parent_comment_id: Option<CommentId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let id = CommentId::generate();
        Self {
            id,
            user_name: user_name.into_inner(),
            email: email.into_inner(),
            home_page: home_page.map(HomePage::into_inner),
            text,
            created_at,
            parent_comment_id,
            attachment: None,
            pending_events: vec![DomainEvent::CommentCreated { comment_id: id }],
        }
    }

    /// Reconstructs a persisted comment from storage fields.
    ///
    /// Rehydrated aggregates start with an empty pending-event list: domain
    /// events are never re-populated for an already-persisted comment.
    #[must_use]
    #[allow(clippy::too_many_arguments)] // mirrors the storage row
    pub const fn rehydrate(
        id: CommentId,
        user_name: String,
        email: String,
        home_page: Option<String>,
        text: String,
        created_at: DateTime<Utc>,
        parent_comment_id: Option<CommentId>,
        attachment: Option<Attachment>,
    ) -> Self {
        Self {
            id,
            user_name,
            email,
            home_page,
            text,
            created_at,
            parent_comment_id,
            attachment,
            pending_events: Vec::new(),
        }
    }

    /// Attaches the comment's single optional file attachment.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::AttachmentAlreadySet`] if an attachment is
    /// already present (the relationship is strictly 1:1).
    pub fn attach(&mut self, attachment: Attachment) -> Result<(), DomainError> {
        if self.attachment.is_some() {
            return Err(DomainError::AttachmentAlreadySet);
        }
        self.attachment = Some(attachment);
        Ok(())
    }

    /// Harvests and clears the pending domain events.
    ///
    /// Clearing is idempotent: the first call yields the recorded events,
    /// every later call yields an empty vector.
    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// Whether the aggregate still holds unharvested events.
    #[must_use]
    pub fn has_pending_events(&self) -> bool {
        !self.pending_events.is_empty()
    }

    /// Comment identifier.
    #[must_use]
    pub const fn id(&self) -> CommentId {
        self.id
    }

    /// Author name.
    #[must_use]
    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// Author email.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Author homepage, if provided.
    #[must_use]
    pub fn home_page(&self) -> Option<&str> {
        self.home_page.as_deref()
    }

    /// Comment body text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Parent comment, when this comment is a reply.
    #[must_use]
    pub const fn parent_comment_id(&self) -> Option<CommentId> {
        self.parent_comment_id
    }

    /// The comment's attachment, if any.
    #[must_use]
    pub const fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_comment() -> Comment {
        Comment::create(
            UserName::new("alice").unwrap(),
            Email::new("alice@example.com").unwrap(),
            None,
            "hello".to_string(),
            None,
            Utc::now(),
        )
    }

    #[test]
    fn create_records_a_comment_created_event() {
        let comment = sample_comment();
        assert!(comment.has_pending_events());
    }

    #[test]
    fn take_events_yields_once_then_nothing() {
        let mut comment = sample_comment();
        let id = comment.id();

        let first = comment.take_events();
        assert_eq!(first, vec![DomainEvent::CommentCreated { comment_id: id }]);

        let second = comment.take_events();
        assert!(second.is_empty());
        assert!(!comment.has_pending_events());
    }

    #[test]
    fn rehydrated_comment_has_no_pending_events() {
        let comment = Comment::rehydrate(
            CommentId::generate(),
            "alice".to_string(),
            "alice@example.com".to_string(),
            None,
            "hello".to_string(),
            Utc::now(),
            None,
            None,
        );
        assert!(!comment.has_pending_events());
    }

    #[test]
    fn attach_is_one_to_one() {
        let mut comment = sample_comment();
        let attachment = Attachment::create(
            "photo.png".to_string(),
            "stored-photo.png".to_string(),
            "image/png".to_string(),
            1024,
            AttachmentKind::Image,
        );
        comment.attach(attachment.clone()).unwrap();
        assert_eq!(
            comment.attach(attachment),
            Err(DomainError::AttachmentAlreadySet)
        );
    }

    #[test]
    fn comment_ids_are_time_sortable() {
        let first = CommentId::generate();
        // v7 ids only order by their millisecond timestamp.
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = CommentId::generate();
        assert!(first < second);
    }

    #[test]
    fn user_name_rules() {
        assert!(UserName::new("alice_42").is_ok());
        assert_eq!(UserName::new("  "), Err(DomainError::EmptyUserName));
        assert_eq!(
            UserName::new("a".repeat(51)),
            Err(DomainError::UserNameTooLong)
        );
        assert_eq!(UserName::new("al ice"), Err(DomainError::InvalidUserName));
        assert_eq!(UserName::new("ålice"), Err(DomainError::InvalidUserName));
    }

    #[test]
    fn email_rules() {
        assert_eq!(
            Email::new("Alice@Example.COM").unwrap().as_str(),
            "alice@example.com"
        );
        assert_eq!(Email::new(""), Err(DomainError::EmptyEmail));
        assert_eq!(Email::new("not-an-email"), Err(DomainError::InvalidEmail));
        assert_eq!(
            Email::new(format!("{}@example.com", "a".repeat(250))),
            Err(DomainError::EmailTooLong)
        );
    }

    #[test]
    fn home_page_rules() {
        assert_eq!(HomePage::new(None).unwrap(), None);
        assert_eq!(HomePage::new(Some("   ")).unwrap(), None);
        assert!(HomePage::new(Some("https://example.com")).unwrap().is_some());
        assert_eq!(
            HomePage::new(Some("ftp://example.com")),
            Err(DomainError::InvalidHomePage)
        );
        assert_eq!(
            HomePage::new(Some("not a url")),
            Err(DomainError::InvalidHomePage)
        );
    }

    #[test]
    fn attachment_kind_roundtrip() {
        assert_eq!(AttachmentKind::parse("image"), Some(AttachmentKind::Image));
        assert_eq!(AttachmentKind::parse("text"), Some(AttachmentKind::Text));
        assert_eq!(AttachmentKind::parse("video"), None);
        assert_eq!(AttachmentKind::Image.as_str(), "image");
    }
}
