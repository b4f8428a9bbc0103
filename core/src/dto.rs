//! Read-side shapes returned to clients.
//!
//! Field names serialize in camelCase so cached pages and push payloads keep
//! the JSON shape existing clients already parse.

use crate::comment::{Attachment, AttachmentId, Comment, CommentId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A comment as returned to readers, with nested replies.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDto {
    /// Comment identity.
    pub id: CommentId,
    /// Author name.
    pub user_name: String,
    /// Author email.
    pub email: String,
    /// Author homepage, if provided.
    pub home_page: Option<String>,
    /// Comment body text.
    pub text: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Attachment, if any.
    pub attachment: Option<AttachmentDto>,
    /// Direct replies, oldest first. Always present; empty for leaves.
    pub replies: Vec<CommentDto>,
}

impl CommentDto {
    /// Maps a comment without loading replies (the listing shape).
    #[must_use]
    pub fn from_comment(comment: &Comment) -> Self {
        Self {
            id: comment.id(),
            user_name: comment.user_name().to_string(),
            email: comment.email().to_string(),
            home_page: comment.home_page().map(str::to_string),
            text: comment.text().to_string(),
            created_at: comment.created_at(),
            attachment: comment.attachment().map(AttachmentDto::from_attachment),
            replies: Vec::new(),
        }
    }
}

/// An attachment as returned to readers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentDto {
    /// Attachment identity.
    pub id: AttachmentId,
    /// Original filename as uploaded.
    pub file_name: String,
    /// MIME content type.
    pub content_type: String,
    /// Download URL for the stored file.
    pub url: String,
}

impl AttachmentDto {
    /// Maps an attachment, deriving the download URL from the stored name.
    #[must_use]
    pub fn from_attachment(attachment: &Attachment) -> Self {
        Self {
            id: attachment.id(),
            file_name: attachment.file_name().to_string(),
            content_type: attachment.content_type().to_string(),
            url: format!("/api/files/{}", attachment.stored_file_name()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::comment::{AttachmentKind, Email, UserName};

    #[test]
    fn empty_replies_serialize_as_present_empty_array() {
        let comment = Comment::create(
            UserName::new("alice").unwrap(),
            Email::new("alice@example.com").unwrap(),
            None,
            "hello".to_string(),
            None,
            Utc::now(),
        );
        let dto = CommentDto::from_comment(&comment);

        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json.get("replies"), Some(&serde_json::json!([])));
    }

    #[test]
    fn attachment_url_points_at_the_stored_file() {
        let attachment = Attachment::create(
            "notes.txt".to_string(),
            "1f-stored-notes.txt".to_string(),
            "text/plain".to_string(),
            42,
            AttachmentKind::Text,
        );
        let dto = AttachmentDto::from_attachment(&attachment);
        assert_eq!(dto.url, "/api/files/1f-stored-notes.txt");
        assert_eq!(dto.file_name, "notes.txt");
    }
}
