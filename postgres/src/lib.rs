//! PostgreSQL implementation of the comment repository.
//!
//! The insert is the pipeline's commit point: the comment row and its
//! optional attachment row go in one transaction, and only after that
//! transaction commits may integration events be published. Descendants are
//! fetched with a single recursive CTE (no N+1), returned flat for the tree
//! assembler to shape.

use comments_core::comment::{Attachment, AttachmentId, AttachmentKind, Comment, CommentId};
use comments_core::paging::{PageRequest, SortDirection, SortField};
use comments_core::repository::{CommentRepository, RepositoryError};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::future::Future;
use std::pin::Pin;
use uuid::Uuid;

const SELECT_COLUMNS: &str = "c.id, c.user_name, c.email, c.home_page, c.text, c.created_at, \
     c.parent_comment_id, \
     a.id AS attachment_id, a.file_name AS attachment_file_name, \
     a.stored_file_name AS attachment_stored_file_name, \
     a.content_type AS attachment_content_type, \
     a.file_size_bytes AS attachment_file_size_bytes, \
     a.kind AS attachment_kind";

/// One joined comment + optional attachment row.
#[derive(Debug, sqlx::FromRow)]
struct CommentRow {
    id: Uuid,
    user_name: String,
    email: String,
    home_page: Option<String>,
    text: String,
    created_at: DateTime<Utc>,
    parent_comment_id: Option<Uuid>,
    attachment_id: Option<Uuid>,
    attachment_file_name: Option<String>,
    attachment_stored_file_name: Option<String>,
    attachment_content_type: Option<String>,
    attachment_file_size_bytes: Option<i64>,
    attachment_kind: Option<String>,
}

impl CommentRow {
    fn into_comment(self) -> Result<Comment, RepositoryError> {
        let attachment = match self.attachment_id {
            Some(id) => {
                let kind_raw = self.attachment_kind.unwrap_or_default();
                let kind = AttachmentKind::parse(&kind_raw).ok_or_else(|| {
                    RepositoryError::Decode(format!("unknown attachment kind '{kind_raw}'"))
                })?;
                Some(Attachment::rehydrate(
                    AttachmentId::from_uuid(id),
                    self.attachment_file_name.unwrap_or_default(),
                    self.attachment_stored_file_name.unwrap_or_default(),
                    self.attachment_content_type.unwrap_or_default(),
                    u64::try_from(self.attachment_file_size_bytes.unwrap_or_default())
                        .unwrap_or_default(),
                    kind,
                ))
            }
            None => None,
        };

        Ok(Comment::rehydrate(
            CommentId::from_uuid(self.id),
            self.user_name,
            self.email,
            self.home_page,
            self.text,
            self.created_at,
            self.parent_comment_id.map(CommentId::from_uuid),
            attachment,
        ))
    }
}

const fn sort_column(field: SortField) -> &'static str {
    match field {
        SortField::UserName => "user_name",
        SortField::Email => "email",
        SortField::CreatedAt => "created_at",
    }
}

const fn sort_order(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Ascending => "ASC",
        SortDirection::Descending => "DESC",
    }
}

/// PostgreSQL-backed comment repository.
pub struct PostgresCommentRepository {
    pool: PgPool,
}

impl PostgresCommentRepository {
    /// Wraps an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CommentRepository for PostgresCommentRepository {
    fn insert(
        &self,
        comment: &Comment,
    ) -> Pin<Box<dyn Future<Output = Result<(), RepositoryError>> + Send + '_>> {
        let comment = comment.clone();
        Box::pin(async move {
            let mut tx = self
                .pool
                .begin()
                .await
                .map_err(|e| RepositoryError::Storage(format!("failed to begin transaction: {e}")))?;

            sqlx::query(
                "INSERT INTO comments \
                 (id, user_name, email, home_page, text, created_at, parent_comment_id) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(comment.id().into_uuid())
            .bind(comment.user_name())
            .bind(comment.email())
            .bind(comment.home_page())
            .bind(comment.text())
            .bind(comment.created_at())
            .bind(comment.parent_comment_id().map(CommentId::into_uuid))
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Storage(format!("failed to insert comment: {e}")))?;

            if let Some(attachment) = comment.attachment() {
                let size = i64::try_from(attachment.file_size_bytes()).map_err(|_| {
                    RepositoryError::Storage("attachment size exceeds BIGINT range".to_string())
                })?;
                sqlx::query(
                    "INSERT INTO attachments \
                     (id, comment_id, file_name, stored_file_name, content_type, \
                      file_size_bytes, kind) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7)",
                )
                .bind(attachment.id().into_uuid())
                .bind(comment.id().into_uuid())
                .bind(attachment.file_name())
                .bind(attachment.stored_file_name())
                .bind(attachment.content_type())
                .bind(size)
                .bind(attachment.kind().as_str())
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    RepositoryError::Storage(format!("failed to insert attachment: {e}"))
                })?;
            }

            tx.commit()
                .await
                .map_err(|e| RepositoryError::Storage(format!("failed to commit: {e}")))?;

            Ok(())
        })
    }

    fn get_by_id(
        &self,
        id: CommentId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Comment>, RepositoryError>> + Send + '_>> {
        Box::pin(async move {
            let row: Option<CommentRow> = sqlx::query_as(&format!(
                "SELECT {SELECT_COLUMNS} FROM comments c \
                 LEFT JOIN attachments a ON a.comment_id = c.id \
                 WHERE c.id = $1"
            ))
            .bind(id.into_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(format!("failed to fetch comment: {e}")))?;

            row.map(CommentRow::into_comment).transpose()
        })
    }

    fn get_by_id_with_replies(
        &self,
        id: CommentId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Vec<Comment>>, RepositoryError>> + Send + '_>>
    {
        Box::pin(async move {
            // Single recursive query: the node plus every transitive reply.
            let rows: Vec<CommentRow> = sqlx::query_as(&format!(
                "WITH RECURSIVE thread AS ( \
                     SELECT * FROM comments WHERE id = $1 \
                     UNION ALL \
                     SELECT child.* FROM comments child \
                     JOIN thread ON child.parent_comment_id = thread.id \
                 ) \
                 SELECT {} FROM thread c \
                 LEFT JOIN attachments a ON a.comment_id = c.id \
                 ORDER BY c.created_at",
                SELECT_COLUMNS
            ))
            .bind(id.into_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(format!("failed to fetch thread: {e}")))?;

            if rows.is_empty() {
                return Ok(None);
            }

            let comments = rows
                .into_iter()
                .map(CommentRow::into_comment)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Some(comments))
        })
    }

    fn get_top_level_paged(
        &self,
        request: PageRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(Vec<Comment>, u64), RepositoryError>> + Send + '_>>
    {
        Box::pin(async move {
            let (total,): (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM comments WHERE parent_comment_id IS NULL")
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| {
                        RepositoryError::Storage(format!("failed to count comments: {e}"))
                    })?;

            // Sort column and direction come from closed enums, never from
            // user input strings.
            let rows: Vec<CommentRow> = sqlx::query_as(&format!(
                "SELECT {SELECT_COLUMNS} FROM comments c \
                 LEFT JOIN attachments a ON a.comment_id = c.id \
                 WHERE c.parent_comment_id IS NULL \
                 ORDER BY c.{} {} \
                 LIMIT $1 OFFSET $2",
                sort_column(request.sort_field),
                sort_order(request.sort_direction),
            ))
            .bind(i64::from(request.page_size))
            .bind(i64::try_from(request.offset()).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::Storage(format!("failed to fetch page: {e}")))?;

            let comments = rows
                .into_iter()
                .map(CommentRow::into_comment)
                .collect::<Result<Vec<_>, _>>()?;

            Ok((comments, u64::try_from(total).unwrap_or_default()))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn sort_columns_are_whitelisted() {
        assert_eq!(sort_column(SortField::UserName), "user_name");
        assert_eq!(sort_column(SortField::Email), "email");
        assert_eq!(sort_column(SortField::CreatedAt), "created_at");
        assert_eq!(sort_order(SortDirection::Ascending), "ASC");
        assert_eq!(sort_order(SortDirection::Descending), "DESC");
    }

    #[test]
    fn row_without_attachment_maps_to_bare_comment() {
        let row = CommentRow {
            id: Uuid::now_v7(),
            user_name: "alice".to_string(),
            email: "alice@example.com".to_string(),
            home_page: None,
            text: "hello".to_string(),
            created_at: Utc::now(),
            parent_comment_id: None,
            attachment_id: None,
            attachment_file_name: None,
            attachment_stored_file_name: None,
            attachment_content_type: None,
            attachment_file_size_bytes: None,
            attachment_kind: None,
        };

        let comment = row.into_comment().unwrap();
        assert!(comment.attachment().is_none());
        assert!(!comment.has_pending_events());
    }

    #[test]
    fn row_with_attachment_rehydrates_it() {
        let row = CommentRow {
            id: Uuid::now_v7(),
            user_name: "alice".to_string(),
            email: "alice@example.com".to_string(),
            home_page: Some("https://example.com".to_string()),
            text: "hello".to_string(),
            created_at: Utc::now(),
            parent_comment_id: Some(Uuid::now_v7()),
            attachment_id: Some(Uuid::now_v7()),
            attachment_file_name: Some("notes.txt".to_string()),
            attachment_stored_file_name: Some("0-notes.txt".to_string()),
            attachment_content_type: Some("text/plain".to_string()),
            attachment_file_size_bytes: Some(42),
            attachment_kind: Some("text".to_string()),
        };

        let comment = row.into_comment().unwrap();
        let attachment = comment.attachment().unwrap();
        assert_eq!(attachment.kind(), AttachmentKind::Text);
        assert_eq!(attachment.file_size_bytes(), 42);
    }

    #[test]
    fn unknown_attachment_kind_is_a_decode_error() {
        let row = CommentRow {
            id: Uuid::now_v7(),
            user_name: "alice".to_string(),
            email: "alice@example.com".to_string(),
            home_page: None,
            text: "hello".to_string(),
            created_at: Utc::now(),
            parent_comment_id: None,
            attachment_id: Some(Uuid::now_v7()),
            attachment_file_name: Some("blob".to_string()),
            attachment_stored_file_name: Some("blob".to_string()),
            attachment_content_type: Some("application/octet-stream".to_string()),
            attachment_file_size_bytes: Some(1),
            attachment_kind: Some("video".to_string()),
        };

        assert!(matches!(
            row.into_comment(),
            Err(RepositoryError::Decode(_))
        ));
    }
}
