//! In-memory comment repository.

use comments_core::comment::{Comment, CommentId};
use comments_core::paging::{PageRequest, SortDirection, SortField};
use comments_core::repository::{CommentRepository, RepositoryError};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::RwLock;

/// `HashMap`-backed repository double.
///
/// Stored aggregates never carry pending domain events, mirroring real
/// storage: rows are facts, events live only on the in-flight aggregate.
#[derive(Debug, Default)]
pub struct InMemoryCommentRepository {
    comments: RwLock<HashMap<CommentId, Comment>>,
}

impl InMemoryCommentRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a comment directly, bypassing the write path.
    pub fn seed(&self, comment: Comment) {
        let mut stored = comment;
        let _ = stored.take_events();
        self.comments.write().unwrap().insert(stored.id(), stored);
    }

    /// Synchronous lookup for assertions.
    #[must_use]
    pub fn get(&self, id: CommentId) -> Option<Comment> {
        self.comments.read().unwrap().get(&id).cloned()
    }

    /// Number of stored comments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.comments.read().unwrap().len()
    }

    /// Whether the repository is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.comments.read().unwrap().is_empty()
    }
}

impl CommentRepository for InMemoryCommentRepository {
    fn insert(
        &self,
        comment: &Comment,
    ) -> Pin<Box<dyn Future<Output = Result<(), RepositoryError>> + Send + '_>> {
        let mut stored = comment.clone();
        // Persisted rows never carry domain events.
        let _ = stored.take_events();
        Box::pin(async move {
            self.comments.write().unwrap().insert(stored.id(), stored);
            Ok(())
        })
    }

    fn get_by_id(
        &self,
        id: CommentId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Comment>, RepositoryError>> + Send + '_>> {
        Box::pin(async move { Ok(self.comments.read().unwrap().get(&id).cloned()) })
    }

    fn get_by_id_with_replies(
        &self,
        id: CommentId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Vec<Comment>>, RepositoryError>> + Send + '_>>
    {
        Box::pin(async move {
            let comments = self.comments.read().unwrap();
            if !comments.contains_key(&id) {
                return Ok(None);
            }

            let mut included: HashSet<CommentId> = HashSet::new();
            included.insert(id);
            let mut rows = vec![comments[&id].clone()];

            // Fixpoint sweep: keep pulling in rows whose parent is already
            // included until nothing new appears.
            loop {
                let mut grew = false;
                for comment in comments.values() {
                    if let Some(parent_id) = comment.parent_comment_id() {
                        if included.contains(&parent_id) && !included.contains(&comment.id()) {
                            included.insert(comment.id());
                            rows.push(comment.clone());
                            grew = true;
                        }
                    }
                }
                if !grew {
                    break;
                }
            }

            rows.sort_by_key(Comment::created_at);
            Ok(Some(rows))
        })
    }

    fn get_top_level_paged(
        &self,
        request: PageRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(Vec<Comment>, u64), RepositoryError>> + Send + '_>>
    {
        Box::pin(async move {
            let comments = self.comments.read().unwrap();
            let mut top_level: Vec<Comment> = comments
                .values()
                .filter(|comment| comment.parent_comment_id().is_none())
                .cloned()
                .collect();

            top_level.sort_by(|a, b| {
                let ordering = match request.sort_field {
                    SortField::UserName => a.user_name().cmp(b.user_name()),
                    SortField::Email => a.email().cmp(b.email()),
                    SortField::CreatedAt => a.created_at().cmp(&b.created_at()),
                };
                match request.sort_direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });

            let total = top_level.len() as u64;
            let start = usize::try_from(request.offset())
                .unwrap_or(usize::MAX)
                .min(top_level.len());
            let end = start
                .saturating_add(request.page_size as usize)
                .min(top_level.len());

            Ok((top_level[start..end].to_vec(), total))
        })
    }
}
