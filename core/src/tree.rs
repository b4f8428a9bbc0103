//! Pure projection from flat parent/child rows to nested reply trees.
//!
//! The repository fetches a node plus its full descendant set however it
//! likes (a single recursive query here); this module only shapes the rows.
//! No I/O, no side effects, total over any acyclic input. Cyclic input is
//! unreachable given the creation invariant (a comment can only reference a
//! parent that already existed) and is a programming error upstream, not a
//! handled case.

use crate::comment::{Comment, CommentId};
use crate::dto::CommentDto;
use std::collections::HashMap;

/// Assembles the nested reply tree rooted at `root_id`.
///
/// Every node's `replies` holds its direct children ordered by creation time
/// ascending (oldest reply first), recursively at every depth and
/// independent of whatever order the top-level listing uses. A node with no
/// children gets an empty (never absent) list. Depth is unbounded.
///
/// Returns `None` when `root_id` is not among the rows. Rows whose parent is
/// neither the root nor another row in the set are unreachable and dropped.
#[must_use]
pub fn assemble_thread(root_id: CommentId, comments: Vec<Comment>) -> Option<CommentDto> {
    let mut by_parent: HashMap<CommentId, Vec<Comment>> = HashMap::new();
    let mut root = None;

    for comment in comments {
        if comment.id() == root_id {
            root = Some(comment);
        } else if let Some(parent_id) = comment.parent_comment_id() {
            by_parent.entry(parent_id).or_default().push(comment);
        }
    }

    root.map(|root| build_node(root, &mut by_parent))
}

fn build_node(comment: Comment, by_parent: &mut HashMap<CommentId, Vec<Comment>>) -> CommentDto {
    let mut children = by_parent.remove(&comment.id()).unwrap_or_default();
    children.sort_by_key(Comment::created_at);

    let mut dto = CommentDto::from_comment(&comment);
    dto.replies = children
        .into_iter()
        .map(|child| build_node(child, by_parent))
        .collect();
    dto
}
