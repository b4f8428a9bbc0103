//! In-memory search index with a failure toggle.

use comments_core::comment::CommentId;
use comments_core::search::{CommentDocument, SearchError, SearchHits, SearchIndex};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// Upsert-map search index double.
///
/// Matching is case-insensitive substring over author name, email and text;
/// results come back newest first. [`Self::set_failing`] turns every
/// operation into an error for fault-injection scenarios.
#[derive(Debug, Default)]
pub struct InMemorySearchIndex {
    documents: RwLock<BTreeMap<CommentId, CommentDocument>>,
    failing: AtomicBool,
}

impl InMemorySearchIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle failure mode: while `true`, `index` and `search` return
    /// errors without touching the documents.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Seeds a document directly.
    pub fn seed(&self, document: CommentDocument) {
        self.documents
            .write()
            .unwrap()
            .insert(document.id, document);
    }

    /// Number of stored documents.
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.documents.read().unwrap().len()
    }

    /// Whether a document exists for the comment.
    #[must_use]
    pub fn contains(&self, id: CommentId) -> bool {
        self.documents.read().unwrap().contains_key(&id)
    }

    fn check_failing(&self) -> Result<(), SearchError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(SearchError::Index("injected search index failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl SearchIndex for InMemorySearchIndex {
    fn index(
        &self,
        document: &CommentDocument,
    ) -> Pin<Box<dyn Future<Output = Result<(), SearchError>> + Send + '_>> {
        let document = document.clone();
        Box::pin(async move {
            self.check_failing()?;
            self.documents
                .write()
                .unwrap()
                .insert(document.id, document);
            Ok(())
        })
    }

    fn search(
        &self,
        query: &str,
        page: u32,
        page_size: u32,
    ) -> Pin<Box<dyn Future<Output = Result<SearchHits, SearchError>> + Send + '_>> {
        let query = query.to_lowercase();
        Box::pin(async move {
            self.check_failing()?;
            let documents = self.documents.read().unwrap();

            let mut matches: Vec<&CommentDocument> = documents
                .values()
                .filter(|doc| {
                    doc.user_name.to_lowercase().contains(&query)
                        || doc.email.to_lowercase().contains(&query)
                        || doc.text.to_lowercase().contains(&query)
                })
                .collect();
            matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));

            let total_count = matches.len() as u64;
            let start = (page.saturating_sub(1) as usize)
                .saturating_mul(page_size as usize)
                .min(matches.len());
            let end = start
                .saturating_add(page_size as usize)
                .min(matches.len());

            Ok(SearchHits {
                ids: matches[start..end].iter().map(|doc| doc.id).collect(),
                total_count,
            })
        })
    }
}
