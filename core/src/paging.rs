//! Paging, sorting, and the listing cache-key scheme.
//!
//! The cache key is part of the external contract: any existing cached state
//! keyed by another process must remain addressable, so the rendering in
//! [`PageRequest::cache_key`] is reproduced literally: fixed prefix, page,
//! size, sort field and direction, colon-delimited.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Prefix shared by every cached listing page.
///
/// The operator flush removes everything under this prefix; the write path
/// deliberately never does.
pub const LISTING_CACHE_PREFIX: &str = "comments:page:";

/// Column the top-level listing is sorted by.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortField {
    /// Sort by author name.
    UserName,
    /// Sort by author email.
    Email,
    /// Sort by creation timestamp.
    CreatedAt,
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserName => f.write_str("UserName"),
            Self::Email => f.write_str("Email"),
            Self::CreatedAt => f.write_str("CreatedAt"),
        }
    }
}

/// Direction the top-level listing is sorted in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => f.write_str("Ascending"),
            Self::Descending => f.write_str("Descending"),
        }
    }
}

/// Parameters of one top-level listing page.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u32,
    /// Number of items per page.
    pub page_size: u32,
    /// Sort column.
    pub sort_field: SortField,
    /// Sort direction.
    pub sort_direction: SortDirection,
}

impl PageRequest {
    /// Creates a page request.
    #[must_use]
    pub const fn new(
        page: u32,
        page_size: u32,
        sort_field: SortField,
        sort_direction: SortDirection,
    ) -> Self {
        Self {
            page,
            page_size,
            sort_field,
            sort_direction,
        }
    }

    /// Deterministic cache key for this page.
    ///
    /// # Examples
    ///
    /// ```
    /// use comments_core::paging::{PageRequest, SortDirection, SortField};
    ///
    /// let request = PageRequest::new(1, 25, SortField::CreatedAt, SortDirection::Descending);
    /// assert_eq!(
    ///     request.cache_key(),
    ///     "comments:page:1:size:25:sort:CreatedAt:Descending"
    /// );
    /// ```
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!(
            "comments:page:{}:size:{}:sort:{}:{}",
            self.page, self.page_size, self.sort_field, self.sort_direction
        )
    }

    /// Zero-based row offset of this page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page.saturating_sub(1) as u64) * self.page_size as u64
    }
}

impl Default for PageRequest {
    /// First page of 25, newest first, the listing endpoint's defaults.
    fn default() -> Self {
        Self::new(1, 25, SortField::CreatedAt, SortDirection::Descending)
    }
}

/// One page of results plus the total count.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Total number of items across all pages.
    pub total_count: u64,
    /// 1-based page number.
    pub page: u32,
    /// Page size the listing was computed with.
    pub page_size: u32,
}

impl<T> PagedResult<T> {
    /// Creates a result page.
    #[must_use]
    pub const fn new(items: Vec<T>, total_count: u64, page: u32, page_size: u32) -> Self {
        Self {
            items,
            total_count,
            page,
            page_size,
        }
    }

    /// Whether another page follows this one.
    #[must_use]
    pub const fn has_next_page(&self) -> bool {
        (self.page as u64) * (self.page_size as u64) < self.total_count
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_rendered_literally() {
        let request = PageRequest::new(3, 10, SortField::UserName, SortDirection::Ascending);
        assert_eq!(
            request.cache_key(),
            "comments:page:3:size:10:sort:UserName:Ascending"
        );
        assert!(request.cache_key().starts_with(LISTING_CACHE_PREFIX));
    }

    #[test]
    fn default_request_matches_listing_defaults() {
        let request = PageRequest::default();
        assert_eq!(
            request.cache_key(),
            "comments:page:1:size:25:sort:CreatedAt:Descending"
        );
    }

    #[test]
    fn offset_is_zero_based() {
        assert_eq!(PageRequest::new(1, 25, SortField::CreatedAt, SortDirection::Descending).offset(), 0);
        assert_eq!(PageRequest::new(3, 25, SortField::CreatedAt, SortDirection::Descending).offset(), 50);
        // Page 0 is treated like page 1 rather than underflowing.
        assert_eq!(PageRequest::new(0, 25, SortField::CreatedAt, SortDirection::Descending).offset(), 0);
    }

    #[test]
    fn has_next_page_boundaries() {
        assert!(PagedResult::<u32>::new(vec![], 26, 1, 25).has_next_page());
        assert!(!PagedResult::<u32>::new(vec![], 25, 1, 25).has_next_page());
        assert!(!PagedResult::<u32>::new(vec![], 0, 1, 25).has_next_page());
    }

    #[test]
    fn paged_result_serializes_camel_case() {
        let page = PagedResult::new(vec![1u32, 2], 2, 1, 25);
        let json = serde_json::to_value(&page).unwrap();
        assert!(json.get("totalCount").is_some());
        assert!(json.get("pageSize").is_some());
    }
}
