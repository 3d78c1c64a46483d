//! The collaborator's pagination envelope and listing queries.
//!
//! The collaborator has shipped both `snake_case` and `camelCase` builds
//! of the same envelope, so every field accepts both spellings. Tolerance
//! is declared here once; nothing downstream looks at raw keys.

use frontdesk_core::PageCursor;
use serde::{Deserialize, Serialize};

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Records on this page, in collaborator order.
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    /// Total records across all pages.
    #[serde(alias = "totalElements")]
    pub total_elements: u64,
    /// Total pages at the requested page size.
    #[serde(alias = "totalPages")]
    pub total_pages: u32,
    /// Zero-based index of this page, when the collaborator reports it.
    #[serde(default, alias = "number")]
    pub page: Option<u32>,
}

impl<T> Page<T> {
    /// Number of records on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Whether this page carries no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Last page index implied by `total_pages`, zero for empty listings.
    #[must_use]
    pub const fn last_page(&self) -> u32 {
        self.total_pages.saturating_sub(1)
    }
}

/// Sort direction for a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

impl SortDirection {
    /// Wire token the collaborator's sort parameter expects.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

/// Requested ordering of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    /// Field to order by, in the collaborator's naming.
    pub field: String,
    /// Direction to order in.
    pub direction: SortDirection,
}

impl SortSpec {
    /// Sort by a field.
    pub fn by(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// `field,direction` token for the request query string.
    #[must_use]
    pub fn as_param(&self) -> String {
        format!("{},{}", self.field, self.direction.as_str())
    }
}

/// Paging and ordering of one listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    /// Zero-based page index.
    pub page: u32,
    /// Records per page.
    pub size: u32,
    /// Requested ordering, when any.
    pub sort: Option<SortSpec>,
}

impl PageQuery {
    /// A query positioned at a view's cursor.
    #[must_use]
    pub const fn at(cursor: PageCursor) -> Self {
        Self {
            page: cursor.page,
            size: cursor.size,
            sort: None,
        }
    }

    /// Replaces the ordering.
    #[must_use]
    pub fn sorted_by(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            page: 0,
            size: 20,
            sort: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_camel_case_envelope() {
        let json = r#"{
            "content": [1, 2, 3],
            "totalElements": 41,
            "totalPages": 14,
            "number": 2
        }"#;
        let page: Page<u32> = serde_json::from_str(json).unwrap();
        assert_eq!(page.content, vec![1, 2, 3]);
        assert_eq!(page.total_elements, 41);
        assert_eq!(page.total_pages, 14);
        assert_eq!(page.page, Some(2));
    }

    #[test]
    fn parses_the_snake_case_envelope() {
        let json = r#"{
            "content": [],
            "total_elements": 0,
            "total_pages": 0,
            "page": 0
        }"#;
        let page: Page<u32> = serde_json::from_str(json).unwrap();
        assert!(page.is_empty());
        assert_eq!(page.page, Some(0));
        assert_eq!(page.last_page(), 0);
    }

    #[test]
    fn tolerates_a_missing_page_index() {
        let json = r#"{"content": [7], "totalElements": 1, "totalPages": 1}"#;
        let page: Page<u32> = serde_json::from_str(json).unwrap();
        assert_eq!(page.page, None);
        assert_eq!(page.len(), 1);
    }

    #[test]
    fn sort_spec_renders_the_spring_style_token() {
        let sort = SortSpec::by("scheduledAt", SortDirection::Descending);
        assert_eq!(sort.as_param(), "scheduledAt,desc");
    }

    #[test]
    fn query_positions_at_a_cursor() {
        let query = PageQuery::at(PageCursor { page: 3, size: 25 });
        assert_eq!(query.page, 3);
        assert_eq!(query.size, 25);
        assert!(query.sort.is_none());
    }
}
