//! Pagination and sorting primitives.
//!
//! A `PageRequest` names a zero-based page, a page size and an ordered list of
//! sort keys. Sort keys are plain field names here; each store resolves them
//! against its own whitelist and rejects names it does not know.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn is_ascending(self) -> bool {
        self == Direction::Asc
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl FromStr for Direction {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            other => Err(CatalogError::invalid_page_request(format!(
                "unknown sort direction: {other:?}"
            ))),
        }
    }
}

/// One sort key: a field name and a direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortOrder {
    pub field: String,
    pub direction: Direction,
}

impl SortOrder {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }
}

/// Parses the `field[,asc|desc]` form used by query strings.
impl FromStr for SortOrder {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(2, ',');
        let field = parts.next().unwrap_or_default().trim();
        if field.is_empty() {
            return Err(CatalogError::invalid_page_request("sort field cannot be empty"));
        }
        let direction = match parts.next() {
            Some(d) => d.parse()?,
            None => Direction::Asc,
        };
        Ok(Self {
            field: field.to_string(),
            direction,
        })
    }
}

/// Requested page: zero-based index, size and sort keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    page_index: u32,
    page_size: u32,
    sort: Vec<SortOrder>,
}

impl PageRequest {
    pub fn new(page_index: u32, page_size: u32) -> CatalogResult<Self> {
        if page_size == 0 {
            return Err(CatalogError::invalid_page_request("page size must be greater than zero"));
        }
        Ok(Self {
            page_index,
            page_size,
            sort: Vec::new(),
        })
    }

    /// Append a sort key (earlier keys take precedence).
    pub fn with_sort(mut self, order: SortOrder) -> Self {
        self.sort.push(order);
        self
    }

    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn sort(&self) -> &[SortOrder] {
        &self.sort
    }

    /// Number of rows to skip before this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page_index) * u64::from(self.page_size)
    }
}

/// A page of results plus the total count of distinct matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_index: u32,
    pub page_size: u32,
    /// Distinct matching root entities across all pages.
    pub total_matches: u64,
    pub sort: Vec<SortOrder>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: &PageRequest, total_matches: u64) -> Self {
        Self {
            items,
            page_index: request.page_index,
            page_size: request.page_size,
            total_matches,
            sort: request.sort.clone(),
        }
    }

    /// Zero when `page_size` is zero, which only a hand-built or
    /// deserialized page can carry.
    pub fn total_pages(&self) -> u64 {
        match self.page_size {
            0 => 0,
            size => self.total_matches.div_ceil(u64::from(size)),
        }
    }

    pub fn is_first(&self) -> bool {
        self.page_index == 0
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page_index) + 1 < self.total_pages()
    }

    pub fn is_last(&self) -> bool {
        !self.has_next()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page_index: self.page_index,
            page_size: self.page_size,
            total_matches: self.total_matches,
            sort: self.sort,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_page_size_is_rejected() {
        let err = PageRequest::new(0, 0).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidPageRequest(_)));
    }

    #[test]
    fn offset_uses_index_times_size() {
        let req = PageRequest::new(3, 12).unwrap();
        assert_eq!(req.offset(), 36);
    }

    #[test]
    fn sort_order_parses_field_and_direction() {
        assert_eq!("name,asc".parse::<SortOrder>().unwrap(), SortOrder::asc("name"));
        assert_eq!("price, DESC".parse::<SortOrder>().unwrap(), SortOrder::desc("price"));
        assert_eq!("id".parse::<SortOrder>().unwrap(), SortOrder::asc("id"));
    }

    #[test]
    fn sort_order_rejects_bad_direction_and_empty_field() {
        assert!("name,sideways".parse::<SortOrder>().is_err());
        assert!(",asc".parse::<SortOrder>().is_err());
    }

    #[test]
    fn page_navigation_flags() {
        let req = PageRequest::new(1, 10).unwrap();
        let page = Page::new(vec![0u8; 10], &req, 25);
        assert_eq!(page.total_pages(), 3);
        assert!(!page.is_first());
        assert!(page.has_next());

        let last = Page::new(vec![0u8; 5], &PageRequest::new(2, 10).unwrap(), 25);
        assert!(last.is_last());

        let empty = Page::<u8>::new(vec![], &PageRequest::new(0, 10).unwrap(), 0);
        assert_eq!(empty.total_pages(), 0);
        assert!(empty.is_last());
    }

    #[test]
    fn map_preserves_metadata() {
        let req = PageRequest::new(0, 2).unwrap().with_sort(SortOrder::asc("name"));
        let page = Page::new(vec![1, 2], &req, 7).map(|n| n * 10);
        assert_eq!(page.items, vec![10, 20]);
        assert_eq!(page.total_matches, 7);
        assert_eq!(page.sort, vec![SortOrder::asc("name")]);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: the page count covers every match exactly once.
            #[test]
            fn total_pages_covers_all_matches(size in 1u32..200, total in 0u64..10_000) {
                let page = Page::<()>::new(vec![], &PageRequest::new(0, size).unwrap(), total);
                let pages = page.total_pages();
                prop_assert!(pages * u64::from(size) >= total);
                if pages > 0 {
                    prop_assert!((pages - 1) * u64::from(size) < total);
                }
            }
        }
    }

    #[test]
    fn deserialized_page_with_zero_size_has_no_pages() {
        let page: Page<u32> = serde_json::from_str(
            r#"{"items":[],"page_index":0,"page_size":0,"total_matches":5,"sort":[]}"#,
        )
        .unwrap();

        assert_eq!(page.total_pages(), 0);
        assert!(page.is_last());
        assert!(!page.has_next());
    }
}
