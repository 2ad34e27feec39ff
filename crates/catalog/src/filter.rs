//! Product search criteria.

use std::collections::BTreeSet;

use shelf_core::{CatalogResult, CategoryId};

/// Search criteria for products.
///
/// An empty `name` matches every product; an empty `category_ids` set means
/// "no category filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub name: String,
    pub category_ids: BTreeSet<CategoryId>,
}

impl ProductFilter {
    pub fn new(name: impl Into<String>, category_ids: impl IntoIterator<Item = CategoryId>) -> Self {
        Self {
            name: name.into(),
            category_ids: category_ids.into_iter().collect(),
        }
    }

    pub fn has_category_filter(&self) -> bool {
        !self.category_ids.is_empty()
    }

    /// Case-insensitive substring match on a product name.
    pub fn matches_name(&self, candidate: &str) -> bool {
        self.name.is_empty() || candidate.to_lowercase().contains(&self.name.to_lowercase())
    }

    /// True when any of `product_categories` is in the filter (or there is no filter).
    pub fn matches_categories(&self, mut product_categories: impl Iterator<Item = CategoryId>) -> bool {
        !self.has_category_filter() || product_categories.any(|id| self.category_ids.contains(&id))
    }
}

/// Parse a comma-separated category id list such as `"1, 3,3"`.
///
/// Blank input (or blank segments) contribute nothing; duplicates collapse.
pub fn parse_category_ids(raw: &str) -> CatalogResult<BTreeSet<CategoryId>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<CategoryId>)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_core::CatalogError;

    #[test]
    fn blank_category_list_means_no_filter() {
        assert!(parse_category_ids("").unwrap().is_empty());
        assert!(parse_category_ids("  ").unwrap().is_empty());
    }

    #[test]
    fn category_list_dedups() {
        let ids = parse_category_ids("1, 3,3").unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![CategoryId::new(1), CategoryId::new(3)]);
    }

    #[test]
    fn category_list_rejects_garbage() {
        let err = parse_category_ids("1,x").unwrap_err();
        assert!(matches!(err, CatalogError::InvalidId(_)));
    }

    #[test]
    fn name_match_is_case_insensitive_substring() {
        let filter = ProductFilter::new("gamer", []);
        assert!(filter.matches_name("PC Gamer Alfa"));
        assert!(!filter.matches_name("Macbook Pro"));
        assert!(ProductFilter::default().matches_name("anything"));
    }

    #[test]
    fn category_match_needs_one_overlap() {
        let filter = ProductFilter::new("", [CategoryId::new(2)]);
        assert!(filter.matches_categories([CategoryId::new(1), CategoryId::new(2)].into_iter()));
        assert!(!filter.matches_categories([CategoryId::new(3)].into_iter()));
        assert!(!filter.matches_categories(std::iter::empty()));
        assert!(ProductFilter::default().matches_categories(std::iter::empty()));
    }
}
