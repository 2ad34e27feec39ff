//! Two-phase product search.
//!
//! 1. Ask the store for an ordered page of matching ids plus the distinct match
//!    count. Nothing is materialized beyond identity here.
//! 2. Bulk-fetch exactly those ids with their categories, in any order.
//! 3. Restore the phase-one order with [`reorder_by_ids`].
//!
//! The two phases do not share a snapshot. An id deleted in between is dropped
//! from the page and reported with a warning; `total_matches` keeps the
//! phase-one count.

use std::collections::BTreeSet;

use tracing::{Span, instrument, warn};

use shelf_catalog::{Product, ProductFilter, reorder_by_ids};
use shelf_core::{CatalogResult, CategoryId, Page, PageRequest, ProductId};

use crate::store::CatalogStore;

#[derive(Debug, Clone)]
pub struct ProductQueryEngine<S> {
    store: S,
}

impl<S: CatalogStore> ProductQueryEngine<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Search products by name substring and category set.
    ///
    /// An empty `category_ids` set applies no category filter.
    #[instrument(
        skip(self, category_ids, page),
        fields(
            category_filter = category_ids.len(),
            page_index = page.page_index(),
            page_size = page.page_size(),
            total_matches = tracing::field::Empty,
            returned = tracing::field::Empty
        ),
        err
    )]
    pub async fn search(
        &self,
        name: &str,
        category_ids: &BTreeSet<CategoryId>,
        page: &PageRequest,
    ) -> CatalogResult<Page<Product>> {
        let filter = ProductFilter::new(name, category_ids.iter().copied());
        self.run(&filter, page).await
    }

    /// Run a search for an already-built filter.
    pub async fn run(&self, filter: &ProductFilter, page: &PageRequest) -> CatalogResult<Page<Product>> {
        let (summaries, total_matches) = self.store.find_product_ids_matching(filter, page).await?;
        let order: Vec<ProductId> = summaries.iter().map(|s| s.id).collect();

        let batch = if order.is_empty() {
            Vec::new()
        } else {
            self.store.fetch_products_with_categories(&order).await?
        };

        let merged = reorder_by_ids(&order, batch);
        if !merged.is_complete() {
            warn!(
                missing = ?merged.missing,
                total_matches,
                "products vanished between search phases; returning a shorter page"
            );
        }

        let span = Span::current();
        span.record("total_matches", total_matches);
        span.record("returned", merged.items.len());

        Ok(Page::new(merged.items, page, total_matches))
    }
}
