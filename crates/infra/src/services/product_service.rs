use std::collections::BTreeSet;

use tracing::instrument;

use shelf_catalog::{Category, Product, ProductDraft, ProductFilter, ProductInput};
use shelf_core::{CatalogError, CatalogResult, CategoryId, Page, PageRequest, ProductId};

use crate::query_engine::ProductQueryEngine;
use crate::store::{CatalogStore, StoreError};

/// Product CRUD plus search, over an injected store.
///
/// Writes resolve every input category before touching the product, so an
/// unknown category id fails the call with nothing persisted.
#[derive(Debug, Clone)]
pub struct ProductService<S> {
    engine: ProductQueryEngine<S>,
}

impl<S: CatalogStore> ProductService<S> {
    pub fn new(store: S) -> Self {
        Self {
            engine: ProductQueryEngine::new(store),
        }
    }

    fn store(&self) -> &S {
        self.engine.store()
    }

    pub async fn find_by_id(&self, id: ProductId) -> CatalogResult<Product> {
        Ok(self.store().find_product_by_id(id).await?)
    }

    /// Unfiltered paged listing.
    pub async fn find_all_paged(&self, page: &PageRequest) -> CatalogResult<Page<Product>> {
        self.engine.run(&ProductFilter::default(), page).await
    }

    pub async fn search(
        &self,
        name: &str,
        category_ids: &BTreeSet<CategoryId>,
        page: &PageRequest,
    ) -> CatalogResult<Page<Product>> {
        self.engine.search(name, category_ids, page).await
    }

    #[instrument(skip(self, input), fields(name = %input.name), err)]
    pub async fn insert(&self, input: ProductInput) -> CatalogResult<Product> {
        let draft = self.resolve(input).await?;
        Ok(self.store().insert_product(draft).await?)
    }

    /// Overwrite every field and replace the category set.
    ///
    /// A missing product is reported as `NotFound` whatever the input holds.
    #[instrument(skip(self, id, input), fields(product_id = %id), err)]
    pub async fn update(&self, id: ProductId, input: ProductInput) -> CatalogResult<Product> {
        let reference = self.store().product_reference(id);
        let draft = match self.resolve(input).await {
            Err(CatalogError::UnresolvedAssociation(category)) => {
                if !self.store().product_exists(id).await? {
                    return Err(CatalogError::not_found(format!("product not found: {id}")));
                }
                return Err(CatalogError::UnresolvedAssociation(category));
            }
            resolved => resolved?,
        };
        Ok(self.store().save_product(reference, draft).await?)
    }

    /// Delete a product; fails with `Database` while an order line references it.
    #[instrument(skip(self, id), fields(product_id = %id), err)]
    pub async fn delete(&self, id: ProductId) -> CatalogResult<()> {
        if !self.store().product_exists(id).await? {
            return Err(CatalogError::not_found(format!("product not found: {id}")));
        }
        Ok(self.store().delete_product(id).await?)
    }

    async fn resolve(&self, input: ProductInput) -> CatalogResult<ProductDraft> {
        let mut categories: Vec<Category> = Vec::with_capacity(input.category_ids.len());
        for &id in &input.category_ids {
            match self.store().find_category_by_id(id).await {
                Ok(category) => categories.push(category),
                Err(StoreError::NotFound { .. }) => return Err(CatalogError::UnresolvedAssociation(id)),
                Err(other) => return Err(other.into()),
            }
        }
        Ok(ProductDraft::new(input, categories))
    }
}
