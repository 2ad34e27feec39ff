use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use shelf_catalog::{Category, Product, ProductDraft, ProductFilter, ProductSummary, UnknownSortField};
use shelf_core::{CatalogError, CategoryId, PageRequest, ProductId};

/// Catalog store operation error.
///
/// These are **storage-level** outcomes. Services translate them into the
/// caller-facing [`CatalogError`] taxonomy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// A constraint rejected the write (e.g. a delete of a still-referenced row).
    #[error("integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("unknown sort field: {0}")]
    UnknownSortField(String),

    /// Connectivity, decoding and every other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn category_not_found(id: CategoryId) -> Self {
        Self::NotFound {
            entity: "category",
            id: id.get(),
        }
    }

    pub fn product_not_found(id: ProductId) -> Self {
        Self::NotFound {
            entity: "product",
            id: id.get(),
        }
    }
}

impl From<UnknownSortField> for StoreError {
    fn from(value: UnknownSortField) -> Self {
        StoreError::UnknownSortField(value.0)
    }
}

impl From<StoreError> for CatalogError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { .. } => CatalogError::NotFound(value.to_string()),
            StoreError::IntegrityViolation(msg) => CatalogError::database(msg),
            StoreError::UnknownSortField(field) => {
                CatalogError::InvalidPageRequest(format!("unknown sort field: {field:?}"))
            }
            StoreError::Backend(msg) => CatalogError::Store(msg),
        }
    }
}

/// Writable handle to a category, obtained without reading it.
///
/// Existence is only checked when the handle is used to save.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CategoryRef(CategoryId);

impl CategoryRef {
    pub fn new(id: CategoryId) -> Self {
        Self(id)
    }

    pub fn id(&self) -> CategoryId {
        self.0
    }
}

/// Writable handle to a product, obtained without reading it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ProductRef(ProductId);

impl ProductRef {
    pub fn new(id: ProductId) -> Self {
        Self(id)
    }

    pub fn id(&self) -> ProductId {
        self.0
    }
}

/// Durable storage of categories, products and their association.
///
/// ## Search contract
///
/// `find_product_ids_matching` is phase one of a product search. It must:
/// - count each matching product exactly once, however many of its categories
///   satisfy the filter
/// - sort and slice on distinct products, never on association rows
/// - reject sort fields outside the product whitelist
///
/// `fetch_products_with_categories` is phase two. It returns fully-populated
/// products for the given ids in no particular order; ids with no live row are
/// simply absent from the result.
///
/// ## Write contract
///
/// Every write is atomic. Saving a product replaces its whole category set.
/// Deletes of rows still referenced elsewhere fail with `IntegrityViolation`
/// and leave the store unchanged.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find_category_by_id(&self, id: CategoryId) -> Result<Category, StoreError>;

    /// Every category, ordered by name then id.
    async fn list_all_categories(&self) -> Result<Vec<Category>, StoreError>;

    /// A page of categories plus the total category count.
    async fn find_categories_page(&self, page: &PageRequest) -> Result<(Vec<Category>, u64), StoreError>;

    async fn insert_category(&self, name: &str) -> Result<Category, StoreError>;

    fn category_reference(&self, id: CategoryId) -> CategoryRef {
        CategoryRef::new(id)
    }

    /// Overwrite the name behind a reference; `NotFound` if the row is gone.
    async fn save_category(&self, reference: CategoryRef, name: &str) -> Result<Category, StoreError>;

    async fn category_exists(&self, id: CategoryId) -> Result<bool, StoreError>;

    async fn delete_category(&self, id: CategoryId) -> Result<(), StoreError>;

    async fn find_product_by_id(&self, id: ProductId) -> Result<Product, StoreError>;

    /// Phase one of a search: ordered page of matching ids plus the distinct match count.
    async fn find_product_ids_matching(
        &self,
        filter: &ProductFilter,
        page: &PageRequest,
    ) -> Result<(Vec<ProductSummary>, u64), StoreError>;

    /// Phase two of a search: fully-populated products, arbitrary order.
    async fn fetch_products_with_categories(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError>;

    async fn insert_product(&self, draft: ProductDraft) -> Result<Product, StoreError>;

    fn product_reference(&self, id: ProductId) -> ProductRef {
        ProductRef::new(id)
    }

    /// Overwrite every field behind a reference and replace its category set.
    async fn save_product(&self, reference: ProductRef, draft: ProductDraft) -> Result<Product, StoreError>;

    async fn product_exists(&self, id: ProductId) -> Result<bool, StoreError>;

    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    async fn find_category_by_id(&self, id: CategoryId) -> Result<Category, StoreError> {
        (**self).find_category_by_id(id).await
    }

    async fn list_all_categories(&self) -> Result<Vec<Category>, StoreError> {
        (**self).list_all_categories().await
    }

    async fn find_categories_page(&self, page: &PageRequest) -> Result<(Vec<Category>, u64), StoreError> {
        (**self).find_categories_page(page).await
    }

    async fn insert_category(&self, name: &str) -> Result<Category, StoreError> {
        (**self).insert_category(name).await
    }

    fn category_reference(&self, id: CategoryId) -> CategoryRef {
        (**self).category_reference(id)
    }

    async fn save_category(&self, reference: CategoryRef, name: &str) -> Result<Category, StoreError> {
        (**self).save_category(reference, name).await
    }

    async fn category_exists(&self, id: CategoryId) -> Result<bool, StoreError> {
        (**self).category_exists(id).await
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), StoreError> {
        (**self).delete_category(id).await
    }

    async fn find_product_by_id(&self, id: ProductId) -> Result<Product, StoreError> {
        (**self).find_product_by_id(id).await
    }

    async fn find_product_ids_matching(
        &self,
        filter: &ProductFilter,
        page: &PageRequest,
    ) -> Result<(Vec<ProductSummary>, u64), StoreError> {
        (**self).find_product_ids_matching(filter, page).await
    }

    async fn fetch_products_with_categories(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        (**self).fetch_products_with_categories(ids).await
    }

    async fn insert_product(&self, draft: ProductDraft) -> Result<Product, StoreError> {
        (**self).insert_product(draft).await
    }

    fn product_reference(&self, id: ProductId) -> ProductRef {
        (**self).product_reference(id)
    }

    async fn save_product(&self, reference: ProductRef, draft: ProductDraft) -> Result<Product, StoreError> {
        (**self).save_product(reference, draft).await
    }

    async fn product_exists(&self, id: ProductId) -> Result<bool, StoreError> {
        (**self).product_exists(id).await
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        (**self).delete_product(id).await
    }
}
