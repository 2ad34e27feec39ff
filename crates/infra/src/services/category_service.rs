use tracing::instrument;

use shelf_catalog::Category;
use shelf_core::{CatalogError, CatalogResult, CategoryId, Page, PageRequest};

use crate::store::CatalogStore;

/// Category CRUD over an injected store.
#[derive(Debug, Clone)]
pub struct CategoryService<S> {
    store: S,
}

impl<S: CatalogStore> CategoryService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Every category, ordered by name then id.
    pub async fn find_all(&self) -> CatalogResult<Vec<Category>> {
        Ok(self.store.list_all_categories().await?)
    }

    pub async fn find_all_paged(&self, page: &PageRequest) -> CatalogResult<Page<Category>> {
        let (items, total) = self.store.find_categories_page(page).await?;
        Ok(Page::new(items, page, total))
    }

    pub async fn find_by_id(&self, id: CategoryId) -> CatalogResult<Category> {
        Ok(self.store.find_category_by_id(id).await?)
    }

    #[instrument(skip(self), err)]
    pub async fn insert(&self, name: &str) -> CatalogResult<Category> {
        Ok(self.store.insert_category(name).await?)
    }

    /// Rename a category. Absence surfaces when the write is attempted.
    #[instrument(skip(self, id), fields(category_id = %id), err)]
    pub async fn update(&self, id: CategoryId, name: &str) -> CatalogResult<Category> {
        let reference = self.store.category_reference(id);
        Ok(self.store.save_category(reference, name).await?)
    }

    /// Delete a category; fails with `Database` while a product still uses it.
    #[instrument(skip(self, id), fields(category_id = %id), err)]
    pub async fn delete(&self, id: CategoryId) -> CatalogResult<()> {
        if !self.store.category_exists(id).await? {
            return Err(CatalogError::not_found(format!("category not found: {id}")));
        }
        Ok(self.store.delete_category(id).await?)
    }
}
