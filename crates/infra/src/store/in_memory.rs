use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use shelf_catalog::sort::{self, CategorySortField, ProductSortField};
use shelf_catalog::{Category, Product, ProductDraft, ProductFilter, ProductSummary};
use shelf_core::{CategoryId, PageRequest, ProductId};

use super::r#trait::{CatalogStore, CategoryRef, ProductRef, StoreError};

#[derive(Debug, Default)]
struct CatalogState {
    categories: BTreeMap<CategoryId, Category>,
    /// Product rows; their category sets live in `links`.
    products: BTreeMap<ProductId, Product>,
    links: BTreeSet<(ProductId, CategoryId)>,
    /// Order lines owned outside the catalog, counted per product.
    order_references: BTreeMap<ProductId, usize>,
    last_category_id: i64,
    last_product_id: i64,
}

impl CatalogState {
    fn category_ids_of(&self, id: ProductId) -> impl Iterator<Item = CategoryId> + '_ {
        self.links
            .range((id, CategoryId::new(i64::MIN))..=(id, CategoryId::new(i64::MAX)))
            .map(|(_, c)| *c)
    }

    fn hydrate(&self, row: &Product) -> Product {
        let mut product = row.clone();
        product.replace_categories(
            self.category_ids_of(row.id)
                .filter_map(|c| self.categories.get(&c).cloned()),
        );
        product
    }

    fn ensure_categories_exist(&self, draft: &ProductDraft) -> Result<(), StoreError> {
        match draft.category_ids().into_iter().find(|c| !self.categories.contains_key(c)) {
            Some(missing) => Err(StoreError::IntegrityViolation(format!(
                "product references missing category {missing}"
            ))),
            None => Ok(()),
        }
    }

    /// Write the product row and rebuild its association rows (clear, then repopulate).
    fn write_product(&mut self, id: ProductId, draft: ProductDraft) -> Product {
        let category_ids = draft.category_ids();
        let mut row = Product::from_draft(id, draft);
        row.replace_categories(Vec::new());
        self.products.insert(id, row);

        self.links.retain(|(p, _)| *p != id);
        self.links.extend(category_ids.into_iter().map(|c| (id, c)));

        let row = &self.products[&id];
        self.hydrate(row)
    }
}

/// In-memory catalog store.
///
/// Intended for tests/dev. Every operation runs under one lock, so each write
/// is validated completely before any state changes.
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    state: RwLock<CatalogState>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an order line pointing at `id`; such products cannot be deleted.
    pub fn add_order_reference(&self, id: ProductId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if !state.products.contains_key(&id) {
            return Err(StoreError::product_not_found(id));
        }
        *state.order_references.entry(id).or_default() += 1;
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, CatalogState>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, CatalogState>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn find_category_by_id(&self, id: CategoryId) -> Result<Category, StoreError> {
        let state = self.read()?;
        state
            .categories
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::category_not_found(id))
    }

    async fn list_all_categories(&self) -> Result<Vec<Category>, StoreError> {
        let state = self.read()?;
        let mut all: Vec<Category> = state.categories.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn find_categories_page(&self, page: &PageRequest) -> Result<(Vec<Category>, u64), StoreError> {
        let keys = sort::resolve::<CategorySortField>(page.sort())?;
        let state = self.read()?;

        let mut all: Vec<&Category> = state.categories.values().collect();
        all.sort_by(|a, b| sort::compare_by(&keys, *a, *b, |f, x, y| f.compare(x, y)));

        let total = all.len() as u64;
        let items = all
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size() as usize)
            .cloned()
            .collect();
        Ok((items, total))
    }

    async fn insert_category(&self, name: &str) -> Result<Category, StoreError> {
        let mut state = self.write()?;
        state.last_category_id += 1;
        let category = Category::new(CategoryId::new(state.last_category_id), name);
        state.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn save_category(&self, reference: CategoryRef, name: &str) -> Result<Category, StoreError> {
        let mut state = self.write()?;
        let category = state
            .categories
            .get_mut(&reference.id())
            .ok_or_else(|| StoreError::category_not_found(reference.id()))?;
        category.name = name.to_string();
        Ok(category.clone())
    }

    async fn category_exists(&self, id: CategoryId) -> Result<bool, StoreError> {
        Ok(self.read()?.categories.contains_key(&id))
    }

    async fn delete_category(&self, id: CategoryId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if !state.categories.contains_key(&id) {
            return Err(StoreError::category_not_found(id));
        }
        if let Some((product, _)) = state.links.iter().find(|(_, c)| *c == id) {
            return Err(StoreError::IntegrityViolation(format!(
                "category {id} is still referenced by product {product}"
            )));
        }
        state.categories.remove(&id);
        Ok(())
    }

    async fn find_product_by_id(&self, id: ProductId) -> Result<Product, StoreError> {
        let state = self.read()?;
        let row = state
            .products
            .get(&id)
            .ok_or_else(|| StoreError::product_not_found(id))?;
        Ok(state.hydrate(row))
    }

    async fn find_product_ids_matching(
        &self,
        filter: &ProductFilter,
        page: &PageRequest,
    ) -> Result<(Vec<ProductSummary>, u64), StoreError> {
        let keys = sort::resolve::<ProductSortField>(page.sort())?;
        let state = self.read()?;

        // One candidate per product row: association rows only feed the predicate.
        let mut matching: Vec<&Product> = state
            .products
            .values()
            .filter(|p| filter.matches_name(&p.name))
            .filter(|p| filter.matches_categories(state.category_ids_of(p.id)))
            .collect();
        matching.sort_by(|a, b| sort::compare_by(&keys, *a, *b, |f, x, y| f.compare(x, y)));

        let total = matching.len() as u64;
        let ids = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size() as usize)
            .map(|p| ProductSummary::new(p.id))
            .collect();
        Ok((ids, total))
    }

    async fn fetch_products_with_categories(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        let state = self.read()?;
        // Arbitrary order; the query engine restores it.
        let fetched: HashMap<ProductId, Product> = ids
            .iter()
            .filter_map(|id| state.products.get(id))
            .map(|row| (row.id, state.hydrate(row)))
            .collect();
        Ok(fetched.into_values().collect())
    }

    async fn insert_product(&self, draft: ProductDraft) -> Result<Product, StoreError> {
        let mut state = self.write()?;
        state.ensure_categories_exist(&draft)?;
        state.last_product_id += 1;
        let id = ProductId::new(state.last_product_id);
        Ok(state.write_product(id, draft))
    }

    async fn save_product(&self, reference: ProductRef, draft: ProductDraft) -> Result<Product, StoreError> {
        let mut state = self.write()?;
        if !state.products.contains_key(&reference.id()) {
            return Err(StoreError::product_not_found(reference.id()));
        }
        state.ensure_categories_exist(&draft)?;
        Ok(state.write_product(reference.id(), draft))
    }

    async fn product_exists(&self, id: ProductId) -> Result<bool, StoreError> {
        Ok(self.read()?.products.contains_key(&id))
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if !state.products.contains_key(&id) {
            return Err(StoreError::product_not_found(id));
        }
        if state.order_references.get(&id).copied().unwrap_or(0) > 0 {
            return Err(StoreError::IntegrityViolation(format!(
                "product {id} is still referenced by an order item"
            )));
        }
        state.products.remove(&id);
        state.links.retain(|(p, _)| *p != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use shelf_catalog::ProductInput;
    use shelf_core::SortOrder;

    fn draft(name: &str, categories: Vec<Category>) -> ProductDraft {
        ProductDraft::new(
            ProductInput {
                name: name.to_string(),
                description: format!("{name} description"),
                price: Decimal::new(1000, 2),
                image_url: "https://img.com/img.png".to_string(),
                release_instant: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
                category_ids: categories.iter().map(|c| c.id).collect(),
            },
            categories,
        )
    }

    #[tokio::test]
    async fn ids_are_assigned_sequentially() {
        let store = InMemoryCatalogStore::new();
        let a = store.insert_category("Books").await.unwrap();
        let b = store.insert_category("Electronics").await.unwrap();
        assert_eq!(a.id, CategoryId::new(1));
        assert_eq!(b.id, CategoryId::new(2));

        let p = store.insert_product(draft("Phone", vec![])).await.unwrap();
        assert_eq!(p.id, ProductId::new(1));
    }

    #[tokio::test]
    async fn save_through_stale_reference_is_not_found() {
        let store = InMemoryCatalogStore::new();
        let reference = store.product_reference(ProductId::new(99));
        let err = store.save_product(reference, draft("Ghost", vec![])).await.unwrap_err();
        assert_eq!(err, StoreError::product_not_found(ProductId::new(99)));
        assert!(!store.product_exists(ProductId::new(99)).await.unwrap());
    }

    #[tokio::test]
    async fn insert_with_unknown_category_changes_nothing() {
        let store = InMemoryCatalogStore::new();
        let ghost = Category::new(CategoryId::new(42), "Ghost");
        let err = store.insert_product(draft("Phone", vec![ghost])).await.unwrap_err();
        assert!(matches!(err, StoreError::IntegrityViolation(_)));

        let page = PageRequest::new(0, 10).unwrap();
        let (_, total) = store.find_product_ids_matching(&ProductFilter::default(), &page).await.unwrap();
        assert_eq!(total, 0);
    }

    #[tokio::test]
    async fn referenced_rows_cannot_be_deleted() {
        let store = InMemoryCatalogStore::new();
        let books = store.insert_category("Books").await.unwrap();
        let product = store.insert_product(draft("Novel", vec![books.clone()])).await.unwrap();

        let err = store.delete_category(books.id).await.unwrap_err();
        assert!(matches!(err, StoreError::IntegrityViolation(_)));

        store.add_order_reference(product.id).unwrap();
        let err = store.delete_product(product.id).await.unwrap_err();
        assert!(matches!(err, StoreError::IntegrityViolation(_)));
        assert!(store.product_exists(product.id).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_a_product_releases_its_categories() {
        let store = InMemoryCatalogStore::new();
        let books = store.insert_category("Books").await.unwrap();
        let product = store.insert_product(draft("Novel", vec![books.clone()])).await.unwrap();

        store.delete_product(product.id).await.unwrap();
        store.delete_category(books.id).await.unwrap();
        assert!(!store.category_exists(books.id).await.unwrap());
    }

    #[tokio::test]
    async fn phase_one_counts_each_product_once() {
        let store = InMemoryCatalogStore::new();
        let a = store.insert_category("A").await.unwrap();
        let b = store.insert_category("B").await.unwrap();
        let c = store.insert_category("C").await.unwrap();
        store.insert_product(draft("Wide", vec![a.clone(), b.clone(), c.clone()])).await.unwrap();
        store.insert_product(draft("Narrow", vec![a.clone()])).await.unwrap();

        let filter = ProductFilter::new("", [a.id, b.id, c.id]);
        let page = PageRequest::new(0, 10).unwrap().with_sort(SortOrder::asc("name"));
        let (ids, total) = store.find_product_ids_matching(&filter, &page).await.unwrap();

        assert_eq!(total, 2);
        assert_eq!(ids, vec![ProductSummary::new(ProductId::new(2)), ProductSummary::new(ProductId::new(1))]);
    }

    #[tokio::test]
    async fn unknown_sort_field_is_rejected() {
        let store = InMemoryCatalogStore::new();
        let page = PageRequest::new(0, 10).unwrap().with_sort(SortOrder::asc("colour"));
        let err = store
            .find_product_ids_matching(&ProductFilter::default(), &page)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::UnknownSortField("colour".to_string()));
    }

    #[tokio::test]
    async fn categories_list_by_name_and_page_by_request() {
        let store = InMemoryCatalogStore::new();
        for name in ["Electronics", "Books", "Computers"] {
            store.insert_category(name).await.unwrap();
        }

        let names: Vec<String> = store
            .list_all_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Books", "Computers", "Electronics"]);

        let page = PageRequest::new(1, 2).unwrap().with_sort(SortOrder::desc("name"));
        let (items, total) = store.find_categories_page(&page).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(items.into_iter().map(|c| c.name).collect::<Vec<_>>(), vec!["Books"]);
    }
}
