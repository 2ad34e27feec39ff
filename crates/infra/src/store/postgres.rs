//! Postgres-backed catalog store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (foreign key violation) | `23503` | `IntegrityViolation` | Delete of a referenced row, or a link to a missing category |
//! | Database (unique violation) | `23505` | `IntegrityViolation` | Duplicate association row |
//! | Database (other) | Any other | `Backend` | Other database errors |
//! | PoolClosed / network / decode | N/A | `Backend` | Infrastructure failures |
//!
//! ## Search
//!
//! Phase one never joins the association table. The category predicate is an
//! `EXISTS` subquery, so each product row is counted, sorted and sliced once
//! however many of its categories match. Phase two loads products and their
//! association rows with two `= ANY($1)` queries and groups them in memory.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::{Span, instrument};

use shelf_catalog::sort::{self, CategorySortField, ProductSortField};
use shelf_catalog::{Category, Product, ProductDraft, ProductFilter, ProductSummary};
use shelf_core::{CategoryId, PageRequest, ProductId};

use super::r#trait::{CatalogStore, CategoryRef, ProductRef, StoreError};
use crate::config::DatabaseConfig;

/// Schema the store expects, see `migrations/0001_catalog.sql`.
pub const SCHEMA: &str = include_str!("../../migrations/0001_catalog.sql");

/// Postgres-backed catalog store.
///
/// Uses the SQLx pool for all access. Every mutation runs in one transaction.
#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: Arc<PgPool>,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Open a pool sized by `config`.
    #[instrument(skip(config), fields(max_connections = config.max_connections), err)]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(&config.database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        tracing::info!("catalog database pool ready");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the catalog tables if they do not exist yet.
    pub async fn apply_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("apply_schema", e))?;
        Ok(())
    }

    async fn begin(&self) -> Result<Transaction<'_, Postgres>, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

#[async_trait]
impl CatalogStore for PostgresCatalogStore {
    #[instrument(skip(self, id), fields(category_id = %id), err)]
    async fn find_category_by_id(&self, id: CategoryId) -> Result<Category, StoreError> {
        let row = sqlx::query("SELECT id, name FROM tb_category WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_category_by_id", e))?;

        match row {
            Some(row) => Ok(decode::<CategoryRow>(&row)?.into()),
            None => Err(StoreError::category_not_found(id)),
        }
    }

    #[instrument(skip(self), fields(category_count = tracing::field::Empty), err)]
    async fn list_all_categories(&self) -> Result<Vec<Category>, StoreError> {
        let rows = sqlx::query("SELECT id, name FROM tb_category ORDER BY name ASC, id ASC")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_all_categories", e))?;

        Span::current().record("category_count", rows.len());
        rows.iter().map(decode::<CategoryRow>).map(|r| r.map(Category::from)).collect()
    }

    #[instrument(skip(self, page), fields(page_index = page.page_index(), page_size = page.page_size()), err)]
    async fn find_categories_page(&self, page: &PageRequest) -> Result<(Vec<Category>, u64), StoreError> {
        let keys = sort::resolve::<CategorySortField>(page.sort())?;
        let sql = format!(
            "SELECT id, name FROM tb_category ORDER BY {} LIMIT $1 OFFSET $2",
            sort::order_by_clause(&keys)
        );

        let rows = sqlx::query(&sql)
            .bind(i64::from(page.page_size()))
            .bind(offset_param(page)?)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_categories_page", e))?;
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tb_category")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_categories", e))?;

        let items = rows
            .iter()
            .map(decode::<CategoryRow>)
            .map(|r| r.map(Category::from))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((items, total as u64))
    }

    #[instrument(skip(self), err)]
    async fn insert_category(&self, name: &str) -> Result<Category, StoreError> {
        let id: i64 = sqlx::query_scalar("INSERT INTO tb_category (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_category", e))?;
        Ok(Category::new(CategoryId::new(id), name))
    }

    #[instrument(skip(self, reference), fields(category_id = %reference.id()), err)]
    async fn save_category(&self, reference: CategoryRef, name: &str) -> Result<Category, StoreError> {
        let id = reference.id();
        let result = sqlx::query("UPDATE tb_category SET name = $1 WHERE id = $2")
            .bind(name)
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("save_category", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::category_not_found(id));
        }
        Ok(Category::new(id, name))
    }

    #[instrument(skip(self, id), fields(category_id = %id), err)]
    async fn category_exists(&self, id: CategoryId) -> Result<bool, StoreError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tb_category WHERE id = $1)")
            .bind(id.get())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("category_exists", e))
    }

    #[instrument(skip(self, id), fields(category_id = %id), err)]
    async fn delete_category(&self, id: CategoryId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM tb_category WHERE id = $1")
            .bind(id.get())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::category_not_found(id));
        }
        Ok(())
    }

    #[instrument(skip(self, id), fields(product_id = %id), err)]
    async fn find_product_by_id(&self, id: ProductId) -> Result<Product, StoreError> {
        self.fetch_products_with_categories(&[id])
            .await?
            .pop()
            .ok_or_else(|| StoreError::product_not_found(id))
    }

    #[instrument(
        skip(self, filter, page),
        fields(
            name_filter = %filter.name,
            category_filter = filter.category_ids.len(),
            page_index = page.page_index(),
            page_size = page.page_size(),
            total_matches = tracing::field::Empty
        ),
        err
    )]
    async fn find_product_ids_matching(
        &self,
        filter: &ProductFilter,
        page: &PageRequest,
    ) -> Result<(Vec<ProductSummary>, u64), StoreError> {
        let keys = sort::resolve::<ProductSortField>(page.sort())?;
        let category_ids: Vec<i64> = filter.category_ids.iter().map(|c| c.get()).collect();

        let sql = format!(
            "SELECT p.id FROM tb_product p WHERE {MATCHING_PRODUCTS} ORDER BY {} LIMIT $3 OFFSET $4",
            sort::order_by_clause(&keys)
        );
        let ids: Vec<i64> = sqlx::query_scalar(&sql)
            .bind(&category_ids)
            .bind(&filter.name)
            .bind(i64::from(page.page_size()))
            .bind(offset_param(page)?)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_product_ids_matching", e))?;

        let count_sql = format!("SELECT COUNT(*) FROM tb_product p WHERE {MATCHING_PRODUCTS}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(&category_ids)
            .bind(&filter.name)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_matching_products", e))?;

        Span::current().record("total_matches", total);
        let ids = ids.into_iter().map(|id| ProductSummary::new(ProductId::new(id))).collect();
        Ok((ids, total as u64))
    }

    #[instrument(skip(self, ids), fields(requested = ids.len(), fetched = tracing::field::Empty), err)]
    async fn fetch_products_with_categories(&self, ids: &[ProductId]) -> Result<Vec<Product>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = ids.iter().map(|id| id.get()).collect();

        let product_rows = sqlx::query(
            r#"
            SELECT id, name, description, price, image_url, release_instant
            FROM tb_product
            WHERE id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("fetch_products", e))?;

        let link_rows = sqlx::query(
            r#"
            SELECT pc.product_id, c.id, c.name
            FROM tb_product_category pc
            JOIN tb_category c ON c.id = pc.category_id
            WHERE pc.product_id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("fetch_product_categories", e))?;

        let mut categories_by_product: HashMap<i64, Vec<Category>> = HashMap::new();
        for row in &link_rows {
            let link = decode::<ProductCategoryRow>(row)?;
            categories_by_product
                .entry(link.product_id)
                .or_default()
                .push(Category::new(CategoryId::new(link.category_id), link.category_name));
        }

        let mut products = Vec::with_capacity(product_rows.len());
        for row in &product_rows {
            let row = decode::<ProductRow>(row)?;
            let categories = categories_by_product.remove(&row.id).unwrap_or_default();
            let mut product = Product::from(row);
            product.replace_categories(categories);
            products.push(product);
        }

        Span::current().record("fetched", products.len());
        Ok(products)
    }

    #[instrument(skip(self, draft), fields(product_id = tracing::field::Empty), err)]
    async fn insert_product(&self, draft: ProductDraft) -> Result<Product, StoreError> {
        let mut tx = self.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO tb_product (name, description, price, image_url, release_instant)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(&draft.image_url)
        .bind(draft.release_instant)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;

        replace_category_links(&mut tx, id, &draft.category_ids()).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Span::current().record("product_id", id);
        Ok(Product::from_draft(ProductId::new(id), draft))
    }

    #[instrument(skip(self, reference, draft), fields(product_id = %reference.id()), err)]
    async fn save_product(&self, reference: ProductRef, draft: ProductDraft) -> Result<Product, StoreError> {
        let id = reference.id();
        let mut tx = self.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE tb_product
            SET name = $1, description = $2, price = $3, image_url = $4, release_instant = $5
            WHERE id = $6
            "#,
        )
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(&draft.image_url)
        .bind(draft.release_instant)
        .bind(id.get())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("save_product", e))?;

        if result.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::product_not_found(id));
        }

        replace_category_links(&mut tx, id.get(), &draft.category_ids()).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(Product::from_draft(id, draft))
    }

    #[instrument(skip(self, id), fields(product_id = %id), err)]
    async fn product_exists(&self, id: ProductId) -> Result<bool, StoreError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tb_product WHERE id = $1)")
            .bind(id.get())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("product_exists", e))
    }

    #[instrument(skip(self, id), fields(product_id = %id), err)]
    async fn delete_product(&self, id: ProductId) -> Result<(), StoreError> {
        let mut tx = self.begin().await?;

        sqlx::query("DELETE FROM tb_product_category WHERE product_id = $1")
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_product_categories", e))?;

        // Order lines reference tb_product; the FK rejects this while any remain.
        let result = sqlx::query("DELETE FROM tb_product WHERE id = $1")
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;

        if result.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(StoreError::product_not_found(id));
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }
}

/// Phase-one predicate. `$1` is the category id array, `$2` the name filter.
const MATCHING_PRODUCTS: &str = "(cardinality($1::bigint[]) = 0 \
     OR EXISTS (SELECT 1 FROM tb_product_category pc \
                WHERE pc.product_id = p.id AND pc.category_id = ANY($1))) \
     AND POSITION(LOWER($2) IN LOWER(p.name)) > 0";

/// Clear a product's association rows and repopulate them from `category_ids`.
async fn replace_category_links(
    tx: &mut Transaction<'_, Postgres>,
    product_id: i64,
    category_ids: &[CategoryId],
) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM tb_product_category WHERE product_id = $1")
        .bind(product_id)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("clear_product_categories", e))?;

    if category_ids.is_empty() {
        return Ok(());
    }

    let product_ids = vec![product_id; category_ids.len()];
    let category_ids: Vec<i64> = category_ids.iter().map(|c| c.get()).collect();
    sqlx::query(
        "INSERT INTO tb_product_category (product_id, category_id) \
         SELECT * FROM UNNEST($1::bigint[], $2::bigint[])",
    )
    .bind(&product_ids)
    .bind(&category_ids)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_product_categories", e))?;

    Ok(())
}

fn offset_param(page: &PageRequest) -> Result<i64, StoreError> {
    i64::try_from(page.offset()).map_err(|_| StoreError::Backend(format!("page offset {} out of range", page.offset())))
}

fn decode<'r, T: FromRow<'r, PgRow>>(row: &'r PgRow) -> Result<T, StoreError> {
    T::from_row(row).map_err(|e| StoreError::Backend(format!("failed to decode row: {e}")))
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23503") | Some("23505") => StoreError::IntegrityViolation(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        _ => StoreError::Backend(format!("sqlx error in {operation}: {err}")),
    }
}

#[derive(Debug)]
struct CategoryRow {
    id: i64,
    name: String,
}

impl<'r> FromRow<'r, PgRow> for CategoryRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CategoryRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
        })
    }
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category::new(CategoryId::new(row.id), row.name)
    }
}

#[derive(Debug)]
struct ProductRow {
    id: i64,
    name: String,
    description: String,
    price: Decimal,
    image_url: String,
    release_instant: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            image_url: row.try_get("image_url")?,
            release_instant: row.try_get("release_instant")?,
        })
    }
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        let draft = shelf_catalog::ProductInput {
            name: row.name,
            description: row.description,
            price: row.price,
            image_url: row.image_url,
            release_instant: row.release_instant,
            category_ids: Vec::new(),
        };
        Product::from_draft(ProductId::new(row.id), ProductDraft::new(draft, Vec::new()))
    }
}

#[derive(Debug)]
struct ProductCategoryRow {
    product_id: i64,
    category_id: i64,
    category_name: String,
}

impl<'r> FromRow<'r, PgRow> for ProductCategoryRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductCategoryRow {
            product_id: row.try_get("product_id")?,
            category_id: row.try_get("id")?,
            category_name: row.try_get("name")?,
        })
    }
}
