use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shelf_core::{CategoryId, Entity, ProductId};

use crate::category::Category;

/// A catalog product with its full category set.
///
/// `categories` is kept sorted by id with no duplicate ids; the only way to
/// change it is a full replacement. Products are only built from a
/// [`ProductDraft`], so there is no `Deserialize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image_url: String,
    pub release_instant: DateTime<Utc>,
    categories: Vec<Category>,
}

impl Product {
    /// Materialize a stored draft under its assigned id.
    pub fn from_draft(id: ProductId, draft: ProductDraft) -> Self {
        Self {
            id,
            name: draft.name,
            description: draft.description,
            price: draft.price,
            image_url: draft.image_url,
            release_instant: draft.release_instant,
            categories: draft.categories,
        }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category_ids(&self) -> impl Iterator<Item = CategoryId> + '_ {
        self.categories.iter().map(|c| c.id)
    }

    pub fn has_category(&self, id: CategoryId) -> bool {
        self.categories.binary_search_by_key(&id, |c| c.id).is_ok()
    }

    /// Clear the category set and repopulate it from `categories`.
    pub fn replace_categories(&mut self, categories: impl IntoIterator<Item = Category>) {
        self.categories.clear();
        self.categories.extend(categories);
        normalize(&mut self.categories);
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }
}

/// Caller-supplied product values, already validated upstream.
///
/// Every scalar is written unconditionally on insert and update; there is no
/// partial-update form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image_url: String,
    pub release_instant: DateTime<Utc>,
    #[serde(default)]
    pub category_ids: Vec<CategoryId>,
}

/// Product values with categories resolved against the store, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image_url: String,
    pub release_instant: DateTime<Utc>,
    categories: Vec<Category>,
}

impl ProductDraft {
    pub fn new(input: ProductInput, categories: impl IntoIterator<Item = Category>) -> Self {
        let mut categories: Vec<Category> = categories.into_iter().collect();
        normalize(&mut categories);
        Self {
            name: input.name,
            description: input.description,
            price: input.price,
            image_url: input.image_url,
            release_instant: input.release_instant,
            categories,
        }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category_ids(&self) -> Vec<CategoryId> {
        self.categories.iter().map(|c| c.id).collect()
    }
}

/// Identity-only projection used to establish match order and page bounds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ProductSummary {
    pub id: ProductId,
}

impl ProductSummary {
    pub fn new(id: ProductId) -> Self {
        Self { id }
    }
}

fn normalize(categories: &mut Vec<Category>) {
    categories.sort_by_key(|c| c.id);
    categories.dedup_by_key(|c| c.id);
}
