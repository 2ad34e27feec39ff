//! Catalog domain module.
//!
//! Categories, products and the pure helpers the query engine builds on
//! (filters, sort whitelists, id-order merge). No IO, no storage.

pub mod category;
pub mod filter;
pub mod merge;
pub mod product;
pub mod sort;

pub use category::Category;
pub use filter::{ProductFilter, parse_category_ids};
pub use merge::{Reordered, reorder_by_ids};
pub use product::{Product, ProductDraft, ProductInput, ProductSummary};
pub use sort::{CategorySortField, ProductSortField, SortField, UnknownSortField};
