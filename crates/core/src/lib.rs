//! `shelf-core` — catalog foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod page;

pub use entity::Entity;
pub use error::{CatalogError, CatalogResult};
pub use id::{CategoryId, ProductId};
pub use page::{Direction, Page, PageRequest, SortOrder};
