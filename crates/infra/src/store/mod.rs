//! Catalog persistence.
//!
//! The [`CatalogStore`] trait is the seam between the query engine / services
//! and storage. Two backends are provided:
//! - [`InMemoryCatalogStore`] for tests and local development
//! - [`PostgresCatalogStore`] (sqlx) for durable storage

mod in_memory;
mod postgres;
mod r#trait;

pub use in_memory::InMemoryCatalogStore;
pub use postgres::{PostgresCatalogStore, SCHEMA};
pub use r#trait::{CatalogStore, CategoryRef, ProductRef, StoreError};
