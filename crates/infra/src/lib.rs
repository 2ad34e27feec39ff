//! Infrastructure layer: catalog storage, search and mutation services.

pub mod config;
pub mod query_engine;
pub mod services;
pub mod store;


pub use config::{ConfigError, DatabaseConfig};
pub use query_engine::ProductQueryEngine;
pub use services::{CategoryService, ProductService};
pub use store::{
    CatalogStore, CategoryRef, InMemoryCatalogStore, PostgresCatalogStore, ProductRef, StoreError,
};
