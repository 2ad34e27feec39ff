//! Caller-facing error model.

use thiserror::Error;

use crate::id::CategoryId;

/// Result type used across the catalog layer.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Catalog-level error.
///
/// The request layer maps each variant to a distinct outward signal, so the
/// variants stay coarse: "absent", "blocked by a reference", "bad association",
/// "bad paging input" and an opaque infrastructure bucket.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The requested id has no live record.
    #[error("not found: {0}")]
    NotFound(String),

    /// The store refused the change because another record still references
    /// the target (referential integrity).
    #[error("database integrity violation: {0}")]
    Database(String),

    /// A product input named a category that does not exist.
    #[error("unresolved category association: {0}")]
    UnresolvedAssociation(CategoryId),

    /// Pagination input was rejected (zero page size, unknown sort field, ...).
    #[error("invalid page request: {0}")]
    InvalidPageRequest(String),

    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Opaque infrastructure failure, propagated unmodified.
    #[error("store error: {0}")]
    Store(String),
}

impl CatalogError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn invalid_page_request(msg: impl Into<String>) -> Self {
        Self::InvalidPageRequest(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
