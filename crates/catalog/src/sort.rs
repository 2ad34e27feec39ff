//! Whitelisted sort fields.
//!
//! Callers name sort keys as strings; stores only ever order by fields listed
//! here. Unknown names are rejected rather than ignored, and every resolved
//! ordering ends with `id` so that page boundaries are deterministic.

use core::cmp::Ordering;

use thiserror::Error;

use shelf_core::{Direction, SortOrder};

use crate::category::Category;
use crate::product::Product;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown sort field: {0:?}")]
pub struct UnknownSortField(pub String);

/// A field a store knows how to order by.
pub trait SortField: Copy + Eq + Sized {
    /// The identity field, used as the final tie-breaker.
    const ID: Self;

    fn parse(name: &str) -> Option<Self>;

    /// Column name in the relational schema.
    fn column(self) -> &'static str;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ProductSortField {
    Id,
    Name,
    Price,
    ReleaseInstant,
}

impl SortField for ProductSortField {
    const ID: Self = ProductSortField::Id;

    fn parse(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Self::Id),
            "name" => Some(Self::Name),
            "price" => Some(Self::Price),
            "date" | "releaseInstant" | "release_instant" => Some(Self::ReleaseInstant),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Price => "price",
            Self::ReleaseInstant => "release_instant",
        }
    }
}

impl ProductSortField {
    pub fn compare(self, a: &Product, b: &Product) -> Ordering {
        match self {
            Self::Id => a.id.cmp(&b.id),
            Self::Name => a.name.cmp(&b.name),
            Self::Price => a.price.cmp(&b.price),
            Self::ReleaseInstant => a.release_instant.cmp(&b.release_instant),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CategorySortField {
    Id,
    Name,
}

impl SortField for CategorySortField {
    const ID: Self = CategorySortField::Id;

    fn parse(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Self::Id),
            "name" => Some(Self::Name),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
        }
    }
}

impl CategorySortField {
    pub fn compare(self, a: &Category, b: &Category) -> Ordering {
        match self {
            Self::Id => a.id.cmp(&b.id),
            Self::Name => a.name.cmp(&b.name),
        }
    }
}

/// Resolve caller sort keys against a field whitelist.
pub fn resolve<F: SortField>(sort: &[SortOrder]) -> Result<Vec<(F, Direction)>, UnknownSortField> {
    let mut keys = Vec::with_capacity(sort.len() + 1);
    for order in sort {
        let field = F::parse(&order.field).ok_or_else(|| UnknownSortField(order.field.clone()))?;
        keys.push((field, order.direction));
    }
    if !keys.iter().any(|(f, _)| *f == F::ID) {
        keys.push((F::ID, Direction::Asc));
    }
    Ok(keys)
}

/// Render resolved keys as an SQL `ORDER BY` body.
///
/// Only whitelisted column names reach the output.
pub fn order_by_clause<F: SortField>(keys: &[(F, Direction)]) -> String {
    keys.iter()
        .map(|(f, d)| format!("{} {}", f.column(), d.as_sql()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Compare two values under a resolved key list.
pub fn compare_by<T, F: SortField>(
    keys: &[(F, Direction)],
    a: &T,
    b: &T,
    cmp: impl Fn(F, &T, &T) -> Ordering,
) -> Ordering {
    for (field, direction) in keys {
        let ord = cmp(*field, a, b);
        let ord = if direction.is_ascending() { ord } else { ord.reverse() };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}
