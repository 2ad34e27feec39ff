//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Root entities of the catalog (categories, products) implement this so that
/// id-keyed utilities can work over either of them.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
