//! Id-order merge.
//!
//! Restores a previously established id order over a batch of fully-populated
//! entities that came back in arbitrary order.

use std::collections::HashMap;

use shelf_core::Entity;

/// Result of [`reorder_by_ids`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reordered<E: Entity> {
    /// Entities in the requested id order.
    pub items: Vec<E>,
    /// Ids from the requested order that had no entity in the batch.
    pub missing: Vec<E::Id>,
}

impl<E: Entity> Reordered<E> {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Rebuild `batch` in the order given by `order`.
///
/// Ids absent from the batch are reported in `missing` and skipped. Entities
/// whose id is not in `order` are dropped. Each id is emitted at most once.
pub fn reorder_by_ids<E: Entity>(order: &[E::Id], batch: impl IntoIterator<Item = E>) -> Reordered<E> {
    let mut by_id: HashMap<E::Id, E> = batch.into_iter().map(|e| (e.id(), e)).collect();

    let mut items = Vec::with_capacity(order.len());
    let mut missing = Vec::new();
    for id in order {
        match by_id.remove(id) {
            Some(entity) => items.push(entity),
            None => missing.push(*id),
        }
    }

    Reordered { items, missing }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use shelf_core::CategoryId;

    fn cats(ids: &[i64]) -> Vec<Category> {
        ids.iter().map(|&i| Category::new(CategoryId::new(i), format!("c{i}"))).collect()
    }

    fn ids(ids: &[i64]) -> Vec<CategoryId> {
        ids.iter().copied().map(CategoryId::new).collect()
    }

    #[test]
    fn restores_requested_order() {
        let merged = reorder_by_ids(&ids(&[3, 1, 2]), cats(&[1, 2, 3]));
        assert_eq!(merged.items.iter().map(|c| c.id).collect::<Vec<_>>(), ids(&[3, 1, 2]));
        assert!(merged.is_complete());
    }

    #[test]
    fn missing_ids_are_reported_and_skipped() {
        let merged = reorder_by_ids(&ids(&[5, 1, 9]), cats(&[1, 5]));
        assert_eq!(merged.items.iter().map(|c| c.id).collect::<Vec<_>>(), ids(&[5, 1]));
        assert_eq!(merged.missing, ids(&[9]));
    }

    #[test]
    fn extra_entities_are_dropped() {
        let merged = reorder_by_ids(&ids(&[2]), cats(&[1, 2, 3]));
        assert_eq!(merged.items, cats(&[2]));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: whatever order the batch arrives in, the output follows `order`.
            #[test]
            fn output_follows_order_for_any_permutation(
                (order, shuffled) in proptest::collection::btree_set(0i64..500, 0..40)
                    .prop_flat_map(|set| {
                        let order: Vec<i64> = set.into_iter().collect();
                        let shuffled = Just(order.clone()).prop_shuffle();
                        (Just(order), shuffled)
                    })
                    .prop_flat_map(|(order, batch)| (Just(order).prop_shuffle(), Just(batch)))
            ) {
                let merged = reorder_by_ids(&ids(&order), cats(&shuffled));
                let out: Vec<i64> = merged.items.iter().map(|c| c.id.get()).collect();
                prop_assert_eq!(out, order);
                prop_assert!(merged.missing.is_empty());
            }
        }
    }
}
