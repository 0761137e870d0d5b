//! Position model: dense integer ordering per container.
//!
//! Columns are ordered within their board and cards within their column.
//! After any settled operation the `order` values of a container's children
//! are exactly `0..N` with no gaps or duplicates.

use thiserror::Error;

/// A record that occupies a slot in a densely ordered container.
pub trait Ordered {
    type Id: Clone + Ord;

    fn id(&self) -> &Self::Id;
    fn order(&self) -> u32;
}

/// Ways a container's ordering can fail to be dense.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderViolation {
    #[error("order {order} is used more than once")]
    Duplicate { order: u32 },

    #[error("expected order {expected}, found {found}")]
    Gap { expected: u32, found: u32 },
}

/// Check that `orders` is a permutation of `0..N`.
pub fn check_dense(orders: impl IntoIterator<Item = u32>) -> Result<(), OrderViolation> {
    let mut sorted: Vec<u32> = orders.into_iter().collect();
    sorted.sort_unstable();
    for (index, pair) in sorted.iter().enumerate() {
        let expected = index as u32;
        if index > 0 && sorted[index - 1] == *pair {
            return Err(OrderViolation::Duplicate { order: *pair });
        }
        if *pair != expected {
            return Err(OrderViolation::Gap {
                expected,
                found: *pair,
            });
        }
    }
    Ok(())
}

/// Positional renumbering of an already-arranged sequence.
///
/// Returns `(id, new_order)` for every item whose index in the sequence
/// differs from its stored order. Items already in place are omitted so
/// callers never issue redundant writes.
pub fn renumber<'a, T>(items: impl IntoIterator<Item = &'a T>) -> Vec<(T::Id, u32)>
where
    T: Ordered + 'a,
{
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let index = index as u32;
            (item.order() != index).then(|| (item.id().clone(), index))
        })
        .collect()
}
