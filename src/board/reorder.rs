//! Reorder primitive shared by the card and column resolvers.

/// Return a copy of `list` with the element at `from` relocated to `to`.
///
/// Every other element keeps its relative order. The result has the same
/// length and the same elements as the input.
///
/// # Panics
///
/// Panics if `from` or `to` is not a valid index into `list`. Callers
/// validate drag indices before resolving.
pub fn reorder<T: Clone>(list: &[T], from: usize, to: usize) -> Vec<T> {
    let mut result = list.to_vec();
    let moved = result.remove(from);
    result.insert(to, moved);
    result
}
