//! Permutation parity and facet identity helpers.
//!
//! Cell orientation is encoded by the order of vertex slots, so comparing two
//! orderings of the same vertex set reduces to the parity of a permutation.

use crate::core::collections::{MAX_PRACTICAL_DIMENSION_SIZE, SmallBuffer, VertexKeyBuffer};
use crate::core::triangulation_data_structure::VertexKey;

/// Parity of the permutation taking `from` to `to`.
///
/// Returns `Some(true)` for an odd permutation, `Some(false)` for an even one
/// and `None` if the slices are not orderings of the same distinct elements.
///
/// ```rust
/// use simplicial::core::util::permutation_parity;
///
/// assert_eq!(permutation_parity(&[1, 2, 3], &[1, 2, 3]), Some(false));
/// assert_eq!(permutation_parity(&[1, 2, 3], &[2, 1, 3]), Some(true));
/// assert_eq!(permutation_parity(&[1, 2, 3], &[2, 3, 1]), Some(false));
/// assert_eq!(permutation_parity(&[1, 2, 3], &[1, 2, 4]), None);
/// ```
#[must_use]
pub fn permutation_parity<K: Copy + Eq>(from: &[K], to: &[K]) -> Option<bool> {
    if from.len() != to.len() {
        return None;
    }
    let mut image: SmallBuffer<usize, MAX_PRACTICAL_DIMENSION_SIZE> = SmallBuffer::new();
    for item in to {
        let position = from.iter().position(|f| f == item)?;
        if image.contains(&position) {
            return None;
        }
        image.push(position);
    }
    let mut visited: SmallBuffer<bool, MAX_PRACTICAL_DIMENSION_SIZE> =
        std::iter::repeat_n(false, image.len()).collect();
    let mut transpositions = 0usize;
    for start in 0..image.len() {
        if visited[start] {
            continue;
        }
        let mut length = 0usize;
        let mut current = start;
        while !visited[current] {
            visited[current] = true;
            current = image[current];
            length += 1;
        }
        transpositions += length - 1;
    }
    Some(transpositions % 2 == 1)
}

/// Vertex keys in ascending key order: an order-independent facet identity.
#[must_use]
pub fn sorted_vertex_keys(keys: impl IntoIterator<Item = VertexKey>) -> VertexKeyBuffer {
    let mut sorted: VertexKeyBuffer = keys.into_iter().collect();
    sorted.sort_unstable();
    sorted
}
