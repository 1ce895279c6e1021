use rustc_hash::{FxHashMap, FxHashSet, FxHasher};
use smallvec::SmallVec;

#[cfg(not(feature = "dense-slotmap"))]
use slotmap::SlotMap;

#[cfg(feature = "dense-slotmap")]
use slotmap::DenseSlotMap;

/// Compact index of a facet (equivalently, of the opposite vertex) within a cell.
///
/// A cell of a `k`-dimensional triangulation has `k + 1` facets, so a `u8`
/// covers every supported dimension.
///
/// ```rust
/// use simplicial::core::collections::FacetIndex;
///
/// let facet: FacetIndex = 2;
/// assert_eq!(usize::from(facet), 2);
/// ```
pub type FacetIndex = u8;

pub use uuid::Uuid;

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Storage backend for vertices and cells.
///
/// `DenseSlotMap` by default; `SlotMap` when built with
/// `--no-default-features`. Keys stay stable across unrelated insertions and
/// removals with either backend.
#[cfg(not(feature = "dense-slotmap"))]
pub type StorageMap<K, V> = SlotMap<K, V>;

/// Storage backend for vertices and cells.
#[cfg(feature = "dense-slotmap")]
pub type StorageMap<K, V> = DenseSlotMap<K, V>;

// =============================================================================
// CORE OPTIMIZED TYPES
// =============================================================================

/// `HashMap` with the non-cryptographic `FxHasher`.
///
/// Only used with keys produced by the triangulation itself.
///
/// ```rust
/// use simplicial::core::collections::FastHashMap;
///
/// let mut map: FastHashMap<u64, usize> = FastHashMap::default();
/// map.insert(123, 456);
/// ```
pub type FastHashMap<K, V> = FxHashMap<K, V>;

/// Hasher shared by [`FastHashMap`] and [`FastHashSet`].
pub type FastHasher = FxHasher;

/// Entry API of [`FastHashMap`].
pub use std::collections::hash_map::Entry;

/// `HashSet` with the non-cryptographic `FxHasher`.
pub type FastHashSet<T> = FxHashSet<T>;

/// Vec with inline storage for up to `N` elements.
///
/// ```rust
/// use simplicial::core::collections::SmallBuffer;
///
/// let mut buffer: SmallBuffer<i32, 8> = SmallBuffer::new();
/// buffer.extend(0..5);
/// assert!(!buffer.spilled());
/// ```
pub type SmallBuffer<T, const N: usize> = SmallVec<[T; N]>;

/// Inline capacity sized for per-simplex data (up to `D + 1 = 8` entries).
pub const MAX_PRACTICAL_DIMENSION_SIZE: usize = 8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_collections_basic_operations() {
        let mut map: FastHashMap<u64, usize> = FastHashMap::default();
        assert!(map.is_empty());
        map.insert(123, 456);
        map.insert(789, 101_112);
        assert_eq!(map.get(&123), Some(&456));
        assert_eq!(map.len(), 2);

        let mut set: FastHashSet<u64> = FastHashSet::default();
        set.insert(789);
        set.insert(456);
        assert!(set.contains(&456));
        assert!(!set.contains(&999));

        match map.entry(5) {
            Entry::Occupied(_) => panic!("unexpected entry"),
            Entry::Vacant(e) => {
                e.insert(6);
            }
        }
        assert_eq!(map.get(&5), Some(&6));
    }

    #[test]
    fn test_small_buffer_spills_past_inline_capacity() {
        let mut buffer: SmallBuffer<i32, 4> = SmallBuffer::new();
        for i in 0..4 {
            buffer.push(i);
        }
        assert!(!buffer.spilled());
        buffer.push(4);
        assert_eq!(buffer.len(), 5);
        assert!(buffer.spilled());
    }
}
