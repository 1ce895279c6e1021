use crate::core::facet::FacetHandle;
use crate::core::triangulation_data_structure::{CellKey, VertexKey};

use super::{MAX_PRACTICAL_DIMENSION_SIZE, SmallBuffer};

// =============================================================================
// ALGORITHM-SPECIFIC BUFFER TYPES
// =============================================================================

/// Inline capacity for conflict zones and freshly created cells.
///
/// A well-conditioned insertion touches a handful of cells; larger zones spill
/// to the heap.
pub const CONFLICT_ZONE_BUFFER_SIZE: usize = 16;

/// Cell keys collected by an insertion, a removal, or a flip.
pub type CellKeyBuffer = SmallBuffer<CellKey, CONFLICT_ZONE_BUFFER_SIZE>;

/// Boundary facets of a hole, as `(outside cell, facet index)` handles.
pub type CavityBoundaryBuffer = SmallBuffer<FacetHandle, 64>;

/// Vertex keys of one simplex.
pub type VertexKeyBuffer = SmallBuffer<VertexKey, MAX_PRACTICAL_DIMENSION_SIZE>;

/// Vertex slots of a cell: `k + 1` entries in a `k`-dimensional triangulation.
pub type CellVertexBuffer = SmallBuffer<VertexKey, MAX_PRACTICAL_DIMENSION_SIZE>;

/// Neighbor slots of a cell; slot `i` is opposite vertex slot `i`.
pub type NeighborBuffer<T> = SmallBuffer<T, MAX_PRACTICAL_DIMENSION_SIZE>;

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_buffers_stay_inline_for_small_simplices() {
        let mut vertices: SlotMap<VertexKey, ()> = SlotMap::default();
        let mut cells: SlotMap<CellKey, ()> = SlotMap::default();

        let simplex: CellVertexBuffer = (0..4).map(|_| vertices.insert(())).collect();
        assert!(!simplex.spilled());

        let neighbors: NeighborBuffer<Option<CellKey>> =
            std::iter::repeat_n(None, simplex.len()).collect();
        assert!(neighbors.iter().all(Option::is_none));

        let zone: CellKeyBuffer = (0..CONFLICT_ZONE_BUFFER_SIZE).map(|_| cells.insert(())).collect();
        assert!(!zone.spilled());

        let boundary: CavityBoundaryBuffer = zone
            .iter()
            .map(|&c| FacetHandle::new(c, 0))
            .collect();
        assert_eq!(boundary.len(), CONFLICT_ZONE_BUFFER_SIZE);
    }
}
