use super::{FastHashMap, FastHashSet, Uuid};
use crate::core::triangulation_data_structure::{CellKey, VertexKey};

// =============================================================================
// UUID-KEY MAPPING TYPES
// =============================================================================

/// Vertex UUID → `VertexKey` lookups.
///
/// Key → UUID goes through the vertex itself:
/// ```rust
/// use simplicial::prelude::*;
///
/// let mut dt: DelaunayTriangulation<FastKernel<f64>, (), (), 2> = DelaunayTriangulation::new();
/// let key = dt.insert(vertex!([1.0, 2.0])).unwrap();
/// let uuid = dt.vertex(key).unwrap().uuid();
/// assert_eq!(dt.tds().vertex_key_from_uuid(&uuid), Some(key));
/// ```
pub type UuidToVertexKeyMap = FastHashMap<Uuid, VertexKey>;

// =============================================================================
// KEY-BASED TYPES
// =============================================================================

/// Set of cell keys, e.g. a conflict zone.
pub type CellKeySet = FastHashSet<CellKey>;

/// Set of vertex keys, e.g. the link of a vertex.
pub type VertexKeySet = FastHashSet<VertexKey>;

/// Per-cell side table.
pub type KeyBasedCellMap<V> = FastHashMap<CellKey, V>;

/// Per-vertex side table.
pub type KeyBasedVertexMap<V> = FastHashMap<VertexKey, V>;
