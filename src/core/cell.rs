//! Cells (maximal simplices) of a triangulation.
//!
//! A cell of a `k`-dimensional triangulation stores `k + 1` vertex keys and
//! `k + 1` neighbor keys. Neighbor `i` is the cell across the facet opposite
//! vertex `i`. Cells never own vertex data; they refer to the
//! [`Tds`](crate::core::triangulation_data_structure::Tds) arena by key.

#![forbid(unsafe_code)]

use super::{
    collections::{CellVertexBuffer, FastHashSet, NeighborBuffer, VertexKeyBuffer},
    traits::DataType,
    triangulation_data_structure::{CellKey, VertexKey},
    util::{UuidValidationError, make_uuid, validate_uuid},
};
use crate::geometry::traits::coordinate::CoordinateScalar;
use std::marker::PhantomData;
use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors reported by [`Cell::is_valid`] and cell construction.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CellValidationError {
    /// The cell has a nil or non-v4 UUID.
    #[error("Invalid UUID: {source}")]
    InvalidUuid {
        /// The underlying UUID validation error.
        #[from]
        source: UuidValidationError,
    },
    /// A vertex key appears twice.
    #[error("Duplicate vertices: cell contains non-unique vertices which is not allowed")]
    DuplicateVertices,
    /// The number of vertices is outside `1..=D + 1`.
    #[error("Invalid vertex count: cell has {actual} vertices; a {dimension}D cell needs 1..={max}")]
    InvalidVertexCount {
        /// The number of vertices.
        actual: usize,
        /// `D + 1`.
        max: usize,
        /// The ambient dimension.
        dimension: usize,
    },
    /// The neighbor buffer does not have one slot per vertex.
    #[error("Invalid neighbors length: got {actual}, expected {expected}")]
    InvalidNeighborsLength {
        /// Number of neighbor slots.
        actual: usize,
        /// Number of vertices.
        expected: usize,
    },
}

// =============================================================================
// CELL STRUCT DEFINITION
// =============================================================================

/// A simplex of the triangulation, stored by vertex and neighbor keys.
///
/// The vertex order is significant: it encodes the orientation of the cell.
/// Every finite cell of a valid triangulation is positively oriented in the
/// triangulation's frame, and adjacent cells are oriented consistently.
///
/// ```rust
/// use simplicial::prelude::*;
///
/// let mut dt: DelaunayTriangulation<FastKernel<f64>, (), (), 2> = DelaunayTriangulation::new();
/// for p in [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]] {
///     dt.insert(vertex!(p)).unwrap();
/// }
/// let (key, cell) = dt.finite_cells().next().unwrap();
/// assert_eq!(cell.number_of_vertices(), 3);
/// for i in 0..3 {
///     // every neighbor is mutual
///     let n = cell.neighbor(i).unwrap();
///     assert!(dt.cell(n).unwrap().neighbors().contains(&Some(key)));
/// }
/// ```
#[derive(Clone, Debug)]
pub struct Cell<T, U, V, const D: usize>
where
    T: CoordinateScalar,
    U: DataType,
    V: DataType,
{
    vertices: CellVertexBuffer,
    uuid: Uuid,
    neighbors: NeighborBuffer<Option<CellKey>>,
    /// Optional user payload.
    pub data: Option<V>,
    _phantom: PhantomData<(T, U)>,
}

impl<T, U, V, const D: usize> Cell<T, U, V, D>
where
    T: CoordinateScalar,
    U: DataType,
    V: DataType,
{
    /// Creates an unconnected cell.
    ///
    /// # Errors
    ///
    /// Returns [`CellValidationError::InvalidVertexCount`] or
    /// [`CellValidationError::DuplicateVertices`].
    pub(crate) fn new(
        vertices: impl Into<CellVertexBuffer>,
        data: Option<V>,
    ) -> Result<Self, CellValidationError> {
        let vertices = vertices.into();
        Self::check_vertices(&vertices)?;
        let neighbors = std::iter::repeat_n(None, vertices.len()).collect();
        Ok(Self {
            vertices,
            uuid: make_uuid(),
            neighbors,
            data,
            _phantom: PhantomData,
        })
    }

    fn check_vertices(vertices: &[VertexKey]) -> Result<(), CellValidationError> {
        if vertices.is_empty() || vertices.len() > D + 1 {
            return Err(CellValidationError::InvalidVertexCount {
                actual: vertices.len(),
                max: D + 1,
                dimension: D,
            });
        }
        let mut seen: FastHashSet<VertexKey> = FastHashSet::default();
        if vertices.iter().all(|&v| seen.insert(v)) {
            Ok(())
        } else {
            Err(CellValidationError::DuplicateVertices)
        }
    }

    /// Vertex keys in slot order.
    #[inline]
    #[must_use]
    pub fn vertices(&self) -> &[VertexKey] {
        &self.vertices
    }

    /// Neighbor keys in slot order; slot `i` is opposite vertex `i`.
    #[inline]
    #[must_use]
    pub fn neighbors(&self) -> &[Option<CellKey>] {
        &self.neighbors
    }

    /// The vertex in slot `i`.
    #[inline]
    #[must_use]
    pub fn vertex(&self, i: usize) -> Option<VertexKey> {
        self.vertices.get(i).copied()
    }

    /// The neighbor across the facet opposite vertex `i`.
    #[inline]
    #[must_use]
    pub fn neighbor(&self, i: usize) -> Option<CellKey> {
        self.neighbors.get(i).copied().flatten()
    }

    /// Number of vertices (`k + 1` in a `k`-dimensional triangulation).
    #[inline]
    #[must_use]
    pub fn number_of_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Dimension of the simplex.
    #[inline]
    #[must_use]
    pub fn dim(&self) -> usize {
        self.vertices.len().saturating_sub(1)
    }

    /// The UUID of the cell.
    #[inline]
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// `true` if `vkey` is a vertex of this cell.
    #[inline]
    #[must_use]
    pub fn contains_vertex(&self, vkey: VertexKey) -> bool {
        self.vertices.contains(&vkey)
    }

    /// Slot of `vkey` in this cell.
    #[inline]
    #[must_use]
    pub fn index_of(&self, vkey: VertexKey) -> Option<usize> {
        self.vertices.iter().position(|&v| v == vkey)
    }

    /// Slot of `neighbor` in this cell's neighbor list.
    #[inline]
    #[must_use]
    pub fn neighbor_index(&self, neighbor: CellKey) -> Option<usize> {
        self.neighbors.iter().position(|&n| n == Some(neighbor))
    }

    /// Vertices of the facet opposite slot `i`, in slot order.
    #[must_use]
    pub fn facet_vertices(&self, i: usize) -> VertexKeyBuffer {
        self.vertices
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(_, &v)| v)
            .collect()
    }

    /// `true` if the two cells share at least one vertex.
    #[must_use]
    pub fn has_vertex_in_common(&self, other: &Self) -> bool {
        self.vertices.iter().any(|v| other.vertices.contains(v))
    }

    /// Checks UUID, vertex count, distinct vertices and neighbor arity.
    ///
    /// Adjacency and orientation need the whole complex and are checked by
    /// [`Tds::is_valid`](crate::core::triangulation_data_structure::Tds::is_valid).
    ///
    /// # Errors
    ///
    /// Returns the first [`CellValidationError`] found.
    pub fn is_valid(&self) -> Result<(), CellValidationError> {
        validate_uuid(&self.uuid)?;
        Self::check_vertices(&self.vertices)?;
        if self.neighbors.len() != self.vertices.len() {
            return Err(CellValidationError::InvalidNeighborsLength {
                actual: self.neighbors.len(),
                expected: self.vertices.len(),
            });
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Mutation, reserved for the Tds
    // -------------------------------------------------------------------------

    pub(crate) fn set_neighbor(&mut self, i: usize, neighbor: Option<CellKey>) {
        if let Some(slot) = self.neighbors.get_mut(i) {
            *slot = neighbor;
        }
    }

    /// Swaps two slots, vertex and neighbor together. Reverses the orientation.
    pub(crate) fn swap_slots(&mut self, i: usize, j: usize) {
        self.vertices.swap(i, j);
        self.neighbors.swap(i, j);
    }

    /// Appends a vertex slot with its neighbor.
    pub(crate) fn push_slot(&mut self, vertex: VertexKey, neighbor: Option<CellKey>) {
        self.vertices.push(vertex);
        self.neighbors.push(neighbor);
    }

    /// Removes the last slot.
    pub(crate) fn pop_slot(&mut self) -> Option<(VertexKey, Option<CellKey>)> {
        let vertex = self.vertices.pop()?;
        let neighbor = self.neighbors.pop().flatten();
        Some((vertex, neighbor))
    }
}
