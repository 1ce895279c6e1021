//! Combinatorial triangulation data structure.
//!
//! The [`Tds`] stores a pure simplicial `k`-sphere: the finite cells of a
//! triangulation of a point set together with the *infinite* cells, each of
//! which joins a convex-hull facet to a reserved infinite vertex. The current
//! dimension `k` grows from `-1` (empty) up to the ambient dimension `D` as
//! points leave the affine hull of the previous ones.
//!
//! The design follows the combinatorial layer of
//! [CGAL Triangulation](https://doc.cgal.org/latest/Triangulation/index.html):
//!
//! - every cell has `k + 1` vertex slots and `k + 1` neighbor slots, neighbor
//!   `i` being the cell across the facet opposite vertex `i`;
//! - every `(k - 1)`-face is shared by exactly two cells;
//! - adjacent cells are oriented consistently: if `A` and `B` meet with mirror
//!   indices `i` and `j`, the vertex sequence of `B` is an odd permutation of
//!   `A` with slot `i` replaced by `B[j]`.
//!
//! Nothing in this module evaluates coordinates. Geometric decisions (which
//! cells form a hole, whether a flip is legal, which global orientation is
//! positive) belong to [`Triangulation`](crate::core::triangulation::Triangulation).
//!
//! Every mutation stages its result (vertex lists, neighbor pairings, mirror
//! slots) and validates it before the first write, so a failed call leaves
//! the structure untouched.

#![forbid(unsafe_code)]

use std::collections::VecDeque;

use slotmap::new_key_type;
use thiserror::Error;
use tracing::{debug, trace};
use uuid::Uuid;

use super::{
    cell::{Cell, CellValidationError},
    collections::{
        CavityBoundaryBuffer, CellKeyBuffer, CellKeySet, CellVertexBuffer, FastHashMap,
        FastHashSet, KeyBasedCellMap, NeighborBuffer, SmallBuffer, StorageMap, UuidToVertexKeyMap,
        VertexKeyBuffer, VertexKeySet,
    },
    facet::FacetHandle,
    traits::data_type::DataType,
    util::{permutation_parity, sorted_vertex_keys},
    vertex::{Vertex, VertexValidationError},
};
use crate::geometry::traits::coordinate::{CoordinateConversionError, CoordinateScalar};

// =============================================================================
// KEY TYPES
// =============================================================================

new_key_type! {
    /// Stable handle of a vertex in a [`Tds`].
    pub struct VertexKey;
}

new_key_type! {
    /// Stable handle of a cell in a [`Tds`].
    pub struct CellKey;
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// The kind of entity involved in a mapping inconsistency.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    /// A vertex.
    Vertex,
    /// A cell.
    Cell,
}

/// Failures of [`Tds`] mutations. All of them are detected before any write.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TdsError {
    /// The vertex key is stale or was never issued.
    #[error("Vertex {key:?} not found")]
    VertexNotFound {
        /// The missing key.
        key: VertexKey,
    },
    /// The cell key is stale or was never issued.
    #[error("Cell {key:?} not found")]
    CellNotFound {
        /// The missing key.
        key: CellKey,
    },
    /// The given cells do not form a hole that can be re-triangulated.
    #[error("Invalid hole: {message}")]
    InvalidHole {
        /// What is wrong with the hole.
        message: String,
    },
    /// The operation is not defined in the current dimension or configuration.
    #[error("Dimension mismatch: {message}")]
    DimensionMismatch {
        /// What was expected.
        message: String,
    },
    /// The facet cannot be flipped combinatorially.
    #[error("Facet {index} of cell {cell:?} cannot be flipped: {message}")]
    NonFlippableFacet {
        /// The cell owning the facet.
        cell: CellKey,
        /// The facet index.
        index: usize,
        /// Why the flip is impossible.
        message: String,
    },
    /// The vertex to insert is invalid.
    #[error("Invalid vertex: {source}")]
    InvalidVertex {
        /// The underlying validation error.
        #[from]
        source: VertexValidationError,
    },
    /// A cell could not be built from the staged vertex list.
    #[error("Invalid cell: {source}")]
    InvalidCell {
        /// The underlying validation error.
        #[from]
        source: CellValidationError,
    },
    /// A vertex with the same UUID is already stored.
    #[error("Duplicate UUID: vertex {uuid} already exists")]
    DuplicateUuid {
        /// The duplicated UUID.
        uuid: Uuid,
    },
    /// An invariant of the structure does not hold.
    #[error("Internal data structure inconsistency: {message}")]
    InconsistentDataStructure {
        /// Description of the inconsistency.
        message: String,
    },
}

/// Violations found by structural or geometric validation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TriangulationValidationError {
    /// A cell fails its own checks.
    #[error("Invalid cell {cell_id}: {source}")]
    InvalidCell {
        /// UUID of the cell.
        cell_id: Uuid,
        /// The underlying cell validation error.
        source: CellValidationError,
    },
    /// A vertex fails its own checks.
    #[error("Invalid vertex {vertex_id}: {source}")]
    InvalidVertex {
        /// UUID of the vertex.
        vertex_id: Uuid,
        /// The underlying vertex validation error.
        source: VertexValidationError,
    },
    /// Neighbor slots are missing, asymmetric, or do not share a facet.
    #[error("Invalid neighbor relationships: {message}")]
    InvalidNeighbors {
        /// Description of the failure.
        message: String,
    },
    /// Two adjacent cells are not oriented consistently.
    #[error("Cells {cell1} and {cell2} are not consistently oriented")]
    InconsistentOrientation {
        /// First cell.
        cell1: Uuid,
        /// Second cell.
        cell2: Uuid,
    },
    /// A finite cell is not positively oriented in the triangulation's frame.
    #[error("Finite cell {cell_id} is not positively oriented")]
    NegativeOrientation {
        /// UUID of the cell.
        cell_id: Uuid,
    },
    /// Key, UUID, or incidence bookkeeping is inconsistent.
    #[error("{entity:?} mapping inconsistency: {message}")]
    MappingInconsistency {
        /// The kind of entity.
        entity: EntityKind,
        /// Description of the inconsistency.
        message: String,
    },
    /// Cell arity or vertex count does not match the stored dimension.
    #[error("Dimension mismatch: {message}")]
    DimensionMismatch {
        /// Description of the mismatch.
        message: String,
    },
    /// A vertex lies strictly inside the circumsphere of a cell.
    #[error("Delaunay invariant violated: {message}")]
    DelaunayViolation {
        /// Description of the violation.
        message: String,
    },
    /// A weighted vertex is in conflict with a cell's power sphere.
    #[error("Regularity invariant violated: {message}")]
    RegularityViolation {
        /// Description of the violation.
        message: String,
    },
    /// A predicate could not be evaluated during validation.
    #[error("Predicate evaluation failed: {source}")]
    Predicate {
        /// The underlying conversion error.
        #[from]
        source: CoordinateConversionError,
    },
}

/// How much validation [`Triangulation::validate`](crate::core::triangulation::Triangulation::validate)
/// performs beyond the structural checks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Also check the empty-sphere (or power) criterion against every vertex.
    pub check_delaunay: bool,
}

/// Result of [`Tds::insert_in_hole`].
#[derive(Clone, Debug)]
pub struct HoleFill<T, U, const D: usize>
where
    T: CoordinateScalar,
    U: DataType,
{
    /// Key of the inserted vertex.
    pub vertex: VertexKey,
    /// Cells created around the new vertex.
    pub new_cells: CellKeyBuffer,
    /// Vertices that were strictly inside the hole, now removed.
    pub removed_vertices: Vec<Vertex<T, U, D>>,
}

/// A new cell staged by [`Tds::insert_in_hole`]: a boundary facet plus the new vertex.
struct StagedHoleCell {
    facet_cell: CellKey,
    apex_slot: usize,
    outside: CellKey,
    outside_slot: usize,
}

// =============================================================================
// TDS
// =============================================================================

/// Arena-backed simplicial complex with an infinite vertex.
///
/// ```rust
/// use simplicial::core::triangulation_data_structure::Tds;
/// use simplicial::core::vertex::Vertex;
/// use simplicial::geometry::point::Point;
/// use simplicial::geometry::traits::coordinate::Coordinate;
///
/// let mut tds: Tds<f64, (), (), 2> = Tds::new();
/// assert_eq!(tds.dim(), -1);
/// for p in [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]] {
///     let v = Vertex::from_points(&[Point::new(p)])[0];
///     tds.insert_increase_dimension(v).unwrap();
/// }
/// assert_eq!(tds.dim(), 2);
/// // one finite triangle and three infinite ones
/// assert_eq!(tds.number_of_cells(), 4);
/// assert_eq!(tds.number_of_finite_cells(), 1);
/// assert!(tds.is_valid().is_ok());
/// ```
#[derive(Clone, Debug)]
pub struct Tds<T, U, V, const D: usize>
where
    T: CoordinateScalar,
    U: DataType,
    V: DataType,
{
    vertices: StorageMap<VertexKey, Vertex<T, U, D>>,
    cells: StorageMap<CellKey, Cell<T, U, V, D>>,
    infinite_vertex: VertexKey,
    dimension: i32,
    uuid_to_vertex_key: UuidToVertexKeyMap,
}

impl<T, U, V, const D: usize> Default for Tds<T, U, V, D>
where
    T: CoordinateScalar,
    U: DataType,
    V: DataType,
{
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// QUERIES
// =============================================================================

impl<T, U, V, const D: usize> Tds<T, U, V, D>
where
    T: CoordinateScalar,
    U: DataType,
    V: DataType,
{
    /// An empty structure (dimension `-1`) holding only the infinite vertex.
    #[must_use]
    pub fn new() -> Self {
        let mut vertices = StorageMap::with_key();
        let infinite_vertex = vertices.insert(Vertex::sentinel());
        Self {
            vertices,
            cells: StorageMap::with_key(),
            infinite_vertex,
            dimension: -1,
            uuid_to_vertex_key: UuidToVertexKeyMap::default(),
        }
    }

    /// Current dimension: `-1` when empty, at most `D`.
    #[inline]
    #[must_use]
    pub const fn dim(&self) -> i32 {
        self.dimension
    }

    /// The infinite vertex.
    #[inline]
    #[must_use]
    pub const fn infinite_vertex(&self) -> VertexKey {
        self.infinite_vertex
    }

    /// `true` for the infinite vertex.
    #[inline]
    #[must_use]
    pub fn is_infinite_vertex(&self, key: VertexKey) -> bool {
        key == self.infinite_vertex
    }

    /// `true` if the cell contains the infinite vertex.
    #[must_use]
    pub fn is_infinite_cell(&self, key: CellKey) -> bool {
        self.cells
            .get(key)
            .is_some_and(|cell| cell.contains_vertex(self.infinite_vertex))
    }

    /// Number of finite vertices.
    #[must_use]
    pub fn number_of_vertices(&self) -> usize {
        self.vertices.len().saturating_sub(1)
    }

    /// Number of cells, finite and infinite.
    #[must_use]
    pub fn number_of_cells(&self) -> usize {
        self.cells.len()
    }

    /// Number of finite cells.
    #[must_use]
    pub fn number_of_finite_cells(&self) -> usize {
        self.finite_cells().count()
    }

    /// All vertices, the infinite one included.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexKey, &Vertex<T, U, D>)> {
        self.vertices.iter()
    }

    /// Finite vertices.
    pub fn finite_vertices(&self) -> impl Iterator<Item = (VertexKey, &Vertex<T, U, D>)> {
        self.vertices
            .iter()
            .filter(move |(key, _)| *key != self.infinite_vertex)
    }

    /// All cells, infinite ones included.
    pub fn cells(&self) -> impl Iterator<Item = (CellKey, &Cell<T, U, V, D>)> {
        self.cells.iter()
    }

    /// Cells that do not contain the infinite vertex.
    pub fn finite_cells(&self) -> impl Iterator<Item = (CellKey, &Cell<T, U, V, D>)> {
        self.cells
            .iter()
            .filter(move |(_, cell)| !cell.contains_vertex(self.infinite_vertex))
    }

    /// The vertex stored under `key`.
    #[must_use]
    pub fn vertex(&self, key: VertexKey) -> Option<&Vertex<T, U, D>> {
        self.vertices.get(key)
    }

    /// The cell stored under `key`.
    #[must_use]
    pub fn cell(&self, key: CellKey) -> Option<&Cell<T, U, V, D>> {
        self.cells.get(key)
    }

    /// Mutable access to the payload of a cell.
    pub fn cell_data_mut(&mut self, key: CellKey) -> Option<&mut Option<V>> {
        self.cells.get_mut(key).map(|cell| &mut cell.data)
    }

    /// Mutable access to the payload of a finite vertex.
    pub fn vertex_data_mut(&mut self, key: VertexKey) -> Option<&mut Option<U>> {
        if key == self.infinite_vertex {
            return None;
        }
        self.vertices.get_mut(key).map(|vertex| &mut vertex.data)
    }

    /// `true` if `key` refers to a stored vertex.
    #[must_use]
    pub fn contains_vertex(&self, key: VertexKey) -> bool {
        self.vertices.contains_key(key)
    }

    /// `true` if `key` refers to a stored cell.
    #[must_use]
    pub fn contains_cell(&self, key: CellKey) -> bool {
        self.cells.contains_key(key)
    }

    /// Key of the finite vertex with the given UUID.
    #[must_use]
    pub fn vertex_key_from_uuid(&self, uuid: &Uuid) -> Option<VertexKey> {
        self.uuid_to_vertex_key.get(uuid).copied()
    }

    /// The cell across the facet of `cell` opposite slot `i`.
    #[must_use]
    pub fn neighbor(&self, cell: CellKey, i: usize) -> Option<CellKey> {
        self.cells.get(cell)?.neighbor(i)
    }

    /// Slot of `cell` in the neighbor list of `neighbor(cell, i)`.
    #[must_use]
    pub fn mirror_index(&self, cell: CellKey, i: usize) -> Option<usize> {
        let c = self.cells.get(cell)?;
        let n = self.cells.get(c.neighbor(i)?)?;
        Self::mirror_slot(c, n)
    }

    /// The vertex of `neighbor(cell, i)` opposite the shared facet.
    #[must_use]
    pub fn mirror_vertex(&self, cell: CellKey, i: usize) -> Option<VertexKey> {
        let c = self.cells.get(cell)?;
        let n = self.cells.get(c.neighbor(i)?)?;
        Self::mirror_slot(c, n).and_then(|j| n.vertex(j))
    }

    /// Slot of the only vertex of `neighbor` that is not in `cell`.
    fn mirror_slot(cell: &Cell<T, U, V, D>, neighbor: &Cell<T, U, V, D>) -> Option<usize> {
        neighbor
            .vertices()
            .iter()
            .position(|&v| !cell.contains_vertex(v))
    }

    /// One cell containing `vertex`.
    #[must_use]
    pub fn incident_cell(&self, vertex: VertexKey) -> Option<CellKey> {
        self.vertices.get(vertex)?.incident_cell
    }

    /// All cells containing `vertex` (its star), in breadth-first order.
    #[must_use]
    pub fn incident_cells(&self, vertex: VertexKey) -> Vec<CellKey> {
        let Some(start) = self.incident_cell(vertex) else {
            return Vec::new();
        };
        let mut visited = CellKeySet::default();
        let mut star = Vec::new();
        let mut queue = VecDeque::from([start]);
        visited.insert(start);
        while let Some(current) = queue.pop_front() {
            let Some(cell) = self.cells.get(current) else {
                continue;
            };
            star.push(current);
            for (i, &v) in cell.vertices().iter().enumerate() {
                if v == vertex {
                    continue;
                }
                if let Some(next) = cell.neighbor(i)
                    && visited.insert(next)
                {
                    queue.push_back(next);
                }
            }
        }
        star
    }

    /// Vertices sharing a cell with `vertex` (its link), the infinite vertex included.
    #[must_use]
    pub fn adjacent_vertices(&self, vertex: VertexKey) -> Vec<VertexKey> {
        let mut seen = VertexKeySet::default();
        let mut link = Vec::new();
        for cell_key in self.incident_cells(vertex) {
            if let Some(cell) = self.cells.get(cell_key) {
                for &v in cell.vertices() {
                    if v != vertex && seen.insert(v) {
                        link.push(v);
                    }
                }
            }
        }
        link
    }

    /// All cells containing every vertex of `face` (the star of the face).
    #[must_use]
    pub fn cells_containing_face(&self, face: &[VertexKey]) -> Vec<CellKey> {
        let Some(&first) = face.first() else {
            return self.cells.keys().collect();
        };
        self.incident_cells(first)
            .into_iter()
            .filter(|&c| {
                self.cells
                    .get(c)
                    .is_some_and(|cell| face.iter().all(|&v| cell.contains_vertex(v)))
            })
            .collect()
    }

    /// Facets of `hole` whose neighbor lies outside the hole.
    ///
    /// # Errors
    ///
    /// Returns [`TdsError::CellNotFound`] for stale keys and
    /// [`TdsError::InconsistentDataStructure`] for a missing neighbor.
    pub fn hole_boundary(&self, hole: &[CellKey]) -> Result<CavityBoundaryBuffer, TdsError> {
        let members: CellKeySet = hole.iter().copied().collect();
        let mut boundary = CavityBoundaryBuffer::new();
        for &c in hole {
            let cell = self.cell_or_err(c)?;
            for i in 0..cell.number_of_vertices() {
                let n = cell.neighbor(i).ok_or_else(|| missing_neighbor(c, i))?;
                if !members.contains(&n) {
                    boundary.push(FacetHandle::new(c, i));
                }
            }
        }
        Ok(boundary)
    }

    fn cell_or_err(&self, key: CellKey) -> Result<&Cell<T, U, V, D>, TdsError> {
        self.cells.get(key).ok_or(TdsError::CellNotFound { key })
    }

    fn cell_mut_or_err(&mut self, key: CellKey) -> Result<&mut Cell<T, U, V, D>, TdsError> {
        self.cells.get_mut(key).ok_or(TdsError::CellNotFound { key })
    }

    fn finite_vertex_or_err(&self, key: VertexKey) -> Result<&Vertex<T, U, D>, TdsError> {
        if key == self.infinite_vertex {
            return Err(TdsError::DimensionMismatch {
                message: "the infinite vertex cannot be used here".to_string(),
            });
        }
        self.vertices.get(key).ok_or(TdsError::VertexNotFound { key })
    }

    fn current_dimension(&self) -> Option<usize> {
        usize::try_from(self.dimension).ok()
    }
}

fn missing_neighbor(cell: CellKey, slot: usize) -> TdsError {
    TdsError::InconsistentDataStructure {
        message: format!("cell {cell:?} has no neighbor in slot {slot}"),
    }
}

// =============================================================================
// MUTATION PRIMITIVES
// =============================================================================

impl<T, U, V, const D: usize> Tds<T, U, V, D>
where
    T: CoordinateScalar,
    U: DataType,
    V: DataType,
{
    fn check_new_vertex(&self, vertex: &Vertex<T, U, D>) -> Result<(), TdsError> {
        vertex.is_valid()?;
        if self.uuid_to_vertex_key.contains_key(&vertex.uuid()) {
            return Err(TdsError::DuplicateUuid {
                uuid: vertex.uuid(),
            });
        }
        Ok(())
    }

    fn insert_vertex_record(&mut self, mut vertex: Vertex<T, U, D>) -> VertexKey {
        vertex.incident_cell = None;
        let uuid = vertex.uuid();
        let key = self.vertices.insert(vertex);
        self.uuid_to_vertex_key.insert(uuid, key);
        key
    }

    fn remove_vertex_record(&mut self, key: VertexKey) -> Option<Vertex<T, U, D>> {
        let vertex = self.vertices.remove(key)?;
        self.uuid_to_vertex_key.remove(&vertex.uuid());
        Some(vertex)
    }

    /// Points the incident-cell reference of every vertex of `cells` at one of them.
    fn assign_incident_cells(&mut self, cells: &[CellKey]) {
        for &c in cells {
            let Some(cell) = self.cells.get(c) else {
                continue;
            };
            let vertices: VertexKeyBuffer = cell.vertices().iter().copied().collect();
            for v in vertices {
                if let Some(vertex) = self.vertices.get_mut(v) {
                    vertex.incident_cell = Some(c);
                }
            }
        }
    }

    /// Inserts a vertex that lies outside the affine hull of the current
    /// vertices, raising the dimension by one.
    ///
    /// Every existing cell `S` becomes `S + v` (the new vertex in the last
    /// slot) and every finite cell `σ` gains a twin `[∞, σ₁, …, σ_k, σ₀]` that
    /// closes the new sphere. From dimension `-1` the result is the two
    /// 0-cells `[v]` and `[∞]`.
    ///
    /// The orientation of the result is combinatorially consistent; whether it
    /// is geometrically positive is for the caller to check and, if needed,
    /// fix with [`Tds::reorient`].
    ///
    /// # Errors
    ///
    /// Returns [`TdsError::DimensionMismatch`] at dimension `D`, and vertex
    /// validation errors.
    pub fn insert_increase_dimension(
        &mut self,
        vertex: Vertex<T, U, D>,
    ) -> Result<VertexKey, TdsError> {
        let full = i32::try_from(D).unwrap_or(i32::MAX);
        if self.dimension >= full {
            return Err(TdsError::DimensionMismatch {
                message: format!("cannot raise dimension beyond {D}"),
            });
        }
        self.check_new_vertex(&vertex)?;

        let Some(k) = self.current_dimension() else {
            let x = self.insert_vertex_record(vertex);
            let finite = self.cells.insert(Cell::new(vec![x], None)?);
            let infinite = self.cells.insert(Cell::new(vec![self.infinite_vertex], None)?);
            self.cell_mut_or_err(finite)?.set_neighbor(0, Some(infinite));
            self.cell_mut_or_err(infinite)?.set_neighbor(0, Some(finite));
            self.assign_incident_cells(&[finite, infinite]);
            self.dimension = 0;
            debug!("dimension raised to 0");
            return Ok(x);
        };

        // Stage: every old cell must be fully connected, and every infinite
        // cell must face a finite one across its infinite slot.
        let old_cells: Vec<CellKey> = self.cells.keys().collect();
        for &c in &old_cells {
            let cell = self.cell_or_err(c)?;
            for i in 0..=k {
                let n = cell.neighbor(i).ok_or_else(|| missing_neighbor(c, i))?;
                self.cell_or_err(n)?;
            }
            if let Some(iota) = cell.index_of(self.infinite_vertex) {
                let opposite = cell.neighbor(iota).ok_or_else(|| missing_neighbor(c, iota))?;
                if self.is_infinite_cell(opposite) {
                    return Err(TdsError::InconsistentDataStructure {
                        message: format!("infinite cell {c:?} faces another infinite cell"),
                    });
                }
            }
        }
        let finite_old: Vec<CellKey> = old_cells
            .iter()
            .copied()
            .filter(|&c| !self.is_infinite_cell(c))
            .collect();

        let x = self.insert_vertex_record(vertex);
        let inf = self.infinite_vertex;

        let mut twins: KeyBasedCellMap<CellKey> = KeyBasedCellMap::default();
        for &s in &finite_old {
            let sigma = self.cell_or_err(s)?;
            let mut vertices = CellVertexBuffer::new();
            vertices.push(inf);
            vertices.extend(sigma.vertices().iter().skip(1).copied());
            vertices.extend(sigma.vertices().first().copied());
            let twin = self.cells.insert(Cell::new(vertices, None)?);
            twins.insert(s, twin);
        }

        let twin_of = |twins: &KeyBasedCellMap<CellKey>, c: CellKey| -> Result<CellKey, TdsError> {
            twins
                .get(&c)
                .copied()
                .ok_or_else(|| TdsError::InconsistentDataStructure {
                    message: format!("finite cell {c:?} has no twin"),
                })
        };

        for &s in &finite_old {
            let twin = twin_of(&twins, s)?;
            let mut neighbors: NeighborBuffer<Option<CellKey>> =
                std::iter::repeat_n(None, k + 2).collect();
            neighbors[0] = Some(s);
            for m in 0..=k {
                let position = if m == 0 { k + 1 } else { m };
                let n = self.neighbor(s, m).ok_or_else(|| missing_neighbor(s, m))?;
                let target = if self.is_infinite_cell(n) {
                    n
                } else {
                    twin_of(&twins, n)?
                };
                neighbors[position] = Some(target);
            }
            let twin_cell = self.cell_mut_or_err(twin)?;
            for (slot, n) in neighbors.into_iter().enumerate() {
                twin_cell.set_neighbor(slot, n);
            }
        }

        for &s in &old_cells {
            let cell = self.cell_or_err(s)?;
            let opposite = match cell.index_of(inf) {
                None => twin_of(&twins, s)?,
                Some(iota) => {
                    let sigma = cell.neighbor(iota).ok_or_else(|| missing_neighbor(s, iota))?;
                    twin_of(&twins, sigma)?
                }
            };
            self.cell_mut_or_err(s)?.push_slot(x, Some(opposite));
        }

        if k == 0 {
            // A 0-sphere carries no orientation; make the new 1-sphere consistent.
            for &s in &old_cells {
                if self.is_infinite_cell(s) {
                    self.cell_mut_or_err(s)?.swap_slots(0, 1);
                }
            }
        }

        let mut touched: Vec<CellKey> = old_cells;
        touched.extend(twins.values().copied());
        self.assign_incident_cells(&touched);
        self.dimension += 1;
        debug!(dimension = self.dimension, "dimension raised");
        Ok(x)
    }

    /// Removes `vertex` and lowers the dimension by one. Inverse of
    /// [`Tds::insert_increase_dimension`].
    ///
    /// Legal only when every finite cell contains `vertex`, or when it is the
    /// only finite vertex.
    ///
    /// # Errors
    ///
    /// Returns [`TdsError::DimensionMismatch`] if the precondition fails.
    pub fn remove_decrease_dimension(
        &mut self,
        vertex: VertexKey,
    ) -> Result<Vertex<T, U, D>, TdsError> {
        self.finite_vertex_or_err(vertex)?;
        let Some(k) = self.current_dimension() else {
            return Err(TdsError::DimensionMismatch {
                message: "the triangulation is empty".to_string(),
            });
        };

        if k == 0 {
            if self.number_of_vertices() != 1 {
                return Err(TdsError::InconsistentDataStructure {
                    message: "dimension 0 with more than one finite vertex".to_string(),
                });
            }
            self.cells.clear();
            if let Some(inf) = self.vertices.get_mut(self.infinite_vertex) {
                inf.incident_cell = None;
            }
            self.dimension = -1;
            debug!("dimension lowered to -1");
            return self
                .remove_vertex_record(vertex)
                .ok_or(TdsError::VertexNotFound { key: vertex });
        }

        if let Some((c, _)) = self
            .finite_cells()
            .find(|(_, cell)| !cell.contains_vertex(vertex))
        {
            return Err(TdsError::DimensionMismatch {
                message: format!(
                    "finite cell {c:?} does not contain the vertex; the dimension cannot drop"
                ),
            });
        }

        let (keep, discard): (Vec<CellKey>, Vec<CellKey>) = self
            .cells
            .iter()
            .map(|(key, _)| key)
            .partition(|&key| self.cells.get(key).is_some_and(|c| c.contains_vertex(vertex)));

        for c in discard {
            self.cells.remove(c);
        }
        for &c in &keep {
            let cell = self.cell_mut_or_err(c)?;
            let p = cell
                .index_of(vertex)
                .ok_or(TdsError::VertexNotFound { key: vertex })?;
            if p != k {
                cell.swap_slots(p, k);
                if k >= 2 {
                    // keep the permutation even
                    cell.swap_slots(0, 1);
                }
            }
            cell.pop_slot();
        }

        let removed = self
            .remove_vertex_record(vertex)
            .ok_or(TdsError::VertexNotFound { key: vertex })?;
        self.assign_incident_cells(&keep);
        self.dimension -= 1;
        debug!(dimension = self.dimension, "dimension lowered");
        Ok(removed)
    }

    /// Replaces the cells of `hole` with the star of a new vertex over
    /// `boundary`, the facets returned by [`Tds::hole_boundary`].
    ///
    /// Each boundary facet `(c, i)` yields a cell equal to `c` with slot `i`
    /// replaced by the new vertex, which keeps the orientation of `c`.
    /// Vertices of the hole that lie on no boundary facet are removed and
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns [`TdsError::InvalidHole`] if `boundary` is not exactly the
    /// boundary of `hole`, is not a closed manifold, or the infinite vertex
    /// would be removed; the structure is unchanged in that case.
    pub fn insert_in_hole(
        &mut self,
        hole: &[CellKey],
        boundary: &[FacetHandle],
        vertex: Vertex<T, U, D>,
    ) -> Result<HoleFill<T, U, D>, TdsError> {
        if self.dimension < 1 {
            return Err(TdsError::DimensionMismatch {
                message: format!("insert_in_hole needs dimension >= 1, got {}", self.dimension),
            });
        }
        self.check_new_vertex(&vertex)?;
        if hole.is_empty() {
            return Err(TdsError::InvalidHole {
                message: "the hole is empty".to_string(),
            });
        }
        let members: CellKeySet = hole.iter().copied().collect();
        if members.len() != hole.len() {
            return Err(TdsError::InvalidHole {
                message: "the hole lists a cell twice".to_string(),
            });
        }

        let actual = self.hole_boundary(hole)?;
        if actual.is_empty() {
            return Err(TdsError::InvalidHole {
                message: "the hole covers the whole complex".to_string(),
            });
        }
        let given: FastHashSet<FacetHandle> = boundary.iter().copied().collect();
        if given.len() != boundary.len() || given.len() != actual.len() {
            return Err(TdsError::InvalidHole {
                message: format!(
                    "{} boundary facets given, the hole has {}",
                    boundary.len(),
                    actual.len()
                ),
            });
        }
        if let Some(stray) = actual.iter().find(|f| !given.contains(f)) {
            return Err(TdsError::InvalidHole {
                message: format!(
                    "facet {} of cell {:?} bounds the hole but is missing",
                    stray.facet_index(),
                    stray.cell_key()
                ),
            });
        }

        let mut staged: Vec<StagedHoleCell> = Vec::with_capacity(boundary.len());
        let mut boundary_vertices = VertexKeySet::default();
        let mut ridges: FastHashMap<VertexKeyBuffer, SmallBuffer<(usize, usize), 2>> =
            FastHashMap::default();
        for facet in boundary {
            let c = facet.cell_key();
            let i = facet.facet_index();
            let cell = self.cell_or_err(c)?;
            let outside = cell.neighbor(i).ok_or_else(|| missing_neighbor(c, i))?;
            let outside_slot = Self::mirror_slot(cell, self.cell_or_err(outside)?)
                .ok_or_else(|| TdsError::InconsistentDataStructure {
                    message: format!("cells {c:?} and {outside:?} do not share a facet"),
                })?;
            let index = staged.len();
            for (m, &v) in cell.vertices().iter().enumerate() {
                if m == i {
                    continue;
                }
                boundary_vertices.insert(v);
                let ridge = sorted_vertex_keys(
                    cell.vertices()
                        .iter()
                        .enumerate()
                        .filter(|&(slot, _)| slot != i && slot != m)
                        .map(|(_, &w)| w),
                );
                ridges.entry(ridge).or_default().push((index, m));
            }
            staged.push(StagedHoleCell {
                facet_cell: c,
                apex_slot: i,
                outside,
                outside_slot,
            });
        }
        if let Some(count) = ridges.values().map(|pairs| pairs.len()).find(|&n| n != 2) {
            return Err(TdsError::InvalidHole {
                message: format!("the hole boundary is not a closed manifold (a ridge bounds {count} facets)"),
            });
        }

        let mut interior = VertexKeySet::default();
        for &c in hole {
            for &v in self.cell_or_err(c)?.vertices() {
                if !boundary_vertices.contains(&v) {
                    interior.insert(v);
                }
            }
        }
        if interior.contains(&self.infinite_vertex) {
            return Err(TdsError::InvalidHole {
                message: "the hole would swallow the infinite vertex".to_string(),
            });
        }

        let staged_vertices: Vec<CellVertexBuffer> = staged
            .iter()
            .map(|s| {
                self.cell_or_err(s.facet_cell)
                    .map(|cell| cell.vertices().iter().copied().collect())
            })
            .collect::<Result<_, _>>()?;

        // Commit.
        let x = self.insert_vertex_record(vertex);
        let mut new_cells = CellKeyBuffer::new();
        for (s, mut vertices) in staged.iter().zip(staged_vertices) {
            vertices[s.apex_slot] = x;
            new_cells.push(self.cells.insert(Cell::new(vertices, None)?));
        }
        for &c in hole {
            self.cells.remove(c);
        }
        for (s, &new_key) in staged.iter().zip(new_cells.iter()) {
            self.cell_mut_or_err(new_key)?
                .set_neighbor(s.apex_slot, Some(s.outside));
            self.cell_mut_or_err(s.outside)?
                .set_neighbor(s.outside_slot, Some(new_key));
        }
        for pair in ridges.values() {
            let (a, slot_a) = pair[0];
            let (b, slot_b) = pair[1];
            self.cell_mut_or_err(new_cells[a])?
                .set_neighbor(slot_a, Some(new_cells[b]));
            self.cell_mut_or_err(new_cells[b])?
                .set_neighbor(slot_b, Some(new_cells[a]));
        }
        let mut removed_vertices = Vec::with_capacity(interior.len());
        for v in interior {
            if let Some(vertex) = self.remove_vertex_record(v) {
                removed_vertices.push(vertex);
            }
        }
        self.assign_incident_cells(&new_cells);
        trace!(
            hole = hole.len(),
            created = new_cells.len(),
            removed = removed_vertices.len(),
            "hole filled"
        );
        Ok(HoleFill {
            vertex: x,
            new_cells,
            removed_vertices,
        })
    }

    /// Deletes the star of `vertex` and the vertex itself, and fills the
    /// cavity with `new_cells`.
    ///
    /// Facets of the new cells must match the link facets of the star exactly
    /// once and each other exactly twice. The new cells are oriented
    /// combinatorially against the untouched cells outside the star (slots 0
    /// and 1 are swapped where needed), then connected.
    ///
    /// # Errors
    ///
    /// Returns [`TdsError::InvalidHole`] when the cells do not fill the
    /// cavity; the structure is unchanged in that case.
    pub fn replace_vertex_star(
        &mut self,
        vertex: VertexKey,
        new_cells: &[CellVertexBuffer],
    ) -> Result<CellKeyBuffer, TdsError> {
        self.finite_vertex_or_err(vertex)?;
        let Some(k) = self.current_dimension().filter(|&k| k >= 1) else {
            return Err(TdsError::DimensionMismatch {
                message: format!("replace_vertex_star needs dimension >= 1, got {}", self.dimension),
            });
        };

        // Link facets: sorted facet -> (star cell, slot of vertex, outside, outside slot).
        let star = self.incident_cells(vertex);
        let mut link: FastHashMap<VertexKeyBuffer, (CellKey, usize, CellKey, usize)> =
            FastHashMap::default();
        for &c in &star {
            let cell = self.cell_or_err(c)?;
            let i = cell
                .index_of(vertex)
                .ok_or(TdsError::VertexNotFound { key: vertex })?;
            let outside = cell.neighbor(i).ok_or_else(|| missing_neighbor(c, i))?;
            let outside_slot = Self::mirror_slot(cell, self.cell_or_err(outside)?)
                .ok_or_else(|| TdsError::InconsistentDataStructure {
                    message: format!("cells {c:?} and {outside:?} do not share a facet"),
                })?;
            link.insert(sorted_vertex_keys(cell.facet_vertices(i)), (c, i, outside, outside_slot));
        }

        for cell in new_cells {
            if cell.len() != k + 1 {
                return Err(TdsError::InvalidHole {
                    message: format!("replacement cell has {} vertices, expected {}", cell.len(), k + 1),
                });
            }
            if cell.contains(&vertex) {
                return Err(TdsError::InvalidHole {
                    message: "replacement cell contains the removed vertex".to_string(),
                });
            }
            if let Some(&missing) = cell.iter().find(|&&v| !self.vertices.contains_key(v)) {
                return Err(TdsError::VertexNotFound { key: missing });
            }
            Cell::<T, U, V, D>::new(cell.clone(), None)?;
        }

        // Match facets.
        let mut boundary_matches: Vec<(usize, VertexKey, (CellKey, usize, CellKey, usize))> =
            Vec::new();
        let mut matched_count = 0usize;
        let mut internal: FastHashMap<VertexKeyBuffer, SmallBuffer<(usize, VertexKey), 2>> =
            FastHashMap::default();
        for (s, cell) in new_cells.iter().enumerate() {
            for (m, &apex) in cell.iter().enumerate() {
                let facet = sorted_vertex_keys(
                    cell.iter()
                        .enumerate()
                        .filter(|&(slot, _)| slot != m)
                        .map(|(_, &w)| w),
                );
                if let Some(&entry) = link.get(&facet) {
                    boundary_matches.push((s, apex, entry));
                    matched_count += 1;
                } else {
                    internal.entry(facet).or_default().push((s, apex));
                }
            }
        }
        let distinct_matches: CellKeySet = boundary_matches.iter().map(|(_, _, e)| e.0).collect();
        if matched_count != link.len() || distinct_matches.len() != link.len() {
            return Err(TdsError::InvalidHole {
                message: format!(
                    "replacement cells match {} of {} link facets",
                    distinct_matches.len(),
                    link.len()
                ),
            });
        }
        if internal.values().any(|pairs| pairs.len() != 2) {
            return Err(TdsError::InvalidHole {
                message: "replacement cells leave an unmatched interior facet".to_string(),
            });
        }

        // Orient: boundary constraints first, then propagate across interior facets.
        let mut oriented: Vec<Option<CellVertexBuffer>> = vec![None; new_cells.len()];
        for &(s, apex, (c, i, _, _)) in &boundary_matches {
            let mut target: CellVertexBuffer = self.cell_or_err(c)?.vertices().iter().copied().collect();
            target[i] = apex;
            let fixed = orient_like(&new_cells[s], &target)?;
            match &oriented[s] {
                Some(existing) if *existing != fixed => {
                    return Err(TdsError::InvalidHole {
                        message: "replacement cell cannot be oriented consistently".to_string(),
                    });
                }
                Some(_) => {}
                None => oriented[s] = Some(fixed),
            }
        }
        let mut adjacency: Vec<SmallBuffer<(VertexKey, usize, VertexKey), 8>> =
            vec![SmallBuffer::new(); new_cells.len()];
        for pairs in internal.values() {
            let (a, apex_a) = pairs[0];
            let (b, apex_b) = pairs[1];
            adjacency[a].push((apex_a, b, apex_b));
            adjacency[b].push((apex_b, a, apex_a));
        }
        let mut queue: VecDeque<usize> = (0..new_cells.len())
            .filter(|&s| oriented[s].is_some())
            .collect();
        while let Some(s) = queue.pop_front() {
            let Some(current) = oriented[s].clone() else {
                continue;
            };
            for &(apex_here, other, apex_there) in &adjacency[s] {
                let mut target = current.clone();
                if let Some(slot) = target.iter().position(|&v| v == apex_here) {
                    target[slot] = apex_there;
                }
                // the neighbor must be an odd permutation of `target`
                if let (Some(first), Some(second)) = (target.first().copied(), target.get(1).copied()) {
                    target[0] = second;
                    target[1] = first;
                }
                let fixed = orient_like(&new_cells[other], &target)?;
                match &oriented[other] {
                    Some(existing) if *existing != fixed => {
                        return Err(TdsError::InvalidHole {
                            message: "replacement cells cannot be oriented consistently".to_string(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        oriented[other] = Some(fixed);
                        queue.push_back(other);
                    }
                }
            }
        }
        let oriented: Vec<CellVertexBuffer> = oriented
            .into_iter()
            .map(|o| {
                o.ok_or_else(|| TdsError::InvalidHole {
                    message: "replacement cells are not connected to the cavity boundary".to_string(),
                })
            })
            .collect::<Result<_, _>>()?;

        // Commit.
        for &c in &star {
            self.cells.remove(c);
        }
        self.remove_vertex_record(vertex);
        let mut keys = CellKeyBuffer::new();
        for vertices in &oriented {
            keys.push(self.cells.insert(Cell::new(vertices.clone(), None)?));
        }
        for &(s, apex, (_, _, outside, outside_slot)) in &boundary_matches {
            let slot = slot_of(&oriented[s], apex)?;
            self.cell_mut_or_err(keys[s])?.set_neighbor(slot, Some(outside));
            self.cell_mut_or_err(outside)?
                .set_neighbor(outside_slot, Some(keys[s]));
        }
        for pairs in internal.values() {
            let (a, apex_a) = pairs[0];
            let (b, apex_b) = pairs[1];
            let slot_a = slot_of(&oriented[a], apex_a)?;
            let slot_b = slot_of(&oriented[b], apex_b)?;
            self.cell_mut_or_err(keys[a])?.set_neighbor(slot_a, Some(keys[b]));
            self.cell_mut_or_err(keys[b])?.set_neighbor(slot_b, Some(keys[a]));
        }
        self.assign_incident_cells(&keys);
        trace!(star = star.len(), created = keys.len(), "vertex star replaced");
        Ok(keys)
    }

    /// Bistellar flip of the facet of `cell` opposite slot `i`.
    ///
    /// The two cells sharing the facet, `A = F + a` and `B = F + b`, are
    /// replaced by the `k` cells `F \ {f} + a + b`, one per vertex `f` of `F`.
    /// In 2D this is the edge flip, in 3D the 2-3 flip. Each new cell is `A`
    /// with `f` replaced by `b`, so orientation is preserved whenever the
    /// flip is geometrically legal; checking legality is the caller's job.
    ///
    /// # Errors
    ///
    /// Returns [`TdsError::NonFlippableFacet`] if the edge `ab` already exists.
    pub fn flip_facet(&mut self, cell: CellKey, i: usize) -> Result<CellKeyBuffer, TdsError> {
        let Some(k) = self.current_dimension().filter(|&k| k >= 2) else {
            return Err(TdsError::DimensionMismatch {
                message: format!("flips need dimension >= 2, got {}", self.dimension),
            });
        };
        let a_cell = self.cell_or_err(cell)?;
        let a = a_cell.vertex(i).ok_or_else(|| TdsError::NonFlippableFacet {
            cell,
            index: i,
            message: "facet index out of range".to_string(),
        })?;
        let b_key = a_cell.neighbor(i).ok_or_else(|| missing_neighbor(cell, i))?;
        let b_cell = self.cell_or_err(b_key)?;
        let j = Self::mirror_slot(a_cell, b_cell).ok_or_else(|| {
            TdsError::InconsistentDataStructure {
                message: format!("cells {cell:?} and {b_key:?} do not share a facet"),
            }
        })?;
        let b = b_cell.vertex(j).ok_or(TdsError::CellNotFound { key: b_key })?;

        if self
            .incident_cells(a)
            .into_iter()
            .any(|c| self.cells.get(c).is_some_and(|cc| cc.contains_vertex(b)))
        {
            return Err(TdsError::NonFlippableFacet {
                cell,
                index: i,
                message: "the opposite vertices are already joined by an edge".to_string(),
            });
        }

        // Stage the k new cells, one per facet vertex slot p of A.
        let a_vertices: CellVertexBuffer = a_cell.vertices().iter().copied().collect();
        let slots: SmallBuffer<usize, 8> = (0..=k).filter(|&p| p != i).collect();
        let mut staged: Vec<(CellVertexBuffer, CellKey, usize, CellKey, usize)> = Vec::new();
        for &p in &slots {
            let f = a_vertices[p];
            let mut vertices = a_vertices.clone();
            vertices[p] = b;
            let outside_a = a_cell.neighbor(p).ok_or_else(|| missing_neighbor(cell, p))?;
            let mirror_a = Self::mirror_slot(a_cell, self.cell_or_err(outside_a)?).ok_or_else(
                || TdsError::InconsistentDataStructure {
                    message: format!("cells {cell:?} and {outside_a:?} do not share a facet"),
                },
            )?;
            let q = b_cell.index_of(f).ok_or_else(|| TdsError::InconsistentDataStructure {
                message: format!("cells {cell:?} and {b_key:?} do not share a facet"),
            })?;
            let outside_b = b_cell.neighbor(q).ok_or_else(|| missing_neighbor(b_key, q))?;
            let mirror_b = Self::mirror_slot(b_cell, self.cell_or_err(outside_b)?).ok_or_else(
                || TdsError::InconsistentDataStructure {
                    message: format!("cells {b_key:?} and {outside_b:?} do not share a facet"),
                },
            )?;
            staged.push((vertices, outside_a, mirror_a, outside_b, mirror_b));
        }

        // Commit.
        let mut keys = CellKeyBuffer::new();
        for (vertices, ..) in &staged {
            keys.push(self.cells.insert(Cell::new(vertices.clone(), None)?));
        }
        self.cells.remove(cell);
        self.cells.remove(b_key);
        for (n, &p) in slots.iter().enumerate() {
            let (_, outside_a, mirror_a, outside_b, mirror_b) = &staged[n];
            let (outside_a, mirror_a, outside_b, mirror_b) =
                (*outside_a, *mirror_a, *outside_b, *mirror_b);
            let new_key = keys[n];
            {
                let new_cell = self.cell_mut_or_err(new_key)?;
                new_cell.set_neighbor(p, Some(outside_a));
                new_cell.set_neighbor(i, Some(outside_b));
            }
            self.cell_mut_or_err(outside_a)?
                .set_neighbor(mirror_a, Some(new_key));
            self.cell_mut_or_err(outside_b)?
                .set_neighbor(mirror_b, Some(new_key));
            for (m, &q) in slots.iter().enumerate() {
                if q != p {
                    // the cell omitting A[q] lies across slot q
                    self.cell_mut_or_err(new_key)?.set_neighbor(q, Some(keys[m]));
                }
            }
        }
        self.assign_incident_cells(&keys);
        trace!(created = keys.len(), "facet flipped");
        Ok(keys)
    }

    /// Reverses the orientation of every cell.
    pub fn reorient(&mut self) {
        for (_, cell) in &mut self.cells {
            if cell.number_of_vertices() >= 2 {
                cell.swap_slots(0, 1);
            }
        }
    }
}

/// `candidate`, with slots 0 and 1 swapped if needed, as an even permutation of `target`.
fn orient_like(
    candidate: &CellVertexBuffer,
    target: &CellVertexBuffer,
) -> Result<CellVertexBuffer, TdsError> {
    let odd = permutation_parity(target, candidate).ok_or_else(|| TdsError::InvalidHole {
        message: "replacement cell does not match its cavity facet".to_string(),
    })?;
    let mut fixed = candidate.clone();
    if odd && fixed.len() >= 2 {
        fixed.swap(0, 1);
    }
    Ok(fixed)
}

fn slot_of(vertices: &CellVertexBuffer, vertex: VertexKey) -> Result<usize, TdsError> {
    vertices
        .iter()
        .position(|&v| v == vertex)
        .ok_or(TdsError::VertexNotFound { key: vertex })
}

// =============================================================================
// VALIDATION
// =============================================================================

impl<T, U, V, const D: usize> Tds<T, U, V, D>
where
    T: CoordinateScalar,
    U: DataType,
    V: DataType,
{
    /// Structural validation: cell arity, distinct vertices, mutual neighbors
    /// sharing a facet, consistent orientation, incidence, and UUID bookkeeping.
    ///
    /// # Errors
    ///
    /// Returns the first [`TriangulationValidationError`] found.
    pub fn is_valid(&self) -> Result<(), TriangulationValidationError> {
        self.validate_vertex_mappings()?;
        let Some(k) = self.current_dimension() else {
            if self.dimension != -1 || !self.cells.is_empty() || self.number_of_vertices() != 0 {
                return Err(TriangulationValidationError::DimensionMismatch {
                    message: format!(
                        "dimension {} with {} cells and {} vertices",
                        self.dimension,
                        self.cells.len(),
                        self.number_of_vertices()
                    ),
                });
            }
            return Ok(());
        };
        if k > D {
            return Err(TriangulationValidationError::DimensionMismatch {
                message: format!("dimension {k} exceeds ambient dimension {D}"),
            });
        }
        self.validate_cells(k)?;
        self.validate_neighbors(k)?;
        self.validate_incidence()
    }

    fn validate_vertex_mappings(&self) -> Result<(), TriangulationValidationError> {
        let inconsistency = |message: String| TriangulationValidationError::MappingInconsistency {
            entity: EntityKind::Vertex,
            message,
        };
        if !self.vertices.contains_key(self.infinite_vertex) {
            return Err(inconsistency("the infinite vertex is missing".to_string()));
        }
        if self.uuid_to_vertex_key.len() != self.number_of_vertices() {
            return Err(inconsistency(format!(
                "{} UUID entries for {} finite vertices",
                self.uuid_to_vertex_key.len(),
                self.number_of_vertices()
            )));
        }
        for (key, vertex) in self.finite_vertices() {
            vertex
                .is_valid()
                .map_err(|source| TriangulationValidationError::InvalidVertex {
                    vertex_id: vertex.uuid(),
                    source,
                })?;
            if self.uuid_to_vertex_key.get(&vertex.uuid()) != Some(&key) {
                return Err(inconsistency(format!(
                    "vertex {} is not mapped to its key",
                    vertex.uuid()
                )));
            }
        }
        Ok(())
    }

    fn validate_cells(&self, k: usize) -> Result<(), TriangulationValidationError> {
        for (_, cell) in &self.cells {
            cell.is_valid()
                .map_err(|source| TriangulationValidationError::InvalidCell {
                    cell_id: cell.uuid(),
                    source,
                })?;
            if cell.number_of_vertices() != k + 1 {
                return Err(TriangulationValidationError::DimensionMismatch {
                    message: format!(
                        "cell {} has {} vertices in dimension {k}",
                        cell.uuid(),
                        cell.number_of_vertices()
                    ),
                });
            }
            if let Some(&missing) = cell
                .vertices()
                .iter()
                .find(|&&v| !self.vertices.contains_key(v))
            {
                return Err(TriangulationValidationError::MappingInconsistency {
                    entity: EntityKind::Cell,
                    message: format!("cell {} refers to missing vertex {missing:?}", cell.uuid()),
                });
            }
        }
        Ok(())
    }

    fn validate_neighbors(&self, k: usize) -> Result<(), TriangulationValidationError> {
        let invalid = |message: String| TriangulationValidationError::InvalidNeighbors { message };
        for (key, cell) in &self.cells {
            for i in 0..=k {
                let n_key = cell
                    .neighbor(i)
                    .ok_or_else(|| invalid(format!("cell {} has no neighbor {i}", cell.uuid())))?;
                let neighbor = self.cells.get(n_key).ok_or_else(|| {
                    invalid(format!("cell {} has a stale neighbor {i}", cell.uuid()))
                })?;
                if n_key == key {
                    return Err(invalid(format!("cell {} is its own neighbor", cell.uuid())));
                }
                let j = Self::mirror_slot(cell, neighbor).ok_or_else(|| {
                    invalid(format!("cells {} and {} are identical", cell.uuid(), neighbor.uuid()))
                })?;
                let shared = cell.facet_vertices(i);
                if neighbor.facet_vertices(j).len() != shared.len()
                    || !shared.iter().all(|&v| neighbor.contains_vertex(v))
                {
                    return Err(invalid(format!(
                        "cells {} and {} do not share facet {i}",
                        cell.uuid(),
                        neighbor.uuid()
                    )));
                }
                if neighbor.neighbor(j) != Some(key) {
                    return Err(invalid(format!(
                        "neighbor {} of cell {} does not point back",
                        neighbor.uuid(),
                        cell.uuid()
                    )));
                }
                if k >= 1 {
                    let mut expected: CellVertexBuffer = cell.vertices().iter().copied().collect();
                    expected[i] = neighbor.vertices()[j];
                    if permutation_parity(&expected, neighbor.vertices()) != Some(true) {
                        return Err(TriangulationValidationError::InconsistentOrientation {
                            cell1: cell.uuid(),
                            cell2: neighbor.uuid(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn validate_incidence(&self) -> Result<(), TriangulationValidationError> {
        for (key, vertex) in &self.vertices {
            let contained = vertex
                .incident_cell
                .and_then(|c| self.cells.get(c))
                .is_some_and(|cell| cell.contains_vertex(key));
            if !contained {
                return Err(TriangulationValidationError::MappingInconsistency {
                    entity: EntityKind::Vertex,
                    message: format!("vertex {key:?} has no valid incident cell"),
                });
            }
        }
        Ok(())
    }
}
