//! Facets of cells.
//!
//! A facet is identified by a cell and the slot of the vertex opposite to it.
//! [`FacetHandle`] is the lightweight, storable form; [`FacetView`] borrows
//! the [`Tds`] to answer questions about the facet.

use super::{
    collections::{FacetIndex, VertexKeyBuffer},
    traits::DataType,
    triangulation_data_structure::{CellKey, Tds, VertexKey},
};
use crate::geometry::traits::coordinate::CoordinateScalar;
use thiserror::Error;

/// Errors raised when a facet does not exist.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FacetError {
    /// The cell is not in the triangulation.
    #[error("Cell {cell_key:?} not found in triangulation")]
    CellNotFound {
        /// The missing cell.
        cell_key: CellKey,
    },
    /// The facet index is not a slot of the cell.
    #[error("Facet index {index} out of range for a cell with {facet_count} facets")]
    InvalidFacetIndex {
        /// The requested index.
        index: usize,
        /// Number of facets of the cell.
        facet_count: usize,
    },
}

/// A facet, stored as `(cell, index of the opposite vertex)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FacetHandle {
    cell_key: CellKey,
    facet_index: FacetIndex,
}

impl FacetHandle {
    /// Creates a handle. Indices beyond `u8::MAX` saturate; no supported
    /// dimension reaches them.
    #[inline]
    #[must_use]
    pub fn new(cell_key: CellKey, facet_index: usize) -> Self {
        Self {
            cell_key,
            facet_index: FacetIndex::try_from(facet_index).unwrap_or(FacetIndex::MAX),
        }
    }

    /// The cell owning the facet.
    #[inline]
    #[must_use]
    pub const fn cell_key(&self) -> CellKey {
        self.cell_key
    }

    /// Slot of the vertex opposite the facet.
    #[inline]
    #[must_use]
    pub fn facet_index(&self) -> usize {
        usize::from(self.facet_index)
    }
}

/// Borrowed view of a facet.
///
/// ```rust
/// use simplicial::core::facet::FacetView;
/// use simplicial::prelude::*;
///
/// let mut dt: DelaunayTriangulation<FastKernel<f64>, (), (), 2> = DelaunayTriangulation::new();
/// for p in [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]] {
///     dt.insert(vertex!(p)).unwrap();
/// }
/// let (cell_key, _) = dt.finite_cells().next().unwrap();
/// let facet = FacetView::new(dt.tds(), cell_key, 0).unwrap();
/// assert_eq!(facet.vertices().len(), 2);
/// let (across, mirror) = facet.mirror().unwrap();
/// assert!(dt.is_infinite_cell(across));
/// assert_eq!(dt.neighbor(across, mirror), Some(cell_key));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct FacetView<'tds, T, U, V, const D: usize>
where
    T: CoordinateScalar,
    U: DataType,
    V: DataType,
{
    tds: &'tds Tds<T, U, V, D>,
    handle: FacetHandle,
}

impl<'tds, T, U, V, const D: usize> FacetView<'tds, T, U, V, D>
where
    T: CoordinateScalar,
    U: DataType,
    V: DataType,
{
    /// Creates a view of the facet of `cell_key` opposite slot `facet_index`.
    ///
    /// # Errors
    ///
    /// Returns [`FacetError`] if the cell does not exist or the index is out of range.
    pub fn new(
        tds: &'tds Tds<T, U, V, D>,
        cell_key: CellKey,
        facet_index: usize,
    ) -> Result<Self, FacetError> {
        let cell = tds
            .cell(cell_key)
            .ok_or(FacetError::CellNotFound { cell_key })?;
        let facet_count = cell.number_of_vertices();
        if facet_index >= facet_count {
            return Err(FacetError::InvalidFacetIndex {
                index: facet_index,
                facet_count,
            });
        }
        Ok(Self {
            tds,
            handle: FacetHandle::new(cell_key, facet_index),
        })
    }

    /// Creates a view from a handle.
    ///
    /// # Errors
    ///
    /// Same conditions as [`FacetView::new`].
    pub fn from_handle(tds: &'tds Tds<T, U, V, D>, handle: FacetHandle) -> Result<Self, FacetError> {
        Self::new(tds, handle.cell_key(), handle.facet_index())
    }

    /// The storable handle of this facet.
    #[inline]
    #[must_use]
    pub const fn handle(&self) -> FacetHandle {
        self.handle
    }

    /// Vertex keys of the facet, in the cell's slot order.
    #[must_use]
    pub fn vertices(&self) -> VertexKeyBuffer {
        self.tds
            .cell(self.handle.cell_key())
            .map(|c| c.facet_vertices(self.handle.facet_index()))
            .unwrap_or_default()
    }

    /// The vertex of the owning cell opposite the facet.
    #[must_use]
    pub fn opposite_vertex(&self) -> Option<VertexKey> {
        self.tds
            .cell(self.handle.cell_key())
            .and_then(|c| c.vertex(self.handle.facet_index()))
    }

    /// `true` if the facet contains the infinite vertex.
    #[must_use]
    pub fn is_infinite(&self) -> bool {
        self.vertices()
            .iter()
            .any(|&v| self.tds.is_infinite_vertex(v))
    }

    /// The cell across the facet and the slot of this facet in it.
    #[must_use]
    pub fn mirror(&self) -> Option<(CellKey, usize)> {
        let across = self
            .tds
            .neighbor(self.handle.cell_key(), self.handle.facet_index())?;
        let mirror = self
            .tds
            .mirror_index(self.handle.cell_key(), self.handle.facet_index())?;
        Some((across, mirror))
    }
}
