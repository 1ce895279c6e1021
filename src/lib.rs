//! # simplicial
//!
//! Incremental Delaunay and regular triangulations of points in `d`
//! dimensions, built on a combinatorial triangulation data structure that is
//! closed by a single vertex at infinity.
//!
//! # Features
//!
//! - Delaunay triangulations in any dimension, including degenerate inputs
//!   that span only a lower-dimensional affine subspace
//! - Regular (weighted Delaunay) triangulations with hidden points
//! - Point location by a randomized visibility walk
//! - Vertex insertion and removal, and bistellar flips
//! - A fast floating-point kernel and an adaptive-tolerance robust kernel
//! - Copy-able data attached to vertices and cells
//! - Serialization of points and options with [serde](https://serde.rs)
//!
//! # Basic Usage
//!
//! ```rust
//! use simplicial::prelude::*;
//!
//! let vertices = [
//!     vertex!([0.0, 0.0, 0.0, 0.0]),
//!     vertex!([1.0, 0.0, 0.0, 0.0]),
//!     vertex!([0.0, 1.0, 0.0, 0.0]),
//!     vertex!([0.0, 0.0, 1.0, 0.0]),
//!     vertex!([0.0, 0.0, 0.0, 1.0]),
//!     vertex!([0.2, 0.2, 0.2, 0.2]),
//! ];
//! let dt: DelaunayTriangulation<FastKernel<f64>, (), (), 4> =
//!     DelaunayTriangulation::from_vertices(&vertices).unwrap();
//!
//! assert_eq!(dt.number_of_vertices(), 6);
//! assert_eq!(dt.dim(), 4);
//! assert_eq!(dt.number_of_finite_cells(), 5);
//! assert!(dt.is_valid().is_ok());
//! assert!(dt.validate_delaunay().is_ok());
//! ```
//!
//! Points are inserted one at a time. The triangulation is valid after every
//! insertion, and its dimension grows from `-1` (empty) up to `D` as the
//! points stop being affinely dependent:
//!
//! ```rust
//! use simplicial::prelude::*;
//!
//! let mut dt: DelaunayTriangulation<FastKernel<f64>, (), (), 3> = DelaunayTriangulation::new();
//! assert_eq!(dt.dim(), -1);
//! dt.insert(vertex!([0.0, 0.0, 0.0])).unwrap();
//! dt.insert(vertex!([1.0, 0.0, 0.0])).unwrap();
//! assert_eq!(dt.dim(), 1);
//! dt.insert(vertex!([0.0, 1.0, 0.0])).unwrap();
//! assert_eq!(dt.dim(), 2);
//! ```
//!
//! # Point Location
//!
//! ```rust
//! use simplicial::prelude::*;
//!
//! let dt: DelaunayTriangulation<FastKernel<f64>, (), (), 2> = DelaunayTriangulation::from_vertices(&[
//!     vertex!([0.0, 0.0]),
//!     vertex!([2.0, 0.0]),
//!     vertex!([0.0, 2.0]),
//! ])
//! .unwrap();
//!
//! assert!(matches!(
//!     dt.locate(&Point::new([0.5, 0.5])).unwrap(),
//!     LocateResult::InsideCell(_)
//! ));
//! assert!(matches!(
//!     dt.locate(&Point::new([5.0, 5.0])).unwrap(),
//!     LocateResult::OutsideConvexHull(_)
//! ));
//! ```
//!
//! # Regular Triangulations
//!
//! ```rust
//! use simplicial::prelude::*;
//!
//! let mut rt: RegularTriangulation<RobustKernel<f64>, (), (), 2> = RegularTriangulation::new();
//! for p in [[0.0, 0.0], [4.0, 0.0], [0.0, 4.0]] {
//!     rt.insert(weighted_vertex!(p, 1.0)).unwrap();
//! }
//! assert_eq!(rt.insert(weighted_vertex!([1.0, 1.0], -20.0)).unwrap(), None);
//! assert!(rt.validate_regular().is_ok());
//! ```
//!
//! # Logging
//!
//! Diagnostics are emitted through [`tracing`]. Install any subscriber to
//! see walk fallbacks, conflict-region sizes, and flip statistics.

// Forbid unsafe code throughout the entire crate
#![forbid(unsafe_code)]

#[macro_use]
extern crate derive_builder;

/// Combinatorial structures and the triangulation algorithms built on them.
///
/// The [`Tds`](core::triangulation_data_structure::Tds) stores vertices and
/// cells, [`Triangulation`](core::triangulation::Triangulation) pairs it with
/// a geometric kernel, and the Delaunay and regular layers maintain the
/// empty-sphere property on top.
pub mod core {
    /// Triangulation algorithms for construction, maintenance, and querying
    pub mod algorithms {
        /// Bistellar flips and Lawson flipping
        pub mod flips;
        /// Incremental insertion by hole filling
        pub mod incremental_insertion;
        /// Point location (visibility walk) and conflict regions
        pub mod locate;
        /// Vertex removal with star re-triangulation
        pub mod removal;
    }
    pub mod cell;
    /// High-performance collection types optimized for computational geometry
    pub mod collections;
    /// Delaunay triangulation layer
    pub mod delaunay_triangulation;
    pub mod facet;
    /// Regular (weighted) triangulation layer
    pub mod regular_triangulation;
    /// Generic triangulation combining kernel + Tds
    pub mod triangulation;
    pub mod triangulation_data_structure;
    pub mod util;
    pub mod vertex;
    /// Traits for triangulation data structures.
    pub mod traits {
        pub mod data_type;
        pub use data_type::*;
    }
    // Re-export the `core` modules.
    pub use cell::*;
    pub use delaunay_triangulation::*;
    pub use facet::*;
    pub use regular_triangulation::*;
    pub use traits::*;
    pub use triangulation::*;
    pub use triangulation_data_structure::*;
    pub use vertex::*;
    // Note: collections and util are not re-exported here to avoid namespace pollution
}

/// Contains geometric types including the `Point` struct and geometry predicates.
///
/// The geometry module provides a coordinate abstraction through the `Coordinate` trait
/// that unifies coordinate operations across different storage mechanisms. The `Point`
/// type implements this abstraction, providing generic floating-point coordinate support
/// (for `f32`, `f64`, and other types implementing `CoordinateScalar`) with proper NaN
/// handling, validation, and hashing.
pub mod geometry {
    /// Affine hull tracking for lower-dimensional point sets
    pub mod affine_hull;
    /// Geometric kernel abstraction (CGAL-style)
    pub mod kernel;
    pub mod point;
    pub mod predicates;
    /// Enhanced predicates with improved numerical robustness
    pub mod robust_predicates;
    /// Geometric utility functions for d-dimensional geometry calculations
    pub mod util;
    /// Points carrying a weight for regular triangulations
    pub mod weighted_point;
    /// Traits module containing coordinate abstractions and reusable trait definitions.
    ///
    /// This module contains the core `Coordinate` trait that abstracts coordinate
    /// operations, along with supporting traits for validation (`FiniteCheck`),
    /// equality comparison (`OrderedEq`), and hashing (`HashCoordinate`) of
    /// floating-point coordinate values.
    pub mod traits {
        pub mod coordinate;
        pub use coordinate::*;
    }
    pub use kernel::*;
    pub use point::*;
    pub use predicates::*;
    pub use traits::*;
    pub use weighted_point::*;
}

/// A prelude module that re-exports commonly used types and macros.
/// This makes it easier to import the most commonly used items from the crate.
pub mod prelude {
    // Re-export from core
    pub use crate::core::{
        algorithms::{
            flips::{FlipError, FlipStatistics},
            incremental_insertion::{InsertionError, InsertionOutcome, InsertionStrategy},
            locate::{ConflictError, LocateError, LocateOptions, LocateResult},
            removal::RemovalError,
        },
        cell::{Cell, CellValidationError},
        delaunay_triangulation::DelaunayTriangulation,
        facet::{FacetError, FacetHandle, FacetView},
        regular_triangulation::RegularTriangulation,
        traits::data_type::DataType,
        triangulation::{SpherePredicate, Triangulation},
        triangulation_data_structure::{
            CellKey, Tds, TdsError, TriangulationValidationError, ValidationOptions, VertexKey,
        },
        vertex::{Vertex, VertexValidationError},
    };

    // Re-export commonly used collection types from core::collections
    pub use crate::core::collections::{CellKeyBuffer, FastHashMap, FastHashSet, SmallBuffer};

    // Re-export from geometry
    pub use crate::geometry::{
        kernel::{FastKernel, Kernel, RobustKernel},
        point::Point,
        predicates::{InSphere, Orientation},
        robust_predicates::{RobustPredicateConfig, config_presets},
        traits::coordinate::{Coordinate, CoordinateConversionError, CoordinateScalar},
        util::generate_random_points_seeded,
        weighted_point::WeightedPoint,
    };

    // Convenience macros
    pub use crate::{vertex, weighted_vertex};
}

/// The function `is_normal` checks that structs implement `auto` traits.
/// Traits are checked at compile time, so this function is only used for
/// testing.
#[must_use]
pub const fn is_normal<T: Sized + Send + Sync + Unpin>() -> bool {
    true
}

// =============================================================================
// TESTS
// =============================================================================
