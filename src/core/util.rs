//! Helper utilities: identifiers, permutation parity, and triangulation
//! validation against the empty-sphere criteria.

pub mod delaunay_validation;
pub mod permutation;
pub mod uuid;

pub use delaunay_validation::*;
pub use permutation::*;
pub use self::uuid::*;
