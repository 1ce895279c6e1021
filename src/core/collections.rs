//! Collection aliases used throughout the triangulation code.
//!
//! Hash maps and sets use `FxHasher`; per-simplex data lives in
//! [`SmallBuffer`]s with inline capacity for the practical dimension range.

mod aliases;
mod buffers;
mod key_maps;

pub use aliases::*;
pub use buffers::*;
pub use key_maps::*;
