//! Bounds for user data attached to vertices.

use serde::{Serialize, de::DeserializeOwned};
use std::{fmt::Debug, hash::Hash};

/// Trait alias for payloads stored on vertices.
///
/// Payloads are opaque to the triangulation: they are copied into the vertex
/// on insertion, returned unchanged, and serialized alongside the point. `()`
/// is the usual choice when no payload is needed.
///
/// ```rust
/// use simplicial::core::traits::DataType;
///
/// fn label<U: DataType>(payload: U) -> String {
///     format!("{payload:?}")
/// }
///
/// assert_eq!(label(7_u32), "7");
/// assert_eq!(label('a'), "'a'");
/// assert_eq!(label(()), "()");
/// ```
///
/// `String` is not `Copy`; store an integer id and keep the strings in a side table.
pub trait DataType:
    Copy + Eq + Hash + Ord + PartialEq + PartialOrd + Debug + Serialize + DeserializeOwned
{
}

impl<T> DataType for T where
    T: Copy + Eq + Hash + Ord + PartialEq + PartialOrd + Debug + Serialize + DeserializeOwned
{
}
