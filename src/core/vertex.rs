//! Vertices of a triangulation.
//!
//! A [`Vertex`] carries a point, a weight (zero unless the vertex belongs to a
//! regular triangulation), a UUID, the key of one incident cell maintained by
//! the [`Tds`](crate::core::triangulation_data_structure::Tds), and an
//! optional user payload.
//!
//! # Examples
//!
//! ```rust
//! use simplicial::core::vertex::Vertex;
//! use simplicial::{vertex, weighted_vertex};
//!
//! let plain: Vertex<f64, (), 3> = vertex!([1.0, 2.0, 3.0]);
//! let with_data: Vertex<f64, i32, 2> = vertex!([1.0, 2.0], 42);
//! let weighted: Vertex<f64, (), 2> = weighted_vertex!([0.0, 0.0], 0.5);
//! assert_eq!(plain.weight(), 0.0);
//! assert_eq!(with_data.data, Some(42));
//! assert_eq!(weighted.weight(), 0.5);
//! ```

#![forbid(unsafe_code)]

use super::{
    traits::DataType,
    triangulation_data_structure::CellKey,
    util::{UuidValidationError, make_uuid, validate_uuid},
};
use crate::geometry::{
    point::Point,
    traits::coordinate::{Coordinate, CoordinateScalar, CoordinateValidationError},
    weighted_point::WeightedPoint,
};
use serde::{
    Deserialize, Serialize,
    de::{self, IgnoredAny, MapAccess, Visitor},
};
use std::{
    cmp::Ordering,
    fmt::{self, Debug},
    hash::{Hash, Hasher},
    marker::PhantomData,
};
use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur during vertex validation.
///
/// ```rust
/// use simplicial::core::util::UuidValidationError;
/// use simplicial::core::vertex::VertexValidationError;
///
/// let err = VertexValidationError::InvalidUuid {
///     source: UuidValidationError::NilUuid,
/// };
/// assert!(matches!(err, VertexValidationError::InvalidUuid { .. }));
/// ```
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum VertexValidationError {
    /// The point or the weight is not finite.
    #[error("Invalid point: {source}")]
    InvalidPoint {
        /// The underlying coordinate validation error.
        #[from]
        source: CoordinateValidationError,
    },
    /// The UUID is nil or not version 4.
    #[error("Invalid UUID: {source}")]
    InvalidUuid {
        /// The underlying UUID validation error.
        #[from]
        source: UuidValidationError,
    },
}

// =============================================================================
// CONVENIENCE MACROS
// =============================================================================

/// Creates an unweighted vertex from a coordinate array and an optional payload.
///
/// # Panics
///
/// Panics if the coordinates cannot be represented in the scalar type.
///
/// ```rust
/// use simplicial::vertex;
/// use simplicial::core::vertex::Vertex;
///
/// let v1: Vertex<f64, (), 3> = vertex!([1.0, 2.0, 3.0]);
/// let v2: Vertex<f64, i32, 2> = vertex!([0.0, 1.0], 42);
/// ```
#[macro_export]
macro_rules! vertex {
    ($coords:expr) => {
        $crate::core::vertex::VertexBuilder::<_, (), _>::default()
            .point($crate::geometry::point::Point::try_from($coords)
                .expect("Failed to convert coordinates to Point: invalid or out-of-range values"))
            .build()
            .expect("Failed to build vertex")
    };

    ($coords:expr, $data:expr) => {
        $crate::core::vertex::VertexBuilder::default()
            .point($crate::geometry::point::Point::try_from($coords)
                .expect("Failed to convert coordinates to Point: invalid or out-of-range values"))
            .data($data)
            .build()
            .expect("Failed to build vertex with data")
    };
}

/// Creates a weighted vertex for regular triangulations.
///
/// # Panics
///
/// Panics if the coordinates cannot be represented in the scalar type.
///
/// ```rust
/// use simplicial::weighted_vertex;
/// use simplicial::core::vertex::Vertex;
///
/// let v: Vertex<f64, (), 2> = weighted_vertex!([1.0, 1.0], 0.25);
/// let w: Vertex<f64, u8, 2> = weighted_vertex!([1.0, 1.0], 0.25, 7u8);
/// assert_eq!(v.weight(), w.weight());
/// ```
#[macro_export]
macro_rules! weighted_vertex {
    ($coords:expr, $weight:expr) => {
        $crate::core::vertex::VertexBuilder::<_, (), _>::default()
            .point($crate::geometry::point::Point::try_from($coords)
                .expect("Failed to convert coordinates to Point: invalid or out-of-range values"))
            .weight($weight)
            .build()
            .expect("Failed to build weighted vertex")
    };

    ($coords:expr, $weight:expr, $data:expr) => {
        $crate::core::vertex::VertexBuilder::default()
            .point($crate::geometry::point::Point::try_from($coords)
                .expect("Failed to convert coordinates to Point: invalid or out-of-range values"))
            .weight($weight)
            .data($data)
            .build()
            .expect("Failed to build weighted vertex with data")
    };
}

pub use crate::{vertex, weighted_vertex};

// =============================================================================
// VERTEX STRUCT DEFINITION
// =============================================================================

/// A vertex of a triangulation.
///
/// * `T` - coordinate scalar
/// * `U` - payload type (`()` for none)
/// * `D` - ambient dimension
///
/// Equality and hashing use the point and the weight only.
#[derive(Builder, Clone, Copy, Debug)]
pub struct Vertex<T, U, const D: usize>
where
    T: CoordinateScalar,
    U: DataType,
{
    /// Position of the vertex.
    point: Point<T, D>,
    /// Squared radius of the associated sphere; zero for unweighted vertices.
    #[builder(default = "T::zero()")]
    weight: T,
    /// Unique identifier.
    #[builder(setter(skip), default = "make_uuid()")]
    uuid: Uuid,
    /// One cell containing this vertex; maintained by the `Tds`, never serialized.
    #[builder(setter(skip), default = "None")]
    pub(crate) incident_cell: Option<CellKey>,
    /// Optional user payload.
    #[builder(setter(into, strip_option), default)]
    pub data: Option<U>,
}

// =============================================================================
// SERIALIZATION
// =============================================================================

impl<T, U, const D: usize> Serialize for Vertex<T, U, D>
where
    T: CoordinateScalar,
    U: DataType,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let field_count = if self.data.is_some() { 4 } else { 3 };
        let mut state = serializer.serialize_struct("Vertex", field_count)?;
        state.serialize_field("point", &self.point)?;
        state.serialize_field("weight", &self.weight)?;
        state.serialize_field("uuid", &self.uuid)?;
        if self.data.is_some() {
            state.serialize_field("data", &self.data)?;
        }
        state.end()
    }
}

impl<'de, T, U, const D: usize> Deserialize<'de> for Vertex<T, U, D>
where
    T: CoordinateScalar,
    U: DataType,
{
    fn deserialize<De>(deserializer: De) -> Result<Self, De::Error>
    where
        De: serde::Deserializer<'de>,
    {
        struct VertexVisitor<T, U, const D: usize>
        where
            T: CoordinateScalar,
            U: DataType,
        {
            _phantom: PhantomData<(T, U)>,
        }

        impl<'de, T, U, const D: usize> Visitor<'de> for VertexVisitor<T, U, D>
        where
            T: CoordinateScalar,
            U: DataType,
        {
            type Value = Vertex<T, U, D>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a Vertex struct")
            }

            fn visit_map<V>(self, mut map: V) -> Result<Vertex<T, U, D>, V::Error>
            where
                V: MapAccess<'de>,
            {
                let mut point: Option<Point<T, D>> = None;
                let mut weight: Option<T> = None;
                let mut uuid: Option<Uuid> = None;
                let mut data: Option<Option<U>> = None;

                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "point" => {
                            if point.is_some() {
                                return Err(de::Error::duplicate_field("point"));
                            }
                            point = Some(map.next_value()?);
                        }
                        "weight" => {
                            if weight.is_some() {
                                return Err(de::Error::duplicate_field("weight"));
                            }
                            weight = Some(map.next_value()?);
                        }
                        "uuid" => {
                            if uuid.is_some() {
                                return Err(de::Error::duplicate_field("uuid"));
                            }
                            uuid = Some(map.next_value()?);
                        }
                        "data" => {
                            if data.is_some() {
                                return Err(de::Error::duplicate_field("data"));
                            }
                            data = Some(map.next_value()?);
                        }
                        _ => {
                            let _ = map.next_value::<IgnoredAny>()?;
                        }
                    }
                }

                let point = point.ok_or_else(|| de::Error::missing_field("point"))?;
                let uuid = uuid.ok_or_else(|| de::Error::missing_field("uuid"))?;
                validate_uuid(&uuid)
                    .map_err(|e| de::Error::custom(format!("invalid uuid: {e}")))?;
                let vertex = Vertex {
                    point,
                    weight: weight.unwrap_or_else(T::zero),
                    uuid,
                    incident_cell: None,
                    data: data.unwrap_or(None),
                };
                vertex
                    .weighted_point()
                    .validate()
                    .map_err(|e| de::Error::custom(format!("invalid vertex: {e}")))?;
                Ok(vertex)
            }
        }

        const FIELDS: &[&str] = &["point", "weight", "uuid", "data"];
        deserializer.deserialize_struct(
            "Vertex",
            FIELDS,
            VertexVisitor {
                _phantom: PhantomData,
            },
        )
    }
}

// =============================================================================
// VERTEX IMPLEMENTATION
// =============================================================================

impl<T, U, const D: usize> Vertex<T, U, D>
where
    T: CoordinateScalar,
    U: DataType,
{
    /// Unweighted vertices without payload, one per point.
    ///
    /// ```
    /// use simplicial::core::vertex::Vertex;
    /// use simplicial::geometry::point::Point;
    /// use simplicial::geometry::traits::coordinate::Coordinate;
    ///
    /// let vertices: Vec<Vertex<f64, (), 2>> =
    ///     Vertex::from_points(&[Point::new([1.0, 2.0]), Point::new([3.0, 4.0])]);
    /// assert_eq!(vertices.len(), 2);
    /// assert_ne!(vertices[0].uuid(), vertices[1].uuid());
    /// ```
    #[must_use]
    pub fn from_points(points: &[Point<T, D>]) -> Vec<Self> {
        points
            .iter()
            .map(|&point| Self::with_weight(point, T::zero(), None))
            .collect()
    }

    /// Vertex at `point` with the given weight and payload and a fresh UUID.
    #[must_use]
    pub fn with_weight(point: Point<T, D>, weight: T, data: Option<U>) -> Self {
        Self {
            point,
            weight,
            uuid: make_uuid(),
            incident_cell: None,
            data,
        }
    }

    /// The position of the vertex.
    #[inline]
    pub const fn point(&self) -> &Point<T, D> {
        &self.point
    }

    /// The weight of the vertex.
    #[inline]
    pub const fn weight(&self) -> T {
        self.weight
    }

    /// Point and weight as a [`WeightedPoint`].
    #[inline]
    pub const fn weighted_point(&self) -> WeightedPoint<T, D> {
        WeightedPoint::new(self.point, self.weight)
    }

    /// The UUID of the vertex.
    #[inline]
    pub const fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// A cell containing this vertex, if the vertex belongs to a triangulation.
    #[inline]
    pub const fn incident_cell(&self) -> Option<CellKey> {
        self.incident_cell
    }

    /// The ambient dimension `D`.
    #[inline]
    pub const fn dim(&self) -> usize {
        D
    }

    /// Checks that the point and weight are finite and the UUID is a non-nil v4 UUID.
    ///
    /// # Errors
    ///
    /// Returns [`VertexValidationError::InvalidPoint`] or
    /// [`VertexValidationError::InvalidUuid`].
    ///
    /// ```
    /// use simplicial::core::vertex::{Vertex, VertexValidationError};
    /// use simplicial::{vertex, weighted_vertex};
    ///
    /// let ok: Vertex<f64, (), 3> = vertex!([1.0, 2.0, 3.0]);
    /// assert!(ok.is_valid().is_ok());
    /// let bad: Vertex<f64, (), 3> = weighted_vertex!([1.0, 2.0, 3.0], f64::NAN);
    /// assert!(matches!(bad.is_valid(), Err(VertexValidationError::InvalidPoint { .. })));
    /// ```
    pub fn is_valid(&self) -> Result<(), VertexValidationError> {
        self.weighted_point().validate()?;
        validate_uuid(&self.uuid)?;
        Ok(())
    }

    /// Placeholder vertex at the origin, used for the infinite vertex.
    pub(crate) fn sentinel() -> Self {
        Self::with_weight(Point::origin(), T::zero(), None)
    }

    #[cfg(test)]
    pub(crate) fn set_uuid(&mut self, uuid: Uuid) -> Result<(), VertexValidationError> {
        validate_uuid(&uuid)?;
        self.uuid = uuid;
        Ok(())
    }
}

// =============================================================================
// STANDARD TRAIT IMPLEMENTATIONS
// =============================================================================

impl<T, U, const D: usize> PartialEq for Vertex<T, U, D>
where
    T: CoordinateScalar,
    U: DataType,
{
    fn eq(&self, other: &Self) -> bool {
        self.point == other.point && self.weight.ordered_eq(&other.weight)
    }
}

impl<T, U, const D: usize> Eq for Vertex<T, U, D>
where
    T: CoordinateScalar,
    U: DataType,
{
}

impl<T, U, const D: usize> PartialOrd for Vertex<T, U, D>
where
    T: CoordinateScalar,
    U: DataType,
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(
            self.point
                .cmp(&other.point)
                .then_with(|| self.weight.ordered_cmp(&other.weight)),
        )
    }
}

impl<T, U, const D: usize> Hash for Vertex<T, U, D>
where
    T: CoordinateScalar,
    U: DataType,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.point.hash(state);
        self.weight.hash_scalar(state);
    }
}

impl<T, U, const D: usize> From<&Vertex<T, U, D>> for Point<T, D>
where
    T: CoordinateScalar,
    U: DataType,
{
    fn from(vertex: &Vertex<T, U, D>) -> Self {
        vertex.point
    }
}

impl<T, U, const D: usize> From<&Vertex<T, U, D>> for [T; D]
where
    T: CoordinateScalar,
    U: DataType,
{
    fn from(vertex: &Vertex<T, U, D>) -> [T; D] {
        vertex.point.to_array()
    }
}
