//! Vertex identifiers.

use thiserror::Error;
use uuid::Uuid;

/// A vertex identifier that cannot be accepted.
///
/// ```rust
/// use simplicial::core::util::UuidValidationError;
///
/// let err = UuidValidationError::InvalidVersion { found: 1 };
/// assert_eq!(err.to_string(), "UUID is not version 4 (found version 1)");
/// ```
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum UuidValidationError {
    /// All-zero identifier.
    #[error("UUID is nil")]
    NilUuid,
    /// Identifier that was not randomly generated.
    #[error("UUID is not version 4 (found version {found})")]
    InvalidVersion {
        /// The version number found.
        found: usize,
    },
}

/// Checks that `uuid` is a non-nil version 4 identifier.
///
/// # Errors
///
/// Returns [`UuidValidationError::NilUuid`] or [`UuidValidationError::InvalidVersion`].
///
/// ```
/// use simplicial::core::collections::Uuid;
/// use simplicial::core::util::{make_uuid, validate_uuid};
///
/// assert!(validate_uuid(&make_uuid()).is_ok());
/// assert!(validate_uuid(&Uuid::nil()).is_err());
/// ```
pub const fn validate_uuid(uuid: &Uuid) -> Result<(), UuidValidationError> {
    if uuid.is_nil() {
        return Err(UuidValidationError::NilUuid);
    }
    match uuid.get_version_num() {
        4 => Ok(()),
        found => Err(UuidValidationError::InvalidVersion { found }),
    }
}

/// A fresh random (version 4) identifier.
#[must_use]
pub fn make_uuid() -> Uuid {
    Uuid::new_v4()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_uuids_are_unique_and_valid() {
        let a = make_uuid();
        let b = make_uuid();
        assert_ne!(a, b);
        assert_eq!(validate_uuid(&a), Ok(()));
        assert_eq!(a.to_string().len(), 36);
    }

    #[test]
    fn rejected_uuids() {
        assert_eq!(validate_uuid(&Uuid::nil()), Err(UuidValidationError::NilUuid));
        let v1 = Uuid::parse_str("6ba7b810-9dad-11d1-80b4-00c04fd430c8").unwrap();
        assert_eq!(
            validate_uuid(&v1),
            Err(UuidValidationError::InvalidVersion { found: 1 })
        );
    }
}
