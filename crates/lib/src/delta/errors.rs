//! Error types for delta construction and merging.
//!
//! Malformed property sets never produce these errors; `try_set` reports them
//! as a `false` return instead. The variants here cover structural problems
//! discovered while constructing a delta or merging it onto a target. Merges
//! are not transactional: writes applied before the failing step remain on
//! the target.

use thiserror::Error;

/// Structured error types for delta operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DeltaError {
    /// A required argument was missing
    #[error("Required argument is missing: {argument}")]
    ArgumentNull { argument: String },

    /// The delta and the target (or a value and its declared type) are incompatible
    #[error("Type mismatch: expected {expected}, found {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// A scratch instance could not be allocated
    #[error("Cannot construct an instance of {record_type}: {reason}")]
    ConstructionFailed { record_type: String, reason: String },

    /// The target type lacks a property the delta recorded as nested
    #[error("Nested property {property} not found on {record_type}")]
    NestedPropertyNotFound {
        property: String,
        record_type: String,
    },

    /// The target type lacks a property the delta needs to write
    #[error("Property {property} not found on {record_type}")]
    PropertyNotFound {
        property: String,
        record_type: String,
    },

    /// A dynamic property bag must be created but its property cannot be written
    #[error("Dynamic property bag {property} is absent and cannot be created")]
    ImmutableDynamicBag { property: String },

    /// A property without a setter was written
    #[error("Property {property} is read-only")]
    ReadOnlyProperty { property: String },

    /// The property selected as dynamic bag is not declared as one
    #[error("Property {property} is not a dynamic property bag of {record_type}")]
    InvalidDynamicBag {
        property: String,
        record_type: String,
    },

    /// The nested delta tree is deeper than the configured limit
    #[error("Nested delta depth exceeds the limit of {limit} at {record_type}")]
    RecursionLimit { record_type: String, limit: usize },
}

impl DeltaError {
    /// Check if this error is a type incompatibility
    pub fn is_type_error(&self) -> bool {
        matches!(self, DeltaError::TypeMismatch { .. })
    }

    /// Check if this error indicates a missing property
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DeltaError::NestedPropertyNotFound { .. } | DeltaError::PropertyNotFound { .. }
        )
    }

    /// Check if this error is a construction failure
    pub fn is_construction_error(&self) -> bool {
        matches!(self, DeltaError::ConstructionFailed { .. })
    }

    /// Check if this error concerns the dynamic property bag
    pub fn is_dynamic_bag_error(&self) -> bool {
        matches!(
            self,
            DeltaError::ImmutableDynamicBag { .. } | DeltaError::InvalidDynamicBag { .. }
        )
    }

    /// Check if this error is the nesting depth guard
    pub fn is_recursion_limit(&self) -> bool {
        matches!(self, DeltaError::RecursionLimit { .. })
    }

    /// Get the property name if this is a property-related error
    pub fn property(&self) -> Option<&str> {
        match self {
            DeltaError::NestedPropertyNotFound { property, .. }
            | DeltaError::PropertyNotFound { property, .. }
            | DeltaError::ImmutableDynamicBag { property }
            | DeltaError::ReadOnlyProperty { property }
            | DeltaError::InvalidDynamicBag { property, .. } => Some(property),
            _ => None,
        }
    }
}

// Conversion from DeltaError to the main Error type
impl From<DeltaError> for crate::Error {
    fn from(err: DeltaError) -> Self {
        crate::Error::Delta(err)
    }
}
