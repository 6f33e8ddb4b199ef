//!
//! deltamerge: change tracking for partial updates to structured records.
//!
//! A [`Delta`] shadows one record type. Callers set a subset of its properties
//! (plain values, nested deltas for sub-records, or open-ended dynamic
//! properties) and later apply the recorded changes onto a live instance with
//! either patch or put semantics.
//!
//! ## Core Concepts
//!
//! * **Records (`record::Structured`)**: User types that declare their properties
//!   through a static table instead of runtime reflection.
//! * **Schemas (`schema::RecordSchema`)**: The ordered, eligible property accessors
//!   of a record type, discovered once and cached for the life of the process.
//! * **Values (`value::Value`)**: A closed tagged union of everything a property
//!   can hold, including boxed records and dynamic property bags.
//! * **Deltas (`delta::Delta`)**: Tracked edits against a scratch instance, merged
//!   recursively onto targets by `patch` (changed properties only) or `put`
//!   (every known property).
//!
//! ## Example
//!
//! ```
//! use deltamerge::{Delta, DeltaOptions, SchemaBuilder, Structured};
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! struct Person {
//!     name: String,
//!     age: i64,
//! }
//!
//! impl Structured for Person {
//!     const TYPE_NAME: &'static str = "Person";
//!
//!     fn describe(schema: &mut SchemaBuilder<Self>) {
//!         schema
//!             .field("Name", |p| &p.name, |p| &mut p.name)
//!             .field("Age", |p| &p.age, |p| &mut p.age);
//!     }
//!
//!     fn construct() -> Option<Self> {
//!         Some(Self::default())
//!     }
//! }
//!
//! # fn main() -> deltamerge::Result<()> {
//! let mut delta = Delta::with_options::<Person>(DeltaOptions::new().with_updatable(["Name"]))?;
//! assert!(!delta.try_set("Age", 5));
//! assert!(delta.try_set("Name", "Ann"));
//!
//! let mut target = Person { name: "X".into(), age: 1 };
//! delta.patch(&mut target)?;
//! assert_eq!(target, Person { name: "Ann".into(), age: 1 });
//! # Ok(())
//! # }
//! ```

pub mod constants;
pub mod delta;
pub mod record;
pub mod schema;
pub mod value;

pub use delta::{Delta, DeltaError, DeltaOptions, NestedDeltaMut, PropertyRef, PropertyValue};
pub use record::{Record, RecordType, Structured};
pub use schema::{
    Field, PropertyAccessor, PropertyType, RecordSchema, SchemaBuilder, cached_schema_count,
    schema_for, schema_of,
};
pub use value::{DynamicBag, Value, ValueKind};

/// Result type used throughout the deltamerge library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the deltamerge library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured delta errors from the delta module
    #[error(transparent)]
    Delta(delta::DeltaError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Delta(_) => "delta",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error indicates a property was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Delta(delta_err) => delta_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error is type-related.
    pub fn is_type_error(&self) -> bool {
        match self {
            Error::Delta(delta_err) => delta_err.is_type_error(),
            _ => false,
        }
    }

    /// Check if this error is a delta error.
    pub fn is_delta_error(&self) -> bool {
        matches!(self, Error::Delta(_))
    }

    /// Check if this error is a scratch instance construction failure.
    pub fn is_construction_error(&self) -> bool {
        match self {
            Error::Delta(delta_err) => delta_err.is_construction_error(),
            _ => false,
        }
    }

    /// Check if this error concerns a dynamic property bag.
    pub fn is_dynamic_bag_error(&self) -> bool {
        match self {
            Error::Delta(delta_err) => delta_err.is_dynamic_bag_error(),
            _ => false,
        }
    }

    /// Check if this error is the nesting depth guard.
    pub fn is_recursion_limit(&self) -> bool {
        match self {
            Error::Delta(delta_err) => delta_err.is_recursion_limit(),
            _ => false,
        }
    }

    /// Check if this error is a serialization failure.
    pub fn is_serialization_error(&self) -> bool {
        matches!(self, Error::Serialize(_))
    }
}
