//! Structured record types and their runtime identity.
//!
//! Record types implement [`Structured`], which supplies a statically declared
//! property table (see [`SchemaBuilder`]) in place of runtime reflection. Every
//! `Structured` type is also a [`Record`], the object-safe view deltas use to
//! hold, clone and downcast instances whose concrete type is only known at
//! runtime.
//!
//! Inheritance is emulated: a derived type names its base through
//! [`Structured::base_type`] and lifts the base's properties with
//! [`SchemaBuilder::extends`].

use std::{
    any::{Any, TypeId},
    fmt,
    hash::{Hash, Hasher},
};

use crate::schema::{PropertyAccessor, SchemaBuilder};

/// A record type with a statically declared property table.
///
/// # Examples
///
/// ```
/// use deltamerge::{SchemaBuilder, Structured};
///
/// #[derive(Debug, Clone, Default, PartialEq)]
/// struct Person {
///     name: String,
///     age: i64,
/// }
///
/// impl Structured for Person {
///     const TYPE_NAME: &'static str = "Person";
///
///     fn describe(schema: &mut SchemaBuilder<Self>) {
///         schema
///             .field("Name", |p| &p.name, |p| &mut p.name)
///             .field("Age", |p| &p.age, |p| &mut p.age);
///     }
///
///     fn construct() -> Option<Self> {
///         Some(Self::default())
///     }
/// }
/// ```
pub trait Structured: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Human readable type name used in errors and logs.
    const TYPE_NAME: &'static str;

    /// Declares the properties of this type.
    fn describe(schema: &mut SchemaBuilder<Self>);

    /// The default constructor used to allocate scratch instances.
    ///
    /// Types without one cannot back a delta.
    fn construct() -> Option<Self> {
        None
    }

    /// The type this one derives from, if any.
    fn base_type() -> Option<RecordType> {
        None
    }
}

/// Object-safe view of a structured record instance.
///
/// Implemented for every [`Structured`] type; not meant to be implemented by hand.
pub trait Record: Any + fmt::Debug + Send + Sync {
    /// The concrete runtime type of this instance.
    fn record_type(&self) -> RecordType;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    fn clone_record(&self) -> Box<dyn Record>;

    /// Structural equality; false when `other` is of a different concrete type.
    fn eq_record(&self, other: &dyn Record) -> bool;
}

impl<T: Structured> Record for T {
    fn record_type(&self) -> RecordType {
        RecordType::of::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_record(&self) -> Box<dyn Record> {
        Box::new(self.clone())
    }

    fn eq_record(&self, other: &dyn Record) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }
}

/// Runtime identity of a [`Structured`] type.
///
/// Cheap to copy; equality and hashing use the underlying [`TypeId`].
#[derive(Clone, Copy)]
pub struct RecordType {
    id: TypeId,
    name: &'static str,
    base: fn() -> Option<RecordType>,
    construct: fn() -> Option<Box<dyn Record>>,
    describe: fn() -> Vec<PropertyAccessor>,
}

impl RecordType {
    /// Returns the record type of `T`.
    pub fn of<T: Structured>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: T::TYPE_NAME,
            base: T::base_type,
            construct: construct_boxed::<T>,
            describe: declared_properties::<T>,
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The direct base type, if this type derives from another.
    pub fn base(&self) -> Option<RecordType> {
        (self.base)()
    }

    /// Returns true if this type is `other` or derives from it.
    pub fn derives_from(&self, other: RecordType) -> bool {
        let mut current = Some(*self);
        while let Some(record_type) = current {
            if record_type == other {
                return true;
            }
            current = record_type.base();
        }
        false
    }

    /// Returns true if an instance of `other` can stand in for this type.
    pub fn is_assignable_from(&self, other: RecordType) -> bool {
        other.derives_from(*self)
    }

    /// Allocates a fresh instance through the type's default constructor.
    pub fn construct(&self) -> Option<Box<dyn Record>> {
        (self.construct)()
    }

    /// The full declared property table, before eligibility filtering.
    pub(crate) fn declared_properties(&self) -> Vec<PropertyAccessor> {
        (self.describe)()
    }
}

fn construct_boxed<T: Structured>() -> Option<Box<dyn Record>> {
    T::construct().map(|record| Box::new(record) as Box<dyn Record>)
}

pub(crate) fn declared_properties<T: Structured>() -> Vec<PropertyAccessor> {
    let mut schema = SchemaBuilder::<T>::new();
    T::describe(&mut schema);
    schema.into_properties()
}

impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RecordType {}

impl Hash for RecordType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RecordType").field(&self.name).finish()
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
