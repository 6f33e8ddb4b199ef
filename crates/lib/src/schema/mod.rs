//! Property schemas for structured record types.
//!
//! A record type's schema is its ordered collection of eligible
//! [`PropertyAccessor`]s: properties that are readable and either writable or
//! collections mutated in place. Schemas are computed once per type from the
//! table declared in [`Structured::describe`](crate::Structured::describe) and
//! memoized in a process-wide registry (see [`schema_for`]).

use std::collections::HashMap;

use crate::{
    record::RecordType,
    value::{Value, ValueKind},
};

pub mod accessor;
mod builder;
mod cache;
mod field;

pub use accessor::PropertyAccessor;
pub use builder::SchemaBuilder;
pub use cache::{cached_schema_count, schema_for, schema_of};
pub use field::Field;

/// Declared type of a record property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyType {
    kind: ValueKind,
    nullable: bool,
    collection: bool,
}

impl PropertyType {
    /// A non-nullable scalar or record type.
    pub const fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            nullable: false,
            collection: false,
        }
    }

    /// A non-nullable collection type.
    pub const fn collection(kind: ValueKind) -> Self {
        Self {
            kind,
            nullable: false,
            collection: true,
        }
    }

    /// The same type, accepting null.
    pub const fn nullable(self) -> Self {
        Self {
            nullable: true,
            ..self
        }
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_collection(&self) -> bool {
        self.collection
    }

    /// Returns true if `value` is assignment-compatible with this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self.kind, value) {
            (_, Value::Null) => self.nullable,
            (ValueKind::Any, _) => true,
            (ValueKind::Record(declared), Value::Record(record)) => {
                record.record_type().derives_from(declared)
            }
            (kind, value) => kind == value.kind(),
        }
    }

    /// Returns true if instances of `record_type` can be assigned to this type.
    pub fn accepts_record(&self, record_type: RecordType) -> bool {
        match self.kind {
            ValueKind::Record(declared) => record_type.derives_from(declared),
            ValueKind::Any => true,
            _ => false,
        }
    }
}

/// The eligible properties of one record type, in declaration order.
#[derive(Debug)]
pub struct RecordSchema {
    record_type: RecordType,
    properties: Vec<PropertyAccessor>,
    index: HashMap<String, usize>,
    dynamic_bag: Option<usize>,
}

impl RecordSchema {
    /// Computes the schema from the type's declared property table.
    pub(crate) fn discover(record_type: RecordType) -> Self {
        let properties: Vec<PropertyAccessor> = record_type
            .declared_properties()
            .into_iter()
            .filter(PropertyAccessor::is_eligible)
            .collect();
        let index = properties
            .iter()
            .enumerate()
            .map(|(position, property)| (property.name().to_string(), position))
            .collect();
        let dynamic_bag = properties.iter().position(PropertyAccessor::is_dynamic_bag);

        Self {
            record_type,
            properties,
            index,
            dynamic_bag,
        }
    }

    pub fn record_type(&self) -> RecordType {
        self.record_type
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&PropertyAccessor> {
        self.index.get(name).map(|&position| &self.properties[position])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertyAccessor> {
        self.properties.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(PropertyAccessor::name)
    }

    /// The first declared dynamic property bag, if the type is open.
    pub fn dynamic_bag(&self) -> Option<&PropertyAccessor> {
        self.dynamic_bag.map(|position| &self.properties[position])
    }
}
