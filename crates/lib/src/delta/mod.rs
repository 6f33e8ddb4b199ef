//! Change tracking for one structured record.
//!
//! A [`Delta`] owns a scratch instance of its structural type and records which
//! properties were explicitly set on it. Plain properties, nested deltas and
//! dynamic properties are tracked separately; the merge engine (see
//! [`Delta::patch`] and [`Delta::put`]) later replays them onto a target.
//!
//! A name is tracked either as a changed plain property or as a nested delta,
//! never both. Nested and dynamic bookkeeping is only allocated when the record
//! type has nested record properties or a dynamic property bag.

use std::{
    collections::{BTreeMap, HashSet},
    fmt,
    ops::{Deref, DerefMut},
    sync::Arc,
};

use crate::{
    Result,
    record::{Record, RecordType, Structured},
    schema::{PropertyAccessor, PropertyType, RecordSchema, schema_for},
    value::{DynamicBag, Value, ValueKind},
};

mod dynamic;
pub mod errors;
mod merge;
mod options;

use dynamic::DynamicProperties;
pub use errors::DeltaError;
pub use options::DeltaOptions;

/// A value assigned through [`Delta::try_set`]: either a plain value or a
/// nested delta tracking changes to a sub-record.
#[derive(Debug, Clone)]
pub enum PropertyValue {
    Value(Value),
    Delta(Delta),
}

impl From<Value> for PropertyValue {
    fn from(value: Value) -> Self {
        PropertyValue::Value(value)
    }
}

impl From<Delta> for PropertyValue {
    fn from(delta: Delta) -> Self {
        PropertyValue::Delta(delta)
    }
}

macro_rules! property_value_from {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for PropertyValue {
                fn from(value: $source) -> Self {
                    PropertyValue::Value(Value::from(value))
                }
            }
        )*
    };
}

property_value_from!(bool, i64, i32, u32, f64, String, &str, Vec<Value>, DynamicBag);

/// A property read back through [`Delta::try_get`].
#[derive(Debug, Clone)]
pub enum PropertyRef<'a> {
    Value(Value),
    Delta(&'a Delta),
}

impl<'a> PropertyRef<'a> {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            PropertyRef::Value(value) => Some(value),
            PropertyRef::Delta(_) => None,
        }
    }

    pub fn as_delta(&self) -> Option<&'a Delta> {
        match self {
            PropertyRef::Value(_) => None,
            PropertyRef::Delta(delta) => Some(delta),
        }
    }

    /// Converts into a plain value; nested deltas yield their current instance.
    pub fn into_value(self) -> Value {
        match self {
            PropertyRef::Value(value) => value,
            PropertyRef::Delta(delta) => Value::Record(delta.instance.clone_record()),
        }
    }
}

/// Tracked changes to one structured value.
///
/// # Examples
///
/// ```
/// use deltamerge::{Delta, SchemaBuilder, Structured};
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
///
/// # fn main() -> deltamerge::Result<()> {
/// let mut delta = Delta::new::<Person>()?;
/// assert!(delta.try_set("Age", 5));
///
/// // Put overwrites Name with the scratch instance's default.
/// let mut target = Person { name: "X".into(), age: 1 };
/// delta.put(&mut target)?;
/// assert_eq!(target, Person { name: String::new(), age: 5 });
/// # Ok(())
/// # }
/// ```
pub struct Delta {
    expected_type: RecordType,
    structural_type: RecordType,
    options: DeltaOptions,
    schema: Arc<RecordSchema>,
    instance: Box<dyn Record>,
    updatable: Vec<String>,
    changed: HashSet<String>,
    nested: Option<BTreeMap<String, Delta>>,
    dynamic: Option<DynamicProperties>,
}

impl Delta {
    /// Creates a delta for `T` with default options.
    pub fn new<T: Structured>() -> Result<Self> {
        Self::with_options::<T>(DeltaOptions::default())
    }

    /// Creates a delta for `T`.
    pub fn with_options<T: Structured>(options: DeltaOptions) -> Result<Self> {
        let record_type = RecordType::of::<T>();
        Self::build(record_type, record_type, options)
    }

    /// Creates a delta declared as `T` that edits instances of `structural`.
    ///
    /// Fails with [`DeltaError::TypeMismatch`] unless `structural` is `T` or
    /// derives from it.
    pub fn with_structural_type<T: Structured>(
        structural: RecordType,
        options: DeltaOptions,
    ) -> Result<Self> {
        let expected = RecordType::of::<T>();
        if !expected.is_assignable_from(structural) {
            return Err(DeltaError::TypeMismatch {
                expected: expected.name().to_string(),
                actual: structural.name().to_string(),
            }
            .into());
        }
        Self::build(expected, structural, options)
    }

    /// Creates a delta for a record type only known at runtime.
    pub fn for_record_type(structural: RecordType, options: DeltaOptions) -> Result<Self> {
        Self::build(structural, structural, options)
    }

    fn build(
        expected_type: RecordType,
        structural_type: RecordType,
        options: DeltaOptions,
    ) -> Result<Self> {
        let schema = schema_for(structural_type);
        let mut delta = Self {
            expected_type,
            structural_type,
            options,
            instance: allocate(structural_type)?,
            schema,
            updatable: Vec::new(),
            changed: HashSet::new(),
            nested: None,
            dynamic: None,
        };
        delta.initialize()?;
        Ok(delta)
    }

    /// Discards every tracked change and starts over with a fresh scratch instance.
    ///
    /// The delta is left untouched if the new instance cannot be set up.
    pub fn reset(&mut self) -> Result<()> {
        *self = Self::build(
            self.expected_type,
            self.structural_type,
            self.options.clone(),
        )?;
        Ok(())
    }

    /// Recomputes the bookkeeping for the current scratch instance.
    fn initialize(&mut self) -> Result<()> {
        let dynamic = DynamicProperties::resolve(&self.schema, &self.options)?;

        let restriction = self.options.updatable();
        let bag_name = dynamic.as_ref().map(DynamicProperties::name);
        self.updatable = self
            .schema
            .names()
            .filter(|name| restriction.is_none_or(|names| names.iter().any(|n| n == name)))
            .filter(|name| bag_name != Some(*name))
            .map(str::to_string)
            .collect();

        tracing::trace!(
            record_type = self.structural_type.name(),
            updatable = self.updatable.len(),
            dynamic_bag = bag_name,
            "Initialized delta"
        );

        self.changed.clear();
        self.nested = self
            .schema
            .iter()
            .any(|property| property.is_nested())
            .then(BTreeMap::new);
        self.dynamic = dynamic;
        Ok(())
    }

    /// The statically declared type of this delta.
    pub fn expected_type(&self) -> RecordType {
        self.expected_type
    }

    /// The concrete type being edited.
    pub fn structural_type(&self) -> RecordType {
        self.structural_type
    }

    pub fn options(&self) -> &DeltaOptions {
        &self.options
    }

    /// The scratch instance accumulating edits.
    ///
    /// Nested properties hold a copy of their nested delta's working instance,
    /// refreshed whenever a [`NestedDeltaMut`] guard is dropped.
    pub fn current_instance(&self) -> &dyn Record {
        self.instance.as_ref()
    }

    /// Downcasts the scratch instance to `T`.
    pub fn instance_as<T: Structured>(&self) -> Option<&T> {
        self.instance.as_any().downcast_ref::<T>()
    }

    pub fn updatable_property_names(&self) -> &[String] {
        &self.updatable
    }

    /// Names of plain and nested properties set since the last reset, in
    /// declaration order. Dynamic properties are not included.
    pub fn changed_property_names(&self) -> Vec<String> {
        self.updatable
            .iter()
            .filter(|name| self.is_changed(name))
            .cloned()
            .collect()
    }

    /// Updatable names that have not been set.
    pub fn unchanged_property_names(&self) -> Vec<String> {
        self.updatable
            .iter()
            .filter(|name| self.schema.contains(name) && !self.is_changed(name))
            .cloned()
            .collect()
    }

    /// Dynamic property names set or cleared since the last reset.
    pub fn changed_dynamic_property_names(&self) -> Vec<String> {
        self.dynamic
            .as_ref()
            .map(|dynamic| dynamic.changed_names().map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn has_changes(&self) -> bool {
        !self.changed.is_empty()
            || self.nested.as_ref().is_some_and(|nested| !nested.is_empty())
            || self.dynamic.as_ref().is_some_and(DynamicProperties::has_changes)
    }

    /// Returns true if this type supports nested deltas.
    pub fn has_nested_properties(&self) -> bool {
        self.nested.is_some()
    }

    /// The name of the dynamic property bag, if one is configured.
    pub fn dynamic_bag_name(&self) -> Option<&str> {
        self.dynamic.as_ref().map(DynamicProperties::name)
    }

    /// The nested delta recorded under `name`.
    pub fn nested_delta(&self, name: &str) -> Option<&Delta> {
        self.nested
            .as_ref()
            .and_then(|nested| nested.get(name))
            .or_else(|| self.dynamic.as_ref().and_then(|dynamic| dynamic.delta(name)))
    }

    /// Mutable access to the nested delta recorded under `name`.
    ///
    /// Edits become visible through [`current_instance`](Self::current_instance)
    /// once the returned guard is dropped.
    pub fn nested_delta_mut(&mut self, name: &str) -> Option<NestedDeltaMut<'_>> {
        if let Some(delta) = self.nested.as_mut().and_then(|nested| nested.get_mut(name)) {
            let property = self.schema.get(name)?;
            return Some(NestedDeltaMut {
                delta,
                parent: &mut self.instance,
                slot: NestedSlot::Property(property),
            });
        }
        let (bag, delta) = self.dynamic.as_mut()?.delta_mut(name)?;
        Some(NestedDeltaMut {
            delta,
            parent: &mut self.instance,
            slot: NestedSlot::Dynamic {
                bag,
                name: name.to_string(),
            },
        })
    }

    /// Sets `name` to `value`, returning false if the property cannot take it.
    ///
    /// Failed sets have no side effect.
    pub fn try_set(&mut self, name: &str, value: impl Into<PropertyValue>) -> bool {
        let value = value.into();

        if self.routes_to_dynamic(name) {
            if let Some(dynamic) = self.dynamic.as_mut() {
                return dynamic.set(self.instance.as_mut(), name, value);
            }
        }

        match value {
            PropertyValue::Delta(delta) => self.set_nested(name, delta),
            PropertyValue::Value(value) => self.set_plain(name, value),
        }
    }

    /// Reads `name`: dynamic properties first, then nested deltas, then the
    /// scratch instance.
    pub fn try_get(&self, name: &str) -> Option<PropertyRef<'_>> {
        if let Some(dynamic) = &self.dynamic {
            if let Some(found) = dynamic.get(self.instance.as_ref(), name) {
                return Some(found);
            }
        }
        if let Some(delta) = self.nested.as_ref().and_then(|nested| nested.get(name)) {
            return Some(PropertyRef::Delta(delta));
        }
        let property = self.schema.get(name)?;
        property
            .get(self.instance.as_ref())
            .ok()
            .map(PropertyRef::Value)
    }

    /// The declared type of `name`; dynamic properties are untyped.
    pub fn try_get_property_type(&self, name: &str) -> Option<PropertyType> {
        if let Some(property) = self.schema.get(name) {
            return Some(property.property_type());
        }
        self.dynamic
            .as_ref()
            .filter(|dynamic| dynamic.contains(self.instance.as_ref(), name))
            .map(|_| PropertyType::new(ValueKind::Any).nullable())
    }

    fn is_changed(&self, name: &str) -> bool {
        self.changed.contains(name)
            || self
                .nested
                .as_ref()
                .is_some_and(|nested| nested.contains_key(name))
    }

    fn is_updatable(&self, name: &str) -> bool {
        self.updatable.iter().any(|n| n == name)
    }

    fn routes_to_dynamic(&self, name: &str) -> bool {
        self.dynamic
            .as_ref()
            .is_some_and(|dynamic| dynamic.name() == name || !self.schema.contains(name))
    }

    fn set_nested(&mut self, name: &str, delta: Delta) -> bool {
        let schema = Arc::clone(&self.schema);
        let Some(property) = schema.get(name).filter(|p| p.is_nested()) else {
            return self.reject(name, "not a nested record property");
        };
        if !self.is_updatable(name) {
            return self.reject(name, "not updatable");
        }
        if self.is_changed(name) {
            return self.reject(name, "already set");
        }
        if !property
            .property_type()
            .accepts_record(delta.structural_type)
        {
            return self.reject(name, "nested delta type is not assignable");
        }

        let snapshot = Value::Record(delta.instance.clone_record());
        if property.set(self.instance.as_mut(), snapshot).is_err() {
            return self.reject(name, "nested instance could not be assigned");
        }
        if let Some(nested) = self.nested.as_mut() {
            nested.insert(name.to_string(), delta);
        }
        true
    }

    fn set_plain(&mut self, name: &str, value: Value) -> bool {
        let schema = Arc::clone(&self.schema);
        let Some(property) = schema.get(name) else {
            return self.reject(name, "unknown property");
        };
        if !self.is_updatable(name) {
            return self.reject(name, "not updatable");
        }
        if self
            .nested
            .as_ref()
            .is_some_and(|nested| nested.contains_key(name))
        {
            return self.reject(name, "already set as a nested delta");
        }

        let property_type = property.property_type();
        if value.is_null() {
            if !property_type.is_nullable() {
                return self.reject(name, "null is not accepted");
            }
        } else if !property_type.is_collection() && !property_type.accepts(&value) {
            return self.reject(name, "value is not assignable");
        }

        if property.set(self.instance.as_mut(), value).is_err() {
            return self.reject(name, "value could not be written");
        }
        self.changed.insert(name.to_string());
        true
    }

    fn reject(&self, name: &str, reason: &str) -> bool {
        tracing::trace!(
            record_type = self.structural_type.name(),
            property = name,
            reason,
            "Rejected property set"
        );
        false
    }
}

/// Mutable access to a nested delta, returned by [`Delta::nested_delta_mut`].
///
/// Dropping the guard writes the nested delta's working instance back into the
/// parent's scratch instance.
pub struct NestedDeltaMut<'a> {
    delta: &'a mut Delta,
    parent: &'a mut Box<dyn Record>,
    slot: NestedSlot<'a>,
}

enum NestedSlot<'a> {
    Property(&'a PropertyAccessor),
    Dynamic {
        bag: &'a PropertyAccessor,
        name: String,
    },
}

impl Deref for NestedDeltaMut<'_> {
    type Target = Delta;

    fn deref(&self) -> &Delta {
        self.delta
    }
}

impl DerefMut for NestedDeltaMut<'_> {
    fn deref_mut(&mut self) -> &mut Delta {
        self.delta
    }
}

impl fmt::Debug for NestedDeltaMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NestedDeltaMut").field(&self.delta).finish()
    }
}

impl Drop for NestedDeltaMut<'_> {
    fn drop(&mut self) {
        let instance = Value::Record(self.delta.instance.clone_record());
        match &self.slot {
            NestedSlot::Property(property) => {
                if let Err(err) = property.set(self.parent.as_mut(), instance) {
                    tracing::trace!(
                        property = property.name(),
                        error = %err,
                        "Nested instance was not written back"
                    );
                }
            }
            NestedSlot::Dynamic { bag, name } => {
                if let Some(Some(entries)) = bag.bag_mut(self.parent.as_mut()) {
                    entries.insert(name.clone(), instance);
                }
            }
        }
    }
}

fn allocate(record_type: RecordType) -> Result<Box<dyn Record>> {
    record_type.construct().ok_or_else(|| {
        DeltaError::ConstructionFailed {
            record_type: record_type.name().to_string(),
            reason: "no default constructor".to_string(),
        }
        .into()
    })
}

impl Clone for Delta {
    fn clone(&self) -> Self {
        Self {
            expected_type: self.expected_type,
            structural_type: self.structural_type,
            options: self.options.clone(),
            schema: Arc::clone(&self.schema),
            instance: self.instance.clone_record(),
            updatable: self.updatable.clone(),
            changed: self.changed.clone(),
            nested: self.nested.clone(),
            dynamic: self.dynamic.clone(),
        }
    }
}

impl fmt::Debug for Delta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delta")
            .field("structural_type", &self.structural_type)
            .field("instance", &self.instance)
            .field("changed", &self.changed_property_names())
            .field("nested", &self.nested)
            .field("dynamic", &self.dynamic)
            .finish()
    }
}
