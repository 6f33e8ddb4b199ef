//! Bridge to a record's open-ended dynamic property bag.
//!
//! Values set on a delta are stored directly in the scratch instance's bag. A
//! null value is kept as a removal marker that takes effect on merge. Nested
//! deltas assigned to dynamic names are kept aside and materialized on merge;
//! the bag holds a snapshot of their instance in the meantime.

use std::collections::{BTreeMap, BTreeSet};

use crate::{
    Result,
    delta::{
        Delta, DeltaError, DeltaOptions, PropertyRef, PropertyValue, merge::Depth,
        options::DynamicBagSelection,
    },
    record::Record,
    schema::{PropertyAccessor, RecordSchema},
    value::{DynamicBag, Value},
};

#[derive(Debug, Clone)]
pub(crate) struct DynamicProperties {
    accessor: PropertyAccessor,
    changed: BTreeSet<String>,
    deltas: BTreeMap<String, Delta>,
}

impl DynamicProperties {
    /// Picks the bag accessor selected by `options`, if any.
    pub(crate) fn resolve(schema: &RecordSchema, options: &DeltaOptions) -> Result<Option<Self>> {
        let accessor = match options.dynamic_bag() {
            DynamicBagSelection::Disabled => None,
            DynamicBagSelection::Declared => schema.dynamic_bag(),
            DynamicBagSelection::Named(name) => Some(
                schema
                    .get(name)
                    .filter(|property| property.is_dynamic_bag())
                    .ok_or_else(|| DeltaError::InvalidDynamicBag {
                        property: name.clone(),
                        record_type: schema.record_type().name().to_string(),
                    })?,
            ),
        };

        Ok(accessor.map(|accessor| Self {
            accessor: accessor.clone(),
            changed: BTreeSet::new(),
            deltas: BTreeMap::new(),
        }))
    }

    pub(crate) fn name(&self) -> &str {
        self.accessor.name()
    }

    pub(crate) fn changed_names(&self) -> impl Iterator<Item = &str> {
        self.changed.iter().map(String::as_str)
    }

    pub(crate) fn has_changes(&self) -> bool {
        !self.changed.is_empty()
    }

    pub(crate) fn delta(&self, name: &str) -> Option<&Delta> {
        self.deltas.get(name)
    }

    /// The dynamic nested delta under `name`, with the bag accessor holding it.
    pub(crate) fn delta_mut(&mut self, name: &str) -> Option<(&PropertyAccessor, &mut Delta)> {
        let delta = self.deltas.get_mut(name)?;
        Some((&self.accessor, delta))
    }

    pub(crate) fn contains(&self, instance: &dyn Record, name: &str) -> bool {
        self.deltas.contains_key(name)
            || self
                .bag(instance)
                .is_some_and(|bag| bag.contains_key(name))
    }

    fn bag<'a>(&self, instance: &'a dyn Record) -> Option<&'a DynamicBag> {
        self.accessor.bag_ref(instance).and_then(Option::as_ref)
    }

    /// Stores `value` under `name` in the scratch instance's bag, attaching an
    /// empty bag first if needed.
    ///
    /// Returns false when the bag is absent and cannot be attached.
    pub(crate) fn set(
        &mut self,
        instance: &mut dyn Record,
        name: &str,
        value: PropertyValue,
    ) -> bool {
        let can_attach = self.accessor.can_write();
        let Some(slot) = self.accessor.bag_mut(instance) else {
            return false;
        };
        if slot.is_none() && !can_attach {
            tracing::trace!(
                property = name,
                dynamic_bag = self.accessor.name(),
                "Rejected dynamic property set: bag is absent and read-only"
            );
            return false;
        }
        let bag = slot.get_or_insert_with(DynamicBag::new);

        match value {
            PropertyValue::Value(value) => {
                tracing::trace!(property = name, null = value.is_null(), "Set dynamic property");
                bag.insert(name.to_string(), value);
                self.deltas.remove(name);
            }
            PropertyValue::Delta(delta) => {
                tracing::trace!(
                    property = name,
                    record_type = delta.structural_type().name(),
                    "Set dynamic nested delta"
                );
                bag.insert(
                    name.to_string(),
                    Value::Record(delta.current_instance().clone_record()),
                );
                self.deltas.insert(name.to_string(), delta);
            }
        }
        self.changed.insert(name.to_string());
        true
    }

    pub(crate) fn get<'a>(
        &'a self,
        instance: &'a dyn Record,
        name: &str,
    ) -> Option<PropertyRef<'a>> {
        if let Some(delta) = self.deltas.get(name) {
            return Some(PropertyRef::Delta(delta));
        }
        self.bag(instance)
            .and_then(|bag| bag.get(name))
            .map(|value| PropertyRef::Value(value.clone()))
    }

    /// Merges the changed dynamic entries onto `target`'s bag.
    ///
    /// Starts from a copy of the target's existing entries; null values remove
    /// their key and nested deltas are materialized.
    pub(crate) fn copy_changed(
        &self,
        scratch: &dyn Record,
        target: &mut dyn Record,
        target_schema: &RecordSchema,
        depth: Depth,
    ) -> Result<()> {
        if self.changed.is_empty() {
            return Ok(());
        }
        let accessor = self.target_accessor(target_schema)?;

        let mut working = bag_of(accessor, target).cloned().unwrap_or_default();
        let source = self.bag(scratch);
        for name in &self.changed {
            if let Some(delta) = self.deltas.get(name) {
                let instance = delta.materialize(depth)?;
                working.insert(name.clone(), Value::Record(instance));
                continue;
            }
            match source.and_then(|bag| bag.get(name)) {
                Some(Value::Null) | None => {
                    working.remove(name);
                }
                Some(value) => {
                    working.insert(name.clone(), value.clone());
                }
            }
        }

        let has_bag = bag_of(accessor, target).is_some();
        if has_bag {
            if let Some(Some(bag)) = accessor.bag_mut(target) {
                bag.clear();
                bag.extend(working);
            }
        } else if !working.is_empty() {
            if !accessor.can_write() {
                return Err(DeltaError::ImmutableDynamicBag {
                    property: self.name().to_string(),
                }
                .into());
            }
            accessor.set(target, Value::Map(working))?;
        }

        tracing::trace!(
            property = self.name(),
            changed = self.changed.len(),
            "Merged changed dynamic properties"
        );
        Ok(())
    }

    /// Removes every key of `target`'s bag that was not set on the delta.
    pub(crate) fn copy_unchanged(
        &self,
        target: &mut dyn Record,
        target_schema: &RecordSchema,
    ) -> Result<()> {
        let accessor = self.target_accessor(target_schema)?;
        if let Some(Some(bag)) = accessor.bag_mut(target) {
            let before = bag.len();
            bag.retain(|name, _| self.changed.contains(name));
            tracing::trace!(
                property = self.name(),
                removed = before - bag.len(),
                "Removed unchanged dynamic properties"
            );
        }
        Ok(())
    }

    /// The bag with the same name on the target's own type.
    fn target_accessor<'s>(&self, target_schema: &'s RecordSchema) -> Result<&'s PropertyAccessor> {
        let accessor = target_schema
            .get(self.name())
            .filter(|property| property.is_dynamic_bag())
            .ok_or_else(|| DeltaError::InvalidDynamicBag {
                property: self.name().to_string(),
                record_type: target_schema.record_type().name().to_string(),
            })?;
        Ok(accessor)
    }
}

fn bag_of<'a>(accessor: &PropertyAccessor, instance: &'a dyn Record) -> Option<&'a DynamicBag> {
    accessor.bag_ref(instance).and_then(Option::as_ref)
}
