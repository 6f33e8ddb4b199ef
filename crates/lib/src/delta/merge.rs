//! Recursive merge of a delta tree onto a target instance tree.
//!
//! Properties are resolved by name in the target's own schema, so a delta can
//! be merged onto any instance whose type derives from the delta's structural
//! type. Merges are not transactional; an error leaves earlier writes in place.

use std::sync::Arc;

use crate::{
    Result,
    delta::{Delta, DeltaError},
    record::{Record, RecordType},
    schema::{PropertyAccessor, RecordSchema, schema_for},
    value::Value,
};

/// Remaining nesting budget of a merge.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Depth {
    remaining: usize,
    limit: usize,
}

impl Depth {
    pub(crate) fn new(limit: usize) -> Self {
        Self {
            remaining: limit,
            limit,
        }
    }

    /// Consumes one level for a node of `record_type`.
    fn enter(self, record_type: RecordType) -> std::result::Result<Self, DeltaError> {
        match self.remaining.checked_sub(1) {
            Some(remaining) => Ok(Self { remaining, ..self }),
            None => Err(DeltaError::RecursionLimit {
                record_type: record_type.name().to_string(),
                limit: self.limit,
            }),
        }
    }
}

impl Delta {
    /// Writes every changed property onto `target` (patch semantics).
    ///
    /// Nested deltas are merged into the existing nested value, or
    /// materialized and assigned when the target holds null.
    pub fn copy_changed_values(&self, target: &mut dyn Record) -> Result<()> {
        self.copy_changed_within(target, self.root_depth())
    }

    /// Writes every unchanged updatable property onto `target` and drops
    /// dynamic properties the delta never set.
    pub fn copy_unchanged_values(&self, target: &mut dyn Record) -> Result<()> {
        let target_schema = self.target_schema(target)?;

        for name in self.unchanged_property_names() {
            let value = self.scratch_value(&name)?;
            target_property(&target_schema, &name)?.set(target, value)?;
        }
        if let Some(dynamic) = &self.dynamic {
            dynamic.copy_unchanged(target, &target_schema)?;
        }
        Ok(())
    }

    /// Applies only the changed properties to `target`.
    pub fn patch(&self, target: &mut dyn Record) -> Result<()> {
        tracing::debug!(
            record_type = self.structural_type.name(),
            target = target.record_type().name(),
            changed = self.changed.len(),
            "Patching record"
        );
        self.copy_changed_values(target)
    }

    /// Replaces `target` with the delta: changed properties as set, unchanged
    /// ones from the scratch instance.
    pub fn put(&self, target: &mut dyn Record) -> Result<()> {
        tracing::debug!(
            record_type = self.structural_type.name(),
            target = target.record_type().name(),
            changed = self.changed.len(),
            "Putting record"
        );
        self.copy_changed_values(target)?;
        self.copy_unchanged_values(target)
    }

    /// [`patch`](Self::patch) onto a record held in a [`Value`].
    pub fn patch_value(&self, target: &mut Value) -> Result<()> {
        self.patch(record_target(self.structural_type, target)?)
    }

    /// [`put`](Self::put) onto a record held in a [`Value`].
    pub fn put_value(&self, target: &mut Value) -> Result<()> {
        self.put(record_target(self.structural_type, target)?)
    }

    pub(crate) fn copy_changed_within(&self, target: &mut dyn Record, depth: Depth) -> Result<()> {
        let depth = depth.enter(self.structural_type)?;
        let target_schema = self.target_schema(target)?;

        for name in self.changed_property_names() {
            if !self.changed.contains(&name) {
                continue;
            }
            let value = self.scratch_value(&name)?;
            target_property(&target_schema, &name)?.set(target, value)?;
        }

        if let Some(dynamic) = &self.dynamic {
            dynamic.copy_changed(self.instance.as_ref(), target, &target_schema, depth)?;
        }

        for (name, nested) in self.nested.iter().flatten() {
            let property = target_schema
                .get(name)
                .filter(|property| property.is_nested())
                .ok_or_else(|| DeltaError::NestedPropertyNotFound {
                    property: name.clone(),
                    record_type: target_schema.record_type().name().to_string(),
                })?;

            if let Some(existing) = property.nested_mut(target) {
                nested.copy_changed_within(existing, depth)?;
                continue;
            }
            let instance = nested.materialize(depth)?;
            property.set(target, Value::Record(instance))?;
        }
        Ok(())
    }

    /// Merges this delta onto a copy of its own scratch instance.
    pub(crate) fn materialize(&self, depth: Depth) -> Result<Box<dyn Record>> {
        let mut instance = self.instance.clone_record();
        self.copy_changed_within(instance.as_mut(), depth)?;
        Ok(instance)
    }

    fn root_depth(&self) -> Depth {
        Depth::new(self.options.max_depth())
    }

    /// Schema of `target`'s runtime type, checked to derive from ours.
    fn target_schema(&self, target: &dyn Record) -> Result<Arc<RecordSchema>> {
        let target_type = target.record_type();
        if !target_type.derives_from(self.structural_type) {
            return Err(DeltaError::TypeMismatch {
                expected: self.structural_type.name().to_string(),
                actual: target_type.name().to_string(),
            }
            .into());
        }
        Ok(schema_for(target_type))
    }

    fn scratch_value(&self, name: &str) -> Result<Value> {
        let property = self
            .schema
            .get(name)
            .ok_or_else(|| DeltaError::PropertyNotFound {
                property: name.to_string(),
                record_type: self.structural_type.name().to_string(),
            })?;
        Ok(property.get(self.instance.as_ref())?)
    }
}

fn target_property<'s>(schema: &'s RecordSchema, name: &str) -> Result<&'s PropertyAccessor> {
    let property = schema
        .get(name)
        .ok_or_else(|| DeltaError::PropertyNotFound {
            property: name.to_string(),
            record_type: schema.record_type().name().to_string(),
        })?;
    Ok(property)
}

fn record_target(expected: RecordType, target: &mut Value) -> Result<&mut dyn Record> {
    match target {
        Value::Record(record) => Ok(record.as_mut()),
        Value::Null => Err(DeltaError::ArgumentNull {
            argument: "target".to_string(),
        }
        .into()),
        other => Err(DeltaError::TypeMismatch {
            expected: expected.name().to_string(),
            actual: other.type_name().to_string(),
        }
        .into()),
    }
}
