//! Process-wide schema registry.
//!
//! Schemas are keyed by concrete runtime type and live for the rest of the
//! process. Discovery runs outside the lock; when two callers race on the same
//! type the first insertion wins and the duplicate is dropped, which is safe
//! because accessors are stateless and interchangeable.

use std::{
    any::TypeId,
    collections::HashMap,
    sync::{Arc, LazyLock, PoisonError, RwLock},
};

use crate::{
    record::{RecordType, Structured},
    schema::RecordSchema,
};

static SCHEMAS: LazyLock<RwLock<HashMap<TypeId, Arc<RecordSchema>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Returns the schema of `record_type`, discovering it on first use.
pub fn schema_for(record_type: RecordType) -> Arc<RecordSchema> {
    if let Some(schema) = SCHEMAS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&record_type.id())
    {
        return Arc::clone(schema);
    }

    let discovered = Arc::new(RecordSchema::discover(record_type));
    tracing::debug!(
        record_type = record_type.name(),
        properties = discovered.len(),
        "Discovered record schema"
    );

    let mut schemas = SCHEMAS.write().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(schemas.entry(record_type.id()).or_insert(discovered))
}

/// Returns the schema of `T`.
pub fn schema_of<T: Structured>() -> Arc<RecordSchema> {
    schema_for(RecordType::of::<T>())
}

/// Number of record types whose schema has been cached so far.
pub fn cached_schema_count() -> usize {
    SCHEMAS.read().unwrap_or_else(PoisonError::into_inner).len()
}
