//! Type-erased access to a single declared property.

use std::{fmt, sync::Arc};

use crate::{
    delta::DeltaError,
    record::Record,
    schema::PropertyType,
    value::{DynamicBag, Value},
};

pub(crate) type ReadFn = Arc<dyn Fn(&dyn Record) -> Option<Value> + Send + Sync>;
/// Returns false when the instance has the wrong type or the value does not convert.
pub(crate) type WriteFn = Arc<dyn Fn(&mut dyn Record, Value) -> bool + Send + Sync>;
pub(crate) type ProjectFn = Arc<dyn Fn(&dyn Record) -> Option<&dyn Record> + Send + Sync>;
pub(crate) type RecordMutFn = Arc<dyn Fn(&mut dyn Record) -> Option<&mut dyn Record> + Send + Sync>;
pub(crate) type BagRefFn = Arc<dyn Fn(&dyn Record) -> Option<&Option<DynamicBag>> + Send + Sync>;
pub(crate) type BagMutFn =
    Arc<dyn Fn(&mut dyn Record) -> Option<&mut Option<DynamicBag>> + Send + Sync>;

// Constructors pin down the higher-ranked signatures closures cannot infer on their own.

pub(crate) fn project_fn<F>(f: F) -> ProjectFn
where
    F: Fn(&dyn Record) -> Option<&dyn Record> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn record_mut_fn<F>(f: F) -> RecordMutFn
where
    F: Fn(&mut dyn Record) -> Option<&mut dyn Record> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn bag_ref_fn<F>(f: F) -> BagRefFn
where
    F: Fn(&dyn Record) -> Option<&Option<DynamicBag>> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn bag_mut_fn<F>(f: F) -> BagMutFn
where
    F: Fn(&mut dyn Record) -> Option<&mut Option<DynamicBag>> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Clone)]
pub(crate) struct BagAccess {
    pub(crate) get: BagRefFn,
    pub(crate) get_mut: BagMutFn,
}

/// Get/set/copy access to one property of a record type.
///
/// Accessors are stateless beyond the property they are bound to and are
/// shared freely between deltas through the schema cache. Operations take
/// `&dyn Record`; passing an instance of an unrelated type yields
/// [`DeltaError::TypeMismatch`].
#[derive(Clone)]
pub struct PropertyAccessor {
    name: String,
    property_type: PropertyType,
    read: ReadFn,
    write: Option<WriteFn>,
    /// Replaces a collection's contents without reassigning the slot.
    refill: Option<WriteFn>,
    nested: Option<RecordMutFn>,
    bag: Option<BagAccess>,
}

impl PropertyAccessor {
    pub(crate) fn new(name: &str, property_type: PropertyType, read: ReadFn) -> Self {
        Self {
            name: name.to_string(),
            property_type,
            read,
            write: None,
            refill: None,
            nested: None,
            bag: None,
        }
    }

    pub(crate) fn with_write(mut self, write: WriteFn) -> Self {
        self.write = Some(write);
        self
    }

    pub(crate) fn with_refill(mut self, refill: WriteFn) -> Self {
        self.refill = Some(refill);
        self
    }

    pub(crate) fn with_nested(mut self, nested: RecordMutFn) -> Self {
        self.nested = Some(nested);
        self
    }

    pub(crate) fn with_bag(mut self, bag: BagAccess) -> Self {
        self.bag = Some(bag);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn property_type(&self) -> PropertyType {
        self.property_type
    }

    /// Whether the property slot can be reassigned.
    pub fn can_write(&self) -> bool {
        self.write.is_some()
    }

    pub fn is_collection(&self) -> bool {
        self.property_type.is_collection()
    }

    /// Whether the property holds a nested record that can be merged in place.
    pub fn is_nested(&self) -> bool {
        self.nested.is_some()
    }

    /// Whether the property is an open-ended dynamic property bag.
    pub fn is_dynamic_bag(&self) -> bool {
        self.bag.is_some()
    }

    /// Readable, and either writable or a collection mutated in place.
    pub fn is_eligible(&self) -> bool {
        self.can_write() || (self.is_collection() && self.refill.is_some())
    }

    /// Reads the property value from `instance`.
    pub fn get(&self, instance: &dyn Record) -> Result<Value, DeltaError> {
        (self.read)(instance).ok_or_else(|| DeltaError::TypeMismatch {
            expected: self.property_type.kind().to_string(),
            actual: instance.record_type().name().to_string(),
        })
    }

    /// Writes `value` onto `instance`.
    ///
    /// Collections without a setter have their contents replaced in place.
    pub fn set(&self, instance: &mut dyn Record, value: Value) -> Result<(), DeltaError> {
        let actual = value.kind().to_string();
        let write = match (&self.write, &self.refill) {
            (Some(write), _) => write,
            (None, Some(refill)) => refill,
            (None, None) => {
                return Err(DeltaError::ReadOnlyProperty {
                    property: self.name.clone(),
                });
            }
        };
        if write(instance, value) {
            Ok(())
        } else {
            Err(DeltaError::TypeMismatch {
                expected: self.property_type.kind().to_string(),
                actual,
            })
        }
    }

    /// Copies the property value from one instance to another of the same type.
    pub fn copy(&self, from: &dyn Record, to: &mut dyn Record) -> Result<(), DeltaError> {
        let value = self.get(from)?;
        self.set(to, value)
    }

    /// Mutable access to a nested record held by this property.
    ///
    /// Returns `None` when the property is not a record property or its value is null.
    pub fn nested_mut<'a>(&self, instance: &'a mut dyn Record) -> Option<&'a mut dyn Record> {
        let nested = self.nested.as_ref()?;
        nested(instance)
    }

    /// Borrows the bag slot of a dynamic bag property.
    pub fn bag_ref<'a>(&self, instance: &'a dyn Record) -> Option<&'a Option<DynamicBag>> {
        let bag = self.bag.as_ref()?;
        (bag.get)(instance)
    }

    /// Mutably borrows the bag slot of a dynamic bag property.
    pub fn bag_mut<'a>(&self, instance: &'a mut dyn Record) -> Option<&'a mut Option<DynamicBag>> {
        let bag = self.bag.as_ref()?;
        (bag.get_mut)(instance)
    }

    /// Rebinds this accessor to an outer type through a projection onto the
    /// inner instance it was declared on.
    pub(crate) fn lift(self, up: ProjectFn, up_mut: RecordMutFn) -> Self {
        let PropertyAccessor {
            name,
            property_type,
            read,
            write,
            refill,
            nested,
            bag,
        } = self;

        let read: ReadFn = {
            let up = up.clone();
            Arc::new(move |record: &dyn Record| up(record).and_then(|inner| read(inner)))
        };
        let write = write.map(|write| lift_write(write, up_mut.clone()));
        let refill = refill.map(|refill| lift_write(refill, up_mut.clone()));
        let nested = nested.map(|nested| {
            let up_mut = up_mut.clone();
            record_mut_fn(move |record| up_mut(record).and_then(|inner| nested(inner)))
        });
        let bag = bag.map(|bag| {
            let BagAccess { get, get_mut } = bag;
            let up = up.clone();
            let up_mut = up_mut.clone();
            BagAccess {
                get: bag_ref_fn(move |record| up(record).and_then(|inner| get(inner))),
                get_mut: bag_mut_fn(move |record| up_mut(record).and_then(|inner| get_mut(inner))),
            }
        });

        Self {
            name,
            property_type,
            read,
            write,
            refill,
            nested,
            bag,
        }
    }
}

fn lift_write(write: WriteFn, up_mut: RecordMutFn) -> WriteFn {
    Arc::new(
        move |record: &mut dyn Record, value: Value| match up_mut(record) {
            Some(inner) => write(inner, value),
            None => false,
        },
    )
}

impl fmt::Debug for PropertyAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyAccessor")
            .field("name", &self.name)
            .field("property_type", &self.property_type)
            .field("writable", &self.can_write())
            .field("nested", &self.is_nested())
            .field("dynamic_bag", &self.is_dynamic_bag())
            .finish()
    }
}
