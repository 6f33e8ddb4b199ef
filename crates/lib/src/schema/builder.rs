//! Declarative property tables for [`Structured`] types.

use std::{marker::PhantomData, sync::Arc};

use crate::{
    record::{Record, RecordType, Structured, declared_properties},
    schema::{
        Field, PropertyType,
        accessor::{
            BagAccess, PropertyAccessor, ReadFn, WriteFn, bag_mut_fn, bag_ref_fn, project_fn,
            record_mut_fn,
        },
    },
    value::{DynamicBag, Value, ValueKind},
};

/// Collects the property table of a record type `T`.
///
/// Passed to [`Structured::describe`]. Each method declares one property by
/// name together with a pair of field projections; declaring a name twice
/// replaces the earlier declaration, which lets derived types override
/// properties lifted from their base.
pub struct SchemaBuilder<T> {
    properties: Vec<PropertyAccessor>,
    _record: PhantomData<fn() -> T>,
}

impl<T: Structured> SchemaBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            properties: Vec::new(),
            _record: PhantomData,
        }
    }

    pub(crate) fn into_properties(self) -> Vec<PropertyAccessor> {
        self.properties
    }

    /// Declares a readable and writable property backed by a [`Field`].
    pub fn field<F, G, M>(&mut self, name: &str, get: G, get_mut: M) -> &mut Self
    where
        F: Field,
        G: Fn(&T) -> &F + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut F + Send + Sync + 'static,
    {
        let read = field_read::<T, F, G>(get);
        let write = field_write::<T, F, M>(get_mut);
        self.push(PropertyAccessor::new(name, F::property_type(), read).with_write(write))
    }

    /// Declares a property that can be read but never written.
    ///
    /// Read-only properties are not eligible for delta tracking.
    pub fn read_only<F, G>(&mut self, name: &str, get: G) -> &mut Self
    where
        F: Field,
        G: Fn(&T) -> &F + Send + Sync + 'static,
    {
        self.push(PropertyAccessor::new(
            name,
            F::property_type(),
            field_read::<T, F, G>(get),
        ))
    }

    /// Declares a list property without a setter whose contents are replaced in place.
    pub fn collection_in_place<E, G, M>(&mut self, name: &str, get: G, get_mut: M) -> &mut Self
    where
        E: Field,
        G: Fn(&T) -> &Vec<E> + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut Vec<E> + Send + Sync + 'static,
    {
        let refill: WriteFn = Arc::new(move |record: &mut dyn Record, value: Value| {
            let Some(record) = record.as_any_mut().downcast_mut::<T>() else {
                return false;
            };
            let Some(items) = Vec::<E>::from_value(value) else {
                return false;
            };
            let slot = get_mut(record);
            slot.clear();
            slot.extend(items);
            true
        });
        let read = field_read::<T, Vec<E>, G>(get);
        let accessor =
            PropertyAccessor::new(name, Vec::<E>::property_type(), read).with_refill(refill);
        self.push(accessor)
    }

    /// Declares a required nested record property.
    pub fn record<R, G, M>(&mut self, name: &str, get: G, get_mut: M) -> &mut Self
    where
        R: Structured,
        G: Fn(&T) -> &R + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut R + Send + Sync + 'static,
    {
        let read: ReadFn = Arc::new(move |record: &dyn Record| {
            let record = record.as_any().downcast_ref::<T>()?;
            Some(Value::record(get(record).clone()))
        });
        let get_mut = Arc::new(get_mut);
        let write: WriteFn = {
            let get_mut = Arc::clone(&get_mut);
            Arc::new(move |record: &mut dyn Record, value: Value| {
                let Some(record) = record.as_any_mut().downcast_mut::<T>() else {
                    return false;
                };
                match downcast_record::<R>(value) {
                    Some(Some(inner)) => {
                        *get_mut(record) = inner;
                        true
                    }
                    _ => false,
                }
            })
        };
        let nested = record_mut_fn(move |record| {
            let record = record.as_any_mut().downcast_mut::<T>()?;
            Some(get_mut(record) as &mut dyn Record)
        });
        let property_type = PropertyType::new(ValueKind::Record(RecordType::of::<R>()));
        self.push(
            PropertyAccessor::new(name, property_type, read)
                .with_write(write)
                .with_nested(nested),
        )
    }

    /// Declares a nullable nested record property.
    pub fn optional_record<R, G, M>(&mut self, name: &str, get: G, get_mut: M) -> &mut Self
    where
        R: Structured,
        G: Fn(&T) -> &Option<R> + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut Option<R> + Send + Sync + 'static,
    {
        let read: ReadFn = Arc::new(move |record: &dyn Record| {
            let record = record.as_any().downcast_ref::<T>()?;
            Some(
                get(record)
                    .as_ref()
                    .map_or(Value::Null, |inner| Value::record(inner.clone())),
            )
        });
        let get_mut = Arc::new(get_mut);
        let write: WriteFn = {
            let get_mut = Arc::clone(&get_mut);
            Arc::new(move |record: &mut dyn Record, value: Value| {
                let Some(record) = record.as_any_mut().downcast_mut::<T>() else {
                    return false;
                };
                match downcast_record::<R>(value) {
                    Some(inner) => {
                        *get_mut(record) = inner;
                        true
                    }
                    None => false,
                }
            })
        };
        let nested = record_mut_fn(move |record| {
            let record = record.as_any_mut().downcast_mut::<T>()?;
            get_mut(record)
                .as_mut()
                .map(|inner| inner as &mut dyn Record)
        });
        let property_type = PropertyType::new(ValueKind::Record(RecordType::of::<R>())).nullable();
        self.push(
            PropertyAccessor::new(name, property_type, read)
                .with_write(write)
                .with_nested(nested),
        )
    }

    /// Declares a nullable nested record property stored behind a [`Box`].
    ///
    /// This is how a type refers to itself, e.g. `manager: Option<Box<Employee>>`.
    pub fn optional_boxed_record<R, G, M>(&mut self, name: &str, get: G, get_mut: M) -> &mut Self
    where
        R: Structured,
        G: Fn(&T) -> &Option<Box<R>> + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut Option<Box<R>> + Send + Sync + 'static,
    {
        let read: ReadFn = Arc::new(move |record: &dyn Record| {
            let record = record.as_any().downcast_ref::<T>()?;
            Some(
                get(record)
                    .as_deref()
                    .map_or(Value::Null, |inner| Value::record(inner.clone())),
            )
        });
        let get_mut = Arc::new(get_mut);
        let write: WriteFn = {
            let get_mut = Arc::clone(&get_mut);
            Arc::new(move |record: &mut dyn Record, value: Value| {
                let Some(record) = record.as_any_mut().downcast_mut::<T>() else {
                    return false;
                };
                match downcast_record::<R>(value) {
                    Some(inner) => {
                        *get_mut(record) = inner.map(Box::new);
                        true
                    }
                    None => false,
                }
            })
        };
        let nested = record_mut_fn(move |record| {
            let record = record.as_any_mut().downcast_mut::<T>()?;
            get_mut(record)
                .as_deref_mut()
                .map(|inner| inner as &mut dyn Record)
        });
        let property_type = PropertyType::new(ValueKind::Record(RecordType::of::<R>())).nullable();
        self.push(
            PropertyAccessor::new(name, property_type, read)
                .with_write(write)
                .with_nested(nested),
        )
    }

    /// Declares the open-ended dynamic property bag of this type.
    ///
    /// The bag may be absent; deltas create it on demand.
    pub fn dynamic_bag<G, M>(&mut self, name: &str, get: G, get_mut: M) -> &mut Self
    where
        G: Fn(&T) -> &Option<DynamicBag> + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut Option<DynamicBag> + Send + Sync + 'static,
    {
        let (accessor, get_mut) = bag_accessor::<T, G, M>(name, get, get_mut);
        let write: WriteFn = Arc::new(move |record: &mut dyn Record, value: Value| {
            let Some(record) = record.as_any_mut().downcast_mut::<T>() else {
                return false;
            };
            match Option::<DynamicBag>::from_value(value) {
                Some(bag) => {
                    *get_mut(record) = bag;
                    true
                }
                None => false,
            }
        });
        self.push(accessor.with_write(write))
    }

    /// Declares a dynamic property bag that cannot be reassigned.
    ///
    /// An existing bag has its entries replaced in place; an absent bag cannot
    /// be created.
    pub fn read_only_dynamic_bag<G, M>(&mut self, name: &str, get: G, get_mut: M) -> &mut Self
    where
        G: Fn(&T) -> &Option<DynamicBag> + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut Option<DynamicBag> + Send + Sync + 'static,
    {
        let (accessor, get_mut) = bag_accessor::<T, G, M>(name, get, get_mut);
        let refill: WriteFn = Arc::new(move |record: &mut dyn Record, value: Value| {
            let Some(record) = record.as_any_mut().downcast_mut::<T>() else {
                return false;
            };
            let (Some(bag), Value::Map(entries)) = (get_mut(record).as_mut(), value) else {
                return false;
            };
            bag.clear();
            bag.extend(entries);
            true
        });
        self.push(accessor.with_refill(refill))
    }

    /// Lifts every property of the base type `B` into this type.
    ///
    /// `get` and `get_mut` project an instance of this type onto its embedded
    /// base instance. Pair this with [`Structured::base_type`] so that
    /// assignability follows the same chain.
    pub fn extends<B, G, M>(&mut self, get: G, get_mut: M) -> &mut Self
    where
        B: Structured,
        G: Fn(&T) -> &B + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut B + Send + Sync + 'static,
    {
        let up = project_fn(move |record| {
            let record = record.as_any().downcast_ref::<T>()?;
            Some(get(record) as &dyn Record)
        });
        let up_mut = record_mut_fn(move |record| {
            let record = record.as_any_mut().downcast_mut::<T>()?;
            Some(get_mut(record) as &mut dyn Record)
        });
        for property in declared_properties::<B>() {
            self.push(property.lift(Arc::clone(&up), Arc::clone(&up_mut)));
        }
        self
    }

    fn push(&mut self, accessor: PropertyAccessor) -> &mut Self {
        match self
            .properties
            .iter_mut()
            .find(|existing| existing.name() == accessor.name())
        {
            Some(existing) => *existing = accessor,
            None => self.properties.push(accessor),
        }
        self
    }
}

fn field_read<T, F, G>(get: G) -> ReadFn
where
    T: Structured,
    F: Field,
    G: Fn(&T) -> &F + Send + Sync + 'static,
{
    Arc::new(move |record: &dyn Record| {
        record
            .as_any()
            .downcast_ref::<T>()
            .map(|record| get(record).to_value())
    })
}

fn field_write<T, F, M>(get_mut: M) -> WriteFn
where
    T: Structured,
    F: Field,
    M: Fn(&mut T) -> &mut F + Send + Sync + 'static,
{
    Arc::new(move |record: &mut dyn Record, value: Value| {
        let Some(record) = record.as_any_mut().downcast_mut::<T>() else {
            return false;
        };
        match F::from_value(value) {
            Some(value) => {
                *get_mut(record) = value;
                true
            }
            None => false,
        }
    })
}

/// `Some(None)` for null, `Some(Some(_))` for a record of exactly `R`.
fn downcast_record<R: Structured>(value: Value) -> Option<Option<R>> {
    match value {
        Value::Null => Some(None),
        Value::Record(record) => record.into_any().downcast::<R>().ok().map(|r| Some(*r)),
        _ => None,
    }
}

type SharedBagMut<T> = Arc<dyn Fn(&mut T) -> &mut Option<DynamicBag> + Send + Sync>;

/// Builds the read side and bag access shared by both dynamic bag declarations.
fn bag_accessor<T, G, M>(name: &str, get: G, get_mut: M) -> (PropertyAccessor, SharedBagMut<T>)
where
    T: Structured,
    G: Fn(&T) -> &Option<DynamicBag> + Send + Sync + 'static,
    M: Fn(&mut T) -> &mut Option<DynamicBag> + Send + Sync + 'static,
{
    let get = Arc::new(get);
    let get_mut: SharedBagMut<T> = Arc::new(get_mut);

    let read: ReadFn = {
        let get = Arc::clone(&get);
        Arc::new(move |record: &dyn Record| {
            let record = record.as_any().downcast_ref::<T>()?;
            Some(get(record).clone().map_or(Value::Null, Value::Map))
        })
    };
    let bag = {
        let get_mut = Arc::clone(&get_mut);
        BagAccess {
            get: bag_ref_fn(move |record| {
                let record = record.as_any().downcast_ref::<T>()?;
                Some(get(record))
            }),
            get_mut: bag_mut_fn(move |record| {
                let record = record.as_any_mut().downcast_mut::<T>()?;
                Some(get_mut(record))
            }),
        }
    };
    let property_type = PropertyType::collection(ValueKind::Map).nullable();
    (PropertyAccessor::new(name, property_type, read).with_bag(bag), get_mut)
}
