//! Conversions between Rust field types and [`Value`].

use crate::{
    schema::PropertyType,
    value::{DynamicBag, Value, ValueKind},
};

/// A Rust type that can back a declared record property.
///
/// `from_value` returns `None` when the value does not convert; the property is
/// then left untouched.
pub trait Field: Sized {
    fn property_type() -> PropertyType;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Option<Self>;
}

impl Field for bool {
    fn property_type() -> PropertyType {
        PropertyType::new(ValueKind::Bool)
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_bool()
    }
}

impl Field for i64 {
    fn property_type() -> PropertyType {
        PropertyType::new(ValueKind::Int)
    }

    fn to_value(&self) -> Value {
        Value::Int(*self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_int()
    }
}

impl Field for i32 {
    fn property_type() -> PropertyType {
        PropertyType::new(ValueKind::Int)
    }

    fn to_value(&self) -> Value {
        Value::Int(*self as i64)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_int().and_then(|n| i32::try_from(n).ok())
    }
}

impl Field for f64 {
    fn property_type() -> PropertyType {
        PropertyType::new(ValueKind::Float)
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Option<Self> {
        value.as_float()
    }
}

impl Field for String {
    fn property_type() -> PropertyType {
        PropertyType::new(ValueKind::Text)
    }

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// Untyped properties accept any value, including null.
impl Field for Value {
    fn property_type() -> PropertyType {
        PropertyType::new(ValueKind::Any).nullable()
    }

    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }
}

impl Field for DynamicBag {
    fn property_type() -> PropertyType {
        PropertyType::collection(ValueKind::Map)
    }

    fn to_value(&self) -> Value {
        Value::Map(self.clone())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl<T: Field> Field for Option<T> {
    fn property_type() -> PropertyType {
        T::property_type().nullable()
    }

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, Field::to_value)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            value => T::from_value(value).map(Some),
        }
    }
}

impl<T: Field> Field for Vec<T> {
    fn property_type() -> PropertyType {
        PropertyType::collection(ValueKind::List)
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(Field::to_value).collect())
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}
