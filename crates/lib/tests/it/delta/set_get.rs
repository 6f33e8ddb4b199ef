//! Construction, property sets and reads

use deltamerge::{
    Delta, DeltaError, DeltaOptions, Error, PropertyRef, RecordType, Value, ValueKind,
};

use crate::helpers::*;

fn read(delta: &Delta, name: &str) -> Option<Value> {
    delta.try_get(name).map(PropertyRef::into_value)
}

#[test]
fn test_set_outside_updatable_is_rejected() {
    let options = DeltaOptions::new().with_updatable(["Name"]);
    let mut delta = Delta::with_options::<Person>(options).unwrap();

    let before = read(&delta, "Age");
    for value in [Value::from(5), Value::from(-1), Value::Null] {
        assert!(!delta.try_set("Age", value));
        assert_eq!(read(&delta, "Age"), before);
    }
    assert!(delta.changed_property_names().is_empty());
}

#[test]
fn test_set_then_get_round_trip() {
    let mut delta = Delta::new::<Customer>().unwrap();

    let cases = [
        ("Name", Value::from("Ann")),
        ("Home", Value::record(address("3 New Lane", "Lund"))),
        ("Billing", Value::record(address("4 Pay Plaza", "Malmo"))),
        ("Tags", Value::List(vec!["a".into(), "b".into()])),
        ("Home", Value::Null),
    ];
    for (name, value) in cases {
        assert!(delta.try_set(name, value.clone()), "set {name}");
        assert_eq!(read(&delta, name), Some(value), "get {name}");
    }
}

#[test]
fn test_read_only_property_is_not_settable() {
    let mut delta = Delta::new::<Customer>().unwrap();
    assert!(!delta.updatable_property_names().iter().any(|n| n == "Id"));

    // Unknown to the schema, so it lands in the dynamic bag instead
    assert!(delta.try_set("Id", 7));
    assert!(delta.changed_property_names().is_empty());
    assert_eq!(delta.changed_dynamic_property_names(), ["Id"]);
}

#[test]
fn test_type_checks_on_set() {
    let mut delta = Delta::new::<Customer>().unwrap();

    assert!(!delta.try_set("Name", 5));
    assert!(!delta.try_set("Name", Value::Null));
    assert!(!delta.try_set("Billing", Value::Null));
    assert!(!delta.try_set("Billing", Value::record(person("Bo", 3))));
    assert!(!delta.try_set("Home", "not an address"));
    assert!(!delta.has_changes());
}

#[test]
fn test_changed_and_unchanged_partition_updatable() {
    let mut delta = Delta::new::<Customer>().unwrap();
    assert!(delta.try_set("Tags", Value::List(vec![])));
    assert!(delta.try_set("Home", Delta::new::<Address>().unwrap()));

    let changed = delta.changed_property_names();
    let unchanged = delta.unchanged_property_names();
    assert_eq!(changed, ["Home", "Tags"]);
    assert_eq!(unchanged, ["Name", "Billing"]);

    let mut all: Vec<String> = changed.into_iter().chain(unchanged).collect();
    all.sort();
    let mut updatable = delta.updatable_property_names().to_vec();
    updatable.sort();
    assert_eq!(all, updatable);
}

#[test]
fn test_reset_clears_changes() {
    let mut delta = Delta::new::<Customer>().unwrap();
    assert!(delta.try_set("Name", "Ann"));
    assert!(delta.try_set("Home", Delta::new::<Address>().unwrap()));
    assert!(delta.try_set("note", "hello"));

    delta.reset().unwrap();

    assert!(delta.changed_property_names().is_empty());
    assert!(delta.changed_dynamic_property_names().is_empty());
    assert!(delta.nested_delta("Home").is_none());
    assert_eq!(read(&delta, "Name"), Some(Value::from("")));
    assert_eq!(read(&delta, "Home"), Some(Value::Null));
    assert_eq!(delta.instance_as::<Customer>(), Some(&Customer::default()));
}

#[test]
fn test_reset_keeps_options() {
    let options = DeltaOptions::new().with_updatable(["Name"]);
    let mut delta = Delta::with_options::<Person>(options).unwrap();
    delta.reset().unwrap();
    assert_eq!(delta.updatable_property_names(), ["Name"]);
    assert!(!delta.try_set("Age", 1));
}

#[test]
fn test_structural_type_must_be_assignable() {
    let delta =
        Delta::with_structural_type::<Person>(RecordType::of::<Employee>(), DeltaOptions::new())
            .unwrap();
    assert_eq!(delta.expected_type(), RecordType::of::<Person>());
    assert_eq!(delta.structural_type(), RecordType::of::<Employee>());
    assert_eq!(delta.updatable_property_names(), ["Name", "Age", "Title"]);

    let err =
        Delta::with_structural_type::<Employee>(RecordType::of::<Person>(), DeltaOptions::new())
            .unwrap_err();
    assert!(matches!(err, Error::Delta(DeltaError::TypeMismatch { .. })));
}

#[test]
fn test_construction_errors() {
    let err = Delta::new::<NoDefault>().unwrap_err();
    assert!(err.is_construction_error());
    assert_eq!(err.module(), "delta");

    // Read-only bags are only checked once a dynamic property is written
    assert!(Delta::new::<Locked>().is_ok());
    assert!(Delta::new::<Sealed>().is_ok());
}

#[test]
fn test_runtime_typed_construction() {
    let mut delta =
        Delta::for_record_type(RecordType::of::<Person>(), DeltaOptions::new()).unwrap();
    assert!(delta.try_set("Age", 9));
    assert_eq!(delta.instance_as::<Person>(), Some(&person("", 9)));
}

#[test]
fn test_property_types() {
    let delta = Delta::new::<Customer>().unwrap();

    let name = delta.try_get_property_type("Name").unwrap();
    assert_eq!(name.kind(), ValueKind::Text);
    assert!(!name.is_nullable());

    let home = delta.try_get_property_type("Home").unwrap();
    assert_eq!(home.kind(), ValueKind::Record(RecordType::of::<Address>()));
    assert!(home.is_nullable());

    assert!(delta.try_get_property_type("Tags").unwrap().is_collection());
    assert!(delta.try_get_property_type("missing").is_none());
}
