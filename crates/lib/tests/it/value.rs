//! Value conversions and JSON interop

use deltamerge::{Delta, Value, ValueKind};

use crate::helpers::*;

#[test]
fn test_record_values_compare_structurally() {
    let a = Value::record(person("Ann", 3));
    let b = Value::record(person("Ann", 3));
    let c = Value::record(person("Ann", 4));

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_ne!(a, Value::record(Employee::default()));
    assert_eq!(a.clone(), a);
}

#[test]
fn test_record_kind() {
    let value = Value::record(address("1 Road", "Town"));
    match value.kind() {
        ValueKind::Record(record_type) => assert_eq!(record_type.name(), "Address"),
        other => panic!("expected a record kind, got {other}"),
    }
    assert_eq!(value.as_record_of::<Address>().unwrap().city, "Town");
    assert!(value.as_record_of::<Person>().is_none());
}

#[test]
fn test_record_serializes_as_object() {
    let customer = Customer {
        id: 1,
        name: "Ann".into(),
        home: None,
        billing: address("2 Bill Street", "Oslo"),
        tags: vec!["a".into()],
        extra: Some(bag(&[("color", Value::from("red"))])),
    };

    let json = serde_json::to_value(Value::record(customer)).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "Name": "Ann",
            "Home": null,
            "Billing": {"Street": "2 Bill Street", "City": "Oslo", "Zip": null},
            "Tags": ["a"],
            "color": "red",
        })
    );
}

#[test]
fn test_json_payload_drives_a_delta() {
    let payload = Value::from_json_str(r#"{"Name": "Json", "nickname": "JJ", "stale": null}"#)
        .unwrap();

    let mut delta = Delta::new::<Customer>().unwrap();
    for (name, value) in payload.as_map().unwrap().clone() {
        assert!(delta.try_set(&name, value), "set {name}");
    }

    let mut target = sample_customer();
    delta.patch(&mut target).unwrap();
    assert_eq!(target.name, "Json");
    let extra = target.extra.unwrap();
    assert_eq!(extra["nickname"], "JJ");
    assert!(!extra.contains_key("stale"));
}

#[test]
fn test_json_numbers() {
    let value = Value::from_json_str("[1, 2.5, true]").unwrap();
    assert_eq!(
        value,
        Value::List(vec![Value::Int(1), Value::Float(2.5), Value::Bool(true)])
    );
}
