//! Dynamic property bags

use deltamerge::{Delta, DeltaError, DynamicBag, Error, Value};

use crate::helpers::*;

#[test]
fn test_null_removes_key_on_put() {
    let mut delta = Delta::new::<Customer>().unwrap();
    assert!(delta.try_set("color", Value::Null));

    let mut target = sample_customer();
    assert!(target.extra.as_ref().unwrap().contains_key("color"));
    delta.put(&mut target).unwrap();

    assert!(!target.extra.as_ref().unwrap().contains_key("color"));
}

#[test]
fn test_null_removes_key_on_patch() {
    let mut delta = Delta::new::<Customer>().unwrap();
    assert!(delta.try_set("color", Value::Null));

    let mut target = sample_customer();
    delta.patch(&mut target).unwrap();

    assert_eq!(target.extra, Some(bag(&[("score", Value::from(10))])));
}

#[test]
fn test_put_drops_keys_never_set() {
    let mut delta = Delta::new::<Customer>().unwrap();
    assert!(delta.try_set("size", "XL"));

    let mut patched = sample_customer();
    delta.patch(&mut patched).unwrap();
    assert_eq!(
        patched.extra,
        Some(bag(&[
            ("color", Value::from("blue")),
            ("score", Value::from(10)),
            ("size", Value::from("XL")),
        ]))
    );

    let mut put = sample_customer();
    delta.put(&mut put).unwrap();
    assert_eq!(put.extra, Some(bag(&[("size", Value::from("XL"))])));
}

#[test]
fn test_changed_keys_overwrite_existing_values() {
    let mut delta = Delta::new::<Customer>().unwrap();
    assert!(delta.try_set("score", 99));
    assert!(delta.try_set("score", 11));

    let mut target = sample_customer();
    delta.patch(&mut target).unwrap();

    let extra = target.extra.unwrap();
    assert_eq!(extra["score"], 11);
    assert_eq!(extra["color"], "blue");
}

#[test]
fn test_bag_is_created_when_absent() {
    let mut delta = Delta::new::<Customer>().unwrap();
    assert!(delta.try_set("flag", true));

    let mut target = Customer::default();
    assert!(target.extra.is_none());
    delta.patch(&mut target).unwrap();
    assert_eq!(target.extra, Some(bag(&[("flag", Value::Bool(true))])));
}

#[test]
fn test_removal_only_leaves_absent_bag_alone() {
    let mut delta = Delta::new::<Customer>().unwrap();
    assert!(delta.try_set("gone", Value::Null));

    let mut target = Customer::default();
    delta.put(&mut target).unwrap();
    assert_eq!(target.extra, None);
}

#[test]
fn test_dynamic_names_are_tracked_separately() {
    let mut delta = Delta::new::<Customer>().unwrap();
    assert!(delta.try_set("Name", "Declared"));
    assert!(delta.try_set("undeclared", 1));
    assert!(delta.try_set("another", Value::Null));

    assert_eq!(delta.changed_property_names(), ["Name"]);
    assert_eq!(
        delta.changed_dynamic_property_names(),
        ["another", "undeclared"]
    );
    assert_eq!(
        delta.try_get("undeclared").and_then(|found| found.as_value().cloned()),
        Some(Value::from(1))
    );
}

#[test]
fn test_bag_property_name_routes_to_dynamic_path() {
    let mut delta = Delta::new::<Customer>().unwrap();
    assert!(!delta.updatable_property_names().iter().any(|n| n == "Extra"));
    assert!(delta.try_set("Extra", "inner"));
    assert_eq!(delta.changed_dynamic_property_names(), ["Extra"]);
}

#[test]
fn test_read_only_bag_is_refilled_in_place() {
    let mut delta = Delta::new::<Sealed>().unwrap();
    assert!(delta.try_set("Label", "sealed"));
    assert!(delta.try_set("weight", 5));

    let mut target = Sealed {
        label: String::new(),
        attributes: Some(bag(&[("old", Value::from("x"))])),
    };
    delta.put(&mut target).unwrap();

    assert_eq!(target.label, "sealed");
    assert_eq!(target.attributes, Some(bag(&[("weight", Value::from(5))])));
}

#[test]
fn test_read_only_bag_cannot_be_created_on_target() {
    let mut delta = Delta::new::<Sealed>().unwrap();
    assert!(delta.try_set("weight", 5));

    let mut target = Sealed {
        label: "kept".into(),
        attributes: None,
    };
    let err = delta.patch(&mut target).unwrap_err();
    assert!(matches!(
        err,
        Error::Delta(DeltaError::ImmutableDynamicBag { .. })
    ));
    assert_eq!(target.attributes, None);
}

#[test]
fn test_absent_read_only_bag_only_rejects_dynamic_sets() {
    let mut delta = Delta::new::<Locked>().unwrap();
    assert!(delta.try_set("Label", "plain"));
    assert!(!delta.try_set("weight", 5));
    assert!(!delta.try_set("Attributes", "inner"));
    assert!(delta.changed_dynamic_property_names().is_empty());
    assert!(delta.try_get("weight").is_none());

    let mut target = Locked::default();
    delta.patch(&mut target).unwrap();
    assert_eq!(
        target,
        Locked {
            label: "plain".into(),
            attributes: None,
        }
    );

    delta.put(&mut target).unwrap();
    assert_eq!(target.attributes, None);
}

#[test]
fn test_immutable_bag_error_names_the_bag() {
    let mut delta = Delta::new::<Sealed>().unwrap();
    assert!(delta.try_set("weight", 5));

    let mut target = Sealed::default();
    let err = delta.patch(&mut target).unwrap_err();
    let Error::Delta(delta_err) = &err else {
        panic!("expected a delta error, got {err:?}");
    };
    assert!(delta_err.is_dynamic_bag_error());
    assert_eq!(delta_err.property(), Some("Attributes"));
}

#[test]
fn test_dynamic_bag_can_be_disabled() {
    let options = deltamerge::DeltaOptions::new().without_dynamic_bag();
    let mut delta = Delta::with_options::<Customer>(options).unwrap();
    assert!(delta.dynamic_bag_name().is_none());
    assert!(!delta.try_set("undeclared", 1));

    // The bag becomes an ordinary map property
    assert!(delta.updatable_property_names().iter().any(|n| n == "Extra"));
    assert!(delta.try_set("Extra", bag(&[("only", Value::from(1))])));

    let mut target = sample_customer();
    delta.put(&mut target).unwrap();
    assert_eq!(target.extra, Some(bag(&[("only", Value::from(1))])));
}

#[test]
fn test_dynamic_nested_delta() {
    let mut office = Delta::new::<Address>().unwrap();
    assert!(office.try_set("City", "Visby"));

    let mut delta = Delta::new::<Customer>().unwrap();
    assert!(delta.try_set("office", office));
    assert!(
        delta
            .nested_delta_mut("office")
            .unwrap()
            .try_set("Street", "9 Harbour")
    );

    let scratch = delta.instance_as::<Customer>().unwrap();
    let office = scratch.extra.as_ref().unwrap()["office"].as_record_of::<Address>();
    assert_eq!(office.unwrap().street, "9 Harbour");

    let mut target = Customer::default();
    delta.patch(&mut target).unwrap();

    let extra: DynamicBag = target.extra.unwrap();
    let office = extra["office"].as_record_of::<Address>().unwrap();
    assert_eq!(office.city, "Visby");
    assert_eq!(office.street, "9 Harbour");
}
