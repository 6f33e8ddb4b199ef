//! Patch and put semantics for plain properties

use deltamerge::{Delta, DeltaError, DeltaOptions, Error, RecordType, Value};

use crate::helpers::*;

#[test]
fn test_patch_restricted_person() {
    let options = DeltaOptions::new().with_updatable(["Name"]);
    let mut delta = Delta::with_options::<Person>(options).unwrap();

    assert!(!delta.try_set("Age", 5));
    assert!(delta.try_set("Name", "Ann"));
    assert_eq!(delta.changed_property_names(), ["Name"]);

    let mut target = person("X", 1);
    delta.patch(&mut target).unwrap();
    assert_eq!(target, person("Ann", 1));
}

#[test]
fn test_put_overwrites_unset_with_defaults() {
    let mut delta = Delta::new::<Person>().unwrap();
    assert!(delta.try_set("Age", 5));

    let mut target = person("X", 1);
    delta.put(&mut target).unwrap();
    assert_eq!(target, person("", 5));
}

#[test]
fn test_patch_only_touches_changed_properties() {
    let mut delta = Delta::new::<Customer>().unwrap();
    assert!(delta.try_set("Name", "Patched"));

    let original = sample_customer();
    let mut target = original.clone();
    delta.patch(&mut target).unwrap();

    assert_eq!(target.name, "Patched");
    assert_eq!(
        Customer {
            name: original.name.clone(),
            ..target.clone()
        },
        original
    );
}

#[test]
fn test_put_writes_every_updatable_property() {
    let mut delta = Delta::new::<Customer>().unwrap();
    assert!(delta.try_set("Name", "Put"));

    let mut target = sample_customer();
    delta.put(&mut target).unwrap();

    assert_eq!(target.name, "Put");
    assert_eq!(target.home, None);
    assert_eq!(target.billing, Address::default());
    assert!(target.tags.is_empty());
    // Not updatable, so never written
    assert_eq!(target.id, 42);
    // No dynamic keys were set, so none survive
    assert_eq!(target.extra, Some(Default::default()));
}

#[test]
fn test_copy_unchanged_is_idempotent() {
    let mut delta = Delta::new::<Customer>().unwrap();
    assert!(delta.try_set("Name", "Once"));
    assert!(delta.try_set("score", 3));

    let mut once = sample_customer();
    delta.copy_unchanged_values(&mut once).unwrap();
    let mut twice = sample_customer();
    delta.copy_unchanged_values(&mut twice).unwrap();
    delta.copy_unchanged_values(&mut twice).unwrap();

    assert_eq!(once, twice);
    assert_eq!(once.name, "Original");
    assert_eq!(
        once.extra.as_ref().map(|extra| extra.len()),
        Some(1),
        "only the changed dynamic key survives"
    );
}

#[test]
fn test_put_is_patch_then_copy_unchanged() {
    let mut delta = Delta::new::<Customer>().unwrap();
    assert!(delta.try_set("Tags", Value::List(vec!["new".into()])));
    assert!(delta.try_set("color", "green"));

    let mut put = sample_customer();
    delta.put(&mut put).unwrap();

    let mut manual = sample_customer();
    delta.copy_changed_values(&mut manual).unwrap();
    delta.copy_unchanged_values(&mut manual).unwrap();

    assert_eq!(put, manual);
    assert_eq!(put.tags, ["new"]);
}

#[test]
fn test_base_delta_onto_derived_target() {
    let mut delta = Delta::new::<Person>().unwrap();
    assert!(delta.try_set("Name", "Eve"));

    let mut target = Employee {
        person: person("X", 30),
        title: "Engineer".into(),
    };
    delta.put(&mut target).unwrap();

    assert_eq!(target.person, person("Eve", 0));
    assert_eq!(target.title, "Engineer");
}

#[test]
fn test_derived_delta_onto_base_target_is_rejected() {
    let mut delta = Delta::new::<Employee>().unwrap();
    assert!(delta.try_set("Title", "Manager"));

    let mut target = person("X", 1);
    let err = delta.patch(&mut target).unwrap_err();
    assert!(matches!(err, Error::Delta(DeltaError::TypeMismatch { .. })));
    assert_eq!(target, person("X", 1));
}

#[test]
fn test_structural_delta_merges_derived_properties() {
    let mut delta =
        Delta::with_structural_type::<Person>(RecordType::of::<Employee>(), DeltaOptions::new())
            .unwrap();
    assert!(delta.try_set("Title", "Lead"));
    assert!(delta.try_set("Age", 41));

    let mut target = Employee::default();
    delta.patch(&mut target).unwrap();
    assert_eq!(target.title, "Lead");
    assert_eq!(target.person.age, 41);
}

#[test]
fn test_merge_into_value() {
    let mut delta = Delta::new::<Person>().unwrap();
    assert!(delta.try_set("Age", 2));

    let mut target = Value::record(person("Val", 1));
    delta.put_value(&mut target).unwrap();
    assert_eq!(target.as_record_of::<Person>(), Some(&person("", 2)));

    let err = delta.patch_value(&mut Value::Null).unwrap_err();
    assert!(matches!(err, Error::Delta(DeltaError::ArgumentNull { .. })));

    let err = delta.patch_value(&mut Value::from("text")).unwrap_err();
    assert!(err.is_type_error());
}

#[test]
fn test_delta_is_reusable_across_targets() {
    let mut delta = Delta::new::<Person>().unwrap();
    assert!(delta.try_set("Name", "Same"));

    let mut targets = vec![person("A", 1), person("B", 2), person("C", 3)];
    for target in &mut targets {
        delta.patch(target).unwrap();
    }
    assert!(targets.iter().all(|p| p.name == "Same"));
    assert_eq!(
        targets.iter().map(|p| p.age).collect::<Vec<_>>(),
        [1, 2, 3]
    );
}
