//! Schema discovery and the process-wide schema cache

use std::sync::Arc;

use deltamerge::{
    PropertyAccessor, RecordType, ValueKind, cached_schema_count, schema_for, schema_of,
};

use crate::helpers::*;

#[test]
fn test_customer_schema() {
    let schema = schema_of::<Customer>();
    assert_eq!(schema.record_type(), RecordType::of::<Customer>());

    let names: Vec<&str> = schema.names().collect();
    assert_eq!(names, ["Name", "Home", "Billing", "Tags", "Extra"]);

    let home = schema.get("Home").unwrap();
    assert!(home.is_nested());
    assert!(home.property_type().is_nullable());
    assert!(schema.get("Billing").unwrap().is_nested());
    assert!(!schema.get("Name").unwrap().is_nested());

    let tags = schema.get("Tags").unwrap();
    assert!(tags.is_collection());
    assert!(!tags.can_write());

    assert_eq!(
        schema.dynamic_bag().map(PropertyAccessor::name),
        Some("Extra")
    );
}

#[test]
fn test_closed_schema_has_no_bag() {
    let schema = schema_of::<Person>();
    assert_eq!(schema.len(), 2);
    assert!(schema.dynamic_bag().is_none());
}

#[test]
fn test_derived_schema_includes_base_properties() {
    let schema = schema_of::<Employee>();
    let names: Vec<&str> = schema.names().collect();
    assert_eq!(names, ["Name", "Age", "Title"]);

    let reseller = schema_of::<Reseller>();
    let home = reseller.get("Home").unwrap();
    assert!(!home.is_nested());
    assert_eq!(home.property_type().kind(), ValueKind::Text);
}

#[test]
fn test_assignability_follows_base_chain() {
    let person = RecordType::of::<Person>();
    let employee = RecordType::of::<Employee>();

    assert!(employee.derives_from(person));
    assert!(person.is_assignable_from(employee));
    assert!(!person.derives_from(employee));
    assert_eq!(employee.base(), Some(person));
    assert_eq!(person.base(), None);
}

#[test]
fn test_schema_is_cached_per_type() {
    let first = schema_for(RecordType::of::<Company>());
    let count = cached_schema_count();
    let second = schema_of::<Company>();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(cached_schema_count() >= count);
}

#[test]
fn test_schema_without_constructor_is_still_discovered() {
    let schema = schema_of::<NoDefault>();
    assert_eq!(schema.names().collect::<Vec<_>>(), ["Value"]);
    assert!(RecordType::of::<NoDefault>().construct().is_none());
}

#[test]
fn test_self_referential_schema() {
    let schema = schema_of::<OrgUnit>();
    assert_eq!(schema.names().collect::<Vec<_>>(), ["Name", "Parent"]);

    let parent = schema.get("Parent").unwrap();
    assert!(parent.is_nested());
    assert!(parent.property_type().is_nullable());
    assert_eq!(
        parent.property_type().kind(),
        ValueKind::Record(RecordType::of::<OrgUnit>())
    );
}
