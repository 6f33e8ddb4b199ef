//! Delta integration tests
//!
//! Tests are organized by functional area:
//!
//! - `set_get`: Construction, updatable names, `try_set`/`try_get` and reset
//! - `merge`: Patch and put semantics for plain properties and derived targets
//! - `nested`: Nested deltas, materialization and the nesting depth guard
//! - `dynamic`: Dynamic property bags, removal and put-replaces semantics

mod dynamic;
mod merge;
mod set_get;
