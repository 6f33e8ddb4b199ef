//! Construction options for deltas.
//!
//! Options can be loaded from configuration files; every field is optional.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_MAX_NESTING_DEPTH;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum DynamicBagSelection {
    /// Use the bag declared in the record's schema, if any.
    #[default]
    Declared,
    Named(String),
    Disabled,
}

/// Options applied when a [`Delta`](crate::Delta) is constructed or reset.
///
/// ```
/// use deltamerge::DeltaOptions;
///
/// let options = DeltaOptions::new()
///     .with_updatable(["Name", "Email"])
///     .with_max_depth(8);
/// assert_eq!(options.updatable().map(|names| names.len()), Some(2));
/// assert_eq!(options.max_depth(), 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeltaOptions {
    updatable: Option<Vec<String>>,
    dynamic_bag: DynamicBagSelection,
    max_depth: usize,
}

impl Default for DeltaOptions {
    fn default() -> Self {
        Self {
            updatable: None,
            dynamic_bag: DynamicBagSelection::Declared,
            max_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

impl DeltaOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the properties that may be set to `names`.
    ///
    /// Names that are not eligible properties of the record type are ignored.
    pub fn with_updatable<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.updatable = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Selects the dynamic property bag by property name.
    pub fn with_dynamic_bag(mut self, property: impl Into<String>) -> Self {
        self.dynamic_bag = DynamicBagSelection::Named(property.into());
        self
    }

    /// Treats the record as closed even if its schema declares a bag.
    pub fn without_dynamic_bag(mut self) -> Self {
        self.dynamic_bag = DynamicBagSelection::Disabled;
        self
    }

    /// Limits how deep nested deltas may go during a merge. Clamped to at least 1.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.max(1);
        self
    }

    pub fn updatable(&self) -> Option<&[String]> {
        self.updatable.as_deref()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth.max(1)
    }

    pub(crate) fn dynamic_bag(&self) -> &DynamicBagSelection {
        &self.dynamic_bag
    }
}
