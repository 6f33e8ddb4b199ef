//! Constants used throughout the deltamerge library.

/// Default limit on nested delta levels walked by a single merge, the root included.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 128;
