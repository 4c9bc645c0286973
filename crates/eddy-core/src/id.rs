//! Strongly-typed identifiers.

use std::fmt;

/// Identifies a field within a field repository.
///
/// Fields are declared during setup and assigned sequential IDs.
/// `FieldId(n)` corresponds to the n-th declared field. IDs are never
/// reused or invalidated by a regrid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub u32);

impl FieldId {
    /// Position of this field in the repository's declaration order.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FieldId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Monotonically increasing timestep counter.
///
/// Incremented each time the driver completes `post_advance_work`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(pub u64);

impl StepId {
    /// The step that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StepId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
