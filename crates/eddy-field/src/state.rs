//! Field attributes and time states.

use std::fmt;

/// Maximum number of time states a field can retain.
pub const MAX_STATES: usize = 3;

/// Which time level of a field to access.
///
/// `New` is the current state. A field declared with `num_states = n`
/// retains the first `n` states in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeState {
    /// The current state, written by the timestep in progress.
    New,
    /// The state at the start of the timestep.
    Old,
    /// The state one timestep before `Old`.
    Older,
}

impl TimeState {
    /// All states, newest first.
    pub const ALL: [TimeState; MAX_STATES] = [Self::New, Self::Old, Self::Older];

    /// Position in the state history.
    pub fn index(self) -> usize {
        match self {
            Self::New => 0,
            Self::Old => 1,
            Self::Older => 2,
        }
    }

    /// Lower-case name used in messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Old => "old",
            Self::Older => "older",
        }
    }
}

impl fmt::Display for TimeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable attributes of a declared field.
///
/// Component count and ghost width are fixed at declaration and survive
/// every regrid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldInfo {
    /// Field name, unique within a repository.
    pub name: String,
    /// Number of components per cell.
    pub ncomp: usize,
    /// Ghost-cell width.
    pub nghost: usize,
    /// Number of retained time states, `1..=MAX_STATES`.
    pub num_states: usize,
}

impl FieldInfo {
    /// Whether the field keeps `state`.
    pub fn retains(&self, state: TimeState) -> bool {
        state.index() < self.num_states
    }
}
