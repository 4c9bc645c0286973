//! Driver error types.

use std::error::Error;
use std::fmt;

use eddy_core::{FieldError, ParamError, RegistryError};
use eddy_mesh::MeshError;
use eddy_physics::Phase;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while validating a [`SimConfig`](crate::SimConfig) or
/// constructing its modules.
///
/// Every variant is reported before the first timestep runs.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// Module lookup or construction failed.
    Registry(RegistryError),
    /// A field could not be declared.
    Field(FieldError),
    /// The mesh layout was rejected.
    Mesh(MeshError),
    /// A driver parameter is missing or malformed.
    Param(ParamError),
    /// `dt` is NaN, infinite, zero or negative.
    InvalidDt {
        /// The invalid value.
        value: f64,
    },
    /// `cfl` is not in `(0, 1]`.
    InvalidCfl {
        /// The invalid value.
        value: f64,
    },
    /// `regrid_interval` is zero.
    InvalidRegridInterval,
    /// An identifier appears twice in one of the active lists.
    DuplicateName {
        /// `"physics"` or `"pdes"`.
        list: &'static str,
        /// The repeated identifier.
        identifier: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registry(e) => write!(f, "registry: {e}"),
            Self::Field(e) => write!(f, "field: {e}"),
            Self::Mesh(e) => write!(f, "mesh: {e}"),
            Self::Param(e) => write!(f, "parameter: {e}"),
            Self::InvalidDt { value } => {
                write!(f, "dt must be finite and positive, got {value}")
            }
            Self::InvalidCfl { value } => write!(f, "cfl must be in (0, 1], got {value}"),
            Self::InvalidRegridInterval => write!(f, "regrid_interval must be at least 1"),
            Self::DuplicateName { list, identifier } => {
                write!(f, "'{identifier}' appears more than once in {list}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Registry(e) => Some(e),
            Self::Field(e) => Some(e),
            Self::Mesh(e) => Some(e),
            Self::Param(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RegistryError> for ConfigError {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

impl From<FieldError> for ConfigError {
    fn from(e: FieldError) -> Self {
        Self::Field(e)
    }
}

impl From<MeshError> for ConfigError {
    fn from(e: MeshError) -> Self {
        Self::Mesh(e)
    }
}

impl From<ParamError> for ConfigError {
    fn from(e: ParamError) -> Self {
        Self::Param(e)
    }
}

// ── LifecycleError ─────────────────────────────────────────────────

/// A driver call made in the wrong lifecycle phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LifecycleError {
    /// `to` cannot follow `from` (`None` means nothing has run yet).
    OutOfOrder {
        /// The last phase entered.
        from: Option<Phase>,
        /// The phase that was requested.
        to: Phase,
    },
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfOrder { from: Some(from), to } => {
                write!(f, "{to} cannot follow {from}")
            }
            Self::OutOfOrder { from: None, to } => {
                write!(f, "{to} cannot be the first phase")
            }
        }
    }
}

impl Error for LifecycleError {}

// ── SimError ───────────────────────────────────────────────────────

/// Any error surfaced by [`Simulation`](crate::Simulation).
#[derive(Clone, Debug, PartialEq)]
pub enum SimError {
    /// Setup or regrid configuration was rejected.
    Config(ConfigError),
    /// A driver call was made out of order.
    Lifecycle(LifecycleError),
    /// A physics, PDE or projection hook failed.
    Field(FieldError),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration: {e}"),
            Self::Lifecycle(e) => write!(f, "lifecycle: {e}"),
            Self::Field(e) => write!(f, "{e}"),
        }
    }
}

impl Error for SimError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Lifecycle(e) => Some(e),
            Self::Field(e) => Some(e),
        }
    }
}

impl From<ConfigError> for SimError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<LifecycleError> for SimError {
    fn from(e: LifecycleError) -> Self {
        Self::Lifecycle(e)
    }
}

impl From<FieldError> for SimError {
    fn from(e: FieldError) -> Self {
        Self::Field(e)
    }
}

impl From<RegistryError> for SimError {
    fn from(e: RegistryError) -> Self {
        Self::Config(ConfigError::Registry(e))
    }
}

impl From<MeshError> for SimError {
    fn from(e: MeshError) -> Self {
        Self::Config(ConfigError::Mesh(e))
    }
}

impl From<ParamError> for SimError {
    fn from(e: ParamError) -> Self {
        Self::Config(ConfigError::Param(e))
    }
}
