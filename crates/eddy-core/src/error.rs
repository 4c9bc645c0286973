//! Error types for the Eddy solver core.
//!
//! Organized by subsystem: registry/collection (configuration errors that
//! surface to the driver), field repository, index-space geometry, and the
//! run-time parameter table.

use std::error::Error;
use std::fmt;

use crate::geometry::IntVect;

/// Errors from a [`Registry`](crate::Registry) or a
/// [`CollectionMgr`](crate::CollectionMgr).
///
/// All variants except [`DuplicateRegistration`](Self::DuplicateRegistration)
/// are configuration errors: they originate from the run-time list of
/// active identifiers and are reported to the user before any timestep runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// A constructor was registered twice under the same identifier.
    DuplicateRegistration {
        /// Base category, e.g. `"Physics"`.
        category: &'static str,
        /// The offending identifier.
        identifier: String,
    },
    /// No constructor is registered under the identifier.
    UnknownIdentifier {
        /// Base category, e.g. `"PDE"`.
        category: &'static str,
        /// The identifier that was requested.
        identifier: String,
        /// Identifiers that are registered, in registration order.
        available: Vec<String>,
    },
    /// A collection manager already holds an instance with this identifier.
    DuplicateInstance {
        /// Base category of the collection.
        category: &'static str,
        /// The offending identifier.
        identifier: String,
    },
    /// The constructor ran but rejected its construction context.
    ConstructionFailed {
        /// Base category of the constructor.
        category: &'static str,
        /// Identifier being constructed.
        identifier: String,
        /// Human-readable cause reported by the constructor.
        reason: String,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateRegistration {
                category,
                identifier,
            } => write!(f, "{category} '{identifier}' is already registered"),
            Self::UnknownIdentifier {
                category,
                identifier,
                available,
            } => {
                write!(f, "unknown {category} identifier '{identifier}'")?;
                if !available.is_empty() {
                    write!(f, " (available: {})", available.join(", "))?;
                }
                Ok(())
            }
            Self::DuplicateInstance {
                category,
                identifier,
            } => write!(f, "{category} '{identifier}' is already active"),
            Self::ConstructionFailed {
                category,
                identifier,
                reason,
            } => write!(f, "failed to construct {category} '{identifier}': {reason}"),
        }
    }
}

impl Error for RegistryError {}

/// Errors from field declaration and per-level field access.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldError {
    /// No field is declared under this name.
    UnknownField {
        /// The requested name.
        name: String,
    },
    /// A field ID that was not issued by this repository.
    UnknownId {
        /// The raw ID.
        id: u32,
    },
    /// A field was redeclared with different attributes.
    Conflicting {
        /// Field name.
        name: String,
        /// Description of the mismatch.
        reason: String,
    },
    /// A declaration with invalid attributes (zero components, bad state count).
    InvalidDeclaration {
        /// Field name.
        name: String,
        /// Description of the problem.
        reason: String,
    },
    /// The requested level is not active.
    LevelOutOfRange {
        /// Requested level.
        level: usize,
        /// Number of active levels.
        num_levels: usize,
    },
    /// The requested component exceeds the field's component count.
    ComponentOutOfRange {
        /// Field name.
        name: String,
        /// Requested component.
        component: usize,
        /// Number of components the field carries.
        ncomp: usize,
    },
    /// The field does not retain the requested time state.
    StateNotRetained {
        /// Field name.
        name: String,
        /// Requested state, e.g. `"old"`.
        state: &'static str,
    },
    /// A replacement array does not match the field's layout.
    LayoutMismatch {
        /// Field name.
        name: String,
        /// Description of the mismatch.
        reason: String,
    },
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownField { name } => write!(f, "no field named '{name}'"),
            Self::UnknownId { id } => write!(f, "field id {id} was not issued by this repository"),
            Self::Conflicting { name, reason } => {
                write!(f, "field '{name}' redeclared with different attributes: {reason}")
            }
            Self::InvalidDeclaration { name, reason } => {
                write!(f, "invalid declaration of field '{name}': {reason}")
            }
            Self::LevelOutOfRange { level, num_levels } => {
                write!(f, "level {level} out of range ({num_levels} active levels)")
            }
            Self::ComponentOutOfRange {
                name,
                component,
                ncomp,
            } => write!(
                f,
                "component {component} out of range for field '{name}' ({ncomp} components)"
            ),
            Self::StateNotRetained { name, state } => {
                write!(f, "field '{name}' does not retain the {state} state")
            }
            Self::LayoutMismatch { name, reason } => {
                write!(f, "layout mismatch for field '{name}': {reason}")
            }
        }
    }
}

impl Error for FieldError {}

/// Errors from index-space construction.
#[derive(Clone, Debug, PartialEq)]
pub enum GeometryError {
    /// A box whose lower corner exceeds its upper corner in some direction.
    InvalidBox {
        /// Lower corner.
        lo: IntVect,
        /// Upper corner.
        hi: IntVect,
    },
    /// Physical extents that are non-finite or not strictly increasing.
    InvalidExtents {
        /// Description of the problem.
        reason: String,
    },
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBox { lo, hi } => write!(f, "invalid box: lo {lo:?} exceeds hi {hi:?}"),
            Self::InvalidExtents { reason } => write!(f, "invalid physical extents: {reason}"),
        }
    }
}

impl Error for GeometryError {}

/// Errors from typed lookups in a [`ParamTable`](crate::ParamTable).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamError {
    /// The key is not present.
    Missing {
        /// Fully-qualified key.
        key: String,
    },
    /// The key is present but holds a different type.
    WrongType {
        /// Fully-qualified key.
        key: String,
        /// Expected type name.
        expected: &'static str,
        /// Actual type name.
        found: &'static str,
    },
    /// The value has the right type but an invalid length or range.
    Invalid {
        /// Fully-qualified key.
        key: String,
        /// Description of the problem.
        reason: String,
    },
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { key } => write!(f, "missing parameter '{key}'"),
            Self::WrongType {
                key,
                expected,
                found,
            } => write!(f, "parameter '{key}' expected {expected}, found {found}"),
            Self::Invalid { key, reason } => write!(f, "invalid parameter '{key}': {reason}"),
        }
    }
}

impl Error for ParamError {}
