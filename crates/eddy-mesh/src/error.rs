//! Errors from mesh layout validation.

use std::error::Error;
use std::fmt;

use eddy_core::{GeometryError, IndexBox};

/// A mesh layout that cannot be applied.
#[derive(Clone, Debug, PartialEq)]
pub enum MeshError {
    /// The layout has no levels.
    NoLevels,
    /// Refinement ratio below 2.
    InvalidRefRatio {
        /// The rejected ratio.
        ratio: i32,
    },
    /// A level with no boxes.
    EmptyLevel {
        /// Level index.
        level: usize,
    },
    /// A box extends past the level's domain.
    BoxOutsideDomain {
        /// Level index.
        level: usize,
        /// The offending box.
        bx: IndexBox,
    },
    /// Two boxes of the same level share cells.
    OverlappingBoxes {
        /// Level index.
        level: usize,
        /// First box.
        a: IndexBox,
        /// Second box.
        b: IndexBox,
    },
    /// The owner list does not have one entry per box.
    OwnerMismatch {
        /// Level index.
        level: usize,
        /// Number of boxes.
        boxes: usize,
        /// Number of owners.
        owners: usize,
    },
    /// A fine level's domain is not the refined coarse domain.
    DomainMismatch {
        /// The fine level.
        level: usize,
    },
    /// A fine box is not covered by the next coarser level.
    NotNested {
        /// The fine level.
        level: usize,
        /// The offending fine box.
        bx: IndexBox,
    },
    /// Invalid geometry for a level.
    Geometry(GeometryError),
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoLevels => write!(f, "mesh layout has no levels"),
            Self::InvalidRefRatio { ratio } => {
                write!(f, "refinement ratio must be at least 2, got {ratio}")
            }
            Self::EmptyLevel { level } => write!(f, "level {level} has no boxes"),
            Self::BoxOutsideDomain { level, bx } => {
                write!(f, "box {bx:?} on level {level} extends past the domain")
            }
            Self::OverlappingBoxes { level, a, b } => {
                write!(f, "boxes {a:?} and {b:?} on level {level} overlap")
            }
            Self::OwnerMismatch {
                level,
                boxes,
                owners,
            } => write!(f, "level {level} has {boxes} boxes but {owners} owners"),
            Self::DomainMismatch { level } => write!(
                f,
                "domain of level {level} is not the refined domain of level {}",
                level - 1
            ),
            Self::NotNested { level, bx } => write!(
                f,
                "box {bx:?} on level {level} is not covered by level {}",
                level - 1
            ),
            Self::Geometry(e) => write!(f, "invalid geometry: {e}"),
        }
    }
}

impl Error for MeshError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Geometry(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GeometryError> for MeshError {
    fn from(e: GeometryError) -> Self {
        Self::Geometry(e)
    }
}
