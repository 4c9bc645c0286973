//! Read-only per-level views used by reductions, and scratch fields.

use eddy_core::IndexBox;
use eddy_mesh::LevelArray;

use crate::state::FieldInfo;

/// A named quantity with one [`LevelArray`] per active level.
///
/// Implemented by repository fields (through [`FieldView`]) and by
/// [`ScratchField`], so the reductions in [`crate::reduce`] accept both.
pub trait LevelView {
    /// Name used in error messages.
    fn name(&self) -> &str;

    /// Number of components.
    fn ncomp(&self) -> usize;

    /// Number of levels.
    fn num_levels(&self) -> usize;

    /// Storage for level `lev`.
    ///
    /// # Panics
    ///
    /// Panics if `lev >= num_levels()`.
    fn level(&self, lev: usize) -> &LevelArray;
}

/// A borrowed view of one time state of a repository field.
#[derive(Clone, Copy, Debug)]
pub struct FieldView<'a> {
    info: &'a FieldInfo,
    levels: &'a [LevelArray],
}

impl<'a> FieldView<'a> {
    pub(crate) fn new(info: &'a FieldInfo, levels: &'a [LevelArray]) -> Self {
        Self { info, levels }
    }

    /// Attributes of the viewed field.
    pub fn info(&self) -> &'a FieldInfo {
        self.info
    }
}

impl LevelView for FieldView<'_> {
    fn name(&self) -> &str {
        &self.info.name
    }

    fn ncomp(&self) -> usize {
        self.info.ncomp
    }

    fn num_levels(&self) -> usize {
        self.levels.len()
    }

    fn level(&self, lev: usize) -> &LevelArray {
        &self.levels[lev]
    }
}

/// A temporary per-level field outside the repository.
///
/// Used for intermediate results (stage residuals, diagnostics). Not
/// persisted and not regridded: allocate a fresh one after a regrid.
#[derive(Clone, Debug, PartialEq)]
pub struct ScratchField {
    name: String,
    ncomp: usize,
    nghost: usize,
    levels: Vec<LevelArray>,
}

impl ScratchField {
    /// Zero-filled storage over `level_boxes`.
    pub fn new(name: &str, ncomp: usize, nghost: usize, level_boxes: &[Vec<IndexBox>]) -> Self {
        Self {
            name: name.to_string(),
            ncomp,
            nghost,
            levels: level_boxes
                .iter()
                .map(|boxes| LevelArray::new(boxes, ncomp, nghost))
                .collect(),
        }
    }

    /// Ghost width.
    pub fn nghost(&self) -> usize {
        self.nghost
    }

    /// Mutable storage for level `lev`.
    ///
    /// # Panics
    ///
    /// Panics if `lev >= num_levels()`.
    pub fn level_mut(&mut self, lev: usize) -> &mut LevelArray {
        &mut self.levels[lev]
    }

    /// Set every value on every level.
    pub fn fill(&mut self, value: f64) {
        for l in &mut self.levels {
            l.fill(value);
        }
    }
}

impl LevelView for ScratchField {
    fn name(&self) -> &str {
        &self.name
    }

    fn ncomp(&self) -> usize {
        self.ncomp
    }

    fn num_levels(&self) -> usize {
        self.levels.len()
    }

    fn level(&self, lev: usize) -> &LevelArray {
        &self.levels[lev]
    }
}
