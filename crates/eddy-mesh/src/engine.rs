//! The mesh engine seam.

use eddy_core::{Geometry, IndexBox, IntVect, SPACEDIM};

use crate::array::LevelArray;
use crate::collective::Collective;
use crate::error::MeshError;
use crate::layout::MeshLayout;

/// The distributed mesh and array engine the solver core runs on.
///
/// Implementations own the box decomposition and the communication
/// layer. The core only asks for level descriptions, array allocation,
/// ghost fill, the regrid data moves and global reductions.
///
/// # Level indices
///
/// Methods taking `lev` panic if `lev >= num_levels()`; level indices
/// come from the engine itself, so an out-of-range index is a caller bug.
pub trait MeshEngine: Send {
    /// The current hierarchy.
    fn layout(&self) -> &MeshLayout;

    /// The reduction layer shared by every rank.
    fn collective(&self) -> &dyn Collective;

    /// Replace the hierarchy (regrid). The layout is validated first; on
    /// error the engine keeps its previous layout.
    fn apply_layout(&mut self, layout: MeshLayout) -> Result<(), MeshError>;

    /// Fill the ghost cells of `array` on level `lev`.
    ///
    /// Ghost cells outside the physical domain receive `bc[comp]` (the
    /// last entry is reused for components past the end of `bc`, zero if
    /// it is empty).
    fn fill_boundary(&self, lev: usize, array: &mut LevelArray, bc: &[f64]);

    /// Number of active levels.
    fn num_levels(&self) -> usize {
        self.layout().num_levels()
    }

    /// Refinement ratio between consecutive levels.
    fn ref_ratio(&self) -> i32 {
        self.layout().ref_ratio()
    }

    /// Geometry of level `lev`.
    fn geometry(&self, lev: usize) -> Geometry {
        *self.layout().level(lev).geometry()
    }

    /// Every box of level `lev`, on every rank.
    fn boxes(&self, lev: usize) -> &[IndexBox] {
        self.layout().level(lev).boxes()
    }

    /// The boxes of level `lev` owned by this rank.
    fn local_boxes(&self, lev: usize) -> Vec<IndexBox> {
        self.layout()
            .level(lev)
            .local_boxes(self.collective().rank())
    }

    /// Allocate a zero-filled array over this rank's boxes of level `lev`.
    fn allocate(&self, lev: usize, ncomp: usize, nghost: usize) -> LevelArray {
        LevelArray::new(&self.local_boxes(lev), ncomp, nghost)
    }

    /// Copy `src` into `dst` on level `lev` wherever their valid regions
    /// overlap, whichever ranks own the two sides.
    ///
    /// `dst` is laid out on the current boxes of `lev`; `src_boxes` lists
    /// every box `src` was laid out on, across all ranks. The default
    /// issues one [`Collective::sum_all`] per overlapping pair of boxes,
    /// in the same order on every rank.
    fn parallel_copy(&self, lev: usize, dst: &mut LevelArray, src: &LevelArray, src_boxes: &[IndexBox]) {
        let ncomp = dst.ncomp().min(src.ncomp());
        for dst_box in self.boxes(lev) {
            for src_box in src_boxes {
                let Some(overlap) = dst_box.intersection(src_box) else {
                    continue;
                };
                let cells: Vec<IntVect> = overlap.cells().collect();
                exchange(self.collective(), dst, &cells, ncomp, |iv, comp| {
                    src.local_probe(iv, comp)
                });
            }
        }
    }

    /// Fill the cells of `fine` on level `lev` that lie outside `keep` by
    /// injection from `coarse` on level `lev - 1`.
    ///
    /// Each fine cell takes the value of its parent coarse cell, wherever
    /// that cell is owned. The default issues one [`Collective::sum_all`]
    /// per box of `lev` with cells outside `keep`.
    fn interp_from_coarse(&self, lev: usize, fine: &mut LevelArray, coarse: &LevelArray, keep: &[IndexBox]) {
        let ratio = self.ref_ratio();
        let ncomp = fine.ncomp().min(coarse.ncomp());
        for fine_box in self.boxes(lev) {
            let cells: Vec<IntVect> = fine_box
                .cells()
                .filter(|iv| !keep.iter().any(|b| b.contains(*iv)))
                .collect();
            if cells.is_empty() {
                continue;
            }
            exchange(self.collective(), fine, &cells, ncomp, |iv, comp| {
                coarse.local_probe(parent_cell(iv, ratio), comp)
            });
        }
    }
}

/// The coarse cell holding fine cell `iv`.
pub fn parent_cell(iv: IntVect, ratio: i32) -> IntVect {
    let mut civ = iv;
    for d in 0..SPACEDIM {
        civ[d] = iv[d].div_euclid(ratio);
    }
    civ
}

/// Gather `local` over `cells` from every rank with one masked sum, and
/// store the results in the cells of `dst` this rank owns.
///
/// `local` must be nonzero on at most one rank per cell.
fn exchange(
    collective: &dyn Collective,
    dst: &mut LevelArray,
    cells: &[IntVect],
    ncomp: usize,
    local: impl Fn(IntVect, usize) -> f64,
) {
    let mut values = Vec::with_capacity(cells.len() * ncomp);
    for &iv in cells {
        for comp in 0..ncomp {
            values.push(local(iv, comp));
        }
    }
    collective.sum_all(&mut values);
    for (n, &iv) in cells.iter().enumerate() {
        for comp in 0..ncomp {
            dst.set_valid(iv, comp, values[n * ncomp + comp]);
        }
    }
}

/// Boundary value for `comp` from a per-component list.
pub fn bc_value(bc: &[f64], comp: usize) -> f64 {
    match bc.get(comp) {
        Some(v) => *v,
        None => bc.last().copied().unwrap_or(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bc_value_reuses_last_entry() {
        assert_eq!(bc_value(&[1.0, 2.0], 0), 1.0);
        assert_eq!(bc_value(&[1.0, 2.0], 5), 2.0);
        assert_eq!(bc_value(&[], 0), 0.0);
    }

    #[test]
    fn parent_cell_rounds_toward_negative_infinity() {
        assert_eq!(parent_cell([5, 0, 7], 2), [2, 0, 3]);
        assert_eq!(parent_cell([-1, -2, -3], 2), [-1, -1, -2]);
    }
}
