//! Per-level distributed array storage.
//!
//! A [`LevelArray`] holds the locally-owned [`Block`]s of one field on one
//! level. Each block stores its valid box grown by the ghost width, one
//! contiguous component after another, with `i` fastest inside a
//! component.

use eddy_core::{IndexBox, IntVect};

/// One locally-owned block of a level array: a valid box plus its halo.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    valid: IndexBox,
    grown: IndexBox,
    ncomp: usize,
    data: Vec<f64>,
}

impl Block {
    /// A zero-filled block over `valid` grown by `nghost`.
    pub fn new(valid: IndexBox, ncomp: usize, nghost: usize) -> Self {
        let grown = valid.grow(nghost);
        Self {
            valid,
            grown,
            ncomp,
            data: vec![0.0; grown.num_cells() * ncomp],
        }
    }

    /// The valid (owned) region.
    pub fn valid(&self) -> IndexBox {
        self.valid
    }

    /// The valid region plus ghost cells.
    pub fn grown(&self) -> IndexBox {
        self.grown
    }

    /// Number of components.
    pub fn ncomp(&self) -> usize {
        self.ncomp
    }

    fn index(&self, iv: IntVect, comp: usize) -> Option<usize> {
        if comp >= self.ncomp {
            return None;
        }
        self.grown
            .offset(iv)
            .map(|off| comp * self.grown.num_cells() + off)
    }

    /// Value at `iv` (valid or ghost), or `None` outside the grown box.
    pub fn get(&self, iv: IntVect, comp: usize) -> Option<f64> {
        self.index(iv, comp).map(|n| self.data[n])
    }

    /// Mutable reference to the value at `iv` (valid or ghost).
    pub fn get_mut(&mut self, iv: IntVect, comp: usize) -> Option<&mut f64> {
        self.index(iv, comp).map(move |n| &mut self.data[n])
    }

    /// Write `value` at `iv`. Returns `false` if `iv` is outside the grown box.
    pub fn set(&mut self, iv: IntVect, comp: usize, value: f64) -> bool {
        match self.get_mut(iv, comp) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// All values of one component over the grown box.
    pub fn comp(&self, comp: usize) -> &[f64] {
        let n = self.grown.num_cells();
        &self.data[comp * n..(comp + 1) * n]
    }

    /// Mutable counterpart of [`comp`](Self::comp).
    pub fn comp_mut(&mut self, comp: usize) -> &mut [f64] {
        let n = self.grown.num_cells();
        &mut self.data[comp * n..(comp + 1) * n]
    }

    /// Raw storage.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Mutable raw storage.
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }
}

/// The locally-owned blocks of one field on one level.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelArray {
    ncomp: usize,
    nghost: usize,
    blocks: Vec<Block>,
}

impl LevelArray {
    /// Allocate zero-filled blocks over `boxes`.
    pub fn new(boxes: &[IndexBox], ncomp: usize, nghost: usize) -> Self {
        Self {
            ncomp,
            nghost,
            blocks: boxes
                .iter()
                .map(|bx| Block::new(*bx, ncomp, nghost))
                .collect(),
        }
    }

    /// A zero-filled array with the same boxes, components and ghosts.
    pub fn zeros_like(&self) -> Self {
        Self {
            ncomp: self.ncomp,
            nghost: self.nghost,
            blocks: self
                .blocks
                .iter()
                .map(|b| Block::new(b.valid, b.ncomp, self.nghost))
                .collect(),
        }
    }

    /// Number of components.
    pub fn ncomp(&self) -> usize {
        self.ncomp
    }

    /// Ghost width.
    pub fn nghost(&self) -> usize {
        self.nghost
    }

    /// Local blocks.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Mutable local blocks.
    pub fn blocks_mut(&mut self) -> &mut [Block] {
        &mut self.blocks
    }

    /// Valid boxes of the local blocks.
    pub fn boxes(&self) -> Vec<IndexBox> {
        self.blocks.iter().map(Block::valid).collect()
    }

    /// Number of locally-owned valid cells.
    pub fn valid_cells(&self) -> usize {
        self.blocks.iter().map(|b| b.valid.num_cells()).sum()
    }

    /// Set every value, ghosts included.
    pub fn fill(&mut self, value: f64) {
        for b in &mut self.blocks {
            b.data.fill(value);
        }
    }

    /// Set every value of one component, ghosts included.
    pub fn fill_comp(&mut self, comp: usize, value: f64) {
        for b in &mut self.blocks {
            b.comp_mut(comp).fill(value);
        }
    }

    /// Value at `iv` from the block whose valid region holds it.
    pub fn value_at(&self, iv: IntVect, comp: usize) -> Option<f64> {
        self.blocks
            .iter()
            .find(|b| b.valid.contains(iv))
            .and_then(|b| b.get(iv, comp))
    }

    /// Write `value` into the block whose valid region holds `iv`.
    pub fn set_valid(&mut self, iv: IntVect, comp: usize, value: f64) -> bool {
        match self.blocks.iter_mut().find(|b| b.valid.contains(iv)) {
            Some(b) => b.set(iv, comp, value),
            None => false,
        }
    }

    /// Visit every valid cell of one component.
    pub fn for_each_valid(&self, comp: usize, mut f: impl FnMut(IntVect, f64)) {
        for b in &self.blocks {
            for iv in b.valid.cells() {
                if let Some(v) = b.get(iv, comp) {
                    f(iv, v);
                }
            }
        }
    }

    /// Mutably visit every valid cell of one component.
    pub fn for_each_valid_mut(&mut self, comp: usize, mut f: impl FnMut(IntVect, &mut f64)) {
        for b in &mut self.blocks {
            let valid = b.valid;
            for iv in valid.cells() {
                if let Some(v) = b.get_mut(iv, comp) {
                    f(iv, v);
                }
            }
        }
    }

    /// Minimum over locally-owned valid cells; `f64::MAX` with no blocks.
    pub fn local_min(&self, comp: usize) -> f64 {
        let mut acc = f64::MAX;
        self.for_each_valid(comp, |_, v| acc = acc.min(v));
        acc
    }

    /// Maximum over locally-owned valid cells; `f64::MIN` with no blocks.
    pub fn local_max(&self, comp: usize) -> f64 {
        let mut acc = f64::MIN;
        self.for_each_valid(comp, |_, v| acc = acc.max(v));
        acc
    }

    /// Masked local contribution to a point probe.
    ///
    /// Sums the value at `iv` over every local block whose valid region
    /// contains it. Valid regions are disjoint, so the global sum of this
    /// quantity is the value at `iv` if any rank owns it, and zero
    /// otherwise.
    pub fn local_probe(&self, iv: IntVect, comp: usize) -> f64 {
        self.blocks
            .iter()
            .filter(|b| b.valid.contains(iv))
            .filter_map(|b| b.get(iv, comp))
            .sum()
    }

    /// Copy every component from `src` where the valid regions overlap.
    ///
    /// Component counts must agree; only `min(ncomp)` components are copied.
    pub fn copy_overlap_from(&mut self, src: &LevelArray) {
        let ncomp = self.ncomp.min(src.ncomp);
        for dst in &mut self.blocks {
            for s in &src.blocks {
                let Some(overlap) = dst.valid.intersection(&s.valid) else {
                    continue;
                };
                for comp in 0..ncomp {
                    for iv in overlap.cells() {
                        if let Some(v) = s.get(iv, comp) {
                            dst.set(iv, comp, v);
                        }
                    }
                }
            }
        }
    }

    /// Copy every value, ghosts included, from an array with the same layout.
    ///
    /// Returns `false` and leaves `self` untouched if the layouts differ.
    pub fn copy_from(&mut self, src: &LevelArray) -> bool {
        if !self.same_layout(src) {
            return false;
        }
        for (d, s) in self.blocks.iter_mut().zip(&src.blocks) {
            d.data.copy_from_slice(&s.data);
        }
        true
    }

    /// Whether `other` has the same boxes, components and ghost width.
    pub fn same_layout(&self, other: &LevelArray) -> bool {
        self.ncomp == other.ncomp
            && self.nghost == other.nghost
            && self.blocks.len() == other.blocks.len()
            && self
                .blocks
                .iter()
                .zip(&other.blocks)
                .all(|(a, b)| a.valid == b.valid)
    }

    /// `self += scale * other` over every value, for arrays with the same layout.
    pub fn saxpy(&mut self, scale: f64, other: &LevelArray) -> bool {
        if !self.same_layout(other) {
            return false;
        }
        for (d, s) in self.blocks.iter_mut().zip(&other.blocks) {
            for (x, y) in d.data.iter_mut().zip(&s.data) {
                *x += scale * y;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bx(lo: IntVect, hi: IntVect) -> IndexBox {
        IndexBox::new(lo, hi).unwrap()
    }

    #[test]
    fn block_layout_is_component_major() {
        let mut b = Block::new(bx([0, 0, 0], [1, 0, 0]), 2, 1);
        assert_eq!(b.grown(), bx([-1, -1, -1], [2, 1, 1]));
        assert_eq!(b.data().len(), 2 * 4 * 3 * 3);
        assert!(b.set([0, 0, 0], 1, 7.0));
        assert_eq!(b.comp(1).iter().filter(|v| **v == 7.0).count(), 1);
        assert!(b.comp(0).iter().all(|v| *v == 0.0));
        assert!(!b.set([5, 0, 0], 0, 1.0));
        assert_eq!(b.get([0, 0, 0], 2), None);
    }

    #[test]
    fn local_reductions_ignore_ghosts() {
        let mut a = LevelArray::new(&[bx([0, 0, 0], [1, 1, 1])], 1, 2);
        a.fill(-100.0);
        a.for_each_valid_mut(0, |iv, v| *v = iv[0] as f64 + 1.0);
        assert_eq!(a.local_min(0), 1.0);
        assert_eq!(a.local_max(0), 2.0);
    }

    #[test]
    fn empty_array_reduces_to_neutral_values() {
        let a = LevelArray::new(&[], 1, 0);
        assert_eq!(a.local_min(0), f64::MAX);
        assert_eq!(a.local_max(0), f64::MIN);
        assert_eq!(a.local_probe([0, 0, 0], 0), 0.0);
    }

    #[test]
    fn probe_is_masked_by_ownership() {
        let mut a = LevelArray::new(&[bx([0, 0, 0], [1, 1, 1]), bx([2, 0, 0], [3, 1, 1])], 1, 1);
        a.fill(3.0);
        // The ghost of the first block overlaps the second block's valid cell.
        assert_eq!(a.local_probe([2, 0, 0], 0), 3.0);
        assert_eq!(a.local_probe([9, 0, 0], 0), 0.0);
    }

    #[test]
    fn copy_overlap_preserves_shared_cells() {
        let mut old = LevelArray::new(&[bx([0, 0, 0], [3, 0, 0])], 1, 1);
        old.for_each_valid_mut(0, |iv, v| *v = 10.0 + iv[0] as f64);
        let mut new = LevelArray::new(&[bx([2, 0, 0], [5, 0, 0])], 1, 1);
        new.copy_overlap_from(&old);
        assert_eq!(new.value_at([2, 0, 0], 0), Some(12.0));
        assert_eq!(new.value_at([3, 0, 0], 0), Some(13.0));
        assert_eq!(new.value_at([4, 0, 0], 0), Some(0.0));
    }

    #[test]
    fn saxpy_requires_matching_layout() {
        let mut a = LevelArray::new(&[bx([0, 0, 0], [1, 1, 1])], 1, 0);
        let mut b = a.zeros_like();
        a.fill(1.0);
        b.fill(2.0);
        assert!(a.saxpy(0.5, &b));
        assert_eq!(a.value_at([1, 1, 1], 0), Some(2.0));
        let c = LevelArray::new(&[bx([0, 0, 0], [2, 1, 1])], 1, 0);
        assert!(!a.saxpy(1.0, &c));
    }
}
