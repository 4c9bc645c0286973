//! Cell-centred index space and the physical geometry of a mesh level.
//!
//! An [`IndexBox`] is an inclusive range of cell indices. Linear offsets
//! into a box run with `i` fastest, then `j`, then `k`, which is the
//! layout every per-block data buffer in the workspace uses.

use crate::error::GeometryError;

/// Number of spatial dimensions.
pub const SPACEDIM: usize = 3;

/// A cell index `(i, j, k)`.
pub type IntVect = [i32; SPACEDIM];

/// An inclusive, cell-centred box `[lo, hi]` in index space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IndexBox {
    lo: IntVect,
    hi: IntVect,
}

impl IndexBox {
    /// Construct a box. Fails if `lo > hi` in any direction.
    pub fn new(lo: IntVect, hi: IntVect) -> Result<Self, GeometryError> {
        if (0..SPACEDIM).any(|d| lo[d] > hi[d]) {
            return Err(GeometryError::InvalidBox { lo, hi });
        }
        Ok(Self { lo, hi })
    }

    /// A box of `n` cells in every direction starting at the origin.
    ///
    /// # Panics
    ///
    /// Panics if `n` is zero.
    pub fn cube(n: i32) -> Self {
        assert!(n > 0, "cube size must be positive, got {n}");
        Self {
            lo: [0; SPACEDIM],
            hi: [n - 1; SPACEDIM],
        }
    }

    /// Lower corner.
    pub fn lo(&self) -> IntVect {
        self.lo
    }

    /// Upper corner (inclusive).
    pub fn hi(&self) -> IntVect {
        self.hi
    }

    /// Number of cells along direction `dir`.
    pub fn length(&self, dir: usize) -> usize {
        (self.hi[dir] - self.lo[dir] + 1) as usize
    }

    /// Total number of cells.
    pub fn num_cells(&self) -> usize {
        (0..SPACEDIM).map(|d| self.length(d)).product()
    }

    /// Whether `iv` lies inside the box.
    pub fn contains(&self, iv: IntVect) -> bool {
        (0..SPACEDIM).all(|d| iv[d] >= self.lo[d] && iv[d] <= self.hi[d])
    }

    /// Whether `other` lies entirely inside this box.
    pub fn contains_box(&self, other: &IndexBox) -> bool {
        self.contains(other.lo) && self.contains(other.hi)
    }

    /// The overlap of two boxes, if any.
    pub fn intersection(&self, other: &IndexBox) -> Option<IndexBox> {
        let mut lo = [0; SPACEDIM];
        let mut hi = [0; SPACEDIM];
        for d in 0..SPACEDIM {
            lo[d] = self.lo[d].max(other.lo[d]);
            hi[d] = self.hi[d].min(other.hi[d]);
            if lo[d] > hi[d] {
                return None;
            }
        }
        Some(IndexBox { lo, hi })
    }

    /// Whether two boxes share at least one cell.
    pub fn intersects(&self, other: &IndexBox) -> bool {
        self.intersection(other).is_some()
    }

    /// The box grown by `n` cells on every face.
    pub fn grow(&self, n: usize) -> IndexBox {
        let n = n as i32;
        IndexBox {
            lo: self.lo.map(|v| v - n),
            hi: self.hi.map(|v| v + n),
        }
    }

    /// The box covering the same region at `ratio` times finer resolution.
    pub fn refine(&self, ratio: i32) -> IndexBox {
        IndexBox {
            lo: self.lo.map(|v| v * ratio),
            hi: self.hi.map(|v| (v + 1) * ratio - 1),
        }
    }

    /// The box covering the same region at `ratio` times coarser resolution.
    pub fn coarsen(&self, ratio: i32) -> IndexBox {
        IndexBox {
            lo: self.lo.map(|v| v.div_euclid(ratio)),
            hi: self.hi.map(|v| v.div_euclid(ratio)),
        }
    }

    /// Linear offset of `iv` within the box (`i` fastest).
    pub fn offset(&self, iv: IntVect) -> Option<usize> {
        if !self.contains(iv) {
            return None;
        }
        let nx = self.length(0);
        let ny = self.length(1);
        let i = (iv[0] - self.lo[0]) as usize;
        let j = (iv[1] - self.lo[1]) as usize;
        let k = (iv[2] - self.lo[2]) as usize;
        Some(i + nx * (j + ny * k))
    }

    /// The cell index nearest to `iv` that lies inside the box.
    pub fn clamp(&self, iv: IntVect) -> IntVect {
        let mut out = iv;
        for d in 0..SPACEDIM {
            out[d] = iv[d].clamp(self.lo[d], self.hi[d]);
        }
        out
    }

    /// Split the box into chunks of at most `max_size` cells per direction.
    ///
    /// Chunks are returned in `i`-fastest order and tile the box exactly.
    pub fn chop(&self, max_size: usize) -> Vec<IndexBox> {
        let max_size = max_size.max(1) as i32;
        let ranges: Vec<Vec<(i32, i32)>> = (0..SPACEDIM)
            .map(|d| {
                let mut out = Vec::new();
                let mut start = self.lo[d];
                while start <= self.hi[d] {
                    let end = (start + max_size - 1).min(self.hi[d]);
                    out.push((start, end));
                    start = end + 1;
                }
                out
            })
            .collect();
        let mut boxes = Vec::new();
        for &(klo, khi) in &ranges[2] {
            for &(jlo, jhi) in &ranges[1] {
                for &(ilo, ihi) in &ranges[0] {
                    boxes.push(IndexBox {
                        lo: [ilo, jlo, klo],
                        hi: [ihi, jhi, khi],
                    });
                }
            }
        }
        boxes
    }

    /// Iterate over every cell of the box, `i` fastest.
    pub fn cells(&self) -> Cells {
        Cells {
            bx: *self,
            next: Some(self.lo),
        }
    }
}

/// Iterator over the cells of an [`IndexBox`].
#[derive(Clone, Debug)]
pub struct Cells {
    bx: IndexBox,
    next: Option<IntVect>,
}

impl Iterator for Cells {
    type Item = IntVect;

    fn next(&mut self) -> Option<IntVect> {
        let current = self.next?;
        let mut iv = current;
        let mut d = 0;
        loop {
            if d == SPACEDIM {
                self.next = None;
                break;
            }
            if iv[d] < self.bx.hi[d] {
                iv[d] += 1;
                self.next = Some(iv);
                break;
            }
            iv[d] = self.bx.lo[d];
            d += 1;
        }
        Some(current)
    }
}

/// Physical description of one mesh level: its index domain and the
/// physical extents that domain spans.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Geometry {
    domain: IndexBox,
    prob_lo: [f64; SPACEDIM],
    prob_hi: [f64; SPACEDIM],
}

impl Geometry {
    /// Construct a geometry. Extents must be finite and `prob_lo < prob_hi`.
    pub fn new(
        domain: IndexBox,
        prob_lo: [f64; SPACEDIM],
        prob_hi: [f64; SPACEDIM],
    ) -> Result<Self, GeometryError> {
        for d in 0..SPACEDIM {
            if !prob_lo[d].is_finite() || !prob_hi[d].is_finite() {
                return Err(GeometryError::InvalidExtents {
                    reason: format!("direction {d} has non-finite extents"),
                });
            }
            if prob_lo[d] >= prob_hi[d] {
                return Err(GeometryError::InvalidExtents {
                    reason: format!(
                        "direction {d}: prob_lo {} must be below prob_hi {}",
                        prob_lo[d], prob_hi[d]
                    ),
                });
            }
        }
        Ok(Self {
            domain,
            prob_lo,
            prob_hi,
        })
    }

    /// A unit cube `[0, 1]^3` discretized by `n` cells per direction.
    pub fn unit_cube(n: i32) -> Self {
        Self {
            domain: IndexBox::cube(n),
            prob_lo: [0.0; SPACEDIM],
            prob_hi: [1.0; SPACEDIM],
        }
    }

    /// The index-space domain of the level.
    pub fn domain(&self) -> IndexBox {
        self.domain
    }

    /// Lower physical corner.
    pub fn prob_lo(&self) -> [f64; SPACEDIM] {
        self.prob_lo
    }

    /// Upper physical corner.
    pub fn prob_hi(&self) -> [f64; SPACEDIM] {
        self.prob_hi
    }

    /// Cell size along direction `dir`.
    pub fn cell_size(&self, dir: usize) -> f64 {
        (self.prob_hi[dir] - self.prob_lo[dir]) / self.domain.length(dir) as f64
    }

    /// Cell sizes in all directions.
    pub fn cell_sizes(&self) -> [f64; SPACEDIM] {
        [self.cell_size(0), self.cell_size(1), self.cell_size(2)]
    }

    /// Physical coordinates of the centre of cell `iv`.
    pub fn cell_center(&self, iv: IntVect) -> [f64; SPACEDIM] {
        let mut x = [0.0; SPACEDIM];
        for d in 0..SPACEDIM {
            let rel = (iv[d] - self.domain.lo()[d]) as f64 + 0.5;
            x[d] = self.prob_lo[d] + rel * self.cell_size(d);
        }
        x
    }

    /// The same physical region discretized `ratio` times finer.
    pub fn refine(&self, ratio: i32) -> Geometry {
        Geometry {
            domain: self.domain.refine(ratio),
            prob_lo: self.prob_lo,
            prob_hi: self.prob_hi,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_rejects_inverted_box() {
        assert!(IndexBox::new([0, 0, 0], [1, -1, 1]).is_err());
        assert!(IndexBox::new([0, 0, 0], [0, 0, 0]).is_ok());
    }

    #[test]
    fn cells_iterate_i_fastest() {
        let bx = IndexBox::new([0, 0, 0], [1, 1, 0]).unwrap();
        let cells: Vec<_> = bx.cells().collect();
        assert_eq!(cells, vec![[0, 0, 0], [1, 0, 0], [0, 1, 0], [1, 1, 0]]);
    }

    #[test]
    fn offset_matches_iteration_order() {
        let bx = IndexBox::new([-1, 2, 3], [1, 3, 4]).unwrap();
        for (n, iv) in bx.cells().enumerate() {
            assert_eq!(bx.offset(iv), Some(n));
        }
        assert_eq!(bx.offset([5, 5, 5]), None);
    }

    #[test]
    fn grow_refine_coarsen() {
        let bx = IndexBox::new([0, 0, 0], [3, 3, 3]).unwrap();
        assert_eq!(bx.grow(2).lo(), [-2, -2, -2]);
        assert_eq!(bx.grow(2).hi(), [5, 5, 5]);
        let fine = bx.refine(2);
        assert_eq!(fine.hi(), [7, 7, 7]);
        assert_eq!(fine.coarsen(2), bx);
    }

    #[test]
    fn chop_tiles_the_box() {
        let bx = IndexBox::cube(10);
        let chunks = bx.chop(4);
        assert_eq!(chunks.len(), 27);
        let total: usize = chunks.iter().map(|b| b.num_cells()).sum();
        assert_eq!(total, bx.num_cells());
        for (a, ba) in chunks.iter().enumerate() {
            for bb in &chunks[a + 1..] {
                assert!(!ba.intersects(bb));
            }
        }
    }

    #[test]
    fn geometry_cell_centers() {
        let geom = Geometry::unit_cube(4);
        assert_eq!(geom.cell_size(0), 0.25);
        assert_eq!(geom.cell_center([0, 1, 3]), [0.125, 0.375, 0.875]);
        assert_eq!(geom.refine(2).cell_size(2), 0.125);
    }

    #[test]
    fn geometry_rejects_bad_extents() {
        let dom = IndexBox::cube(2);
        assert!(Geometry::new(dom, [0.0; 3], [1.0, 0.0, 1.0]).is_err());
        assert!(Geometry::new(dom, [0.0; 3], [1.0, f64::NAN, 1.0]).is_err());
    }

    fn arb_box() -> impl Strategy<Value = IndexBox> {
        (
            prop::array::uniform3(-8i32..8),
            prop::array::uniform3(0i32..6),
        )
            .prop_map(|(lo, ext)| {
                IndexBox::new(lo, [lo[0] + ext[0], lo[1] + ext[1], lo[2] + ext[2]]).unwrap()
            })
    }

    proptest! {
        #[test]
        fn intersection_is_commutative(a in arb_box(), b in arb_box()) {
            prop_assert_eq!(a.intersection(&b), b.intersection(&a));
        }

        #[test]
        fn intersection_contained_in_both(a in arb_box(), b in arb_box()) {
            if let Some(c) = a.intersection(&b) {
                prop_assert!(a.contains_box(&c));
                prop_assert!(b.contains_box(&c));
            }
        }

        #[test]
        fn cell_count_matches_iterator(a in arb_box()) {
            prop_assert_eq!(a.cells().count(), a.num_cells());
        }

        #[test]
        fn clamp_lands_inside(a in arb_box(), iv in prop::array::uniform3(-20i32..20)) {
            prop_assert!(a.contains(a.clamp(iv)));
        }
    }
}
