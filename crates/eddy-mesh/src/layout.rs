//! Box decomposition of a mesh hierarchy.

use smallvec::SmallVec;

use eddy_core::{Geometry, IndexBox};

use crate::error::MeshError;

/// Geometry, boxes and box owners of one level.
#[derive(Clone, Debug, PartialEq)]
pub struct LevelLayout {
    geometry: Geometry,
    boxes: Vec<IndexBox>,
    owners: Vec<usize>,
}

impl LevelLayout {
    /// A level whose boxes are all owned by rank 0.
    pub fn new(geometry: Geometry, boxes: Vec<IndexBox>) -> Self {
        let owners = vec![0; boxes.len()];
        Self {
            geometry,
            boxes,
            owners,
        }
    }

    /// A level with an explicit owner rank per box.
    pub fn with_owners(geometry: Geometry, boxes: Vec<IndexBox>, owners: Vec<usize>) -> Self {
        Self {
            geometry,
            boxes,
            owners,
        }
    }

    /// The whole domain as a single box.
    pub fn single_box(geometry: Geometry) -> Self {
        Self::new(geometry, vec![geometry.domain()])
    }

    /// The whole domain chopped into boxes of at most `max_size` cells per side.
    pub fn chopped(geometry: Geometry, max_size: usize) -> Self {
        Self::new(geometry, geometry.domain().chop(max_size))
    }

    /// Level geometry.
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// All boxes of the level, on every rank.
    pub fn boxes(&self) -> &[IndexBox] {
        &self.boxes
    }

    /// Owner rank of each box.
    pub fn owners(&self) -> &[usize] {
        &self.owners
    }

    /// The boxes owned by `rank`.
    pub fn local_boxes(&self, rank: usize) -> Vec<IndexBox> {
        self.boxes
            .iter()
            .zip(&self.owners)
            .filter(|(_, owner)| **owner == rank)
            .map(|(bx, _)| *bx)
            .collect()
    }

    /// Total number of cells on the level.
    pub fn num_cells(&self) -> usize {
        self.boxes.iter().map(IndexBox::num_cells).sum()
    }
}

/// The full hierarchy: levels from coarsest to finest and their refinement ratio.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshLayout {
    levels: SmallVec<[LevelLayout; 4]>,
    ref_ratio: i32,
}

impl MeshLayout {
    /// Default refinement ratio between consecutive levels.
    pub const DEFAULT_REF_RATIO: i32 = 2;

    /// An empty hierarchy with the given refinement ratio.
    pub fn new(ref_ratio: i32) -> Self {
        Self {
            levels: SmallVec::new(),
            ref_ratio,
        }
    }

    /// A single-level hierarchy.
    pub fn single_level(level: LevelLayout) -> Self {
        Self::new(Self::DEFAULT_REF_RATIO).with_level(level)
    }

    /// Append the next finer level.
    pub fn push_level(&mut self, level: LevelLayout) {
        self.levels.push(level);
    }

    /// Builder-style [`push_level`](Self::push_level).
    pub fn with_level(mut self, level: LevelLayout) -> Self {
        self.push_level(level);
        self
    }

    /// Append a level covering `fine_boxes` (in fine index space) with the
    /// refined geometry of the current finest level.
    ///
    /// # Panics
    ///
    /// Panics if the layout has no levels yet.
    pub fn with_refined_level(self, fine_boxes: Vec<IndexBox>) -> Self {
        let Some(coarse) = self.levels.last() else {
            panic!("with_refined_level needs a base level");
        };
        let geom = coarse.geometry.refine(self.ref_ratio);
        self.with_level(LevelLayout::new(geom, fine_boxes))
    }

    /// Keep only the `n` coarsest levels.
    pub fn truncate(&mut self, n: usize) {
        self.levels.truncate(n);
    }

    /// Number of levels.
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Refinement ratio between consecutive levels.
    pub fn ref_ratio(&self) -> i32 {
        self.ref_ratio
    }

    /// Layout of level `lev`.
    ///
    /// # Panics
    ///
    /// Panics if `lev >= num_levels()`.
    pub fn level(&self, lev: usize) -> &LevelLayout {
        &self.levels[lev]
    }

    /// All levels, coarsest first.
    pub fn levels(&self) -> &[LevelLayout] {
        &self.levels
    }

    /// Check the structural invariants of the hierarchy.
    ///
    /// Every level is non-empty, its boxes lie inside its domain and do
    /// not overlap, each box has an owner, each fine domain is the refined
    /// coarse domain, and every fine box is covered by the coarser level.
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.levels.is_empty() {
            return Err(MeshError::NoLevels);
        }
        if self.ref_ratio < 2 {
            return Err(MeshError::InvalidRefRatio {
                ratio: self.ref_ratio,
            });
        }
        for (lev, level) in self.levels.iter().enumerate() {
            if level.boxes.is_empty() {
                return Err(MeshError::EmptyLevel { level: lev });
            }
            if level.owners.len() != level.boxes.len() {
                return Err(MeshError::OwnerMismatch {
                    level: lev,
                    boxes: level.boxes.len(),
                    owners: level.owners.len(),
                });
            }
            let domain = level.geometry.domain();
            for (n, bx) in level.boxes.iter().enumerate() {
                if !domain.contains_box(bx) {
                    return Err(MeshError::BoxOutsideDomain { level: lev, bx: *bx });
                }
                if let Some(other) = level.boxes[n + 1..].iter().find(|o| o.intersects(bx)) {
                    return Err(MeshError::OverlappingBoxes {
                        level: lev,
                        a: *bx,
                        b: *other,
                    });
                }
            }
            if lev == 0 {
                continue;
            }
            let coarse = &self.levels[lev - 1];
            if coarse.geometry.domain().refine(self.ref_ratio) != domain {
                return Err(MeshError::DomainMismatch { level: lev });
            }
            for bx in &level.boxes {
                let cbx = bx.coarsen(self.ref_ratio);
                let covered: usize = coarse
                    .boxes
                    .iter()
                    .filter_map(|c| c.intersection(&cbx))
                    .map(|c| c.num_cells())
                    .sum();
                if covered != cbx.num_cells() {
                    return Err(MeshError::NotNested { level: lev, bx: *bx });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bx(lo: [i32; 3], hi: [i32; 3]) -> IndexBox {
        IndexBox::new(lo, hi).unwrap()
    }

    fn two_level() -> MeshLayout {
        MeshLayout::single_level(LevelLayout::chopped(Geometry::unit_cube(8), 4))
            .with_refined_level(vec![bx([4, 4, 4], [11, 11, 11])])
    }

    #[test]
    fn valid_two_level_layout() {
        let layout = two_level();
        assert_eq!(layout.num_levels(), 2);
        assert_eq!(layout.level(0).boxes().len(), 8);
        assert_eq!(layout.level(1).geometry().cell_size(0), 1.0 / 16.0);
        layout.validate().unwrap();
    }

    #[test]
    fn empty_layout_is_rejected() {
        assert_eq!(MeshLayout::new(2).validate(), Err(MeshError::NoLevels));
    }

    #[test]
    fn overlapping_boxes_are_rejected() {
        let g = Geometry::unit_cube(4);
        let layout = MeshLayout::single_level(LevelLayout::new(
            g,
            vec![bx([0, 0, 0], [2, 3, 3]), bx([2, 0, 0], [3, 3, 3])],
        ));
        assert!(matches!(
            layout.validate(),
            Err(MeshError::OverlappingBoxes { level: 0, .. })
        ));
    }

    #[test]
    fn box_outside_domain_is_rejected() {
        let g = Geometry::unit_cube(4);
        let layout = MeshLayout::single_level(LevelLayout::new(g, vec![bx([0, 0, 0], [4, 3, 3])]));
        assert!(matches!(
            layout.validate(),
            Err(MeshError::BoxOutsideDomain { .. })
        ));
    }

    #[test]
    fn unnested_fine_box_is_rejected() {
        let g = Geometry::unit_cube(8);
        let layout = MeshLayout::single_level(LevelLayout::new(g, vec![bx([0, 0, 0], [3, 7, 7])]))
            .with_refined_level(vec![bx([8, 0, 0], [11, 3, 3])]);
        assert!(matches!(
            layout.validate(),
            Err(MeshError::NotNested { level: 1, .. })
        ));
    }

    #[test]
    fn local_boxes_filter_by_owner() {
        let g = Geometry::unit_cube(4);
        let boxes = g.domain().chop(2);
        let owners = (0..boxes.len()).map(|n| n % 2).collect();
        let level = LevelLayout::with_owners(g, boxes, owners);
        assert_eq!(level.local_boxes(0).len(), 4);
        assert_eq!(level.local_boxes(1).len(), 4);
        assert!(level.local_boxes(2).is_empty());
        assert_eq!(level.num_cells(), 64);
    }
}
