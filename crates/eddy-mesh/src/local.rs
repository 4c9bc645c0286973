//! Single-process mesh engine.

use std::fmt;
use std::sync::Arc;

use eddy_core::IntVect;

use crate::array::LevelArray;
use crate::collective::{Collective, SerialCollective};
use crate::engine::{bc_value, MeshEngine};
use crate::error::MeshError;
use crate::layout::MeshLayout;

/// A [`MeshEngine`] that keeps the whole hierarchy in one process.
///
/// Ghost cells are filled from same-level neighbour blocks where one
/// covers them, from the boundary value outside the physical domain, and
/// by copying the nearest valid cell of the block itself elsewhere (the
/// coarse/fine interface, or cells owned by another rank). Regrid data
/// moves use the masked-sum defaults of [`MeshEngine`], so they see every
/// rank's data through the [`Collective`].
pub struct LocalMesh {
    layout: MeshLayout,
    collective: Arc<dyn Collective>,
}

impl LocalMesh {
    /// A serial engine over a validated layout.
    pub fn new(layout: MeshLayout) -> Result<Self, MeshError> {
        Self::with_collective(layout, Arc::new(SerialCollective))
    }

    /// An engine acting as one rank of a larger run.
    ///
    /// Only boxes owned by `collective.rank()` are allocated locally.
    pub fn with_collective(
        layout: MeshLayout,
        collective: Arc<dyn Collective>,
    ) -> Result<Self, MeshError> {
        layout.validate()?;
        Ok(Self { layout, collective })
    }
}

impl fmt::Debug for LocalMesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalMesh")
            .field("num_levels", &self.layout.num_levels())
            .field("rank", &self.collective.rank())
            .field("size", &self.collective.size())
            .finish()
    }
}

impl MeshEngine for LocalMesh {
    fn layout(&self) -> &MeshLayout {
        &self.layout
    }

    fn collective(&self) -> &dyn Collective {
        self.collective.as_ref()
    }

    fn apply_layout(&mut self, layout: MeshLayout) -> Result<(), MeshError> {
        layout.validate()?;
        self.layout = layout;
        Ok(())
    }

    fn fill_boundary(&self, lev: usize, array: &mut LevelArray, bc: &[f64]) {
        let domain = self.layout.level(lev).geometry().domain();
        let ncomp = array.ncomp();
        let mut updates: Vec<(usize, IntVect, usize, f64)> = Vec::new();
        let blocks = array.blocks();
        for (bi, block) in blocks.iter().enumerate() {
            let valid = block.valid();
            for iv in block.grown().cells() {
                if valid.contains(iv) {
                    continue;
                }
                let outside = !domain.contains(iv);
                let neighbour = blocks
                    .iter()
                    .enumerate()
                    .find(|(bj, b)| *bj != bi && b.valid().contains(iv))
                    .map(|(_, b)| b);
                for comp in 0..ncomp {
                    let v = if outside {
                        bc_value(bc, comp)
                    } else if let Some(nb) = neighbour {
                        nb.get(iv, comp).unwrap_or(0.0)
                    } else {
                        block.get(valid.clamp(iv), comp).unwrap_or(0.0)
                    };
                    updates.push((bi, iv, comp, v));
                }
            }
        }
        let blocks = array.blocks_mut();
        for (bi, iv, comp, v) in updates {
            blocks[bi].set(iv, comp, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LevelLayout;
    use eddy_core::{Geometry, IndexBox};

    fn two_box_mesh() -> LocalMesh {
        let g = Geometry::unit_cube(4);
        let boxes = vec![
            IndexBox::new([0, 0, 0], [1, 3, 3]).unwrap(),
            IndexBox::new([2, 0, 0], [3, 3, 3]).unwrap(),
        ];
        LocalMesh::new(MeshLayout::single_level(LevelLayout::new(g, boxes))).unwrap()
    }

    #[test]
    fn ghosts_come_from_neighbours_and_bc() {
        let mesh = two_box_mesh();
        let mut a = mesh.allocate(0, 1, 1);
        a.for_each_valid_mut(0, |iv, v| *v = iv[0] as f64);
        mesh.fill_boundary(0, &mut a, &[-5.0]);
        let left = &a.blocks()[0];
        // Interior ghost from the right-hand block.
        assert_eq!(left.get([2, 1, 1], 0), Some(2.0));
        // Physical boundary.
        assert_eq!(left.get([-1, 1, 1], 0), Some(-5.0));
        let right = &a.blocks()[1];
        assert_eq!(right.get([1, 0, 0], 0), Some(1.0));
        assert_eq!(right.get([4, 0, 0], 0), Some(-5.0));
    }

    #[test]
    fn coarse_fine_ghosts_extrapolate() {
        let g = Geometry::unit_cube(4);
        let layout = MeshLayout::single_level(LevelLayout::single_box(g))
            .with_refined_level(vec![IndexBox::new([2, 2, 2], [5, 5, 5]).unwrap()]);
        let mesh = LocalMesh::new(layout).unwrap();
        let mut a = mesh.allocate(1, 1, 2);
        a.for_each_valid_mut(0, |iv, v| *v = (iv[0] + iv[1] + iv[2]) as f64);
        mesh.fill_boundary(1, &mut a, &[0.0]);
        let b = &a.blocks()[0];
        assert_eq!(b.get([0, 2, 2], 0), Some(6.0));
        assert_eq!(b.get([7, 5, 5], 0), Some(15.0));
    }

    #[test]
    fn apply_layout_rejects_invalid_and_keeps_old() {
        let mut mesh = two_box_mesh();
        assert!(mesh.apply_layout(MeshLayout::new(2)).is_err());
        assert_eq!(mesh.num_levels(), 1);
        assert_eq!(mesh.boxes(0).len(), 2);
    }

    #[test]
    fn ranks_allocate_only_owned_boxes() {
        struct Rank1;
        impl Collective for Rank1 {
            fn rank(&self) -> usize {
                1
            }
            fn size(&self) -> usize {
                2
            }
            fn sum(&self, local: f64) -> f64 {
                local
            }
            fn min(&self, local: f64) -> f64 {
                local
            }
            fn max(&self, local: f64) -> f64 {
                local
            }
        }
        let g = Geometry::unit_cube(4);
        let boxes = g.domain().chop(2);
        let owners = (0..boxes.len()).map(|n| n % 2).collect();
        let layout = MeshLayout::single_level(LevelLayout::with_owners(g, boxes, owners));
        let mesh = LocalMesh::with_collective(layout, Arc::new(Rank1)).unwrap();
        assert_eq!(mesh.local_boxes(0).len(), 4);
        assert_eq!(mesh.allocate(0, 2, 1).valid_cells(), 32);
    }
}
