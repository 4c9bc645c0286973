//! Mesh and core fixtures.
//!
//! - [`unit_mesh`]: one level over the unit cube, chopped into boxes.
//! - [`two_level_layout`]: an 8^3 base level with a refined patch.
//! - [`core_on`]: a [`SimCore`] over any layout.

use std::sync::Arc;

use eddy_core::{Geometry, IndexBox, ParamTable};
use eddy_field::SimCore;
use eddy_mesh::{Collective, LevelLayout, LocalMesh, MeshLayout};

/// One level of `n^3` cells chopped into boxes of at most `max_box` cells per side.
pub fn unit_layout(n: i32, max_box: usize) -> MeshLayout {
    MeshLayout::single_level(LevelLayout::chopped(Geometry::unit_cube(n), max_box))
}

/// A serial [`LocalMesh`] over [`unit_layout`].
pub fn unit_mesh(n: i32, max_box: usize) -> LocalMesh {
    LocalMesh::new(unit_layout(n, max_box)).expect("unit layout is valid")
}

/// An 8^3 base level in 4^3 boxes plus a level-1 patch over fine cells
/// `[4, 11]^3` (the coarse cells `[2, 5]^3`).
pub fn two_level_layout() -> MeshLayout {
    unit_layout(8, 4).with_refined_level(vec![
        IndexBox::new([4, 4, 4], [11, 11, 11]).expect("patch box is valid")
    ])
}

/// `layout` with the boxes of every level dealt round-robin to `size` ranks.
pub fn distributed(layout: &MeshLayout, size: usize) -> MeshLayout {
    let mut out = MeshLayout::new(layout.ref_ratio());
    for level in layout.levels() {
        let owners = (0..level.boxes().len()).map(|n| n % size).collect();
        out.push_level(LevelLayout::with_owners(
            *level.geometry(),
            level.boxes().to_vec(),
            owners,
        ));
    }
    out
}

/// A [`SimCore`] over a serial mesh with `layout`.
pub fn core_on(layout: MeshLayout, params: ParamTable) -> SimCore {
    let mesh = LocalMesh::new(layout).expect("fixture layout is valid");
    SimCore::new(Box::new(mesh), params)
}

/// A [`SimCore`] acting as one rank of a distributed run.
pub fn rank_core(layout: MeshLayout, collective: Arc<dyn Collective>) -> SimCore {
    let mesh = LocalMesh::with_collective(layout, collective).expect("fixture layout is valid");
    SimCore::new(Box::new(mesh), ParamTable::new())
}
