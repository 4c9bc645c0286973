//! Cross-level reductions over a field.
//!
//! Every function here issues the same sequence of collective calls on
//! every rank: one call per level per reduced quantity, whatever the rank
//! owns. Argument checks that can fail happen before the first collective
//! call and depend only on arguments every rank shares.

use eddy_core::{FieldError, IntVect};
use eddy_mesh::Collective;

use crate::view::LevelView;

fn check_comp<V: LevelView + ?Sized>(view: &V, comp: usize) -> Result<(), FieldError> {
    if comp >= view.ncomp() {
        return Err(FieldError::ComponentOutOfRange {
            name: view.name().to_string(),
            component: comp,
            ncomp: view.ncomp(),
        });
    }
    Ok(())
}

/// Minimum of component `comp` over the valid cells of every level.
///
/// Folds per-level global minima. Returns `f64::MAX` when there are no
/// levels.
pub fn field_min<V: LevelView + ?Sized>(
    view: &V,
    comm: &dyn Collective,
    comp: usize,
) -> Result<f64, FieldError> {
    check_comp(view, comp)?;
    let mut acc = f64::MAX;
    for lev in 0..view.num_levels() {
        acc = acc.min(comm.min(view.level(lev).local_min(comp)));
    }
    Ok(acc)
}

/// Maximum of component `comp` over the valid cells of every level.
///
/// Returns `f64::MIN` when there are no levels.
pub fn field_max<V: LevelView + ?Sized>(
    view: &V,
    comm: &dyn Collective,
    comp: usize,
) -> Result<f64, FieldError> {
    check_comp(view, comp)?;
    let mut acc = f64::MIN;
    for lev in 0..view.num_levels() {
        acc = acc.max(comm.max(view.level(lev).local_max(comp)));
    }
    Ok(acc)
}

/// `(min, max)` in one pass over the levels.
pub fn field_minmax<V: LevelView + ?Sized>(
    view: &V,
    comm: &dyn Collective,
    comp: usize,
) -> Result<(f64, f64), FieldError> {
    check_comp(view, comp)?;
    let (mut lo, mut hi) = (f64::MAX, f64::MIN);
    for lev in 0..view.num_levels() {
        let level = view.level(lev);
        lo = lo.min(comm.min(level.local_min(comp)));
        hi = hi.max(comm.max(level.local_max(comp)));
    }
    Ok((lo, hi))
}

/// Sum of component `comp` over the valid cells of every level.
///
/// Covered coarse cells are counted alongside the fine cells above them.
pub fn field_sum<V: LevelView + ?Sized>(
    view: &V,
    comm: &dyn Collective,
    comp: usize,
) -> Result<f64, FieldError> {
    check_comp(view, comp)?;
    let mut acc = 0.0;
    for lev in 0..view.num_levels() {
        let mut local = 0.0;
        view.level(lev).for_each_valid(comp, |_, v| local += v);
        acc += comm.sum(local);
    }
    Ok(acc)
}

/// Value of component `comp` at cell `iv` of level `lev`.
///
/// Each rank contributes the value only if one of its blocks owns `iv`,
/// and the contributions are summed globally, so no rank needs to know the
/// owner. A cell that no block owns (outside the level's valid region)
/// yields zero, which cannot be told apart from a stored zero.
pub fn field_probe<V: LevelView + ?Sized>(
    view: &V,
    comm: &dyn Collective,
    lev: usize,
    iv: IntVect,
    comp: usize,
) -> Result<f64, FieldError> {
    if lev >= view.num_levels() {
        return Err(FieldError::LevelOutOfRange {
            level: lev,
            num_levels: view.num_levels(),
        });
    }
    check_comp(view, comp)?;
    Ok(comm.sum(view.level(lev).local_probe(iv, comp)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::ScratchField;
    use eddy_core::IndexBox;
    use eddy_mesh::SerialCollective;

    fn two_level() -> ScratchField {
        let boxes = vec![
            vec![IndexBox::new([0, 0, 0], [2, 0, 0]).unwrap()],
            vec![IndexBox::new([0, 0, 0], [1, 0, 0]).unwrap()],
        ];
        let mut s = ScratchField::new("pressure", 1, 2, &boxes);
        // Ghosts hold values that must never win a reduction.
        s.fill(-1.0e9);
        s.level_mut(0)
            .for_each_valid_mut(0, |iv, v| *v = [1.0, 2.0, 3.0][iv[0] as usize]);
        s.level_mut(1)
            .for_each_valid_mut(0, |iv, v| *v = [0.5, 4.0][iv[0] as usize]);
        s
    }

    #[test]
    fn min_max_fold_across_levels() {
        let s = two_level();
        let comm = SerialCollective;
        assert_eq!(field_min(&s, &comm, 0).unwrap(), 0.5);
        assert_eq!(field_max(&s, &comm, 0).unwrap(), 4.0);
        assert_eq!(field_minmax(&s, &comm, 0).unwrap(), (0.5, 4.0));
        assert_eq!(field_sum(&s, &comm, 0).unwrap(), 10.5);
    }

    #[test]
    fn probe_reads_one_level() {
        let s = two_level();
        let comm = SerialCollective;
        assert_eq!(field_probe(&s, &comm, 0, [2, 0, 0], 0).unwrap(), 3.0);
        assert_eq!(field_probe(&s, &comm, 1, [1, 0, 0], 0).unwrap(), 4.0);
        assert_eq!(field_probe(&s, &comm, 1, [2, 0, 0], 0).unwrap(), 0.0);
        assert_eq!(field_probe(&s, &comm, 0, [-7, 3, 99], 0).unwrap(), 0.0);
    }

    #[test]
    fn bad_arguments_fail_before_any_collective() {
        let s = two_level();
        let comm = SerialCollective;
        assert_eq!(
            field_min(&s, &comm, 1),
            Err(FieldError::ComponentOutOfRange {
                name: "pressure".to_string(),
                component: 1,
                ncomp: 1
            })
        );
        assert_eq!(
            field_probe(&s, &comm, 2, [0, 0, 0], 0),
            Err(FieldError::LevelOutOfRange {
                level: 2,
                num_levels: 2
            })
        );
    }

    #[test]
    fn no_levels_gives_neutral_values() {
        let s = ScratchField::new("empty", 1, 0, &[]);
        let comm = SerialCollective;
        assert_eq!(field_min(&s, &comm, 0).unwrap(), f64::MAX);
        assert_eq!(field_max(&s, &comm, 0).unwrap(), f64::MIN);
    }
}
