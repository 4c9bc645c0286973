//! The field repository.

use std::ops::Range;

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::{debug, info};

use eddy_core::{FieldError, FieldId, IndexBox};
use eddy_mesh::{LevelArray, MeshEngine};

use crate::state::{FieldInfo, TimeState, MAX_STATES};
use crate::view::{FieldView, ScratchField};

type Levels = SmallVec<[LevelArray; 4]>;

struct FieldEntry {
    info: FieldInfo,
    states: SmallVec<[Levels; MAX_STATES]>,
}

impl FieldEntry {
    fn shift_states(&mut self) {
        for s in (1..self.info.num_states).rev() {
            let (lo, hi) = self.states.split_at_mut(s);
            for (dst, src) in hi[0].iter_mut().zip(lo[s - 1].iter()) {
                let copied = dst.copy_from(src);
                debug_assert!(copied, "time states of one field share a layout");
            }
        }
    }
}

/// What a regrid changed, as reported to the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegridReport {
    /// Active levels before the regrid.
    pub old_levels: usize,
    /// Active levels after the regrid.
    pub new_levels: usize,
}

impl RegridReport {
    /// Levels that did not exist before the regrid and need initial data.
    pub fn created(&self) -> Range<usize> {
        self.old_levels.min(self.new_levels)..self.new_levels
    }

    /// Levels that were dropped by the regrid.
    pub fn removed(&self) -> Range<usize> {
        self.new_levels.min(self.old_levels)..self.old_levels
    }
}

/// Owns every field's per-level storage.
///
/// Each declared field has exactly one [`LevelArray`] per active level and
/// retained [`TimeState`]. Arrays are reallocated, never resized in place,
/// when [`regrid`](Self::regrid) changes the hierarchy.
pub struct FieldRepo {
    names: IndexMap<String, FieldId>,
    fields: Vec<FieldEntry>,
    level_boxes: Vec<Vec<IndexBox>>,
    global_boxes: Vec<Vec<IndexBox>>,
}

impl FieldRepo {
    /// An empty repository sized to the mesh's current levels.
    pub fn new(mesh: &dyn MeshEngine) -> Self {
        Self {
            names: IndexMap::new(),
            fields: Vec::new(),
            level_boxes: (0..mesh.num_levels())
                .map(|lev| mesh.local_boxes(lev))
                .collect(),
            global_boxes: (0..mesh.num_levels())
                .map(|lev| mesh.boxes(lev).to_vec())
                .collect(),
        }
    }

    /// Declare a field, or look up an identical earlier declaration.
    ///
    /// Redeclaring with the same attributes returns the existing ID;
    /// redeclaring with different attributes is
    /// [`FieldError::Conflicting`].
    pub fn declare_field(
        &mut self,
        name: &str,
        ncomp: usize,
        nghost: usize,
        num_states: usize,
    ) -> Result<FieldId, FieldError> {
        if ncomp == 0 {
            return Err(FieldError::InvalidDeclaration {
                name: name.to_string(),
                reason: "a field needs at least one component".to_string(),
            });
        }
        if num_states == 0 || num_states > MAX_STATES {
            return Err(FieldError::InvalidDeclaration {
                name: name.to_string(),
                reason: format!("num_states must be in 1..={MAX_STATES}, got {num_states}"),
            });
        }
        if let Some(&id) = self.names.get(name) {
            let info = &self.fields[id.index()].info;
            let mut diffs = Vec::new();
            if info.ncomp != ncomp {
                diffs.push(format!("ncomp {} vs {}", info.ncomp, ncomp));
            }
            if info.nghost != nghost {
                diffs.push(format!("nghost {} vs {}", info.nghost, nghost));
            }
            if info.num_states != num_states {
                diffs.push(format!("num_states {} vs {}", info.num_states, num_states));
            }
            if diffs.is_empty() {
                return Ok(id);
            }
            return Err(FieldError::Conflicting {
                name: name.to_string(),
                reason: diffs.join(", "),
            });
        }

        let id = FieldId(self.fields.len() as u32);
        let states = (0..num_states)
            .map(|_| self.allocate_levels(ncomp, nghost))
            .collect();
        self.fields.push(FieldEntry {
            info: FieldInfo {
                name: name.to_string(),
                ncomp,
                nghost,
                num_states,
            },
            states,
        });
        self.names.insert(name.to_string(), id);
        debug!(field = name, %id, ncomp, nghost, num_states, "declared field");
        Ok(id)
    }

    fn allocate_levels(&self, ncomp: usize, nghost: usize) -> Levels {
        self.level_boxes
            .iter()
            .map(|boxes| LevelArray::new(boxes, ncomp, nghost))
            .collect()
    }

    /// ID of a declared field.
    pub fn field_id(&self, name: &str) -> Option<FieldId> {
        self.names.get(name).copied()
    }

    /// ID of a field that must exist.
    pub fn require(&self, name: &str) -> Result<FieldId, FieldError> {
        self.field_id(name).ok_or_else(|| FieldError::UnknownField {
            name: name.to_string(),
        })
    }

    /// Whether a field is declared under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Number of declared fields.
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// Number of active levels.
    pub fn num_active_levels(&self) -> usize {
        self.level_boxes.len()
    }

    /// This rank's boxes on level `lev`.
    pub fn level_boxes(&self, lev: usize) -> Result<&[IndexBox], FieldError> {
        self.level_boxes
            .get(lev)
            .map(Vec::as_slice)
            .ok_or(FieldError::LevelOutOfRange {
                level: lev,
                num_levels: self.level_boxes.len(),
            })
    }

    /// Attributes of every field, in declaration order.
    pub fn infos(&self) -> impl Iterator<Item = (FieldId, &FieldInfo)> {
        self.fields
            .iter()
            .enumerate()
            .map(|(n, e)| (FieldId(n as u32), &e.info))
    }

    /// Attributes of one field.
    pub fn info(&self, id: FieldId) -> Result<&FieldInfo, FieldError> {
        self.entry(id).map(|e| &e.info)
    }

    fn entry(&self, id: FieldId) -> Result<&FieldEntry, FieldError> {
        self.fields
            .get(id.index())
            .ok_or(FieldError::UnknownId { id: id.0 })
    }

    fn check(&self, id: FieldId, state: TimeState, lev: usize) -> Result<(), FieldError> {
        let entry = self.entry(id)?;
        if !entry.info.retains(state) {
            return Err(FieldError::StateNotRetained {
                name: entry.info.name.clone(),
                state: state.name(),
            });
        }
        if lev >= self.level_boxes.len() {
            return Err(FieldError::LevelOutOfRange {
                level: lev,
                num_levels: self.level_boxes.len(),
            });
        }
        Ok(())
    }

    /// Every level of one state of a field.
    pub fn levels(&self, id: FieldId, state: TimeState) -> Result<&[LevelArray], FieldError> {
        let entry = self.entry(id)?;
        if !entry.info.retains(state) {
            return Err(FieldError::StateNotRetained {
                name: entry.info.name.clone(),
                state: state.name(),
            });
        }
        Ok(&entry.states[state.index()])
    }

    /// One level of one state of a field.
    pub fn level(&self, id: FieldId, state: TimeState, lev: usize) -> Result<&LevelArray, FieldError> {
        self.check(id, state, lev)?;
        Ok(&self.fields[id.index()].states[state.index()][lev])
    }

    /// Mutable access to one level of one state of a field.
    pub fn level_mut(
        &mut self,
        id: FieldId,
        state: TimeState,
        lev: usize,
    ) -> Result<&mut LevelArray, FieldError> {
        self.check(id, state, lev)?;
        Ok(&mut self.fields[id.index()].states[state.index()][lev])
    }

    /// Write one field-state while reading another on the same level.
    ///
    /// # Panics
    ///
    /// Panics if `dst` and `src` name the same field and state.
    pub fn level_pair_mut(
        &mut self,
        dst: (FieldId, TimeState),
        src: (FieldId, TimeState),
        lev: usize,
    ) -> Result<(&mut LevelArray, &LevelArray), FieldError> {
        assert!(dst != src, "level_pair_mut needs two distinct field states");
        self.check(dst.0, dst.1, lev)?;
        self.check(src.0, src.1, lev)?;
        let (di, si) = (dst.0.index(), src.0.index());
        let (ds, ss) = (dst.1.index(), src.1.index());
        if di == si {
            let states = &mut self.fields[di].states;
            let (w, r) = if ds < ss {
                let (lo, hi) = states.split_at_mut(ss);
                (&mut lo[ds], &hi[0])
            } else {
                let (lo, hi) = states.split_at_mut(ds);
                (&mut hi[0], &lo[ss])
            };
            return Ok((&mut w[lev], &r[lev]));
        }
        let (w, r) = if di < si {
            let (lo, hi) = self.fields.split_at_mut(si);
            (&mut lo[di], &hi[0])
        } else {
            let (lo, hi) = self.fields.split_at_mut(di);
            (&mut hi[0], &lo[si])
        };
        Ok((&mut w.states[ds][lev], &r.states[ss][lev]))
    }

    /// Replace one level's array. The replacement must have the same layout.
    pub fn replace_level(
        &mut self,
        id: FieldId,
        state: TimeState,
        lev: usize,
        array: LevelArray,
    ) -> Result<(), FieldError> {
        if !self.level(id, state, lev)?.same_layout(&array) {
            let info = &self.fields[id.index()].info;
            return Err(FieldError::LayoutMismatch {
                name: info.name.clone(),
                reason: format!(
                    "expected {} components and {} ghost cells on the level's boxes",
                    info.ncomp, info.nghost
                ),
            });
        }
        *self.level_mut(id, state, lev)? = array;
        Ok(())
    }

    /// Shift the time states of one field: `Old -> Older`, `New -> Old`.
    ///
    /// `New` keeps its values so a timestep can update it in place.
    pub fn advance_states(&mut self, id: FieldId) -> Result<(), FieldError> {
        self.entry(id)?;
        self.fields[id.index()].shift_states();
        Ok(())
    }

    /// [`advance_states`](Self::advance_states) for every field.
    pub fn advance_all_states(&mut self) {
        for entry in &mut self.fields {
            entry.shift_states();
        }
    }

    /// Rebuild every field for the mesh's current hierarchy.
    ///
    /// Cells covered on the same level before and after keep their
    /// values, whichever rank held them. Other cells on refined levels are
    /// filled by injection from the next coarser level; cells with no
    /// source start at zero. Data moves between ranks go through
    /// [`MeshEngine::parallel_copy`] and [`MeshEngine::interp_from_coarse`],
    /// so every rank must call this with the same hierarchy.
    pub fn regrid(&mut self, mesh: &dyn MeshEngine) -> RegridReport {
        let old_levels = self.level_boxes.len();
        let new_boxes: Vec<Vec<IndexBox>> = (0..mesh.num_levels())
            .map(|lev| mesh.local_boxes(lev))
            .collect();
        let new_global: Vec<Vec<IndexBox>> = (0..mesh.num_levels())
            .map(|lev| mesh.boxes(lev).to_vec())
            .collect();

        for entry in &mut self.fields {
            let (ncomp, nghost) = (entry.info.ncomp, entry.info.nghost);
            for levels in entry.states.iter_mut() {
                let old = std::mem::take(levels);
                let mut fresh = Levels::new();
                for (lev, boxes) in new_boxes.iter().enumerate() {
                    let mut arr = LevelArray::new(boxes, ncomp, nghost);
                    let kept: &[IndexBox] = match old.get(lev) {
                        Some(prev) => {
                            let prev_boxes = &self.global_boxes[lev];
                            mesh.parallel_copy(lev, &mut arr, prev, prev_boxes);
                            prev_boxes
                        }
                        None => &[],
                    };
                    if lev > 0 {
                        mesh.interp_from_coarse(lev, &mut arr, &fresh[lev - 1], kept);
                    }
                    fresh.push(arr);
                }
                *levels = fresh;
            }
        }
        self.level_boxes = new_boxes;
        self.global_boxes = new_global;

        let report = RegridReport {
            old_levels,
            new_levels: self.level_boxes.len(),
        };
        info!(
            old_levels,
            new_levels = report.new_levels,
            fields = self.fields.len(),
            "regridded field repository"
        );
        report
    }

    /// A scratch field allocated on the current levels.
    ///
    /// Scratch fields are not tracked by the repository and are not
    /// regridded.
    pub fn create_scratch_field(&self, name: &str, ncomp: usize, nghost: usize) -> ScratchField {
        ScratchField::new(name, ncomp, nghost, &self.level_boxes)
    }

    /// A read-only view of one state of a field, for reductions.
    pub fn view(&self, id: FieldId, state: TimeState) -> Result<FieldView<'_>, FieldError> {
        let levels = self.levels(id, state)?;
        Ok(FieldView::new(&self.fields[id.index()].info, levels))
    }
}

impl std::fmt::Debug for FieldRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldRepo")
            .field("fields", &self.names.keys().collect::<Vec<_>>())
            .field("num_levels", &self.level_boxes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eddy_core::Geometry;
    use eddy_mesh::{LevelLayout, LocalMesh, MeshLayout};

    fn one_level(n: i32) -> LocalMesh {
        LocalMesh::new(MeshLayout::single_level(LevelLayout::chopped(
            Geometry::unit_cube(n),
            2,
        )))
        .unwrap()
    }

    #[test]
    fn declare_is_idempotent_for_identical_attributes() {
        let mesh = one_level(4);
        let mut repo = FieldRepo::new(&mesh);
        let a = repo.declare_field("vof", 1, 2, 2).unwrap();
        let b = repo.declare_field("vof", 1, 2, 2).unwrap();
        assert_eq!(a, b);
        assert_eq!(repo.num_fields(), 1);
        match repo.declare_field("vof", 3, 2, 2) {
            Err(FieldError::Conflicting { name, reason }) => {
                assert_eq!(name, "vof");
                assert_eq!(reason, "ncomp 1 vs 3");
            }
            other => panic!("expected Conflicting, got {other:?}"),
        }
    }

    #[test]
    fn declare_rejects_invalid_attributes() {
        let mesh = one_level(2);
        let mut repo = FieldRepo::new(&mesh);
        assert!(matches!(
            repo.declare_field("p", 0, 1, 1),
            Err(FieldError::InvalidDeclaration { .. })
        ));
        assert!(matches!(
            repo.declare_field("p", 1, 1, 4),
            Err(FieldError::InvalidDeclaration { .. })
        ));
        assert!(!repo.contains("p"));
    }

    #[test]
    fn state_access_is_checked() {
        let mesh = one_level(2);
        let mut repo = FieldRepo::new(&mesh);
        let p = repo.declare_field("p", 1, 0, 1).unwrap();
        assert!(repo.level(p, TimeState::New, 0).is_ok());
        assert_eq!(
            repo.level(p, TimeState::Old, 0).err(),
            Some(FieldError::StateNotRetained {
                name: "p".to_string(),
                state: "old"
            })
        );
        assert_eq!(
            repo.level(p, TimeState::New, 1).err(),
            Some(FieldError::LevelOutOfRange {
                level: 1,
                num_levels: 1
            })
        );
        assert_eq!(
            repo.level(FieldId(9), TimeState::New, 0).err(),
            Some(FieldError::UnknownId { id: 9 })
        );
    }

    #[test]
    fn advance_states_shifts_history() {
        let mesh = one_level(2);
        let mut repo = FieldRepo::new(&mesh);
        let q = repo.declare_field("q", 1, 1, 3).unwrap();
        repo.level_mut(q, TimeState::New, 0).unwrap().fill(1.0);
        repo.advance_states(q).unwrap();
        repo.level_mut(q, TimeState::New, 0).unwrap().fill(2.0);
        repo.advance_states(q).unwrap();
        repo.level_mut(q, TimeState::New, 0).unwrap().fill(3.0);
        let at = |s| repo.level(q, s, 0).unwrap().value_at([0, 0, 0], 0);
        assert_eq!(at(TimeState::New), Some(3.0));
        assert_eq!(at(TimeState::Old), Some(2.0));
        assert_eq!(at(TimeState::Older), Some(1.0));
    }

    #[test]
    fn advance_all_states_shifts_every_field() {
        let mesh = one_level(2);
        let mut repo = FieldRepo::new(&mesh);
        let q = repo.declare_field("q", 1, 1, 2).unwrap();
        let r = repo.declare_field("r", 2, 0, 3).unwrap();
        let s = repo.declare_field("s", 1, 0, 1).unwrap();
        repo.level_mut(q, TimeState::New, 0).unwrap().fill(1.0);
        repo.level_mut(r, TimeState::New, 0).unwrap().fill(2.0);
        repo.level_mut(s, TimeState::New, 0).unwrap().fill(3.0);

        repo.advance_all_states();
        let at = |id, st| repo.level(id, st, 0).unwrap().value_at([1, 0, 1], 0);
        assert_eq!(at(q, TimeState::Old), Some(1.0));
        assert_eq!(at(r, TimeState::Old), Some(2.0));
        assert_eq!(at(r, TimeState::Older), Some(0.0));
        assert_eq!(at(s, TimeState::New), Some(3.0));
        assert_eq!(at(q, TimeState::New), Some(1.0));
    }

    #[test]
    fn level_pair_reads_one_state_while_writing_another() {
        let mesh = one_level(2);
        let mut repo = FieldRepo::new(&mesh);
        let q = repo.declare_field("q", 1, 0, 2).unwrap();
        let r = repo.declare_field("r", 1, 0, 1).unwrap();
        repo.level_mut(q, TimeState::Old, 0).unwrap().fill(4.0);
        repo.level_mut(r, TimeState::New, 0).unwrap().fill(0.5);

        let (dst, src) = repo
            .level_pair_mut((q, TimeState::New), (q, TimeState::Old), 0)
            .unwrap();
        dst.copy_from(src);
        let (dst, src) = repo
            .level_pair_mut((q, TimeState::New), (r, TimeState::New), 0)
            .unwrap();
        dst.saxpy(2.0, src);
        let v = repo.level(q, TimeState::New, 0).unwrap().value_at([1, 1, 1], 0);
        assert_eq!(v, Some(5.0));
    }

    #[test]
    fn replace_level_checks_layout() {
        let mesh = one_level(2);
        let mut repo = FieldRepo::new(&mesh);
        let q = repo.declare_field("q", 2, 1, 1).unwrap();
        let mut good = repo.level(q, TimeState::New, 0).unwrap().zeros_like();
        good.fill(7.0);
        repo.replace_level(q, TimeState::New, 0, good).unwrap();
        let bad = LevelArray::new(&[IndexBox::cube(2)], 1, 1);
        assert!(matches!(
            repo.replace_level(q, TimeState::New, 0, bad),
            Err(FieldError::LayoutMismatch { .. })
        ));
        assert_eq!(
            repo.level(q, TimeState::New, 0).unwrap().value_at([0, 0, 0], 1),
            Some(7.0)
        );
    }

    #[test]
    fn regrid_adds_level_and_injects_from_coarse() {
        let mut mesh = one_level(4);
        let mut repo = FieldRepo::new(&mesh);
        let q = repo.declare_field("q", 1, 2, 2).unwrap();
        repo.level_mut(q, TimeState::New, 0)
            .unwrap()
            .for_each_valid_mut(0, |iv, v| *v = iv[0] as f64);

        let layout = mesh
            .layout()
            .clone()
            .with_refined_level(vec![IndexBox::new([0, 0, 0], [3, 3, 3]).unwrap()]);
        mesh.apply_layout(layout).unwrap();
        let report = repo.regrid(&mesh);
        assert_eq!(report.created(), 1..2);
        assert!(report.removed().is_empty());
        assert_eq!(repo.num_active_levels(), 2);

        let fine = repo.level(q, TimeState::New, 1).unwrap();
        assert_eq!(fine.nghost(), 2);
        assert_eq!(fine.value_at([3, 0, 0], 0), Some(1.0));
        assert_eq!(fine.value_at([2, 3, 1], 0), Some(1.0));
        assert_eq!(fine.value_at([0, 0, 0], 0), Some(0.0));
        assert_eq!(
            repo.level(q, TimeState::New, 0).unwrap().value_at([3, 3, 3], 0),
            Some(3.0)
        );
    }
}
