//! Field diagnostics recorded through the collective reductions.

use smallvec::SmallVec;
use tracing::{info, warn};

use eddy_core::{FieldError, Geometry, Registered, StepId};
use eddy_field::{field_minmax, SimCore, TimeState};

use crate::physics::Physics;

/// Global extrema of one field component at one step.
#[derive(Clone, Debug, PartialEq)]
pub struct MonitorRecord {
    /// Completed steps when the record was taken.
    pub step: StepId,
    /// Field name.
    pub field: String,
    /// Component index.
    pub comp: usize,
    /// Global minimum.
    pub min: f64,
    /// Global maximum.
    pub max: f64,
}

/// Records the min/max of configured fields after initialization and
/// after every step, and caches this rank's cell count per level.
///
/// Parameter: `FieldMonitor.fields` (names; default none).
#[derive(Clone, Debug, PartialEq)]
pub struct FieldMonitor {
    fields: Vec<String>,
    cells_per_level: SmallVec<[usize; 4]>,
    history: Vec<MonitorRecord>,
}

impl FieldMonitor {
    /// Read the monitored field names.
    pub fn new(core: &mut SimCore) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let scope = core.params().scope("FieldMonitor");
        let fields = scope.get_str_array_or_empty("fields")?;
        if fields.is_empty() {
            warn!(key = %scope.key("fields"), "no fields to monitor");
        }
        Ok(Self {
            fields,
            cells_per_level: SmallVec::new(),
            history: Vec::new(),
        })
    }

    /// Locally-owned valid cells per level, as of the last init or regrid.
    pub fn cells_per_level(&self) -> &[usize] {
        &self.cells_per_level
    }

    /// Every record taken so far, oldest first.
    pub fn history(&self) -> &[MonitorRecord] {
        &self.history
    }

    fn rebuild_cache(&mut self, core: &SimCore) -> Result<(), FieldError> {
        self.cells_per_level.clear();
        for lev in 0..core.num_levels() {
            let cells = core
                .repo()
                .level_boxes(lev)?
                .iter()
                .map(|b| b.num_cells())
                .sum();
            self.cells_per_level.push(cells);
        }
        Ok(())
    }

    fn record(&mut self, core: &SimCore) -> Result<(), FieldError> {
        let step = core.time().step;
        for name in &self.fields {
            let id = core.repo().require(name)?;
            let view = core.repo().view(id, TimeState::New)?;
            for comp in 0..view.info().ncomp {
                let (min, max) = field_minmax(&view, core.collective(), comp)?;
                info!(%step, field = %name, comp, min, max, "field extrema");
                self.history.push(MonitorRecord {
                    step,
                    field: name.clone(),
                    comp,
                    min,
                    max,
                });
            }
        }
        Ok(())
    }
}

impl Registered for FieldMonitor {
    fn identifier() -> String {
        "FieldMonitor".to_string()
    }
}

impl Physics for FieldMonitor {
    fn initialize_fields(
        &mut self,
        _core: &mut SimCore,
        _lev: usize,
        _geom: &Geometry,
    ) -> Result<(), FieldError> {
        Ok(())
    }

    fn post_init_actions(&mut self, core: &mut SimCore) -> Result<(), FieldError> {
        self.rebuild_cache(core)?;
        self.record(core)
    }

    fn post_regrid_actions(&mut self, core: &mut SimCore) -> Result<(), FieldError> {
        self.rebuild_cache(core)
    }

    fn pre_advance_work(&mut self, _core: &mut SimCore) -> Result<(), FieldError> {
        Ok(())
    }

    fn post_advance_work(&mut self, core: &mut SimCore) -> Result<(), FieldError> {
        self.record(core)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eddy_core::{IndexBox, ParamTable};
    use eddy_mesh::{LevelLayout, LocalMesh, MeshLayout};

    fn sim_core() -> SimCore {
        let mesh = LocalMesh::new(MeshLayout::single_level(LevelLayout::chopped(
            Geometry::unit_cube(4),
            2,
        )))
        .unwrap();
        SimCore::new(
            Box::new(mesh),
            ParamTable::new().with("FieldMonitor.fields", ["p"]),
        )
    }

    #[test]
    fn records_extrema_after_init_and_step() {
        let mut core = sim_core();
        let p = core.repo_mut().declare_field("p", 1, 0, 1).unwrap();
        core.repo_mut()
            .level_mut(p, TimeState::New, 0)
            .unwrap()
            .for_each_valid_mut(0, |iv, v| *v = iv[2] as f64);
        let mut mon = FieldMonitor::new(&mut core).unwrap();
        mon.post_init_actions(&mut core).unwrap();
        core.time_mut().step = StepId(1);
        mon.post_advance_work(&mut core).unwrap();

        let h = mon.history();
        assert_eq!(h.len(), 2);
        assert_eq!((h[0].min, h[0].max), (0.0, 3.0));
        assert_eq!(h[1].step, StepId(1));
        assert_eq!(mon.cells_per_level(), &[64]);
    }

    #[test]
    fn level_cache_follows_regrid() {
        let mut core = sim_core();
        core.repo_mut().declare_field("p", 1, 0, 1).unwrap();
        let mut mon = FieldMonitor::new(&mut core).unwrap();
        mon.post_init_actions(&mut core).unwrap();

        let layout = core
            .mesh()
            .layout()
            .clone()
            .with_refined_level(vec![IndexBox::new([0, 0, 0], [1, 1, 3]).unwrap()]);
        core.regrid(layout).unwrap();
        mon.post_regrid_actions(&mut core).unwrap();
        assert_eq!(mon.cells_per_level(), &[64, 16]);
    }

    #[test]
    fn missing_field_is_reported() {
        let mut core = sim_core();
        let mut mon = FieldMonitor::new(&mut core).unwrap();
        assert!(matches!(
            mon.post_init_actions(&mut core),
            Err(FieldError::UnknownField { .. })
        ));
    }
}
