//! The simulation driver.
//!
//! [`Simulation`] owns the [`SimCore`], the active PDEs and physics, and
//! a [`PressureProjection`]. It runs the lifecycle phases in order,
//! checked by a [`PhaseTracker`]:
//!
//! - setup: [`new`](Simulation::new) then [`init`](Simulation::init);
//! - one timestep per [`advance`](Simulation::advance);
//! - [`regrid`](Simulation::regrid) between timesteps.

use std::fmt;
use std::time::Instant;

use tracing::{debug, info};

use eddy_core::StepId;
use eddy_equation::PdeMgr;
use eddy_field::{RegridReport, SimCore, SimTime};
use eddy_mesh::{MeshEngine, MeshLayout};
use eddy_physics::{Phase, PhysicsMgr};

use crate::config::SimConfig;
use crate::error::SimError;
use crate::lifecycle::PhaseTracker;
use crate::metrics::StepMetrics;
use crate::projection::{NoProjection, PressureProjection};
use crate::registries::Registries;

/// Decides, between timesteps, whether to regrid and to which layout.
///
/// Consulted by [`Simulation::run`] every `regrid_interval` steps.
pub type RegridPolicy<'a> = dyn FnMut(&Simulation) -> Option<MeshLayout> + 'a;

/// Run `f` on `core` and add its wall-clock time to `phase` in `metrics`.
fn timed<T, E>(
    metrics: &mut StepMetrics,
    phase: &str,
    core: &mut SimCore,
    f: impl FnOnce(&mut SimCore) -> Result<T, E>,
) -> Result<T, E> {
    let start = Instant::now();
    let out = f(core);
    metrics.record(phase, start.elapsed().as_micros() as u64);
    out
}

/// One simulation: fields, active modules and the lifecycle they follow.
pub struct Simulation {
    config: SimConfig,
    core: SimCore,
    pdes: PdeMgr,
    physics: PhysicsMgr,
    projection: Box<dyn PressureProjection>,
    tracker: PhaseTracker,
    regrids: u64,
    last_metrics: StepMetrics,
}

impl Simulation {
    /// Validate `config`, construct its modules and run `pre_init_actions`.
    ///
    /// PDEs are constructed first, in configuration order, each followed
    /// by the source terms named in `"<PDE name>.source_terms"`. Physics
    /// follow, also in configuration order. Any unknown identifier or
    /// constructor failure aborts setup with a [`ConfigError`].
    ///
    /// [`ConfigError`]: crate::ConfigError
    pub fn new(
        config: SimConfig,
        registries: Registries<'_>,
        mesh: Box<dyn MeshEngine>,
    ) -> Result<Self, SimError> {
        config.validate()?;
        let mut core = SimCore::new(mesh, config.params.clone());

        let mut pdes = PdeMgr::new();
        for id in &config.pdes {
            let name = pdes.add(registries.pdes, id, &mut core)?.pde_name().to_string();
            let sources = core.params().scope(&name).get_str_array_or_empty("source_terms")?;
            for source in &sources {
                pdes.add_source_term(id, registries.sources, source, &mut core)?;
                debug!(pde = %id, source = %source, "attached source term");
            }
        }

        let mut physics = PhysicsMgr::new();
        for id in &config.physics {
            physics.add(registries.physics, id, &mut core)?;
        }

        let mut tracker = PhaseTracker::new();
        tracker.enter(Phase::PreInit)?;
        physics.broadcast(Phase::PreInit, &mut core)?;

        info!(
            pdes = pdes.len(),
            physics = physics.len(),
            levels = core.num_levels(),
            fields = core.repo().num_fields(),
            "simulation constructed"
        );
        Ok(Self {
            config,
            core,
            pdes,
            physics,
            projection: Box::new(NoProjection),
            tracker,
            regrids: 0,
            last_metrics: StepMetrics::default(),
        })
    }

    /// Replace the pressure projection.
    pub fn with_projection(mut self, projection: Box<dyn PressureProjection>) -> Self {
        self.projection = projection;
        self
    }

    /// Initialize every level, then run the post-init actions.
    ///
    /// Per level, physics set initial values before the PDEs initialize.
    /// After all levels, physics run `post_init_actions` before the PDEs.
    pub fn init(&mut self) -> Result<(), SimError> {
        self.tracker.enter(Phase::InitializeFields)?;
        for lev in 0..self.core.num_levels() {
            self.physics.initialize_level(&mut self.core, lev)?;
            self.pdes.initialize(&mut self.core, lev)?;
        }
        self.tracker.enter(Phase::PostInit)?;
        self.physics.broadcast(Phase::PostInit, &mut self.core)?;
        self.pdes.post_init_actions(&mut self.core)?;
        info!(levels = self.core.num_levels(), "simulation initialized");
        Ok(())
    }

    /// The timestep the next [`advance`](Self::advance) will take.
    ///
    /// With `cfl` set this is the smaller of `dt` and `cfl` times the
    /// PDEs' stable timestep, and issues one collective per level per PDE.
    pub fn next_dt(&self) -> Result<f64, SimError> {
        Ok(match self.config.cfl {
            Some(cfl) => self.config.dt.min(cfl * self.pdes.max_stable_dt(&self.core)?),
            None => self.config.dt,
        })
    }

    /// Run one timestep.
    ///
    /// Shifts every field's time states, runs `pre_advance_work` (physics,
    /// then PDEs) and `pre_predictor_work`, then each integrator stage
    /// followed by a bracketed pressure projection, and finally
    /// `post_advance_work`. The step counter and time are updated before
    /// `post_advance_work` runs.
    pub fn advance(&mut self) -> Result<StepMetrics, SimError> {
        let start = Instant::now();
        self.tracker.enter(Phase::PreAdvance)?;
        let mut metrics = StepMetrics {
            regrids: self.regrids,
            ..StepMetrics::default()
        };

        let dt = self.next_dt()?;
        self.core.time_mut().dt = dt;
        self.core.repo_mut().advance_all_states();

        let (pdes, physics) = (&mut self.pdes, &mut self.physics);
        timed(&mut metrics, Phase::PreAdvance.name(), &mut self.core, |core| {
            physics.broadcast(Phase::PreAdvance, core)?;
            pdes.pre_advance_work(core)
        })?;

        self.tracker.enter(Phase::PrePredictor)?;
        timed(&mut metrics, Phase::PrePredictor.name(), &mut self.core, |core| {
            physics.broadcast(Phase::PrePredictor, core)
        })?;

        for &stage in self.config.integrator.stages() {
            timed(&mut metrics, "pde_stages", &mut self.core, |core| {
                pdes.advance_stage(core, stage, dt)
            })?;
            metrics.stages += 1;

            self.tracker.enter(Phase::PrePressureCorrection)?;
            physics.broadcast(Phase::PrePressureCorrection, &mut self.core)?;
            let projection = &mut self.projection;
            timed(&mut metrics, "pressure_projection", &mut self.core, |core| {
                projection.project(core, stage, dt)
            })?;
            self.tracker.enter(Phase::PostPressureCorrection)?;
            physics.broadcast(Phase::PostPressureCorrection, &mut self.core)?;
        }

        let time = self.core.time_mut();
        time.step = time.step.next();
        time.time += dt;

        self.tracker.enter(Phase::PostAdvance)?;
        timed(&mut metrics, Phase::PostAdvance.name(), &mut self.core, |core| {
            physics.broadcast(Phase::PostAdvance, core)
        })?;

        metrics.total_us = start.elapsed().as_micros() as u64;
        info!(
            step = %self.core.time().step,
            time = self.core.time().time,
            dt,
            total_us = metrics.total_us,
            "step complete"
        );
        self.last_metrics = metrics.clone();
        Ok(metrics)
    }

    /// Apply a new mesh hierarchy between timesteps.
    ///
    /// Every field is rebuilt for the new levels, newly created levels
    /// are initialized (physics, then PDEs), and `post_regrid_actions`
    /// runs on every physics and then every PDE. An invalid layout is
    /// rejected before anything changes.
    pub fn regrid(&mut self, layout: MeshLayout) -> Result<RegridReport, SimError> {
        layout.validate()?;
        self.tracker.enter(Phase::PostRegrid)?;
        let report = self.core.regrid(layout)?;
        for lev in report.created() {
            self.physics.initialize_level(&mut self.core, lev)?;
            self.pdes.initialize(&mut self.core, lev)?;
        }
        self.physics.broadcast(Phase::PostRegrid, &mut self.core)?;
        self.pdes.post_regrid_actions(&mut self.core)?;
        self.regrids += 1;
        info!(
            old_levels = report.old_levels,
            new_levels = report.new_levels,
            regrids = self.regrids,
            "regrid complete"
        );
        Ok(report)
    }

    /// Take `max_steps` timesteps, consulting `policy` for a regrid every
    /// `regrid_interval` steps.
    ///
    /// The policy is not consulted before the first step.
    pub fn run(&mut self, policy: &mut RegridPolicy<'_>) -> Result<(), SimError> {
        for _ in 0..self.config.max_steps {
            let step = self.core.time().step.0;
            if let Some(interval) = self.config.regrid_interval {
                if step > 0 && step % interval == 0 {
                    if let Some(layout) = policy(self) {
                        self.regrid(layout)?;
                    }
                }
            }
            self.advance()?;
        }
        Ok(())
    }

    /// The shared solver state.
    pub fn core(&self) -> &SimCore {
        &self.core
    }

    /// Mutable access to the shared solver state.
    pub fn core_mut(&mut self) -> &mut SimCore {
        &mut self.core
    }

    /// The active PDEs.
    pub fn pdes(&self) -> &PdeMgr {
        &self.pdes
    }

    /// Mutable access to the active PDEs.
    pub fn pdes_mut(&mut self) -> &mut PdeMgr {
        &mut self.pdes
    }

    /// The active physics.
    pub fn physics(&self) -> &PhysicsMgr {
        &self.physics
    }

    /// Mutable access to the active physics.
    pub fn physics_mut(&mut self) -> &mut PhysicsMgr {
        &mut self.physics
    }

    /// The configuration this simulation was built from.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The lifecycle tracker.
    pub fn tracker(&self) -> &PhaseTracker {
        &self.tracker
    }

    /// Completed timesteps.
    pub fn step(&self) -> StepId {
        self.core.time().step
    }

    /// Current time, step and timestep.
    pub fn time(&self) -> &SimTime {
        self.core.time()
    }

    /// Regrids performed since construction.
    pub fn regrid_count(&self) -> u64 {
        self.regrids
    }

    /// Metrics from the last completed step.
    pub fn last_metrics(&self) -> &StepMetrics {
        &self.last_metrics
    }
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("step", &self.core.time().step)
            .field("phase", &self.tracker.current())
            .field("pdes", &self.pdes)
            .field("physics", &self.physics)
            .field("projection", &self.projection.name())
            .field("regrids", &self.regrids)
            .finish()
    }
}
