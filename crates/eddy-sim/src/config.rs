//! Simulation configuration and validation.
//!
//! [`SimConfig`] is the input to [`Simulation::new`](crate::Simulation::new).
//! Module parameters live in its [`ParamTable`], namespaced as
//! `"<Identifier>.<key>"`; the driver itself reads only the active lists
//! and the stepping controls below.

use indexmap::IndexSet;

use eddy_core::ParamTable;
use eddy_equation::Stage;

use crate::error::ConfigError;

// ── Integrator ─────────────────────────────────────────────────────

/// Time integration scheme for every active PDE.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Integrator {
    /// One predictor stage.
    Euler,
    /// Predictor then corrector.
    #[default]
    PredictorCorrector,
}

impl Integrator {
    /// The stages run each timestep, in order.
    pub fn stages(self) -> &'static [Stage] {
        match self {
            Self::Euler => &[Stage::Predictor],
            Self::PredictorCorrector => &[Stage::Predictor, Stage::Corrector],
        }
    }
}

// ── SimConfig ──────────────────────────────────────────────────────

/// Everything needed to set up a [`Simulation`](crate::Simulation).
#[derive(Clone, Debug)]
pub struct SimConfig {
    /// Physics identifiers to activate, in broadcast order.
    pub physics: Vec<String>,
    /// PDE identifiers to activate, e.g. `"VOF-Upwind"`.
    pub pdes: Vec<String>,
    /// Fixed timestep, or the upper bound when `cfl` is set.
    pub dt: f64,
    /// If set, `dt` is capped at `cfl` times the PDEs' stable timestep.
    pub cfl: Option<f64>,
    /// Timesteps taken by [`run`](crate::Simulation::run).
    pub max_steps: u64,
    /// Time integration scheme.
    pub integrator: Integrator,
    /// Consult the regrid policy every this many steps. `None` = never.
    pub regrid_interval: Option<u64>,
    /// Module parameters.
    pub params: ParamTable,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            physics: Vec::new(),
            pdes: Vec::new(),
            dt: 1.0e-3,
            cfl: None,
            max_steps: 1,
            integrator: Integrator::default(),
            regrid_interval: None,
            params: ParamTable::new(),
        }
    }
}

impl SimConfig {
    /// Check the stepping controls and the active lists.
    ///
    /// Identifiers are not resolved here; unknown names surface from the
    /// registries during [`Simulation::new`](crate::Simulation::new).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(ConfigError::InvalidDt { value: self.dt });
        }
        if let Some(cfl) = self.cfl {
            if !(cfl > 0.0 && cfl <= 1.0) {
                return Err(ConfigError::InvalidCfl { value: cfl });
            }
        }
        if self.regrid_interval == Some(0) {
            return Err(ConfigError::InvalidRegridInterval);
        }
        check_unique("physics", &self.physics)?;
        check_unique("pdes", &self.pdes)?;
        Ok(())
    }
}

fn check_unique(list: &'static str, names: &[String]) -> Result<(), ConfigError> {
    let mut seen = IndexSet::with_capacity(names.len());
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(ConfigError::DuplicateName {
                list,
                identifier: name.clone(),
            });
        }
    }
    Ok(())
}
