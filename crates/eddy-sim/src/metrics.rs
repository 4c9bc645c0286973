//! Per-step timing metrics for the driver.
//!
//! [`StepMetrics`] captures timing data for a single timestep.

/// Timing data collected during a single timestep.
///
/// All durations are in microseconds. [`Simulation::advance`] returns a
/// fresh value each step.
///
/// [`Simulation::advance`]: crate::Simulation::advance
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepMetrics {
    /// Wall-clock time for the entire step.
    pub total_us: u64,
    /// Per-phase times: `(phase name, microseconds)`, in execution order.
    pub phase_us: Vec<(String, u64)>,
    /// PDE stages run this step.
    pub stages: u32,
    /// Cumulative number of regrids since construction.
    pub regrids: u64,
}

impl StepMetrics {
    /// Add `us` to the entry for `phase`, creating it on first use.
    pub fn record(&mut self, phase: &str, us: u64) {
        match self.phase_us.iter_mut().find(|(name, _)| name == phase) {
            Some((_, total)) => *total += us,
            None => self.phase_us.push((phase.to_string(), us)),
        }
    }

    /// Time recorded for `phase`, if it ran.
    pub fn phase(&self, phase: &str) -> Option<u64> {
        self.phase_us
            .iter()
            .find(|(name, _)| name == phase)
            .map(|(_, us)| *us)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = StepMetrics::default();
        assert_eq!(m.total_us, 0);
        assert!(m.phase_us.is_empty());
        assert_eq!(m.stages, 0);
        assert_eq!(m.regrids, 0);
    }

    #[test]
    fn repeated_phases_accumulate_in_first_seen_order() {
        let mut m = StepMetrics::default();
        m.record("pde_stages", 5);
        m.record("pressure_projection", 2);
        m.record("pde_stages", 7);
        assert_eq!(m.phase("pde_stages"), Some(12));
        assert_eq!(m.phase("post_advance_work"), None);
        assert_eq!(m.phase_us[0].0, "pde_stages");
    }
}
