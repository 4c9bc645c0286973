//! Lifecycle phase tracking for the driver.

use eddy_physics::Phase;

use crate::error::LifecycleError;

/// Validates that the driver enters lifecycle phases in order.
///
/// Setup runs `PreInit`, `InitializeFields`, `PostInit` once. Each
/// timestep then runs `PreAdvance`, `PrePredictor`, any number of
/// `PrePressureCorrection`/`PostPressureCorrection` pairs, and
/// `PostAdvance`. `PostRegrid` is accepted only between timesteps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PhaseTracker {
    current: Option<Phase>,
}

impl PhaseTracker {
    /// Nothing has run yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// The last phase entered.
    pub fn current(&self) -> Option<Phase> {
        self.current
    }

    /// Whether `next` may follow the current phase.
    pub fn can_enter(&self, next: Phase) -> bool {
        use Phase::*;
        match self.current {
            None => next == PreInit,
            Some(PreInit) => next == InitializeFields,
            Some(InitializeFields) => next == PostInit,
            Some(PostInit | PostRegrid | PostAdvance) => matches!(next, PreAdvance | PostRegrid),
            Some(PreAdvance) => next == PrePredictor,
            Some(PrePredictor | PostPressureCorrection) => {
                matches!(next, PrePressureCorrection | PostAdvance)
            }
            Some(PrePressureCorrection) => next == PostPressureCorrection,
        }
    }

    /// Enter `next`, or report the transition that was refused.
    pub fn enter(&mut self, next: Phase) -> Result<(), LifecycleError> {
        if !self.can_enter(next) {
            return Err(LifecycleError::OutOfOrder {
                from: self.current,
                to: next,
            });
        }
        self.current = Some(next);
        Ok(())
    }

    /// Whether setup has completed.
    pub fn is_initialized(&self) -> bool {
        !matches!(
            self.current,
            None | Some(Phase::PreInit | Phase::InitializeFields)
        )
    }

    /// Whether a timestep has started and not yet finished.
    pub fn in_step(&self) -> bool {
        matches!(
            self.current,
            Some(
                Phase::PreAdvance
                    | Phase::PrePredictor
                    | Phase::PrePressureCorrection
                    | Phase::PostPressureCorrection
            )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn run(tracker: &mut PhaseTracker, phases: &[Phase]) -> Result<(), LifecycleError> {
        phases.iter().try_for_each(|p| tracker.enter(*p))
    }

    const SETUP: [Phase; 3] = [Phase::PreInit, Phase::InitializeFields, Phase::PostInit];

    #[test]
    fn full_lifecycle_is_accepted() {
        let mut t = PhaseTracker::new();
        run(&mut t, &SETUP).unwrap();
        assert!(t.is_initialized() && !t.in_step());
        run(
            &mut t,
            &[
                Phase::PreAdvance,
                Phase::PrePredictor,
                Phase::PrePressureCorrection,
                Phase::PostPressureCorrection,
                Phase::PrePressureCorrection,
                Phase::PostPressureCorrection,
                Phase::PostAdvance,
                Phase::PostRegrid,
                Phase::PostRegrid,
                Phase::PreAdvance,
            ],
        )
        .unwrap();
        assert!(t.in_step());
    }

    #[test]
    fn regrid_inside_a_step_is_refused() {
        let mut t = PhaseTracker::new();
        run(&mut t, &SETUP).unwrap();
        t.enter(Phase::PreAdvance).unwrap();
        assert_eq!(
            t.enter(Phase::PostRegrid),
            Err(LifecycleError::OutOfOrder {
                from: Some(Phase::PreAdvance),
                to: Phase::PostRegrid,
            })
        );
        assert_eq!(t.current(), Some(Phase::PreAdvance));
    }

    #[test]
    fn stepping_before_init_is_refused() {
        let mut t = PhaseTracker::new();
        assert!(t.enter(Phase::PreAdvance).is_err());
        t.enter(Phase::PreInit).unwrap();
        assert!(t.enter(Phase::PostInit).is_err());
        assert!(!t.is_initialized());
    }

    proptest! {
        #[test]
        fn refused_transitions_leave_state_unchanged(
            picks in prop::collection::vec(0..Phase::ALL.len(), 0..24)
        ) {
            let mut t = PhaseTracker::new();
            for i in picks {
                let before = t.current();
                let next = Phase::ALL[i];
                match t.enter(next) {
                    Ok(()) => prop_assert_eq!(t.current(), Some(next)),
                    Err(_) => prop_assert_eq!(t.current(), before),
                }
            }
        }
    }
}
