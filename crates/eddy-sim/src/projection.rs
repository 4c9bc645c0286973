//! Pressure projection seam.

use eddy_core::FieldError;
use eddy_equation::Stage;
use eddy_field::SimCore;

/// The pressure-projection solve that follows each PDE stage.
///
/// The driver brackets every call with the physics
/// `pre_pressure_correction_work` and `post_pressure_correction_work`
/// hooks.
///
/// # Object safety
///
/// Object-safe; the driver holds a `Box<dyn PressureProjection>`.
pub trait PressureProjection: Send {
    /// Name for logs and metrics.
    fn name(&self) -> &str;

    /// Project the velocity after `stage`.
    fn project(&mut self, core: &mut SimCore, stage: Stage, dt: f64) -> Result<(), FieldError>;
}

/// A projection that leaves every field unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProjection;

impl PressureProjection for NoProjection {
    fn name(&self) -> &str {
        "none"
    }

    fn project(&mut self, _core: &mut SimCore, _stage: Stage, _dt: f64) -> Result<(), FieldError> {
        Ok(())
    }
}
