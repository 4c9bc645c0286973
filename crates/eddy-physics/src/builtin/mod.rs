//! Built-in physics modules.

mod free_stream;
mod monitor;
mod multiphase;
mod perturbation;
mod vof_sphere;

pub use free_stream::FreeStream;
pub use monitor::{FieldMonitor, MonitorRecord};
pub use multiphase::MultiPhase;
pub use perturbation::Perturbation;
pub use vof_sphere::{VofSphere, VOF};

use eddy_core::{ConstructResult, RegistryBuilder, RegistryError};
use eddy_field::SimCore;

use crate::physics::{Physics, PhysicsCategory};

/// Register every built-in physics under its identifier.
pub fn register_builtins(builder: &mut RegistryBuilder<PhysicsCategory>) -> Result<(), RegistryError> {
    builder
        .register_type::<FreeStream, _>(|core: &mut SimCore| -> ConstructResult<dyn Physics> {
            Ok(Box::new(FreeStream::new(core)?))
        })?
        .register_type::<VofSphere, _>(|core: &mut SimCore| -> ConstructResult<dyn Physics> {
            Ok(Box::new(VofSphere::new(core)?))
        })?
        .register_type::<MultiPhase, _>(|core: &mut SimCore| -> ConstructResult<dyn Physics> {
            Ok(Box::new(MultiPhase::new(core)?))
        })?
        .register_type::<Perturbation, _>(|core: &mut SimCore| -> ConstructResult<dyn Physics> {
            Ok(Box::new(Perturbation::new(core)?))
        })?
        .register_type::<FieldMonitor, _>(|core: &mut SimCore| -> ConstructResult<dyn Physics> {
            Ok(Box::new(FieldMonitor::new(core)?))
        })?;
    Ok(())
}
