//! Registries consulted during setup, and the process-wide defaults.
//!
//! Every built-in module is registered once, on first use, into a
//! registry that stays read-only afterwards. Setup code receives the
//! registries explicitly through [`Registries`], so tests can pass their
//! own.

use std::sync::OnceLock;

use eddy_core::{Registry, RegistryBuilder, RegistryError};
use eddy_equation::source::register_builtin_sources;
use eddy_equation::{
    register_transport, Central, Density, PdeCategory, SourceCategory, Temperature, Upwind, Vof,
};
use eddy_physics::{register_builtins, PhysicsCategory};

/// The three registries a simulation is built from.
#[derive(Clone, Copy)]
pub struct Registries<'r> {
    /// Physics constructors.
    pub physics: &'r Registry<PhysicsCategory>,
    /// PDE constructors.
    pub pdes: &'r Registry<PdeCategory>,
    /// Source-term constructors.
    pub sources: &'r Registry<SourceCategory>,
}

impl Registries<'static> {
    /// The built-in modules.
    pub fn defaults() -> Self {
        Self {
            physics: default_physics_registry(),
            pdes: default_pde_registry(),
            sources: default_source_registry(),
        }
    }
}

impl std::fmt::Debug for Registries<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registries")
            .field("physics", &self.physics.identifiers().collect::<Vec<_>>())
            .field("pdes", &self.pdes.identifiers().collect::<Vec<_>>())
            .field("sources", &self.sources.identifiers().collect::<Vec<_>>())
            .finish()
    }
}

/// Register `VOF`, `Density` and `Temperature` with both advection schemes.
pub fn register_builtin_pdes(builder: &mut RegistryBuilder<PdeCategory>) -> Result<(), RegistryError> {
    register_transport::<Vof, Upwind>(builder)?;
    register_transport::<Vof, Central>(builder)?;
    register_transport::<Density, Upwind>(builder)?;
    register_transport::<Density, Central>(builder)?;
    register_transport::<Temperature, Upwind>(builder)?;
    register_transport::<Temperature, Central>(builder)?;
    Ok(())
}

fn build<C, F>(register: F) -> Registry<C>
where
    C: eddy_core::Category,
    F: FnOnce(&mut RegistryBuilder<C>) -> Result<(), RegistryError>,
{
    let mut builder = Registry::builder();
    // A fresh builder only rejects duplicates, and built-in identifiers are unique.
    register(&mut builder).expect("built-in identifiers are unique");
    builder.build()
}

/// The built-in physics.
pub fn default_physics_registry() -> &'static Registry<PhysicsCategory> {
    static REGISTRY: OnceLock<Registry<PhysicsCategory>> = OnceLock::new();
    REGISTRY.get_or_init(|| build(register_builtins))
}

/// The built-in PDEs.
pub fn default_pde_registry() -> &'static Registry<PdeCategory> {
    static REGISTRY: OnceLock<Registry<PdeCategory>> = OnceLock::new();
    REGISTRY.get_or_init(|| build(register_builtin_pdes))
}

/// The built-in source terms.
pub fn default_source_registry() -> &'static Registry<SourceCategory> {
    static REGISTRY: OnceLock<Registry<SourceCategory>> = OnceLock::new();
    REGISTRY.get_or_init(|| build(register_builtin_sources))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_list_every_builtin_in_registration_order() {
        let r = Registries::defaults();
        assert_eq!(
            r.pdes.identifiers().collect::<Vec<_>>(),
            [
                "VOF-Upwind",
                "VOF-Central",
                "Density-Upwind",
                "Density-Central",
                "Temperature-Upwind",
                "Temperature-Central",
            ]
        );
        assert_eq!(
            r.physics.identifiers().collect::<Vec<_>>(),
            ["FreeStream", "VofSphere", "MultiPhase", "Perturbation", "FieldMonitor"]
        );
        assert!(r.sources.contains("ConstantSource"));
        assert!(r.sources.contains("Relaxation"));
    }

    #[test]
    fn defaults_are_shared() {
        assert!(std::ptr::eq(
            Registries::defaults().physics,
            default_physics_registry()
        ));
    }
}
