//! The shared transport update behind every PDE.
//!
//! [`ScalarTransport`] advances `dq/dt + div(u w) = div(mueff grad q) + S`
//! where `w` is `rho * q` for density-weighted PDEs and `q` otherwise. The
//! predictor is forward Euler from `Old`; the corrector averages it with a
//! second Euler step from the predicted `New` state.

use std::error::Error;
use std::fmt;
use std::marker::PhantomData;

use smallvec::SmallVec;
use tracing::{debug, warn};

use eddy_core::{
    CollectionMgr, ConstructResult, FieldError, FieldId, IntVect, Registered, Registry,
    RegistryBuilder, RegistryError, SPACEDIM,
};
use eddy_field::{SimCore, TimeState};
use eddy_mesh::{Block, LevelArray};

use crate::fields::PdeFields;
use crate::kinds::declare_flow_fields;
use crate::pde::{Pde, PdeCategory, PdeTraits, Stage};
use crate::scheme::SchemeTraits;
use crate::source::{SourceCategory, SourceInput};

fn shifted(iv: IntVect, dir: usize, by: i32) -> IntVect {
    let mut out = iv;
    out[dir] += by;
    out
}

/// Value at `iv`, or the value at `center` if `iv` is outside the block's
/// grown box.
fn sample(b: &Block, iv: IntVect, center: IntVect, comp: usize) -> f64 {
    b.get(iv, comp)
        .or_else(|| b.get(center, comp))
        .unwrap_or(0.0)
}

/// One PDE: the quantity `P` advected with scheme `S`.
///
/// Registered as `"<PDE_NAME>-<SCHEME_NAME>"`, e.g. `"VOF-Upwind"`.
///
/// Parameters:
/// - `<PDE_NAME>.diffusivity`: kinematic diffusivity (default 0).
/// - `flow.velocity`, `flow.density`: boundary values of the flow fields.
pub struct ScalarTransport<P: PdeTraits, S: SchemeTraits> {
    fields: PdeFields,
    velocity: FieldId,
    density: FieldId,
    diffusivity: f64,
    velocity_bc: SmallVec<[f64; SPACEDIM]>,
    density_bc: f64,
    sources: CollectionMgr<SourceCategory>,
    _marker: PhantomData<fn() -> (P, S)>,
}

impl<P: PdeTraits, S: SchemeTraits> ScalarTransport<P, S> {
    /// Declare the flow fields and `P`'s fields, and read parameters.
    pub fn new(core: &mut SimCore) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let (velocity, density) = declare_flow_fields(core.repo_mut())?;
        let fields = PdeFields::declare::<P>(core.repo_mut())?;

        let scope = core.params().scope(P::PDE_NAME);
        if P::HAS_DIFFUSION && !scope.contains("diffusivity") {
            warn!(key = %scope.key("diffusivity"), "no diffusivity given, using 0");
        }
        let diffusivity = scope.get_f64_or("diffusivity", 0.0)?;
        if !(diffusivity >= 0.0 && diffusivity.is_finite()) {
            return Err(format!(
                "{} must be finite and non-negative, got {diffusivity}",
                scope.key("diffusivity")
            )
            .into());
        }
        let flow = core.params().scope("flow");
        let velocity_bc = flow.get_f64_array_or("velocity", &[0.0])?.into_iter().collect();
        let density_bc = flow.get_f64_or("density", 1.0)?;

        debug!(pde = P::PDE_NAME, scheme = S::SCHEME_NAME, diffusivity, "constructed PDE");
        Ok(Self {
            fields,
            velocity,
            density,
            diffusivity,
            velocity_bc,
            density_bc,
            sources: CollectionMgr::new(),
            _marker: PhantomData,
        })
    }

    /// Kinematic diffusivity.
    pub fn diffusivity(&self) -> f64 {
        self.diffusivity
    }

    /// The attached source terms.
    pub fn sources(&self) -> &CollectionMgr<SourceCategory> {
        &self.sources
    }

    fn compute_mueff(&self, core: &mut SimCore, lev: usize) -> Result<(), FieldError> {
        let Some(mueff) = self.fields.mueff else {
            return Ok(());
        };
        let repo = core.repo();
        let mut out = repo.level(mueff, TimeState::New, lev)?.zeros_like();
        let rho = repo.level(self.density, TimeState::New, lev)?;
        for (ob, rb) in out.blocks_mut().iter_mut().zip(rho.blocks()) {
            for iv in ob.valid().cells() {
                let weight = if P::MULTIPLY_RHO {
                    rb.get(iv, 0).unwrap_or(self.density_bc)
                } else {
                    1.0
                };
                ob.set(iv, 0, self.diffusivity * weight);
            }
        }
        core.repo_mut().replace_level(mueff, TimeState::New, lev, out)?;
        Ok(())
    }

    fn refresh_mueff(&self, core: &mut SimCore) -> Result<(), FieldError> {
        let Some(mueff) = self.fields.mueff else {
            return Ok(());
        };
        for lev in 0..core.num_levels() {
            self.compute_mueff(core, lev)?;
        }
        let bc = if P::MULTIPLY_RHO {
            self.diffusivity * self.density_bc
        } else {
            self.diffusivity
        };
        core.fill_ghosts(mueff, TimeState::New, &[bc])
    }

    fn advection_level(&self, core: &SimCore, state: TimeState, lev: usize) -> Result<LevelArray, FieldError> {
        let repo = core.repo();
        let dx = core.geometry(lev).cell_sizes();
        let q = repo.level(self.fields.field, state, lev)?;
        let u = repo.level(self.velocity, state, lev)?;
        let rho = repo.level(self.density, state, lev)?;
        let mut out = repo.level(self.fields.conv_term, TimeState::New, lev)?.zeros_like();

        for (n, ob) in out.blocks_mut().iter_mut().enumerate() {
            let (qb, ub, rb) = (&q.blocks()[n], &u.blocks()[n], &rho.blocks()[n]);
            let advected = |iv: IntVect, center: IntVect, comp: usize| {
                let w = sample(qb, iv, center, comp);
                if P::MULTIPLY_RHO {
                    w * sample(rb, iv, center, 0)
                } else {
                    w
                }
            };
            for iv in ob.valid().cells() {
                for comp in 0..P::NCOMP {
                    let mut div = 0.0;
                    for d in 0..SPACEDIM {
                        let (lo, hi) = (shifted(iv, d, -1), shifted(iv, d, 1));
                        let uc = sample(ub, iv, iv, d);
                        let u_lo = 0.5 * (sample(ub, lo, iv, d) + uc);
                        let u_hi = 0.5 * (uc + sample(ub, hi, iv, d));
                        let wc = advected(iv, iv, comp);
                        let f_lo = u_lo * S::face_value(advected(lo, iv, comp), wc, u_lo);
                        let f_hi = u_hi * S::face_value(wc, advected(hi, iv, comp), u_hi);
                        div += (f_hi - f_lo) / dx[d];
                    }
                    ob.set(iv, comp, -div);
                }
            }
        }
        Ok(out)
    }

    fn diffusion_level(
        &self,
        core: &SimCore,
        diff_term: FieldId,
        mueff: FieldId,
        state: TimeState,
        lev: usize,
    ) -> Result<LevelArray, FieldError> {
        let repo = core.repo();
        let dx = core.geometry(lev).cell_sizes();
        let q = repo.level(self.fields.field, state, lev)?;
        let k = repo.level(mueff, TimeState::New, lev)?;
        let mut out = repo.level(diff_term, TimeState::New, lev)?.zeros_like();

        for (n, ob) in out.blocks_mut().iter_mut().enumerate() {
            let (qb, kb) = (&q.blocks()[n], &k.blocks()[n]);
            for iv in ob.valid().cells() {
                let kc = sample(kb, iv, iv, 0);
                for comp in 0..P::NCOMP {
                    let qc = sample(qb, iv, iv, comp);
                    let mut lap = 0.0;
                    for d in 0..SPACEDIM {
                        let (lo, hi) = (shifted(iv, d, -1), shifted(iv, d, 1));
                        let k_lo = 0.5 * (sample(kb, lo, iv, 0) + kc);
                        let k_hi = 0.5 * (kc + sample(kb, hi, iv, 0));
                        let flux_hi = k_hi * (sample(qb, hi, iv, comp) - qc);
                        let flux_lo = k_lo * (qc - sample(qb, lo, iv, comp));
                        lap += (flux_hi - flux_lo) / (dx[d] * dx[d]);
                    }
                    ob.set(iv, comp, lap);
                }
            }
        }
        Ok(out)
    }

    fn source_level(&self, core: &SimCore, state: TimeState, lev: usize) -> Result<LevelArray, FieldError> {
        let repo = core.repo();
        let mut out = repo.level(self.fields.src_term, TimeState::New, lev)?.zeros_like();
        let input = SourceInput {
            field: self.fields.field,
            state,
        };
        for (_, term) in self.sources.iter() {
            term.add_to(core, input, lev, &mut out)?;
        }
        if P::MULTIPLY_RHO {
            let rho = repo.level(self.density, state, lev)?;
            for (ob, rb) in out.blocks_mut().iter_mut().zip(rho.blocks()) {
                for iv in ob.valid().cells() {
                    let r = rb.get(iv, 0).unwrap_or(self.density_bc);
                    for comp in 0..P::NCOMP {
                        if let Some(s) = ob.get_mut(iv, comp) {
                            *s *= r;
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    fn update_level(&self, core: &SimCore, stage: Stage, dt: f64, lev: usize) -> Result<LevelArray, FieldError> {
        let repo = core.repo();
        let field = self.fields.field;
        let q_old = repo.level(field, TimeState::Old, lev)?;
        let q_new = repo.level(field, TimeState::New, lev)?;
        let conv = repo.level(self.fields.conv_term, TimeState::New, lev)?;
        let src = repo.level(self.fields.src_term, TimeState::New, lev)?;
        let diff = match self.fields.diff_term {
            Some(id) => Some(repo.level(id, TimeState::New, lev)?),
            None => None,
        };
        let rho_old = repo.level(self.density, TimeState::Old, lev)?;
        let rho_new = repo.level(self.density, TimeState::New, lev)?;

        let mut out = q_new.clone();
        for (n, ob) in out.blocks_mut().iter_mut().enumerate() {
            let (ob_old, cb, sb) = (&q_old.blocks()[n], &conv.blocks()[n], &src.blocks()[n]);
            let db = diff.map(|d| &d.blocks()[n]);
            let (ro, rn) = (&rho_old.blocks()[n], &rho_new.blocks()[n]);
            for iv in ob.valid().cells() {
                let (r_old, r_new) = if P::MULTIPLY_RHO {
                    (sample(ro, iv, iv, 0), sample(rn, iv, iv, 0))
                } else {
                    (1.0, 1.0)
                };
                for comp in 0..P::NCOMP {
                    let rhs = sample(cb, iv, iv, comp)
                        + sample(sb, iv, iv, comp)
                        + db.map_or(0.0, |b| sample(b, iv, iv, comp));
                    let old = r_old * sample(ob_old, iv, iv, comp);
                    let value = match stage {
                        Stage::Predictor => (old + dt * rhs) / r_new,
                        Stage::Corrector => {
                            let star = r_new * sample(ob, iv, iv, comp);
                            0.5 * (old + star + dt * rhs) / r_new
                        }
                    };
                    ob.set(iv, comp, value);
                }
            }
        }
        Ok(out)
    }
}

impl<P: PdeTraits, S: SchemeTraits> Registered for ScalarTransport<P, S> {
    fn identifier() -> String {
        format!("{}-{}", P::PDE_NAME, S::SCHEME_NAME)
    }
}

impl<P: PdeTraits, S: SchemeTraits> Pde for ScalarTransport<P, S> {
    fn pde_name(&self) -> &str {
        P::PDE_NAME
    }

    fn fields(&self) -> &PdeFields {
        &self.fields
    }

    fn multiply_rho(&self) -> bool {
        P::MULTIPLY_RHO
    }

    fn has_diffusion(&self) -> bool {
        P::HAS_DIFFUSION
    }

    fn default_bc_value(&self) -> f64 {
        P::DEFAULT_BC_VALUE
    }

    fn initialize(&mut self, core: &mut SimCore, lev: usize) -> Result<(), FieldError> {
        self.compute_mueff(core, lev)
    }

    fn post_init_actions(&mut self, core: &mut SimCore) -> Result<(), FieldError> {
        self.refresh_mueff(core)?;
        self.fillpatch(core, TimeState::New)
    }

    fn post_regrid_actions(&mut self, core: &mut SimCore) -> Result<(), FieldError> {
        self.refresh_mueff(core)?;
        self.fillpatch(core, TimeState::New)
    }

    fn pre_advance_work(&mut self, core: &mut SimCore) -> Result<(), FieldError> {
        for lev in 0..core.num_levels() {
            core.repo_mut()
                .level_mut(self.fields.src_term, TimeState::New, lev)?
                .fill(0.0);
        }
        self.refresh_mueff(core)
    }

    fn fillpatch(&mut self, core: &mut SimCore, state: TimeState) -> Result<(), FieldError> {
        let bc = [P::DEFAULT_BC_VALUE; 1];
        core.fill_ghosts(self.fields.field, state, &bc)?;
        if self.velocity != self.fields.field {
            core.fill_ghosts(self.velocity, state, &self.velocity_bc)?;
        }
        if self.density != self.fields.field {
            core.fill_ghosts(self.density, state, &[self.density_bc])?;
        }
        Ok(())
    }

    fn compute_advection_term(&mut self, core: &mut SimCore, stage: Stage) -> Result<(), FieldError> {
        for lev in 0..core.num_levels() {
            let conv = self.advection_level(core, stage.state(), lev)?;
            core.repo_mut()
                .replace_level(self.fields.conv_term, TimeState::New, lev, conv)?;
        }
        Ok(())
    }

    fn compute_diffusion_term(&mut self, core: &mut SimCore, stage: Stage) -> Result<(), FieldError> {
        let (Some(diff_term), Some(mueff)) = (self.fields.diff_term, self.fields.mueff) else {
            return Ok(());
        };
        for lev in 0..core.num_levels() {
            let diff = self.diffusion_level(core, diff_term, mueff, stage.state(), lev)?;
            core.repo_mut()
                .replace_level(diff_term, TimeState::New, lev, diff)?;
        }
        Ok(())
    }

    fn compute_source_term(&mut self, core: &mut SimCore, stage: Stage) -> Result<(), FieldError> {
        for lev in 0..core.num_levels() {
            let src = self.source_level(core, stage.state(), lev)?;
            core.repo_mut()
                .replace_level(self.fields.src_term, TimeState::New, lev, src)?;
        }
        Ok(())
    }

    fn apply_update(&mut self, core: &mut SimCore, stage: Stage, dt: f64) -> Result<(), FieldError> {
        for lev in 0..core.num_levels() {
            let updated = self.update_level(core, stage, dt, lev)?;
            core.repo_mut()
                .replace_level(self.fields.field, TimeState::New, lev, updated)?;
        }
        debug!(pde = P::PDE_NAME, stage = stage.name(), dt, "applied update");
        Ok(())
    }

    fn add_source_term(
        &mut self,
        registry: &Registry<SourceCategory>,
        identifier: &str,
        core: &mut SimCore,
    ) -> Result<(), RegistryError> {
        self.sources.add(registry, identifier, core)?;
        debug!(pde = P::PDE_NAME, source = identifier, "attached source term");
        Ok(())
    }

    fn source_terms(&self) -> Vec<&str> {
        self.sources.identifiers().collect()
    }

    fn max_stable_dt(&self, core: &SimCore) -> Result<f64, FieldError> {
        let velocity = core.repo().levels(self.velocity, TimeState::New)?;
        let mut dt = f64::INFINITY;
        for (lev, u) in velocity.iter().enumerate() {
            let dx = core.geometry(lev).cell_sizes();
            let mut rate = 0.0_f64;
            for b in u.blocks() {
                for iv in b.valid().cells() {
                    let cell: f64 = (0..SPACEDIM)
                        .map(|d| b.get(iv, d).unwrap_or(0.0).abs() / dx[d])
                        .sum();
                    rate = rate.max(cell);
                }
            }
            let rate = core.collective().max(rate);
            if rate > 0.0 {
                dt = dt.min(1.0 / rate);
            }
            if P::HAS_DIFFUSION && self.diffusivity > 0.0 {
                let inv: f64 = dx.iter().map(|h| 1.0 / (h * h)).sum();
                dt = dt.min(1.0 / (2.0 * self.diffusivity * inv));
            }
        }
        Ok(dt)
    }
}

impl<P: PdeTraits, S: SchemeTraits> fmt::Debug for ScalarTransport<P, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarTransport")
            .field("pde", &P::PDE_NAME)
            .field("scheme", &S::SCHEME_NAME)
            .field("fields", &self.fields)
            .field("diffusivity", &self.diffusivity)
            .field("sources", &self.sources)
            .finish()
    }
}

/// Register `ScalarTransport<P, S>` under `"<PDE_NAME>-<SCHEME_NAME>"`.
pub fn register_transport<P: PdeTraits, S: SchemeTraits>(
    builder: &mut RegistryBuilder<PdeCategory>,
) -> Result<(), RegistryError> {
    builder.register_type::<ScalarTransport<P, S>, _>(|core: &mut SimCore| -> ConstructResult<dyn Pde> {
        Ok(Box::new(ScalarTransport::<P, S>::new(core)?))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::{Temperature, Vof, VELOCITY};
    use crate::scheme::{Central, Upwind};
    use eddy_core::{Geometry, ParamTable};
    use eddy_mesh::{LevelLayout, LocalMesh, MeshLayout};

    fn core_with(n: i32, params: ParamTable) -> SimCore {
        let mesh = LocalMesh::new(MeshLayout::single_level(LevelLayout::chopped(
            Geometry::unit_cube(n),
            4,
        )))
        .unwrap();
        SimCore::new(Box::new(mesh), params)
    }

    fn set_velocity(core: &mut SimCore, u: [f64; 3]) {
        let id = core.repo().field_id(VELOCITY).unwrap();
        for state in [TimeState::New, TimeState::Old] {
            let arr = core.repo_mut().level_mut(id, state, 0).unwrap();
            for (d, v) in u.iter().enumerate() {
                arr.fill_comp(d, *v);
            }
        }
    }

    #[test]
    fn identifier_combines_pde_and_scheme() {
        assert_eq!(ScalarTransport::<Vof, Upwind>::identifier(), "VOF-Upwind");
        assert_eq!(
            ScalarTransport::<Temperature, Central>::identifier(),
            "Temperature-Central"
        );
    }

    #[test]
    fn construction_declares_fields() {
        let mut core = core_with(4, ParamTable::new());
        let vof = ScalarTransport::<Vof, Upwind>::new(&mut core).unwrap();
        assert!(core.repo().contains("vof_conv_term"));
        assert!(core.repo().contains("vof_src_term"));
        assert!(!core.repo().contains("vof_diff_term"));
        assert!(vof.fields().mueff.is_none());

        let temp = ScalarTransport::<Temperature, Upwind>::new(&mut core).unwrap();
        assert!(core.repo().contains("temperature_mueff"));
        assert!(temp.has_diffusion());
        assert_eq!(temp.default_bc_value(), 300.0);
    }

    #[test]
    fn negative_diffusivity_is_rejected() {
        let mut core = core_with(4, ParamTable::new().with("Temperature.diffusivity", -1.0));
        assert!(ScalarTransport::<Temperature, Upwind>::new(&mut core).is_err());
    }

    #[test]
    fn uniform_field_has_no_interior_advection() {
        let mut core = core_with(8, ParamTable::new());
        let mut vof = ScalarTransport::<Vof, Upwind>::new(&mut core).unwrap();
        set_velocity(&mut core, [1.0, -0.5, 0.25]);
        let id = vof.fields().field;
        core.repo_mut().level_mut(id, TimeState::Old, 0).unwrap().fill(0.3);
        vof.fillpatch(&mut core, TimeState::Old).unwrap();
        vof.compute_advection_term(&mut core, Stage::Predictor).unwrap();

        let conv = core.repo().level(vof.fields().conv_term, TimeState::New, 0).unwrap();
        conv.for_each_valid(0, |iv, v| {
            if iv.iter().all(|&i| (1..7).contains(&i)) {
                assert!(v.abs() < 1e-12, "advection of a uniform field at {iv:?}: {v}");
            }
        });
    }

    #[test]
    fn predictor_steps_a_step_profile_downstream() {
        let mut core = core_with(8, ParamTable::new());
        let mut vof = ScalarTransport::<Vof, Upwind>::new(&mut core).unwrap();
        set_velocity(&mut core, [1.0, 0.0, 0.0]);
        let id = vof.fields().field;
        core.repo_mut()
            .level_mut(id, TimeState::Old, 0)
            .unwrap()
            .for_each_valid_mut(0, |iv, v| *v = if iv[0] < 4 { 1.0 } else { 0.0 });
        vof.advance_stage(&mut core, Stage::Predictor, 0.0625).unwrap();

        let q = core.repo().level(id, TimeState::New, 0).unwrap();
        // dt * u / dx = 0.5 of the upstream jump enters the first downstream cell.
        assert!((q.value_at([4, 3, 3], 0).unwrap() - 0.5).abs() < 1e-12);
        assert!((q.value_at([2, 3, 3], 0).unwrap() - 1.0).abs() < 1e-12);
        assert!(q.value_at([6, 3, 3], 0).unwrap().abs() < 1e-12);
    }

    #[test]
    fn diffusion_of_a_linear_profile_vanishes_inside() {
        let params = ParamTable::new().with("Temperature.diffusivity", 0.1);
        let mut core = core_with(8, params);
        let mut temp = ScalarTransport::<Temperature, Central>::new(&mut core).unwrap();
        let density = core.repo().field_id("density").unwrap();
        core.repo_mut().level_mut(density, TimeState::New, 0).unwrap().fill(2.0);
        let id = temp.fields().field;
        core.repo_mut()
            .level_mut(id, TimeState::New, 0)
            .unwrap()
            .for_each_valid_mut(0, |iv, v| *v = iv[0] as f64);
        temp.pre_advance_work(&mut core).unwrap();
        temp.fillpatch(&mut core, TimeState::New).unwrap();
        temp.compute_diffusion_term(&mut core, Stage::Corrector).unwrap();

        let mueff = temp.fields().mueff.unwrap();
        let k = core.repo().level(mueff, TimeState::New, 0).unwrap();
        assert!((k.value_at([3, 3, 3], 0).unwrap() - 0.2).abs() < 1e-12);
        let diff = core
            .repo()
            .level(temp.fields().diff_term.unwrap(), TimeState::New, 0)
            .unwrap();
        assert!(diff.value_at([3, 3, 3], 0).unwrap().abs() < 1e-9);
    }

    #[test]
    fn stable_dt_follows_velocity_and_diffusivity() {
        let params = ParamTable::new().with("Temperature.diffusivity", 1.0);
        let mut core = core_with(4, params);
        let vof = ScalarTransport::<Vof, Upwind>::new(&mut core).unwrap();
        assert_eq!(vof.max_stable_dt(&core).unwrap(), f64::INFINITY);
        set_velocity(&mut core, [2.0, 0.0, 0.0]);
        assert!((vof.max_stable_dt(&core).unwrap() - 0.125).abs() < 1e-12);

        let temp = ScalarTransport::<Temperature, Upwind>::new(&mut core).unwrap();
        // 1 / (2 * 1 * 3 * 16) is below the advective limit.
        assert!((temp.max_stable_dt(&core).unwrap() - 1.0 / 96.0).abs() < 1e-12);
    }

    #[test]
    fn stable_dt_reports_a_missing_velocity_field() {
        let mut core = core_with(4, ParamTable::new());
        let vof = ScalarTransport::<Vof, Upwind>::new(&mut core).unwrap();
        let other = core_with(4, ParamTable::new());
        assert!(matches!(
            vof.max_stable_dt(&other),
            Err(FieldError::UnknownId { .. })
        ));
    }
}
