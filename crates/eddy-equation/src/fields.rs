//! Fields owned by one PDE.

use eddy_core::{FieldError, FieldId};
use eddy_field::FieldRepo;

use crate::pde::PdeTraits;

/// The fields a PDE declares: its transported quantity and the
/// per-term accumulators the update reads.
///
/// Names follow `<var>`, `<var>_conv_term`, `<var>_diff_term`,
/// `<var>_src_term` and `<var>_mueff`. The diffusion fields exist only for
/// diffusive PDEs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PdeFields {
    /// The transported quantity.
    pub field: FieldId,
    /// Advective term.
    pub conv_term: FieldId,
    /// Source-term accumulator.
    pub src_term: FieldId,
    /// Diffusive term.
    pub diff_term: Option<FieldId>,
    /// Effective diffusivity.
    pub mueff: Option<FieldId>,
}

impl PdeFields {
    /// Declare the fields of `P` in `repo`.
    ///
    /// The transported field may already exist (for example the flow
    /// velocity), in which case its attributes must match `P`'s.
    pub fn declare<P: PdeTraits>(repo: &mut FieldRepo) -> Result<Self, FieldError> {
        let var = P::VAR_NAME;
        let field = repo.declare_field(var, P::NCOMP, P::NGHOST, P::NUM_STATES)?;
        let conv_term = repo.declare_field(&format!("{var}_conv_term"), P::NCOMP, 0, 1)?;
        let src_term = repo.declare_field(&format!("{var}_src_term"), P::NCOMP, 0, 1)?;
        let (diff_term, mueff) = if P::HAS_DIFFUSION {
            (
                Some(repo.declare_field(&format!("{var}_diff_term"), P::NCOMP, 0, 1)?),
                Some(repo.declare_field(&format!("{var}_mueff"), 1, 1, 1)?),
            )
        } else {
            (None, None)
        };
        Ok(Self {
            field,
            conv_term,
            src_term,
            diff_term,
            mueff,
        })
    }
}
