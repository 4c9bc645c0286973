//! Advection face-value schemes.

/// Interpolation of a cell-centred quantity to a face.
///
/// `left` and `right` are the cell values on either side of the face in
/// the direction of increasing index; `u_face` is the face-normal
/// velocity.
pub trait SchemeTraits: Send + 'static {
    /// Name used in registry identifiers, e.g. `"Upwind"`.
    const SCHEME_NAME: &'static str;

    /// Face value of the advected quantity.
    fn face_value(left: f64, right: f64, u_face: f64) -> f64;
}

/// First-order donor-cell scheme.
#[derive(Clone, Copy, Debug, Default)]
pub struct Upwind;

impl SchemeTraits for Upwind {
    const SCHEME_NAME: &'static str = "Upwind";

    fn face_value(left: f64, right: f64, u_face: f64) -> f64 {
        if u_face >= 0.0 {
            left
        } else {
            right
        }
    }
}

/// Second-order central interpolation.
#[derive(Clone, Copy, Debug, Default)]
pub struct Central;

impl SchemeTraits for Central {
    const SCHEME_NAME: &'static str = "Central";

    fn face_value(left: f64, right: f64, _u_face: f64) -> f64 {
        0.5 * (left + right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upwind_follows_flow_direction() {
        assert_eq!(Upwind::face_value(1.0, 2.0, 0.5), 1.0);
        assert_eq!(Upwind::face_value(1.0, 2.0, -0.5), 2.0);
    }

    #[test]
    fn central_averages() {
        assert_eq!(Central::face_value(1.0, 2.0, 9.0), 1.5);
    }
}
