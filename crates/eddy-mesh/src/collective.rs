//! Collective reductions across execution ranks.

/// Global reductions over every rank of a run.
///
/// Every rank must issue the same sequence of calls with the same
/// operations, or the run deadlocks. Callers in this workspace therefore
/// never branch on local data before a collective call.
pub trait Collective: Send + Sync {
    /// This rank's index.
    fn rank(&self) -> usize;

    /// Number of participating ranks.
    fn size(&self) -> usize;

    /// Sum of `local` over all ranks.
    fn sum(&self, local: f64) -> f64;

    /// Minimum of `local` over all ranks.
    fn min(&self, local: f64) -> f64;

    /// Maximum of `local` over all ranks.
    fn max(&self, local: f64) -> f64;

    /// Elementwise sum of `values` over all ranks, in place.
    ///
    /// Counts as one collective call; every rank must pass a slice of the
    /// same length. The default issues one [`sum`](Self::sum) per element.
    fn sum_all(&self, values: &mut [f64]) {
        for v in values.iter_mut() {
            *v = self.sum(*v);
        }
    }
}

/// The trivial single-rank collective.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SerialCollective;

impl Collective for SerialCollective {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn sum(&self, local: f64) -> f64 {
        local
    }

    fn min(&self, local: f64) -> f64 {
        local
    }

    fn max(&self, local: f64) -> f64 {
        local
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_is_identity() {
        let c = SerialCollective;
        assert_eq!((c.rank(), c.size()), (0, 1));
        assert_eq!(c.sum(2.5), 2.5);
        assert_eq!(c.min(-1.0), -1.0);
        assert_eq!(c.max(f64::MIN), f64::MIN);
    }

    #[test]
    fn serial_sum_all_keeps_values() {
        let mut v = [1.0, -2.0, 0.5];
        SerialCollective.sum_all(&mut v);
        assert_eq!(v, [1.0, -2.0, 0.5]);
    }
}
