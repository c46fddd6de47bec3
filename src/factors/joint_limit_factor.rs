//! Hinge penalty keeping a scalar joint quantity inside its limits.

use super::{Factor, scalar_param};
use crate::robot::ScalarLimit;
use nalgebra::{DMatrix, DVector};

/// One-sided penalty on a joint angle, velocity, acceleration or torque.
///
/// With `lo = lower + threshold` and `hi = upper - threshold`:
///
/// ```text
///        ⎧ lo - x   if x < lo
/// r(x) = ⎨ x - hi   if x > hi
///        ⎩ 0        otherwise
/// ```
///
/// Parameters: `[x]`; residual 1, Jacobian 1×1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointLimitFactor {
    lower: f64,
    upper: f64,
}

impl JointLimitFactor {
    pub fn new(limit: &ScalarLimit) -> Self {
        Self {
            lower: limit.lower + limit.threshold,
            upper: limit.upper - limit.threshold,
        }
    }

    /// Effective lower bound after applying the threshold.
    pub fn lower(&self) -> f64 {
        self.lower
    }

    /// Effective upper bound after applying the threshold.
    pub fn upper(&self) -> f64 {
        self.upper
    }
}

impl Factor for JointLimitFactor {
    fn linearize(
        &self,
        params: &[DVector<f64>],
        compute_jacobian: bool,
    ) -> (DVector<f64>, Option<DMatrix<f64>>) {
        let x = scalar_param(&params[0]);
        let (residual, derivative) = if x < self.lower {
            (self.lower - x, -1.0)
        } else if x > self.upper {
            (x - self.upper, 1.0)
        } else {
            (0.0, 0.0)
        };

        let jacobian = compute_jacobian.then(|| DMatrix::from_element(1, 1, derivative));
        (DVector::from_element(1, residual), jacobian)
    }

    fn get_dimension(&self) -> usize {
        1
    }
}
