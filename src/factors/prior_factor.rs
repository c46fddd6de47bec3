//! Prior on a vector-valued variable.

use super::{Factor, to_dvector};
use nalgebra::{DMatrix, DVector, Vector6};

/// Fixes a variable to a known value: `r = x - value`.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorFactor {
    value: DVector<f64>,
}

impl PriorFactor {
    pub fn new(value: DVector<f64>) -> Self {
        Self { value }
    }

    /// Prior on a joint coordinate or torque.
    pub fn scalar(value: f64) -> Self {
        Self::new(DVector::from_element(1, value))
    }

    /// Prior on a twist, acceleration or wrench.
    pub fn vector6(value: &Vector6<f64>) -> Self {
        Self::new(to_dvector(value))
    }

    pub fn value(&self) -> &DVector<f64> {
        &self.value
    }
}

impl Factor for PriorFactor {
    fn linearize(
        &self,
        params: &[DVector<f64>],
        compute_jacobian: bool,
    ) -> (DVector<f64>, Option<DMatrix<f64>>) {
        let residual = &params[0] - &self.value;
        let jacobian = compute_jacobian.then(|| DMatrix::identity(self.value.len(), self.value.len()));
        (residual, jacobian)
    }

    fn get_dimension(&self) -> usize {
        self.value.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::test_utils::assert_jacobian_matches;

    #[test]
    fn test_vector_prior() {
        let factor = PriorFactor::vector6(&Vector6::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0));
        let (residual, _) = factor.linearize(&[DVector::from_element(6, 1.0)], false);
        assert_eq!(residual.as_slice(), &[0.0, -1.0, -2.0, -3.0, -4.0, -5.0]);
        assert_jacobian_matches(&factor, &[DVector::from_element(6, 1.0)], 1e-6);
    }
}
