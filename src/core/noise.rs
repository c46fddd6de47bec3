//! Noise models used to whiten residuals.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Per-row weight of hard (zero-tolerance) relations in the nonlinear cost.
///
/// [`eliminate_sequential`](crate::linalg::eliminate_sequential) never
/// applies it and satisfies hard rows exactly.
pub const HARD_CONSTRAINT_WEIGHT: f64 = 1e6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NoiseModel {
    /// Already whitened, weight 1
    Unit { dim: usize },
    /// Same sigma on every row
    Isotropic { dim: usize, sigma: f64 },
    /// One sigma per row
    Diagonal { sigmas: DVector<f64> },
    /// Kinematic identity; exact under elimination, [`HARD_CONSTRAINT_WEIGHT`] in the cost
    Constrained { dim: usize },
}

impl NoiseModel {
    pub fn unit(dim: usize) -> Self {
        NoiseModel::Unit { dim }
    }

    pub fn isotropic(dim: usize, sigma: f64) -> Self {
        NoiseModel::Isotropic { dim, sigma }
    }

    pub fn diagonal(sigmas: &[f64]) -> Self {
        NoiseModel::Diagonal {
            sigmas: DVector::from_column_slice(sigmas),
        }
    }

    pub fn constrained(dim: usize) -> Self {
        NoiseModel::Constrained { dim }
    }

    pub fn dim(&self) -> usize {
        match self {
            NoiseModel::Unit { dim }
            | NoiseModel::Isotropic { dim, .. }
            | NoiseModel::Constrained { dim } => *dim,
            NoiseModel::Diagonal { sigmas } => sigmas.len(),
        }
    }

    pub fn is_hard(&self) -> bool {
        matches!(self, NoiseModel::Constrained { .. })
    }

    /// Row weights `1/σ`.
    pub fn weights(&self) -> DVector<f64> {
        match self {
            NoiseModel::Unit { dim } => DVector::from_element(*dim, 1.0),
            NoiseModel::Isotropic { dim, sigma } => DVector::from_element(*dim, 1.0 / sigma),
            NoiseModel::Diagonal { sigmas } => sigmas.map(|sigma| 1.0 / sigma),
            NoiseModel::Constrained { dim } => {
                DVector::from_element(*dim, HARD_CONSTRAINT_WEIGHT)
            }
        }
    }

    pub fn whiten(&self, residual: &DVector<f64>) -> DVector<f64> {
        residual.component_mul(&self.weights())
    }

    /// Scale each Jacobian row by its weight.
    pub fn whiten_jacobian(&self, jacobian: &DMatrix<f64>) -> DMatrix<f64> {
        DMatrix::from_diagonal(&self.weights()) * jacobian
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whiten_isotropic() {
        let noise = NoiseModel::isotropic(2, 0.5);
        let whitened = noise.whiten(&DVector::from_vec(vec![1.0, -2.0]));
        assert_eq!(whitened, DVector::from_vec(vec![2.0, -4.0]));
        assert!(!noise.is_hard());
    }

    #[test]
    fn test_whiten_jacobian_diagonal() {
        let noise = NoiseModel::diagonal(&[1.0, 0.1]);
        let jacobian = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let whitened = noise.whiten_jacobian(&jacobian);
        assert!((whitened - DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 30.0, 40.0])).norm() < 1e-12);
    }

    #[test]
    fn test_constrained_is_hard() {
        let noise = NoiseModel::constrained(6);
        assert!(noise.is_hard());
        assert_eq!(noise.dim(), 6);
        assert_eq!(noise.weights()[0], HARD_CONSTRAINT_WEIGHT);
    }
}
