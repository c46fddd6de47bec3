//! Planar-motion restriction on a joint wrench.

use super::{Factor, vector6_param};
use nalgebra::{DMatrix, DVector, SMatrix};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normal of the plane a planar mechanism moves in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanarAxis {
    X,
    Y,
    Z,
}

impl PlanarAxis {
    /// Wrench components that must vanish for motion in the plane normal to
    /// this axis: the two out-of-plane moments and the normal force.
    pub fn constrained_components(&self) -> [usize; 3] {
        match self {
            PlanarAxis::X => [1, 2, 3],
            PlanarAxis::Y => [0, 2, 4],
            PlanarAxis::Z => [0, 1, 5],
        }
    }

    fn selection_matrix(&self) -> SMatrix<f64, 3, 6> {
        let mut selection = SMatrix::<f64, 3, 6>::zeros();
        for (row, col) in self.constrained_components().into_iter().enumerate() {
            selection[(row, col)] = 1.0;
        }
        selection
    }
}

impl fmt::Display for PlanarAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanarAxis::X => write!(f, "x"),
            PlanarAxis::Y => write!(f, "y"),
            PlanarAxis::Z => write!(f, "z"),
        }
    }
}

/// Enforces `P F_c = 0` where `P` selects the out-of-plane wrench components.
///
/// Parameters: `[F_c]`; residual 3, Jacobian 3×6.
#[derive(Debug, Clone)]
pub struct WrenchPlanarFactor {
    selection: SMatrix<f64, 3, 6>,
}

impl WrenchPlanarFactor {
    pub fn new(axis: PlanarAxis) -> Self {
        Self {
            selection: axis.selection_matrix(),
        }
    }

    pub fn selection(&self) -> &SMatrix<f64, 3, 6> {
        &self.selection
    }
}

impl Factor for WrenchPlanarFactor {
    fn linearize(
        &self,
        params: &[DVector<f64>],
        compute_jacobian: bool,
    ) -> (DVector<f64>, Option<DMatrix<f64>>) {
        let wrench = vector6_param(&params[0]);
        let residual = self.selection * wrench;

        let jacobian = if compute_jacobian {
            let mut jacobian = DMatrix::<f64>::zeros(3, 6);
            jacobian
                .fixed_view_mut::<3, 6>(0, 0)
                .copy_from(&self.selection);
            Some(jacobian)
        } else {
            None
        };
        (DVector::from_column_slice(residual.as_slice()), jacobian)
    }

    fn get_dimension(&self) -> usize {
        3
    }
}
