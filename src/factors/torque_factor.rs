//! Torque transmission factor.

use super::{Factor, scalar_param, vector6_param};
use crate::robot::Joint;
use nalgebra::{DMatrix, DVector};

/// Enforces `τ = S_cᵀ F_c`, the projection of the child-side wrench onto
/// the joint's screw axis.
///
/// Parameters: `[F_c, τ]`; residual 1, Jacobian 1×7.
#[derive(Debug, Clone)]
pub struct TorqueFactor {
    joint: Joint,
}

impl TorqueFactor {
    pub fn new(joint: Joint) -> Self {
        Self { joint }
    }
}

impl Factor for TorqueFactor {
    fn linearize(
        &self,
        params: &[DVector<f64>],
        compute_jacobian: bool,
    ) -> (DVector<f64>, Option<DMatrix<f64>>) {
        let wrench = vector6_param(&params[0]);
        let torque = scalar_param(&params[1]);

        let (predicted, h_wrench) = self
            .joint
            .wrench_to_torque_with_jacobian(self.joint.child(), &wrench);
        let residual = DVector::from_element(1, predicted - torque);

        let jacobian = if compute_jacobian {
            let mut jacobian = DMatrix::<f64>::zeros(1, 7);
            jacobian.fixed_view_mut::<1, 6>(0, 0).copy_from(&h_wrench);
            jacobian[(0, 6)] = -1.0;
            Some(jacobian)
        } else {
            None
        };
        (residual, jacobian)
    }

    fn get_dimension(&self) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::test_utils::assert_jacobian_matches;
    use crate::manifold::se3::SE3;
    use crate::robot::{JointId, JointKind, JointParams, Link, LinkId};
    use nalgebra::{Matrix3, Vector3};

    fn joint() -> Joint {
        let parent = Link::new(
            LinkId(0),
            "l1",
            1.0,
            Matrix3::identity(),
            SE3::from_translation_euler(0.0, 0.0, 1.0, 0.0, 0.0, 0.0),
        );
        let child = Link::new(
            LinkId(1),
            "l2",
            1.0,
            Matrix3::identity(),
            SE3::from_translation_euler(0.0, 0.0, 3.0, 0.0, 0.0, 0.0),
        );
        Joint::new(
            JointId(0),
            "j1",
            SE3::from_translation_euler(0.0, 0.0, 2.0, 0.0, 0.0, 0.0),
            &parent,
            &child,
            JointParams::default(),
            JointKind::Revolute { axis: Vector3::x() },
        )
    }

    #[test]
    fn test_torque_residual() {
        // child screw axis [1, 0, 0, 0, -1, 0]
        let factor = TorqueFactor::new(joint());
        let wrench = DVector::from_column_slice(&[2.0, 5.0, 5.0, 0.0, 3.0, 0.0]);
        let (residual, _) = factor.linearize(&[wrench, DVector::from_element(1, -1.0)], false);
        assert!(residual[0].abs() < 1e-12);
    }

    #[test]
    fn test_torque_jacobian() {
        let factor = TorqueFactor::new(joint());
        let params = [
            DVector::from_column_slice(&[0.5, -1.0, 2.0, 0.3, 0.7, -0.2]),
            DVector::from_element(1, 0.4),
        ];
        assert_jacobian_matches(&factor, &params, 1e-6);
    }
}
