//! Twist composition factor across a joint.

use super::{Factor, scalar_param, to_dvector, vector6_param};
use crate::robot::Joint;
use nalgebra::{DMatrix, DVector, Matrix6};

/// Enforces `V_c = Ad(cTp(q)) V_p + S_c q̇`.
///
/// Parameters: `[V_p, V_c, q, q̇]`; residual 6, Jacobian 6×14.
#[derive(Debug, Clone)]
pub struct TwistFactor {
    joint: Joint,
}

impl TwistFactor {
    pub fn new(joint: Joint) -> Self {
        Self { joint }
    }
}

impl Factor for TwistFactor {
    fn linearize(
        &self,
        params: &[DVector<f64>],
        compute_jacobian: bool,
    ) -> (DVector<f64>, Option<DMatrix<f64>>) {
        let twist_p = vector6_param(&params[0]);
        let twist_c = vector6_param(&params[1]);
        let q = scalar_param(&params[2]);
        let q_dot = scalar_param(&params[3]);

        let (predicted, h) =
            self.joint
                .twist_to_with_jacobians(self.joint.child(), q, q_dot, &twist_p);
        let residual = twist_c - predicted;

        let jacobian = if compute_jacobian {
            let mut jacobian = DMatrix::<f64>::zeros(6, 14);
            jacobian
                .fixed_view_mut::<6, 6>(0, 0)
                .copy_from(&(-h.other_twist));
            jacobian
                .fixed_view_mut::<6, 6>(0, 6)
                .copy_from(&Matrix6::identity());
            jacobian.fixed_view_mut::<6, 1>(0, 12).copy_from(&(-h.q));
            jacobian
                .fixed_view_mut::<6, 1>(0, 13)
                .copy_from(&(-h.q_dot));
            Some(jacobian)
        } else {
            None
        };
        (to_dvector(&residual), jacobian)
    }

    fn get_dimension(&self) -> usize {
        6
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::test_utils::assert_jacobian_matches;
    use crate::manifold::se3::SE3;
    use crate::robot::{JointId, JointKind, JointParams, Link, LinkId};
    use nalgebra::{Matrix3, Vector3, Vector6};

    fn joint(kind: JointKind) -> Joint {
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
            SE3::from_translation_euler(0.3, 0.0, 3.0, 0.2, 0.0, 0.1),
        );
        Joint::new(
            JointId(0),
            "j1",
            SE3::from_translation_euler(0.0, 0.0, 2.0, 0.0, 0.0, 0.0),
            &parent,
            &child,
            JointParams::default(),
            kind,
        )
    }

    fn params(q: f64, q_dot: f64) -> Vec<DVector<f64>> {
        vec![
            DVector::from_column_slice(&[0.1, -0.2, 0.3, 1.0, 0.5, -0.7]),
            DVector::from_column_slice(&[0.4, 0.0, -0.1, 0.2, 0.8, 0.6]),
            DVector::from_element(1, q),
            DVector::from_element(1, q_dot),
        ]
    }

    #[test]
    fn test_residual_vanishes_at_composed_twist() {
        let joint = joint(JointKind::Revolute { axis: Vector3::x() });
        let factor = TwistFactor::new(joint.clone());
        let twist_p = Vector6::new(0.1, -0.2, 0.3, 1.0, 0.5, -0.7);
        let twist_c = joint.twist_to(LinkId(1), 0.4, 1.5, &twist_p);

        let (residual, _) = factor.linearize(
            &[
                to_dvector(&twist_p),
                to_dvector(&twist_c),
                DVector::from_element(1, 0.4),
                DVector::from_element(1, 1.5),
            ],
            false,
        );
        assert!(residual.norm() < 1e-9);
    }

    #[test]
    fn test_revolute_jacobian() {
        let factor = TwistFactor::new(joint(JointKind::Revolute {
            axis: Vector3::new(0.0, 0.0, 1.0),
        }));
        assert_jacobian_matches(&factor, &params(0.7, -1.2), 1e-5);
    }

    #[test]
    fn test_prismatic_jacobian() {
        let factor = TwistFactor::new(joint(JointKind::Prismatic {
            axis: Vector3::new(0.0, 1.0, 0.0),
        }));
        assert_jacobian_matches(&factor, &params(0.25, 0.9), 1e-5);
    }
}
