//! Action-reaction between the two wrenches acting through a joint.

use super::{Factor, scalar_param, to_dvector, vector6_param};
use crate::robot::Joint;
use crate::spatial;
use nalgebra::{DMatrix, DVector, Matrix6};

/// Enforces `F_p + Ad(cTp(q))ᵀ F_c = 0`: the wrench the joint exerts on the
/// parent is the reaction of the one it exerts on the child, expressed in
/// the parent's COM frame.
///
/// Parameters: `[F_p, F_c, q]`; residual 6, Jacobian 6×13.
#[derive(Debug, Clone)]
pub struct WrenchEquivalenceFactor {
    joint: Joint,
}

impl WrenchEquivalenceFactor {
    pub fn new(joint: Joint) -> Self {
        Self { joint }
    }
}

impl Factor for WrenchEquivalenceFactor {
    fn linearize(
        &self,
        params: &[DVector<f64>],
        compute_jacobian: bool,
    ) -> (DVector<f64>, Option<DMatrix<f64>>) {
        let wrench_p = vector6_param(&params[0]);
        let wrench_c = vector6_param(&params[1]);
        let q = scalar_param(&params[2]);

        let child = self.joint.child();
        let c_ad_p = spatial::adjoint_map(&self.joint.transform_to(child, q));
        let residual = wrench_p + c_ad_p.transpose() * wrench_c;

        let jacobian = if compute_jacobian {
            let d_ad_dq = self.joint.adjoint_map_jacobian_joint_angle(child, q);
            let mut jacobian = DMatrix::<f64>::zeros(6, 13);
            jacobian
                .fixed_view_mut::<6, 6>(0, 0)
                .copy_from(&Matrix6::identity());
            jacobian
                .fixed_view_mut::<6, 6>(0, 6)
                .copy_from(&c_ad_p.transpose());
            jacobian
                .fixed_view_mut::<6, 1>(0, 12)
                .copy_from(&(d_ad_dq.transpose() * wrench_c));
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
            SE3::from_translation_euler(0.2, -0.1, 3.0, 0.4, 0.0, 0.0),
        );
        Joint::new(
            JointId(0),
            "j1",
            SE3::from_translation_euler(0.0, 0.0, 2.0, 0.0, 0.0, 0.0),
            &parent,
            &child,
            JointParams::default(),
            JointKind::Revolute {
                axis: Vector3::new(0.0, 0.0, 1.0),
            },
        )
    }

    #[test]
    fn test_reaction_wrench_has_zero_residual() {
        let joint = joint();
        let factor = WrenchEquivalenceFactor::new(joint.clone());
        let q = 0.9;
        let wrench_c = Vector6::new(0.1, 0.2, -0.3, 1.0, -2.0, 0.5);
        // wrench on the child expressed in the parent frame, negated
        let p_t_c = joint.transform_to(LinkId(0), q);
        let wrench_p = -spatial::transform_wrench(&p_t_c, &wrench_c);

        let (residual, _) = factor.linearize(
            &[
                to_dvector(&wrench_p),
                to_dvector(&wrench_c),
                DVector::from_element(1, q),
            ],
            false,
        );
        assert!(residual.norm() < 1e-9);
    }

    #[test]
    fn test_wrench_equivalence_jacobian() {
        let factor = WrenchEquivalenceFactor::new(joint());
        let params = [
            DVector::from_column_slice(&[0.3, 0.0, -1.0, 2.0, 0.5, 0.1]),
            DVector::from_column_slice(&[-0.2, 0.6, 0.4, 1.5, -0.7, 3.0]),
            DVector::from_element(1, -1.1),
        ];
        assert_jacobian_matches(&factor, &params, 1e-5);
    }
}
