//! Twist acceleration composition factor across a joint.

use super::{Factor, scalar_param, to_dvector, vector6_param};
use crate::robot::Joint;
use nalgebra::{DMatrix, DVector, Matrix6};

/// Enforces
///
/// ```text
/// A_c = Ad(cTp(q)) A_p + ad(V_c) S_c q̇ + S_c q̈
/// ```
///
/// Parameters: `[V_c, A_p, A_c, q, q̇, q̈]`; residual 6, Jacobian 6×21.
#[derive(Debug, Clone)]
pub struct TwistAccelFactor {
    joint: Joint,
}

impl TwistAccelFactor {
    pub fn new(joint: Joint) -> Self {
        Self { joint }
    }
}

impl Factor for TwistAccelFactor {
    fn linearize(
        &self,
        params: &[DVector<f64>],
        compute_jacobian: bool,
    ) -> (DVector<f64>, Option<DMatrix<f64>>) {
        let twist_c = vector6_param(&params[0]);
        let twist_accel_p = vector6_param(&params[1]);
        let twist_accel_c = vector6_param(&params[2]);
        let q = scalar_param(&params[3]);
        let q_dot = scalar_param(&params[4]);
        let q_ddot = scalar_param(&params[5]);

        let (predicted, h) = self.joint.twist_accel_to_with_jacobians(
            self.joint.child(),
            q,
            q_dot,
            q_ddot,
            &twist_c,
            &twist_accel_p,
        );
        let residual = twist_accel_c - predicted;

        let jacobian = if compute_jacobian {
            let mut jacobian = DMatrix::<f64>::zeros(6, 21);
            jacobian
                .fixed_view_mut::<6, 6>(0, 0)
                .copy_from(&(-h.this_twist));
            jacobian
                .fixed_view_mut::<6, 6>(0, 6)
                .copy_from(&(-h.other_twist_accel));
            jacobian
                .fixed_view_mut::<6, 6>(0, 12)
                .copy_from(&Matrix6::identity());
            jacobian.fixed_view_mut::<6, 1>(0, 18).copy_from(&(-h.q));
            jacobian
                .fixed_view_mut::<6, 1>(0, 19)
                .copy_from(&(-h.q_dot));
            jacobian
                .fixed_view_mut::<6, 1>(0, 20)
                .copy_from(&(-h.q_ddot));
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
