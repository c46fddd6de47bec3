//! Pose loop-closure factor across a joint.

use super::{Factor, scalar_param};
use crate::manifold::LieGroup;
use crate::manifold::se3::SE3;
use crate::robot::Joint;
use nalgebra::{DMatrix, DVector, Matrix6};

/// Enforces `wTc = wTp · pMc(q)` for the parent pose `wTp`, child pose
/// `wTc` and joint coordinate `q`.
///
/// # Mathematical Formulation
///
/// ```text
/// r = log(wTc⁻¹ · wTp · pMc(q))
/// ```
///
/// Parameters: `[wTp, wTc, q]`; residual 6, Jacobian 6×13.
#[derive(Debug, Clone)]
pub struct PoseFactor {
    joint: Joint,
}

impl PoseFactor {
    pub fn new(joint: Joint) -> Self {
        Self { joint }
    }
}

impl Factor for PoseFactor {
    fn linearize(
        &self,
        params: &[DVector<f64>],
        compute_jacobian: bool,
    ) -> (DVector<f64>, Option<DMatrix<f64>>) {
        let w_t_p = SE3::from(params[0].clone());
        let w_t_c = SE3::from(params[1].clone());
        let q = scalar_param(&params[2]);

        // Step 1: pMc(q)
        let (p_m_c, p_m_c_h_q) = self
            .joint
            .transform_to_with_jacobian(self.joint.parent(), q);

        // Step 2: wTp * pMc
        let mut j_pred_wrt_w_t_p = Matrix6::zeros();
        let mut j_pred_wrt_p_m_c = Matrix6::zeros();
        let w_t_c_pred = w_t_p.compose(
            &p_m_c,
            Some(&mut j_pred_wrt_w_t_p),
            Some(&mut j_pred_wrt_p_m_c),
        );

        // Step 3: wTc⁻¹ * predicted
        let mut j_diff_wrt_w_t_c = Matrix6::zeros();
        let mut j_diff_wrt_pred = Matrix6::zeros();
        let diff = w_t_c.between(
            &w_t_c_pred,
            Some(&mut j_diff_wrt_w_t_c),
            Some(&mut j_diff_wrt_pred),
        );

        // Step 4: log
        let mut j_log_wrt_diff = Matrix6::zeros();
        let residual = diff.log(Some(&mut j_log_wrt_diff));

        let jacobian = if compute_jacobian {
            let j_log_wrt_pred = j_log_wrt_diff * j_diff_wrt_pred;
            let jacobian_wrt_w_t_p = j_log_wrt_pred * j_pred_wrt_w_t_p;
            let jacobian_wrt_w_t_c = j_log_wrt_diff * j_diff_wrt_w_t_c;
            let jacobian_wrt_q = j_log_wrt_pred * j_pred_wrt_p_m_c * p_m_c_h_q;

            let mut jacobian = DMatrix::<f64>::zeros(6, 13);
            jacobian
                .fixed_view_mut::<6, 6>(0, 0)
                .copy_from(&jacobian_wrt_w_t_p);
            jacobian
                .fixed_view_mut::<6, 6>(0, 6)
                .copy_from(&jacobian_wrt_w_t_c);
            jacobian
                .fixed_view_mut::<6, 1>(0, 12)
                .copy_from(&jacobian_wrt_q);
            Some(jacobian)
        } else {
            None
        };
        (residual.into(), jacobian)
    }

    fn get_dimension(&self) -> usize {
        6
    }
}
