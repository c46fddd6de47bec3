//! Residual factors for joint kinodynamics.
//!
//! Every factor maps the parameter vectors of its keys to a residual and,
//! on request, the Jacobian with respect to right (tangent-space)
//! perturbations of each parameter, columns concatenated in key order.
//!
//! Parameter layouts:
//! - poses: `[tx, ty, tz, qw, qx, qy, qz]` (tangent dimension 6)
//! - twists, accelerations, wrenches: the 6-vector itself
//! - joint coordinates and torques: a 1-vector
//!
//! # Module Structure
//!
//! - `pose_factor`: loop closure between two link poses through a joint
//! - `twist_factor`, `twist_accel_factor`: velocity and acceleration composition
//! - `torque_factor`, `wrench_equivalence_factor`, `wrench_planar_factor`: wrench transmission
//! - `joint_limit_factor`: hinge penalty on a scalar joint quantity
//! - `prior_factor`: fixes a scalar or vector variable

use nalgebra::{DMatrix, DVector, Vector6};
use std::fmt;

pub mod joint_limit_factor;
pub mod pose_factor;
pub mod prior_factor;
pub mod torque_factor;
pub mod twist_accel_factor;
pub mod twist_factor;
pub mod wrench_equivalence_factor;
pub mod wrench_planar_factor;

pub use joint_limit_factor::JointLimitFactor;
pub use pose_factor::PoseFactor;
pub use prior_factor::PriorFactor;
pub use torque_factor::TorqueFactor;
pub use twist_accel_factor::TwistAccelFactor;
pub use twist_factor::TwistFactor;
pub use wrench_equivalence_factor::WrenchEquivalenceFactor;
pub use wrench_planar_factor::{PlanarAxis, WrenchPlanarFactor};

/// Residual function with analytic Jacobians.
pub trait Factor: fmt::Debug + Send + Sync {
    /// Compute the residual and, if `compute_jacobian` is set, its Jacobian
    /// with respect to all parameters.
    fn linearize(
        &self,
        params: &[DVector<f64>],
        compute_jacobian: bool,
    ) -> (DVector<f64>, Option<DMatrix<f64>>);

    /// Residual dimension.
    fn get_dimension(&self) -> usize;
}

fn scalar_param(param: &DVector<f64>) -> f64 {
    param[0]
}

fn vector6_param(param: &DVector<f64>) -> Vector6<f64> {
    Vector6::from_column_slice(param.as_slice())
}

fn to_dvector(vector: &Vector6<f64>) -> DVector<f64> {
    DVector::from_column_slice(vector.as_slice())
}
