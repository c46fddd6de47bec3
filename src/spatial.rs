//! Spatial vector algebra on top of SE(3).
//!
//! Twists, twist accelerations, screw axes and wrenches are all plain
//! `Vector6<f64>` values laid out angular part first. The frame a spatial
//! vector is expressed in is implicit in the call that produced it.

use crate::manifold::se3::{SE3, SE3Tangent};
use crate::manifold::{LieGroup, Tangent};
use nalgebra::{Matrix6, Vector3, Vector6};

/// Spatial velocity `[ω, v]`.
pub type Twist = Vector6<f64>;

/// Spatial acceleration, same layout as [`Twist`].
pub type TwistAccel = Vector6<f64>;

/// Spatial force `[m, f]`, dual to [`Twist`].
pub type Wrench = Vector6<f64>;

/// Unit motion direction of a joint expressed in a link frame.
pub type ScrewAxis = Vector6<f64>;

/// Build a spatial vector from its angular and linear parts.
pub fn spatial_vector(angular: Vector3<f64>, linear: Vector3<f64>) -> Vector6<f64> {
    SE3Tangent::new(angular, linear).coeffs()
}

/// Exponential of a scaled screw axis, `exp(S q)`.
pub fn screw_exp(axis: &ScrewAxis, q: f64) -> SE3 {
    SE3Tangent::from_vector6(axis * q).exp(None)
}

/// `exp(S q)` together with its right Jacobian with respect to `q`.
///
/// `Jr(S q) S` collapses to `S` because `ad(S) S = 0`, so the derivative
/// along a fixed screw direction is the axis itself.
pub fn screw_exp_with_jacobian(axis: &ScrewAxis, q: f64) -> (SE3, Vector6<f64>) {
    (screw_exp(axis, q), *axis)
}

/// Adjoint map Ad(T), sending a twist expressed in the frame of `T`'s
/// target to the frame of its source.
pub fn adjoint_map(pose: &SE3) -> Matrix6<f64> {
    pose.adjoint()
}

/// Spatial cross product operator ad(V), so that `ad(V) W = [V, W]`.
pub fn spatial_cross(twist: &Twist) -> Matrix6<f64> {
    SE3Tangent::from_vector6(*twist).ad()
}

/// Derivative of `Ad(exp(-S q) T₀)` with respect to `q`, given the already
/// evaluated `T(q)`:
///
/// ```text
/// dAd(T(q))/dq = -ad(S) Ad(T(q))
/// ```
pub fn adjoint_map_jacobian_q(screw_axis: &ScrewAxis, pose_at_q: &SE3) -> Matrix6<f64> {
    -spatial_cross(screw_axis) * pose_at_q.adjoint()
}

/// Re-express a wrench given in frame `b` in frame `a`, with `a_t_b` the pose
/// of `b` in `a`: `F_a = Ad(a_t_b)⁻ᵀ F_b`.
pub fn transform_wrench(a_t_b: &SE3, wrench_b: &Wrench) -> Wrench {
    a_t_b.inverse(None).adjoint().transpose() * wrench_b
}
