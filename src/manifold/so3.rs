//! SO3 - Special Orthogonal Group in 3D
//!
//! SO(3) elements are represented using nalgebra's UnitQuaternion internally.
//! SO(3) tangent elements are axis-angle vectors in R³, where the direction
//! gives the axis of rotation and the magnitude gives the angle.
//!
//! # Numerical Conditioning
//!
//! The Jacobian coefficients `(1 - cos θ)/θ²`, `(θ - sin θ)/θ³` and
//! `1/θ² - (1 + cos θ)/(2θ sin θ)` are indeterminate at θ = 0. Below
//! [`SMALL_ANGLE`] their Taylor expansions are used instead. The inverse
//! Jacobians are singular at θ = π.

use crate::manifold::{LieGroup, Tangent};
use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};
use std::fmt;

/// Angle below which series expansions replace the closed-form coefficients.
pub const SMALL_ANGLE: f64 = 1e-4;

/// SO(3) group element representing rotations in 3D.
#[derive(Clone, Debug, PartialEq)]
pub struct SO3 {
    /// Internal representation as a unit quaternion
    quaternion: UnitQuaternion<f64>,
}

impl fmt::Display for SO3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let q = self.quaternion.quaternion();
        write!(
            f,
            "SO3(quaternion: [w: {:.4}, x: {:.4}, y: {:.4}, z: {:.4}])",
            q.w, q.i, q.j, q.k
        )
    }
}

/// SO(3) tangent space element (axis-angle vector).
#[derive(Clone, Debug, PartialEq)]
pub struct SO3Tangent {
    data: Vector3<f64>,
}

impl SO3 {
    /// Create a new SO(3) element from a unit quaternion.
    #[inline]
    pub fn new(quaternion: UnitQuaternion<f64>) -> Self {
        SO3 { quaternion }
    }

    /// Create SO(3) from roll/pitch/yaw.
    pub fn from_euler_angles(roll: f64, pitch: f64, yaw: f64) -> Self {
        SO3::new(UnitQuaternion::from_euler_angles(roll, pitch, yaw))
    }

    /// Rotation of `angle` radians about the x axis.
    pub fn rx(angle: f64) -> Self {
        SO3::new(UnitQuaternion::from_axis_angle(&Vector3::x_axis(), angle))
    }

    /// Rotation of `angle` radians about the y axis.
    pub fn ry(angle: f64) -> Self {
        SO3::new(UnitQuaternion::from_axis_angle(&Vector3::y_axis(), angle))
    }

    /// Rotation of `angle` radians about the z axis.
    pub fn rz(angle: f64) -> Self {
        SO3::new(UnitQuaternion::from_axis_angle(&Vector3::z_axis(), angle))
    }

    /// Create SO(3) from a rotation matrix (assumed orthonormal).
    pub fn from_matrix(matrix: &Matrix3<f64>) -> Self {
        let rotation = Rotation3::from_matrix_unchecked(*matrix);
        SO3::new(UnitQuaternion::from_rotation_matrix(&rotation))
    }

    /// Get the underlying unit quaternion.
    pub fn quaternion(&self) -> UnitQuaternion<f64> {
        self.quaternion
    }

    /// Get the 3×3 rotation matrix.
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        self.quaternion.to_rotation_matrix().into_inner()
    }

    /// Rotate a vector: R v.
    ///
    /// # Arguments
    /// * `jacobian_self` - Optional Jacobian ∂(R v)/∂R = -R [v]ₓ
    /// * `jacobian_vector` - Optional Jacobian ∂(R v)/∂v = R
    pub fn act(
        &self,
        vector: &Vector3<f64>,
        jacobian_self: Option<&mut Matrix3<f64>>,
        jacobian_vector: Option<&mut Matrix3<f64>>,
    ) -> Vector3<f64> {
        let result = self.quaternion * vector;

        if let Some(jac_self) = jacobian_self {
            *jac_self = -self.rotation_matrix() * SO3Tangent::new(*vector).hat();
        }
        if let Some(jac_vector) = jacobian_vector {
            *jac_vector = self.rotation_matrix();
        }

        result
    }
}

impl LieGroup for SO3 {
    type TangentVector = SO3Tangent;
    type JacobianMatrix = Matrix3<f64>;

    const DOF: usize = 3;
    const REP_SIZE: usize = 4;

    fn identity() -> Self {
        SO3 {
            quaternion: UnitQuaternion::identity(),
        }
    }

    /// J_R⁻¹_R = -R
    fn inverse(&self, jacobian: Option<&mut Self::JacobianMatrix>) -> Self {
        if let Some(jac) = jacobian {
            *jac = -self.rotation_matrix();
        }
        SO3::new(self.quaternion.inverse())
    }

    /// J_RaRb_Ra = Rbᵀ, J_RaRb_Rb = I
    fn compose(
        &self,
        other: &Self,
        jacobian_self: Option<&mut Self::JacobianMatrix>,
        jacobian_other: Option<&mut Self::JacobianMatrix>,
    ) -> Self {
        if let Some(jac_self) = jacobian_self {
            *jac_self = other.rotation_matrix().transpose();
        }
        if let Some(jac_other) = jacobian_other {
            *jac_other = Matrix3::identity();
        }
        SO3::new(self.quaternion * other.quaternion)
    }

    /// J_log_R = Jr⁻¹(θ)
    fn log(&self, jacobian: Option<&mut Self::JacobianMatrix>) -> Self::TangentVector {
        let result = SO3Tangent::new(self.quaternion.scaled_axis());
        if let Some(jac) = jacobian {
            *jac = result.right_jacobian_inv();
        }
        result
    }

    fn right_plus(
        &self,
        tangent: &Self::TangentVector,
        jacobian_self: Option<&mut Self::JacobianMatrix>,
        jacobian_tangent: Option<&mut Self::JacobianMatrix>,
    ) -> Self {
        let exp_tangent = tangent.exp(None);
        if let Some(jac_self) = jacobian_self {
            *jac_self = exp_tangent.rotation_matrix().transpose();
        }
        if let Some(jac_tangent) = jacobian_tangent {
            *jac_tangent = tangent.right_jacobian();
        }
        self.compose(&exp_tangent, None, None)
    }

    fn right_minus(
        &self,
        other: &Self,
        jacobian_self: Option<&mut Self::JacobianMatrix>,
        jacobian_other: Option<&mut Self::JacobianMatrix>,
    ) -> Self::TangentVector {
        let result = other.between(self, None, None).log(None);
        if let Some(jac_self) = jacobian_self {
            *jac_self = result.right_jacobian_inv();
        }
        if let Some(jac_other) = jacobian_other {
            *jac_other = -result.left_jacobian_inv();
        }
        result
    }

    fn between(
        &self,
        other: &Self,
        jacobian_self: Option<&mut Self::JacobianMatrix>,
        jacobian_other: Option<&mut Self::JacobianMatrix>,
    ) -> Self {
        let result = self.inverse(None).compose(other, None, None);
        if let Some(jac_self) = jacobian_self {
            *jac_self = -result.rotation_matrix().transpose();
        }
        if let Some(jac_other) = jacobian_other {
            *jac_other = Matrix3::identity();
        }
        result
    }

    fn adjoint(&self) -> Self::JacobianMatrix {
        self.rotation_matrix()
    }

    fn random() -> Self {
        use rand::Rng;
        let mut rng = rand::rng();
        let axis_angle = Vector3::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        );
        SO3::new(UnitQuaternion::from_scaled_axis(axis_angle))
    }

    fn is_valid(&self, tolerance: f64) -> bool {
        (self.quaternion.quaternion().norm() - 1.0).abs() < tolerance
    }
}

impl SO3Tangent {
    /// Create a tangent vector from an axis-angle vector.
    pub fn new(data: Vector3<f64>) -> Self {
        SO3Tangent { data }
    }

    /// Get the axis-angle coefficients.
    pub fn coeffs(&self) -> Vector3<f64> {
        self.data
    }

    /// Rotation angle |ω|.
    pub fn angle(&self) -> f64 {
        self.data.norm()
    }

    /// Hat operator: the skew-symmetric matrix [ω]ₓ with [ω]ₓ v = ω × v.
    pub fn hat(&self) -> Matrix3<f64> {
        let w = &self.data;
        Matrix3::new(0.0, -w.z, w.y, w.z, 0.0, -w.x, -w.y, w.x, 0.0)
    }

    /// Coefficients (a, b) of Jl = I + a [ω]ₓ + b [ω]ₓ².
    fn jacobian_coefficients(&self) -> (f64, f64) {
        let theta_squared = self.data.norm_squared();
        let theta = theta_squared.sqrt();
        if theta < SMALL_ANGLE {
            (
                0.5 - theta_squared / 24.0,
                1.0 / 6.0 - theta_squared / 120.0,
            )
        } else {
            (
                (1.0 - theta.cos()) / theta_squared,
                (theta - theta.sin()) / (theta_squared * theta),
            )
        }
    }

    /// Coefficient c of Jl⁻¹ = I - ½[ω]ₓ + c [ω]ₓ².
    fn inverse_jacobian_coefficient(&self) -> f64 {
        let theta_squared = self.data.norm_squared();
        let theta = theta_squared.sqrt();
        if theta < SMALL_ANGLE {
            1.0 / 12.0 + theta_squared / 720.0
        } else {
            1.0 / theta_squared - (1.0 + theta.cos()) / (2.0 * theta * theta.sin())
        }
    }
}

impl Tangent<SO3> for SO3Tangent {
    fn exp(&self, jacobian: Option<&mut Matrix3<f64>>) -> SO3 {
        if let Some(jac) = jacobian {
            *jac = self.right_jacobian();
        }
        SO3::new(UnitQuaternion::from_scaled_axis(self.data))
    }

    fn right_jacobian(&self) -> Matrix3<f64> {
        let (a, b) = self.jacobian_coefficients();
        let w = self.hat();
        Matrix3::identity() - w * a + w * w * b
    }

    fn left_jacobian(&self) -> Matrix3<f64> {
        let (a, b) = self.jacobian_coefficients();
        let w = self.hat();
        Matrix3::identity() + w * a + w * w * b
    }

    fn right_jacobian_inv(&self) -> Matrix3<f64> {
        let c = self.inverse_jacobian_coefficient();
        let w = self.hat();
        Matrix3::identity() + w * 0.5 + w * w * c
    }

    fn left_jacobian_inv(&self) -> Matrix3<f64> {
        let c = self.inverse_jacobian_coefficient();
        let w = self.hat();
        Matrix3::identity() - w * 0.5 + w * w * c
    }

    fn zero() -> Self {
        SO3Tangent::new(Vector3::zeros())
    }

    fn is_zero(&self, tolerance: f64) -> bool {
        self.data.norm() < tolerance
    }
}
