//! SE(3) - Special Euclidean Group in 3D
//!
//! SE(3) elements are represented as a combination of SO(3) rotation and
//! Vector3 translation. Tangent elements are spatial vectors `[ω(3), v(3)]`,
//! angular part first, matching the layout of twists and screw axes.
//!
//! Parameter vectors (as seen by factors) use `[tx, ty, tz, qw, qx, qy, qz]`.

use crate::manifold::so3::{SO3, SO3Tangent};
use crate::manifold::{LieGroup, Tangent};
use nalgebra::{
    DVector, Isometry3, Matrix3, Matrix4, Matrix6, Quaternion, Translation3, UnitQuaternion,
    Vector3, Vector6,
};
use std::fmt;

/// Angle below which the Q-block coefficients switch to series expansions.
const Q_BLOCK_SMALL_ANGLE: f64 = 1e-2;

/// SE(3) group element representing rigid body transformations in 3D.
#[derive(Clone, Debug, PartialEq)]
pub struct SE3 {
    /// Rotation part as SO(3) element
    rotation: SO3,
    /// Translation part as Vector3
    translation: Vector3<f64>,
}

impl fmt::Display for SE3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = self.translation();
        let q = self.rotation_quaternion();
        write!(
            f,
            "SE3(translation: [{:.4}, {:.4}, {:.4}], rotation: [w: {:.4}, x: {:.4}, y: {:.4}, z: {:.4}])",
            t.x, t.y, t.z, q.w, q.i, q.j, q.k
        )
    }
}

/// SE(3) tangent space element, a spatial vector `[ω_x, ω_y, ω_z, v_x, v_y, v_z]`.
#[derive(Clone, Debug, PartialEq)]
pub struct SE3Tangent {
    data: Vector6<f64>,
}

impl fmt::Display for SE3Tangent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let w = self.angular();
        let v = self.linear();
        write!(
            f,
            "se3(angular: [{:.4}, {:.4}, {:.4}], linear: [{:.4}, {:.4}, {:.4}])",
            w.x, w.y, w.z, v.x, v.y, v.z
        )
    }
}

impl SE3 {
    /// Create a new SE3 element from translation and rotation.
    pub fn new(translation: Vector3<f64>, rotation: UnitQuaternion<f64>) -> Self {
        SE3 {
            rotation: SO3::new(rotation),
            translation,
        }
    }

    /// Create SE3 from translation components and Euler angles.
    pub fn from_translation_euler(x: f64, y: f64, z: f64, roll: f64, pitch: f64, yaw: f64) -> Self {
        Self::new(
            Vector3::new(x, y, z),
            UnitQuaternion::from_euler_angles(roll, pitch, yaw),
        )
    }

    /// Create SE3 from SO3 and Vector3 components.
    pub fn from_translation_so3(translation: Vector3<f64>, rotation: SO3) -> Self {
        SE3 {
            rotation,
            translation,
        }
    }

    /// Pure translation.
    pub fn from_translation(translation: Vector3<f64>) -> Self {
        Self::from_translation_so3(translation, SO3::identity())
    }

    /// Create SE3 directly from an Isometry3.
    pub fn from_isometry(isometry: Isometry3<f64>) -> Self {
        SE3 {
            rotation: SO3::new(isometry.rotation),
            translation: isometry.translation.vector,
        }
    }

    /// Get the translation part as a Vector3.
    pub fn translation(&self) -> Vector3<f64> {
        self.translation
    }

    /// Get the rotation part as SO3.
    pub fn rotation_so3(&self) -> SO3 {
        self.rotation.clone()
    }

    /// Get the rotation part as a UnitQuaternion.
    pub fn rotation_quaternion(&self) -> UnitQuaternion<f64> {
        self.rotation.quaternion()
    }

    /// Get the rotation part as a 3×3 matrix.
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        self.rotation.rotation_matrix()
    }

    /// Get as an Isometry3.
    pub fn isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::from(self.translation),
            self.rotation_quaternion(),
        )
    }

    /// Get the 4×4 homogeneous transformation matrix.
    pub fn matrix(&self) -> Matrix4<f64> {
        self.isometry().to_homogeneous()
    }

    /// Apply the transformation to a point: R p + t.
    pub fn transform_point(&self, point: &Vector3<f64>) -> Vector3<f64> {
        self.rotation.act(point, None, None) + self.translation
    }

    /// Compare two poses through their homogeneous matrices.
    pub fn approx_eq(&self, other: &SE3, tolerance: f64) -> bool {
        (self.matrix() - other.matrix()).abs().max() < tolerance
    }
}

impl LieGroup for SE3 {
    type TangentVector = SE3Tangent;
    type JacobianMatrix = Matrix6<f64>;

    const DOF: usize = 6;
    const REP_SIZE: usize = 7;

    fn identity() -> Self {
        SE3 {
            rotation: SO3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// M⁻¹ = [ Rᵀ  -Rᵀt ; 0 1 ],  J_M⁻¹_M = -Ad(M)
    fn inverse(&self, jacobian: Option<&mut Self::JacobianMatrix>) -> Self {
        let rot_inv = self.rotation.inverse(None);
        let trans_inv = -rot_inv.act(&self.translation, None, None);

        if let Some(jac) = jacobian {
            *jac = -self.adjoint();
        }

        SE3::from_translation_so3(trans_inv, rot_inv)
    }

    /// M_a M_b = [ R_a R_b   R_a t_b + t_a ; 0 1 ]
    ///
    /// J_MaMb_Ma = Ad(M_b⁻¹),  J_MaMb_Mb = I
    fn compose(
        &self,
        other: &Self,
        jacobian_self: Option<&mut Self::JacobianMatrix>,
        jacobian_other: Option<&mut Self::JacobianMatrix>,
    ) -> Self {
        let composed_rotation = self.rotation.compose(&other.rotation, None, None);
        let composed_translation =
            self.rotation.act(&other.translation, None, None) + self.translation;

        if let Some(jac_self) = jacobian_self {
            *jac_self = other.inverse(None).adjoint();
        }
        if let Some(jac_other) = jacobian_other {
            *jac_other = Matrix6::identity();
        }

        SE3::from_translation_so3(composed_translation, composed_rotation)
    }

    /// τ = log(M) = [ Log(R) ; Jl⁻¹(ω) t ],  J_τ_M = Jr⁻¹(τ)
    fn log(&self, jacobian: Option<&mut Self::JacobianMatrix>) -> Self::TangentVector {
        let omega = self.rotation.log(None);
        let linear = omega.left_jacobian_inv() * self.translation;
        let result = SE3Tangent::new(omega.coeffs(), linear);

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
            *jac_self = exp_tangent.inverse(None).adjoint();
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

    /// M_a⁻¹ M_b,  J_Ma = -Ad(M_b⁻¹ M_a),  J_Mb = I
    fn between(
        &self,
        other: &Self,
        jacobian_self: Option<&mut Self::JacobianMatrix>,
        jacobian_other: Option<&mut Self::JacobianMatrix>,
    ) -> Self {
        let result = self.inverse(None).compose(other, None, None);

        if let Some(jac_self) = jacobian_self {
            *jac_self = -result.inverse(None).adjoint();
        }
        if let Some(jac_other) = jacobian_other {
            *jac_other = Matrix6::identity();
        }

        result
    }

    /// Ad(M) = [ R  0 ; [t]ₓR  R ]
    fn adjoint(&self) -> Self::JacobianMatrix {
        let rotation_matrix = self.rotation.rotation_matrix();
        let mut adjoint_matrix = Matrix6::zeros();

        adjoint_matrix
            .fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&rotation_matrix);
        adjoint_matrix
            .fixed_view_mut::<3, 3>(3, 3)
            .copy_from(&rotation_matrix);

        let bottom_left = SO3Tangent::new(self.translation).hat() * rotation_matrix;
        adjoint_matrix
            .fixed_view_mut::<3, 3>(3, 0)
            .copy_from(&bottom_left);

        adjoint_matrix
    }

    fn random() -> Self {
        use rand::Rng;
        let mut rng = rand::rng();

        let translation = Vector3::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        );

        SE3::from_translation_so3(translation, SO3::random())
    }

    fn is_valid(&self, tolerance: f64) -> bool {
        self.rotation.is_valid(tolerance)
    }
}

impl From<DVector<f64>> for SE3 {
    /// `[tx, ty, tz, qw, qx, qy, qz]`; the quaternion is normalized.
    fn from(data: DVector<f64>) -> Self {
        let translation = Vector3::new(data[0], data[1], data[2]);
        let rotation = UnitQuaternion::from_quaternion(Quaternion::new(
            data[3], data[4], data[5], data[6],
        ));
        SE3::new(translation, rotation)
    }
}

impl From<SE3> for DVector<f64> {
    fn from(pose: SE3) -> Self {
        let t = pose.translation();
        let q = pose.rotation_quaternion();
        DVector::from_vec(vec![t.x, t.y, t.z, q.w, q.i, q.j, q.k])
    }
}

impl From<SE3Tangent> for DVector<f64> {
    fn from(tangent: SE3Tangent) -> Self {
        DVector::from_column_slice(tangent.data.as_slice())
    }
}

impl From<DVector<f64>> for SE3Tangent {
    fn from(data: DVector<f64>) -> Self {
        SE3Tangent::from_vector6(Vector6::from_column_slice(data.as_slice()))
    }
}

impl SE3Tangent {
    /// Create a tangent vector from its angular and linear parts.
    pub fn new(angular: Vector3<f64>, linear: Vector3<f64>) -> Self {
        let mut data = Vector6::zeros();
        data.fixed_rows_mut::<3>(0).copy_from(&angular);
        data.fixed_rows_mut::<3>(3).copy_from(&linear);
        SE3Tangent { data }
    }

    /// Wrap a spatial vector `[ω, v]`.
    pub fn from_vector6(data: Vector6<f64>) -> Self {
        SE3Tangent { data }
    }

    /// The spatial vector `[ω, v]`.
    pub fn coeffs(&self) -> Vector6<f64> {
        self.data
    }

    /// Angular part ω.
    pub fn angular(&self) -> Vector3<f64> {
        self.data.fixed_rows::<3>(0).into_owned()
    }

    /// Linear part v.
    pub fn linear(&self) -> Vector3<f64> {
        self.data.fixed_rows::<3>(3).into_owned()
    }

    /// Hat operator: 4×4 Lie algebra matrix `[ [ω]ₓ v ; 0 0 ]`.
    pub fn hat(&self) -> Matrix4<f64> {
        let mut lie_alg = Matrix4::zeros();
        lie_alg
            .fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&SO3Tangent::new(self.angular()).hat());
        lie_alg
            .fixed_view_mut::<3, 1>(0, 3)
            .copy_from(&self.linear());
        lie_alg
    }

    /// Lie bracket operator ad(ξ) = `[ [ω]ₓ 0 ; [v]ₓ [ω]ₓ ]`, so that
    /// `ad(ξ) η = [ξ, η]`.
    pub fn ad(&self) -> Matrix6<f64> {
        let omega_hat = SO3Tangent::new(self.angular()).hat();
        let mut ad = Matrix6::zeros();
        ad.fixed_view_mut::<3, 3>(0, 0).copy_from(&omega_hat);
        ad.fixed_view_mut::<3, 3>(3, 3).copy_from(&omega_hat);
        ad.fixed_view_mut::<3, 3>(3, 0)
            .copy_from(&SO3Tangent::new(self.linear()).hat());
        ad
    }

    /// Coupling block Q(v, ω) of the SE(3) left Jacobian
    /// `Jl = [ Jl(ω) 0 ; Q(v, ω) Jl(ω) ]`:
    ///
    /// ```text
    /// Q = ½V + (θ - sin θ)/θ³ (WV + VW + WVW)
    ///   + (θ² + 2cos θ - 2)/(2θ⁴) (WWV + VWW - 3WVW)
    ///   + (2θ - 3sin θ + θcos θ)/(2θ⁵) (WVWW + WWVW)
    /// ```
    /// with W = [ω]ₓ and V = [v]ₓ.
    pub fn q_block_jacobian_matrix(linear: Vector3<f64>, angular: Vector3<f64>) -> Matrix3<f64> {
        let v = SO3Tangent::new(linear).hat();
        let w = SO3Tangent::new(angular).hat();
        let theta_squared = angular.norm_squared();
        let theta = theta_squared.sqrt();

        let (b, c, d) = if theta < Q_BLOCK_SMALL_ANGLE {
            (
                1.0 / 6.0 - theta_squared / 120.0,
                1.0 / 24.0 - theta_squared / 720.0,
                1.0 / 120.0 - theta_squared / 2520.0,
            )
        } else {
            let (sin_theta, cos_theta) = theta.sin_cos();
            let theta_4 = theta_squared * theta_squared;
            (
                (theta - sin_theta) / (theta_squared * theta),
                (theta_squared + 2.0 * cos_theta - 2.0) / (2.0 * theta_4),
                (2.0 * theta - 3.0 * sin_theta + theta * cos_theta) / (2.0 * theta_4 * theta),
            )
        };

        let wv = w * v;
        let vw = v * w;
        let wvw = wv * w;
        let ww = w * w;

        v * 0.5
            + (wv + vw + wvw) * b
            + (ww * v + vw * w - wvw * 3.0) * c
            + (wvw * w + ww * v * w) * d
    }

    fn block_jacobian(so3_block: Matrix3<f64>, coupling: Matrix3<f64>) -> Matrix6<f64> {
        let mut jac = Matrix6::zeros();
        jac.fixed_view_mut::<3, 3>(0, 0).copy_from(&so3_block);
        jac.fixed_view_mut::<3, 3>(3, 3).copy_from(&so3_block);
        jac.fixed_view_mut::<3, 3>(3, 0).copy_from(&coupling);
        jac
    }
}

impl Tangent<SE3> for SE3Tangent {
    /// exp([ω, v]) = [ Exp(ω)  Jl(ω) v ; 0 1 ],  J = Jr(τ)
    fn exp(&self, jacobian: Option<&mut Matrix6<f64>>) -> SE3 {
        let omega = SO3Tangent::new(self.angular());
        let rotation = omega.exp(None);
        let translation = omega.left_jacobian() * self.linear();

        if let Some(jac) = jacobian {
            *jac = self.right_jacobian();
        }

        SE3::from_translation_so3(translation, rotation)
    }

    /// Jr(τ) = Jl(-τ)
    fn right_jacobian(&self) -> Matrix6<f64> {
        let omega = SO3Tangent::new(self.angular());
        let q = SE3Tangent::q_block_jacobian_matrix(-self.linear(), -self.angular());
        SE3Tangent::block_jacobian(omega.right_jacobian(), q)
    }

    fn left_jacobian(&self) -> Matrix6<f64> {
        let omega = SO3Tangent::new(self.angular());
        let q = SE3Tangent::q_block_jacobian_matrix(self.linear(), self.angular());
        SE3Tangent::block_jacobian(omega.left_jacobian(), q)
    }

    fn right_jacobian_inv(&self) -> Matrix6<f64> {
        let a_inv = SO3Tangent::new(self.angular()).right_jacobian_inv();
        let q = SE3Tangent::q_block_jacobian_matrix(-self.linear(), -self.angular());
        SE3Tangent::block_jacobian(a_inv, -a_inv * q * a_inv)
    }

    fn left_jacobian_inv(&self) -> Matrix6<f64> {
        let a_inv = SO3Tangent::new(self.angular()).left_jacobian_inv();
        let q = SE3Tangent::q_block_jacobian_matrix(self.linear(), self.angular());
        SE3Tangent::block_jacobian(a_inv, -a_inv * q * a_inv)
    }

    fn zero() -> Self {
        SE3Tangent::from_vector6(Vector6::zeros())
    }

    fn is_zero(&self, tolerance: f64) -> bool {
        self.data.norm() < tolerance
    }
}
