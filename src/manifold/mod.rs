//! Lie group representations used by the joint kinematics.
//!
//! - **SE(3)**: Special Euclidean group (rigid body transformations)
//! - **SO(3)**: Special Orthogonal group (rotations)
//!
//! Lie group M,° | size   | dim | X ∈ M              | Constraint | T_X M         | Exp(T)        | Comp. | Action
//! ------------- | ------ | --- | ------------------ | ---------- | ------------- | ------------- | ----- | ------
//! Rotation      | SO(3),.| 3   | R                  | RᵀR = I    | [ω] ∈ R³      | R = exp([ω]x) | R₁R₂  | Rx
//! Rigid motion  | SE(3),.| 6   | M = [R t; 0 1]     | RᵀR = I    | [ω, v] ∈ R⁶   | Exp([ω, v]^)  | M₁M₂  | Rx+t
//!
//! Tangent vectors of SE(3) are spatial vectors ordered **angular first**:
//! `[ω_x, ω_y, ω_z, v_x, v_y, v_z]`. Twists, twist accelerations, screw axes
//! and (dually) wrenches `[m_x, m_y, m_z, f_x, f_y, f_z]` all share this layout,
//! so the Adjoint of a pose is
//!
//! ```text
//! Ad(T) = [ R      0 ]
//!         [ [t]ₓR  R ]
//! ```
//!
//! All Jacobians are taken with respect to right perturbations `X ⊕ τ = X ∘ exp(τ)`.
//!
//! # Example
//!
//! ```
//! use apex_dynamics::manifold::{LieGroup, Tangent};
//! use apex_dynamics::manifold::se3::{SE3, SE3Tangent};
//! use nalgebra::{Matrix6, Vector3};
//!
//! let pose = SE3::from_translation_euler(1.0, 0.0, 0.0, 0.0, 0.0, 0.3);
//! let tangent = SE3Tangent::new(Vector3::new(0.0, 0.1, 0.0), Vector3::new(0.1, 0.0, 0.0));
//!
//! let mut jacobian = Matrix6::zeros();
//! let perturbed = pose.right_plus(&tangent, None, Some(&mut jacobian));
//! assert!(perturbed.is_valid(1e-9));
//! ```

use std::fmt::Debug;
use thiserror::Error;

pub mod se3;
pub mod so3;

/// Errors that can occur during manifold operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ManifoldError {
    /// Invalid tangent vector dimension
    #[error("Invalid tangent dimension: expected {expected}, got {actual}")]
    InvalidTangentDimension { expected: usize, actual: usize },
}

/// Core trait for Lie group operations.
///
/// Jacobian outputs are optional: pass `None` to skip the derivative work.
pub trait LieGroup: Clone + Debug + PartialEq {
    /// The tangent space vector type
    type TangentVector: Tangent<Self>;

    /// The Jacobian matrix type for this Lie group
    type JacobianMatrix: Clone + Debug + PartialEq;

    /// Degrees of freedom - dimension of the tangent space
    const DOF: usize;

    /// Representation size - size of the underlying parameter vector
    const REP_SIZE: usize;

    /// Get the identity element of the group.
    fn identity() -> Self;

    /// Compute the inverse g⁻¹.
    ///
    /// # Arguments
    /// * `jacobian` - Optional Jacobian ∂(g⁻¹)/∂g
    fn inverse(&self, jacobian: Option<&mut Self::JacobianMatrix>) -> Self;

    /// Compose g₁ ∘ g₂.
    ///
    /// # Arguments
    /// * `other` - The right operand for composition
    /// * `jacobian_self` - Optional Jacobian ∂(g₁ ∘ g₂)/∂g₁
    /// * `jacobian_other` - Optional Jacobian ∂(g₁ ∘ g₂)/∂g₂
    fn compose(
        &self,
        other: &Self,
        jacobian_self: Option<&mut Self::JacobianMatrix>,
        jacobian_other: Option<&mut Self::JacobianMatrix>,
    ) -> Self;

    /// Logarithmic map log(g)^∨.
    ///
    /// # Arguments
    /// * `jacobian` - Optional Jacobian ∂log(g)^∨/∂g
    fn log(&self, jacobian: Option<&mut Self::JacobianMatrix>) -> Self::TangentVector;

    /// Right plus operation: g ⊞ φ = g ∘ exp(φ^∧).
    fn right_plus(
        &self,
        tangent: &Self::TangentVector,
        jacobian_self: Option<&mut Self::JacobianMatrix>,
        jacobian_tangent: Option<&mut Self::JacobianMatrix>,
    ) -> Self;

    /// Right minus operation: g₁ ⊟ g₂ = log(g₂⁻¹ ∘ g₁)^∨.
    fn right_minus(
        &self,
        other: &Self,
        jacobian_self: Option<&mut Self::JacobianMatrix>,
        jacobian_other: Option<&mut Self::JacobianMatrix>,
    ) -> Self::TangentVector;

    /// Relative element g₁⁻¹ ∘ g₂.
    fn between(
        &self,
        other: &Self,
        jacobian_self: Option<&mut Self::JacobianMatrix>,
        jacobian_other: Option<&mut Self::JacobianMatrix>,
    ) -> Self;

    /// Adjoint matrix Ad(g).
    fn adjoint(&self) -> Self::JacobianMatrix;

    /// Generate a random element (useful for testing and initialization).
    fn random() -> Self;

    /// Check if the element is approximately on the manifold.
    fn is_valid(&self, tolerance: f64) -> bool;
}

/// Trait for Lie algebra (tangent space) operations.
pub trait Tangent<G: LieGroup>: Clone + Debug + PartialEq {
    /// Exponential map to Lie group: exp(φ^∧).
    ///
    /// # Arguments
    /// * `jacobian` - Optional Jacobian ∂exp(φ^∧)/∂φ (the right Jacobian)
    fn exp(&self, jacobian: Option<&mut G::JacobianMatrix>) -> G;

    /// Right Jacobian Jr: exp((φ + δφ)^∧) ≈ exp(φ^∧) ∘ exp((Jr δφ)^∧)
    fn right_jacobian(&self) -> G::JacobianMatrix;

    /// Left Jacobian Jl: exp((φ + δφ)^∧) ≈ exp((Jl δφ)^∧) ∘ exp(φ^∧)
    fn left_jacobian(&self) -> G::JacobianMatrix;

    /// Inverse of right Jacobian Jr⁻¹.
    fn right_jacobian_inv(&self) -> G::JacobianMatrix;

    /// Inverse of left Jacobian Jl⁻¹.
    fn left_jacobian_inv(&self) -> G::JacobianMatrix;

    /// Zero tangent vector.
    fn zero() -> Self;

    /// Check if the tangent vector is approximately zero.
    fn is_zero(&self, tolerance: f64) -> bool;
}
