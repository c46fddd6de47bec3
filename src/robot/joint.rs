//! Screw-family joints.
//!
//! Every joint kind reduces to a constant screw axis expressed in the joint
//! frame. At construction that axis is re-expressed in both link COM frames:
//!
//! ```text
//! S_c = Ad(jMc⁻¹) S_j
//! S_p = -Ad(jMp⁻¹) S_j
//! ```
//!
//! The sign on the parent side makes both axes describe the motion of the
//! link they are expressed in relative to the other link, so that
//! `T_toward(q) = exp(-S_toward q) T_toward(0)` holds for either side. All
//! kinematic operations below are written once against that identity.

use super::link::{Link, LinkId};
use crate::core::keys::Key;
use crate::core::values::Values;
use crate::error::DynamicsResult;
use crate::manifold::LieGroup;
use crate::manifold::se3::SE3;
use crate::spatial::{self, ScrewAxis, Twist, TwistAccel, Wrench};
use nalgebra::{Matrix6, RowVector6, Vector3, Vector6};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use tracing::{debug, warn};

/// Stable index of a joint inside a [`Robot`](super::Robot).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JointId(pub usize);

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the joint coordinate is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JointEffortType {
    /// Torque is commanded
    #[default]
    Actuated,
    /// Passive joint, zero torque
    Unactuated,
    /// Coordinate held fixed
    Fixed,
}

/// Lower/upper bounds with a threshold band inside which the limit penalty
/// already applies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalarLimit {
    pub lower: f64,
    pub upper: f64,
    pub threshold: f64,
}

impl ScalarLimit {
    pub fn new(lower: f64, upper: f64, threshold: f64) -> Self {
        Self {
            lower,
            upper,
            threshold,
        }
    }

    /// `[-limit, limit]`
    pub fn symmetric(limit: f64, threshold: f64) -> Self {
        Self::new(-limit, limit, threshold)
    }

    pub fn is_valid(&self) -> bool {
        self.lower <= self.upper
    }
}

/// Per-joint configuration, set once before the joint is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JointParams {
    pub effort_type: JointEffortType,
    pub angle_limits: ScalarLimit,
    pub velocity_limits: ScalarLimit,
    pub acceleration_limits: ScalarLimit,
    pub torque_limits: ScalarLimit,
}

impl Default for JointParams {
    fn default() -> Self {
        Self {
            effort_type: JointEffortType::Actuated,
            angle_limits: ScalarLimit::new(-PI, PI, 1e-9),
            velocity_limits: ScalarLimit::symmetric(10000.0, 0.0),
            acceleration_limits: ScalarLimit::symmetric(10000.0, 0.0),
            torque_limits: ScalarLimit::symmetric(10000.0, 0.0),
        }
    }
}

impl JointParams {
    pub fn with_effort_type(mut self, effort_type: JointEffortType) -> Self {
        self.effort_type = effort_type;
        self
    }

    pub fn with_angle_limits(mut self, limits: ScalarLimit) -> Self {
        self.angle_limits = limits;
        self
    }

    pub fn with_velocity_limits(mut self, limits: ScalarLimit) -> Self {
        self.velocity_limits = limits;
        self
    }

    pub fn with_acceleration_limits(mut self, limits: ScalarLimit) -> Self {
        self.acceleration_limits = limits;
        self
    }

    pub fn with_torque_limits(mut self, limits: ScalarLimit) -> Self {
        self.torque_limits = limits;
        self
    }
}

/// Joint family. Each variant carries only its motion-axis data, given in
/// the joint frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum JointKind {
    /// Rotation about `axis`
    Revolute { axis: Vector3<f64> },
    /// Translation along `axis`
    Prismatic { axis: Vector3<f64> },
    /// Rotation about `axis` coupled with `pitch` units of translation per turn
    Screw { axis: Vector3<f64>, pitch: f64 },
    /// Rigid attachment
    Fixed,
}

impl JointKind {
    /// Screw axis in the joint frame.
    pub fn joint_screw_axis(&self) -> ScrewAxis {
        match *self {
            JointKind::Revolute { axis } => spatial::spatial_vector(axis, Vector3::zeros()),
            JointKind::Prismatic { axis } => spatial::spatial_vector(Vector3::zeros(), axis),
            JointKind::Screw { axis, pitch } => {
                spatial::spatial_vector(axis, axis * (pitch / (2.0 * PI)))
            }
            JointKind::Fixed => Vector6::zeros(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            JointKind::Revolute { .. } => "revolute",
            JointKind::Prismatic { .. } => "prismatic",
            JointKind::Screw { .. } => "screw",
            JointKind::Fixed => "fixed",
        }
    }
}

/// Jacobians of [`Joint::twist_to_with_jacobians`].
#[derive(Debug, Clone, PartialEq)]
pub struct TwistJacobians {
    pub q: Vector6<f64>,
    pub q_dot: Vector6<f64>,
    pub other_twist: Matrix6<f64>,
}

/// Jacobians of [`Joint::twist_accel_to_with_jacobians`].
#[derive(Debug, Clone, PartialEq)]
pub struct TwistAccelJacobians {
    pub q: Vector6<f64>,
    pub q_dot: Vector6<f64>,
    pub q_ddot: Vector6<f64>,
    pub this_twist: Matrix6<f64>,
    pub other_twist_accel: Matrix6<f64>,
}

/// A joint connecting a parent and a child link.
///
/// Link arguments must be one of the two adjacent links. Adjacency is
/// checked once by [`Robot::add_joint`](super::Robot::add_joint); here it
/// is only a debug assertion.
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    id: JointId,
    name: String,
    kind: JointKind,
    params: JointParams,
    parent: LinkId,
    child: LinkId,
    /// Joint frame in the world at rest
    w_t_j: SE3,
    /// Parent COM frame in the joint frame
    j_m_p: SE3,
    /// Child COM frame in the joint frame
    j_m_c: SE3,
    /// Child COM frame in the parent COM frame at q = 0
    p_m_c_rest: SE3,
    parent_screw_axis: ScrewAxis,
    child_screw_axis: ScrewAxis,
}

impl Joint {
    pub fn new(
        id: JointId,
        name: impl Into<String>,
        w_t_j: SE3,
        parent: &Link,
        child: &Link,
        params: JointParams,
        kind: JointKind,
    ) -> Self {
        let name = name.into();
        let j_t_w = w_t_j.inverse(None);
        let j_m_p = j_t_w.compose(parent.w_t_com(), None, None);
        let j_m_c = j_t_w.compose(child.w_t_com(), None, None);
        let p_m_c_rest = parent.w_t_com().between(child.w_t_com(), None, None);

        let joint_axis = kind.joint_screw_axis();
        let parent_screw_axis = -(j_m_p.inverse(None).adjoint() * joint_axis);
        let child_screw_axis = j_m_c.inverse(None).adjoint() * joint_axis;

        for (quantity, limits) in [
            ("angle", &params.angle_limits),
            ("velocity", &params.velocity_limits),
            ("acceleration", &params.acceleration_limits),
            ("torque", &params.torque_limits),
        ] {
            if !limits.is_valid() {
                warn!(
                    joint = %name,
                    quantity,
                    lower = limits.lower,
                    upper = limits.upper,
                    "joint limit has lower > upper"
                );
            }
        }

        debug!(
            joint = %name,
            kind = kind.name(),
            parent = %parent.name(),
            child = %child.name(),
            "joint constructed"
        );

        Self {
            id,
            name,
            kind,
            params,
            parent: parent.id(),
            child: child.id(),
            w_t_j,
            j_m_p,
            j_m_c,
            p_m_c_rest,
            parent_screw_axis,
            child_screw_axis,
        }
    }

    pub fn id(&self) -> JointId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &JointKind {
        &self.kind
    }

    pub fn params(&self) -> &JointParams {
        &self.params
    }

    pub fn parent(&self) -> LinkId {
        self.parent
    }

    pub fn child(&self) -> LinkId {
        self.child
    }

    /// `[parent, child]`
    pub fn links(&self) -> [LinkId; 2] {
        [self.parent, self.child]
    }

    pub fn w_t_j(&self) -> &SE3 {
        &self.w_t_j
    }

    pub fn j_m_p(&self) -> &SE3 {
        &self.j_m_p
    }

    pub fn j_m_c(&self) -> &SE3 {
        &self.j_m_c
    }

    pub fn p_m_c_rest(&self) -> &SE3 {
        &self.p_m_c_rest
    }

    pub fn is_adjacent(&self, link: LinkId) -> bool {
        link == self.parent || link == self.child
    }

    pub fn is_child_link(&self, link: LinkId) -> bool {
        debug_assert!(
            self.is_adjacent(link),
            "link {link} is not adjacent to joint {}",
            self.name
        );
        link == self.child
    }

    pub fn other_link(&self, link: LinkId) -> LinkId {
        if self.is_child_link(link) {
            self.parent
        } else {
            self.child
        }
    }

    /// Screw axis expressed in `link`'s COM frame.
    pub fn screw_axis(&self, link: LinkId) -> ScrewAxis {
        if self.is_child_link(link) {
            self.child_screw_axis
        } else {
            self.parent_screw_axis
        }
    }

    /// pMc(q) = pMc(0) exp(S_c q)
    fn p_m_c(&self, q: f64) -> SE3 {
        self.p_m_c_rest
            .compose(&spatial::screw_exp(&self.child_screw_axis, q), None, None)
    }

    /// Pose of the other link's COM frame expressed in `link`'s COM frame.
    pub fn transform_to(&self, link: LinkId, q: f64) -> SE3 {
        let p_m_c = self.p_m_c(q);
        if self.is_child_link(link) {
            p_m_c.inverse(None)
        } else {
            p_m_c
        }
    }

    /// [`transform_to`](Self::transform_to) with its right Jacobian in `q`.
    pub fn transform_to_with_jacobian(&self, link: LinkId, q: f64) -> (SE3, Vector6<f64>) {
        // pMc_H_q = pMc_H_exp * exp_H_q
        let (exp, exp_h_q) = spatial::screw_exp_with_jacobian(&self.child_screw_axis, q);
        let mut p_m_c_h_exp = Matrix6::zeros();
        let p_m_c = self
            .p_m_c_rest
            .compose(&exp, None, Some(&mut p_m_c_h_exp));
        let p_m_c_h_q = p_m_c_h_exp * exp_h_q;

        if self.is_child_link(link) {
            let mut c_m_p_h_p_m_c = Matrix6::zeros();
            let c_m_p = p_m_c.inverse(Some(&mut c_m_p_h_p_m_c));
            (c_m_p, c_m_p_h_p_m_c * p_m_c_h_q)
        } else {
            (p_m_c, p_m_c_h_q)
        }
    }

    /// Pose of `link`'s COM frame expressed in the other link's COM frame.
    pub fn transform_from(&self, link: LinkId, q: f64) -> SE3 {
        self.transform_to(self.other_link(link), q)
    }

    pub fn transform_from_with_jacobian(&self, link: LinkId, q: f64) -> (SE3, Vector6<f64>) {
        self.transform_to_with_jacobian(self.other_link(link), q)
    }

    /// Twist of `link` from the other link's twist:
    ///
    /// ```text
    /// V = Ad(T(q)) V_other + S q̇
    /// ```
    pub fn twist_to(&self, link: LinkId, q: f64, q_dot: f64, other_twist: &Twist) -> Twist {
        self.transform_to(link, q).adjoint() * other_twist + self.screw_axis(link) * q_dot
    }

    pub fn twist_to_with_jacobians(
        &self,
        link: LinkId,
        q: f64,
        q_dot: f64,
        other_twist: &Twist,
    ) -> (Twist, TwistJacobians) {
        let screw_axis = self.screw_axis(link);
        let this_t_other = self.transform_to(link, q);
        let this_ad_other = this_t_other.adjoint();

        let twist = this_ad_other * other_twist + screw_axis * q_dot;
        let jacobians = TwistJacobians {
            q: spatial::adjoint_map_jacobian_q(&screw_axis, &this_t_other) * other_twist,
            q_dot: screw_axis,
            other_twist: this_ad_other,
        };
        (twist, jacobians)
    }

    /// Twist of the other link given `link`'s twist.
    pub fn twist_from(&self, link: LinkId, q: f64, q_dot: f64, this_twist: &Twist) -> Twist {
        self.twist_to(self.other_link(link), q, q_dot, this_twist)
    }

    /// Twist acceleration of `link`:
    ///
    /// ```text
    /// A = Ad(T(q)) A_other + ad(V_this) S q̇ + S q̈
    /// ```
    pub fn twist_accel_to(
        &self,
        link: LinkId,
        q: f64,
        q_dot: f64,
        q_ddot: f64,
        this_twist: &Twist,
        other_twist_accel: &TwistAccel,
    ) -> TwistAccel {
        let screw_axis = self.screw_axis(link);
        self.transform_to(link, q).adjoint() * other_twist_accel
            + spatial::spatial_cross(this_twist) * (screw_axis * q_dot)
            + screw_axis * q_ddot
    }

    pub fn twist_accel_to_with_jacobians(
        &self,
        link: LinkId,
        q: f64,
        q_dot: f64,
        q_ddot: f64,
        this_twist: &Twist,
        other_twist_accel: &TwistAccel,
    ) -> (TwistAccel, TwistAccelJacobians) {
        let screw_axis = self.screw_axis(link);
        let this_t_other = self.transform_to(link, q);
        let this_ad_other = this_t_other.adjoint();
        let joint_twist = screw_axis * q_dot;
        let this_twist_cross = spatial::spatial_cross(this_twist);

        let twist_accel =
            this_ad_other * other_twist_accel + this_twist_cross * joint_twist + screw_axis * q_ddot;
        let jacobians = TwistAccelJacobians {
            q: spatial::adjoint_map_jacobian_q(&screw_axis, &this_t_other) * other_twist_accel,
            q_dot: this_twist_cross * screw_axis,
            q_ddot: screw_axis,
            this_twist: -spatial::spatial_cross(&joint_twist),
            other_twist_accel: this_ad_other,
        };
        (twist_accel, jacobians)
    }

    /// Twist acceleration of the other link given its twist and `link`'s
    /// twist acceleration.
    pub fn twist_accel_from(
        &self,
        link: LinkId,
        q: f64,
        q_dot: f64,
        q_ddot: f64,
        other_twist: &Twist,
        this_twist_accel: &TwistAccel,
    ) -> TwistAccel {
        self.twist_accel_to(
            self.other_link(link),
            q,
            q_dot,
            q_ddot,
            other_twist,
            this_twist_accel,
        )
    }

    /// Joint torque (or force) produced by the wrench on `link`: `Sᵀ F`.
    pub fn wrench_to_torque(&self, link: LinkId, wrench: &Wrench) -> f64 {
        self.screw_axis(link).dot(wrench)
    }

    pub fn wrench_to_torque_with_jacobian(
        &self,
        link: LinkId,
        wrench: &Wrench,
    ) -> (f64, RowVector6<f64>) {
        let screw_axis = self.screw_axis(link);
        (screw_axis.dot(wrench), screw_axis.transpose())
    }

    /// d Ad(transform_to(link, q)) / dq
    pub fn adjoint_map_jacobian_joint_angle(&self, link: LinkId, q: f64) -> Matrix6<f64> {
        spatial::adjoint_map_jacobian_q(&self.screw_axis(link), &self.transform_to(link, q))
    }

    pub fn angle_key(&self, t: usize) -> Key {
        Key::JointAngle { joint: self.id, t }
    }

    pub fn vel_key(&self, t: usize) -> Key {
        Key::JointVel { joint: self.id, t }
    }

    pub fn accel_key(&self, t: usize) -> Key {
        Key::JointAccel { joint: self.id, t }
    }

    pub fn torque_key(&self, t: usize) -> Key {
        Key::Torque { joint: self.id, t }
    }

    /// Wrench applied on `link` through this joint.
    pub fn wrench_key(&self, link: LinkId, t: usize) -> Key {
        Key::Wrench {
            link,
            joint: self.id,
            t,
        }
    }

    /// [`transform_to`](Self::transform_to) with the joint angle read from `values`.
    pub fn transform_to_values(&self, link: LinkId, values: &Values, t: usize) -> DynamicsResult<SE3> {
        let q = values.scalar(&self.angle_key(t))?;
        Ok(self.transform_to(link, q))
    }

    pub fn transform_to_values_with_jacobian(
        &self,
        link: LinkId,
        values: &Values,
        t: usize,
    ) -> DynamicsResult<(SE3, Vector6<f64>)> {
        let q = values.scalar(&self.angle_key(t))?;
        Ok(self.transform_to_with_jacobian(link, q))
    }

    /// [`transform_from`](Self::transform_from) with the joint angle read from `values`.
    pub fn transform_from_values(&self, link: LinkId, values: &Values, t: usize) -> DynamicsResult<SE3> {
        self.transform_to_values(self.other_link(link), values, t)
    }

    /// [`twist_to`](Self::twist_to) with the joint angle and velocity read
    /// from `values`. A missing twist of the other link counts as zero.
    pub fn twist_to_values(&self, link: LinkId, values: &Values, t: usize) -> DynamicsResult<Twist> {
        self.twist_to_values_with_jacobians(link, values, t)
            .map(|(twist, _)| twist)
    }

    pub fn twist_to_values_with_jacobians(
        &self,
        link: LinkId,
        values: &Values,
        t: usize,
    ) -> DynamicsResult<(Twist, TwistJacobians)> {
        let q = values.scalar(&self.angle_key(t))?;
        let q_dot = values.scalar(&self.vel_key(t))?;
        let other_twist = values.vector6_or_zero(&Key::Twist {
            link: self.other_link(link),
            t,
        })?;
        Ok(self.twist_to_with_jacobians(link, q, q_dot, &other_twist))
    }

    /// Twist of the other link from `link`'s twist in `values` (zero if
    /// absent) and the joint angle and velocity.
    pub fn twist_from_values(&self, link: LinkId, values: &Values, t: usize) -> DynamicsResult<Twist> {
        self.twist_to_values(self.other_link(link), values, t)
    }

    /// [`twist_accel_to`](Self::twist_accel_to) with the joint coordinate
    /// and its derivatives read from `values`. Missing link twist and
    /// twist acceleration count as zero.
    pub fn twist_accel_to_values(
        &self,
        link: LinkId,
        values: &Values,
        t: usize,
    ) -> DynamicsResult<TwistAccel> {
        let q = values.scalar(&self.angle_key(t))?;
        let q_dot = values.scalar(&self.vel_key(t))?;
        let q_ddot = values.scalar(&self.accel_key(t))?;
        let this_twist = values.vector6_or_zero(&Key::Twist { link, t })?;
        let other_twist_accel = values.vector6_or_zero(&Key::TwistAccel {
            link: self.other_link(link),
            t,
        })?;
        Ok(self.twist_accel_to(link, q, q_dot, q_ddot, &this_twist, &other_twist_accel))
    }

    /// Twist acceleration of the other link from its twist and `link`'s twist
    /// acceleration in `values`.
    pub fn twist_accel_from_values(
        &self,
        link: LinkId,
        values: &Values,
        t: usize,
    ) -> DynamicsResult<TwistAccel> {
        self.twist_accel_to_values(self.other_link(link), values, t)
    }

    /// [`wrench_to_torque`](Self::wrench_to_torque) with the wrench on `link` read from `values`.
    pub fn torque_from_values(&self, link: LinkId, values: &Values, t: usize) -> DynamicsResult<f64> {
        let wrench = values.vector6(&self.wrench_key(link, t))?;
        Ok(self.wrench_to_torque(link, &wrench))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::DynamicsError;
    use nalgebra::Matrix3;

    const TOLERANCE: f64 = 1e-9;
    const FD_EPSILON: f64 = 1e-6;

    fn link(id: usize, z: f64) -> Link {
        Link::new(
            LinkId(id),
            format!("l{}", id + 1),
            1.0,
            Matrix3::identity(),
            SE3::from_translation_euler(0.0, 0.0, z, 0.0, 0.0, 0.0),
        )
    }

    fn joint(kind: JointKind) -> Joint {
        Joint::new(
            JointId(0),
            "j1",
            SE3::from_translation_euler(0.0, 0.0, 2.0, 0.0, 0.0, 0.0),
            &link(0, 1.0),
            &link(1, 3.0),
            JointParams::default(),
            kind,
        )
    }

    #[test]
    fn test_screw_axis_signs() {
        let revolute = joint(JointKind::Revolute { axis: Vector3::x() });
        assert_eq!(
            revolute.screw_axis(LinkId(0)),
            Vector6::new(-1.0, 0.0, 0.0, 0.0, -1.0, 0.0)
        );
        assert_eq!(
            revolute.screw_axis(LinkId(1)),
            Vector6::new(1.0, 0.0, 0.0, 0.0, -1.0, 0.0)
        );

        let prismatic = joint(JointKind::Prismatic { axis: Vector3::z() });
        assert_eq!(
            prismatic.screw_axis(LinkId(0)),
            Vector6::new(0.0, 0.0, 0.0, 0.0, 0.0, -1.0)
        );
        assert_eq!(
            prismatic.screw_axis(LinkId(1)),
            Vector6::new(0.0, 0.0, 0.0, 0.0, 0.0, 1.0)
        );
    }

    #[test]
    fn test_screw_pitch_translation_per_turn() {
        let screw = joint(JointKind::Screw {
            axis: Vector3::z(),
            pitch: 0.5,
        });
        let one_turn = screw.transform_to(LinkId(0), 2.0 * PI);
        assert!(one_turn.approx_eq(
            &SE3::from_translation_euler(0.0, 0.0, 2.5, 0.0, 0.0, 0.0),
            TOLERANCE
        ));
    }

    #[test]
    fn test_fixed_joint_is_rigid() {
        let fixed = joint(JointKind::Fixed);
        assert!(fixed
            .transform_to(LinkId(0), 1.3)
            .approx_eq(fixed.p_m_c_rest(), TOLERANCE));
        assert_eq!(fixed.wrench_to_torque(LinkId(1), &Vector6::repeat(1.0)), 0.0);
    }

    #[test]
    fn test_transform_round_trip() {
        for kind in [
            JointKind::Revolute {
                axis: Vector3::new(0.0, 0.6, 0.8),
            },
            JointKind::Prismatic { axis: Vector3::y() },
            JointKind::Screw {
                axis: Vector3::x(),
                pitch: 0.1,
            },
        ] {
            let j = joint(kind);
            for q in [-1.2, 0.0, 0.4] {
                let round_trip = j
                    .transform_to(LinkId(1), q)
                    .compose(&j.transform_to(LinkId(0), q), None, None);
                assert!(round_trip.approx_eq(&SE3::identity(), TOLERANCE));
                let product = j.transform_to(LinkId(0), q).adjoint()
                    * j.transform_to(LinkId(1), q).adjoint();
                assert!((product - Matrix6::identity()).norm() < TOLERANCE);
            }
        }
    }

    #[test]
    fn test_transform_jacobian_numerical() {
        let j = joint(JointKind::Screw {
            axis: Vector3::new(0.0, 0.6, 0.8),
            pitch: 0.3,
        });
        for link in j.links() {
            for q in [0.0, 0.8, -2.0] {
                let (pose, h_q) = j.transform_to_with_jacobian(link, q);
                let numerical = j
                    .transform_to(link, q + FD_EPSILON)
                    .right_minus(&pose, None, None)
                    .coeffs()
                    / FD_EPSILON;
                assert!((numerical - h_q).norm() < 1e-5, "link {link}, q {q}");
            }
        }
    }

    #[test]
    fn test_twist_jacobians_numerical() {
        let j = joint(JointKind::Revolute {
            axis: Vector3::new(1.0, 0.0, 0.0),
        });
        let other = Vector6::new(0.1, 0.2, -0.3, 0.5, -1.0, 0.7);
        let (q, q_dot) = (0.3, 1.5);
        for link in j.links() {
            let (twist, h) = j.twist_to_with_jacobians(link, q, q_dot, &other);
            let dq = (j.twist_to(link, q + FD_EPSILON, q_dot, &other) - twist) / FD_EPSILON;
            let dq_dot = (j.twist_to(link, q, q_dot + FD_EPSILON, &other) - twist) / FD_EPSILON;
            assert!((dq - h.q).norm() < 1e-5);
            assert!((dq_dot - h.q_dot).norm() < 1e-5);
            for i in 0..6 {
                let mut perturbed = other;
                perturbed[i] += FD_EPSILON;
                let column = (j.twist_to(link, q, q_dot, &perturbed) - twist) / FD_EPSILON;
                assert!((column - h.other_twist.column(i)).norm() < 1e-5);
            }
        }
    }

    #[test]
    fn test_twist_accel_jacobians_numerical() {
        let j = joint(JointKind::Prismatic {
            axis: Vector3::new(0.0, 0.0, 1.0),
        });
        let this_twist = Vector6::new(0.4, -0.1, 0.2, 0.3, 0.0, -0.5);
        let other_accel = Vector6::new(1.0, 0.5, -0.2, 0.0, 2.0, 9.8);
        let (q, q_dot, q_ddot) = (0.25, -0.7, 2.0);
        for link in j.links() {
            let eval = |q: f64, q_dot: f64, q_ddot: f64, v: &Vector6<f64>, a: &Vector6<f64>| {
                j.twist_accel_to(link, q, q_dot, q_ddot, v, a)
            };
            let (accel, h) =
                j.twist_accel_to_with_jacobians(link, q, q_dot, q_ddot, &this_twist, &other_accel);
            let base = eval(q, q_dot, q_ddot, &this_twist, &other_accel);
            assert!((accel - base).norm() < TOLERANCE);

            let dq = (eval(q + FD_EPSILON, q_dot, q_ddot, &this_twist, &other_accel) - base)
                / FD_EPSILON;
            let dq_dot = (eval(q, q_dot + FD_EPSILON, q_ddot, &this_twist, &other_accel) - base)
                / FD_EPSILON;
            let dq_ddot = (eval(q, q_dot, q_ddot + FD_EPSILON, &this_twist, &other_accel) - base)
                / FD_EPSILON;
            assert!((dq - h.q).norm() < 1e-5);
            assert!((dq_dot - h.q_dot).norm() < 1e-5);
            assert!((dq_ddot - h.q_ddot).norm() < 1e-5);

            for i in 0..6 {
                let mut v = this_twist;
                v[i] += FD_EPSILON;
                let column = (eval(q, q_dot, q_ddot, &v, &other_accel) - base) / FD_EPSILON;
                assert!((column - h.this_twist.column(i)).norm() < 1e-5);

                let mut a = other_accel;
                a[i] += FD_EPSILON;
                let column = (eval(q, q_dot, q_ddot, &this_twist, &a) - base) / FD_EPSILON;
                assert!((column - h.other_twist_accel.column(i)).norm() < 1e-5);
            }
        }
    }

    #[test]
    fn test_adjoint_jacobian_numerical() {
        let j = joint(JointKind::Revolute {
            axis: Vector3::new(0.0, 1.0, 0.0),
        });
        for link in j.links() {
            let q = -0.9;
            let numerical = (j.transform_to(link, q + FD_EPSILON).adjoint()
                - j.transform_to(link, q - FD_EPSILON).adjoint())
                / (2.0 * FD_EPSILON);
            assert!((numerical - j.adjoint_map_jacobian_joint_angle(link, q)).norm() < 1e-6);
        }
    }

    #[test]
    fn test_velocity_composition_is_linear() {
        let j = joint(JointKind::Revolute { axis: Vector3::x() });
        let other = Vector6::new(0.0, 0.3, 0.0, 1.0, 0.0, 0.0);
        let q = 0.6;
        let transported = j.twist_to(LinkId(1), q, 0.0, &other);
        let single = j.twist_to(LinkId(1), q, 1.0, &other) - transported;
        let double = j.twist_to(LinkId(1), q, 2.0, &other) - transported;
        assert!((double - single * 2.0).norm() < TOLERANCE);
        assert!((single - j.screw_axis(LinkId(1))).norm() < TOLERANCE);
    }

    #[test]
    fn test_accel_reduces_to_convective_term() {
        let j = joint(JointKind::Revolute { axis: Vector3::x() });
        let this_twist = Vector6::new(0.0, 0.0, 1.0, 0.5, 0.0, 0.0);
        let q_dot = 2.0;
        let accel = j.twist_accel_to(LinkId(1), 0.2, q_dot, 0.0, &this_twist, &Vector6::zeros());
        let expected =
            spatial::spatial_cross(&this_twist) * (j.screw_axis(LinkId(1)) * q_dot);
        assert!((accel - expected).norm() < TOLERANCE);
    }

    #[test]
    fn test_torque_is_linear_in_wrench() {
        let j = joint(JointKind::Revolute { axis: Vector3::x() });
        let wrench = Vector6::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        let (torque, h) = j.wrench_to_torque_with_jacobian(LinkId(1), &wrench);
        assert!((j.wrench_to_torque(LinkId(1), &(wrench * 2.0)) - 2.0 * torque).abs() < TOLERANCE);
        assert_eq!(h, j.screw_axis(LinkId(1)).transpose());
        // S_c = [1,0,0,0,-1,0]
        assert!((torque - (1.0 - 5.0)).abs() < TOLERANCE);
    }

    #[test]
    fn test_values_lookup_missing_variable() {
        let j = joint(JointKind::Revolute { axis: Vector3::x() });
        let mut values = Values::new();
        assert_eq!(
            j.transform_to_values(LinkId(1), &values, 3),
            Err(DynamicsError::MissingVariable(j.angle_key(3)))
        );

        values.insert(j.angle_key(3), 0.5);
        let pose = j.transform_to_values(LinkId(1), &values, 3).unwrap();
        assert!(pose.approx_eq(&j.transform_to(LinkId(1), 0.5), TOLERANCE));

        assert_eq!(
            j.twist_to_values(LinkId(1), &values, 3),
            Err(DynamicsError::MissingVariable(j.vel_key(3)))
        );
        values.insert(j.vel_key(3), 2.0);
        let twist = j.twist_to_values(LinkId(1), &values, 3).unwrap();
        assert!((twist - j.screw_axis(LinkId(1)) * 2.0).norm() < TOLERANCE);
    }

    #[test]
    fn test_from_values_match_scalar_api() {
        let j = joint(JointKind::Screw {
            axis: Vector3::z(),
            pitch: 0.3,
        });
        let (parent, child) = (j.parent(), j.child());
        let (q, q_dot, q_ddot) = (0.6, -1.1, 0.4);
        let twist_c = Vector6::new(0.2, -0.1, 0.5, 0.3, 0.0, -0.4);
        let accel_c = Vector6::new(-0.3, 0.1, 0.0, 0.2, 0.6, 0.1);
        let twist_p = Vector6::new(0.1, 0.4, -0.2, 0.0, 0.3, 0.2);

        let mut values = Values::new();
        values.insert(j.angle_key(1), q);
        values.insert(j.vel_key(1), q_dot);
        values.insert(j.accel_key(1), q_ddot);
        values.insert(Key::Twist { link: child, t: 1 }, twist_c);
        values.insert(Key::Twist { link: parent, t: 1 }, twist_p);
        values.insert(Key::TwistAccel { link: child, t: 1 }, accel_c);

        let pose = j.transform_from_values(child, &values, 1).unwrap();
        assert!(pose.approx_eq(&j.transform_from(child, q), TOLERANCE));
        assert!(pose.approx_eq(&j.transform_to(parent, q), TOLERANCE));

        let twist = j.twist_from_values(child, &values, 1).unwrap();
        assert!((twist - j.twist_from(child, q, q_dot, &twist_c)).norm() < TOLERANCE);

        let accel = j.twist_accel_from_values(child, &values, 1).unwrap();
        let expected = j.twist_accel_from(child, q, q_dot, q_ddot, &twist_p, &accel_c);
        assert!((accel - expected).norm() < TOLERANCE);

        let (_, h_q) = j.transform_to_values_with_jacobian(child, &values, 1).unwrap();
        assert!((h_q - j.transform_to_with_jacobian(child, q).1).norm() < TOLERANCE);
        let (_, jacobians) = j.twist_to_values_with_jacobians(child, &values, 1).unwrap();
        assert!((jacobians.other_twist - j.transform_to(child, q).adjoint()).norm() < TOLERANCE);

        assert_eq!(
            j.twist_from_values(child, &Values::new(), 1),
            Err(DynamicsError::MissingVariable(j.angle_key(1)))
        );
    }

    #[test]
    fn test_params_serde_defaults() {
        let params: JointParams =
            serde_json::from_str(r#"{"effort_type":"Unactuated"}"#).unwrap();
        assert_eq!(params.effort_type, JointEffortType::Unactuated);
        assert_eq!(params.angle_limits, ScalarLimit::new(-PI, PI, 1e-9));
        assert_eq!(params.torque_limits.upper, 10000.0);
    }
}
