//! Shared fixtures for joint integration tests
//!
//! Two unit-mass links stacked along world z: `l1` with its COM at z = 1 and
//! `l2` with its COM at z = 3, connected by joint `j1` located at z = 2.

#![allow(dead_code)]
#![allow(clippy::expect_used)]

use apex_dynamics::{
    Joint, JointKind, JointParams, Key, LieGroup, LinkId, Robot, SE3, Twist, TwistAccel, Values,
};
use nalgebra::{Matrix3, Vector3, Vector6};
use rand::Rng;

pub const TOLERANCE: f64 = 1e-9;

/// Build the two-link robot with the given joint.
pub fn two_link_robot(params: JointParams, kind: JointKind) -> Robot {
    let mut robot = Robot::new();
    let l1 = robot
        .add_link(
            "l1",
            1.0,
            Matrix3::identity(),
            SE3::from_translation_euler(0.0, 0.0, 1.0, 0.0, 0.0, 0.0),
        )
        .expect("add l1");
    let l2 = robot
        .add_link(
            "l2",
            1.0,
            Matrix3::identity(),
            SE3::from_translation_euler(0.0, 0.0, 3.0, 0.0, 0.0, 0.0),
        )
        .expect("add l2");
    robot
        .add_joint(
            "j1",
            SE3::from_translation_euler(0.0, 0.0, 2.0, 0.0, 0.0, 0.0),
            l1,
            l2,
            params,
            kind,
        )
        .expect("add j1");
    robot
}

/// The only joint of [`two_link_robot`].
pub fn only_joint(robot: &Robot) -> &Joint {
    robot.joint_by_name("j1").expect("joint j1")
}

pub fn random_vector6(rng: &mut impl Rng, bound: f64) -> Vector6<f64> {
    Vector6::from_fn(|_, _| rng.random_range(-bound..bound))
}

pub fn random_unit_vector(rng: &mut impl Rng) -> Vector3<f64> {
    loop {
        let v = Vector3::from_fn(|_, _| rng.random_range(-1.0..1.0));
        let norm = v.norm();
        if norm > 0.1 {
            return v / norm;
        }
    }
}

/// Known kinematic state of the fixture at time `t`: poses and twists
/// consistent with the joint at `(q, q_dot)`, a parent twist acceleration,
/// and the joint velocity.
pub struct KnownState {
    pub values: Values,
    pub twist_c: Twist,
    pub accel_p: TwistAccel,
}

pub fn known_state(joint: &Joint, t: usize, q: f64, q_dot: f64, twist_p: Twist, accel_p: TwistAccel) -> KnownState {
    let (parent, child): (LinkId, LinkId) = (joint.parent(), joint.child());
    let w_t_p = SE3::from_translation_euler(0.0, 0.0, 1.0, 0.0, 0.0, 0.0);
    let w_t_c = w_t_p.compose(&joint.transform_to(parent, q), None, None);
    let twist_c = joint.twist_to(child, q, q_dot, &twist_p);

    let mut values = Values::new();
    values.insert(Key::Pose { link: parent, t }, w_t_p);
    values.insert(Key::Pose { link: child, t }, w_t_c);
    values.insert(Key::Twist { link: parent, t }, twist_p);
    values.insert(Key::Twist { link: child, t }, twist_c);
    values.insert(joint.angle_key(t), q);
    values.insert(joint.vel_key(t), q_dot);
    KnownState {
        values,
        twist_c,
        accel_p,
    }
}
