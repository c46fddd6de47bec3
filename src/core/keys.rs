//! Variable identifiers.
//!
//! A key combines the quantity kind, the entity (link and/or joint) and the
//! discrete time index. Two keys are the same variable exactly when all
//! three agree.

use crate::robot::{JointId, LinkId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Key {
    /// World pose of a link's COM frame
    Pose { link: LinkId, t: usize },
    /// Twist of a link, in its COM frame
    Twist { link: LinkId, t: usize },
    /// Twist acceleration of a link, in its COM frame
    TwistAccel { link: LinkId, t: usize },
    /// Wrench exerted on `link` through `joint`, in the link's COM frame
    Wrench {
        link: LinkId,
        joint: JointId,
        t: usize,
    },
    JointAngle { joint: JointId, t: usize },
    JointVel { joint: JointId, t: usize },
    JointAccel { joint: JointId, t: usize },
    Torque { joint: JointId, t: usize },
}

impl Key {
    /// Tangent-space dimension of the variable.
    pub fn dim(&self) -> usize {
        match self {
            Key::Pose { .. } | Key::Twist { .. } | Key::TwistAccel { .. } | Key::Wrench { .. } => 6,
            Key::JointAngle { .. }
            | Key::JointVel { .. }
            | Key::JointAccel { .. }
            | Key::Torque { .. } => 1,
        }
    }

    /// Name of the [`Value`](crate::core::values::Value) kind stored under this key.
    pub fn value_kind(&self) -> &'static str {
        match self {
            Key::Pose { .. } => "pose",
            Key::Twist { .. } | Key::TwistAccel { .. } | Key::Wrench { .. } => "vector6",
            Key::JointAngle { .. }
            | Key::JointVel { .. }
            | Key::JointAccel { .. }
            | Key::Torque { .. } => "scalar",
        }
    }

    /// Time index of the variable.
    pub fn time(&self) -> usize {
        match *self {
            Key::Pose { t, .. }
            | Key::Twist { t, .. }
            | Key::TwistAccel { t, .. }
            | Key::Wrench { t, .. }
            | Key::JointAngle { t, .. }
            | Key::JointVel { t, .. }
            | Key::JointAccel { t, .. }
            | Key::Torque { t, .. } => t,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Pose { link, t } => write!(f, "p(l={link}, t={t})"),
            Key::Twist { link, t } => write!(f, "V(l={link}, t={t})"),
            Key::TwistAccel { link, t } => write!(f, "A(l={link}, t={t})"),
            Key::Wrench { link, joint, t } => write!(f, "F(l={link}, j={joint}, t={t})"),
            Key::JointAngle { joint, t } => write!(f, "q(j={joint}, t={t})"),
            Key::JointVel { joint, t } => write!(f, "v(j={joint}, t={t})"),
            Key::JointAccel { joint, t } => write!(f, "a(j={joint}, t={t})"),
            Key::Torque { joint, t } => write!(f, "T(j={joint}, t={t})"),
        }
    }
}
