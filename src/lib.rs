//! # Apex Dynamics
//!
//! Screw-theory kinodynamics for a single robot joint, expressed as
//! least-squares residuals with closed-form Jacobians.
//!
//! ## Features
//!
//! - **Spatial Algebra**: SE(3) poses, twists, wrenches, adjoint maps and their derivatives
//! - **Screw Joints**: revolute, prismatic, helical and fixed joints under one contract
//! - **Relation Builder**: pose, twist, acceleration, wrench, torque and limit residuals per joint and time step
//! - **Linear Elimination**: order-preserving sequential QR elimination into a Bayes net
//!
//! ## Conventions
//!
//! - Twists and wrenches are `[angular; linear]`, expressed in the link's COM frame
//! - Pose Jacobians are taken with respect to right perturbations
//! - Joint screw axes are expressed in the frame of the link they drive

pub mod config;
pub mod core;
pub mod error;
pub mod factors;
pub mod linalg;
pub mod logger;
pub mod manifold;
pub mod relations;
pub mod robot;
pub mod spatial;

pub use config::RelationConfig;
pub use core::{Key, NoiseModel, RelationBlock, RelationSet, Value, Values};
pub use error::{DynamicsError, DynamicsResult};
pub use factors::Factor;
pub use linalg::{BayesNet, Conditional, LinearRelation, LinearSystem, eliminate_sequential};
pub use logger::{init_logger, init_logger_with_level};
pub use manifold::se3::{SE3, SE3Tangent};
pub use manifold::{LieGroup, Tangent};
pub use relations::{PlanarAxis, RelationBuilder};
pub use robot::{
    Joint, JointEffortType, JointId, JointKind, JointParams, Link, LinkId, Robot, ScalarLimit,
};
pub use spatial::{ScrewAxis, Twist, TwistAccel, Wrench};
