//! Noise settings for the relations emitted by [`RelationBuilder`](crate::relations::RelationBuilder).

use crate::core::NoiseModel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-family isotropic noise sigmas.
///
/// Acceleration relations and forward-dynamics priors are always hard
/// constraints and have no entry here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationConfig {
    /// Pose loop closure across a joint
    pub pose_sigma: f64,
    /// Twist composition
    pub twist_sigma: f64,
    /// Wrench equivalence and planar restriction
    pub wrench_sigma: f64,
    /// Torque transmission
    pub torque_sigma: f64,
    /// Hinge penalties on joint limits
    pub joint_limit_sigma: f64,
}

impl Default for RelationConfig {
    fn default() -> Self {
        Self {
            pose_sigma: 1e-3,
            twist_sigma: 1e-3,
            wrench_sigma: 1e-3,
            torque_sigma: 1e-3,
            joint_limit_sigma: 1e-2,
        }
    }
}

impl RelationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pose_sigma(mut self, sigma: f64) -> Self {
        self.pose_sigma = sigma;
        self
    }

    pub fn with_twist_sigma(mut self, sigma: f64) -> Self {
        self.twist_sigma = sigma;
        self
    }

    pub fn with_wrench_sigma(mut self, sigma: f64) -> Self {
        self.wrench_sigma = sigma;
        self
    }

    pub fn with_torque_sigma(mut self, sigma: f64) -> Self {
        self.torque_sigma = sigma;
        self
    }

    pub fn with_joint_limit_sigma(mut self, sigma: f64) -> Self {
        self.joint_limit_sigma = sigma;
        self
    }

    pub fn pose_noise(&self) -> NoiseModel {
        NoiseModel::isotropic(6, self.pose_sigma)
    }

    pub fn twist_noise(&self) -> NoiseModel {
        NoiseModel::isotropic(6, self.twist_sigma)
    }

    pub fn wrench_noise(&self, dim: usize) -> NoiseModel {
        NoiseModel::isotropic(dim, self.wrench_sigma)
    }

    pub fn torque_noise(&self) -> NoiseModel {
        NoiseModel::isotropic(1, self.torque_sigma)
    }

    pub fn joint_limit_noise(&self) -> NoiseModel {
        NoiseModel::isotropic(1, self.joint_limit_sigma)
    }
}

impl fmt::Display for RelationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Relation noise sigmas:")?;
        writeln!(f, "  pose:        {:.3e}", self.pose_sigma)?;
        writeln!(f, "  twist:       {:.3e}", self.twist_sigma)?;
        writeln!(f, "  wrench:      {:.3e}", self.wrench_sigma)?;
        writeln!(f, "  torque:      {:.3e}", self.torque_sigma)?;
        write!(f, "  joint limit: {:.3e}", self.joint_limit_sigma)
    }
}
