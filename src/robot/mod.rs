//! Robot topology: arena storage of links and joints.
//!
//! The [`Robot`] is the sole owner of every [`Link`] and [`Joint`]. Joints
//! refer to their links by [`LinkId`], and callers hold ids rather than
//! references, so the topology can be shared read-only across time steps.

pub mod joint;
pub mod link;

pub use joint::{
    Joint, JointEffortType, JointId, JointKind, JointParams, ScalarLimit, TwistAccelJacobians,
    TwistJacobians,
};
pub use link::{Link, LinkId};

use crate::error::{DynamicsError, DynamicsResult};
use crate::manifold::se3::SE3;
use nalgebra::Matrix3;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct Robot {
    links: Vec<Link>,
    joints: Vec<Joint>,
    link_names: HashMap<String, LinkId>,
    joint_names: HashMap<String, JointId>,
}

impl Robot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a link. Names must be unique.
    pub fn add_link(
        &mut self,
        name: &str,
        mass: f64,
        inertia: Matrix3<f64>,
        w_t_com: SE3,
    ) -> DynamicsResult<LinkId> {
        if self.link_names.contains_key(name) {
            return Err(DynamicsError::Topology(format!(
                "duplicate link name '{name}'"
            )));
        }
        let id = LinkId(self.links.len());
        self.links.push(Link::new(id, name, mass, inertia, w_t_com));
        self.link_names.insert(name.to_string(), id);
        debug!(link = name, id = id.0, "link registered");
        Ok(id)
    }

    /// Register a joint between two existing, distinct links.
    ///
    /// This is the only place adjacency is validated; joint methods assume
    /// their link arguments are adjacent.
    pub fn add_joint(
        &mut self,
        name: &str,
        w_t_j: SE3,
        parent: LinkId,
        child: LinkId,
        params: JointParams,
        kind: JointKind,
    ) -> DynamicsResult<JointId> {
        if self.joint_names.contains_key(name) {
            return Err(DynamicsError::Topology(format!(
                "duplicate joint name '{name}'"
            )));
        }
        if parent == child {
            return Err(DynamicsError::Topology(format!(
                "joint '{name}' connects link {parent} to itself"
            )));
        }
        let id = JointId(self.joints.len());
        let joint = Joint::new(
            id,
            name,
            w_t_j,
            self.link(parent)?,
            self.link(child)?,
            params,
            kind,
        );
        self.joints.push(joint);
        self.joint_names.insert(name.to_string(), id);
        debug!(joint = name, id = id.0, parent = parent.0, child = child.0, "joint registered");
        Ok(id)
    }

    pub fn link(&self, id: LinkId) -> DynamicsResult<&Link> {
        self.links
            .get(id.0)
            .ok_or_else(|| DynamicsError::Topology(format!("unknown link id {id}")))
    }

    pub fn link_by_name(&self, name: &str) -> DynamicsResult<&Link> {
        let id = self
            .link_names
            .get(name)
            .ok_or_else(|| DynamicsError::Topology(format!("unknown link '{name}'")))?;
        self.link(*id)
    }

    pub fn joint(&self, id: JointId) -> DynamicsResult<&Joint> {
        self.joints
            .get(id.0)
            .ok_or_else(|| DynamicsError::Topology(format!("unknown joint id {id}")))
    }

    pub fn joint_by_name(&self, name: &str) -> DynamicsResult<&Joint> {
        let id = self
            .joint_names
            .get(name)
            .ok_or_else(|| DynamicsError::Topology(format!("unknown joint '{name}'")))?;
        self.joint(*id)
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn num_links(&self) -> usize {
        self.links.len()
    }

    pub fn num_joints(&self) -> usize {
        self.joints.len()
    }

    /// Joints attached to `link`, in registration order.
    pub fn joints_of(&self, link: LinkId) -> Vec<&Joint> {
        self.joints
            .iter()
            .filter(|joint| joint.is_adjacent(link))
            .collect()
    }

    /// Checked counterpart of [`Joint::other_link`].
    pub fn other_link(&self, joint: JointId, link: LinkId) -> DynamicsResult<LinkId> {
        let joint = self.adjacent_joint(joint, link)?;
        Ok(joint.other_link(link))
    }

    /// Checked counterpart of [`Joint::is_child_link`].
    pub fn is_child(&self, joint: JointId, link: LinkId) -> DynamicsResult<bool> {
        let joint = self.adjacent_joint(joint, link)?;
        Ok(joint.is_child_link(link))
    }

    fn adjacent_joint(&self, joint: JointId, link: LinkId) -> DynamicsResult<&Joint> {
        let joint = self.joint(joint)?;
        if !joint.is_adjacent(link) {
            return Err(DynamicsError::Topology(format!(
                "link {link} is not adjacent to joint '{}'",
                joint.name()
            )));
        }
        Ok(joint)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::manifold::LieGroup;
    use nalgebra::Vector3;

    fn two_link_robot() -> (Robot, LinkId, LinkId, JointId) {
        let mut robot = Robot::new();
        let l1 = robot
            .add_link(
                "l1",
                1.0,
                Matrix3::identity(),
                SE3::from_translation_euler(0.0, 0.0, 1.0, 0.0, 0.0, 0.0),
            )
            .unwrap();
        let l2 = robot
            .add_link(
                "l2",
                1.0,
                Matrix3::identity(),
                SE3::from_translation_euler(0.0, 0.0, 3.0, 0.0, 0.0, 0.0),
            )
            .unwrap();
        let j1 = robot
            .add_joint(
                "j1",
                SE3::from_translation_euler(0.0, 0.0, 2.0, 0.0, 0.0, 0.0),
                l1,
                l2,
                JointParams::default(),
                JointKind::Revolute { axis: Vector3::x() },
            )
            .unwrap();
        (robot, l1, l2, j1)
    }

    #[test]
    fn test_lookup_and_adjacency() {
        let (robot, l1, l2, j1) = two_link_robot();
        assert_eq!(robot.num_links(), 2);
        assert_eq!(robot.num_joints(), 1);
        assert_eq!(robot.link_by_name("l2").unwrap().id(), l2);
        assert_eq!(robot.joint_by_name("j1").unwrap().id(), j1);
        assert_eq!(robot.other_link(j1, l1).unwrap(), l2);
        assert_eq!(robot.other_link(j1, l2).unwrap(), l1);
        assert!(robot.is_child(j1, l2).unwrap());
        assert!(!robot.is_child(j1, l1).unwrap());
        assert_eq!(robot.joints_of(l1).len(), 1);
        assert_eq!(robot.joint(j1).unwrap().links(), [l1, l2]);
    }

    #[test]
    fn test_topology_errors() {
        let (mut robot, l1, _, j1) = two_link_robot();
        let l3 = robot
            .add_link("l3", 1.0, Matrix3::identity(), SE3::identity())
            .unwrap();

        assert!(matches!(
            robot.add_link("l1", 1.0, Matrix3::identity(), SE3::identity()),
            Err(DynamicsError::Topology(_))
        ));
        assert!(matches!(
            robot.add_joint(
                "self",
                SE3::identity(),
                l1,
                l1,
                JointParams::default(),
                JointKind::Fixed
            ),
            Err(DynamicsError::Topology(_))
        ));
        assert!(matches!(
            robot.add_joint(
                "dangling",
                SE3::identity(),
                l1,
                LinkId(42),
                JointParams::default(),
                JointKind::Fixed
            ),
            Err(DynamicsError::Topology(_))
        ));
        assert!(matches!(
            robot.other_link(j1, l3),
            Err(DynamicsError::Topology(_))
        ));
        assert!(robot.link_by_name("missing").is_err());
    }
}
