//! Relation builder: the residual blocks contributed by one joint at one
//! time step.
//!
//! Nonlinear families come back as a [`RelationSet`] ready for an external
//! least-squares solver. The `linear_*` methods linearize the same physics
//! around known poses and twists and emit [`LinearRelation`]s for
//! [`eliminate_sequential`](crate::linalg::eliminate_sequential).
//!
//! | Family | Keys | Noise |
//! |---|---|---|
//! | pose | `p(parent)`, `p(child)`, `q` | `pose_sigma` |
//! | twist | `V(parent)`, `V(child)`, `q`, `v` | `twist_sigma` |
//! | twist acceleration | `V(child)`, `A(parent)`, `A(child)`, `q`, `v`, `a` | hard |
//! | torque | `F(child)`, `T` | `torque_sigma` |
//! | wrench equivalence | `F(parent)`, `F(child)`, `q` | `wrench_sigma` |
//! | planar wrench | `F(child)` | `wrench_sigma` |
//! | limits | `q`, `v`, `a`, `T` | `joint_limit_sigma` |
//! | forward-dynamics prior | `T` | hard |

use crate::config::RelationConfig;
use crate::core::{Key, NoiseModel, RelationBlock, RelationSet, Values};
use crate::error::{DynamicsError, DynamicsResult};
use crate::factors::{
    JointLimitFactor, PoseFactor, PriorFactor, TorqueFactor, TwistAccelFactor, TwistFactor,
    WrenchEquivalenceFactor, WrenchPlanarFactor,
};
use crate::linalg::{LinearRelation, LinearSystem};
use crate::manifold::LieGroup;
use crate::manifold::se3::SE3;
use crate::robot::{Joint, JointEffortType, JointKind};
use crate::spatial;
use nalgebra::{DMatrix, DVector, Matrix6, SMatrix};
use std::collections::HashMap;
use tracing::debug;

pub use crate::factors::PlanarAxis;

fn dmatrix<const R: usize, const C: usize>(matrix: &SMatrix<f64, R, C>) -> DMatrix<f64> {
    DMatrix::from_column_slice(R, C, matrix.as_slice())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationBuilder {
    config: RelationConfig,
    planar_axis: Option<PlanarAxis>,
}

impl RelationBuilder {
    pub fn new(config: RelationConfig) -> Self {
        Self {
            config,
            planar_axis: None,
        }
    }

    /// Restrict wrenches to planar motion normal to `axis`.
    pub fn with_planar_axis(mut self, axis: PlanarAxis) -> Self {
        self.planar_axis = Some(axis);
        self
    }

    pub fn config(&self) -> &RelationConfig {
        &self.config
    }

    pub fn planar_axis(&self) -> Option<PlanarAxis> {
        self.planar_axis
    }

    fn pose_key(joint: &Joint, parent: bool, t: usize) -> Key {
        let link = if parent { joint.parent() } else { joint.child() };
        Key::Pose { link, t }
    }

    fn twist_key(joint: &Joint, parent: bool, t: usize) -> Key {
        let link = if parent { joint.parent() } else { joint.child() };
        Key::Twist { link, t }
    }

    fn twist_accel_key(joint: &Joint, parent: bool, t: usize) -> Key {
        let link = if parent { joint.parent() } else { joint.child() };
        Key::TwistAccel { link, t }
    }

    /// `wTc = wTp · pMc(q)`
    pub fn pose_relations(&self, joint: &Joint, t: usize) -> RelationSet {
        let mut relations = RelationSet::new();
        relations.push(RelationBlock::new(
            vec![
                Self::pose_key(joint, true, t),
                Self::pose_key(joint, false, t),
                joint.angle_key(t),
            ],
            PoseFactor::new(joint.clone()),
            self.config.pose_noise(),
        ));
        relations
    }

    /// `V_c = Ad(cTp) V_p + S_c q̇`
    pub fn velocity_relations(&self, joint: &Joint, t: usize) -> RelationSet {
        let mut relations = RelationSet::new();
        relations.push(RelationBlock::new(
            vec![
                Self::twist_key(joint, true, t),
                Self::twist_key(joint, false, t),
                joint.angle_key(t),
                joint.vel_key(t),
            ],
            TwistFactor::new(joint.clone()),
            self.config.twist_noise(),
        ));
        relations
    }

    /// `A_c = Ad(cTp) A_p + ad(V_c) S_c q̇ + S_c q̈`, as a hard constraint.
    pub fn acceleration_relations(&self, joint: &Joint, t: usize) -> RelationSet {
        let mut relations = RelationSet::new();
        relations.push(RelationBlock::new(
            vec![
                Self::twist_key(joint, false, t),
                Self::twist_accel_key(joint, true, t),
                Self::twist_accel_key(joint, false, t),
                joint.angle_key(t),
                joint.vel_key(t),
                joint.accel_key(t),
            ],
            TwistAccelFactor::new(joint.clone()),
            NoiseModel::constrained(6),
        ));
        relations
    }

    /// Torque transmission, wrench equivalence and, if configured, the
    /// planar restriction on the child wrench.
    pub fn dynamics_relations(&self, joint: &Joint, t: usize) -> RelationSet {
        let wrench_p = joint.wrench_key(joint.parent(), t);
        let wrench_c = joint.wrench_key(joint.child(), t);

        let mut relations = RelationSet::new();
        relations.push(RelationBlock::new(
            vec![wrench_c, joint.torque_key(t)],
            TorqueFactor::new(joint.clone()),
            self.config.torque_noise(),
        ));
        relations.push(RelationBlock::new(
            vec![wrench_p, wrench_c, joint.angle_key(t)],
            WrenchEquivalenceFactor::new(joint.clone()),
            self.config.wrench_noise(6),
        ));
        if let Some(axis) = self.planar_axis {
            relations.push(RelationBlock::new(
                vec![wrench_c],
                WrenchPlanarFactor::new(axis),
                self.config.wrench_noise(3),
            ));
        }
        relations
    }

    /// Hinge penalties on angle, velocity, acceleration and torque.
    pub fn limit_relations(&self, joint: &Joint, t: usize) -> RelationSet {
        let params = joint.params();
        let limits = [
            (joint.angle_key(t), &params.angle_limits),
            (joint.vel_key(t), &params.velocity_limits),
            (joint.accel_key(t), &params.acceleration_limits),
            (joint.torque_key(t), &params.torque_limits),
        ];

        let mut relations = RelationSet::new();
        relations.extend(limits.into_iter().map(|(key, limit)| {
            RelationBlock::new(
                vec![key],
                JointLimitFactor::new(limit),
                self.config.joint_limit_noise(),
            )
        }));
        relations
    }

    /// Every nonlinear family for `joint` at time `t`.
    pub fn joint_relations(&self, joint: &Joint, t: usize) -> RelationSet {
        let mut relations = self.pose_relations(joint, t);
        relations.append(self.velocity_relations(joint, t));
        relations.append(self.acceleration_relations(joint, t));
        relations.append(self.dynamics_relations(joint, t));
        relations.append(self.limit_relations(joint, t));
        debug!(
            joint = joint.name(),
            t,
            relations = relations.len(),
            "built joint relations"
        );
        relations
    }

    /// Forward-dynamics torque prior as a hard [`PriorFactor`] on the
    /// joint torque, with the effort policy of
    /// [`linear_fd_priors`](Self::linear_fd_priors).
    pub fn fd_prior_relations(
        &self,
        joint: &Joint,
        t: usize,
        known: &Values,
    ) -> DynamicsResult<RelationSet> {
        let mut relations = RelationSet::new();
        if let Some(torque) = Self::fd_torque(joint, t, known)? {
            relations.push(RelationBlock::new(
                vec![joint.torque_key(t)],
                PriorFactor::scalar(torque),
                NoiseModel::constrained(1),
            ));
        }
        Ok(relations)
    }

    /// Torque a forward-dynamics prior fixes, if the effort type takes one.
    fn fd_torque(joint: &Joint, t: usize, known: &Values) -> DynamicsResult<Option<f64>> {
        match joint.params().effort_type {
            JointEffortType::Actuated => known.scalar(&joint.torque_key(t)).map(Some),
            JointEffortType::Unactuated => Ok(Some(0.0)),
            JointEffortType::Fixed => Ok(None),
        }
    }

    /// Child-from-parent pose implied by the known link poses.
    fn known_c_t_p(joint: &Joint, t: usize, known: &Values) -> DynamicsResult<SE3> {
        let w_t_p = known.pose(&Self::pose_key(joint, true, t))?;
        let w_t_c = known.pose(&Self::pose_key(joint, false, t))?;
        Ok(w_t_c.between(&w_t_p, None, None))
    }

    /// Twist acceleration relation with poses, the child twist and the joint
    /// velocity taken from `known`:
    ///
    /// ```text
    /// A_c - Ad(cTp) A_p - S_c q̈ = ad(V_c) S_c q̇
    /// ```
    ///
    /// A fixed joint has no acceleration coordinate, so its `q̈` block is left
    /// out.
    pub fn linear_acceleration_relations(
        &self,
        joint: &Joint,
        t: usize,
        known: &Values,
    ) -> DynamicsResult<LinearSystem<Key>> {
        let c_t_p = Self::known_c_t_p(joint, t, known)?;
        let twist_c = known.vector6(&Self::twist_key(joint, false, t))?;
        let q_dot = known.scalar(&joint.vel_key(t))?;
        let screw_axis = joint.screw_axis(joint.child());

        let rhs = spatial::spatial_cross(&twist_c) * screw_axis * q_dot;
        let mut blocks = vec![
            (
                Self::twist_accel_key(joint, false, t),
                DMatrix::identity(6, 6),
            ),
            (
                Self::twist_accel_key(joint, true, t),
                dmatrix(&(-spatial::adjoint_map(&c_t_p))),
            ),
        ];
        if !matches!(joint.kind(), JointKind::Fixed) {
            blocks.push((joint.accel_key(t), dmatrix(&(-screw_axis))));
        }

        let mut system = LinearSystem::new();
        system.add(LinearRelation::new(
            blocks,
            DVector::from_column_slice(rhs.as_slice()),
            NoiseModel::constrained(6),
        )?);
        debug!(joint = joint.name(), t, "built linear acceleration relations");
        Ok(system)
    }

    /// Torque transmission and wrench equivalence around the known relative
    /// pose, plus the planar restriction if configured. All hard.
    pub fn linear_dynamics_relations(
        &self,
        joint: &Joint,
        t: usize,
        known: &Values,
    ) -> DynamicsResult<LinearSystem<Key>> {
        let c_t_p = Self::known_c_t_p(joint, t, known)?;
        let screw_axis = joint.screw_axis(joint.child());
        let wrench_p = joint.wrench_key(joint.parent(), t);
        let wrench_c = joint.wrench_key(joint.child(), t);

        let mut system = LinearSystem::new();

        // S_cᵀ F_c - τ = 0
        system.add(LinearRelation::binary(
            wrench_c,
            dmatrix(&screw_axis.transpose()),
            joint.torque_key(t),
            DMatrix::from_element(1, 1, -1.0),
            DVector::zeros(1),
            NoiseModel::constrained(1),
        )?);

        // F_p + Ad(cTp)ᵀ F_c = 0
        system.add(LinearRelation::binary(
            wrench_p,
            dmatrix(&Matrix6::<f64>::identity()),
            wrench_c,
            dmatrix(&spatial::adjoint_map(&c_t_p).transpose()),
            DVector::zeros(6),
            NoiseModel::constrained(6),
        )?);

        if let Some(axis) = self.planar_axis {
            let planar = WrenchPlanarFactor::new(axis);
            system.add(LinearRelation::unary(
                wrench_c,
                dmatrix(planar.selection()),
                DVector::zeros(3),
                NoiseModel::constrained(3),
            )?);
        }

        debug!(
            joint = joint.name(),
            t,
            relations = system.len(),
            "built linear dynamics relations"
        );
        Ok(system)
    }

    fn torque_prior(joint: &Joint, t: usize, torque: f64) -> DynamicsResult<LinearSystem<Key>> {
        let mut system = LinearSystem::new();
        system.add(LinearRelation::unary(
            joint.torque_key(t),
            DMatrix::identity(1, 1),
            DVector::from_element(1, torque),
            NoiseModel::constrained(1),
        )?);
        Ok(system)
    }

    /// Forward-dynamics torque prior. Actuated joints take their torque from
    /// `known`, unactuated joints are fixed to zero torque, and joints with
    /// a fixed effort get no prior.
    pub fn linear_fd_priors(
        &self,
        joint: &Joint,
        t: usize,
        known: &Values,
    ) -> DynamicsResult<LinearSystem<Key>> {
        match Self::fd_torque(joint, t, known)? {
            Some(torque) => Self::torque_prior(joint, t, torque),
            None => Ok(LinearSystem::new()),
        }
    }

    /// [`linear_fd_priors`](Self::linear_fd_priors) with actuated torques
    /// looked up by joint name.
    pub fn linear_fd_priors_from_torques(
        &self,
        joint: &Joint,
        t: usize,
        torques: &HashMap<String, f64>,
    ) -> DynamicsResult<LinearSystem<Key>> {
        match joint.params().effort_type {
            JointEffortType::Actuated => {
                let torque = torques
                    .get(joint.name())
                    .copied()
                    .ok_or(DynamicsError::MissingVariable(joint.torque_key(t)))?;
                Self::torque_prior(joint, t, torque)
            }
            JointEffortType::Unactuated => Self::torque_prior(joint, t, 0.0),
            JointEffortType::Fixed => Ok(LinearSystem::new()),
        }
    }
}
