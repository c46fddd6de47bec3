//! Linear relations and order-preserving sequential elimination.
//!
//! A [`LinearSystem`] is a list of Gaussian relations `Σ A_k x_k = b` over
//! keyed vector variables. [`eliminate_sequential`] reduces it to a
//! [`BayesNet`] of [`Conditional`]s, one per variable, in exactly the
//! caller's order. The keys are generic so the same machinery works on the
//! dynamics [`Key`](crate::core::keys::Key) or on plain integers.

pub mod elimination;

pub use elimination::eliminate_sequential;

use crate::core::noise::NoiseModel;
use nalgebra::{DMatrix, DVector};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use thiserror::Error;

/// Bounds required of variable keys in the linear layer.
pub trait EliminationKey: Clone + Eq + Hash + Ord + fmt::Debug + fmt::Display {}

impl<K> EliminationKey for K where K: Clone + Eq + Hash + Ord + fmt::Debug + fmt::Display {}

/// Structural failures of a linear relation system.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EliminationError {
    /// No relation touches the variable, or too few rows to determine it
    #[error("Variable {key} is under-determined")]
    UnderDetermined { key: String },

    /// The variable's reduced diagonal block has a zero pivot
    #[error("Variable {key} has a singular conditional")]
    Singular { key: String },

    /// Block sizes disagree with each other or with the right-hand side
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Relations still reference a variable absent from the ordering
    #[error("Variable {key} is not in the elimination ordering")]
    NotInOrdering { key: String },

    /// A solution map lacks a value needed for evaluation
    #[error("No solution value for variable {key}")]
    MissingSolution { key: String },
}

/// A single Gaussian relation `Σ A_k x_k = b` with its noise model.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRelation<K> {
    blocks: Vec<(K, DMatrix<f64>)>,
    rhs: DVector<f64>,
    noise: NoiseModel,
}

impl<K: EliminationKey> LinearRelation<K> {
    pub fn new(
        blocks: Vec<(K, DMatrix<f64>)>,
        rhs: DVector<f64>,
        noise: NoiseModel,
    ) -> Result<Self, EliminationError> {
        if noise.dim() != rhs.len() {
            return Err(EliminationError::DimensionMismatch(format!(
                "noise model has dimension {}, right-hand side has {} rows",
                noise.dim(),
                rhs.len()
            )));
        }
        for (i, (key, block)) in blocks.iter().enumerate() {
            if block.nrows() != rhs.len() {
                return Err(EliminationError::DimensionMismatch(format!(
                    "block for {key} has {} rows, right-hand side has {}",
                    block.nrows(),
                    rhs.len()
                )));
            }
            if blocks[..i].iter().any(|(other, _)| other == key) {
                return Err(EliminationError::DimensionMismatch(format!(
                    "variable {key} appears twice in one relation"
                )));
            }
        }
        Ok(Self { blocks, rhs, noise })
    }

    /// `A x = b`
    pub fn unary(
        key: K,
        a: DMatrix<f64>,
        b: DVector<f64>,
        noise: NoiseModel,
    ) -> Result<Self, EliminationError> {
        Self::new(vec![(key, a)], b, noise)
    }

    /// `A1 x1 + A2 x2 = b`
    pub fn binary(
        key1: K,
        a1: DMatrix<f64>,
        key2: K,
        a2: DMatrix<f64>,
        b: DVector<f64>,
        noise: NoiseModel,
    ) -> Result<Self, EliminationError> {
        Self::new(vec![(key1, a1), (key2, a2)], b, noise)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.blocks.iter().map(|(key, _)| key)
    }

    pub fn blocks(&self) -> &[(K, DMatrix<f64>)] {
        &self.blocks
    }

    pub fn block(&self, key: &K) -> Option<&DMatrix<f64>> {
        self.blocks
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, block)| block)
    }

    pub fn rhs(&self) -> &DVector<f64> {
        &self.rhs
    }

    pub fn noise(&self) -> &NoiseModel {
        &self.noise
    }

    pub fn rows(&self) -> usize {
        self.rhs.len()
    }

    pub fn involves(&self, key: &K) -> bool {
        self.blocks.iter().any(|(k, _)| k == key)
    }

    /// The same relation with the noise model folded into the blocks.
    pub fn whitened(&self) -> Self {
        Self {
            blocks: self
                .blocks
                .iter()
                .map(|(key, block)| (key.clone(), self.noise.whiten_jacobian(block)))
                .collect(),
            rhs: self.noise.whiten(&self.rhs),
            noise: NoiseModel::unit(self.rhs.len()),
        }
    }

    /// Unwhitened residual `Σ A_k x_k - b`.
    pub fn residual(&self, solution: &HashMap<K, DVector<f64>>) -> Result<DVector<f64>, EliminationError> {
        let mut residual = -self.rhs.clone();
        for (key, block) in &self.blocks {
            let value = solution
                .get(key)
                .ok_or_else(|| EliminationError::MissingSolution {
                    key: key.to_string(),
                })?;
            if value.len() != block.ncols() {
                return Err(EliminationError::DimensionMismatch(format!(
                    "solution for {key} has {} entries, block expects {}",
                    value.len(),
                    block.ncols()
                )));
            }
            residual += block * value;
        }
        Ok(residual)
    }

    /// ½‖whitened residual‖²
    pub fn error(&self, solution: &HashMap<K, DVector<f64>>) -> Result<f64, EliminationError> {
        Ok(0.5 * self.noise.whiten(&self.residual(solution)?).norm_squared())
    }
}

/// Ordered collection of linear relations.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearSystem<K> {
    relations: Vec<LinearRelation<K>>,
}

impl<K> Default for LinearSystem<K> {
    fn default() -> Self {
        Self {
            relations: Vec::new(),
        }
    }
}

impl<K: EliminationKey> LinearSystem<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, relation: LinearRelation<K>) {
        self.relations.push(relation);
    }

    /// Append every relation of `other`, keeping its order.
    pub fn extend(&mut self, other: LinearSystem<K>) {
        self.relations.extend(other.relations);
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LinearRelation<K>> {
        self.relations.iter()
    }

    /// Keys in order of first appearance.
    pub fn keys(&self) -> Vec<K> {
        let mut keys: Vec<K> = Vec::new();
        for key in self.relations.iter().flat_map(|relation| relation.keys()) {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        keys
    }

    /// Total ½‖whitened residual‖² over all relations.
    pub fn error(&self, solution: &HashMap<K, DVector<f64>>) -> Result<f64, EliminationError> {
        self.relations
            .iter()
            .map(|relation| relation.error(solution))
            .sum()
    }
}

/// `R x_frontal + Σ S_j x_parent_j = d`, with `R` upper triangular.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional<K> {
    frontal: K,
    r: DMatrix<f64>,
    parents: Vec<(K, DMatrix<f64>)>,
    d: DVector<f64>,
}

impl<K: EliminationKey> Conditional<K> {
    pub fn new(frontal: K, r: DMatrix<f64>, parents: Vec<(K, DMatrix<f64>)>, d: DVector<f64>) -> Self {
        Self {
            frontal,
            r,
            parents,
            d,
        }
    }

    pub fn frontal(&self) -> &K {
        &self.frontal
    }

    pub fn r(&self) -> &DMatrix<f64> {
        &self.r
    }

    pub fn parents(&self) -> &[(K, DMatrix<f64>)] {
        &self.parents
    }

    pub fn d(&self) -> &DVector<f64> {
        &self.d
    }

    /// Solve for the frontal variable given values of all parents.
    pub fn solve(&self, solution: &HashMap<K, DVector<f64>>) -> Result<DVector<f64>, EliminationError> {
        let mut rhs = self.d.clone();
        for (key, s) in &self.parents {
            let value = solution
                .get(key)
                .ok_or_else(|| EliminationError::MissingSolution {
                    key: key.to_string(),
                })?;
            rhs -= s * value;
        }
        self.r
            .solve_upper_triangular(&rhs)
            .ok_or_else(|| EliminationError::Singular {
                key: self.frontal.to_string(),
            })
    }
}

/// Conditionals in elimination order.
#[derive(Debug, Clone, PartialEq)]
pub struct BayesNet<K> {
    conditionals: Vec<Conditional<K>>,
}

impl<K: EliminationKey> BayesNet<K> {
    pub fn new(conditionals: Vec<Conditional<K>>) -> Self {
        Self { conditionals }
    }

    pub fn len(&self) -> usize {
        self.conditionals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditionals.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Conditional<K>> {
        self.conditionals.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Conditional<K>> {
        self.conditionals.get(index)
    }

    /// Frontal keys in elimination order.
    pub fn ordering(&self) -> Vec<K> {
        self.conditionals
            .iter()
            .map(|conditional| conditional.frontal.clone())
            .collect()
    }

    /// Back-substitute from the last conditional to the first.
    pub fn solve(&self) -> Result<HashMap<K, DVector<f64>>, EliminationError> {
        let mut solution = HashMap::with_capacity(self.conditionals.len());
        for conditional in self.conditionals.iter().rev() {
            let value = conditional.solve(&solution)?;
            solution.insert(conditional.frontal.clone(), value);
        }
        Ok(solution)
    }
}
