//! Residual blocks: a factor bound to the keys it reads and a noise model.

use crate::core::keys::Key;
use crate::core::noise::NoiseModel;
use crate::core::values::Values;
use crate::error::{DynamicsError, DynamicsResult};
use crate::factors::Factor;
use crate::linalg::{LinearRelation, LinearSystem};
use nalgebra::{DMatrix, DVector};

#[derive(Debug)]
pub struct RelationBlock {
    keys: Vec<Key>,
    factor: Box<dyn Factor>,
    noise: NoiseModel,
}

impl RelationBlock {
    pub fn new(keys: Vec<Key>, factor: impl Factor + 'static, noise: NoiseModel) -> Self {
        debug_assert_eq!(factor.get_dimension(), noise.dim());
        Self {
            keys,
            factor: Box::new(factor),
            noise,
        }
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn factor(&self) -> &dyn Factor {
        self.factor.as_ref()
    }

    pub fn noise(&self) -> &NoiseModel {
        &self.noise
    }

    pub fn dim(&self) -> usize {
        self.factor.get_dimension()
    }

    fn parameters(&self, values: &Values) -> DynamicsResult<Vec<DVector<f64>>> {
        self.keys.iter().map(|key| values.parameter(key)).collect()
    }

    /// Whitened residual and, optionally, whitened Jacobian.
    pub fn evaluate(
        &self,
        values: &Values,
        compute_jacobian: bool,
    ) -> DynamicsResult<(DVector<f64>, Option<DMatrix<f64>>)> {
        let params = self.parameters(values)?;
        let (residual, jacobian) = self.factor.linearize(&params, compute_jacobian);
        Ok((
            self.noise.whiten(&residual),
            jacobian.map(|jacobian| self.noise.whiten_jacobian(&jacobian)),
        ))
    }

    /// ½‖whitened residual‖²
    pub fn error(&self, values: &Values) -> DynamicsResult<f64> {
        let (residual, _) = self.evaluate(values, false)?;
        Ok(0.5 * residual.norm_squared())
    }

    /// First-order model `J δ = -r` in the tangent space at `values`.
    pub fn linearize(&self, values: &Values) -> DynamicsResult<LinearRelation<Key>> {
        let (residual, jacobian) = self.evaluate(values, true)?;
        let jacobian = jacobian.ok_or_else(|| {
            DynamicsError::InvalidInput("factor returned no Jacobian".to_string())
        })?;

        let mut blocks = Vec::with_capacity(self.keys.len());
        let mut col = 0;
        for key in &self.keys {
            let dim = key.dim();
            blocks.push((*key, jacobian.columns(col, dim).into_owned()));
            col += dim;
        }
        if col != jacobian.ncols() {
            return Err(DynamicsError::InvalidInput(format!(
                "Jacobian has {} columns, keys expect {col}",
                jacobian.ncols()
            )));
        }

        Ok(LinearRelation::new(
            blocks,
            -residual,
            NoiseModel::unit(self.dim()),
        )?)
    }
}

/// Ordered collection of residual blocks.
#[derive(Debug, Default)]
pub struct RelationSet {
    blocks: Vec<RelationBlock>,
}

impl RelationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, block: RelationBlock) {
        self.blocks.push(block);
    }

    /// Append every block of `other`, keeping its order.
    pub fn append(&mut self, other: RelationSet) {
        self.blocks.extend(other.blocks);
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RelationBlock> {
        self.blocks.iter()
    }

    /// Sorted, deduplicated keys of all blocks.
    pub fn keys(&self) -> Vec<Key> {
        let mut keys: Vec<Key> = self
            .blocks
            .iter()
            .flat_map(|block| block.keys().iter().copied())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    pub fn total_error(&self, values: &Values) -> DynamicsResult<f64> {
        self.blocks.iter().map(|block| block.error(values)).sum()
    }

    pub fn linearize(&self, values: &Values) -> DynamicsResult<LinearSystem<Key>> {
        let mut system = LinearSystem::new();
        for block in &self.blocks {
            system.add(block.linearize(values)?);
        }
        Ok(system)
    }
}

impl Extend<RelationBlock> for RelationSet {
    fn extend<I: IntoIterator<Item = RelationBlock>>(&mut self, iter: I) {
        self.blocks.extend(iter);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::factors::PriorFactor;
    use crate::robot::JointId;

    #[test]
    fn test_block_error_and_linearize() {
        let key = Key::Torque { joint: JointId(0), t: 0 };
        let block = RelationBlock::new(
            vec![key],
            PriorFactor::scalar(2.0),
            NoiseModel::isotropic(1, 0.1),
        );

        let mut values = Values::new();
        values.insert(key, 2.5);
        // residual 0.5, whitened 5, error 12.5
        assert!((block.error(&values).unwrap() - 12.5).abs() < 1e-9);

        let relation = block.linearize(&values).unwrap();
        assert!((relation.block(&key).unwrap()[(0, 0)] - 10.0).abs() < 1e-9);
        assert!((relation.rhs()[0] + 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_value_propagates() {
        let key = Key::Torque { joint: JointId(0), t: 0 };
        let mut set = RelationSet::new();
        set.push(RelationBlock::new(
            vec![key],
            PriorFactor::scalar(0.0),
            NoiseModel::unit(1),
        ));
        assert_eq!(
            set.total_error(&Values::new()),
            Err(DynamicsError::MissingVariable(key))
        );
        assert_eq!(set.keys(), vec![key]);
    }
}
