use std::collections::HashMap;

use crate::core::keys::Key;
use crate::error::{DynamicsError, DynamicsResult};
use crate::manifold::{LieGroup, ManifoldError};
use crate::manifold::se3::{SE3, SE3Tangent};
use nalgebra::{DVector, Vector6};

/// Represents the different types of values a variable can hold
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Joint coordinate, its derivatives, or a torque
    Scalar(f64),
    /// Twist, twist acceleration or wrench
    Vector6(Vector6<f64>),
    /// Link pose
    Pose(SE3),
}

impl Value {
    /// Name of the value kind, used in type mismatch errors
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Scalar(_) => "scalar",
            Value::Vector6(_) => "vector6",
            Value::Pose(_) => "pose",
        }
    }

    /// Tangent-space dimension
    pub fn dim(&self) -> usize {
        match self {
            Value::Scalar(_) => 1,
            Value::Vector6(_) => 6,
            Value::Pose(_) => SE3::DOF,
        }
    }

    /// Parameter vector handed to factors. Poses use `[tx, ty, tz, qw, qx, qy, qz]`.
    pub fn to_dvector(&self) -> DVector<f64> {
        match self {
            Value::Scalar(x) => DVector::from_element(1, *x),
            Value::Vector6(v) => DVector::from_column_slice(v.as_slice()),
            Value::Pose(pose) => pose.clone().into(),
        }
    }

    /// Plus operation: apply a tangent space perturbation
    pub fn plus(&self, tangent: &DVector<f64>) -> Value {
        match self {
            Value::Scalar(x) => Value::Scalar(x + tangent[0]),
            Value::Vector6(v) => Value::Vector6(v + Vector6::from_column_slice(tangent.as_slice())),
            Value::Pose(pose) => {
                let tangent = SE3Tangent::from(tangent.clone());
                Value::Pose(pose.right_plus(&tangent, None, None))
            }
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Scalar(value)
    }
}

impl From<Vector6<f64>> for Value {
    fn from(value: Vector6<f64>) -> Self {
        Value::Vector6(value)
    }
}

impl From<SE3> for Value {
    fn from(value: SE3) -> Self {
        Value::Pose(value)
    }
}

/// Key-value store of variable assignments.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Values {
    values: HashMap<Key, Value>,
}

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, returning the previous one if the key was present.
    pub fn insert(&mut self, key: Key, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key, value.into())
    }

    pub fn get(&self, key: &Key) -> Option<&Value> {
        self.values.get(key)
    }

    /// Like [`get`](Self::get) but fails with [`DynamicsError::MissingVariable`].
    pub fn at(&self, key: &Key) -> DynamicsResult<&Value> {
        self.values
            .get(key)
            .ok_or(DynamicsError::MissingVariable(*key))
    }

    pub fn scalar(&self, key: &Key) -> DynamicsResult<f64> {
        match self.at(key)? {
            Value::Scalar(x) => Ok(*x),
            other => Err(type_mismatch(key, "scalar", other)),
        }
    }

    pub fn vector6(&self, key: &Key) -> DynamicsResult<Vector6<f64>> {
        match self.at(key)? {
            Value::Vector6(v) => Ok(*v),
            other => Err(type_mismatch(key, "vector6", other)),
        }
    }

    pub fn pose(&self, key: &Key) -> DynamicsResult<SE3> {
        match self.at(key)? {
            Value::Pose(pose) => Ok(pose.clone()),
            other => Err(type_mismatch(key, "pose", other)),
        }
    }

    /// Scalar lookup that falls back to `default` when the key is absent.
    pub fn scalar_or(&self, key: &Key, default: f64) -> DynamicsResult<f64> {
        if self.contains(key) {
            self.scalar(key)
        } else {
            Ok(default)
        }
    }

    /// Vector lookup that falls back to zero when the key is absent.
    pub fn vector6_or_zero(&self, key: &Key) -> DynamicsResult<Vector6<f64>> {
        if self.contains(key) {
            self.vector6(key)
        } else {
            Ok(Vector6::zeros())
        }
    }

    /// Like [`at`](Self::at) but also fails with
    /// [`DynamicsError::TypeMismatch`] when the value is not of the key's kind.
    pub fn checked(&self, key: &Key) -> DynamicsResult<&Value> {
        let value = self.at(key)?;
        if value.kind_name() != key.value_kind() {
            return Err(type_mismatch(key, key.value_kind(), value));
        }
        Ok(value)
    }

    /// Factor parameter vector for `key`.
    pub fn parameter(&self, key: &Key) -> DynamicsResult<DVector<f64>> {
        Ok(self.checked(key)?.to_dvector())
    }

    /// Retract the value at `key` by a tangent perturbation.
    pub fn retract(&mut self, key: &Key, tangent: &DVector<f64>) -> DynamicsResult<()> {
        let value = self.checked(key)?;
        if tangent.len() != value.dim() {
            return Err(ManifoldError::InvalidTangentDimension {
                expected: value.dim(),
                actual: tangent.len(),
            }
            .into());
        }
        let updated = value.plus(tangent);
        self.values.insert(*key, updated);
        Ok(())
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.values.iter()
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> Vec<Key> {
        let mut keys: Vec<Key> = self.values.keys().copied().collect();
        keys.sort();
        keys
    }
}

impl Extend<(Key, Value)> for Values {
    fn extend<I: IntoIterator<Item = (Key, Value)>>(&mut self, iter: I) {
        self.values.extend(iter);
    }
}

fn type_mismatch(key: &Key, expected: &'static str, actual: &Value) -> DynamicsError {
    DynamicsError::TypeMismatch {
        key: *key,
        expected,
        actual: actual.kind_name(),
    }
}
