//! Variables, values, noise models and residual blocks.
//!
//! This is the interface to an external solver: relation builders emit
//! [`RelationBlock`]s over [`Key`]s, and callers evaluate or linearize them
//! against a [`Values`] store.

pub mod keys;
pub mod noise;
pub mod relation;
pub mod values;

pub use keys::Key;
pub use noise::{HARD_CONSTRAINT_WEIGHT, NoiseModel};
pub use relation::{RelationBlock, RelationSet};
pub use values::{Value, Values};
