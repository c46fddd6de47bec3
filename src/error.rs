//! Error types for the apex-dynamics library
//!
//! This module provides the main error and result types used throughout the library.
//! All errors use the `thiserror` crate for automatic trait implementations.

use crate::core::keys::Key;
use crate::linalg::EliminationError;
use crate::manifold::ManifoldError;
use thiserror::Error;

/// Main result type used throughout the apex-dynamics library
pub type DynamicsResult<T> = Result<T, DynamicsError>;

/// Main error type for the apex-dynamics library
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DynamicsError {
    /// A named lookup did not find the key in the value store
    #[error("Missing variable: {0}")]
    MissingVariable(Key),

    /// The key exists but holds a value of another kind
    #[error("Type mismatch for {key}: expected {expected}, found {actual}")]
    TypeMismatch {
        key: Key,
        expected: &'static str,
        actual: &'static str,
    },

    /// Link/joint topology errors (unknown ids, duplicate names, bad adjacency)
    #[error("Topology error: {0}")]
    Topology(String),

    /// Structural failure while eliminating a linear relation system
    #[error("Elimination error: {0}")]
    Elimination(#[from] EliminationError),

    /// Manifold operations errors
    #[error("Manifold error: {0}")]
    Manifold(#[from] ManifoldError),

    /// Invalid input parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
