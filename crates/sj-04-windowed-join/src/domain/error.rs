//! Error types for the windowed join.

use thiserror::Error;

/// Join construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("Invalid join configuration: {0}")]
    InvalidConfig(String),
}

/// Window buffer errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// The key already holds `bound` entries and the policy refuses new ones.
    #[error("Per-key bound of {bound} entries exceeded for key `{key}`")]
    Overflow { key: String, bound: usize },
}
