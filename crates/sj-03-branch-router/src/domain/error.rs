//! Router construction errors.

use thiserror::Error;

/// Rejected router definitions. Construction stops on the first violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    #[error("Router needs at least one branch")]
    NoBranches,

    #[error("Branch {index} has an empty category name")]
    EmptyName { index: usize },

    #[error("Category `{name}` is declared more than once")]
    DuplicateCategory { name: String },
}
