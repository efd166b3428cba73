//! Error types for team assignment.

use thiserror::Error;

/// Errors returned by [crate::optimizer::assign].
///
/// Infeasible inputs and exhausted search budgets are not errors: they are
/// reported through [crate::optimizer::AssignmentStatus] on a successful result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignError {
    /// The request cannot describe any team layout (no roles, no teams, ...).
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl AssignError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

pub type AssignResult<T> = Result<T, AssignError>;
