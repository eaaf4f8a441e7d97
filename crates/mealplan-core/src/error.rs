//! Error taxonomy for plan generation and shopping consolidation.
//!
//! Degradation of the optional external services (rationale text, shopping
//! reordering) is deliberately *not* represented here: those calls always
//! resolve via a documented fallback and are only logged as warnings.

use thiserror::Error;
use uuid::Uuid;

use crate::history::HistoryError;

/// Errors surfaced by the plan-generation and shopping-list operations.
#[derive(Debug, Error)]
pub enum PlanError {
    /// A caller-supplied bound was violated. Named so the caller can see
    /// exactly which constraint failed; never retried or clamped.
    #[error("invalid parameter {name:?}: {message}")]
    InvalidParameter { name: &'static str, message: String },

    /// The recipe corpus contains no recipes at all.
    #[error("recipe corpus is empty")]
    EmptyCorpus,

    /// The eligible pool (after hard preference filters) cannot satisfy the
    /// requested day count under the repeat-spread invariant.
    #[error("not enough eligible recipes: need at least {required}, have {available}")]
    InsufficientRecipes { required: usize, available: usize },

    /// The referenced generation batch does not exist (or has expired).
    #[error("unknown generation batch {0}")]
    UnknownBatch(Uuid),

    /// The referenced candidate does not exist within the batch.
    #[error("unknown plan candidate {0}")]
    UnknownCandidate(Uuid),

    /// Selection history read or write failed. Write conflicts are retried
    /// once with a fresh snapshot before surfacing.
    #[error(transparent)]
    History(#[from] HistoryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_parameter_names_constraint() {
        let err = PlanError::InvalidParameter {
            name: "days",
            message: "must be between 1 and 14, got 20".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("days"));
        assert!(msg.contains("got 20"));
    }

    #[test]
    fn insufficient_recipes_reports_counts() {
        let err = PlanError::InsufficientRecipes {
            required: 5,
            available: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains('5'));
        assert!(msg.contains('2'));
    }
}
