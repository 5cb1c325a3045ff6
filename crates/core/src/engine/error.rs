//! Consistency engine error types.

use thiserror::Error;

use crate::graph::{GraphError, RecordKind};

/// Errors that can occur while configuring or running the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A recompute rule was registered twice for the same column.
    #[error("Aggregate rule already registered for {kind}.{column}")]
    DuplicateRule {
        /// Record kind of the conflicting rule.
        kind: RecordKind,
        /// Column name of the conflicting rule.
        column: String,
    },

    /// The catalog references a kind the dependency graph does not know.
    #[error("Kind {0} has aggregate rules but is not in the dependency graph")]
    UnknownKind(RecordKind),

    /// A rule reads a child kind that is not declared as a dependency of
    /// its parent kind.
    #[error("Rule on {kind} reads {child}, but no {kind} -> {child} link is declared")]
    RuleWithoutLink {
        /// The kind carrying the rule.
        kind: RecordKind,
        /// The undeclared child kind the rule reads.
        child: RecordKind,
    },

    /// Dependency graph construction or mutation failed.
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Persistence store failure. The enclosing operation is aborted and may
    /// be retried as a whole.
    #[error("Store error: {0}")]
    Store(String),
}

impl EngineError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::DuplicateRule { .. } => "DUPLICATE_RULE",
            Self::UnknownKind(_) => "UNKNOWN_KIND",
            Self::RuleWithoutLink { .. } => "RULE_WITHOUT_LINK",
            Self::Graph(err) => err.error_code(),
            Self::Store(_) => "STORE_ERROR",
        }
    }
}

impl From<EngineError> for keel_shared::AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Store(message) => Self::Store(message),
            // Everything else is a wiring bug, caught at startup.
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            EngineError::DuplicateRule {
                kind: RecordKind::new("invoice"),
                column: "total".to_string(),
            }
            .error_code(),
            "DUPLICATE_RULE"
        );
        assert_eq!(
            EngineError::Store("boom".to_string()).error_code(),
            "STORE_ERROR"
        );
    }

    #[test]
    fn test_error_display() {
        let err = EngineError::DuplicateRule {
            kind: RecordKind::new("invoice"),
            column: "total".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Aggregate rule already registered for invoice.total"
        );
    }
}
