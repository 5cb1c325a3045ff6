//! Typed recompute expressions.

use rust_decimal::Decimal;

use keel_shared::types::{Money, RecordId};

use crate::engine::error::EngineError;
use crate::engine::store::RecordStore;
use crate::graph::RecordKind;

/// One authoritative recomputation rule for an aggregate column.
///
/// Rules are pure functions of persisted child rows: deterministic,
/// side-effect-free, and evaluated as a single set-based read per parent
/// row. Rows that vanish between the mutation and the recompute simply
/// contribute zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateExpr {
    /// Sum of one child column across rows linking to the parent.
    SumOf {
        /// The child record kind the rule reads.
        child: RecordKind,
        /// The child column being summed.
        column: String,
    },

    /// Number of linked child rows, carried as a Money scalar so every
    /// aggregate column shares one storage type.
    CountOf {
        /// The child record kind the rule reads.
        child: RecordKind,
    },

    /// sum(debit column) - sum(credit column) across linked child rows.
    /// This is the account-balance rule.
    NetOf {
        /// The child record kind the rule reads.
        child: RecordKind,
        /// Column holding debit amounts.
        debit_column: String,
        /// Column holding credit amounts.
        credit_column: String,
    },
}

impl AggregateExpr {
    /// The child kind this rule reads from.
    #[must_use]
    pub fn child_kind(&self) -> RecordKind {
        match self {
            Self::SumOf { child, .. } | Self::CountOf { child } | Self::NetOf { child, .. } => {
                *child
            }
        }
    }

    /// Computes the authoritative value for one parent row.
    ///
    /// # Errors
    ///
    /// Propagates store failures; the enclosing cascade aborts.
    pub fn compute(
        &self,
        store: &dyn RecordStore,
        parent: RecordKind,
        parent_id: RecordId,
    ) -> Result<Money, EngineError> {
        match self {
            Self::SumOf { child, column } => {
                store.sum_children(*child, column, parent, parent_id)
            }
            Self::CountOf { child } => {
                let count = store.count_children(*child, parent, parent_id)?;
                Ok(Money::new(Decimal::from(count)))
            }
            Self::NetOf {
                child,
                debit_column,
                credit_column,
            } => store.net_children(*child, debit_column, credit_column, parent, parent_id),
        }
    }
}

impl std::fmt::Display for AggregateExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SumOf { child, column } => write!(f, "sum({child}.{column})"),
            Self::CountOf { child } => write!(f, "count({child})"),
            Self::NetOf {
                child,
                debit_column,
                credit_column,
            } => write!(f, "sum({child}.{debit_column}) - sum({child}.{credit_column})"),
        }
    }
}
