//! Store seam for the consistency engine.
//!
//! The engine never talks to a database directly; everything it needs is a
//! set-based read or a single-column write behind this trait.

use keel_shared::types::{Money, RecordId};

use super::error::EngineError;
use crate::graph::RecordKind;

/// Read/write access to tracked records and their aggregate columns.
///
/// Implementations must make every read reflect current persisted state:
/// the cascade's idempotence relies on recomputing from what is stored, not
/// on accumulating deltas. Rows deleted concurrently simply stop matching
/// and contribute zero to aggregates.
pub trait RecordStore: Send + Sync {
    /// All ids of the given kind, in a stable order.
    fn list_ids(&self, kind: RecordKind) -> Result<Vec<RecordId>, EngineError>;

    /// Returns true if the record exists.
    fn record_exists(&self, kind: RecordKind, id: RecordId) -> Result<bool, EngineError>;

    /// Current persisted value of an aggregate column, if the record exists
    /// and the column has been written.
    fn read_column(
        &self,
        kind: RecordKind,
        id: RecordId,
        column: &str,
    ) -> Result<Option<Money>, EngineError>;

    /// Persists a recomputed aggregate column value.
    fn write_column(
        &self,
        kind: RecordKind,
        id: RecordId,
        column: &str,
        value: Money,
    ) -> Result<(), EngineError>;

    /// Sum of `column` across rows of `child` whose link to `parent` points
    /// at `parent_id`. One set-based read producing one scalar.
    fn sum_children(
        &self,
        child: RecordKind,
        column: &str,
        parent: RecordKind,
        parent_id: RecordId,
    ) -> Result<Money, EngineError>;

    /// Number of rows of `child` linked to `parent_id`.
    fn count_children(
        &self,
        child: RecordKind,
        parent: RecordKind,
        parent_id: RecordId,
    ) -> Result<u64, EngineError>;

    /// sum(debit column) - sum(credit column) across matching child rows.
    ///
    /// Implementations backed by a relational store should override this
    /// with one aggregate query.
    fn net_children(
        &self,
        child: RecordKind,
        debit_column: &str,
        credit_column: &str,
        parent: RecordKind,
        parent_id: RecordId,
    ) -> Result<Money, EngineError> {
        let debits = self.sum_children(child, debit_column, parent, parent_id)?;
        let credits = self.sum_children(child, credit_column, parent, parent_id)?;
        Ok(debits - credits)
    }

    /// Distinct ids of `parent` rows referenced by the given `child` rows.
    fn parents_of(
        &self,
        child: RecordKind,
        child_ids: &[RecordId],
        parent: RecordKind,
    ) -> Result<Vec<RecordId>, EngineError>;
}
