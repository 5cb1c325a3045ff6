//! Per-kind registry of aggregate column rules.

use std::collections::BTreeMap;

use super::expr::AggregateExpr;
use crate::engine::error::EngineError;
use crate::graph::RecordKind;

/// Maps `(record kind, column name)` to its recomputation rule.
///
/// The catalog is an explicit declaration table built at startup, replacing
/// any runtime discovery of "what relates to what": a relation that is not
/// declared here does not exist as far as the engine is concerned.
#[derive(Debug, Clone, Default)]
pub struct AggregateColumnCatalog {
    rules: BTreeMap<RecordKind, BTreeMap<String, AggregateExpr>>,
}

impl AggregateColumnCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the authoritative rule for one aggregate column.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateRule`] if the column already has a
    /// rule; a column must have exactly one source of truth.
    pub fn register(
        &mut self,
        kind: RecordKind,
        column: impl Into<String>,
        expr: AggregateExpr,
    ) -> Result<(), EngineError> {
        let column = column.into();
        let columns = self.rules.entry(kind).or_default();
        if columns.contains_key(&column) {
            return Err(EngineError::DuplicateRule { kind, column });
        }
        columns.insert(column, expr);
        Ok(())
    }

    /// Rules registered for a kind, in stable column order.
    pub fn rules_for(&self, kind: RecordKind) -> impl Iterator<Item = (&str, &AggregateExpr)> {
        self.rules
            .get(&kind)
            .into_iter()
            .flatten()
            .map(|(column, expr)| (column.as_str(), expr))
    }

    /// Column names registered for a kind.
    #[must_use]
    pub fn columns_for(&self, kind: RecordKind) -> Vec<&str> {
        self.rules
            .get(&kind)
            .map(|columns| columns.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Returns true if the kind has at least one registered rule.
    #[must_use]
    pub fn has_rules(&self, kind: RecordKind) -> bool {
        self.rules.get(&kind).is_some_and(|c| !c.is_empty())
    }

    /// Kinds present in the catalog.
    pub fn kinds(&self) -> impl Iterator<Item = RecordKind> + '_ {
        self.rules.keys().copied()
    }

    /// Returns true if no rules are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.values().all(BTreeMap::is_empty)
    }
}
