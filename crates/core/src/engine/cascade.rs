//! Cascading recomputation of aggregate columns.

use std::collections::{BTreeSet, VecDeque};

use tracing::{debug, warn};

use keel_shared::types::{Money, RecordId};

use super::error::EngineError;
use super::store::RecordStore;
use crate::aggregate::AggregateColumnCatalog;
use crate::graph::{DependencyGraph, RecordKind};

/// Summary of one cascade run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    /// Number of (kind, ids) waves processed.
    pub waves: u32,
    /// Number of (rule, row) recomputations performed.
    pub recomputed: u64,
    /// Number of column values that actually changed and were written.
    pub written: u64,
}

impl CascadeReport {
    /// Returns true if the run found everything already consistent.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.written == 0
    }
}

/// One persisted value that disagrees with its authoritative rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discrepancy {
    /// Record kind of the offending row.
    pub kind: RecordKind,
    /// Id of the offending row.
    pub id: RecordId,
    /// The aggregate column.
    pub column: String,
    /// The value at rest (`None` if never written).
    pub stored: Option<Money>,
    /// The freshly computed value.
    pub computed: Money,
}

impl std::fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.stored {
            Some(stored) => write!(
                f,
                "{}.{} for {}: stored {stored}, computed {}",
                self.kind, self.column, self.id, self.computed
            ),
            None => write!(
                f,
                "{}.{} for {}: never computed, expected {}",
                self.kind, self.column, self.id, self.computed
            ),
        }
    }
}

/// Orchestrates bottom-up, upward-propagating recomputation.
///
/// Constructed once at startup from the static graph and catalog, then
/// injected explicitly into anything that needs to trigger a cascade. There
/// is no ambient/global instance.
#[derive(Debug, Clone)]
pub struct ConsistencyEngine {
    graph: DependencyGraph,
    catalog: AggregateColumnCatalog,
}

impl ConsistencyEngine {
    /// Builds the engine, cross-checking catalog against graph.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownKind`] if a rule is registered for a
    /// kind the graph does not contain, or [`EngineError::RuleWithoutLink`]
    /// if a rule reads a child kind with no declared dependency link.
    pub fn new(
        graph: DependencyGraph,
        catalog: AggregateColumnCatalog,
    ) -> Result<Self, EngineError> {
        for kind in catalog.kinds() {
            if !graph.contains(kind) {
                return Err(EngineError::UnknownKind(kind));
            }
            let children = graph.children_of(kind);
            for (_, expr) in catalog.rules_for(kind) {
                let child = expr.child_kind();
                if !children.contains(&child) {
                    return Err(EngineError::RuleWithoutLink { kind, child });
                }
            }
        }
        Ok(Self { graph, catalog })
    }

    /// The dependency graph the engine walks.
    #[must_use]
    pub const fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// The rule catalog the engine evaluates.
    #[must_use]
    pub const fn catalog(&self) -> &AggregateColumnCatalog {
        &self.catalog
    }

    /// Propagates a mutation of the given rows upward until stable.
    ///
    /// The changed rows' own aggregate columns are recomputed first, then
    /// every ancestor kind is recomputed for the rows that reference the
    /// changed ids. Only rows whose persisted value actually changed keep
    /// propagating, so re-running the cascade when nothing changed is a
    /// no-op and the work stays bounded to the affected branch.
    ///
    /// # Errors
    ///
    /// Propagates store failures; the caller's enclosing transaction rolls
    /// back and may retry the whole operation.
    pub fn cascade_from_children(
        &self,
        store: &dyn RecordStore,
        kind: RecordKind,
        ids: &[RecordId],
    ) -> Result<CascadeReport, EngineError> {
        let mut report = CascadeReport::default();
        let initial: Vec<RecordId> = dedup(ids);
        if initial.is_empty() {
            return Ok(report);
        }

        // (kind, ids to recompute, treat-all-as-dirty). The mutation itself
        // dirtied the initial ids even when their kind has no rules.
        let mut queue: VecDeque<(RecordKind, Vec<RecordId>, bool)> = VecDeque::new();
        queue.push_back((kind, initial, true));

        while let Some((wave_kind, wave_ids, force_dirty)) = queue.pop_front() {
            if wave_ids.is_empty() {
                continue;
            }
            report.waves += 1;
            let changed = self.recompute_wave(store, wave_kind, &wave_ids, &mut report)?;
            debug!(
                kind = %wave_kind,
                rows = wave_ids.len(),
                changed = changed.len(),
                "cascade wave"
            );

            let dirty: Vec<RecordId> = if force_dirty {
                wave_ids
            } else {
                changed.into_iter().collect()
            };
            if dirty.is_empty() {
                continue;
            }
            for parent in self.graph.parents_of(wave_kind) {
                let parent_ids = store.parents_of(wave_kind, &dirty, parent)?;
                queue.push_back((parent, dedup(&parent_ids), false));
            }
        }
        Ok(report)
    }

    /// Read-only check of one kind's aggregate columns.
    ///
    /// Compares persisted values against freshly computed ones and reports
    /// every mismatch. Never mutates; a discrepancy is corrected only by an
    /// explicit cascade call.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn verify_model(
        &self,
        store: &dyn RecordStore,
        kind: RecordKind,
        ids: Option<&[RecordId]>,
    ) -> Result<Vec<Discrepancy>, EngineError> {
        let ids: Vec<RecordId> = match ids {
            Some(ids) => dedup(ids),
            None => store.list_ids(kind)?,
        };

        let mut discrepancies = Vec::new();
        for (column, expr) in self.catalog.rules_for(kind) {
            for &id in &ids {
                if !store.record_exists(kind, id)? {
                    continue;
                }
                let computed = expr.compute(store, kind, id)?;
                let stored = store.read_column(kind, id, column)?;
                if stored != Some(computed) {
                    let discrepancy = Discrepancy {
                        kind,
                        id,
                        column: column.to_string(),
                        stored,
                        computed,
                    };
                    warn!(%discrepancy, "aggregate discrepancy");
                    discrepancies.push(discrepancy);
                }
            }
        }
        Ok(discrepancies)
    }

    /// Read-only check of every kind in the graph, in BFS order.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub fn verify_all(&self, store: &dyn RecordStore) -> Result<Vec<Discrepancy>, EngineError> {
        let mut discrepancies = Vec::new();
        for kind in self.graph.kinds_breadth_first() {
            discrepancies.extend(self.verify_model(store, kind, None)?);
        }
        Ok(discrepancies)
    }

    /// Recomputes every registered column for the given rows; returns the
    /// ids whose persisted value changed.
    fn recompute_wave(
        &self,
        store: &dyn RecordStore,
        kind: RecordKind,
        ids: &[RecordId],
        report: &mut CascadeReport,
    ) -> Result<BTreeSet<RecordId>, EngineError> {
        let mut changed = BTreeSet::new();
        for (column, expr) in self.catalog.rules_for(kind) {
            for &id in ids {
                // Race with a concurrent delete: the row is gone, nothing
                // to correct on it.
                if !store.record_exists(kind, id)? {
                    continue;
                }
                report.recomputed += 1;
                let fresh = expr.compute(store, kind, id)?;
                let stored = store.read_column(kind, id, column)?;
                if stored != Some(fresh) {
                    store.write_column(kind, id, column, fresh)?;
                    report.written += 1;
                    changed.insert(id);
                }
            }
        }
        Ok(changed)
    }
}

fn dedup(ids: &[RecordId]) -> Vec<RecordId> {
    let mut seen = BTreeSet::new();
    ids.iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}
