//! Built-in record kinds and aggregate rules for ledger posting.

use crate::aggregate::{AggregateColumnCatalog, AggregateExpr};
use crate::engine::{ConsistencyEngine, EngineError};
use crate::graph::{DependencyGraph, RecordKind};

/// Chart-of-accounts row.
pub const KIND_ACCOUNT: RecordKind = RecordKind::new("account");
/// Posted transaction line.
pub const KIND_LEDGER_LINE: RecordKind = RecordKind::new("ledger_line");

/// Aggregate column holding an account's running balance.
pub const COL_BALANCE: &str = "balance";

/// The engine configuration for account balances: each account's balance is
/// the debit-minus-credit net of its posted lines.
///
/// # Errors
///
/// Never fails for the built-in profile; the signature matches engine
/// construction so callers can extend the graph before building.
pub fn posting_engine() -> Result<ConsistencyEngine, EngineError> {
    let graph = DependencyGraph::builder()
        .link(KIND_ACCOUNT, KIND_LEDGER_LINE)
        .build()?;

    let mut catalog = AggregateColumnCatalog::new();
    catalog.register(
        KIND_ACCOUNT,
        COL_BALANCE,
        AggregateExpr::NetOf {
            child: KIND_LEDGER_LINE,
            debit_column: "debit".to_string(),
            credit_column: "credit".to_string(),
        },
    )?;

    ConsistencyEngine::new(graph, catalog)
}
