//! Double-entry ledger posting.
//!
//! This module implements the bookkeeping core:
//! - Segment-composed account identifiers
//! - Transaction and line domain types
//! - Posting rules (balance, line shape, account usability, period locks)
//! - The `Draft -> Posted` lifecycle and reversal
//! - The storage seam the posting service runs against
//! - The built-in balance-cascade engine profile

pub mod error;
pub mod profile;
pub mod segments;
pub mod service;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod segments_props;

#[cfg(test)]
mod service_props;

pub use error::LedgerError;
pub use profile::{posting_engine, COL_BALANCE, KIND_ACCOUNT, KIND_LEDGER_LINE};
pub use segments::{AccountCode, SegmentDefinition, SegmentSchema};
pub use service::{LedgerPostingService, PostingOutcome};
pub use store::{LedgerStore, StoredTransaction};
pub use types::{
    AccountRecord, CreateTransactionInput, EntrySide, LineInput, TransactionHeader,
    TransactionKind, TransactionLine, TransactionStatus, TransactionTotals,
    UpdateTransactionInput,
};
