//! Persistence seam for the posting service.

use keel_shared::types::TransactionId;

use super::error::LedgerError;
use super::segments::AccountCode;
use super::types::{AccountRecord, TransactionHeader, TransactionLine};

/// A full transaction as loaded from storage.
#[derive(Debug, Clone)]
pub struct StoredTransaction {
    /// Header row.
    pub header: TransactionHeader,
    /// Lines in entry order.
    pub lines: Vec<TransactionLine>,
}

/// Storage operations the posting service depends on.
///
/// Implementations must make `insert_transaction` all-or-nothing: a header
/// is never visible without its lines.
pub trait LedgerStore: Send + Sync {
    /// Allocates the next document number. Numbers are monotonic and never
    /// reused, including for deleted drafts.
    fn next_transaction_number(&self) -> Result<i64, LedgerError>;

    /// Persists a new transaction atomically. The same line-publishing
    /// contract as [`Self::update_header`] applies when the header is
    /// already `Posted` on insert.
    fn insert_transaction(
        &self,
        header: &TransactionHeader,
        lines: &[TransactionLine],
    ) -> Result<(), LedgerError>;

    /// Loads a transaction with its lines.
    fn load_transaction(&self, id: TransactionId) -> Result<StoredTransaction, LedgerError>;

    /// Replaces the full line set of a draft.
    fn replace_lines(
        &self,
        id: TransactionId,
        lines: &[TransactionLine],
    ) -> Result<(), LedgerError>;

    /// Overwrites the header row.
    ///
    /// When the header transitions to `Posted`, the implementation must also
    /// expose the transaction's lines as `ledger_line` records linked to
    /// their accounts so aggregate recomputation can read them.
    fn update_header(&self, header: &TransactionHeader) -> Result<(), LedgerError>;

    /// Removes a transaction and its lines. Lines already exposed as
    /// `ledger_line` records must be removed with it.
    fn delete_transaction(&self, id: TransactionId) -> Result<(), LedgerError>;

    /// Looks up a chart-of-accounts entry by composed code.
    fn account(&self, code: &AccountCode) -> Result<Option<AccountRecord>, LedgerError>;

    /// Creates or updates a chart-of-accounts entry.
    fn upsert_account(&self, account: &AccountRecord) -> Result<(), LedgerError>;
}
