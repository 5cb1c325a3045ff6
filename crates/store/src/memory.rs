//! `MemoryStore`: dashmap-backed implementation of the store seams.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::{DashMap, DashSet};
use tracing::debug;

use keel_core::engine::{EngineError, RecordStore};
use keel_core::graph::RecordKind;
use keel_core::ledger::{
    AccountCode, AccountRecord, LedgerError, LedgerStore, StoredTransaction, TransactionHeader,
    TransactionLine, TransactionStatus, KIND_ACCOUNT, KIND_LEDGER_LINE,
};
use keel_core::webhook::{EventKey, ProcessedEventStore, WebhookError};
use keel_shared::config::LedgerConfig;
use keel_shared::types::{Money, RecordId, TransactionId};

/// One tracked record row.
///
/// `columns` holds both plain columns (written at insert, e.g. a ledger
/// line's `debit`) and aggregate columns (written by the cascade, e.g. an
/// account's `balance`); the engine does not distinguish them at read time.
#[derive(Debug, Clone, Default)]
struct RecordRow {
    parents: BTreeMap<RecordKind, RecordId>,
    columns: BTreeMap<String, Money>,
}

/// Concurrent in-memory backing for every persistence seam.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<(RecordKind, RecordId), RecordRow>,
    accounts: DashMap<AccountCode, AccountRecord>,
    transactions: DashMap<TransactionId, (TransactionHeader, Vec<TransactionLine>)>,
    next_number: AtomicI64,
    processed_events: DashSet<EventKey>,
}

impl MemoryStore {
    /// Creates an empty store with transaction numbers starting at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_number: AtomicI64::new(1),
            ..Self::default()
        }
    }

    /// Creates an empty store seeded from ledger configuration.
    #[must_use]
    pub fn from_config(config: &LedgerConfig) -> Self {
        Self {
            next_number: AtomicI64::new(config.transaction_number_start),
            ..Self::default()
        }
    }

    /// Inserts or replaces a record row with plain column values.
    pub fn upsert_record(
        &self,
        kind: RecordKind,
        id: RecordId,
        columns: &[(&str, Money)],
    ) {
        let mut row = self
            .records
            .get(&(kind, id))
            .map(|entry| entry.clone())
            .unwrap_or_default();
        for (column, value) in columns {
            row.columns.insert((*column).to_string(), *value);
        }
        self.records.insert((kind, id), row);
    }

    /// Links a record to its parent of the given kind.
    pub fn link_record(
        &self,
        kind: RecordKind,
        id: RecordId,
        parent: RecordKind,
        parent_id: RecordId,
    ) {
        self.records
            .entry((kind, id))
            .or_default()
            .parents
            .insert(parent, parent_id);
    }

    /// Removes a record row. Gone rows contribute zero to aggregates.
    pub fn remove_record(&self, kind: RecordKind, id: RecordId) {
        self.records.remove(&(kind, id));
    }

    /// Current value of one column, if written.
    #[must_use]
    pub fn column(&self, kind: RecordKind, id: RecordId, column: &str) -> Option<Money> {
        self.records
            .get(&(kind, id))
            .and_then(|row| row.columns.get(column).copied())
    }

    /// Balance column of an account record, zero when never written.
    #[must_use]
    pub fn account_balance(&self, account: RecordId) -> Money {
        self.column(KIND_ACCOUNT, account, "balance")
            .unwrap_or(Money::ZERO)
    }

    /// Number of stored transactions.
    #[must_use]
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Publishes posted lines into the record side so the cascade sees
    /// them. Called under the all-or-nothing guarantee: account existence
    /// was checked before anything was inserted.
    fn publish_lines(&self, lines: &[TransactionLine]) -> Result<(), LedgerError> {
        for line in lines {
            let account = self
                .accounts
                .get(&line.account)
                .map(|entry| entry.id)
                .ok_or_else(|| LedgerError::AccountNotFound(line.account.clone()))?;
            let mut row = RecordRow::default();
            row.columns.insert("debit".to_string(), line.debit);
            row.columns.insert("credit".to_string(), line.credit);
            row.parents.insert(KIND_ACCOUNT, account);
            self.records.insert((KIND_LEDGER_LINE, line.id), row);
        }
        Ok(())
    }

    fn check_accounts_exist(&self, lines: &[TransactionLine]) -> Result<(), LedgerError> {
        for line in lines {
            if !self.accounts.contains_key(&line.account) {
                return Err(LedgerError::AccountNotFound(line.account.clone()));
            }
        }
        Ok(())
    }
}

impl LedgerStore for MemoryStore {
    fn next_transaction_number(&self) -> Result<i64, LedgerError> {
        Ok(self.next_number.fetch_add(1, Ordering::SeqCst))
    }

    fn insert_transaction(
        &self,
        header: &TransactionHeader,
        lines: &[TransactionLine],
    ) -> Result<(), LedgerError> {
        // All-or-nothing: fail before anything becomes visible.
        self.check_accounts_exist(lines)?;
        if header.status == TransactionStatus::Posted {
            self.publish_lines(lines)?;
        }
        self.transactions
            .insert(header.id, (header.clone(), lines.to_vec()));
        debug!(transaction_id = %header.id, number = header.number, "Transaction stored");
        Ok(())
    }

    fn load_transaction(&self, id: TransactionId) -> Result<StoredTransaction, LedgerError> {
        self.transactions
            .get(&id)
            .map(|entry| StoredTransaction {
                header: entry.0.clone(),
                lines: entry.1.clone(),
            })
            .ok_or(LedgerError::TransactionNotFound(id))
    }

    fn replace_lines(
        &self,
        id: TransactionId,
        lines: &[TransactionLine],
    ) -> Result<(), LedgerError> {
        self.check_accounts_exist(lines)?;
        match self.transactions.get_mut(&id) {
            Some(mut entry) => {
                entry.1 = lines.to_vec();
                Ok(())
            }
            None => Err(LedgerError::TransactionNotFound(id)),
        }
    }

    fn update_header(&self, header: &TransactionHeader) -> Result<(), LedgerError> {
        let lines_to_publish = match self.transactions.get_mut(&header.id) {
            Some(mut entry) => {
                let was_draft = entry.0.status == TransactionStatus::Draft;
                entry.0 = header.clone();
                if was_draft && header.status == TransactionStatus::Posted {
                    Some(entry.1.clone())
                } else {
                    None
                }
            }
            None => return Err(LedgerError::TransactionNotFound(header.id)),
        };
        if let Some(lines) = lines_to_publish {
            self.publish_lines(&lines)?;
        }
        Ok(())
    }

    fn delete_transaction(&self, id: TransactionId) -> Result<(), LedgerError> {
        let (_, (header, lines)) = self
            .transactions
            .remove(&id)
            .ok_or(LedgerError::TransactionNotFound(id))?;
        // Posted lines were published into the record side; leaving them
        // behind would keep feeding account aggregates.
        if header.status == TransactionStatus::Posted {
            for line in &lines {
                self.records.remove(&(KIND_LEDGER_LINE, line.id));
            }
        }
        Ok(())
    }

    fn account(&self, code: &AccountCode) -> Result<Option<AccountRecord>, LedgerError> {
        Ok(self.accounts.get(code).map(|entry| entry.clone()))
    }

    fn upsert_account(&self, account: &AccountRecord) -> Result<(), LedgerError> {
        self.records
            .entry((KIND_ACCOUNT, account.id))
            .or_default();
        self.accounts.insert(account.code.clone(), account.clone());
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    fn list_ids(&self, kind: RecordKind) -> Result<Vec<RecordId>, EngineError> {
        let mut ids: Vec<RecordId> = self
            .records
            .iter()
            .filter(|entry| entry.key().0 == kind)
            .map(|entry| entry.key().1)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn record_exists(&self, kind: RecordKind, id: RecordId) -> Result<bool, EngineError> {
        Ok(self.records.contains_key(&(kind, id)))
    }

    fn read_column(
        &self,
        kind: RecordKind,
        id: RecordId,
        column: &str,
    ) -> Result<Option<Money>, EngineError> {
        Ok(self
            .records
            .get(&(kind, id))
            .and_then(|row| row.columns.get(column).copied()))
    }

    fn write_column(
        &self,
        kind: RecordKind,
        id: RecordId,
        column: &str,
        value: Money,
    ) -> Result<(), EngineError> {
        self.records
            .entry((kind, id))
            .or_default()
            .columns
            .insert(column.to_string(), value);
        Ok(())
    }

    fn sum_children(
        &self,
        child: RecordKind,
        column: &str,
        parent: RecordKind,
        parent_id: RecordId,
    ) -> Result<Money, EngineError> {
        Ok(self
            .records
            .iter()
            .filter(|entry| {
                entry.key().0 == child
                    && entry.value().parents.get(&parent) == Some(&parent_id)
            })
            .map(|entry| entry.value().columns.get(column).copied().unwrap_or(Money::ZERO))
            .sum())
    }

    fn count_children(
        &self,
        child: RecordKind,
        parent: RecordKind,
        parent_id: RecordId,
    ) -> Result<u64, EngineError> {
        Ok(self
            .records
            .iter()
            .filter(|entry| {
                entry.key().0 == child
                    && entry.value().parents.get(&parent) == Some(&parent_id)
            })
            .count() as u64)
    }

    fn parents_of(
        &self,
        child: RecordKind,
        child_ids: &[RecordId],
        parent: RecordKind,
    ) -> Result<Vec<RecordId>, EngineError> {
        let wanted: BTreeSet<RecordId> = child_ids.iter().copied().collect();
        let parents: BTreeSet<RecordId> = self
            .records
            .iter()
            .filter(|entry| entry.key().0 == child && wanted.contains(&entry.key().1))
            .filter_map(|entry| entry.value().parents.get(&parent).copied())
            .collect();
        Ok(parents.into_iter().collect())
    }
}

impl ProcessedEventStore for MemoryStore {
    fn already_processed(&self, key: &EventKey) -> Result<bool, WebhookError> {
        Ok(self.processed_events.contains(key))
    }

    fn mark_processed(&self, key: &EventKey) -> Result<(), WebhookError> {
        self.processed_events.insert(key.clone());
        Ok(())
    }
}
