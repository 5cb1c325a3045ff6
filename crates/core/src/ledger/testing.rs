//! In-memory store double shared by the ledger unit and property tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use keel_shared::types::{Money, RecordId, TransactionId};

use super::error::LedgerError;
use super::profile::{KIND_ACCOUNT, KIND_LEDGER_LINE};
use super::segments::AccountCode;
use super::store::{LedgerStore, StoredTransaction};
use super::types::{AccountRecord, TransactionHeader, TransactionLine, TransactionStatus};
use crate::engine::{EngineError, RecordStore};
use crate::graph::RecordKind;

#[derive(Debug, Clone)]
struct PostedLine {
    account: RecordId,
    debit: Money,
    credit: Money,
}

#[derive(Debug, Default)]
struct State {
    accounts: BTreeMap<AccountCode, AccountRecord>,
    transactions: BTreeMap<TransactionId, (TransactionHeader, Vec<TransactionLine>)>,
    next_number: i64,
    /// Aggregate columns written by the cascade, keyed by account record id.
    balances: BTreeMap<RecordId, BTreeMap<String, Money>>,
    /// Lines of posted transactions, visible to the record side.
    posted_lines: BTreeMap<RecordId, PostedLine>,
}

impl State {
    fn publish_lines(&mut self, lines: &[TransactionLine]) -> Result<(), LedgerError> {
        for line in lines {
            let account = self
                .accounts
                .get(&line.account)
                .ok_or_else(|| LedgerError::AccountNotFound(line.account.clone()))?;
            self.posted_lines.insert(
                line.id,
                PostedLine {
                    account: account.id,
                    debit: line.debit,
                    credit: line.credit,
                },
            );
        }
        Ok(())
    }
}

/// One struct backing both the ledger and record seams, the way a single
/// database would.
#[derive(Debug, Default)]
pub struct MemStore {
    state: Mutex<State>,
}

impl MemStore {
    pub fn new() -> Self {
        let store = Self::default();
        store.state.lock().unwrap().next_number = 1;
        store
    }

    /// Current balance column of an account, zero when never written.
    pub fn balance_of(&self, account: RecordId) -> Money {
        self.state
            .lock()
            .unwrap()
            .balances
            .get(&account)
            .and_then(|columns| columns.get("balance"))
            .copied()
            .unwrap_or(Money::ZERO)
    }
}

impl LedgerStore for MemStore {
    fn next_transaction_number(&self) -> Result<i64, LedgerError> {
        let mut state = self.state.lock().unwrap();
        let number = state.next_number;
        state.next_number += 1;
        Ok(number)
    }

    fn insert_transaction(
        &self,
        header: &TransactionHeader,
        lines: &[TransactionLine],
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock().unwrap();
        if header.status == TransactionStatus::Posted {
            state.publish_lines(lines)?;
        }
        state
            .transactions
            .insert(header.id, (header.clone(), lines.to_vec()));
        Ok(())
    }

    fn load_transaction(&self, id: TransactionId) -> Result<StoredTransaction, LedgerError> {
        let state = self.state.lock().unwrap();
        state
            .transactions
            .get(&id)
            .map(|(header, lines)| StoredTransaction {
                header: header.clone(),
                lines: lines.clone(),
            })
            .ok_or(LedgerError::TransactionNotFound(id))
    }

    fn replace_lines(
        &self,
        id: TransactionId,
        lines: &[TransactionLine],
    ) -> Result<(), LedgerError> {
        let mut state = self.state.lock().unwrap();
        match state.transactions.get_mut(&id) {
            Some((_, stored)) => {
                *stored = lines.to_vec();
                Ok(())
            }
            None => Err(LedgerError::TransactionNotFound(id)),
        }
    }

    fn update_header(&self, header: &TransactionHeader) -> Result<(), LedgerError> {
        let mut state = self.state.lock().unwrap();
        let lines = match state.transactions.get_mut(&header.id) {
            Some((stored, lines)) => {
                let was_draft = stored.status == TransactionStatus::Draft;
                *stored = header.clone();
                if was_draft && header.status == TransactionStatus::Posted {
                    Some(lines.clone())
                } else {
                    None
                }
            }
            None => return Err(LedgerError::TransactionNotFound(header.id)),
        };
        if let Some(lines) = lines {
            state.publish_lines(&lines)?;
        }
        Ok(())
    }

    fn delete_transaction(&self, id: TransactionId) -> Result<(), LedgerError> {
        let mut state = self.state.lock().unwrap();
        let (header, lines) = state
            .transactions
            .remove(&id)
            .ok_or(LedgerError::TransactionNotFound(id))?;
        // Posted lines were published; unpublish so aggregates stay honest.
        if header.status == TransactionStatus::Posted {
            for line in &lines {
                state.posted_lines.remove(&line.id);
            }
        }
        Ok(())
    }

    fn account(&self, code: &AccountCode) -> Result<Option<AccountRecord>, LedgerError> {
        Ok(self.state.lock().unwrap().accounts.get(code).cloned())
    }

    fn upsert_account(&self, account: &AccountRecord) -> Result<(), LedgerError> {
        self.state
            .lock()
            .unwrap()
            .accounts
            .insert(account.code.clone(), account.clone());
        Ok(())
    }
}

impl RecordStore for MemStore {
    fn list_ids(&self, kind: RecordKind) -> Result<Vec<RecordId>, EngineError> {
        let state = self.state.lock().unwrap();
        if kind == KIND_ACCOUNT {
            Ok(state.accounts.values().map(|account| account.id).collect())
        } else if kind == KIND_LEDGER_LINE {
            Ok(state.posted_lines.keys().copied().collect())
        } else {
            Ok(Vec::new())
        }
    }

    fn record_exists(&self, kind: RecordKind, id: RecordId) -> Result<bool, EngineError> {
        let state = self.state.lock().unwrap();
        if kind == KIND_ACCOUNT {
            Ok(state.accounts.values().any(|account| account.id == id))
        } else if kind == KIND_LEDGER_LINE {
            Ok(state.posted_lines.contains_key(&id))
        } else {
            Ok(false)
        }
    }

    fn read_column(
        &self,
        _kind: RecordKind,
        id: RecordId,
        column: &str,
    ) -> Result<Option<Money>, EngineError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .balances
            .get(&id)
            .and_then(|columns| columns.get(column))
            .copied())
    }

    fn write_column(
        &self,
        _kind: RecordKind,
        id: RecordId,
        column: &str,
        value: Money,
    ) -> Result<(), EngineError> {
        let mut state = self.state.lock().unwrap();
        state
            .balances
            .entry(id)
            .or_default()
            .insert(column.to_string(), value);
        Ok(())
    }

    fn sum_children(
        &self,
        _child: RecordKind,
        column: &str,
        _parent: RecordKind,
        parent_id: RecordId,
    ) -> Result<Money, EngineError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .posted_lines
            .values()
            .filter(|line| line.account == parent_id)
            .map(|line| match column {
                "debit" => line.debit,
                "credit" => line.credit,
                _ => Money::ZERO,
            })
            .sum())
    }

    fn count_children(
        &self,
        _child: RecordKind,
        _parent: RecordKind,
        parent_id: RecordId,
    ) -> Result<u64, EngineError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .posted_lines
            .values()
            .filter(|line| line.account == parent_id)
            .count() as u64)
    }

    fn parents_of(
        &self,
        _child: RecordKind,
        child_ids: &[RecordId],
        _parent: RecordKind,
    ) -> Result<Vec<RecordId>, EngineError> {
        let state = self.state.lock().unwrap();
        let parents: BTreeSet<RecordId> = child_ids
            .iter()
            .filter_map(|id| state.posted_lines.get(id))
            .map(|line| line.account)
            .collect();
        Ok(parents.into_iter().collect())
    }
}
