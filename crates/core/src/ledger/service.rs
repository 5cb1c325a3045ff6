//! Double-entry posting service.
//!
//! Owns the transaction lifecycle (`Draft -> Posted`), runs every posting
//! rule, and drives the consistency cascade so account balances are exact
//! the moment a transaction lands. The service is stateless apart from the
//! injected stores, the fiscal calendar, and the segment schema.

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use keel_shared::types::{RecordId, TransactionId, UserId};

use super::error::LedgerError;
use super::profile::{posting_engine, KIND_LEDGER_LINE};
use super::segments::{AccountCode, SegmentSchema};
use super::store::{LedgerStore, StoredTransaction};
use super::types::{
    AccountRecord, CreateTransactionInput, LineInput, TransactionHeader, TransactionKind,
    TransactionLine, TransactionStatus, TransactionTotals, UpdateTransactionInput,
};
use crate::engine::{CascadeReport, ConsistencyEngine, Discrepancy, RecordStore};
use crate::fiscal::{FiscalCalendar, FiscalPeriod, LedgerModule};

/// Posting, reversal, and draft lifecycle over the injected stores.
pub struct LedgerPostingService {
    ledger: Arc<dyn LedgerStore>,
    records: Arc<dyn RecordStore>,
    engine: ConsistencyEngine,
    calendar: FiscalCalendar,
    segments: RwLock<SegmentSchema>,
}

impl LedgerPostingService {
    /// Wires the service with the built-in account-balance engine.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Cascade`] if the engine configuration is
    /// inconsistent.
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        records: Arc<dyn RecordStore>,
        calendar: FiscalCalendar,
        segments: SegmentSchema,
    ) -> Result<Self, LedgerError> {
        Ok(Self {
            ledger,
            records,
            engine: posting_engine()?,
            calendar,
            segments: RwLock::new(segments),
        })
    }

    // ========== Account identifiers ==========

    /// Validates segment values and returns the composed account code.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidSegmentCombination`] naming the first
    /// offending position.
    pub fn compose_account_id(&self, values: &[&str]) -> Result<AccountCode, LedgerError> {
        self.segments
            .read()
            .expect("segment schema lock poisoned")
            .compose(values)
    }

    /// Splits an account code back into its validated segment values.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidSegmentCombination`] if the code does
    /// not match the schema.
    pub fn parse_account_id(&self, code: &AccountCode) -> Result<Vec<String>, LedgerError> {
        self.segments
            .read()
            .expect("segment schema lock poisoned")
            .parse(code)
    }

    /// Approves a new segment value.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidSegmentCombination`] if the position is
    /// unknown or the value's length does not fit.
    pub fn add_segment_value(&self, position: usize, value: &str) -> Result<(), LedgerError> {
        self.segments
            .write()
            .expect("segment schema lock poisoned")
            .add_value(position, value)
    }

    /// Deactivates a segment value for new compositions. Existing accounts
    /// are unaffected.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidSegmentCombination`] if the position or
    /// value is unknown.
    pub fn deactivate_segment_value(
        &self,
        position: usize,
        value: &str,
    ) -> Result<(), LedgerError> {
        self.segments
            .write()
            .expect("segment schema lock poisoned")
            .deactivate_value(position, value)
    }

    /// Re-activates a previously deactivated segment value.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidSegmentCombination`] if the position or
    /// value is unknown.
    pub fn activate_segment_value(&self, position: usize, value: &str) -> Result<(), LedgerError> {
        self.segments
            .write()
            .expect("segment schema lock poisoned")
            .activate_value(position, value)
    }

    /// Creates or updates a chart-of-accounts entry from segment values.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidSegmentCombination`] for bad segment
    /// values, or a store error.
    pub fn register_account(
        &self,
        values: &[&str],
        name: &str,
        allow_manual: bool,
    ) -> Result<AccountRecord, LedgerError> {
        let code = self.compose_account_id(values)?;
        let account = match self.ledger.account(&code)? {
            Some(existing) => AccountRecord {
                name: name.to_string(),
                allow_manual,
                ..existing
            },
            None => AccountRecord {
                id: RecordId::new(),
                code,
                name: name.to_string(),
                active: true,
                allow_manual,
            },
        };
        self.ledger.upsert_account(&account)?;
        Ok(account)
    }

    // ========== Fiscal period administration ==========

    /// Opens one module of a fiscal period.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Fiscal`] if no such period exists.
    pub fn open_period(
        &self,
        fiscal_year: i32,
        period_number: u32,
        module: LedgerModule,
    ) -> Result<(), LedgerError> {
        Ok(self.calendar.open_for(fiscal_year, period_number, module)?)
    }

    /// Closes one module of a fiscal period. Posted history is untouched;
    /// only new postings for that module are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Fiscal`] if no such period exists.
    pub fn close_period(
        &self,
        fiscal_year: i32,
        period_number: u32,
        module: LedgerModule,
    ) -> Result<(), LedgerError> {
        Ok(self.calendar.close_for(fiscal_year, period_number, module)?)
    }

    /// The fiscal calendar the service posts against.
    #[must_use]
    pub const fn calendar(&self) -> &FiscalCalendar {
        &self.calendar
    }

    // ========== Draft lifecycle ==========

    /// Creates a draft transaction with a freshly allocated document number.
    ///
    /// All posting rules except the period-open check run here; a draft in a
    /// closed period can exist, it just cannot post until the period opens.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the lines are malformed or unbalanced,
    /// reference unknown or unusable accounts, or the date falls outside
    /// every fiscal period.
    pub fn create_draft(
        &self,
        input: CreateTransactionInput,
    ) -> Result<StoredTransaction, LedgerError> {
        let lines = self.validate_lines(input.lines)?;
        self.validate_accounts(&lines, input.kind)?;
        let period = self.resolve_period(input.fiscal_date)?;

        let now = Utc::now();
        let header = TransactionHeader {
            id: TransactionId::new(),
            number: self.ledger.next_transaction_number()?,
            kind: input.kind,
            fiscal_date: input.fiscal_date,
            fiscal_year: period.fiscal_year,
            period_number: period.period_number,
            description: input.description,
            customer_id: input.customer_id,
            vendor_id: input.vendor_id,
            status: TransactionStatus::Draft,
            reverses: None,
            created_by: input.created_by,
            created_at: now,
            updated_by: input.created_by,
            updated_at: now,
        };
        self.ledger.insert_transaction(&header, &lines)?;
        debug!(
            transaction_id = %header.id,
            number = header.number,
            kind = %header.kind,
            "Draft transaction created"
        );
        Ok(StoredTransaction { header, lines })
    }

    /// Applies a partial update to a draft. The document number never
    /// changes.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::CannotModifyPosted`] for posted transactions,
    /// or any creation-time validation error.
    pub fn update_draft(
        &self,
        id: TransactionId,
        update: UpdateTransactionInput,
        updated_by: UserId,
    ) -> Result<StoredTransaction, LedgerError> {
        let mut stored = self.ledger.load_transaction(id)?;
        if !stored.header.status.is_editable() {
            return Err(LedgerError::CannotModifyPosted);
        }

        if let Some(lines) = update.lines {
            let lines = self.validate_lines(lines)?;
            self.validate_accounts(&lines, stored.header.kind)?;
            self.ledger.replace_lines(id, &lines)?;
            stored.lines = lines;
        }
        if let Some(date) = update.fiscal_date {
            let period = self.resolve_period(date)?;
            stored.header.fiscal_date = date;
            stored.header.fiscal_year = period.fiscal_year;
            stored.header.period_number = period.period_number;
        }
        if let Some(description) = update.description {
            stored.header.description = description;
        }
        stored.header.updated_by = updated_by;
        stored.header.updated_at = Utc::now();
        self.ledger.update_header(&stored.header)?;
        Ok(stored)
    }

    /// Deletes a draft. Its document number is never reallocated, leaving a
    /// deliberate gap in the sequence.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::CanOnlyDeleteDraft`] for posted transactions.
    pub fn delete_draft(&self, id: TransactionId) -> Result<(), LedgerError> {
        let stored = self.ledger.load_transaction(id)?;
        if stored.header.status != TransactionStatus::Draft {
            return Err(LedgerError::CanOnlyDeleteDraft);
        }
        self.ledger.delete_transaction(id)?;
        debug!(transaction_id = %id, number = stored.header.number, "Draft transaction deleted");
        Ok(())
    }

    // ========== Posting ==========

    /// Posts a draft, making it immutable and folding its lines into
    /// account balances via the consistency cascade.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::PeriodClosed`] if the resolved period is
    /// closed for the transaction's module, or re-validation / store /
    /// cascade errors.
    pub fn post_draft(
        &self,
        id: TransactionId,
        posted_by: UserId,
    ) -> Result<PostingOutcome, LedgerError> {
        let mut stored = self.ledger.load_transaction(id)?;
        if stored.header.status != TransactionStatus::Draft {
            return Err(LedgerError::CannotModifyPosted);
        }

        // Lines and accounts may have drifted since creation; re-validate.
        self.check_stored_lines(&stored.lines)?;
        self.validate_accounts(&stored.lines, stored.header.kind)?;
        self.check_period_open(&stored.header)?;

        stored.header.status = TransactionStatus::Posted;
        stored.header.updated_by = posted_by;
        stored.header.updated_at = Utc::now();
        self.ledger.update_header(&stored.header)?;

        let report = self.cascade_lines(&stored.lines)?;
        info!(
            transaction_id = %stored.header.id,
            number = stored.header.number,
            kind = %stored.header.kind,
            accounts_updated = report.written,
            "Transaction posted"
        );
        Ok(PostingOutcome {
            transaction: stored,
            cascade: report,
        })
    }

    /// Creates and immediately posts a transaction in one call. On any
    /// failure nothing is persisted; the consumed document number stays a
    /// gap in the sequence.
    ///
    /// # Errors
    ///
    /// Any error [`Self::create_draft`] or [`Self::post_draft`] can return.
    pub fn post_transaction(
        &self,
        input: CreateTransactionInput,
    ) -> Result<PostingOutcome, LedgerError> {
        let created_by = input.created_by;
        let draft = self.create_draft(input)?;
        match self.post_draft(draft.header.id, created_by) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.ledger.delete_transaction(draft.header.id)?;
                Err(err)
            }
        }
    }

    /// Posts a manual journal entry. Identical to [`Self::post_transaction`]
    /// with the kind forced to [`TransactionKind::Manual`], which also
    /// enforces the per-account `allow_manual` flag.
    ///
    /// # Errors
    ///
    /// Any error [`Self::post_transaction`] can return, plus
    /// [`LedgerError::AccountNoManualEntry`].
    pub fn post_manual_transaction(
        &self,
        mut input: CreateTransactionInput,
    ) -> Result<PostingOutcome, LedgerError> {
        input.kind = TransactionKind::Manual;
        self.post_transaction(input)
    }

    /// Backs out a posted transaction by posting a new transaction whose
    /// lines are the exact mirror of the original. The original is never
    /// touched; both remain in history and link to each other via
    /// `reverses`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NotPosted`] if the original is still a draft,
    /// [`LedgerError::PeriodClosed`] if the reversal date's period is closed
    /// for the original's module, any account re-validation error a fresh
    /// post would raise, or store / cascade errors.
    pub fn reverse_transaction(
        &self,
        id: TransactionId,
        reason: &str,
        reversal_date: NaiveDate,
        reversed_by: UserId,
    ) -> Result<PostingOutcome, LedgerError> {
        let original = self.ledger.load_transaction(id)?;
        if original.header.status != TransactionStatus::Posted {
            return Err(LedgerError::NotPosted(id));
        }

        let period = self.resolve_period(reversal_date)?;
        if !period.is_open_for(original.header.kind.module()) {
            return Err(LedgerError::PeriodClosed {
                period: period.id,
                module: original.header.kind.module(),
            });
        }

        let lines: Vec<TransactionLine> =
            original.lines.iter().map(TransactionLine::negated).collect();
        // A reversal is a fresh post; accounts may have become unusable
        // since the original landed.
        self.check_stored_lines(&lines)?;
        self.validate_accounts(&lines, original.header.kind)?;
        let now = Utc::now();
        let header = TransactionHeader {
            id: TransactionId::new(),
            number: self.ledger.next_transaction_number()?,
            kind: original.header.kind,
            fiscal_date: reversal_date,
            fiscal_year: period.fiscal_year,
            period_number: period.period_number,
            description: format!("Reversal of #{}: {reason}", original.header.number),
            customer_id: original.header.customer_id,
            vendor_id: original.header.vendor_id,
            status: TransactionStatus::Posted,
            reverses: Some(id),
            created_by: reversed_by,
            created_at: now,
            updated_by: reversed_by,
            updated_at: now,
        };
        self.ledger.insert_transaction(&header, &lines)?;

        let report = self.cascade_lines(&lines)?;
        info!(
            transaction_id = %header.id,
            reverses = %id,
            number = header.number,
            "Transaction reversed"
        );
        Ok(PostingOutcome {
            transaction: StoredTransaction { header, lines },
            cascade: report,
        })
    }

    /// Loads a transaction with its lines.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::TransactionNotFound`] or a store error.
    pub fn transaction(&self, id: TransactionId) -> Result<StoredTransaction, LedgerError> {
        self.ledger.load_transaction(id)
    }

    // ========== Verification ==========

    /// Read-only sweep of every account balance against its posted lines.
    /// Reports discrepancies without repairing them.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Cascade`] on store failure.
    pub fn verify_balances(&self) -> Result<Vec<Discrepancy>, LedgerError> {
        Ok(self.engine.verify_all(self.records.as_ref())?)
    }

    // ========== Validation helpers ==========

    fn validate_lines(&self, inputs: Vec<LineInput>) -> Result<Vec<TransactionLine>, LedgerError> {
        if inputs.len() < 2 {
            return Err(LedgerError::InsufficientLines);
        }
        let lines: Vec<TransactionLine> = inputs
            .into_iter()
            .map(TransactionLine::from_input)
            .collect::<Result<_, _>>()?;
        Self::check_balanced(&lines)?;
        Ok(lines)
    }

    fn check_stored_lines(&self, lines: &[TransactionLine]) -> Result<(), LedgerError> {
        if lines.len() < 2 {
            return Err(LedgerError::InsufficientLines);
        }
        for line in lines {
            line.validate()?;
        }
        Self::check_balanced(lines)
    }

    fn check_balanced(lines: &[TransactionLine]) -> Result<(), LedgerError> {
        let totals = TransactionTotals::of(lines);
        if !totals.is_balanced() {
            return Err(LedgerError::UnbalancedTransaction {
                debit: totals.debit,
                credit: totals.credit,
            });
        }
        Ok(())
    }

    fn validate_accounts(
        &self,
        lines: &[TransactionLine],
        kind: TransactionKind,
    ) -> Result<(), LedgerError> {
        // Each distinct account is checked once.
        let mut seen: BTreeSet<&AccountCode> = BTreeSet::new();
        for line in lines {
            if !seen.insert(&line.account) {
                continue;
            }
            let account = self
                .ledger
                .account(&line.account)?
                .ok_or_else(|| LedgerError::AccountNotFound(line.account.clone()))?;
            if !account.active {
                return Err(LedgerError::AccountInactive(line.account.clone()));
            }
            if kind == TransactionKind::Manual && !account.allow_manual {
                return Err(LedgerError::AccountNoManualEntry(line.account.clone()));
            }
        }
        Ok(())
    }

    fn resolve_period(&self, date: NaiveDate) -> Result<FiscalPeriod, LedgerError> {
        self.calendar
            .period_for_date(date)
            .ok_or(LedgerError::NoFiscalPeriod(date))
    }

    fn check_period_open(&self, header: &TransactionHeader) -> Result<(), LedgerError> {
        let period = self
            .calendar
            .period(header.fiscal_year, header.period_number)
            .ok_or(LedgerError::NoFiscalPeriod(header.fiscal_date))?;
        if !period.is_open_for(header.kind.module()) {
            return Err(LedgerError::PeriodClosed {
                period: period.id,
                module: header.kind.module(),
            });
        }
        Ok(())
    }

    fn cascade_lines(&self, lines: &[TransactionLine]) -> Result<CascadeReport, LedgerError> {
        let ids: Vec<RecordId> = lines.iter().map(|line| line.id).collect();
        Ok(self
            .engine
            .cascade_from_children(self.records.as_ref(), KIND_LEDGER_LINE, &ids)?)
    }
}

/// What a successful post or reversal produced.
#[derive(Debug)]
pub struct PostingOutcome {
    /// The transaction as persisted.
    pub transaction: StoredTransaction,
    /// What the balance cascade recomputed.
    pub cascade: CascadeReport,
}
