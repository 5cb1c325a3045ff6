//! Ledger transaction domain types.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use keel_shared::types::{CustomerId, Money, RecordId, TransactionId, UserId, VendorId};

use super::error::LedgerError;
use super::segments::AccountCode;
use crate::fiscal::LedgerModule;

/// Which side of a line carries the amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySide {
    /// Debit entry.
    Debit,
    /// Credit entry.
    Credit,
}

/// The originating subledger of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Manual journal entry keyed in directly.
    Manual,
    /// Bank deposit or withdrawal.
    Bank,
    /// Customer invoice or payment application.
    Receivable,
    /// Vendor bill or payment.
    Payable,
}

impl TransactionKind {
    /// The fiscal-period open flag this kind is gated by.
    #[must_use]
    pub const fn module(self) -> LedgerModule {
        match self {
            Self::Manual => LedgerModule::GeneralLedger,
            Self::Bank => LedgerModule::Bank,
            Self::Receivable => LedgerModule::Receivables,
            Self::Payable => LedgerModule::Payables,
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Manual => "manual",
            Self::Bank => "bank",
            Self::Receivable => "receivable",
            Self::Payable => "payable",
        };
        f.write_str(label)
    }
}

/// Lifecycle state. The only transition is `Draft -> Posted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Editable, not yet part of account balances.
    Draft,
    /// Immutable and reflected in balances.
    Posted,
}

impl TransactionStatus {
    /// Whether lines and header fields may still change.
    #[must_use]
    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Draft)
    }
}

/// Caller-supplied line before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineInput {
    /// Target account.
    pub account: AccountCode,
    /// Debit or credit.
    pub side: EntrySide,
    /// Strictly positive magnitude.
    pub amount: Money,
    /// Optional line memo.
    pub description: Option<String>,
}

/// A validated, stored transaction line.
///
/// Exactly one of `debit`/`credit` is non-zero. Each line carries its own
/// record id so posted lines can feed aggregate recomputation directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLine {
    /// Record identity of the line itself.
    pub id: RecordId,
    /// Target account.
    pub account: AccountCode,
    /// Optional line memo.
    pub description: Option<String>,
    /// Debit amount, zero when the line is a credit.
    pub debit: Money,
    /// Credit amount, zero when the line is a debit.
    pub credit: Money,
}

impl TransactionLine {
    /// Builds a stored line from caller input.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ZeroAmount`] or [`LedgerError::NegativeAmount`]
    /// when the magnitude is not strictly positive.
    pub fn from_input(input: LineInput) -> Result<Self, LedgerError> {
        if input.amount.is_zero() {
            return Err(LedgerError::ZeroAmount);
        }
        if input.amount.is_negative() {
            return Err(LedgerError::NegativeAmount);
        }
        let (debit, credit) = match input.side {
            EntrySide::Debit => (input.amount, Money::ZERO),
            EntrySide::Credit => (Money::ZERO, input.amount),
        };
        Ok(Self {
            id: RecordId::new(),
            account: input.account,
            description: input.description,
            debit,
            credit,
        })
    }

    /// Checks the one-sided invariant on an already constructed line.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidLineAmounts`] when both sides are set,
    /// neither is, or either is negative.
    pub fn validate(&self) -> Result<(), LedgerError> {
        let debit_set = !self.debit.is_zero();
        let credit_set = !self.credit.is_zero();
        if debit_set == credit_set || self.debit.is_negative() || self.credit.is_negative() {
            return Err(LedgerError::InvalidLineAmounts);
        }
        Ok(())
    }

    /// Debit-positive signed amount (`debit - credit`).
    #[must_use]
    pub fn signed_amount(&self) -> Money {
        self.debit - self.credit
    }

    /// The mirrored line for a reversal: sides swapped, same magnitude.
    #[must_use]
    pub fn negated(&self) -> Self {
        Self {
            id: RecordId::new(),
            account: self.account.clone(),
            description: self.description.clone(),
            debit: self.credit,
            credit: self.debit,
        }
    }
}

/// Transaction header as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHeader {
    /// Stable identity.
    pub id: TransactionId,
    /// Monotonic, never-reused document number.
    pub number: i64,
    /// Originating subledger.
    pub kind: TransactionKind,
    /// The accounting date the transaction belongs to.
    pub fiscal_date: NaiveDate,
    /// Fiscal year resolved from `fiscal_date` at creation.
    pub fiscal_year: i32,
    /// Period number within `fiscal_year`.
    pub period_number: u32,
    /// Header memo.
    pub description: String,
    /// Counterparty for receivable transactions.
    pub customer_id: Option<CustomerId>,
    /// Counterparty for payable transactions.
    pub vendor_id: Option<VendorId>,
    /// Lifecycle state.
    pub status: TransactionStatus,
    /// Set on reversal transactions: the transaction being backed out.
    pub reverses: Option<TransactionId>,
    /// Who created the transaction.
    pub created_by: UserId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Who last mutated the transaction.
    pub updated_by: UserId,
    /// Last mutation timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Everything needed to create a draft.
#[derive(Debug, Clone)]
pub struct CreateTransactionInput {
    /// Originating subledger.
    pub kind: TransactionKind,
    /// Accounting date; resolves the fiscal period.
    pub fiscal_date: NaiveDate,
    /// Header memo.
    pub description: String,
    /// Counterparty for receivable transactions.
    pub customer_id: Option<CustomerId>,
    /// Counterparty for payable transactions.
    pub vendor_id: Option<VendorId>,
    /// Lines, at least two after validation.
    pub lines: Vec<LineInput>,
    /// Creating user.
    pub created_by: UserId,
}

/// Partial update applied to a draft. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateTransactionInput {
    /// New header memo.
    pub description: Option<String>,
    /// New accounting date; re-resolves the fiscal period.
    pub fiscal_date: Option<NaiveDate>,
    /// Full replacement line set.
    pub lines: Option<Vec<LineInput>>,
}

/// Debit and credit totals across a line set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TransactionTotals {
    /// Sum of debit amounts.
    pub debit: Money,
    /// Sum of credit amounts.
    pub credit: Money,
}

impl TransactionTotals {
    /// Sums a line set.
    #[must_use]
    pub fn of(lines: &[TransactionLine]) -> Self {
        Self {
            debit: lines.iter().map(|line| line.debit).sum(),
            credit: lines.iter().map(|line| line.credit).sum(),
        }
    }

    /// Whether debits equal credits exactly at ledger scale.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.debit == self.credit
    }

    /// `debit - credit`, zero when balanced.
    #[must_use]
    pub fn difference(&self) -> Money {
        self.debit - self.credit
    }
}

/// Chart-of-accounts entry the posting service validates lines against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Record identity used by aggregate recomputation.
    pub id: RecordId,
    /// Segment-composed identifier.
    pub code: AccountCode,
    /// Display name.
    pub name: String,
    /// Inactive accounts reject new lines.
    pub active: bool,
    /// Whether manual journal entries may target this account.
    pub allow_manual: bool,
}
