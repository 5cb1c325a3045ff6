//! Ledger error types for validation and state errors.
//!
//! Every rejection names the specific rule violated; nothing is silently
//! auto-corrected.

use chrono::NaiveDate;
use thiserror::Error;

use keel_shared::types::{Money, TransactionId};

use crate::engine::EngineError;
use crate::fiscal::{FiscalError, FiscalPeriodId, LedgerModule};

use super::segments::AccountCode;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Transaction must have at least 2 lines.
    #[error("Transaction must have at least 2 lines")]
    InsufficientLines,

    /// Transaction is not balanced (debits != credits).
    #[error("Transaction is not balanced. Debits: {debit}, Credits: {credit}")]
    UnbalancedTransaction {
        /// Total debit amount.
        debit: Money,
        /// Total credit amount.
        credit: Money,
    },

    /// Line amount cannot be zero.
    #[error("Line amount cannot be zero")]
    ZeroAmount,

    /// Line amount cannot be negative.
    #[error("Line amount cannot be negative")]
    NegativeAmount,

    /// A line must carry exactly one of debit or credit.
    #[error("Line must have exactly one of debit or credit set")]
    InvalidLineAmounts,

    // ========== Account & Segment Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountCode),

    /// Account is inactive and cannot be used.
    #[error("Account {0} is inactive")]
    AccountInactive(AccountCode),

    /// Account does not allow manual entry.
    #[error("Account {0} does not allow manual entry")]
    AccountNoManualEntry(AccountCode),

    /// Segment values do not form a valid account identifier.
    #[error("Invalid segment combination at position {position}: {reason}")]
    InvalidSegmentCombination {
        /// 1-based position of the first offending segment.
        position: usize,
        /// What is wrong with it.
        reason: String,
    },

    // ========== Fiscal Period Errors ==========
    /// No fiscal period found for the transaction date.
    #[error("No fiscal period found for date {0}")]
    NoFiscalPeriod(NaiveDate),

    /// Fiscal period is closed for the transaction's module.
    #[error("Period {period} is closed for {module}")]
    PeriodClosed {
        /// The resolved period.
        period: FiscalPeriodId,
        /// The module the transaction belongs to.
        module: LedgerModule,
    },

    // ========== Transaction State Errors ==========
    /// Cannot modify a posted transaction; only reversal is permitted.
    #[error("Cannot modify posted transaction")]
    CannotModifyPosted,

    /// Can only delete draft transactions.
    #[error("Can only delete draft transactions")]
    CanOnlyDeleteDraft,

    /// Only posted transactions can be reversed.
    #[error("Transaction {0} is not posted and cannot be reversed")]
    NotPosted(TransactionId),

    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    // ========== Propagated Errors ==========
    /// Fiscal calendar administration error.
    #[error(transparent)]
    Fiscal(#[from] FiscalError),

    /// Consistency cascade failure; the enclosing transaction rolls back.
    #[error("Cascade error: {0}")]
    Cascade(#[from] EngineError),

    /// Persistence store failure.
    #[error("Store error: {0}")]
    Store(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientLines => "INSUFFICIENT_LINES",
            Self::UnbalancedTransaction { .. } => "UNBALANCED_TRANSACTION",
            Self::ZeroAmount => "ZERO_AMOUNT",
            Self::NegativeAmount => "NEGATIVE_AMOUNT",
            Self::InvalidLineAmounts => "INVALID_LINE_AMOUNTS",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::AccountInactive(_) => "ACCOUNT_INACTIVE",
            Self::AccountNoManualEntry(_) => "ACCOUNT_NO_MANUAL_ENTRY",
            Self::InvalidSegmentCombination { .. } => "INVALID_SEGMENT_COMBINATION",
            Self::NoFiscalPeriod(_) => "NO_FISCAL_PERIOD",
            Self::PeriodClosed { .. } => "PERIOD_CLOSED",
            Self::CannotModifyPosted => "CANNOT_MODIFY_POSTED",
            Self::CanOnlyDeleteDraft => "CAN_ONLY_DELETE_DRAFT",
            Self::NotPosted(_) => "NOT_POSTED",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::Fiscal(_) => "FISCAL_ERROR",
            Self::Cascade(_) => "CASCADE_ERROR",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Returns true if the caller may safely retry the whole operation.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Cascade(_))
    }
}

impl From<LedgerError> for keel_shared::AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientLines
            | LedgerError::ZeroAmount
            | LedgerError::NegativeAmount
            | LedgerError::InvalidLineAmounts
            | LedgerError::InvalidSegmentCombination { .. } => Self::Validation(err.to_string()),
            LedgerError::AccountNotFound(_) | LedgerError::TransactionNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            LedgerError::UnbalancedTransaction { .. }
            | LedgerError::AccountInactive(_)
            | LedgerError::AccountNoManualEntry(_)
            | LedgerError::NoFiscalPeriod(_)
            | LedgerError::PeriodClosed { .. }
            | LedgerError::CannotModifyPosted
            | LedgerError::CanOnlyDeleteDraft
            | LedgerError::NotPosted(_) => Self::BusinessRule(err.to_string()),
            LedgerError::Fiscal(FiscalError::PeriodNotFound { .. }) => {
                Self::NotFound(err.to_string())
            }
            LedgerError::Fiscal(_) => Self::Conflict(err.to_string()),
            LedgerError::Cascade(inner) => inner.into(),
            LedgerError::Store(message) => Self::Store(message),
        }
    }
}
