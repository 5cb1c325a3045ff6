//! Fiscal period types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The consuming modules a fiscal period can be open or closed for.
///
/// Each period carries one independent flag per module; closing the general
/// ledger does not stop bank postings, and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerModule {
    /// General ledger (manual journal entries).
    GeneralLedger,
    /// Bank transactions.
    Bank,
    /// Accounts receivable.
    Receivables,
    /// Accounts payable.
    Payables,
}

impl LedgerModule {
    /// All modules, in flag order.
    pub const ALL: [Self; 4] = [
        Self::GeneralLedger,
        Self::Bank,
        Self::Receivables,
        Self::Payables,
    ];
}

impl std::fmt::Display for LedgerModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::GeneralLedger => "GL",
            Self::Bank => "BANK",
            Self::Receivables => "AR",
            Self::Payables => "AP",
        };
        f.write_str(s)
    }
}

/// Short fixed-format period identifier, e.g. `per05`.
///
/// Deliberately distinct from the numeric (fiscal year, period number) pair;
/// persisted layouts reference periods by this string within a year.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FiscalPeriodId(String);

impl FiscalPeriodId {
    /// Builds the canonical id for a period number.
    #[must_use]
    pub fn from_period_number(period_number: u32) -> Self {
        Self(format!("per{period_number:02}"))
    }

    /// Returns the id string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FiscalPeriodId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-module open/closed flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleFlags {
    /// General ledger postings allowed.
    pub general_ledger: bool,
    /// Bank postings allowed.
    pub bank: bool,
    /// Receivable postings allowed.
    pub receivables: bool,
    /// Payable postings allowed.
    pub payables: bool,
}

impl ModuleFlags {
    /// All modules open.
    #[must_use]
    pub const fn all_open() -> Self {
        Self {
            general_ledger: true,
            bank: true,
            receivables: true,
            payables: true,
        }
    }

    /// Reads one module's flag.
    #[must_use]
    pub const fn get(&self, module: LedgerModule) -> bool {
        match module {
            LedgerModule::GeneralLedger => self.general_ledger,
            LedgerModule::Bank => self.bank,
            LedgerModule::Receivables => self.receivables,
            LedgerModule::Payables => self.payables,
        }
    }

    /// Flips exactly one module's flag, leaving the other three untouched.
    pub fn set(&mut self, module: LedgerModule, open: bool) {
        match module {
            LedgerModule::GeneralLedger => self.general_ledger = open,
            LedgerModule::Bank => self.bank = open,
            LedgerModule::Receivables => self.receivables = open,
            LedgerModule::Payables => self.payables = open,
        }
    }
}

impl Default for ModuleFlags {
    fn default() -> Self {
        Self::all_open()
    }
}

/// A fiscal period within a fiscal year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalPeriod {
    /// Short period identifier (e.g. `per05`), unique within the year.
    pub id: FiscalPeriodId,
    /// Fiscal year this period belongs to.
    pub fiscal_year: i32,
    /// Period number within the year (1-12 for monthly).
    pub period_number: u32,
    /// Start date of the period (inclusive).
    pub start_date: NaiveDate,
    /// End date of the period (inclusive).
    pub end_date: NaiveDate,
    /// Per-module open/closed flags.
    pub flags: ModuleFlags,
}

impl FiscalPeriod {
    /// Creates a period open for every module.
    #[must_use]
    pub fn new(
        fiscal_year: i32,
        period_number: u32,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            id: FiscalPeriodId::from_period_number(period_number),
            fiscal_year,
            period_number,
            start_date,
            end_date,
            flags: ModuleFlags::all_open(),
        }
    }

    /// Returns true if the given date falls within this period.
    #[must_use]
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Returns true if the period is open for the given module.
    #[must_use]
    pub const fn is_open_for(&self, module: LedgerModule) -> bool {
        self.flags.get(module)
    }

    /// Returns true if this period's date range overlaps another's.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start_date <= other.end_date && other.start_date <= self.end_date
    }
}
