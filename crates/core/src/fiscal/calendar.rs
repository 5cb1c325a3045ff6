//! Fiscal calendar: period lookup and open/close administration.

use std::sync::RwLock;

use chrono::{Months, NaiveDate};
use thiserror::Error;
use tracing::info;

use super::period::{FiscalPeriod, LedgerModule};

/// Errors raised by calendar administration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FiscalError {
    /// The new period's date range overlaps an existing period.
    #[error("Period {fiscal_year} #{period_number} overlaps an existing period")]
    OverlappingPeriod {
        /// Fiscal year of the rejected period.
        fiscal_year: i32,
        /// Period number of the rejected period.
        period_number: u32,
    },

    /// A period with the same (year, number) already exists.
    #[error("Period {fiscal_year} #{period_number} is already defined")]
    DuplicatePeriod {
        /// Fiscal year of the rejected period.
        fiscal_year: i32,
        /// Period number of the rejected period.
        period_number: u32,
    },

    /// No period with the given (year, number).
    #[error("No fiscal period {fiscal_year} #{period_number}")]
    PeriodNotFound {
        /// Requested fiscal year.
        fiscal_year: i32,
        /// Requested period number.
        period_number: u32,
    },
}

impl FiscalError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::OverlappingPeriod { .. } => "OVERLAPPING_PERIOD",
            Self::DuplicatePeriod { .. } => "DUPLICATE_PERIOD",
            Self::PeriodNotFound { .. } => "PERIOD_NOT_FOUND",
        }
    }
}

/// Process-wide fiscal calendar.
///
/// Periods never overlap, so any date resolves to at most one period.
/// Interior locking keeps the admin operations (`open_for`/`close_for`)
/// consistent with concurrent posting-time lookups.
#[derive(Debug, Default)]
pub struct FiscalCalendar {
    periods: RwLock<Vec<FiscalPeriod>>,
}

impl FiscalCalendar {
    /// Creates an empty calendar.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a calendar holding twelve monthly periods starting at
    /// `start_date` (typically the first day of the fiscal year).
    ///
    /// # Errors
    ///
    /// Returns an error only if the generated periods collide, which cannot
    /// happen for a valid start date.
    pub fn monthly_year(fiscal_year: i32, start_date: NaiveDate) -> Result<Self, FiscalError> {
        let calendar = Self::new();
        for number in 1..=12u32 {
            let start = start_date + Months::new(number - 1);
            let end = (start_date + Months::new(number)) - chrono::Days::new(1);
            calendar.add_period(FiscalPeriod::new(fiscal_year, number, start, end))?;
        }
        Ok(calendar)
    }

    /// Registers a period.
    ///
    /// # Errors
    ///
    /// Returns [`FiscalError::DuplicatePeriod`] for a repeated
    /// (year, number), or [`FiscalError::OverlappingPeriod`] if the date
    /// range overlaps an existing period.
    pub fn add_period(&self, period: FiscalPeriod) -> Result<(), FiscalError> {
        let mut periods = self.periods.write().expect("fiscal calendar lock poisoned");
        if periods
            .iter()
            .any(|p| p.fiscal_year == period.fiscal_year && p.period_number == period.period_number)
        {
            return Err(FiscalError::DuplicatePeriod {
                fiscal_year: period.fiscal_year,
                period_number: period.period_number,
            });
        }
        if periods.iter().any(|p| p.overlaps(&period)) {
            return Err(FiscalError::OverlappingPeriod {
                fiscal_year: period.fiscal_year,
                period_number: period.period_number,
            });
        }
        periods.push(period);
        Ok(())
    }

    /// Returns the single period containing `date`, or `None`.
    #[must_use]
    pub fn period_for_date(&self, date: NaiveDate) -> Option<FiscalPeriod> {
        self.periods
            .read()
            .expect("fiscal calendar lock poisoned")
            .iter()
            .find(|p| p.contains_date(date))
            .cloned()
    }

    /// Looks up a period by (year, number).
    #[must_use]
    pub fn period(&self, fiscal_year: i32, period_number: u32) -> Option<FiscalPeriod> {
        self.periods
            .read()
            .expect("fiscal calendar lock poisoned")
            .iter()
            .find(|p| p.fiscal_year == fiscal_year && p.period_number == period_number)
            .cloned()
    }

    /// Opens one module of a period; the other three flags are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`FiscalError::PeriodNotFound`] if no such period exists.
    pub fn open_for(
        &self,
        fiscal_year: i32,
        period_number: u32,
        module: LedgerModule,
    ) -> Result<(), FiscalError> {
        self.set_flag(fiscal_year, period_number, module, true)
    }

    /// Closes one module of a period; the other three flags are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`FiscalError::PeriodNotFound`] if no such period exists.
    pub fn close_for(
        &self,
        fiscal_year: i32,
        period_number: u32,
        module: LedgerModule,
    ) -> Result<(), FiscalError> {
        self.set_flag(fiscal_year, period_number, module, false)
    }

    fn set_flag(
        &self,
        fiscal_year: i32,
        period_number: u32,
        module: LedgerModule,
        open: bool,
    ) -> Result<(), FiscalError> {
        let mut periods = self.periods.write().expect("fiscal calendar lock poisoned");
        let period = periods
            .iter_mut()
            .find(|p| p.fiscal_year == fiscal_year && p.period_number == period_number)
            .ok_or(FiscalError::PeriodNotFound {
                fiscal_year,
                period_number,
            })?;
        period.flags.set(module, open);
        info!(
            period = %period.id,
            %fiscal_year,
            %module,
            open,
            "fiscal period flag changed"
        );
        Ok(())
    }
}
