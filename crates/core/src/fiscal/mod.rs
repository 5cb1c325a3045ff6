//! Fiscal calendar and per-module period locking.

pub mod calendar;
pub mod period;

pub use calendar::{FiscalCalendar, FiscalError};
pub use period::{FiscalPeriod, FiscalPeriodId, LedgerModule};
