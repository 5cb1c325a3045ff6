//! In-memory persistence for Keel.
//!
//! Implements every store seam the core exposes (`RecordStore`,
//! `LedgerStore`, `ProcessedEventStore`) on concurrent maps. One
//! [`MemoryStore`] plays the role a single database would: posting a
//! transaction publishes its lines into the record side, so the balance
//! cascade reads what the ledger wrote.

pub mod memory;

pub use memory::MemoryStore;
