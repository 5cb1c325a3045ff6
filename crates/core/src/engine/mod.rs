//! Cascading consistency engine.
//!
//! Given a changed record kind and a set of ids, the engine recomputes every
//! dependent aggregate column bottom-up (children first) and propagates the
//! effect upward through the dependency graph until nothing changes. It also
//! offers read-only verification of every persisted aggregate.

pub mod cascade;
pub mod error;
pub mod store;

pub use cascade::{CascadeReport, ConsistencyEngine, Discrepancy};
pub use error::EngineError;
pub use store::RecordStore;
