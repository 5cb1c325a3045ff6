//! Catalog of derived-column recompute rules.
//!
//! Every persisted aggregate column has exactly one authoritative
//! recomputation rule here. The rule is a typed query object, not an
//! embedded expression string, so it can be unit-tested without a store.

pub mod catalog;
pub mod expr;

pub use catalog::AggregateColumnCatalog;
pub use expr::AggregateExpr;
