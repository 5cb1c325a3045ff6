//! Core business logic for Keel.
//!
//! This crate contains pure business logic with ZERO web or database
//! dependencies. Persistence is reached only through the store traits
//! defined here and implemented elsewhere.
//!
//! # Modules
//!
//! - `graph` - Dependency graph over record kinds
//! - `aggregate` - Catalog of derived-column recompute rules
//! - `engine` - Cascading consistency engine
//! - `ledger` - Double-entry posting rules and account codes
//! - `fiscal` - Fiscal calendar and per-module period locking
//! - `webhook` - Idempotent payment-event intake

pub mod aggregate;
pub mod engine;
pub mod fiscal;
pub mod graph;
pub mod ledger;
pub mod webhook;
