//! Dependency graph over record kinds.
//!
//! This module describes which record kinds derive state from which others,
//! e.g. "invoice depends on invoice_detail". The graph is built once at
//! process start from a static declaration list and is read-only during
//! request processing; the consistency engine walks it to order cascades.

pub mod dependency;
pub mod kind;

pub use dependency::{DependencyGraph, DependencyGraphBuilder, GraphError};
pub use kind::RecordKind;
