//! Record-kind tags.

use serde::Serialize;

/// Identifies one kind of tracked record (a table, conceptually).
///
/// Kinds are declared statically at startup, which is what lets the graph
/// reject misconfiguration before any request is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordKind(&'static str);

impl RecordKind {
    /// Creates a kind tag from a static name.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Returns the kind name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}
