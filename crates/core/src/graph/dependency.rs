//! Directed dependency graph with cycle rejection at registration time.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use thiserror::Error;

use super::kind::RecordKind;

/// Errors raised while declaring the dependency graph.
///
/// All of these are configuration errors: they surface at build time, never
/// during traversal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    /// A kind cannot depend on itself.
    #[error("Kind {0} cannot depend on itself")]
    SelfLoop(RecordKind),

    /// Adding the link would make the graph cyclic.
    #[error("Link {parent} -> {child} would create a cycle")]
    CycleDetected {
        /// The dependent kind of the rejected link.
        parent: RecordKind,
        /// The dependency kind of the rejected link.
        child: RecordKind,
    },

    /// The link to remove is not registered.
    #[error("Link {parent} -> {child} is not registered")]
    LinkNotFound {
        /// The dependent kind of the missing link.
        parent: RecordKind,
        /// The dependency kind of the missing link.
        child: RecordKind,
    },
}

impl GraphError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::SelfLoop(_) => "SELF_LOOP",
            Self::CycleDetected { .. } => "CYCLE_DETECTED",
            Self::LinkNotFound { .. } => "LINK_NOT_FOUND",
        }
    }
}

/// Directed acyclic graph of record-kind dependencies.
///
/// An edge `(parent, child)` means "parent's derived state depends on
/// child's rows". Adjacency is kept in ordered maps so every traversal
/// produces a deterministic order.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// parent -> kinds it depends on.
    children: BTreeMap<RecordKind, BTreeSet<RecordKind>>,
    /// child -> kinds that depend on it.
    parents: BTreeMap<RecordKind, BTreeSet<RecordKind>>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a builder for declaring links fluently.
    #[must_use]
    pub fn builder() -> DependencyGraphBuilder {
        DependencyGraphBuilder::new()
    }

    /// Registers a dependency link.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::SelfLoop`] if `parent == child`, or
    /// [`GraphError::CycleDetected`] if the link would make the graph cyclic.
    pub fn add_link(&mut self, parent: RecordKind, child: RecordKind) -> Result<(), GraphError> {
        if parent == child {
            return Err(GraphError::SelfLoop(parent));
        }
        // A cycle appears iff the child already (transitively) depends on
        // the parent.
        if self.descendants(child).contains(&parent) {
            return Err(GraphError::CycleDetected { parent, child });
        }

        self.children.entry(parent).or_default().insert(child);
        self.parents.entry(child).or_default().insert(parent);
        self.children.entry(child).or_default();
        self.parents.entry(parent).or_default();
        Ok(())
    }

    /// Removes a previously registered link.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::LinkNotFound`] if the link is not registered.
    pub fn remove_link(&mut self, parent: RecordKind, child: RecordKind) -> Result<(), GraphError> {
        let present = self
            .children
            .get_mut(&parent)
            .is_some_and(|set| set.remove(&child));
        if !present {
            return Err(GraphError::LinkNotFound { parent, child });
        }
        if let Some(set) = self.parents.get_mut(&child) {
            set.remove(&parent);
        }
        Ok(())
    }

    /// Returns true if the kind is registered.
    #[must_use]
    pub fn contains(&self, kind: RecordKind) -> bool {
        self.children.contains_key(&kind)
    }

    /// Kinds the given kind directly depends on.
    #[must_use]
    pub fn children_of(&self, kind: RecordKind) -> Vec<RecordKind> {
        self.children
            .get(&kind)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Kinds that directly depend on the given kind.
    #[must_use]
    pub fn parents_of(&self, kind: RecordKind) -> Vec<RecordKind> {
        self.parents
            .get(&kind)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// All kinds that transitively depend on `kind`, excluding `kind`.
    ///
    /// Diamond dependencies are tolerated: a kind reachable via two paths
    /// appears once.
    #[must_use]
    pub fn ancestors(&self, kind: RecordKind) -> Vec<RecordKind> {
        self.walk(kind, &self.parents)
    }

    /// All kinds `kind` transitively depends on, excluding `kind`.
    #[must_use]
    pub fn descendants(&self, kind: RecordKind) -> Vec<RecordKind> {
        self.walk(kind, &self.children)
    }

    /// Kinds with no parent (nothing depends on them).
    #[must_use]
    pub fn roots(&self) -> Vec<RecordKind> {
        self.parents
            .iter()
            .filter(|(_, parents)| parents.is_empty())
            .map(|(kind, _)| *kind)
            .collect()
    }

    /// Breadth-first enumeration of every kind starting from the roots.
    ///
    /// The order is deterministic (roots and adjacency are kept sorted),
    /// which keeps cascade processing and verification reports stable.
    #[must_use]
    pub fn kinds_breadth_first(&self) -> Vec<RecordKind> {
        let mut visited: BTreeSet<RecordKind> = BTreeSet::new();
        let mut order = Vec::with_capacity(self.children.len());
        let mut queue: VecDeque<RecordKind> = self.roots().into();

        while let Some(kind) = queue.pop_front() {
            if !visited.insert(kind) {
                continue;
            }
            order.push(kind);
            for child in self.children_of(kind) {
                if !visited.contains(&child) {
                    queue.push_back(child);
                }
            }
        }
        order
    }

    /// BFS over one adjacency map with a visited set, excluding the start.
    fn walk(
        &self,
        start: RecordKind,
        adjacency: &BTreeMap<RecordKind, BTreeSet<RecordKind>>,
    ) -> Vec<RecordKind> {
        let mut visited: BTreeSet<RecordKind> = BTreeSet::new();
        let mut order = Vec::new();
        let mut queue: VecDeque<RecordKind> = VecDeque::new();
        queue.push_back(start);

        while let Some(kind) = queue.pop_front() {
            let Some(next) = adjacency.get(&kind) else {
                continue;
            };
            for neighbor in next {
                if visited.insert(*neighbor) {
                    order.push(*neighbor);
                    queue.push_back(*neighbor);
                }
            }
        }
        order
    }
}

/// Fluent builder for the static link declaration list.
///
/// Collects links and validates the whole set when [`build`] is called, so a
/// misdeclared relation fails process startup instead of a later cascade.
///
/// [`build`]: DependencyGraphBuilder::build
#[derive(Debug, Default)]
pub struct DependencyGraphBuilder {
    links: Vec<(RecordKind, RecordKind)>,
}

impl DependencyGraphBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares that `parent`'s derived state depends on `child`'s rows.
    #[must_use]
    pub fn link(mut self, parent: RecordKind, child: RecordKind) -> Self {
        self.links.push((parent, child));
        self
    }

    /// Validates the declaration list and builds the graph.
    ///
    /// # Errors
    ///
    /// Returns the first [`GraphError`] encountered.
    pub fn build(self) -> Result<DependencyGraph, GraphError> {
        let mut graph = DependencyGraph::new();
        for (parent, child) in self.links {
            graph.add_link(parent, child)?;
        }
        Ok(graph)
    }
}
