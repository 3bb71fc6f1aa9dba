//! Commit payload types: operations and change sets

use crate::rdf::{NamedNode, Quad};
use indexmap::IndexSet;
use std::fmt;

/// Kind of an update operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Insert quads
    Add,
    /// Delete quads
    Remove,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Add => "ADD",
            OperationKind::Remove => "REMOVE",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ADD or REMOVE over a set of quads
///
/// When `graphs` is non-empty every quad is applied once per target graph,
/// with its own graph name replaced by the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    kind: OperationKind,
    quads: IndexSet<Quad>,
    graphs: IndexSet<NamedNode>,
}

impl Operation {
    pub fn new(kind: OperationKind, quads: impl IntoIterator<Item = Quad>) -> Self {
        Self {
            kind,
            quads: quads.into_iter().collect(),
            graphs: IndexSet::new(),
        }
    }

    /// ADD operation
    pub fn add(quads: impl IntoIterator<Item = Quad>) -> Self {
        Self::new(OperationKind::Add, quads)
    }

    /// REMOVE operation
    pub fn remove(quads: impl IntoIterator<Item = Quad>) -> Self {
        Self::new(OperationKind::Remove, quads)
    }

    /// Restrict the operation to the given named graphs
    pub fn with_graphs(mut self, graphs: impl IntoIterator<Item = NamedNode>) -> Self {
        self.graphs.extend(graphs);
        self
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Quads as written in the operation
    pub fn quads(&self) -> &IndexSet<Quad> {
        &self.quads
    }

    /// Target graphs (empty = use each quad's own graph)
    pub fn graphs(&self) -> &IndexSet<NamedNode> {
        &self.graphs
    }

    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    /// Number of statements the operation touches after graph expansion
    pub fn statement_count(&self) -> usize {
        self.quads.len() * self.graphs.len().max(1)
    }

    /// The concrete statements this operation applies to
    pub fn statements(&self) -> Vec<Quad> {
        if self.graphs.is_empty() {
            return self.quads.iter().cloned().collect();
        }
        let mut out = Vec::with_capacity(self.statement_count());
        for quad in &self.quads {
            for graph in &self.graphs {
                out.push(quad.in_graph(Some(graph.clone())));
            }
        }
        out
    }
}

/// Net effect of a commit: quads actually added and actually removed
///
/// The two sets are always disjoint. Recording an addition of a quad that was
/// removed earlier in the same change set cancels the removal, and the other
/// way round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    added: IndexSet<Quad>,
    removed: IndexSet<Quad>,
}

impl ChangeSet {
    pub fn new(
        added: impl IntoIterator<Item = Quad>,
        removed: impl IntoIterator<Item = Quad>,
    ) -> Self {
        let mut changes = Self::default();
        for quad in removed {
            changes.record_removed(quad);
        }
        for quad in added {
            changes.record_added(quad);
        }
        changes
    }

    pub fn record_added(&mut self, quad: Quad) {
        if !self.removed.shift_remove(&quad) {
            self.added.insert(quad);
        }
    }

    pub fn record_removed(&mut self, quad: Quad) {
        if !self.added.shift_remove(&quad) {
            self.removed.insert(quad);
        }
    }

    pub fn added(&self) -> impl Iterator<Item = &Quad> {
        self.added.iter()
    }

    pub fn removed(&self) -> impl Iterator<Item = &Quad> {
        self.removed.iter()
    }

    pub fn is_added(&self, quad: &Quad) -> bool {
        self.added.contains(quad)
    }

    pub fn is_removed(&self, quad: &Quad) -> bool {
        self.removed.contains(quad)
    }

    pub fn added_count(&self) -> usize {
        self.added.len()
    }

    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// The change set as operations, removals first
    pub fn to_operations(&self) -> Vec<Operation> {
        let mut ops = Vec::with_capacity(2);
        if !self.removed.is_empty() {
            ops.push(Operation::remove(self.removed.iter().cloned()));
        }
        if !self.added.is_empty() {
            ops.push(Operation::add(self.added.iter().cloned()));
        }
        ops
    }
}
