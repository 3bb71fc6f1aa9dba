//! Session-level transactions
//!
//! A `Transaction` buffers operations and commits them as one version.
//! Dropping it without committing discards everything.

use super::operation::{Operation, OperationKind};
use super::store::VersionedStore;
use super::version::Version;
use super::VersionResult;
use crate::rdf::{NamedNode, Quad, QuadPattern};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
enum Pending {
    Op(Operation),
    /// Resolved against head when the transaction commits
    RemoveMatching(QuadPattern),
}

/// Buffered unit of work against a `VersionedStore`
#[must_use = "a transaction does nothing until committed"]
pub struct Transaction<'a> {
    store: &'a VersionedStore,
    pending: Vec<Pending>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(store: &'a VersionedStore) -> Self {
        Self {
            store,
            pending: Vec::new(),
        }
    }

    pub fn add(&mut self, quads: impl IntoIterator<Item = Quad>) -> &mut Self {
        self.push(Operation::add(quads))
    }

    /// Add every quad once into each of `graphs`
    pub fn add_to_graphs(
        &mut self,
        quads: impl IntoIterator<Item = Quad>,
        graphs: impl IntoIterator<Item = NamedNode>,
    ) -> &mut Self {
        self.push(Operation::add(quads).with_graphs(graphs))
    }

    pub fn remove(&mut self, quads: impl IntoIterator<Item = Quad>) -> &mut Self {
        self.push(Operation::remove(quads))
    }

    /// Remove the quads from `graphs` only
    pub fn remove_from_graphs(
        &mut self,
        quads: impl IntoIterator<Item = Quad>,
        graphs: impl IntoIterator<Item = NamedNode>,
    ) -> &mut Self {
        self.push(Operation::remove(quads).with_graphs(graphs))
    }

    /// Remove every quad matching `pattern` at commit time
    pub fn remove_matching(&mut self, pattern: QuadPattern) -> &mut Self {
        self.pending.push(Pending::RemoveMatching(pattern));
        self
    }

    pub fn push(&mut self, operation: Operation) -> &mut Self {
        self.pending.push(Pending::Op(operation));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Buffered operations so far
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn commit(self, message: &str) -> VersionResult<Arc<Version>> {
        self.finish(Some(message.to_string()))
    }

    pub fn commit_without_message(self) -> VersionResult<Arc<Version>> {
        self.finish(None)
    }

    /// Discard the buffered operations
    pub fn rollback(self) {
        debug!("Rolled back transaction with {} operations", self.pending.len());
    }

    fn finish(self, message: Option<String>) -> VersionResult<Arc<Version>> {
        let _writer = self.store.acquire_writer()?;
        let head = self.store.snapshot();

        let mut operations: Vec<Operation> = Vec::with_capacity(self.pending.len());
        for pending in self.pending {
            match pending {
                Pending::Op(op) => operations.push(op),
                Pending::RemoveMatching(pattern) => {
                    let mut matched = head.query(&pattern);
                    // quads added earlier in this transaction are not in head yet
                    for op in operations.iter().filter(|op| op.kind() == OperationKind::Add) {
                        matched.extend(op.statements().into_iter().filter(|q| pattern.matches(q)));
                    }
                    if !matched.is_empty() {
                        operations.push(Operation::remove(matched));
                    }
                }
            }
        }

        self.store.commit_locked(operations, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::{Literal, RdfPredicate};
    use crate::versioning::VersionError;

    fn iri(s: &str) -> NamedNode {
        NamedNode::new(&format!("http://example.org/{s}")).unwrap()
    }

    fn mbox(who: &str, addr: &str) -> Quad {
        Quad::triple(
            iri(who),
            RdfPredicate::new("http://xmlns.com/foaf/0.1/mbox").unwrap(),
            Literal::new_simple_literal(addr),
        )
    }

    #[test]
    fn test_commit_groups_operations() {
        let store = VersionedStore::in_memory();
        let mut tx = store.begin();
        tx.add([mbox("alice", "alice@example.org")])
            .add([mbox("bob", "bob@example.org")]);
        assert_eq!(tx.len(), 2);
        let v1 = tx.commit("Add Alice and Bob").unwrap();

        assert_eq!(v1.operations().len(), 2);
        assert_eq!(store.snapshot().len(), 2);
        assert_eq!(store.version_count(), 1);
    }

    #[test]
    fn test_rollback_and_drop_discard() {
        let store = VersionedStore::in_memory();
        let mut tx = store.begin();
        tx.add([mbox("alice", "a@example.org")]);
        tx.rollback();

        {
            let mut tx = store.begin();
            tx.add([mbox("bob", "b@example.org")]);
        }
        assert!(store.head().is_none());
    }

    #[test]
    fn test_remove_matching_replaces_value() {
        let store = VersionedStore::in_memory();
        let mut tx = store.begin();
        tx.add([mbox("alice", "alice@example.org")]);
        tx.commit("initial").unwrap();

        let pattern = QuadPattern::any()
            .subject(iri("alice"))
            .predicate(RdfPredicate::new("http://xmlns.com/foaf/0.1/mbox").unwrap());
        let mut tx = store.begin();
        tx.remove_matching(pattern)
            .add([mbox("alice", "alice@work.example.org")]);
        let v2 = tx.commit("Change Alice's mailbox").unwrap();

        assert_eq!(v2.changes().added_count(), 1);
        assert_eq!(v2.changes().removed_count(), 1);
        let head = store.snapshot();
        assert!(head.contains(&mbox("alice", "alice@work.example.org")));
        assert!(!head.contains(&mbox("alice", "alice@example.org")));
    }

    #[test]
    fn test_remove_matching_sees_earlier_adds() {
        let store = VersionedStore::in_memory();
        let mut tx = store.begin();
        tx.add([mbox("carol", "c@example.org")])
            .remove_matching(QuadPattern::any().subject(iri("carol")));
        let v1 = tx.commit_without_message().unwrap();
        assert!(v1.message().is_none());
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_graph_scoped_operations() {
        let store = VersionedStore::in_memory();
        let (g1, g2) = (iri("g1"), iri("g2"));
        let mut tx = store.begin();
        tx.add_to_graphs([mbox("alice", "a@example.org")], [g1.clone(), g2.clone()]);
        tx.commit("graphs").unwrap();
        assert_eq!(store.snapshot().graphs(), vec![g1.clone(), g2.clone()]);

        let mut tx = store.begin();
        tx.remove_from_graphs([mbox("alice", "a@example.org")], [g1]);
        tx.commit("drop g1").unwrap();
        assert_eq!(store.snapshot().graphs(), vec![g2]);
    }

    #[test]
    fn test_empty_operation_rejected() {
        let store = VersionedStore::in_memory();
        let mut tx = store.begin();
        tx.add([]);
        assert!(matches!(
            tx.commit("nothing"),
            Err(VersionError::ValidationFailure(_))
        ));
        assert!(store.head().is_none());
    }
}
