//! In-memory quad store
//!
//! `QuadSet` is the materialized statement set of one version. It is cheap to
//! share behind an `Arc` and is copied on write when a commit lands while a
//! reader still holds the previous snapshot.

use super::types::{NamedNode, Quad, QuadPattern, RdfPredicate, RdfSubject};
use crate::versioning::{ChangeSet, Operation, OperationKind};
use rustc_hash::{FxHashMap, FxHashSet};

/// Quad set with subject, predicate and graph indices
///
/// Patterns with a bound subject, predicate or graph are answered from the
/// smallest matching bucket instead of a full scan.
#[derive(Clone, Debug, Default)]
pub struct QuadSet {
    /// All quads (primary storage)
    quads: FxHashSet<Quad>,

    /// Subject -> quads with that subject
    by_subject: FxHashMap<RdfSubject, FxHashSet<Quad>>,

    /// Predicate -> quads with that predicate
    by_predicate: FxHashMap<RdfPredicate, FxHashSet<Quad>>,

    /// Graph -> quads in that graph (None = default graph)
    by_graph: FxHashMap<Option<NamedNode>, FxHashSet<Quad>>,
}

impl QuadSet {
    /// Create a new empty quad set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a quad. Returns false if it was already present.
    pub fn insert(&mut self, quad: Quad) -> bool {
        if self.quads.contains(&quad) {
            return false;
        }
        self.by_subject
            .entry(quad.subject.clone())
            .or_default()
            .insert(quad.clone());
        self.by_predicate
            .entry(quad.predicate.clone())
            .or_default()
            .insert(quad.clone());
        self.by_graph
            .entry(quad.graph.clone())
            .or_default()
            .insert(quad.clone());
        self.quads.insert(quad);
        true
    }

    /// Remove a quad. Returns false if it was not present.
    pub fn remove(&mut self, quad: &Quad) -> bool {
        if !self.quads.remove(quad) {
            return false;
        }
        remove_from_bucket(&mut self.by_subject, &quad.subject, quad);
        remove_from_bucket(&mut self.by_predicate, &quad.predicate, quad);
        remove_from_bucket(&mut self.by_graph, &quad.graph, quad);
        true
    }

    /// Check if a quad exists in the set
    pub fn contains(&self, quad: &Quad) -> bool {
        self.quads.contains(quad)
    }

    /// Get the total number of quads
    pub fn len(&self) -> usize {
        self.quads.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    /// Iterate over all quads (unordered)
    pub fn iter(&self) -> impl Iterator<Item = &Quad> {
        self.quads.iter()
    }

    /// All quads sorted by their N-Quads rendering
    pub fn sorted(&self) -> Vec<Quad> {
        let mut quads: Vec<Quad> = self.quads.iter().cloned().collect();
        quads.sort_by_cached_key(|q| q.to_string());
        quads
    }

    /// Named graphs that currently hold at least one quad
    pub fn graphs(&self) -> Vec<NamedNode> {
        let mut graphs: Vec<NamedNode> = self
            .by_graph
            .keys()
            .filter_map(|g| g.clone())
            .collect();
        graphs.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        graphs
    }

    /// Quads of one graph (None = default graph)
    pub fn quads_in_graph(&self, graph: Option<&NamedNode>) -> Vec<Quad> {
        self.by_graph
            .get(&graph.cloned())
            .map(|bucket| bucket.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Query quads matching a pattern
    pub fn query(&self, pattern: &QuadPattern) -> Vec<Quad> {
        let mut candidates: Option<&FxHashSet<Quad>> = None;

        if let Some(subject) = &pattern.subject {
            match self.by_subject.get(subject) {
                Some(bucket) => candidates = Some(smallest(candidates, bucket)),
                None => return Vec::new(),
            }
        }
        if let Some(predicate) = &pattern.predicate {
            match self.by_predicate.get(predicate) {
                Some(bucket) => candidates = Some(smallest(candidates, bucket)),
                None => return Vec::new(),
            }
        }
        if let Some(graph) = &pattern.graph {
            match self.by_graph.get(graph) {
                Some(bucket) => candidates = Some(smallest(candidates, bucket)),
                None => return Vec::new(),
            }
        }

        candidates
            .unwrap_or(&self.quads)
            .iter()
            .filter(|quad| pattern.matches(quad))
            .cloned()
            .collect()
    }

    /// Apply an ordered sequence of operations in place
    ///
    /// ADD is idempotent and REMOVE of an absent quad is a no-op. Returns the
    /// effective change relative to the state before the call.
    pub fn apply_in_place(&mut self, operations: &[Operation]) -> ChangeSet {
        let mut changes = ChangeSet::default();
        for op in operations {
            for quad in op.statements() {
                match op.kind() {
                    OperationKind::Add => {
                        if self.insert(quad.clone()) {
                            changes.record_added(quad);
                        }
                    }
                    OperationKind::Remove => {
                        if self.remove(&quad) {
                            changes.record_removed(quad);
                        }
                    }
                }
            }
        }
        changes
    }

    /// Apply operations to a copy of this set and return the new snapshot
    pub fn apply(&self, operations: &[Operation]) -> QuadSet {
        let mut next = self.clone();
        next.apply_in_place(operations);
        next
    }

    /// Replay a recorded change set forward
    pub fn apply_changes(&mut self, changes: &ChangeSet) {
        for quad in changes.removed() {
            self.remove(quad);
        }
        for quad in changes.added() {
            self.insert(quad.clone());
        }
    }

    /// Undo a recorded change set
    pub fn unapply_changes(&mut self, changes: &ChangeSet) {
        for quad in changes.added() {
            self.remove(quad);
        }
        for quad in changes.removed() {
            self.insert(quad.clone());
        }
    }

    /// Remove all quads
    pub fn clear(&mut self) {
        self.quads.clear();
        self.by_subject.clear();
        self.by_predicate.clear();
        self.by_graph.clear();
    }
}

impl PartialEq for QuadSet {
    fn eq(&self, other: &Self) -> bool {
        self.quads == other.quads
    }
}

impl Eq for QuadSet {}

impl FromIterator<Quad> for QuadSet {
    fn from_iter<I: IntoIterator<Item = Quad>>(iter: I) -> Self {
        let mut set = QuadSet::new();
        for quad in iter {
            set.insert(quad);
        }
        set
    }
}

fn smallest<'a>(
    current: Option<&'a FxHashSet<Quad>>,
    bucket: &'a FxHashSet<Quad>,
) -> &'a FxHashSet<Quad> {
    match current {
        Some(c) if c.len() <= bucket.len() => c,
        _ => bucket,
    }
}

fn remove_from_bucket<K>(index: &mut FxHashMap<K, FxHashSet<Quad>>, key: &K, quad: &Quad)
where
    K: std::hash::Hash + Eq,
{
    if let Some(bucket) = index.get_mut(key) {
        bucket.remove(quad);
        if bucket.is_empty() {
            index.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::types::Literal;

    fn iri(s: &str) -> NamedNode {
        NamedNode::new(&format!("http://example.org/{s}")).unwrap()
    }

    fn pred(s: &str) -> RdfPredicate {
        RdfPredicate::new(&format!("http://example.org/{s}")).unwrap()
    }

    fn name_quad(who: &str, graph: Option<NamedNode>) -> Quad {
        Quad::new(iri(who), pred("name"), Literal::new_simple_literal(who), graph)
    }

    #[test]
    fn test_insert_is_idempotent() {
        let mut set = QuadSet::new();
        assert!(set.insert(name_quad("alice", None)));
        assert!(!set.insert(name_quad("alice", None)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut set = QuadSet::new();
        assert!(!set.remove(&name_quad("alice", None)));
        set.insert(name_quad("alice", None));
        assert!(set.remove(&name_quad("alice", None)));
        assert!(set.is_empty());
        assert!(set.query(&QuadPattern::any().subject(iri("alice"))).is_empty());
    }

    #[test]
    fn test_query_uses_indices() {
        let g = iri("g");
        let mut set = QuadSet::new();
        set.insert(name_quad("alice", None));
        set.insert(name_quad("alice", Some(g.clone())));
        set.insert(name_quad("bob", Some(g.clone())));
        set.insert(Quad::triple(iri("bob"), pred("knows"), iri("alice")));

        assert_eq!(set.query(&QuadPattern::any()).len(), 4);
        assert_eq!(set.query(&QuadPattern::any().subject(iri("alice"))).len(), 2);
        assert_eq!(set.query(&QuadPattern::any().graph(Some(g.clone()))).len(), 2);
        assert_eq!(set.query(&QuadPattern::any().graph(None)).len(), 2);
        assert_eq!(
            set.query(&QuadPattern::any().predicate(pred("name")).graph(None)).len(),
            1
        );
        assert!(set.query(&QuadPattern::any().subject(iri("carol"))).is_empty());
        assert_eq!(set.graphs(), vec![g]);
    }

    #[test]
    fn test_graph_aware_removal() {
        let g1 = iri("g1");
        let g2 = iri("g2");
        let mut set = QuadSet::new();
        set.insert(name_quad("alice", Some(g1.clone())));
        set.insert(name_quad("alice", Some(g2.clone())));

        let remove = Operation::remove([name_quad("alice", None)]).with_graphs([g1.clone()]);
        let changes = set.apply_in_place(&[remove]);

        assert_eq!(changes.removed().count(), 1);
        assert!(!set.contains(&name_quad("alice", Some(g1))));
        assert!(set.contains(&name_quad("alice", Some(g2))));
    }

    #[test]
    fn test_apply_returns_new_snapshot() {
        let base: QuadSet = [name_quad("alice", None)].into_iter().collect();
        let next = base.apply(&[
            Operation::add([name_quad("bob", None)]),
            Operation::remove([name_quad("alice", None)]),
        ]);

        assert_eq!(base.len(), 1);
        assert!(next.contains(&name_quad("bob", None)));
        assert!(!next.contains(&name_quad("alice", None)));
    }

    #[test]
    fn test_change_set_round_trip() {
        let mut set: QuadSet = [name_quad("alice", None)].into_iter().collect();
        let before = set.clone();
        let changes = set.apply_in_place(&[
            Operation::add([name_quad("alice", None), name_quad("bob", None)]),
            Operation::remove([name_quad("alice", None)]),
        ]);
        // alice was present, so the re-add is not a change; only the removal is
        assert_eq!(changes.added().count(), 1);
        assert_eq!(changes.removed().count(), 1);

        let after = set.clone();
        set.unapply_changes(&changes);
        assert_eq!(set, before);
        set.apply_changes(&changes);
        assert_eq!(set, after);
    }
}
