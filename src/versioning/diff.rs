//! Diff engine
//!
//! A diff folds the change sets of a contiguous run of versions into one net
//! set of additions and removals. Because every version records what it
//! actually changed, a quad added and later removed inside the range cancels
//! out, as does a quad removed and later re-added, and the result is exactly
//! the difference between the two snapshots.

use super::operation::{Operation, OperationKind};
use super::version::Version;
use super::{VersionError, VersionResult};
use crate::rdf::{Quad, QuadSet};
use indexmap::IndexSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag used to abort a long-running diff
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Net additions and removals between two versions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    additions: IndexSet<Quad>,
    removals: IndexSet<Quad>,
}

impl Diff {
    pub fn new(
        additions: impl IntoIterator<Item = Quad>,
        removals: impl IntoIterator<Item = Quad>,
    ) -> Self {
        Self {
            additions: additions.into_iter().collect(),
            removals: removals.into_iter().collect(),
        }
    }

    /// Fold versions given in ascending order
    ///
    /// The token, when present, is checked before each version.
    pub fn between(versions: &[Arc<Version>], cancel: Option<&CancelToken>) -> VersionResult<Self> {
        debug_assert!(versions.windows(2).all(|w| w[0].id() < w[1].id()));

        let mut diff = Diff::default();
        for version in versions {
            if cancel.map_or(false, CancelToken::is_cancelled) {
                return Err(VersionError::Cancelled);
            }
            for op in version.effective_operations() {
                diff.fold(&op);
            }
        }
        Ok(diff)
    }

    /// Fold one operation into the accumulators
    pub fn fold(&mut self, op: &Operation) {
        for quad in op.statements() {
            match op.kind() {
                OperationKind::Add => {
                    if !self.removals.shift_remove(&quad) {
                        self.additions.insert(quad);
                    }
                }
                OperationKind::Remove => {
                    if !self.additions.shift_remove(&quad) {
                        self.removals.insert(quad);
                    }
                }
            }
        }
    }

    pub fn additions(&self) -> &IndexSet<Quad> {
        &self.additions
    }

    pub fn removals(&self) -> &IndexSet<Quad> {
        &self.removals
    }

    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }

    /// Total number of changed quads
    pub fn len(&self) -> usize {
        self.additions.len() + self.removals.len()
    }

    /// Swap additions and removals
    pub fn inverse(&self) -> Diff {
        Diff {
            additions: self.removals.clone(),
            removals: self.additions.clone(),
        }
    }

    /// Apply the diff to a snapshot, returning the resulting snapshot
    pub fn apply_to(&self, snapshot: &QuadSet) -> QuadSet {
        let mut next = snapshot.clone();
        for quad in &self.removals {
            next.remove(quad);
        }
        for quad in &self.additions {
            next.insert(quad.clone());
        }
        next
    }

    /// Operations that carry out this diff, removals first
    pub fn into_operations(self) -> Vec<Operation> {
        let mut ops = Vec::with_capacity(2);
        if !self.removals.is_empty() {
            ops.push(Operation::remove(self.removals));
        }
        if !self.additions.is_empty() {
            ops.push(Operation::add(self.additions));
        }
        ops
    }
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for quad in &self.removals {
            writeln!(f, "- {}", quad)?;
        }
        for quad in &self.additions {
            writeln!(f, "+ {}", quad)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::{Literal, NamedNode, RdfPredicate};
    use crate::versioning::log::TransactionLog;
    use crate::versioning::VersionId;
    use chrono::Utc;

    fn quad(s: &str) -> Quad {
        Quad::triple(
            NamedNode::new(&format!("http://example.org/{s}")).unwrap(),
            RdfPredicate::new("http://example.org/p").unwrap(),
            Literal::new_simple_literal(s),
        )
    }

    /// Commit each batch in turn, returning the log and every snapshot
    fn history(batches: Vec<Vec<Operation>>) -> (TransactionLog, Vec<QuadSet>) {
        let mut log = TransactionLog::new();
        let mut head = Arc::new(QuadSet::new());
        let mut snapshots = vec![QuadSet::new()];
        for ops in batches {
            let staged = log.stage(Arc::clone(&head), ops, None);
            let version = log.append(staged.into_version(Utc::now())).unwrap();
            let mut next = (*head).clone();
            next.apply_changes(version.changes());
            head = Arc::new(next);
            snapshots.push((*head).clone());
        }
        (log, snapshots)
    }

    #[test]
    fn test_fold_cancels() {
        let mut diff = Diff::default();
        diff.fold(&Operation::add([quad("a"), quad("b")]));
        diff.fold(&Operation::remove([quad("a")]));
        assert_eq!(diff.additions().len(), 1);
        assert!(diff.removals().is_empty());

        diff.fold(&Operation::remove([quad("c")]));
        diff.fold(&Operation::add([quad("c")]));
        assert!(!diff.additions().contains(&quad("c")));
        assert!(!diff.removals().contains(&quad("c")));
    }

    #[test]
    fn test_diff_is_snapshot_difference() {
        let (log, snapshots) = history(vec![
            vec![Operation::add([quad("alice")])],
            vec![Operation::add([quad("bob")])],
            vec![Operation::remove([quad("alice")])],
            vec![Operation::add([quad("alice"), quad("carol")])],
        ]);

        for from in 0..snapshots.len() {
            for to in from..snapshots.len() {
                let from_id = (from > 0).then(|| VersionId::new(from as u64));
                let versions = log.range(from_id, VersionId::new(to as u64));
                let diff = Diff::between(&versions, None).unwrap();
                assert_eq!(diff.apply_to(&snapshots[from]), snapshots[to]);
                assert_eq!(diff.inverse().apply_to(&snapshots[to]), snapshots[from]);
            }
        }
    }

    #[test]
    fn test_readd_of_removed_quad_is_no_change() {
        let (log, _) = history(vec![
            vec![Operation::add([quad("alice")])],
            vec![Operation::remove([quad("alice")])],
            vec![Operation::add([quad("alice")])],
        ]);
        let versions = log.range(Some(VersionId::new(1)), VersionId::new(3));
        assert!(Diff::between(&versions, None).unwrap().is_empty());
    }

    #[test]
    fn test_cancelled_diff() {
        let (log, _) = history(vec![vec![Operation::add([quad("a")])]]);
        let token = CancelToken::new();
        token.cancel();
        let versions = log.range(None, VersionId::new(1));
        assert!(matches!(
            Diff::between(&versions, Some(&token)),
            Err(VersionError::Cancelled)
        ));
    }

    #[test]
    fn test_into_operations_order() {
        let diff = Diff::new([quad("a")], [quad("b")]);
        let ops = diff.into_operations();
        assert_eq!(ops[0].kind(), OperationKind::Remove);
        assert_eq!(ops[1].kind(), OperationKind::Add);
        assert!(Diff::default().into_operations().is_empty());
    }
}
