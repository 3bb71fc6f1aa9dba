//! Commit validation
//!
//! Validators run on a staged commit after its effective change set has been
//! computed and before anything is persisted or applied. The first rejection
//! aborts the commit with `VersionError::ValidationFailure`.

use super::log::StagedCommit;
use crate::rdf::{NamedNode, Quad, RdfPredicate};

/// Check run on every commit before it lands
pub trait CommitValidator: Send + Sync {
    /// Short name used in failure messages
    fn name(&self) -> &str;

    /// Return `Err(reason)` to reject the commit
    fn validate(&self, commit: &StagedCommit) -> Result<(), String>;
}

/// Rejects empty operations and commits above a size limit
#[derive(Debug, Clone, Default)]
pub struct LimitsValidator {
    max_quads_per_commit: Option<usize>,
}

impl LimitsValidator {
    pub fn new(max_quads_per_commit: Option<usize>) -> Self {
        Self {
            max_quads_per_commit,
        }
    }
}

impl CommitValidator for LimitsValidator {
    fn name(&self) -> &str {
        "limits"
    }

    fn validate(&self, commit: &StagedCommit) -> Result<(), String> {
        if let Some(pos) = commit.operations().iter().position(|op| op.is_empty()) {
            return Err(format!("operation {} has no quads", pos + 1));
        }
        if let Some(max) = self.max_quads_per_commit {
            let total: usize = commit.operations().iter().map(|op| op.statement_count()).sum();
            if total > max {
                return Err(format!(
                    "commit touches {} quads, limit is {}",
                    total, max
                ));
            }
        }
        Ok(())
    }
}

/// Forbids linking the same subject and object by two given predicates
///
/// The typical use is keeping `skos:related` disjoint from `skos:broader`.
/// Only quads added by the commit are checked; the pair is looked up in the
/// same graph as the added quad.
#[derive(Debug, Clone)]
pub struct DisjointPredicatesValidator {
    first: RdfPredicate,
    second: RdfPredicate,
}

impl DisjointPredicatesValidator {
    pub fn new(first: NamedNode, second: NamedNode) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    fn counterpart(&self, predicate: &RdfPredicate) -> Option<&RdfPredicate> {
        if *predicate == self.first {
            Some(&self.second)
        } else if *predicate == self.second {
            Some(&self.first)
        } else {
            None
        }
    }
}

impl CommitValidator for DisjointPredicatesValidator {
    fn name(&self) -> &str {
        "disjoint-predicates"
    }

    fn validate(&self, commit: &StagedCommit) -> Result<(), String> {
        for quad in commit.changes().added() {
            let Some(other) = self.counterpart(&quad.predicate) else {
                continue;
            };
            let clash = Quad::new(
                quad.subject.clone(),
                other.clone(),
                quad.object.clone(),
                quad.graph.clone(),
            );
            if commit.would_contain(&clash) {
                return Err(format!(
                    "{} and {} both link {} to {}",
                    quad.predicate, other, quad.subject, quad.object
                ));
            }
        }
        Ok(())
    }
}
