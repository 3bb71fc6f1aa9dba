//! Append-only transaction log
//!
//! Versions are kept in a vector indexed by `id - 1`; the parent/next links of
//! the history are plain index arithmetic.

use super::operation::{ChangeSet, Operation, OperationKind};
use super::version::{Version, VersionId};
use super::{VersionError, VersionResult};
use crate::rdf::{Quad, QuadSet};
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// A commit that has been computed against a base snapshot but not applied
///
/// Validators inspect this before anything is written.
#[derive(Debug)]
pub struct StagedCommit {
    pub(crate) id: VersionId,
    pub(crate) parent: Option<VersionId>,
    pub(crate) message: Option<String>,
    pub(crate) operations: Vec<Operation>,
    pub(crate) changes: ChangeSet,
    pub(crate) base: Arc<QuadSet>,
}

impl StagedCommit {
    /// Id the commit will receive
    pub fn id(&self) -> VersionId {
        self.id
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Effective change against the base snapshot
    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// Head snapshot the commit was staged on
    pub fn base(&self) -> &QuadSet {
        &self.base
    }

    /// Whether the quad will be present once the commit is applied
    pub fn would_contain(&self, quad: &Quad) -> bool {
        if self.changes.is_added(quad) {
            true
        } else if self.changes.is_removed(quad) {
            false
        } else {
            self.base.contains(quad)
        }
    }

    pub(crate) fn into_version(self, created_at: DateTime<Utc>) -> Version {
        Version {
            id: self.id,
            parent: self.parent,
            message: self.message,
            created_at,
            operations: self.operations,
            changes: self.changes,
        }
    }
}

/// Ordered record of committed versions
#[derive(Debug, Default)]
pub struct TransactionLog {
    versions: Vec<Arc<Version>>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed versions
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Id of the latest version
    pub fn head_id(&self) -> Option<VersionId> {
        self.versions.last().map(|v| v.id)
    }

    /// Id the next commit will receive
    pub fn next_id(&self) -> VersionId {
        VersionId::new(self.versions.len() as u64 + 1)
    }

    pub fn get(&self, id: VersionId) -> Option<&Arc<Version>> {
        if id.as_u64() == 0 {
            return None;
        }
        self.versions.get(id.index())
    }

    /// Versions in `(from, to]`, ascending; `from == None` starts at genesis
    pub fn range(&self, from: Option<VersionId>, to: VersionId) -> Vec<Arc<Version>> {
        let start = from.map(|f| f.as_u64() as usize).unwrap_or(0);
        let end = (to.as_u64() as usize).min(self.versions.len());
        if start >= end {
            return Vec::new();
        }
        self.versions[start..end].to_vec()
    }

    /// Stage operations against `base`, computing the effective change set
    ///
    /// The base snapshot is not modified. Within the commit the last
    /// operation touching a quad wins.
    pub fn stage(
        &self,
        base: Arc<QuadSet>,
        operations: Vec<Operation>,
        message: Option<String>,
    ) -> StagedCommit {
        // present-after-commit state of every quad touched so far
        let mut overlay: FxHashMap<Quad, bool> = FxHashMap::default();
        let mut changes = ChangeSet::default();

        for op in &operations {
            for quad in op.statements() {
                let present = overlay
                    .get(&quad)
                    .copied()
                    .unwrap_or_else(|| base.contains(&quad));
                match op.kind() {
                    OperationKind::Add if !present => {
                        overlay.insert(quad.clone(), true);
                        changes.record_added(quad);
                    }
                    OperationKind::Remove if present => {
                        overlay.insert(quad.clone(), false);
                        changes.record_removed(quad);
                    }
                    _ => {}
                }
            }
        }

        StagedCommit {
            id: self.next_id(),
            parent: self.head_id(),
            message: message.filter(|m| !m.trim().is_empty()),
            operations,
            changes,
            base,
        }
    }

    /// Append a version. Ids must stay contiguous.
    pub fn append(&mut self, version: Version) -> VersionResult<Arc<Version>> {
        let expected = self.next_id();
        if version.id != expected {
            return Err(VersionError::ValidationFailure(format!(
                "version {} appended out of order, expected {}",
                version.id, expected
            )));
        }
        let version = Arc::new(version);
        self.versions.push(Arc::clone(&version));
        Ok(version)
    }
}
