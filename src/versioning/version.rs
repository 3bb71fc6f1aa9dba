//! Version records

use super::operation::{ChangeSet, Operation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version identifier, contiguous from 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionId(u64);

impl VersionId {
    /// The first version a store ever creates
    pub const FIRST: VersionId = VersionId(1);

    pub fn new(id: u64) -> Self {
        VersionId(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Position of this version in the log
    pub(crate) fn index(&self) -> usize {
        (self.0 - 1) as usize
    }

    pub(crate) fn next(&self) -> VersionId {
        VersionId(self.0 + 1)
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for VersionId {
    fn from(id: u64) -> Self {
        VersionId(id)
    }
}

/// An immutable commit point
///
/// Holds the operations as they were committed and the change set they had on
/// the parent state. Tags are kept in the version index, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct Version {
    pub(crate) id: VersionId,
    pub(crate) parent: Option<VersionId>,
    pub(crate) message: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) operations: Vec<Operation>,
    pub(crate) changes: ChangeSet,
}

impl Version {
    pub fn id(&self) -> VersionId {
        self.id
    }

    /// Predecessor, `None` for the first version
    pub fn parent(&self) -> Option<VersionId> {
        self.parent
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Operations in commit order
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// What this commit actually changed
    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// The change set expressed as operations; diffs fold these
    pub fn effective_operations(&self) -> Vec<Operation> {
        self.changes.to_operations()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Version {} [{}] +{} -{}",
            self.id,
            self.created_at.format("%Y-%m-%d %H:%M:%S"),
            self.changes.added_count(),
            self.changes.removed_count()
        )?;
        if let Some(message) = &self.message {
            write!(f, " \"{}\"", message)?;
        }
        Ok(())
    }
}
