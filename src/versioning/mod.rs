//! Versioning layer for Versa
//!
//! Every commit appends an immutable, numbered version to the transaction
//! log. On top of the log this module provides:
//! - Version index with head tracking, tags and relative walks
//! - Coalesced diffs between any two versions
//! - Revert as a forward commit of the inverse diff
//! - Checkpointed historical snapshots
//! - Session-level transactions and commit validation

pub mod checkpoint;
pub mod diff;
pub mod history;
pub mod index;
pub mod log;
pub mod operation;
pub mod revert;
pub mod store;
pub mod transaction;
pub mod validation;
pub mod version;

pub use checkpoint::CheckpointCache;
pub use diff::{CancelToken, Diff};
pub use history::{VersionIter, VersionQuery};
pub use index::{VersionIndex, VersionRef};
pub use log::{StagedCommit, TransactionLog};
pub use operation::{ChangeSet, Operation, OperationKind};
pub use store::VersionedStore;
pub use transaction::Transaction;
pub use validation::{CommitValidator, DisjointPredicatesValidator, LimitsValidator};
pub use version::{Version, VersionId};

use crate::config::ConfigError;
use crate::persistence::LogError;
use crate::rdf::RdfError;
use thiserror::Error;

/// Versioning errors
#[derive(Error, Debug)]
pub enum VersionError {
    #[error("Another commit is in progress")]
    ConcurrencyConflict,

    #[error("Unknown version: {0}")]
    UnknownVersion(VersionId),

    #[error("Unknown tag: {0}")]
    UnknownTag(String),

    #[error("Tag already exists: {0}")]
    TagExists(String),

    #[error("Offset {offset} from version {version} is outside 1..={head}")]
    OutOfRange {
        version: VersionId,
        offset: i64,
        head: VersionId,
    },

    #[error("Invalid range: {from} is after {to}")]
    InvalidRange { from: VersionId, to: VersionId },

    #[error("Validation failed: {0}")]
    ValidationFailure(String),

    #[error("Store has no versions yet")]
    EmptyHistory,

    #[error("Invalid version reference: '{0}'")]
    InvalidReference(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Persistence error: {0}")]
    Persistence(#[from] LogError),

    #[error("RDF error: {0}")]
    Rdf(#[from] RdfError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

pub type VersionResult<T> = Result<T, VersionError>;
