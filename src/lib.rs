//! Versa
//!
//! A transactional, versioned RDF quad store. Every commit appends an
//! immutable, numbered version to a transaction log; on top of the log Versa
//! offers tags, relative navigation, coalesced diffs, revert-by-commit and
//! historical snapshots, with optional on-disk persistence.
//!
//! # Features
//!
//! - Quad model with named graphs and pattern queries (`rdf`)
//! - Append-only version log with head tracking and tags (`versioning`)
//! - Diffs between any two versions, rendered as SPARQL Update (`rdf::UpdateWriter`)
//! - Revert as a forward commit of the inverse diff
//! - Checksummed commit log and atomic index file (`persistence`)
//! - YAML configuration (`config`)
//!
//! ## Example Usage
//!
//! ```rust
//! use versa::rdf::{NamedNode, Quad, RdfPredicate};
//! use versa::versioning::{Operation, VersionedStore};
//!
//! let store = VersionedStore::in_memory();
//!
//! let person = NamedNode::new("http://xmlns.com/foaf/0.1/Person").unwrap();
//! let rdf_type = RdfPredicate::new("http://www.w3.org/1999/02/22-rdf-syntax-ns#type").unwrap();
//! let alice = Quad::triple(NamedNode::new("http://example.org/alice").unwrap(), rdf_type.clone(), person.clone());
//! let bob = Quad::triple(NamedNode::new("http://example.org/bob").unwrap(), rdf_type, person);
//!
//! let v1 = store.commit(vec![Operation::add([alice.clone()])], Some("Add Alice")).unwrap();
//! let v2 = store.commit(vec![Operation::add([bob.clone()])], Some("Add Bob")).unwrap();
//!
//! let diff = store.diff(v1.id(), v2.id()).unwrap();
//! assert!(diff.additions().contains(&bob));
//!
//! store.revert_to(v1.id(), None).unwrap();
//! assert!(!store.snapshot().contains(&bob));
//! assert_eq!(store.version_count(), 3);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod persistence;
pub mod rdf;
pub mod versioning;

// Re-export main types for convenience
pub use config::{CommitPolicy, ConfigError, ConfigResult, StoreConfig};

pub use persistence::{CommitLog, LogError, LogResult, PersistenceManager};

pub use rdf::{
    BlankNode, Literal, NamedNode, NamespaceManager, Quad, QuadPattern, QuadSet, RdfFormat,
    RdfObject, RdfParser, RdfPredicate, RdfSerializer, RdfSubject, UpdateWriter,
};

pub use versioning::{
    CancelToken, CommitValidator, Diff, Operation, OperationKind, Transaction, Version,
    VersionError, VersionId, VersionRef, VersionResult, VersionedStore,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
