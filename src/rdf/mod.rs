//! RDF data model for Versa
//!
//! This module provides the quad model the version store is built on:
//! - RDF terms and quads (default graph plus named graphs)
//! - `QuadSet`, an indexed in-memory snapshot with pattern queries
//! - Namespace prefixes for compact output
//! - Serialization formats (TriG, N-Quads, N-Triples) and SPARQL Update output
//!
//! # Example
//!
//! ```rust
//! use versa::rdf::{QuadSet, Quad, NamedNode, Literal, RdfPredicate, QuadPattern};
//!
//! let mut snapshot = QuadSet::new();
//!
//! let subject = NamedNode::new("http://example.org/alice").unwrap();
//! let predicate = RdfPredicate::new("http://xmlns.com/foaf/0.1/name").unwrap();
//! let object = Literal::new_simple_literal("Alice");
//!
//! snapshot.insert(Quad::triple(subject.clone(), predicate, object));
//!
//! let results = snapshot.query(&QuadPattern::any().subject(subject));
//! assert_eq!(results.len(), 1);
//! ```

mod namespace;
mod serialization;
mod store;
mod types;

pub use types::{
    BlankNode, Literal, NamedNode, Quad, QuadPattern, RdfError, RdfObject, RdfPredicate,
    RdfResult, RdfSubject,
};

pub use store::QuadSet;

pub use namespace::{Namespace, NamespaceManager, PrefixError, PrefixResult};

pub use serialization::{
    ParseError, ParseResult, RdfFormat, RdfParser, RdfSerializer, SerializeError,
    SerializeResult, UpdateWriter,
};
