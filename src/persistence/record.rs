//! On-disk representation of commits
//!
//! RDF terms are written as plain structured values so the log format does
//! not depend on the in-memory term types.

use super::wal::{LogError, LogResult};
use crate::rdf::{BlankNode, Literal, NamedNode, Quad, RdfObject, RdfPredicate, RdfSubject};
use crate::versioning::{ChangeSet, Operation, OperationKind, Version, VersionId};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoredTerm {
    Iri(String),
    Blank(String),
    Literal {
        value: String,
        datatype: String,
        language: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredQuad {
    pub subject: StoredTerm,
    pub predicate: String,
    pub object: StoredTerm,
    pub graph: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoredKind {
    Add,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOperation {
    pub kind: StoredKind,
    pub quads: Vec<StoredQuad>,
    pub graphs: Vec<String>,
}

/// One committed version as written to the commit log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCommit {
    pub id: u64,
    pub parent: Option<u64>,
    pub message: Option<String>,
    /// Milliseconds since the Unix epoch
    pub created_at: i64,
    pub operations: Vec<StoredOperation>,
    pub added: Vec<StoredQuad>,
    pub removed: Vec<StoredQuad>,
}

impl From<&RdfSubject> for StoredTerm {
    fn from(subject: &RdfSubject) -> Self {
        match subject {
            RdfSubject::NamedNode(n) => StoredTerm::Iri(n.as_str().to_string()),
            RdfSubject::BlankNode(b) => StoredTerm::Blank(b.as_str().to_string()),
        }
    }
}

impl From<&RdfObject> for StoredTerm {
    fn from(object: &RdfObject) -> Self {
        match object {
            RdfObject::NamedNode(n) => StoredTerm::Iri(n.as_str().to_string()),
            RdfObject::BlankNode(b) => StoredTerm::Blank(b.as_str().to_string()),
            RdfObject::Literal(l) => StoredTerm::Literal {
                value: l.value().to_string(),
                datatype: l.datatype().to_string(),
                language: l.language().map(str::to_string),
            },
        }
    }
}

impl StoredTerm {
    fn to_subject(&self) -> LogResult<RdfSubject> {
        match self {
            StoredTerm::Iri(iri) => Ok(named(iri)?.into()),
            StoredTerm::Blank(id) => Ok(blank(id)?.into()),
            StoredTerm::Literal { .. } => Err(LogError::InvalidEntry(
                "literal in subject position".to_string(),
            )),
        }
    }

    fn to_object(&self) -> LogResult<RdfObject> {
        match self {
            StoredTerm::Iri(iri) => Ok(named(iri)?.into()),
            StoredTerm::Blank(id) => Ok(blank(id)?.into()),
            StoredTerm::Literal {
                value,
                datatype,
                language,
            } => {
                let literal = match language {
                    Some(lang) => Literal::new_language_tagged_literal(value.as_str(), lang.as_str())
                        .map_err(|e| LogError::InvalidEntry(e.to_string()))?,
                    None if datatype == XSD_STRING => Literal::new_simple_literal(value.as_str()),
                    None => Literal::new_typed_literal(value.as_str(), named(datatype)?),
                };
                Ok(literal.into())
            }
        }
    }
}

fn named(iri: &str) -> LogResult<NamedNode> {
    NamedNode::new(iri).map_err(|e| LogError::InvalidEntry(e.to_string()))
}

fn blank(id: &str) -> LogResult<BlankNode> {
    BlankNode::with_id(id).map_err(|e| LogError::InvalidEntry(e.to_string()))
}

impl From<&Quad> for StoredQuad {
    fn from(quad: &Quad) -> Self {
        Self {
            subject: (&quad.subject).into(),
            predicate: quad.predicate.as_str().to_string(),
            object: (&quad.object).into(),
            graph: quad.graph.as_ref().map(|g| g.as_str().to_string()),
        }
    }
}

impl TryFrom<&StoredQuad> for Quad {
    type Error = LogError;

    fn try_from(stored: &StoredQuad) -> LogResult<Self> {
        let predicate: RdfPredicate = named(&stored.predicate)?.into();
        let graph = stored.graph.as_deref().map(named).transpose()?;
        Ok(Quad::new(
            stored.subject.to_subject()?,
            predicate,
            stored.object.to_object()?,
            graph,
        ))
    }
}

impl From<&Operation> for StoredOperation {
    fn from(op: &Operation) -> Self {
        Self {
            kind: match op.kind() {
                OperationKind::Add => StoredKind::Add,
                OperationKind::Remove => StoredKind::Remove,
            },
            quads: op.quads().iter().map(StoredQuad::from).collect(),
            graphs: op.graphs().iter().map(|g| g.as_str().to_string()).collect(),
        }
    }
}

impl TryFrom<&StoredOperation> for Operation {
    type Error = LogError;

    fn try_from(stored: &StoredOperation) -> LogResult<Self> {
        let kind = match stored.kind {
            StoredKind::Add => OperationKind::Add,
            StoredKind::Remove => OperationKind::Remove,
        };
        let quads = quads(&stored.quads)?;
        let graphs = stored
            .graphs
            .iter()
            .map(|g| named(g))
            .collect::<LogResult<Vec<_>>>()?;
        Ok(Operation::new(kind, quads).with_graphs(graphs))
    }
}

fn quads(stored: &[StoredQuad]) -> LogResult<Vec<Quad>> {
    stored.iter().map(Quad::try_from).collect()
}

impl From<&Version> for StoredCommit {
    fn from(version: &Version) -> Self {
        Self {
            id: version.id().as_u64(),
            parent: version.parent().map(|p| p.as_u64()),
            message: version.message().map(str::to_string),
            created_at: version.created_at().timestamp_millis(),
            operations: version.operations().iter().map(StoredOperation::from).collect(),
            added: version.changes().added().map(StoredQuad::from).collect(),
            removed: version.changes().removed().map(StoredQuad::from).collect(),
        }
    }
}

impl TryFrom<StoredCommit> for Version {
    type Error = LogError;

    fn try_from(stored: StoredCommit) -> LogResult<Self> {
        let created_at: DateTime<Utc> = Utc
            .timestamp_millis_opt(stored.created_at)
            .single()
            .ok_or_else(|| {
                LogError::InvalidEntry(format!("bad timestamp {}", stored.created_at))
            })?;
        let operations = stored
            .operations
            .iter()
            .map(Operation::try_from)
            .collect::<LogResult<Vec<_>>>()?;
        Ok(Version {
            id: VersionId::new(stored.id),
            parent: stored.parent.map(VersionId::new),
            message: stored.message,
            created_at,
            operations,
            changes: ChangeSet::new(quads(&stored.added)?, quads(&stored.removed)?),
        })
    }
}
