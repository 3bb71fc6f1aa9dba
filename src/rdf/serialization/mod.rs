//! RDF serialization formats
//!
//! Supports:
//! - TriG (.trig), which also reads plain Turtle
//! - N-Quads (.nq)
//! - N-Triples (.nt), default graph only
//!
//! Diffs are rendered as SPARQL Update scripts by [`UpdateWriter`].

mod convert;
mod nquads;
mod trig;
mod update;

pub use update::UpdateWriter;

use super::{Quad, QuadSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// RDF serialization format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfFormat {
    /// TriG format (.trig)
    TriG,
    /// N-Quads format (.nq)
    NQuads,
    /// N-Triples format (.nt)
    NTriples,
}

impl RdfFormat {
    /// Guess the format from a file extension (case-insensitive)
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "trig" | "ttl" => Some(RdfFormat::TriG),
            "nq" | "nquads" => Some(RdfFormat::NQuads),
            "nt" | "ntriples" => Some(RdfFormat::NTriples),
            _ => None,
        }
    }

    /// Guess the format from a path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Canonical file extension
    pub fn extension(&self) -> &'static str {
        match self {
            RdfFormat::TriG => "trig",
            RdfFormat::NQuads => "nq",
            RdfFormat::NTriples => "nt",
        }
    }
}

impl fmt::Display for RdfFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for RdfFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| ParseError::UnknownFormat(s.to_string()))
    }
}

/// Parse errors
#[derive(Error, Debug)]
pub enum ParseError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Unknown format name or extension
    #[error("Unknown format: {0}")]
    UnknownFormat(String),
}

impl From<rio_turtle::TurtleError> for ParseError {
    fn from(e: rio_turtle::TurtleError) -> Self {
        ParseError::Parse(e.to_string())
    }
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Serialization errors
#[derive(Error, Debug)]
pub enum SerializeError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),
}

pub type SerializeResult<T> = Result<T, SerializeError>;

/// RDF parser
pub struct RdfParser;

impl RdfParser {
    /// Parse RDF data from a string
    pub fn parse(input: &str, format: RdfFormat) -> ParseResult<Vec<Quad>> {
        match format {
            RdfFormat::TriG => trig::TriGParserWrapper::parse(input),
            RdfFormat::NQuads => nquads::parse_nquads(input),
            RdfFormat::NTriples => nquads::parse_ntriples(input),
        }
    }

    /// Parse RDF data from a file
    pub fn parse_file(path: &Path, format: RdfFormat) -> ParseResult<Vec<Quad>> {
        let input = std::fs::read_to_string(path)?;
        Self::parse(&input, format)
    }
}

/// RDF serializer
pub struct RdfSerializer;

impl RdfSerializer {
    /// Serialize quads to a string, in the given order
    pub fn serialize(quads: &[Quad], format: RdfFormat) -> SerializeResult<String> {
        match format {
            RdfFormat::TriG => trig::TriGSerializerWrapper::serialize(quads),
            RdfFormat::NQuads => nquads::serialize_nquads(quads),
            RdfFormat::NTriples => nquads::serialize_ntriples(quads),
        }
    }

    /// Serialize a snapshot with a stable ordering
    ///
    /// Default-graph quads come first, then named graphs by IRI; within a
    /// graph quads are sorted by their N-Quads rendering.
    pub fn serialize_snapshot(snapshot: &QuadSet, format: RdfFormat) -> SerializeResult<String> {
        let mut quads = snapshot.sorted();
        quads.sort_by(|a, b| {
            let ga = a.graph.as_ref().map(|g| g.as_str());
            let gb = b.graph.as_ref().map(|g| g.as_str());
            ga.cmp(&gb)
        });
        Self::serialize(&quads, format)
    }

    /// Serialize quads to a file
    pub fn serialize_file(quads: &[Quad], path: &Path, format: RdfFormat) -> SerializeResult<()> {
        let output = Self::serialize(quads, format)?;
        std::fs::write(path, output)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::{Literal, NamedNode, RdfPredicate};

    fn quad(s: &str, graph: Option<&str>) -> Quad {
        Quad::new(
            NamedNode::new(s).unwrap(),
            RdfPredicate::new("http://xmlns.com/foaf/0.1/name").unwrap(),
            Literal::new_simple_literal("x"),
            graph.map(|g| NamedNode::new(g).unwrap()),
        )
    }

    #[test]
    fn test_format_names() {
        assert_eq!(RdfFormat::from_extension("TRIG"), Some(RdfFormat::TriG));
        assert_eq!("nq".parse::<RdfFormat>().unwrap(), RdfFormat::NQuads);
        assert!("rdf".parse::<RdfFormat>().is_err());
        assert_eq!(
            RdfFormat::from_path(Path::new("/tmp/data.nt")),
            Some(RdfFormat::NTriples)
        );
        assert_eq!(RdfFormat::NQuads.to_string(), "nq");
    }

    #[test]
    fn test_snapshot_ordering() {
        let mut snapshot = QuadSet::new();
        snapshot.insert(quad("http://example.org/b", Some("http://example.org/g")));
        snapshot.insert(quad("http://example.org/z", None));
        snapshot.insert(quad("http://example.org/a", Some("http://example.org/g")));
        snapshot.insert(quad("http://example.org/c", None));

        let output = RdfSerializer::serialize_snapshot(&snapshot, RdfFormat::NQuads).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("<http://example.org/c>"));
        assert!(lines[1].starts_with("<http://example.org/z>"));
        assert!(lines[2].starts_with("<http://example.org/a>"));
        assert!(lines[3].starts_with("<http://example.org/b>"));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.trig");
        let quads = vec![quad("http://example.org/a", None), quad("http://example.org/b", Some("http://example.org/g"))];

        RdfSerializer::serialize_file(&quads, &path, RdfFormat::TriG).unwrap();
        let parsed = RdfParser::parse_file(&path, RdfFormat::TriG).unwrap();
        assert_eq!(parsed, quads);
    }

    #[test]
    fn test_missing_file() {
        let result = RdfParser::parse_file(Path::new("/nonexistent/data.nq"), RdfFormat::NQuads);
        assert!(matches!(result, Err(ParseError::Io(_))));
    }
}
