//! N-Quads and N-Triples implementation

use super::convert::{convert_quad, convert_triple, to_rio_quad, to_rio_triple};
use super::{ParseResult, SerializeError, SerializeResult};
use crate::rdf::Quad;
use rio_api::formatter::{QuadsFormatter, TriplesFormatter};
use rio_api::parser::{QuadsParser, TriplesParser};
use rio_turtle::{NQuadsFormatter, NQuadsParser, NTriplesFormatter, NTriplesParser};

pub fn parse_nquads(input: &str) -> ParseResult<Vec<Quad>> {
    let mut parser = NQuadsParser::new(input.as_bytes());
    let mut quads = Vec::new();
    let res: ParseResult<()> = parser.parse_all(&mut |q| {
        quads.push(convert_quad(q)?);
        Ok(())
    });
    res.map(|_| quads)
}

/// Parse N-Triples; every quad lands in the default graph
pub fn parse_ntriples(input: &str) -> ParseResult<Vec<Quad>> {
    let mut parser = NTriplesParser::new(input.as_bytes());
    let mut quads = Vec::new();
    let res: ParseResult<()> = parser.parse_all(&mut |t| {
        quads.push(convert_triple(t)?);
        Ok(())
    });
    res.map(|_| quads)
}

pub fn serialize_nquads(quads: &[Quad]) -> SerializeResult<String> {
    let mut output = Vec::new();
    {
        let mut formatter = NQuadsFormatter::new(&mut output);
        for quad in quads {
            formatter
                .format(&to_rio_quad(quad))
                .map_err(|e| SerializeError::Serialize(e.to_string()))?;
        }
    }
    String::from_utf8(output).map_err(|e| SerializeError::Serialize(e.to_string()))
}

/// Serialize default-graph quads as N-Triples
///
/// Fails on any quad in a named graph.
pub fn serialize_ntriples(quads: &[Quad]) -> SerializeResult<String> {
    let mut output = Vec::new();
    {
        let mut formatter = NTriplesFormatter::new(&mut output);
        for quad in quads {
            if let Some(graph) = &quad.graph {
                return Err(SerializeError::Serialize(format!(
                    "N-Triples cannot hold quads of named graph {}",
                    graph
                )));
            }
            formatter
                .format(&to_rio_triple(quad))
                .map_err(|e| SerializeError::Serialize(e.to_string()))?;
        }
    }
    String::from_utf8(output).map_err(|e| SerializeError::Serialize(e.to_string()))
}
