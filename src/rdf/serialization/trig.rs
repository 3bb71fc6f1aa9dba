//! TriG format implementation

use super::convert::{convert_quad, to_rio_quad};
use super::{ParseResult, SerializeError, SerializeResult};
use crate::rdf::Quad;
use rio_api::formatter::QuadsFormatter;
use rio_api::parser::QuadsParser;
use rio_turtle::{TriGFormatter, TriGParser};

/// TriG parser
pub struct TriGParserWrapper;

impl TriGParserWrapper {
    /// Parse a TriG document into quads
    pub fn parse(input: &str) -> ParseResult<Vec<Quad>> {
        let mut parser = TriGParser::new(input.as_bytes(), None);
        let mut quads = Vec::new();

        let res: ParseResult<()> = parser.parse_all(&mut |q| {
            quads.push(convert_quad(q)?);
            Ok(())
        });

        res.map(|_| quads)
    }
}

/// TriG serializer
pub struct TriGSerializerWrapper;

impl TriGSerializerWrapper {
    /// Serialize quads to a TriG string
    ///
    /// Quads are written in the given order; consecutive quads of the same
    /// graph share one graph block.
    pub fn serialize(quads: &[Quad]) -> SerializeResult<String> {
        let mut formatter = TriGFormatter::new(Vec::new());

        for quad in quads {
            formatter
                .format(&to_rio_quad(quad))
                .map_err(|e| SerializeError::Serialize(e.to_string()))?;
        }

        let output = formatter
            .finish()
            .map_err(|e| SerializeError::Serialize(e.to_string()))?;

        String::from_utf8(output).map_err(|e| SerializeError::Serialize(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trig_roundtrip() {
        let input = r#"
            @prefix foaf: <http://xmlns.com/foaf/0.1/> .
            <http://example.org/alice> foaf:name "Alice" .
            <http://example.org/people> {
                <http://example.org/bob> foaf:name "Bob"@en ;
                    foaf:age "42"^^<http://www.w3.org/2001/XMLSchema#integer> .
            }
        "#;
        let quads = TriGParserWrapper::parse(input).unwrap();
        assert_eq!(quads.len(), 3);
        assert_eq!(quads.iter().filter(|q| q.graph.is_some()).count(), 2);

        let output = TriGSerializerWrapper::serialize(&quads).unwrap();
        assert!(output.contains("<http://example.org/people>"));
        let reparsed = TriGParserWrapper::parse(&output).unwrap();
        assert_eq!(reparsed, quads);
    }

    #[test]
    fn test_trig_syntax_error() {
        assert!(TriGParserWrapper::parse("<http://example.org/a> <http://example.org/b> .").is_err());
    }
}
