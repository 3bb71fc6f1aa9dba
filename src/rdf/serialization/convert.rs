//! Conversions between the rio model and Versa's RDF types

use super::{ParseError, ParseResult};
use crate::rdf::{BlankNode, Literal, NamedNode, Quad, RdfObject, RdfPredicate, RdfSubject};
use rio_api::model as rio;

const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";

pub(crate) fn convert_quad(q: rio::Quad<'_>) -> ParseResult<Quad> {
    let graph = match q.graph_name {
        None => None,
        Some(rio::GraphName::NamedNode(n)) => Some(named(n.iri)?),
        Some(rio::GraphName::BlankNode(b)) => {
            return Err(ParseError::Parse(format!(
                "blank node graph name _:{} is not supported",
                b.id
            )))
        }
    };
    Ok(Quad::new(
        convert_subject(q.subject)?,
        convert_predicate(q.predicate)?,
        convert_object(q.object)?,
        graph,
    ))
}

pub(crate) fn convert_triple(t: rio::Triple<'_>) -> ParseResult<Quad> {
    Ok(Quad::triple(
        convert_subject(t.subject)?,
        convert_predicate(t.predicate)?,
        convert_object(t.object)?,
    ))
}

fn named(iri: &str) -> ParseResult<NamedNode> {
    NamedNode::new(iri).map_err(|e| ParseError::Parse(e.to_string()))
}

fn blank(id: &str) -> ParseResult<BlankNode> {
    BlankNode::with_id(id).map_err(|e| ParseError::Parse(e.to_string()))
}

fn convert_subject(s: rio::Subject<'_>) -> ParseResult<RdfSubject> {
    match s {
        rio::Subject::NamedNode(n) => Ok(named(n.iri)?.into()),
        rio::Subject::BlankNode(b) => Ok(blank(b.id)?.into()),
        _ => Err(ParseError::Parse("Unsupported subject type".to_string())),
    }
}

fn convert_predicate(p: rio::NamedNode<'_>) -> ParseResult<RdfPredicate> {
    RdfPredicate::new(p.iri).map_err(|e| ParseError::Parse(e.to_string()))
}

fn convert_object(o: rio::Term<'_>) -> ParseResult<RdfObject> {
    match o {
        rio::Term::NamedNode(n) => Ok(named(n.iri)?.into()),
        rio::Term::BlankNode(b) => Ok(blank(b.id)?.into()),
        rio::Term::Literal(rio::Literal::Simple { value }) => {
            Ok(Literal::new_simple_literal(value).into())
        }
        rio::Term::Literal(rio::Literal::LanguageTaggedString { value, language }) => {
            Literal::new_language_tagged_literal(value, language)
                .map(Into::into)
                .map_err(|e| ParseError::Parse(e.to_string()))
        }
        rio::Term::Literal(rio::Literal::Typed { value, datatype }) => {
            Ok(Literal::new_typed_literal(value, named(datatype.iri)?).into())
        }
        _ => Err(ParseError::Parse("Unsupported object type".to_string())),
    }
}

/// Borrowing view of a quad in the rio model
pub(crate) fn to_rio_quad(quad: &Quad) -> rio::Quad<'_> {
    let triple = to_rio_triple(quad);
    rio::Quad {
        subject: triple.subject,
        predicate: triple.predicate,
        object: triple.object,
        graph_name: quad
            .graph
            .as_ref()
            .map(|g| rio::GraphName::NamedNode(rio::NamedNode { iri: g.as_str() })),
    }
}

/// Borrowing view of a quad's triple part in the rio model
pub(crate) fn to_rio_triple(quad: &Quad) -> rio::Triple<'_> {
    let subject = match &quad.subject {
        RdfSubject::NamedNode(n) => rio::Subject::NamedNode(rio::NamedNode { iri: n.as_str() }),
        RdfSubject::BlankNode(b) => rio::Subject::BlankNode(rio::BlankNode { id: b.as_str() }),
    };
    let object = match &quad.object {
        RdfObject::NamedNode(n) => rio::Term::NamedNode(rio::NamedNode { iri: n.as_str() }),
        RdfObject::BlankNode(b) => rio::Term::BlankNode(rio::BlankNode { id: b.as_str() }),
        RdfObject::Literal(l) => rio::Term::Literal(to_rio_literal(l)),
    };
    rio::Triple {
        subject,
        predicate: rio::NamedNode {
            iri: quad.predicate.as_str(),
        },
        object,
    }
}

fn to_rio_literal(l: &Literal) -> rio::Literal<'_> {
    if let Some(language) = l.language() {
        rio::Literal::LanguageTaggedString {
            value: l.value(),
            language,
        }
    } else if l.datatype() == XSD_STRING {
        rio::Literal::Simple { value: l.value() }
    } else {
        rio::Literal::Typed {
            value: l.value(),
            datatype: rio::NamedNode { iri: l.datatype() },
        }
    }
}
