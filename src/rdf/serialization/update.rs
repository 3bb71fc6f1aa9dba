//! SPARQL Update output for diffs

use crate::rdf::{Literal, NamedNode, NamespaceManager, Quad, RdfObject, RdfSubject};
use crate::versioning::Diff;
use indexmap::IndexMap;
use rio_api::model as rio;
use std::collections::BTreeSet;
use std::fmt::Write;

const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

/// Renders a [`Diff`] as a SPARQL 1.1 Update script
///
/// Removals become a `DELETE DATA` block and additions an `INSERT DATA` block.
/// Only prefixes that are actually used are declared.
#[derive(Debug, Clone, Default)]
pub struct UpdateWriter {
    namespaces: NamespaceManager,
}

impl UpdateWriter {
    pub fn new(namespaces: NamespaceManager) -> Self {
        Self { namespaces }
    }

    pub fn namespaces(&self) -> &NamespaceManager {
        &self.namespaces
    }

    /// Render a diff; an empty diff renders as an empty string
    pub fn write(&self, diff: &Diff) -> String {
        let mut used = BTreeSet::new();
        let mut body = String::new();

        if !diff.removals().is_empty() {
            self.write_block(&mut body, "DELETE DATA", diff.removals().iter(), &mut used);
        }
        if !diff.additions().is_empty() {
            if !body.is_empty() {
                body.push_str(";\n");
            }
            self.write_block(&mut body, "INSERT DATA", diff.additions().iter(), &mut used);
        }

        let mut out = String::new();
        for ns in self.namespaces.prefixes() {
            if used.contains(&ns.prefix) {
                let _ = writeln!(out, "PREFIX {}: <{}>", ns.prefix, ns.iri);
            }
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&body);
        out
    }

    fn write_block<'q>(
        &self,
        out: &mut String,
        keyword: &str,
        quads: impl Iterator<Item = &'q Quad>,
        used: &mut BTreeSet<String>,
    ) {
        // default graph first, named graphs in order of first appearance
        let mut default = Vec::new();
        let mut named: IndexMap<&NamedNode, Vec<&Quad>> = IndexMap::new();
        for quad in quads {
            match &quad.graph {
                None => default.push(quad),
                Some(g) => named.entry(g).or_default().push(quad),
            }
        }

        let _ = writeln!(out, "{} {{", keyword);
        for quad in default {
            let _ = writeln!(out, "  {}", self.triple(quad, used));
        }
        for (graph, quads) in named {
            let _ = writeln!(out, "  GRAPH {} {{", self.iri(graph.as_str(), used));
            for quad in quads {
                let _ = writeln!(out, "    {}", self.triple(quad, used));
            }
            out.push_str("  }\n");
        }
        out.push_str("}\n");
    }

    fn triple(&self, quad: &Quad, used: &mut BTreeSet<String>) -> String {
        let subject = match &quad.subject {
            RdfSubject::NamedNode(n) => self.iri(n.as_str(), used),
            RdfSubject::BlankNode(b) => b.to_string(),
        };
        let predicate = if quad.predicate.as_str() == RDF_TYPE {
            "a".to_string()
        } else {
            self.iri(quad.predicate.as_str(), used)
        };
        let object = match &quad.object {
            RdfObject::NamedNode(n) => self.iri(n.as_str(), used),
            RdfObject::BlankNode(b) => b.to_string(),
            RdfObject::Literal(l) => self.literal(l, used),
        };
        format!("{} {} {} .", subject, predicate, object)
    }

    fn literal(&self, literal: &Literal, used: &mut BTreeSet<String>) -> String {
        let lexical = rio::Literal::Simple {
            value: literal.value(),
        }
        .to_string();
        match literal.language() {
            Some(lang) => format!("{}@{}", lexical, lang),
            None if literal.datatype() == XSD_STRING => lexical,
            None => format!("{}^^{}", lexical, self.iri(literal.datatype(), used)),
        }
    }

    fn iri(&self, iri: &str, used: &mut BTreeSet<String>) -> String {
        match self.namespaces.compact(iri) {
            Some(compact) => {
                if let Some((prefix, _)) = compact.split_once(':') {
                    used.insert(prefix.to_string());
                }
                compact
            }
            None => format!("<{}>", iri),
        }
    }
}
