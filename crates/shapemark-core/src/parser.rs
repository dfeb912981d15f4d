//! Statement-syntax parsing into [`Graph`]s
//!
//! Thin adapter over the sophia parsers (Turtle family and JSON-LD): every statement is converted into
//! the crate's own [`Term`]/[`Quad`] model so downstream crates never see
//! sophia types.

use crate::model::{Literal, Quad, Term};
use crate::store::Graph;
use crate::CoreError;
use sophia::api::parser::{QuadParser, TripleParser};
use sophia::api::quad::Quad as _;
use sophia::api::source::{QuadSource, StreamError, TripleSource};
use sophia::api::term::{Term as SophiaTerm, TermKind};
use sophia::api::triple::Triple as _;
use sophia::iri::Iri;
use sophia::jsonld::JsonLdParser;
use sophia::turtle::parser::{nq::NQuadsParser, nt::NTriplesParser, turtle::TurtleParser};
use std::fmt;

/// Statement syntaxes understood by [`parse_graph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Syntax {
    Turtle,
    NTriples,
    NQuads,
    /// Expanded with a loader that never fetches remote contexts.
    ///
    /// Expansion blocks on a private runtime, so it must not be parsed from
    /// an async worker thread.
    JsonLd,
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Syntax::Turtle => "turtle",
            Syntax::NTriples => "n-triples",
            Syntax::NQuads => "n-quads",
            Syntax::JsonLd => "json-ld",
        })
    }
}

/// Parse `text` in the given syntax.
///
/// `base` resolves relative references in Turtle. N-Triples and N-Quads only
/// allow absolute IRIs, and JSON-LD documents carry their own `@id`s, so it
/// is ignored for them.
pub fn parse_graph(text: &str, base: Option<&str>, syntax: Syntax) -> Result<Graph, CoreError> {
    match syntax {
        Syntax::Turtle => {
            let base = base.map(parse_base).transpose()?;
            let parser = TurtleParser { base };
            collect_triples(parser.parse_str(text), syntax)
        }
        Syntax::NTriples => collect_triples(NTriplesParser {}.parse_str(text), syntax),
        Syntax::NQuads => collect_quads(NQuadsParser {}.parse_str(text), syntax),
        Syntax::JsonLd => collect_quads(JsonLdParser::new().parse_str(text), syntax),
    }
}

fn parse_base(base: &str) -> Result<Iri<String>, CoreError> {
    Iri::new(base.to_string()).map_err(|e| CoreError::InvalidIri {
        iri: base.to_string(),
        message: e.to_string(),
    })
}

/// Drain a sophia triple source into a default-graph [`Graph`]
pub fn collect_triples<S: TripleSource>(mut source: S, syntax: Syntax) -> Result<Graph, CoreError> {
    let mut graph = Graph::new();
    source
        .try_for_each_triple(|t| -> Result<(), CoreError> {
            graph.insert(Quad::triple(
                convert_term(t.s())?,
                convert_term(t.p())?,
                convert_term(t.o())?,
            ));
            Ok(())
        })
        .map_err(|e| flatten_stream_error(e, syntax))?;
    Ok(graph)
}

/// Drain a sophia quad source into a [`Graph`]
pub fn collect_quads<S: QuadSource>(mut source: S, syntax: Syntax) -> Result<Graph, CoreError> {
    let mut graph = Graph::new();
    source
        .try_for_each_quad(|q| -> Result<(), CoreError> {
            let graph_name = match q.g() {
                Some(g) => Some(convert_term(g)?),
                None => None,
            };
            graph.insert(Quad {
                subject: convert_term(q.s())?,
                predicate: convert_term(q.p())?,
                object: convert_term(q.o())?,
                graph: graph_name,
            });
            Ok(())
        })
        .map_err(|e| flatten_stream_error(e, syntax))?;
    Ok(graph)
}

fn flatten_stream_error<E: std::error::Error>(err: StreamError<E, CoreError>, syntax: Syntax) -> CoreError {
    match err {
        StreamError::SourceError(e) => CoreError::Parse {
            syntax,
            message: e.to_string(),
        },
        StreamError::SinkError(e) => e,
    }
}

/// Convert any sophia term into a [`Term`]
pub fn convert_term<T: SophiaTerm>(term: T) -> Result<Term, CoreError> {
    match term.kind() {
        TermKind::Iri => term
            .iri()
            .map(|iri| Term::Iri(iri.as_str().to_string()))
            .ok_or_else(|| CoreError::UnsupportedTerm("IRI without value".to_string())),
        TermKind::BlankNode => term
            .bnode_id()
            .map(|id| Term::BlankNode(id.as_str().to_string()))
            .ok_or_else(|| CoreError::UnsupportedTerm("blank node without label".to_string())),
        TermKind::Literal => {
            let value = term
                .lexical_form()
                .map(|lex| lex.to_string())
                .ok_or_else(|| CoreError::UnsupportedTerm("literal without lexical form".to_string()))?;
            let datatype = term
                .datatype()
                .map(|dt| dt.as_str().to_string())
                .ok_or_else(|| CoreError::UnsupportedTerm("literal without datatype".to_string()))?;
            let language = term.language_tag().map(|tag| tag.as_str().to_string());
            Ok(Term::Literal(Literal {
                value,
                datatype,
                language,
            }))
        }
        other => Err(CoreError::UnsupportedTerm(format!("{:?}", other))),
    }
}
