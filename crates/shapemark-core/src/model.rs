//! RDF data models for structured-data validation

use crate::vocabulary::{RDF_LANG_STRING, XSD_STRING};
use serde::{Deserialize, Serialize};
use std::fmt;

/// RDF literal with its datatype and optional language tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Literal {
    pub value: String,
    pub datatype: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Literal {
    /// Plain `xsd:string` literal
    pub fn string<S: Into<String>>(value: S) -> Self {
        Self {
            value: value.into(),
            datatype: XSD_STRING.to_string(),
            language: None,
        }
    }

    /// Language-tagged literal (`rdf:langString`)
    pub fn lang<S: Into<String>, L: Into<String>>(value: S, language: L) -> Self {
        Self {
            value: value.into(),
            datatype: RDF_LANG_STRING.to_string(),
            language: Some(language.into()),
        }
    }

    pub fn typed<S: Into<String>, D: Into<String>>(value: S, datatype: D) -> Self {
        Self {
            value: value.into(),
            datatype: datatype.into(),
            language: None,
        }
    }
}

/// RDF term: IRI, blank node or literal
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "termType", content = "value")]
pub enum Term {
    Iri(String),
    BlankNode(String),
    Literal(Literal),
}

impl Term {
    pub fn iri<S: Into<String>>(iri: S) -> Self {
        Term::Iri(iri.into())
    }

    pub fn blank<S: Into<String>>(id: S) -> Self {
        Term::BlankNode(id.into())
    }

    pub fn literal(literal: Literal) -> Self {
        Term::Literal(literal)
    }

    /// Lexical value: the IRI, the blank node label or the literal's text
    pub fn value(&self) -> &str {
        match self {
            Term::Iri(iri) => iri,
            Term::BlankNode(id) => id,
            Term::Literal(literal) => &literal.value,
        }
    }

    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    pub fn is_iri(&self) -> bool {
        matches!(self, Term::Iri(_))
    }

    pub fn is_blank_node(&self) -> bool {
        matches!(self, Term::BlankNode(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal(_))
    }
}

/// N-Triples form of the term
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{}>", iri),
            Term::BlankNode(id) => write!(f, "_:{}", id),
            Term::Literal(literal) => {
                f.write_str("\"")?;
                for c in literal.value.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\r' => f.write_str("\\r")?,
                        '\t' => f.write_str("\\t")?,
                        other => write!(f, "{}", other)?,
                    }
                }
                f.write_str("\"")?;
                if let Some(language) = &literal.language {
                    write!(f, "@{}", language)
                } else if literal.datatype != XSD_STRING {
                    write!(f, "^^<{}>", literal.datatype)
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// RDF quad; `graph == None` is the default graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Quad {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph: Option<Term>,
}

impl Quad {
    /// Quad in the default graph
    pub fn triple(subject: Term, predicate: Term, object: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
            graph: None,
        }
    }

    pub fn in_graph(subject: Term, predicate: Term, object: Term, graph: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
            graph: Some(graph),
        }
    }
}

/// N-Quads line without the trailing newline
impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)?;
        if let Some(graph) = &self.graph {
            write!(f, " {}", graph)?;
        }
        f.write_str(" .")
    }
}
