//! HTML+RDFa conversion
//!
//! [`RdfaParser`] walks the DOM on a blocking worker and pushes every
//! statement through a bounded channel as soon as it is produced. The
//! consumer side, [`QuadStream`], accumulates statements until the walker
//! signals the end of the document or an error.
//!
//! The walk follows the RDFa 1.1 Core processing sequence for `@about`,
//! `@resource`, `@href`, `@src`, `@typeof`, `@property`, `@rel`, `@rev`,
//! `@content`, `@datatype`, `@vocab`, `@prefix` and `@lang`. List mappings
//! and XML literals are not produced.

use crate::detect::{Format, FormatConverter};
use crate::error::ConversionError;
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use shapemark_core::vocabulary::RDF_TYPE;
use shapemark_core::{Graph, Literal, Quad, Term};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::debug;
use url::Url;

const DEFAULT_CHANNEL_CAPACITY: usize = 64;

const RDF_XML_LITERAL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#XMLLiteral";

/// Prefixes every HTML+RDFa document starts with
const INITIAL_PREFIXES: &[(&str, &str)] = &[
    ("as", "https://www.w3.org/ns/activitystreams#"),
    ("cc", "http://creativecommons.org/ns#"),
    ("dc", "http://purl.org/dc/terms/"),
    ("dcterms", "http://purl.org/dc/terms/"),
    ("dc11", "http://purl.org/dc/elements/1.1/"),
    ("foaf", "http://xmlns.com/foaf/0.1/"),
    ("gr", "http://purl.org/goodrelations/v1#"),
    ("og", "http://ogp.me/ns#"),
    ("owl", "http://www.w3.org/2002/07/owl#"),
    ("prov", "http://www.w3.org/ns/prov#"),
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfa", "http://www.w3.org/ns/rdfa#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("schema", "http://schema.org/"),
    ("sioc", "http://rdfs.org/sioc/ns#"),
    ("skos", "http://www.w3.org/2004/02/skos/core#"),
    ("vcard", "http://www.w3.org/2006/vcard/ns#"),
    ("void", "http://rdfs.org/ns/void#"),
    ("xhv", "http://www.w3.org/1999/xhtml/vocab#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
];

/// Walker events, in document order
#[derive(Debug, Clone, PartialEq)]
pub enum RdfaEvent {
    Quad(Quad),
    End,
    Error(String),
}

/// Push-based RDFa parser
#[derive(Debug, Clone)]
pub struct RdfaParser {
    channel_capacity: usize,
}

impl Default for RdfaParser {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl RdfaParser {
    pub fn with_channel_capacity(channel_capacity: usize) -> Self {
        Self {
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Start walking `html` on a blocking worker.
    ///
    /// Must be called from within a tokio runtime. Dropping the returned
    /// stream stops the walker at its next statement.
    pub fn parse(&self, html: String, base: String) -> QuadStream {
        let (tx, rx) = mpsc::channel(self.channel_capacity);

        tokio::task::spawn_blocking(move || {
            let mut emit = |quad: Quad| tx.blocking_send(RdfaEvent::Quad(quad)).is_ok();
            let terminal = match walk_document(&html, &base, &mut emit) {
                Ok(true) => RdfaEvent::End,
                Ok(false) => return,
                Err(message) => RdfaEvent::Error(message),
            };
            // receiver gone; nothing left to report
            let _ = tx.blocking_send(terminal);
        });

        QuadStream { rx }
    }
}

/// Receiving side of an [`RdfaParser`] run
#[derive(Debug)]
pub struct QuadStream {
    rx: mpsc::Receiver<RdfaEvent>,
}

impl QuadStream {
    /// `None` once the walker is gone
    pub async fn next_event(&mut self) -> Option<RdfaEvent> {
        self.rx.recv().await
    }

    /// Accumulate statements until `End`; an `Error` event or a channel that
    /// closes without a terminal event fails the whole stream.
    pub async fn collect_graph(mut self) -> Result<Graph, ConversionError> {
        let mut graph = Graph::new();
        loop {
            match self.next_event().await {
                Some(RdfaEvent::Quad(quad)) => {
                    graph.insert(quad);
                }
                Some(RdfaEvent::End) => return Ok(graph),
                Some(RdfaEvent::Error(message)) => return Err(ConversionError::Stream(message)),
                None => {
                    return Err(ConversionError::Stream(
                        "stream closed before the end of the document".to_string(),
                    ))
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RdfaConverter {
    parser: RdfaParser,
}

#[async_trait]
impl FormatConverter for RdfaConverter {
    fn format(&self) -> Format {
        Format::Rdfa
    }

    async fn convert(&self, text: &str, base: &str) -> Result<Graph, ConversionError> {
        self.parser
            .parse(text.to_string(), base.to_string())
            .collect_graph()
            .await
    }
}

/// Walk a whole document, handing each statement to `emit`.
///
/// Returns `Ok(false)` when `emit` refused a statement.
pub fn walk_document<F>(html: &str, base: &str, emit: &mut F) -> Result<bool, String>
where
    F: FnMut(Quad) -> bool,
{
    let document = Html::parse_document(html);
    let base = document_base(&document, base)?;
    debug!(base = %base, "walking RDFa document");

    let context = Context {
        base: base.clone(),
        parent_subject: Term::iri(base.as_str()),
        parent_object: None,
        incomplete: Vec::new(),
        language: None,
        prefixes: INITIAL_PREFIXES
            .iter()
            .map(|(prefix, ns)| (prefix.to_string(), ns.to_string()))
            .collect(),
        vocab: None,
    };

    let mut walker = Walker {
        emit,
        blank_nodes: 0,
        stopped: false,
    };
    walker.element(document.root_element(), &context, true);
    Ok(!walker.stopped)
}

/// The caller's base, overridden by `<base href>` when the document has one
fn document_base(document: &Html, base: &str) -> Result<Url, String> {
    let base = Url::parse(base).map_err(|e| format!("invalid base '{}': {}", base, e))?;
    let selector = Selector::parse("base[href]").map_err(|e| format!("invalid selector: {:?}", e))?;

    let declared = document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| base.join(href).ok());
    Ok(declared.unwrap_or(base))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Reverse,
}

/// Evaluation context handed from an element to its children
#[derive(Debug, Clone)]
struct Context {
    base: Url,
    parent_subject: Term,
    parent_object: Option<Term>,
    incomplete: Vec<(Term, Direction)>,
    language: Option<String>,
    prefixes: HashMap<String, String>,
    vocab: Option<String>,
}

struct Walker<'e, F> {
    emit: &'e mut F,
    blank_nodes: usize,
    stopped: bool,
}

impl<'e, F> Walker<'e, F>
where
    F: FnMut(Quad) -> bool,
{
    fn element(&mut self, el: ElementRef<'_>, parent: &Context, is_root: bool) {
        if self.stopped {
            return;
        }

        let element = el.value();

        // local mappings
        let mut context = Context {
            incomplete: Vec::new(),
            ..parent.clone()
        };
        if let Some(vocab) = element.attr("vocab") {
            context.vocab = if vocab.trim().is_empty() {
                None
            } else {
                context.base.join(vocab.trim()).ok().map(|url| url.to_string())
            };
        }
        for (name, value) in element.attrs() {
            if let Some(prefix) = name.strip_prefix("xmlns:") {
                context.prefixes.insert(prefix.to_lowercase(), value.to_string());
            }
        }
        if let Some(declared) = element.attr("prefix") {
            for (prefix, ns) in parse_prefix_attr(declared) {
                context.prefixes.insert(prefix, ns);
            }
        }
        if let Some(language) = element.attr("lang").or_else(|| element.attr("xml:lang")) {
            context.language = Some(language.to_string()).filter(|l| !l.is_empty());
        }

        let rel: Vec<Term> = element.attr("rel").map(|v| self.terms(v, &context)).unwrap_or_default();
        let rev: Vec<Term> = element.attr("rev").map(|v| self.terms(v, &context)).unwrap_or_default();
        let has_rel_or_rev = element.attr("rel").is_some() || element.attr("rev").is_some();
        let has_property = element.attr("property").is_some();
        let has_typeof = element.attr("typeof").is_some();

        let about = element.attr("about").and_then(|v| self.resource(v, &context));
        let resource = element
            .attr("resource")
            .and_then(|v| self.resource(v, &context))
            .or_else(|| element.attr("href").and_then(|v| resolve(&context.base, v)))
            .or_else(|| element.attr("src").and_then(|v| resolve(&context.base, v)));
        let document = Term::iri(context.base.as_str());

        let mut skip = false;
        let mut new_subject: Option<Term>;
        let mut current_object: Option<Term> = None;
        let mut typed_resource: Option<Term> = None;

        if !has_rel_or_rev {
            if has_property && element.attr("content").is_none() && element.attr("datatype").is_none() {
                new_subject = about
                    .clone()
                    .or_else(|| is_root.then(|| document.clone()))
                    .or_else(|| parent.parent_object.clone());
                if has_typeof {
                    typed_resource = match about.clone().or_else(|| is_root.then(|| document.clone())) {
                        Some(subject) => Some(subject),
                        None => Some(resource.clone().unwrap_or_else(|| self.blank_node())),
                    };
                    current_object = typed_resource.clone();
                }
            } else {
                new_subject = about
                    .clone()
                    .or_else(|| is_root.then(|| document.clone()))
                    .or_else(|| resource.clone());
                if new_subject.is_none() && has_typeof {
                    new_subject = Some(self.blank_node());
                }
                if new_subject.is_none() {
                    new_subject = parent.parent_object.clone();
                    skip = !has_property;
                }
                if has_typeof {
                    typed_resource = new_subject.clone();
                }
            }
        } else {
            new_subject = about.clone().or_else(|| is_root.then(|| document.clone()));
            if has_typeof && new_subject.is_some() {
                typed_resource = new_subject.clone();
            }
            if new_subject.is_none() {
                new_subject = parent.parent_object.clone();
            }
            current_object = resource.clone();
            if current_object.is_none() && has_typeof && about.is_none() {
                current_object = Some(self.blank_node());
            }
            if has_typeof && about.is_none() {
                typed_resource = current_object.clone();
            }
        }

        if let (Some(typed), Some(types)) = (&typed_resource, element.attr("typeof")) {
            for class in self.terms(types, &context) {
                self.emit(Quad::triple(typed.clone(), Term::iri(RDF_TYPE), class));
            }
        }

        let mut local_incomplete = Vec::new();
        if let Some(subject) = &new_subject {
            if let Some(object) = &current_object {
                for predicate in &rel {
                    self.emit(Quad::triple(subject.clone(), predicate.clone(), object.clone()));
                }
                for predicate in &rev {
                    self.emit(Quad::triple(object.clone(), predicate.clone(), subject.clone()));
                }
            } else if !rel.is_empty() || !rev.is_empty() {
                current_object = Some(self.blank_node());
                local_incomplete.extend(rel.iter().cloned().map(|p| (p, Direction::Forward)));
                local_incomplete.extend(rev.iter().cloned().map(|p| (p, Direction::Reverse)));
            }
        }

        if let (Some(subject), Some(properties)) = (&new_subject, element.attr("property")) {
            let value = self.property_value(el, &context, has_rel_or_rev, &resource, &typed_resource, about.is_some());
            for predicate in self.terms(properties, &context) {
                self.emit(Quad::triple(subject.clone(), predicate, value.clone()));
            }
        }

        if !skip {
            if let Some(subject) = &new_subject {
                for (predicate, direction) in &parent.incomplete {
                    let quad = match direction {
                        Direction::Forward => {
                            Quad::triple(parent.parent_subject.clone(), predicate.clone(), subject.clone())
                        }
                        Direction::Reverse => {
                            Quad::triple(subject.clone(), predicate.clone(), parent.parent_subject.clone())
                        }
                    };
                    self.emit(quad);
                }
            }
        }

        if skip {
            context.parent_subject = parent.parent_subject.clone();
            context.parent_object = parent.parent_object.clone();
            context.incomplete = parent.incomplete.clone();
        } else {
            let subject = new_subject.unwrap_or_else(|| parent.parent_subject.clone());
            context.parent_object = Some(current_object.unwrap_or_else(|| subject.clone()));
            context.parent_subject = subject;
            context.incomplete = local_incomplete;
        }

        for child in el.children().filter_map(ElementRef::wrap) {
            self.element(child, &context, false);
        }
    }

    fn property_value(
        &self,
        el: ElementRef<'_>,
        context: &Context,
        has_rel_or_rev: bool,
        resource: &Option<Term>,
        typed_resource: &Option<Term>,
        has_about: bool,
    ) -> Term {
        let element = el.value();
        let datatype = element.attr("datatype").map(str::trim);
        let content = element.attr("content").or_else(|| element.attr("datetime"));
        let lexical = || content.map(str::to_string).unwrap_or_else(|| el.text().collect());

        match datatype {
            Some(dt) if !dt.is_empty() => match self.term(dt, context) {
                Some(Term::Iri(iri)) if iri != RDF_XML_LITERAL => Term::literal(Literal::typed(lexical(), iri)),
                _ => plain_literal(lexical(), context),
            },
            Some(_) => plain_literal(lexical(), context),
            None if content.is_some() => plain_literal(lexical(), context),
            None => match (resource, typed_resource) {
                (Some(resource), _) if !has_rel_or_rev => resource.clone(),
                (_, Some(typed)) if element.attr("typeof").is_some() && !has_about => typed.clone(),
                _ => plain_literal(lexical(), context),
            },
        }
    }

    /// Whitespace separated TERMorCURIEorAbsIRI list; unresolvable entries are dropped
    fn terms(&self, value: &str, context: &Context) -> Vec<Term> {
        value
            .split_whitespace()
            .filter_map(|token| self.term(token, context))
            .collect()
    }

    fn term(&self, token: &str, context: &Context) -> Option<Term> {
        match token.split_once(':') {
            Some(("_", label)) => Some(Term::blank(format!("rdfa-{}", label))),
            Some((prefix, reference)) => match context.prefixes.get(&prefix.to_lowercase()) {
                Some(ns) => Some(Term::iri(format!("{}{}", ns, reference))),
                None => Url::parse(token).ok().map(|url| Term::iri(url.as_str())),
            },
            None => context.vocab.as_ref().map(|vocab| Term::iri(format!("{}{}", vocab, token))),
        }
    }

    /// SafeCURIEorCURIEorIRI
    fn resource(&self, value: &str, context: &Context) -> Option<Term> {
        let value = value.trim();
        if let Some(safe) = value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
            return self.curie(safe, context);
        }
        self.curie(value, context).or_else(|| resolve(&context.base, value))
    }

    fn curie(&self, value: &str, context: &Context) -> Option<Term> {
        let (prefix, reference) = value.split_once(':')?;
        if prefix == "_" {
            return Some(Term::blank(format!("rdfa-{}", reference)));
        }
        context
            .prefixes
            .get(&prefix.to_lowercase())
            .map(|ns| Term::iri(format!("{}{}", ns, reference)))
    }

    fn blank_node(&mut self) -> Term {
        let id = format!("rdfa{}", self.blank_nodes);
        self.blank_nodes += 1;
        Term::blank(id)
    }

    fn emit(&mut self, quad: Quad) {
        if !self.stopped && !(self.emit)(quad) {
            self.stopped = true;
        }
    }
}

fn resolve(base: &Url, reference: &str) -> Option<Term> {
    base.join(reference.trim()).ok().map(|url| Term::iri(url.as_str()))
}

fn plain_literal(value: String, context: &Context) -> Term {
    match &context.language {
        Some(language) => Term::literal(Literal::lang(value, language.clone())),
        None => Term::literal(Literal::string(value)),
    }
}

/// `@prefix` attribute: `name: iri` pairs
fn parse_prefix_attr(value: &str) -> Vec<(String, String)> {
    let tokens: Vec<&str> = value.split_whitespace().collect();
    tokens
        .chunks(2)
        .filter_map(|pair| match pair {
            [name, ns] => name
                .strip_suffix(':')
                .filter(|name| !name.is_empty())
                .map(|name| (name.to_lowercase(), ns.to_string())),
            _ => None,
        })
        .collect()
}
