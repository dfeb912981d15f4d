//! HTML Microdata conversion
//!
//! Items are read the way the HTML microdata algorithm describes: top-level
//! items are `itemscope` elements without `itemprop`; property names are
//! absolute IRIs or resolved against the vocabulary of the item's first
//! `itemtype`. The output is N-Triples text with a placeholder subject, or a
//! graph with the placeholder already bound to the document.

use crate::detect::{Format, FormatConverter};
use crate::error::ConversionError;
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use shapemark_core::vocabulary::RDF_TYPE;
use shapemark_core::{Graph, Literal, Quad, Term};
use std::collections::HashMap;
use url::Url;

/// Subject of the first top-level item that has no `itemid`
pub const DEFAULT_SUBJECT: &str = "urn:x-shapemark:default-subject";

/// Convert the microdata of an HTML document into N-Triples.
///
/// The first top-level item without an `itemid` is written with the
/// [`DEFAULT_SUBJECT`] placeholder; later anonymous items get blank nodes.
/// URL-valued properties and item ids resolve against `base`.
pub fn to_ntriples(html: &str, base: &str) -> Result<String, ConversionError> {
    let mut ntriples = String::new();
    for quad in extract(html, base)? {
        ntriples.push_str(&quad.to_string());
        ntriples.push('\n');
    }
    Ok(ntriples)
}

/// Read the microdata of an HTML document into a graph named after `base`.
///
/// Same statements as [`to_ntriples`], with the placeholder subject
/// replaced by `base`.
pub fn to_graph(html: &str, base: &str) -> Result<Graph, ConversionError> {
    let placeholder = Term::iri(DEFAULT_SUBJECT);
    let document = Term::iri(base);
    Ok(Graph::from_quads(extract(html, base)?.into_iter().map(|mut quad| {
        if quad.subject == placeholder {
            quad.subject = document.clone();
        }
        if quad.object == placeholder {
            quad.object = document.clone();
        }
        quad
    })))
}

fn extract(html: &str, base: &str) -> Result<Vec<Quad>, ConversionError> {
    let base_url = Url::parse(base)
        .map_err(|e| ConversionError::Microdata(format!("invalid base '{}': {}", base, e)))?;
    let document = Html::parse_document(html);

    let id_selector = selector("[id]")?;
    let by_id = document
        .select(&id_selector)
        .filter_map(|el| el.value().id().map(|id| (id, el)))
        .collect();

    let mut extractor = Extractor {
        base: &base_url,
        by_id,
        blank_nodes: 0,
        default_subject_used: false,
        in_progress: Vec::new(),
        quads: Vec::new(),
    };

    let item_selector = selector("[itemscope]")?;
    for item in document.select(&item_selector) {
        if item.value().attr("itemprop").is_none() {
            extractor.top_level_item(item);
        }
    }

    Ok(extractor.quads)
}

fn selector(css: &str) -> Result<Selector, ConversionError> {
    Selector::parse(css).map_err(|e| ConversionError::Microdata(format!("invalid selector {}: {:?}", css, e)))
}

struct Extractor<'a> {
    base: &'a Url,
    by_id: HashMap<&'a str, ElementRef<'a>>,
    blank_nodes: usize,
    default_subject_used: bool,
    /// Items currently being read; guards against `itemref` cycles
    in_progress: Vec<ElementRef<'a>>,
    quads: Vec<Quad>,
}

impl<'a> Extractor<'a> {
    fn top_level_item(&mut self, item: ElementRef<'a>) {
        let subject = match self.item_id(item) {
            Some(id) => id,
            None if !self.default_subject_used => {
                self.default_subject_used = true;
                Term::iri(DEFAULT_SUBJECT)
            }
            None => self.blank_node(),
        };
        self.item(item, subject, None);
    }

    fn item(&mut self, item: ElementRef<'a>, subject: Term, inherited_vocab: Option<&str>) {
        if self.in_progress.contains(&item) {
            return;
        }
        self.in_progress.push(item);

        let types: Vec<String> = item
            .value()
            .attr("itemtype")
            .map(|types| types.split_whitespace().filter_map(absolute_iri).collect())
            .unwrap_or_default();
        for item_type in &types {
            self.quads.push(Quad::triple(
                subject.clone(),
                Term::iri(RDF_TYPE),
                Term::iri(item_type.as_str()),
            ));
        }

        let vocab = types
            .first()
            .map(|t| vocabulary_of(t).to_string())
            .or_else(|| inherited_vocab.map(str::to_string));

        for property in self.properties(item) {
            let predicates: Vec<String> = property
                .value()
                .attr("itemprop")
                .unwrap_or_default()
                .split_whitespace()
                .filter_map(|name| property_iri(name, vocab.as_deref()))
                .collect();
            if predicates.is_empty() {
                continue;
            }

            let value = self.value(property, vocab.as_deref());
            for predicate in predicates {
                self.quads
                    .push(Quad::triple(subject.clone(), Term::iri(predicate), value.clone()));
            }
        }

        self.in_progress.pop();
    }

    /// Property elements of an item in document order, `itemref` targets last
    fn properties(&self, item: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        let mut found = Vec::new();
        crawl(item, &mut found);

        let references = item.value().attr("itemref").unwrap_or_default();
        for id in references.split_whitespace() {
            if let Some(referenced) = self.by_id.get(id) {
                if referenced.value().attr("itemprop").is_some() && !found.contains(referenced) {
                    found.push(*referenced);
                }
                if referenced.value().attr("itemscope").is_none() {
                    crawl(*referenced, &mut found);
                }
            }
        }
        found
    }

    fn value(&mut self, property: ElementRef<'a>, vocab: Option<&str>) -> Term {
        let element = property.value();
        if element.attr("itemscope").is_some() {
            let subject = match self.item_id(property) {
                Some(id) => id,
                None => self.blank_node(),
            };
            self.item(property, subject.clone(), vocab);
            return subject;
        }

        match element.name() {
            "meta" => literal(property, element.attr("content").unwrap_or_default()),
            "audio" | "embed" | "iframe" | "img" | "source" | "track" | "video" => self.url_value(property, "src"),
            "a" | "area" | "link" => self.url_value(property, "href"),
            "object" => self.url_value(property, "data"),
            "data" | "meter" => literal(property, element.attr("value").unwrap_or_default()),
            "time" => match element.attr("datetime") {
                Some(datetime) => literal(property, datetime),
                None => literal(property, &text_of(property)),
            },
            _ => literal(property, &text_of(property)),
        }
    }

    fn url_value(&self, property: ElementRef<'a>, attr: &str) -> Term {
        match property.value().attr(attr) {
            Some(raw) => match self.base.join(raw) {
                Ok(url) => Term::iri(url.as_str()),
                Err(_) => literal(property, raw),
            },
            None => literal(property, ""),
        }
    }

    fn item_id(&self, item: ElementRef<'a>) -> Option<Term> {
        let raw = item.value().attr("itemid")?;
        self.base.join(raw).ok().map(|url| Term::iri(url.as_str()))
    }

    fn blank_node(&mut self) -> Term {
        let id = format!("md{}", self.blank_nodes);
        self.blank_nodes += 1;
        Term::blank(id)
    }
}

fn crawl<'a>(element: ElementRef<'a>, found: &mut Vec<ElementRef<'a>>) {
    for child in element.children().filter_map(ElementRef::wrap) {
        if child.value().attr("itemprop").is_some() && !found.contains(&child) {
            found.push(child);
        }
        if child.value().attr("itemscope").is_none() {
            crawl(child, found);
        }
    }
}

/// `http://schema.org/Thing` -> `http://schema.org/`
fn vocabulary_of(item_type: &str) -> &str {
    match item_type.rfind('#').or_else(|| item_type.rfind('/')) {
        Some(end) => &item_type[..=end],
        None => item_type,
    }
}

/// Absolute IRI in its normalized form, `None` for relative or malformed values
fn absolute_iri(raw: &str) -> Option<String> {
    Url::parse(raw).ok().map(String::from)
}

fn property_iri(name: &str, vocab: Option<&str>) -> Option<String> {
    absolute_iri(name).or_else(|| vocab.and_then(|vocab| absolute_iri(&format!("{}{}", vocab, name))))
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn literal(element: ElementRef<'_>, value: &str) -> Term {
    match language_of(element) {
        Some(language) => Term::literal(Literal::lang(value, language)),
        None => Term::literal(Literal::string(value)),
    }
}

/// Nearest non-empty `lang` attribute on the element or an ancestor.
///
/// `_` separators are read as `-`; tags that still are not well formed are dropped.
fn language_of(element: ElementRef<'_>) -> Option<String> {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .find_map(|el| el.value().attr("lang"))
        .map(|lang| lang.trim().replace('_', "-"))
        .filter(|lang| is_language_tag(lang))
}

/// `[a-zA-Z]{1,8}(-[a-zA-Z0-9]{1,8})*`
fn is_language_tag(tag: &str) -> bool {
    let mut subtags = tag.split('-');
    let primary_ok = subtags
        .next()
        .is_some_and(|s| (1..=8).contains(&s.len()) && s.chars().all(|c| c.is_ascii_alphabetic()));
    primary_ok && subtags.all(|s| (1..=8).contains(&s.len()) && s.chars().all(|c| c.is_ascii_alphanumeric()))
}

pub struct MicrodataConverter;

#[async_trait]
impl FormatConverter for MicrodataConverter {
    fn format(&self) -> Format {
        Format::Microdata
    }

    async fn convert(&self, text: &str, base: &str) -> Result<Graph, ConversionError> {
        to_graph(text, base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://example.org/page";

    fn schema(local: &str) -> Term {
        Term::iri(format!("http://schema.org/{}", local))
    }

    async fn convert(html: &str) -> Graph {
        MicrodataConverter.convert(html, BASE).await.unwrap()
    }

    #[test]
    fn test_placeholder_marks_first_anonymous_item() {
        let html = r#"
            <div itemscope itemtype="http://schema.org/Thing"><span itemprop="name">A</span></div>
            <div itemscope itemtype="http://schema.org/Thing"><span itemprop="name">B</span></div>
        "#;
        let ntriples = to_ntriples(html, BASE).unwrap();
        assert!(ntriples.contains("<urn:x-shapemark:default-subject> <http://schema.org/name> \"A\" ."));
        assert!(ntriples.contains("_:md0 <http://schema.org/name> \"B\" ."));
    }

    #[tokio::test]
    async fn test_item_properties_and_types() {
        let html = r#"
            <html><body>
            <div itemscope itemtype="http://schema.org/Thing">
              <h1 itemprop="name">Widget</h1>
              <a itemprop="url" href="/widget">link</a>
              <meta itemprop="description" content="A useful widget">
            </div>
            </body></html>
        "#;
        let graph = convert(html).await;
        let subject = Term::iri(BASE);

        assert_eq!(graph.objects(&subject, &Term::iri(RDF_TYPE)), vec![&schema("Thing")]);
        assert_eq!(graph.object(&subject, &schema("name")).map(|t| t.value()), Some("Widget"));
        assert_eq!(
            graph.object(&subject, &schema("url")),
            Some(&Term::iri("http://example.org/widget"))
        );
        assert_eq!(
            graph.object(&subject, &schema("description")).map(|t| t.value()),
            Some("A useful widget")
        );
    }

    #[tokio::test]
    async fn test_nested_item_inherits_vocabulary() {
        let html = r#"
            <div itemscope itemtype="http://schema.org/Book" itemid="/books/1">
              <div itemprop="author" itemscope>
                <span itemprop="name">Ann</span>
              </div>
              <span itemprop="name">Title</span>
            </div>
        "#;
        let graph = convert(html).await;
        let book = Term::iri("http://example.org/books/1");

        let author = graph.object(&book, &schema("author")).unwrap();
        assert!(author.is_blank_node());
        assert_eq!(graph.object(author, &schema("name")).map(|t| t.value()), Some("Ann"));
        assert_eq!(graph.object(&book, &schema("name")).map(|t| t.value()), Some("Title"));
        assert!(graph.quads_matching(Some(&Term::iri(BASE)), None, None, None).is_empty());
    }

    #[tokio::test]
    async fn test_itemref_and_language() {
        let html = r#"
            <div itemscope itemtype="http://schema.org/Thing" itemref="extra" lang="de"></div>
            <p id="extra" itemprop="name">Ding</p>
        "#;
        let graph = convert(html).await;
        let name = graph.object(&Term::iri(BASE), &schema("name")).unwrap();
        assert_eq!(name.value(), "Ding");
        assert_eq!(name.as_literal().and_then(|l| l.language.as_deref()), None);

        let localized = convert(
            r#"<div itemscope itemtype="http://schema.org/Thing" lang="de"><p itemprop="name">Ding</p></div>"#,
        )
        .await;
        let name = localized.object(&Term::iri(BASE), &schema("name")).unwrap();
        assert_eq!(name.as_literal().and_then(|l| l.language.as_deref()), Some("de"));
    }

    #[tokio::test]
    async fn test_absolute_property_names() {
        let html = r#"<div itemscope><span itemprop="http://example.org/label">x</span><span itemprop="ignored">y</span></div>"#;
        let graph = convert(html).await;
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.quads()[0].predicate, Term::iri("http://example.org/label"));
    }

    #[tokio::test]
    async fn test_document_without_items() {
        let graph = convert("<html><body><p>plain</p></body></html>").await;
        assert!(graph.is_empty());

        let graph = convert(r#"{"@type": "Thing"}"#).await;
        assert!(graph.is_empty());
    }

    #[tokio::test]
    async fn test_underscore_language_tag_is_normalized() {
        let html = r#"
            <html lang="en_US"><body>
            <div itemscope itemtype="http://schema.org/Thing"><span itemprop="name">Widget</span></div>
            </body></html>
        "#;
        let graph = convert(html).await;
        assert_eq!(graph.len(), 2);

        let name = graph.object(&Term::iri(BASE), &schema("name")).unwrap();
        assert_eq!(name.as_literal().and_then(|l| l.language.as_deref()), Some("en-US"));

        let ntriples = to_ntriples(html, BASE).unwrap();
        assert!(ntriples.contains("\"Widget\"@en-US ."));
    }

    #[tokio::test]
    async fn test_malformed_language_and_types_keep_the_item() {
        let html = r#"
            <div lang="not a tag!" itemscope itemtype="http://schema.org/Thing not-a-type">
              <span itemprop="name">Widget</span>
            </div>
        "#;
        let graph = convert(html).await;
        let subject = Term::iri(BASE);

        assert_eq!(graph.objects(&subject, &Term::iri(RDF_TYPE)), vec![&schema("Thing")]);
        let name = graph.object(&subject, &schema("name")).unwrap();
        assert_eq!(name.as_literal().and_then(|l| l.language.as_deref()), None);
    }

    #[test]
    fn test_language_tags() {
        assert!(is_language_tag("en"));
        assert!(is_language_tag("en-US"));
        assert!(is_language_tag("zh-Hant-TW"));
        assert!(!is_language_tag(""));
        assert!(!is_language_tag("en_US"));
        assert!(!is_language_tag("1en"));
        assert!(!is_language_tag("en-"));
    }

    #[test]
    fn test_vocabulary_of() {
        assert_eq!(vocabulary_of("http://schema.org/Thing"), "http://schema.org/");
        assert_eq!(vocabulary_of("http://example.org/ns#Thing"), "http://example.org/ns#");
    }
}
