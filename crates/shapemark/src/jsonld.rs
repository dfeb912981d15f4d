//! JSON-LD conversion

use crate::detect::{Format, FormatConverter};
use crate::error::ConversionError;
use async_trait::async_trait;
use serde_json::{json, Value};
use shapemark_core::{parse_graph, Graph, Syntax};

const SCHEMA_ORG_VOCAB: &str = "http://schema.org/";

/// Context URLs read as `{"@vocab": "http://schema.org/"}`
const SCHEMA_ORG_CONTEXTS: [&str; 4] = [
    "http://schema.org",
    "http://schema.org/",
    "https://schema.org",
    "https://schema.org/",
];

/// Expand a JSON-LD document into a graph.
///
/// When the root is an object its `@id` is replaced by `base`, so the
/// top-level node is named after the document. The schema.org context is
/// inlined as a vocabulary mapping; other remote contexts are never
/// fetched, and documents that need one fail to expand.
///
/// Blocks the calling thread; async callers go through [`JsonLdConverter`].
pub fn to_graph(text: &str, base: &str) -> Result<Graph, ConversionError> {
    let mut document: Value = serde_json::from_str(text)?;
    inline_known_contexts(&mut document);
    if let Value::Object(root) = &mut document {
        root.insert("@id".to_string(), Value::String(base.to_string()));
    }
    let json = serde_json::to_string(&document)?;
    Ok(parse_graph(&json, None, Syntax::JsonLd)?)
}

fn inline_known_contexts(value: &mut Value) {
    match value {
        Value::Object(members) => {
            for (key, member) in members.iter_mut() {
                if key == "@context" {
                    inline_context(member);
                } else {
                    inline_known_contexts(member);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(inline_known_contexts),
        _ => {}
    }
}

fn inline_context(context: &mut Value) {
    let known = matches!(context, Value::String(url) if SCHEMA_ORG_CONTEXTS.contains(&url.as_str()));
    if known {
        *context = json!({ "@vocab": SCHEMA_ORG_VOCAB });
    } else if let Value::Array(entries) = context {
        entries.iter_mut().for_each(inline_context);
    }
}

pub struct JsonLdConverter;

#[async_trait]
impl FormatConverter for JsonLdConverter {
    fn format(&self) -> Format {
        Format::JsonLd
    }

    async fn convert(&self, text: &str, base: &str) -> Result<Graph, ConversionError> {
        let (text, base) = (text.to_string(), base.to_string());
        tokio::task::spawn_blocking(move || to_graph(&text, &base)).await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapemark_core::vocabulary::RDF_TYPE;
    use shapemark_core::Term;

    const BASE: &str = "http://example.org/doc-1";

    #[test]
    fn test_root_object_takes_base_id() {
        let json = r#"{
            "@context": {"@vocab": "http://schema.org/"},
            "@id": "http://elsewhere.example/x",
            "@type": "Thing",
            "name": "Widget"
        }"#;
        let graph = to_graph(json, BASE).unwrap();
        let base = Term::iri(BASE);

        assert_eq!(graph.objects(&base, &Term::iri(RDF_TYPE)), vec![&Term::iri("http://schema.org/Thing")]);
        assert_eq!(
            graph.object(&base, &Term::iri("http://schema.org/name")).map(|t| t.value()),
            Some("Widget")
        );
        assert!(graph
            .quads_matching(Some(&Term::iri("http://elsewhere.example/x")), None, None, None)
            .is_empty());
    }

    #[test]
    fn test_nested_nodes_become_blank_nodes() {
        let json = r#"{
            "@context": {"@vocab": "http://schema.org/"},
            "@type": "Book",
            "author": {"@type": "Person", "name": "Ann"}
        }"#;
        let graph = to_graph(json, BASE).unwrap();
        assert_eq!(graph.len(), 4);

        let author = graph.object(&Term::iri(BASE), &Term::iri("http://schema.org/author")).unwrap();
        assert!(author.is_blank_node());
    }

    #[test]
    fn test_array_root_is_not_renamed() {
        let json = r#"[{"@id": "http://example.org/a", "http://schema.org/name": "A"}]"#;
        let graph = to_graph(json, BASE).unwrap();
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.quads()[0].subject, Term::iri("http://example.org/a"));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(to_graph("<html></html>", BASE), Err(ConversionError::Json(_))));
    }

    #[test]
    fn test_document_without_vocabulary_is_empty() {
        let graph = to_graph(r#"{"name": "no context"}"#, BASE).unwrap();
        assert!(graph.is_empty());
    }

    #[test]
    fn test_remote_context_fails() {
        let json = r#"{"@context": "https://w3id.org/security/v1", "@type": "Key"}"#;
        assert!(matches!(to_graph(json, BASE), Err(ConversionError::Graph(_))));
    }

    #[test]
    fn test_schema_org_context_is_inlined() {
        let json = r#"{
            "@context": "https://schema.org/",
            "@type": "Thing",
            "name": "Widget",
            "subjectOf": {"@context": ["http://schema.org", {"ex": "http://example.org/"}], "@type": "ex:Note"}
        }"#;
        let graph = to_graph(json, BASE).unwrap();
        let base = Term::iri(BASE);

        assert_eq!(graph.objects(&base, &Term::iri(RDF_TYPE)), vec![&Term::iri("http://schema.org/Thing")]);
        assert_eq!(
            graph.object(&base, &Term::iri("http://schema.org/name")).map(|t| t.value()),
            Some("Widget")
        );
        let note = graph.object(&base, &Term::iri("http://schema.org/subjectOf")).unwrap();
        assert_eq!(graph.objects(note, &Term::iri(RDF_TYPE)), vec![&Term::iri("http://example.org/Note")]);
    }

    #[tokio::test]
    async fn test_converter_inside_runtime() {
        let json = r#"{"@context": {"@vocab": "http://schema.org/"}, "@type": "Thing"}"#;
        let graph = JsonLdConverter.convert(json, BASE).await.unwrap();
        assert_eq!(graph.len(), 1);

        assert!(JsonLdConverter.convert("{}", BASE).await.unwrap().is_empty());
        assert!(JsonLdConverter.convert("[]", BASE).await.unwrap().is_empty());
        assert!(matches!(
            JsonLdConverter.convert("<p>html</p>", BASE).await,
            Err(ConversionError::Json(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_converter_on_multi_thread_runtime() {
        let json = r#"{"@context": "https://schema.org/", "@type": "Thing", "name": "Widget"}"#;
        let graph = JsonLdConverter.convert(json, BASE).await.unwrap();
        assert_eq!(graph.len(), 2);
    }
}
