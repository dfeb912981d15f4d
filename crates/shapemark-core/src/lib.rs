//! # shapemark-core
//!
//! RDF data model and graph building blocks shared by the shapemark crates:
//! terms and quads, an indexed in-memory [`Graph`], and statement parsers
//! (Turtle, N-Triples, N-Quads, JSON-LD) that build graphs from text.

pub mod model;
pub mod parser;
pub mod store;
pub mod vocabulary;

pub use model::*;
pub use parser::{parse_graph, Syntax};
pub use store::Graph;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("{syntax} parse error: {message}")]
    Parse { syntax: Syntax, message: String },

    #[error("invalid IRI <{iri}>: {message}")]
    InvalidIri { iri: String, message: String },

    #[error("unsupported term: {0}")]
    UnsupportedTerm(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::{RDF_TYPE, XSD_STRING};

    fn iri(s: &str) -> Term {
        Term::iri(s)
    }

    #[cfg(test)]
    mod term_tests {
        use super::*;

        #[test]
        fn test_term_value() {
            assert_eq!(iri("http://example.org/a").value(), "http://example.org/a");
            assert_eq!(Term::blank("b0").value(), "b0");
            assert_eq!(Term::literal(Literal::string("hello")).value(), "hello");
        }

        #[test]
        fn test_term_display_ntriples() {
            assert_eq!(iri("http://example.org/a").to_string(), "<http://example.org/a>");
            assert_eq!(Term::blank("b0").to_string(), "_:b0");
            assert_eq!(Term::literal(Literal::string("plain")).to_string(), "\"plain\"");
            assert_eq!(Term::literal(Literal::lang("hallo", "de")).to_string(), "\"hallo\"@de");
            assert_eq!(
                Term::literal(Literal::typed("5", "http://www.w3.org/2001/XMLSchema#integer")).to_string(),
                "\"5\"^^<http://www.w3.org/2001/XMLSchema#integer>"
            );
        }

        #[test]
        fn test_literal_escaping() {
            let term = Term::literal(Literal::string("say \"hi\"\nback\\slash"));
            assert_eq!(term.to_string(), "\"say \\\"hi\\\"\\nback\\\\slash\"");
        }

        #[test]
        fn test_quad_display() {
            let quad = Quad::triple(iri("http://example.org/s"), iri(RDF_TYPE), iri("http://example.org/C"));
            assert_eq!(
                quad.to_string(),
                "<http://example.org/s> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://example.org/C> ."
            );
        }
    }

    #[cfg(test)]
    mod store_tests {
        use super::*;

        fn sample_graph() -> Graph {
            Graph::from_quads(vec![
                Quad::triple(iri("http://example.org/a"), iri(RDF_TYPE), iri("http://example.org/Thing")),
                Quad::triple(iri("http://example.org/a"), iri("http://example.org/name"), Term::literal(Literal::string("A"))),
                Quad::triple(iri("http://example.org/b"), iri(RDF_TYPE), iri("http://example.org/Thing")),
                Quad::in_graph(
                    iri("http://example.org/b"),
                    iri("http://example.org/name"),
                    Term::literal(Literal::string("B")),
                    iri("http://example.org/g"),
                ),
            ])
        }

        #[test]
        fn test_graph_new_is_empty() {
            let graph = Graph::new();
            assert!(graph.is_empty());
            assert_eq!(graph.len(), 0);
        }

        #[test]
        fn test_insert_deduplicates() {
            let mut graph = Graph::new();
            let quad = Quad::triple(iri("http://example.org/s"), iri("http://example.org/p"), iri("http://example.org/o"));
            assert!(graph.insert(quad.clone()));
            assert!(!graph.insert(quad.clone()));
            assert_eq!(graph.len(), 1);

            let mut named = quad;
            named.graph = Some(iri("http://example.org/g"));
            assert!(graph.insert(named));
            assert_eq!(graph.len(), 2);
        }

        #[test]
        fn test_pattern_queries() {
            let graph = sample_graph();
            let thing = iri("http://example.org/Thing");
            let rdf_type = iri(RDF_TYPE);

            assert_eq!(graph.quads_matching(None, None, None, None).len(), 4);
            assert_eq!(graph.quads_matching(Some(&iri("http://example.org/a")), None, None, None).len(), 2);
            assert_eq!(graph.quads_matching(None, Some(&rdf_type), Some(&thing), None).len(), 2);
            assert_eq!(
                graph.quads_matching(Some(&iri("http://example.org/b")), Some(&rdf_type), Some(&thing), None).len(),
                1
            );
            assert!(graph
                .quads_matching(Some(&iri("http://example.org/missing")), None, None, None)
                .is_empty());
        }

        #[test]
        fn test_graph_component_filter() {
            let graph = sample_graph();
            let name = iri("http://example.org/name");

            assert_eq!(graph.quads_matching(None, Some(&name), None, None).len(), 2);
            assert_eq!(graph.quads_matching(None, Some(&name), None, Some(None)).len(), 1);
            let named = iri("http://example.org/g");
            let in_named = graph.quads_matching(None, Some(&name), None, Some(Some(&named)));
            assert_eq!(in_named.len(), 1);
            assert_eq!(in_named[0].object.value(), "B");
        }

        #[test]
        fn test_results_follow_insertion_order() {
            let graph = sample_graph();
            let subjects: Vec<&str> = graph
                .subjects(&iri(RDF_TYPE), &iri("http://example.org/Thing"))
                .into_iter()
                .map(|t| t.value())
                .collect();
            assert_eq!(subjects, vec!["http://example.org/a", "http://example.org/b"]);
        }

        #[test]
        fn test_object_lookup() {
            let graph = sample_graph();
            let object = graph.object(&iri("http://example.org/a"), &iri("http://example.org/name"));
            assert_eq!(object.map(|t| t.value()), Some("A"));
            assert!(graph.object(&iri("http://example.org/a"), &iri("http://example.org/other")).is_none());
        }

        #[test]
        fn test_graph_serializes_as_quad_list() {
            let graph = sample_graph();
            let json = serde_json::to_value(&graph).unwrap();
            assert_eq!(json.as_array().map(|a| a.len()), Some(4));
            assert_eq!(json[0]["subject"]["termType"], "Iri");
        }
    }

    #[cfg(test)]
    mod graph_properties {
        use super::*;
        use proptest::prelude::*;

        fn quad_strategy() -> impl Strategy<Value = Quad> {
            (0u8..4, 0u8..3, 0u8..4).prop_map(|(s, p, o)| {
                Quad::triple(
                    iri(&format!("http://example.org/s{}", s)),
                    iri(&format!("http://example.org/p{}", p)),
                    Term::literal(Literal::string(format!("o{}", o))),
                )
            })
        }

        proptest! {
            #[test]
            fn insertion_keeps_first_occurrence_order(quads in prop::collection::vec(quad_strategy(), 0..40)) {
                let graph = Graph::from_quads(quads.clone());

                let mut expected: Vec<Quad> = Vec::new();
                for quad in quads {
                    if !expected.contains(&quad) {
                        expected.push(quad);
                    }
                }
                prop_assert_eq!(graph.quads(), expected.as_slice());
            }

            #[test]
            fn pattern_results_match_linear_scan(
                quads in prop::collection::vec(quad_strategy(), 0..40),
                pattern in quad_strategy(),
            ) {
                let graph = Graph::from_quads(quads);
                let indexed = graph.quads_matching(None, Some(&pattern.predicate), Some(&pattern.object), None);
                let scanned: Vec<&Quad> = graph
                    .iter()
                    .filter(|q| q.predicate == pattern.predicate && q.object == pattern.object)
                    .collect();
                prop_assert_eq!(indexed, scanned);
            }
        }
    }

    #[cfg(test)]
    mod parser_tests {
        use super::*;

        #[test]
        fn test_parse_turtle_with_base() {
            let ttl = r#"
                @prefix schema: <http://schema.org/> .
                <#me> a schema:Person ;
                    schema:name "Alice"@en .
            "#;
            let graph = parse_graph(ttl, Some("http://example.org/doc"), Syntax::Turtle).unwrap();
            assert_eq!(graph.len(), 2);

            let me = iri("http://example.org/doc#me");
            let types = graph.objects(&me, &iri(RDF_TYPE));
            assert_eq!(types, vec![&iri("http://schema.org/Person")]);

            let name = graph.object(&me, &iri("http://schema.org/name")).unwrap();
            let literal = name.as_literal().unwrap();
            assert_eq!(literal.value, "Alice");
            assert_eq!(literal.language.as_deref(), Some("en"));
        }

        #[test]
        fn test_parse_turtle_blank_nodes_and_typed_literals() {
            let ttl = r#"
                @prefix ex: <http://example.org/> .
                ex:s ex:p [ ex:q 42 ] .
            "#;
            let graph = parse_graph(ttl, None, Syntax::Turtle).unwrap();
            assert_eq!(graph.len(), 2);

            let object = graph.object(&iri("http://example.org/s"), &iri("http://example.org/p")).unwrap();
            assert!(object.is_blank_node());
            let value = graph.object(object, &iri("http://example.org/q")).unwrap();
            assert_eq!(
                value.as_literal().map(|l| l.datatype.as_str()),
                Some("http://www.w3.org/2001/XMLSchema#integer")
            );
        }

        #[test]
        fn test_parse_ntriples_plain_literal_is_xsd_string() {
            let nt = "<http://example.org/s> <http://example.org/p> \"v\" .\n";
            let graph = parse_graph(nt, None, Syntax::NTriples).unwrap();
            let literal = graph.quads()[0].object.as_literal().unwrap().clone();
            assert_eq!(literal.datatype, XSD_STRING);
            assert!(literal.language.is_none());
        }

        #[test]
        fn test_parse_nquads_keeps_graph_name() {
            let nq = "<http://example.org/s> <http://example.org/p> <http://example.org/o> <http://example.org/g> .\n\
                      <http://example.org/s> <http://example.org/p> <http://example.org/o2> .\n";
            let graph = parse_graph(nq, None, Syntax::NQuads).unwrap();
            assert_eq!(graph.len(), 2);
            assert_eq!(graph.quads()[0].graph, Some(iri("http://example.org/g")));
            assert_eq!(graph.quads()[1].graph, None);
        }

        #[test]
        fn test_display_roundtrips_through_ntriples_parser() {
            let quad = Quad::triple(
                iri("http://example.org/s"),
                iri("http://example.org/p"),
                Term::literal(Literal::lang("line one\n\"two\"", "en")),
            );
            let graph = parse_graph(&format!("{}\n", quad), None, Syntax::NTriples).unwrap();
            assert_eq!(graph.quads(), &[quad]);
        }

        #[test]
        fn test_parse_error_reports_syntax() {
            let err = parse_graph("this is not turtle", None, Syntax::Turtle).unwrap_err();
            assert!(matches!(err, CoreError::Parse { syntax: Syntax::Turtle, .. }));
        }

        #[test]
        fn test_invalid_base_is_rejected() {
            let err = parse_graph("<a> <b> <c> .", Some("not a base"), Syntax::Turtle).unwrap_err();
            assert!(matches!(err, CoreError::InvalidIri { .. }));
        }

        #[test]
        fn test_parse_jsonld_inline_context() {
            let json = r#"{
                "@context": {"name": "http://schema.org/name", "knows": {"@id": "http://schema.org/knows", "@type": "@id"}},
                "@id": "http://example.org/a",
                "@type": "http://schema.org/Person",
                "name": "Alice",
                "knows": "http://example.org/b"
            }"#;
            let graph = parse_graph(json, None, Syntax::JsonLd).unwrap();
            assert_eq!(graph.len(), 3);

            let a = iri("http://example.org/a");
            assert_eq!(graph.objects(&a, &iri(RDF_TYPE)), vec![&iri("http://schema.org/Person")]);
            assert_eq!(
                graph.object(&a, &iri("http://schema.org/knows")),
                Some(&iri("http://example.org/b"))
            );
        }

        #[test]
        fn test_jsonld_remote_context_is_not_fetched() {
            let json = r#"{"@context": "https://schema.org/", "@type": "Thing", "name": "x"}"#;
            let err = parse_graph(json, None, Syntax::JsonLd).unwrap_err();
            assert!(matches!(err, CoreError::Parse { syntax: Syntax::JsonLd, .. }));
        }

        #[test]
        fn test_empty_text_parses_to_empty_graph() {
            let graph = parse_graph("", None, Syntax::NTriples).unwrap();
            assert!(graph.is_empty());
        }
    }
}
