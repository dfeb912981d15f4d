//! Shape metadata lookup

use shapemark_core::{Graph, Term};

/// Reads annotation values attached to shape nodes in a schema graph
#[derive(Debug, Clone, Copy)]
pub struct AnnotationResolver<'a> {
    schema: &'a Graph,
}

impl<'a> AnnotationResolver<'a> {
    pub fn new(schema: &'a Graph) -> Self {
        Self { schema }
    }

    /// Lexical value of the first `(node, predicate, ?)` statement in schema
    /// order, or `None` when the shape carries no such statement.
    pub fn resolve(&self, node: &Term, predicate: &str) -> Option<String> {
        self.schema
            .object(node, &Term::iri(predicate))
            .map(|value| value.value().to_string())
    }
}
