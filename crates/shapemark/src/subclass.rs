//! Subclass graph merging

use shapemark_core::{parse_graph, CoreError, Graph, Quad, Syntax};
use std::borrow::Cow;
use std::sync::Arc;

/// Appends a fixed `rdfs:subClassOf` graph to each call's data quads
#[derive(Debug, Clone, Default)]
pub struct SubclassAugmenter {
    subclasses: Option<Arc<Graph>>,
}

impl SubclassAugmenter {
    pub fn new(subclasses: Option<Arc<Graph>>) -> Self {
        Self { subclasses }
    }

    pub fn from_turtle(turtle: Option<&str>) -> Result<Self, CoreError> {
        let subclasses = turtle
            .map(|ttl| parse_graph(ttl, None, Syntax::Turtle))
            .transpose()?;
        Ok(Self::new(subclasses.map(Arc::new)))
    }

    pub fn is_enabled(&self) -> bool {
        self.subclasses.is_some()
    }

    /// Data quads followed by the subclass quads; neither source is modified
    pub fn augment<'g>(&self, data: &'g Graph) -> Cow<'g, [Quad]> {
        match &self.subclasses {
            Some(subclasses) => Cow::Owned(data.iter().chain(subclasses.iter()).cloned().collect()),
            None => Cow::Borrowed(data.quads()),
        }
    }
}
