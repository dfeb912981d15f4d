//! Indexed in-memory quad graph

use crate::model::{Quad, Term};
use serde::{Serialize, Serializer};
use smallvec::SmallVec;
use std::collections::HashMap;

type Postings = SmallVec<[usize; 8]>;

/// In-memory quad graph with indexing for pattern queries.
///
/// Quads keep their insertion order, which is also the order of every
/// pattern result. Inserting a quad that is already present is a no-op.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    quads: Vec<Quad>,
    /// Subject index: subject -> positions in `quads`
    subject_index: HashMap<Term, Postings>,
    /// Predicate index: predicate -> positions
    predicate_index: HashMap<Term, Postings>,
    /// Object index: object -> positions
    object_index: HashMap<Term, Postings>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_quads<I: IntoIterator<Item = Quad>>(quads: I) -> Self {
        let mut graph = Self::new();
        for quad in quads {
            graph.insert(quad);
        }
        graph
    }

    /// Add a quad; returns `false` when it was already present
    pub fn insert(&mut self, quad: Quad) -> bool {
        if self.contains(&quad) {
            return false;
        }

        let index = self.quads.len();
        self.subject_index.entry(quad.subject.clone()).or_default().push(index);
        self.predicate_index.entry(quad.predicate.clone()).or_default().push(index);
        self.object_index.entry(quad.object.clone()).or_default().push(index);
        self.quads.push(quad);
        true
    }

    pub fn extend<I: IntoIterator<Item = Quad>>(&mut self, quads: I) {
        for quad in quads {
            self.insert(quad);
        }
    }

    pub fn contains(&self, quad: &Quad) -> bool {
        self.find_exact_indices(&quad.subject, &quad.predicate, &quad.object)
            .iter()
            .any(|&i| self.quads[i].graph == quad.graph)
    }

    pub fn len(&self) -> usize {
        self.quads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    /// All quads in insertion order
    pub fn quads(&self) -> &[Quad] {
        &self.quads
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Quad> {
        self.quads.iter()
    }

    pub fn into_quads(self) -> Vec<Quad> {
        self.quads
    }

    /// Find quads matching a pattern; `None` is a wildcard.
    ///
    /// `graph` is `None` for any graph, `Some(None)` for the default graph only.
    pub fn quads_matching(
        &self,
        subject: Option<&Term>,
        predicate: Option<&Term>,
        object: Option<&Term>,
        graph: Option<Option<&Term>>,
    ) -> Vec<&Quad> {
        // Use the most selective index to minimize the search space
        let candidates: Postings = match (subject, predicate, object) {
            (Some(s), Some(p), Some(o)) => self.find_exact_indices(s, p, o),
            (Some(s), None, None) => Self::postings(&self.subject_index, s),
            (None, Some(p), None) => Self::postings(&self.predicate_index, p),
            (None, None, Some(o)) => Self::postings(&self.object_index, o),
            (Some(s), Some(p), None) => Self::intersect_indices(
                Self::slice(&self.subject_index, s),
                Self::slice(&self.predicate_index, p),
            ),
            (Some(s), None, Some(o)) => Self::intersect_indices(
                Self::slice(&self.subject_index, s),
                Self::slice(&self.object_index, o),
            ),
            (None, Some(p), Some(o)) => Self::intersect_indices(
                Self::slice(&self.predicate_index, p),
                Self::slice(&self.object_index, o),
            ),
            (None, None, None) => (0..self.quads.len()).collect(),
        };

        candidates
            .into_iter()
            .map(|i| &self.quads[i])
            .filter(|quad| match graph {
                None => true,
                Some(g) => quad.graph.as_ref() == g,
            })
            .collect()
    }

    /// Objects of `(subject, predicate, ?o)` in insertion order
    pub fn objects(&self, subject: &Term, predicate: &Term) -> Vec<&Term> {
        self.quads_matching(Some(subject), Some(predicate), None, None)
            .into_iter()
            .map(|quad| &quad.object)
            .collect()
    }

    /// Subjects of `(?s, predicate, object)` in insertion order
    pub fn subjects(&self, predicate: &Term, object: &Term) -> Vec<&Term> {
        self.quads_matching(None, Some(predicate), Some(object), None)
            .into_iter()
            .map(|quad| &quad.subject)
            .collect()
    }

    /// First object of `(subject, predicate, ?o)`
    pub fn object(&self, subject: &Term, predicate: &Term) -> Option<&Term> {
        Self::slice(&self.subject_index, subject)
            .iter()
            .map(|&i| &self.quads[i])
            .find(|quad| &quad.predicate == predicate)
            .map(|quad| &quad.object)
    }

    fn postings(index: &HashMap<Term, Postings>, key: &Term) -> Postings {
        index.get(key).cloned().unwrap_or_default()
    }

    fn slice<'a>(index: &'a HashMap<Term, Postings>, key: &Term) -> &'a [usize] {
        index.get(key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    fn find_exact_indices(&self, subject: &Term, predicate: &Term, object: &Term) -> Postings {
        let by_subject = Self::slice(&self.subject_index, subject);
        let by_predicate = Self::slice(&self.predicate_index, predicate);
        let by_object = Self::slice(&self.object_index, object);

        by_subject
            .iter()
            .copied()
            .filter(|idx| by_predicate.contains(idx) && by_object.contains(idx))
            .collect()
    }

    /// Intersect two sorted index vectors
    fn intersect_indices(a: &[usize], b: &[usize]) -> Postings {
        let mut result = SmallVec::new();
        let mut i = 0;
        let mut j = 0;

        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    result.push(a[i]);
                    i += 1;
                    j += 1;
                }
            }
        }

        result
    }
}

impl FromIterator<Quad> for Graph {
    fn from_iter<I: IntoIterator<Item = Quad>>(iter: I) -> Self {
        Self::from_quads(iter)
    }
}

impl<'a> IntoIterator for &'a Graph {
    type Item = &'a Quad;
    type IntoIter = std::slice::Iter<'a, Quad>;

    fn into_iter(self) -> Self::IntoIter {
        self.quads.iter()
    }
}

impl Serialize for Graph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.quads)
    }
}
