//! rdfs:subClassOf 階層

use shapemark_core::vocabulary::{RDFS_SUBCLASS_OF, RDF_TYPE};
use shapemark_core::{Graph, Term};
use std::collections::{HashMap, HashSet};

/// Transitively closed class hierarchy of a data graph
#[derive(Debug, Clone, Default)]
pub struct ClassHierarchy {
    /// 子クラス -> 全ての祖先クラス
    superclasses: HashMap<Term, HashSet<Term>>,
}

impl ClassHierarchy {
    /// Read `rdfs:subClassOf` assertions from the graph and close them
    pub fn from_graph(graph: &Graph) -> Self {
        let subclass_of = Term::iri(RDFS_SUBCLASS_OF);
        let mut direct: HashMap<Term, HashSet<Term>> = HashMap::new();

        for quad in graph.quads_matching(None, Some(&subclass_of), None, None) {
            direct
                .entry(quad.subject.clone())
                .or_default()
                .insert(quad.object.clone());
        }

        let mut hierarchy = Self { superclasses: direct.clone() };
        hierarchy.compute_closure(&direct);
        hierarchy
    }

    /// 推移的閉包を計算
    fn compute_closure(&mut self, direct: &HashMap<Term, HashSet<Term>>) {
        let mut changed = true;
        while changed {
            changed = false;
            for child in direct.keys() {
                let known: Vec<Term> = match self.superclasses.get(child) {
                    Some(parents) => parents.iter().cloned().collect(),
                    None => continue,
                };
                let mut inherited = Vec::new();
                for parent in &known {
                    if let Some(grand_parents) = self.superclasses.get(parent) {
                        inherited.extend(grand_parents.iter().cloned());
                    }
                }

                if let Some(all_parents) = self.superclasses.get_mut(child) {
                    for grand_parent in inherited {
                        if all_parents.insert(grand_parent) {
                            changed = true;
                        }
                    }
                }
            }
        }
    }

    /// `class` equals `ancestor` or reaches it through `rdfs:subClassOf*`
    pub fn is_subclass_of(&self, class: &Term, ancestor: &Term) -> bool {
        class == ancestor
            || self
                .superclasses
                .get(class)
                .is_some_and(|parents| parents.contains(ancestor))
    }

    /// SHACL instances: nodes with an `rdf:type` that is `class` or one of its subclasses
    pub fn instances_of<'g>(&self, graph: &'g Graph, class: &Term) -> Vec<&'g Term> {
        let rdf_type = Term::iri(RDF_TYPE);
        let mut seen = HashSet::new();
        graph
            .quads_matching(None, Some(&rdf_type), None, None)
            .into_iter()
            .filter(|quad| self.is_subclass_of(&quad.object, class))
            .map(|quad| &quad.subject)
            .filter(|subject| seen.insert(*subject))
            .collect()
    }

    /// Whether `node` is a SHACL instance of `class` in `graph`
    pub fn has_type(&self, graph: &Graph, node: &Term, class: &Term) -> bool {
        graph
            .objects(node, &Term::iri(RDF_TYPE))
            .into_iter()
            .any(|node_type| self.is_subclass_of(node_type, class))
    }
}
