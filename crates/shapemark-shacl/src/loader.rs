//! SHACL ShapesGraph 読み込み

use crate::ShaclError;
use regex::{Regex, RegexBuilder};
use shapemark_core::vocabulary::{sh, RDFS_CLASS, RDF_TYPE};
use shapemark_core::{parse_graph, Graph, Syntax, Term};
use std::collections::HashSet;
use tracing::debug;

/// Shapes Graph
#[derive(Debug, Clone, Default)]
pub struct ShapesGraph {
    pub node_shapes: Vec<NodeShape>,
}

/// Node Shape
#[derive(Debug, Clone)]
pub struct NodeShape {
    pub id: Term,
    pub targets: Vec<Target>,
    pub property_shapes: Vec<PropertyShape>,
}

/// Property Shape
#[derive(Debug, Clone)]
pub struct PropertyShape {
    pub id: Term,
    pub path: PropertyPath,
    pub constraints: Vec<PropertyConstraint>,
    /// `sh:severity` IRI, if declared
    pub severity: Option<String>,
    /// `sh:message` literals
    pub messages: Vec<Term>,
}

/// Focus-node selector
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Class(Term),
    Node(Term),
    SubjectsOf(Term),
    ObjectsOf(Term),
}

/// Property Path
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyPath {
    Predicate(Term),
    /// `[ sh:inversePath p ]`, kept with the path node itself
    Inverse { node: Term, predicate: Term },
}

impl PropertyPath {
    /// Term the path was declared with (`sh:path` object)
    pub fn as_term(&self) -> &Term {
        match self {
            PropertyPath::Predicate(predicate) => predicate,
            PropertyPath::Inverse { node, .. } => node,
        }
    }
}

/// Property Constraints
#[derive(Debug, Clone)]
pub enum PropertyConstraint {
    MinCount(u64),
    MaxCount(u64),
    Datatype(String),
    NodeKind(NodeKind),
    Class(Term),
    MinLength(u64),
    MaxLength(u64),
    Pattern { pattern: String, regex: Regex },
    HasValue(Term),
}

/// Node Kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    BlankNode,
    Iri,
    Literal,
    BlankNodeOrIri,
    BlankNodeOrLiteral,
    IriOrLiteral,
}

impl NodeKind {
    pub fn from_iri(iri: &str) -> Option<Self> {
        match iri {
            sh::BLANK_NODE => Some(NodeKind::BlankNode),
            sh::IRI => Some(NodeKind::Iri),
            sh::LITERAL => Some(NodeKind::Literal),
            sh::BLANK_NODE_OR_IRI => Some(NodeKind::BlankNodeOrIri),
            sh::BLANK_NODE_OR_LITERAL => Some(NodeKind::BlankNodeOrLiteral),
            sh::IRI_OR_LITERAL => Some(NodeKind::IriOrLiteral),
            _ => None,
        }
    }

    pub fn matches(&self, term: &Term) -> bool {
        match self {
            NodeKind::BlankNode => term.is_blank_node(),
            NodeKind::Iri => term.is_iri(),
            NodeKind::Literal => term.is_literal(),
            NodeKind::BlankNodeOrIri => !term.is_literal(),
            NodeKind::BlankNodeOrLiteral => !term.is_iri(),
            NodeKind::IriOrLiteral => !term.is_blank_node(),
        }
    }
}

impl ShapesGraph {
    pub fn node_shape(&self, id: &Term) -> Option<&NodeShape> {
        self.node_shapes.iter().find(|shape| &shape.id == id)
    }

    pub fn property_shape_count(&self) -> usize {
        self.node_shapes.iter().map(|shape| shape.property_shapes.len()).sum()
    }
}

/// SHACL Loader trait
pub trait ShaclLoader {
    fn load_graph(&self, graph: &Graph) -> Result<ShapesGraph, ShaclError>;

    fn load_turtle(&self, ttl: &str, base: Option<&str>) -> Result<ShapesGraph, ShaclError> {
        let graph = parse_graph(ttl, base, Syntax::Turtle)?;
        self.load_graph(&graph)
    }
}

/// Default SHACL Loader
pub struct DefaultShaclLoader;

impl ShaclLoader for DefaultShaclLoader {
    fn load_graph(&self, graph: &Graph) -> Result<ShapesGraph, ShaclError> {
        let mut node_shapes = Vec::new();

        for id in discover_node_shapes(graph) {
            if is_deactivated(graph, &id) {
                debug!(shape = %id, "skipping deactivated node shape");
                continue;
            }

            let targets = load_targets(graph, &id);
            let mut property_shapes = Vec::new();
            for prop_id in graph.objects(&id, &Term::iri(sh::PROPERTY)) {
                if is_deactivated(graph, prop_id) {
                    continue;
                }
                property_shapes.push(load_property_shape(graph, prop_id)?);
            }

            node_shapes.push(NodeShape {
                id,
                targets,
                property_shapes,
            });
        }

        debug!(node_shapes = node_shapes.len(), "loaded shapes graph");
        Ok(ShapesGraph { node_shapes })
    }
}

/// Node shapes in schema order: typed `sh:NodeShape`, carrying a target, or declaring `sh:property`
fn discover_node_shapes(graph: &Graph) -> Vec<Term> {
    let rdf_type = Term::iri(RDF_TYPE);
    let mut seen = HashSet::new();
    let mut shapes = Vec::new();

    let mut candidates: Vec<&Term> = graph.subjects(&rdf_type, &Term::iri(sh::NODE_SHAPE));
    for predicate in [
        sh::TARGET_CLASS,
        sh::TARGET_NODE,
        sh::TARGET_SUBJECTS_OF,
        sh::TARGET_OBJECTS_OF,
        sh::PROPERTY,
    ] {
        candidates.extend(
            graph
                .quads_matching(None, Some(&Term::iri(predicate)), None, None)
                .into_iter()
                .map(|quad| &quad.subject),
        );
    }

    for candidate in candidates {
        if seen.insert(candidate.clone()) {
            shapes.push(candidate.clone());
        }
    }
    shapes
}

fn load_targets(graph: &Graph, shape: &Term) -> Vec<Target> {
    let mut targets = Vec::new();

    for class in graph.objects(shape, &Term::iri(sh::TARGET_CLASS)) {
        targets.push(Target::Class(class.clone()));
    }
    for node in graph.objects(shape, &Term::iri(sh::TARGET_NODE)) {
        targets.push(Target::Node(node.clone()));
    }
    for predicate in graph.objects(shape, &Term::iri(sh::TARGET_SUBJECTS_OF)) {
        targets.push(Target::SubjectsOf(predicate.clone()));
    }
    for predicate in graph.objects(shape, &Term::iri(sh::TARGET_OBJECTS_OF)) {
        targets.push(Target::ObjectsOf(predicate.clone()));
    }

    // implicit class target: a shape that is also an rdfs:Class
    let is_class = graph
        .objects(shape, &Term::iri(RDF_TYPE))
        .into_iter()
        .any(|t| t.as_iri() == Some(RDFS_CLASS));
    if is_class {
        targets.push(Target::Class(shape.clone()));
    }

    targets
}

fn load_property_shape(graph: &Graph, id: &Term) -> Result<PropertyShape, ShaclError> {
    let path_term = graph
        .object(id, &Term::iri(sh::PATH))
        .ok_or_else(|| ShaclError::LoaderError(format!("property shape {} has no sh:path", id)))?;
    let path = load_path(graph, path_term)?;

    let mut constraints = Vec::new();
    for quad in graph.quads_matching(Some(id), None, None, None) {
        let Some(predicate) = quad.predicate.as_iri() else {
            continue;
        };
        let value = &quad.object;

        let constraint = match predicate {
            sh::MIN_COUNT => PropertyConstraint::MinCount(integer(id, predicate, value)?),
            sh::MAX_COUNT => PropertyConstraint::MaxCount(integer(id, predicate, value)?),
            sh::MIN_LENGTH => PropertyConstraint::MinLength(integer(id, predicate, value)?),
            sh::MAX_LENGTH => PropertyConstraint::MaxLength(integer(id, predicate, value)?),
            sh::DATATYPE => PropertyConstraint::Datatype(iri(id, predicate, value)?.to_string()),
            sh::CLASS => PropertyConstraint::Class(value.clone()),
            sh::HAS_VALUE => PropertyConstraint::HasValue(value.clone()),
            sh::NODE_KIND => {
                let kind_iri = iri(id, predicate, value)?;
                let kind = NodeKind::from_iri(kind_iri).ok_or_else(|| {
                    ShaclError::LoaderError(format!("unknown sh:nodeKind {} on {}", kind_iri, id))
                })?;
                PropertyConstraint::NodeKind(kind)
            }
            sh::PATTERN => {
                let flags = graph.object(id, &Term::iri(sh::FLAGS)).map(|f| f.value());
                let pattern = value.value().to_string();
                let regex = compile_pattern(&pattern, flags)?;
                PropertyConstraint::Pattern { pattern, regex }
            }
            _ => continue,
        };
        constraints.push(constraint);
    }

    Ok(PropertyShape {
        id: id.clone(),
        path,
        constraints,
        severity: graph
            .object(id, &Term::iri(sh::SEVERITY))
            .and_then(|s| s.as_iri())
            .map(str::to_string),
        messages: graph
            .objects(id, &Term::iri(sh::MESSAGE))
            .into_iter()
            .filter(|m| m.is_literal())
            .cloned()
            .collect(),
    })
}

fn load_path(graph: &Graph, path: &Term) -> Result<PropertyPath, ShaclError> {
    match path {
        Term::Iri(_) => Ok(PropertyPath::Predicate(path.clone())),
        Term::BlankNode(_) => match graph.object(path, &Term::iri(sh::INVERSE_PATH)) {
            Some(predicate) if predicate.is_iri() => Ok(PropertyPath::Inverse {
                node: path.clone(),
                predicate: predicate.clone(),
            }),
            _ => Err(ShaclError::UnsupportedFeature(format!(
                "property path {} (only predicate and inverse paths are supported)",
                path
            ))),
        },
        Term::Literal(_) => Err(ShaclError::LoaderError(format!("literal used as sh:path: {}", path))),
    }
}

fn compile_pattern(pattern: &str, flags: Option<&str>) -> Result<Regex, ShaclError> {
    let mut builder = RegexBuilder::new(pattern);
    for flag in flags.unwrap_or_default().chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            other => {
                return Err(ShaclError::UnsupportedFeature(format!("sh:flags value '{}'", other)));
            }
        };
    }
    builder
        .build()
        .map_err(|e| ShaclError::LoaderError(format!("invalid sh:pattern '{}': {}", pattern, e)))
}

fn is_deactivated(graph: &Graph, shape: &Term) -> bool {
    graph
        .object(shape, &Term::iri(sh::DEACTIVATED))
        .and_then(|v| v.as_literal())
        .is_some_and(|lit| lit.value == "true" || lit.value == "1")
}

fn integer(shape: &Term, predicate: &str, value: &Term) -> Result<u64, ShaclError> {
    value
        .as_literal()
        .and_then(|lit| lit.value.trim().parse::<u64>().ok())
        .ok_or_else(|| {
            ShaclError::LoaderError(format!(
                "{} on {} must be a non-negative integer, got {}",
                predicate, shape, value
            ))
        })
}

fn iri<'t>(shape: &Term, predicate: &str, value: &'t Term) -> Result<&'t str, ShaclError> {
    value
        .as_iri()
        .ok_or_else(|| ShaclError::LoaderError(format!("{} on {} must be an IRI, got {}", predicate, shape, value)))
}
