//! SHACL 制約検証

use crate::hierarchy::ClassHierarchy;
use crate::loader::{
    DefaultShaclLoader, PropertyConstraint, PropertyPath, PropertyShape, ShaclLoader, ShapesGraph, Target,
};
use crate::report::{ValidationReport, ValidationResult};
use crate::ShaclError;
use shapemark_core::vocabulary::sh;
use shapemark_core::{Graph, Literal, Quad, Term};
use std::collections::HashSet;
use tracing::debug;

/// Shape-validation engine seam.
///
/// Implementations receive a flat quad collection and report every failure
/// they find; the shapes they check against are fixed at construction.
pub trait ShaclValidator: Send + Sync {
    fn validate_quads(&self, data: &[Quad]) -> Result<ValidationReport, ShaclError>;
}

/// Built-in SHACL Core engine (property-shape constraints only)
#[derive(Debug, Clone)]
pub struct DefaultShaclValidator {
    shapes: ShapesGraph,
}

impl DefaultShaclValidator {
    pub fn new(shapes: ShapesGraph) -> Self {
        Self { shapes }
    }

    /// Compile the shapes of a parsed schema graph
    pub fn from_graph(schema: &Graph) -> Result<Self, ShaclError> {
        DefaultShaclLoader.load_graph(schema).map(Self::new)
    }

    pub fn shapes(&self) -> &ShapesGraph {
        &self.shapes
    }
}

impl ShaclValidator for DefaultShaclValidator {
    fn validate_quads(&self, data: &[Quad]) -> Result<ValidationReport, ShaclError> {
        let graph = Graph::from_quads(data.iter().cloned());
        let hierarchy = ClassHierarchy::from_graph(&graph);
        let mut results = Vec::new();

        // 各 Shape を検証
        for node_shape in &self.shapes.node_shapes {
            let focus_nodes = target_nodes(&node_shape.targets, &graph, &hierarchy);
            for node in &focus_nodes {
                for prop_shape in &node_shape.property_shapes {
                    results.extend(validate_property_shape(prop_shape, node, &graph, &hierarchy));
                }
            }
        }

        debug!(quads = data.len(), results = results.len(), "shape validation finished");
        Ok(ValidationReport::from_results(results))
    }
}

/// Focus nodes in data order, without duplicates
fn target_nodes(targets: &[Target], graph: &Graph, hierarchy: &ClassHierarchy) -> Vec<Term> {
    let mut seen = HashSet::new();
    let mut nodes = Vec::new();

    for target in targets {
        let found: Vec<&Term> = match target {
            Target::Class(class) => hierarchy.instances_of(graph, class),
            Target::Node(node) => vec![node],
            Target::SubjectsOf(predicate) => graph
                .quads_matching(None, Some(predicate), None, None)
                .into_iter()
                .map(|quad| &quad.subject)
                .collect(),
            Target::ObjectsOf(predicate) => graph
                .quads_matching(None, Some(predicate), None, None)
                .into_iter()
                .map(|quad| &quad.object)
                .collect(),
        };

        for node in found {
            if seen.insert(node.clone()) {
                nodes.push(node.clone());
            }
        }
    }

    nodes
}

fn path_values<'g>(path: &PropertyPath, node: &Term, graph: &'g Graph) -> Vec<&'g Term> {
    match path {
        PropertyPath::Predicate(predicate) => graph.objects(node, predicate),
        PropertyPath::Inverse { predicate, .. } => graph.subjects(predicate, node),
    }
}

fn validate_property_shape(
    shape: &PropertyShape,
    focus_node: &Term,
    graph: &Graph,
    hierarchy: &ClassHierarchy,
) -> Vec<ValidationResult> {
    let values = path_values(&shape.path, focus_node, graph);
    let mut results = Vec::new();
    let mut fail = |value: Option<&Term>, component: &str, message: String| {
        results.push(build_result(shape, focus_node, value, component, message));
    };

    for constraint in &shape.constraints {
        match constraint {
            PropertyConstraint::MinCount(min_count) => {
                if values.len() < *min_count as usize {
                    fail(
                        None,
                        sh::MIN_COUNT_COMPONENT,
                        format!("Expected at least {} values, found {}", min_count, values.len()),
                    );
                }
            }
            PropertyConstraint::MaxCount(max_count) => {
                if values.len() > *max_count as usize {
                    fail(
                        None,
                        sh::MAX_COUNT_COMPONENT,
                        format!("Expected at most {} values, found {}", max_count, values.len()),
                    );
                }
            }
            PropertyConstraint::Datatype(datatype) => {
                for value in &values {
                    let matches = value.as_literal().is_some_and(|lit| &lit.datatype == datatype);
                    if !matches {
                        fail(
                            Some(*value),
                            sh::DATATYPE_COMPONENT,
                            format!("Value {} does not have datatype <{}>", value, datatype),
                        );
                    }
                }
            }
            PropertyConstraint::NodeKind(kind) => {
                for value in &values {
                    if !kind.matches(value) {
                        fail(
                            Some(*value),
                            sh::NODE_KIND_COMPONENT,
                            format!("Value {} does not have node kind {:?}", value, kind),
                        );
                    }
                }
            }
            PropertyConstraint::Class(class) => {
                for value in &values {
                    if value.is_literal() || !hierarchy.has_type(graph, value, class) {
                        fail(
                            Some(*value),
                            sh::CLASS_COMPONENT,
                            format!("Value {} is not an instance of {}", value, class),
                        );
                    }
                }
            }
            PropertyConstraint::MinLength(min_length) => {
                for value in &values {
                    if value.is_blank_node() || value.value().chars().count() < *min_length as usize {
                        fail(
                            Some(*value),
                            sh::MIN_LENGTH_COMPONENT,
                            format!("Value {} is shorter than {} characters", value, min_length),
                        );
                    }
                }
            }
            PropertyConstraint::MaxLength(max_length) => {
                for value in &values {
                    if value.is_blank_node() || value.value().chars().count() > *max_length as usize {
                        fail(
                            Some(*value),
                            sh::MAX_LENGTH_COMPONENT,
                            format!("Value {} is longer than {} characters", value, max_length),
                        );
                    }
                }
            }
            PropertyConstraint::Pattern { pattern, regex } => {
                for value in &values {
                    if value.is_blank_node() || !regex.is_match(value.value()) {
                        fail(
                            Some(*value),
                            sh::PATTERN_COMPONENT,
                            format!("Value {} does not match pattern '{}'", value, pattern),
                        );
                    }
                }
            }
            PropertyConstraint::HasValue(expected) => {
                if !values.contains(&expected) {
                    fail(
                        None,
                        sh::HAS_VALUE_COMPONENT,
                        format!("Required value {} not found", expected),
                    );
                }
            }
        }
    }

    results
}

fn build_result(
    shape: &PropertyShape,
    focus_node: &Term,
    value: Option<&Term>,
    component: &str,
    default_message: String,
) -> ValidationResult {
    let messages = if shape.messages.is_empty() {
        vec![Term::literal(Literal::string(default_message))]
    } else {
        shape.messages.clone()
    };

    ValidationResult {
        focus_node: focus_node.clone(),
        result_path: Some(shape.path.as_term().clone()),
        value: value.cloned(),
        source_constraint_component: component.to_string(),
        source_shape: shape.id.clone(),
        messages,
        severity: Some(shape.severity.clone().unwrap_or_else(|| sh::VIOLATION.to_string())),
    }
}
