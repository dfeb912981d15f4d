//! 検証レポート正規化
//!
//! Raw engine results reference shapes by node; callers want a flat record
//! naming the service (container shape), the offending property and a
//! severity they can switch on. [`ReportNormalizer`] produces one
//! [`StructuredFailure`] per [`ValidationResult`], in input order.

use crate::annotation::AnnotationResolver;
use crate::report::{Severity, ValidationResult};
use crate::ShaclError;
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};
use shapemark_core::vocabulary::sh;
use shapemark_core::{Graph, Term};
use std::sync::Arc;
use tracing::debug;

/// Output field name -> annotation predicate IRI, in output order
pub type AnnotationMap = IndexMap<String, String>;

/// One resolved annotation field
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Annotation {
    pub name: String,
    pub value: Option<String>,
}

/// Caller-facing validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredFailure {
    pub property: Option<String>,
    pub message: Option<String>,
    pub service: String,
    pub severity: Severity,
    pub annotations: Vec<Annotation>,
}

impl StructuredFailure {
    /// Comparison key covering every field except `message`.
    ///
    /// Engines word their messages differently, so failure lists are
    /// compared as sorted signature lists.
    pub fn signature(&self) -> String {
        let mut signature = format!(
            "{}|{}|{}",
            self.property.as_deref().unwrap_or(""),
            self.service,
            self.severity
        );
        for annotation in &self.annotations {
            signature.push('|');
            signature.push_str(&annotation.name);
            signature.push('=');
            signature.push_str(annotation.value.as_deref().unwrap_or(""));
        }
        signature
    }

    pub fn annotation(&self, name: &str) -> Option<&str> {
        self.annotations
            .iter()
            .find(|a| a.name == name)
            .and_then(|a| a.value.as_deref())
    }
}

impl Serialize for StructuredFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(property) = &self.property {
            map.serialize_entry("property", property)?;
        }
        if let Some(message) = &self.message {
            map.serialize_entry("message", message)?;
        }
        map.serialize_entry("service", &self.service)?;
        map.serialize_entry("severity", &self.severity)?;
        for annotation in &self.annotations {
            if let Some(value) = &annotation.value {
                map.serialize_entry(&annotation.name, value)?;
            }
        }
        map.end()
    }
}

/// Service label of a container shape: the IRI text after its last `/` or `#`
pub fn service_name(container: &Term) -> Result<String, ShaclError> {
    let name = match container {
        Term::Iri(iri) => iri.rsplit(['/', '#']).next().unwrap_or_default(),
        _ => "",
    };

    if name.is_empty() {
        return Err(ShaclError::UnnamedServiceShape(container.to_string()));
    }
    Ok(name.to_string())
}

/// Converts raw validation results into [`StructuredFailure`]s
#[derive(Debug, Clone)]
pub struct ReportNormalizer {
    schema: Arc<Graph>,
    annotations: AnnotationMap,
}

impl ReportNormalizer {
    pub fn new(schema: Arc<Graph>, annotations: AnnotationMap) -> Self {
        Self { schema, annotations }
    }

    pub fn annotations(&self) -> &AnnotationMap {
        &self.annotations
    }

    pub fn normalize(&self, result: &ValidationResult) -> Result<StructuredFailure, ShaclError> {
        let container = self.container_shape(&result.source_shape)?;
        let service = service_name(container)?;

        let messages: Vec<&str> = result.messages.iter().map(Term::value).collect();
        let message = if messages.is_empty() {
            None
        } else {
            Some(messages.join(". "))
        };

        let resolver = AnnotationResolver::new(&self.schema);
        let annotations = self
            .annotations
            .iter()
            .map(|(name, predicate)| Annotation {
                name: name.clone(),
                value: resolver.resolve(&result.source_shape, predicate),
            })
            .collect();

        let failure = StructuredFailure {
            property: result.result_path.as_ref().map(|path| path.value().to_string()),
            message,
            service,
            severity: Severity::from_iri(result.severity.as_deref()),
            annotations,
        };
        debug!(service = %failure.service, severity = %failure.severity, "normalized validation result");
        Ok(failure)
    }

    pub fn normalize_all(&self, results: &[ValidationResult]) -> Result<Vec<StructuredFailure>, ShaclError> {
        results.iter().map(|result| self.normalize(result)).collect()
    }

    fn container_shape(&self, shape: &Term) -> Result<&Term, ShaclError> {
        let containers = self.schema.subjects(&Term::iri(sh::PROPERTY), shape);
        match containers.as_slice() {
            [container] => Ok(container),
            _ => Err(ShaclError::ServiceShapeLookup {
                shape: shape.to_string(),
                matches: containers.len(),
            }),
        }
    }
}
