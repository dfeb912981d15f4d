//! Markup validation pipeline

use crate::config::ValidatorOptions;
use crate::detect::{Format, FormatDetector};
use crate::error::{Result, ValidatorError};
use crate::subclass::SubclassAugmenter;
use serde::Serialize;
use shapemark_core::{parse_graph, Graph, Syntax};
use shapemark_shacl::{DefaultShaclValidator, ReportNormalizer, ShaclValidator, StructuredFailure};
use std::sync::Arc;
use tracing::{debug, info, info_span, Instrument};

/// Outcome of one validation call
#[derive(Debug, Clone, Serialize)]
pub struct ValidationOutcome {
    /// Identifier given to the validated document
    pub base_url: String,
    pub format: Format,
    /// Detected data graph, before subclass augmentation
    pub quads: Graph,
    pub failures: Vec<StructuredFailure>,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failure signatures, sorted; equal lists mean equal failure sets
    pub fn sorted_signatures(&self) -> Vec<String> {
        let mut signatures: Vec<String> = self.failures.iter().map(StructuredFailure::signature).collect();
        signatures.sort();
        signatures
    }
}

/// Validates embedded structured-data markup against a SHACL shape schema.
///
/// The shape schema, the optional subclass graph and the annotation map are
/// fixed at construction and shared read-only by concurrent calls.
pub struct MarkupValidator {
    options: ValidatorOptions,
    detector: FormatDetector,
    augmenter: SubclassAugmenter,
    engine: Arc<dyn ShaclValidator>,
    normalizer: ReportNormalizer,
}

impl MarkupValidator {
    /// Build a validator backed by the built-in shape engine
    pub fn new(shapes_turtle: &str, options: ValidatorOptions) -> Result<Self> {
        let schema = parse_schema(shapes_turtle, &options)?;
        let engine = DefaultShaclValidator::from_graph(&schema).map_err(ValidatorError::Schema)?;
        info!(
            node_shapes = engine.shapes().node_shapes.len(),
            property_shapes = engine.shapes().property_shape_count(),
            "compiled shape schema"
        );
        Self::build(schema, options, Arc::new(engine))
    }

    /// Build a validator around another shape engine
    pub fn with_engine(shapes_turtle: &str, options: ValidatorOptions, engine: Arc<dyn ShaclValidator>) -> Result<Self> {
        let schema = parse_schema(shapes_turtle, &options)?;
        Self::build(schema, options, engine)
    }

    fn build(schema: Graph, options: ValidatorOptions, engine: Arc<dyn ShaclValidator>) -> Result<Self> {
        options.validate()?;
        let augmenter =
            SubclassAugmenter::from_turtle(options.subclasses.as_deref()).map_err(ValidatorError::Subclasses)?;
        let normalizer = ReportNormalizer::new(Arc::new(schema), options.annotations.clone());

        Ok(Self {
            options,
            detector: FormatDetector::new(),
            augmenter,
            engine,
            normalizer,
        })
    }

    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    /// Validate `text` under a freshly generated document base URL
    pub async fn validate(&self, text: &str) -> Result<ValidationOutcome> {
        let base_url = self.options.generate_base_url();
        self.validate_at(text, &base_url).await
    }

    /// Validate `text` with relative references resolved against `base_url`
    pub async fn validate_at(&self, text: &str, base_url: &str) -> Result<ValidationOutcome> {
        let span = info_span!("validate", base_url = %base_url);
        async move {
            info!(bytes = text.len(), "validating markup");

            let detected = self.detector.detect(text, base_url).await?;
            let report = {
                let working = self.augmenter.augment(&detected.graph);
                debug!(
                    format = %detected.format,
                    data_quads = detected.graph.len(),
                    working_quads = working.len(),
                    "running shape engine"
                );
                self.engine.validate_quads(&working)?
            };
            let failures = self.normalizer.normalize_all(&report.results)?;
            for failure in &failures {
                debug!(
                    service = %failure.service,
                    severity = %failure.severity,
                    property = ?failure.property,
                    "failure"
                );
            }

            info!(format = %detected.format, failures = failures.len(), "validation finished");
            Ok(ValidationOutcome {
                base_url: base_url.to_string(),
                format: detected.format,
                quads: detected.graph,
                failures,
            })
        }
        .instrument(span)
        .await
    }
}

fn parse_schema(shapes_turtle: &str, options: &ValidatorOptions) -> Result<Graph> {
    parse_graph(shapes_turtle, options.schema_base.as_deref(), Syntax::Turtle)
        .map_err(|e| ValidatorError::Schema(e.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapemark_shacl::{Severity, ShaclError, ValidationReport};

    const SHAPES: &str = r#"
        @prefix sh: <http://www.w3.org/ns/shacl#> .
        @prefix schema: <http://schema.org/> .
        @prefix ex: <http://example.org/shapes#> .

        ex:ThingShape a sh:NodeShape ;
            sh:targetClass schema:Thing ;
            sh:property ex:NameShape .

        ex:NameShape sh:path schema:name ;
            sh:minCount 1 .
    "#;

    const MISSING_NAME: &str = r#"{"@context": {"@vocab": "http://schema.org/"}, "@type": "Thing"}"#;

    struct NoFailures;

    impl ShaclValidator for NoFailures {
        fn validate_quads(&self, _data: &[shapemark_core::Quad]) -> std::result::Result<ValidationReport, ShaclError> {
            Ok(ValidationReport::from_results(Vec::new()))
        }
    }

    #[tokio::test]
    async fn test_validate_jsonld() {
        let validator = MarkupValidator::new(SHAPES, ValidatorOptions::default()).unwrap();
        let outcome = validator.validate(MISSING_NAME).await.unwrap();

        assert!(outcome.base_url.starts_with("https://example.org/"));
        assert_eq!(outcome.format, Format::JsonLd);
        assert_eq!(outcome.quads.len(), 1);
        let subject = shapemark_core::Term::iri(outcome.base_url.as_str());
        assert_eq!(outcome.quads.quads()[0].subject, subject);
        assert!(!outcome.is_valid());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].service, "ThingShape");
        assert_eq!(outcome.failures[0].severity, Severity::Error);
    }

    #[tokio::test]
    async fn test_validate_at_uses_given_base() {
        let validator = MarkupValidator::new(SHAPES, ValidatorOptions::default()).unwrap();
        let outcome = validator.validate_at(MISSING_NAME, "http://example.org/fixed").await.unwrap();
        assert_eq!(outcome.base_url, "http://example.org/fixed");
    }

    #[tokio::test]
    async fn test_undetectable_input() {
        let validator = MarkupValidator::new(SHAPES, ValidatorOptions::default()).unwrap();
        let err = validator.validate("nothing structured here").await.unwrap_err();
        assert!(matches!(err, ValidatorError::Detection(_)));
    }

    #[tokio::test]
    async fn test_custom_engine() {
        let validator = MarkupValidator::with_engine(SHAPES, ValidatorOptions::default(), Arc::new(NoFailures)).unwrap();
        let outcome = validator.validate(MISSING_NAME).await.unwrap();
        assert!(outcome.is_valid());
    }

    #[test]
    fn test_construction_errors() {
        assert!(matches!(
            MarkupValidator::new("not turtle", ValidatorOptions::default()),
            Err(ValidatorError::Schema(_))
        ));
        assert!(matches!(
            MarkupValidator::new(SHAPES, ValidatorOptions::default().with_subclasses("not turtle")),
            Err(ValidatorError::Subclasses(_))
        ));
        assert!(matches!(
            MarkupValidator::new(SHAPES, ValidatorOptions::default().with_base_url_prefix("relative/")),
            Err(ValidatorError::Config(_))
        ));
    }

    #[test]
    fn test_validator_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MarkupValidator>();
    }
}
