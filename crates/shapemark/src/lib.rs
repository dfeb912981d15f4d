//! # Shapemark - structured-data markup validation
//!
//! Shapemark takes a document that embeds structured data in one of three
//! syntaxes (JSON-LD, HTML Microdata, HTML RDFa), builds an RDF graph from
//! it, validates that graph against a SHACL shape schema and reports each
//! finding as a flat, annotated [`StructuredFailure`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shapemark::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let shapes = std::fs::read_to_string("shapes.ttl")?;
//!     let options = ValidatorOptions::default()
//!         .with_annotation("description", "http://www.w3.org/2000/01/rdf-schema#comment");
//!     let validator = MarkupValidator::new(&shapes, options)?;
//!
//!     let html = std::fs::read_to_string("page.html")?;
//!     let outcome = validator.validate(&html).await?;
//!     for failure in &outcome.failures {
//!         println!("{}", serde_json::to_string(failure)?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **`shapemark-core`**: terms, quads, the indexed [`Graph`] and statement parsers
//! - **`shapemark-shacl`**: shape loading, the built-in engine and report normalization
//! - **`shapemark`**: format detection, markup converters and the [`MarkupValidator`] pipeline

pub mod config;
pub mod detect;
pub mod error;
pub mod jsonld;
pub mod logging;
pub mod microdata;
pub mod rdfa;
pub mod subclass;
pub mod validator;

pub use shapemark_core as core;
pub use shapemark_shacl as shacl;

pub use config::ValidatorOptions;
pub use detect::{AttemptOutcome, DetectedGraph, Format, FormatConverter, FormatDetector};
pub use error::{ConversionError, FormatDetectionError, ValidatorError};
pub use logging::init_tracing;
pub use shapemark_core::Graph;
pub use shapemark_shacl::{Annotation, AnnotationMap, Severity, StructuredFailure};
pub use subclass::SubclassAugmenter;
pub use validator::{MarkupValidator, ValidationOutcome};

/// Commonly used types
pub mod prelude {
    pub use crate::config::ValidatorOptions;
    pub use crate::detect::Format;
    pub use crate::error::ValidatorError;
    pub use crate::validator::{MarkupValidator, ValidationOutcome};
    pub use shapemark_shacl::{AnnotationMap, Severity, StructuredFailure};
}
