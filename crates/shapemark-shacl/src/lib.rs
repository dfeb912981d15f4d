//! SHACL Core 検証エンジン + 検証レポート正規化
//!
//! このクレートは以下を提供します:
//! - ShapesGraph 読み込み (Loader)
//! - 制約検証 (Validator)
//! - 検証レポート (Report)
//! - レポート正規化 (Normalizer, Annotation Resolver)

pub mod annotation;
pub mod hierarchy;
pub mod loader;
pub mod normalize;
pub mod report;
pub mod validator;

// Re-exports
pub use annotation::AnnotationResolver;
pub use hierarchy::ClassHierarchy;
pub use loader::{DefaultShaclLoader, NodeShape, PropertyShape, ShaclLoader, ShapesGraph};
pub use normalize::{service_name, Annotation, AnnotationMap, ReportNormalizer, StructuredFailure};
pub use report::{Severity, ValidationReport, ValidationResult};
pub use validator::{DefaultShaclValidator, ShaclValidator};

// Error types
use shapemark_core::CoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShaclError {
    #[error("Loader error: {0}")]
    LoaderError(String),

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("expected exactly one shape declaring sh:property {shape}, found {matches}")]
    ServiceShapeLookup { shape: String, matches: usize },

    #[error("shape {0} has no name to derive a service from")]
    UnnamedServiceShape(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}
