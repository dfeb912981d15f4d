//! Error types for markup detection and validation

use crate::detect::Format;
use shapemark_core::CoreError;
use shapemark_shacl::ShaclError;
use thiserror::Error;

/// Why a single format attempt produced no graph
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Graph(#[from] CoreError),

    #[error("microdata conversion failed: {0}")]
    Microdata(String),

    #[error("RDFa stream error: {0}")]
    Stream(String),

    #[error("conversion task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("conversion produced an empty graph")]
    EmptyGraph,
}

/// Every format attempt failed or produced nothing
#[derive(Error, Debug)]
#[error("no supported markup found; accepted formats are {}", Format::accepted())]
pub struct FormatDetectionError {
    attempts: Vec<(Format, ConversionError)>,
}

impl FormatDetectionError {
    pub fn new(attempts: Vec<(Format, ConversionError)>) -> Self {
        Self { attempts }
    }

    /// Per-attempt failure reasons, in the order the formats were tried
    pub fn attempts(&self) -> &[(Format, ConversionError)] {
        &self.attempts
    }

    pub fn reason(&self, format: Format) -> Option<&ConversionError> {
        self.attempts
            .iter()
            .find(|(attempted, _)| *attempted == format)
            .map(|(_, reason)| reason)
    }
}

#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error("invalid shape schema: {0}")]
    Schema(#[source] ShaclError),

    #[error("invalid subclass graph: {0}")]
    Subclasses(#[source] CoreError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Detection(#[from] FormatDetectionError),

    #[error(transparent)]
    Shacl(#[from] ShaclError),
}

pub type Result<T> = std::result::Result<T, ValidatorError>;
