//! Markup format detection
//!
//! Inputs arrive without a content type. [`FormatDetector`] runs its
//! converters in priority order (JSON-LD, Microdata, RDFa) and keeps the
//! first graph that is not empty. Text that several converters accept
//! resolves by rank, never by which graph "looks better".

use crate::error::{ConversionError, FormatDetectionError};
use crate::jsonld::JsonLdConverter;
use crate::microdata::MicrodataConverter;
use crate::rdfa::RdfaConverter;
use async_trait::async_trait;
use serde::Serialize;
use shapemark_core::Graph;
use std::fmt;
use tracing::{debug, warn};

/// Markup syntaxes accepted by the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Format {
    JsonLd,
    Microdata,
    Rdfa,
}

impl Format {
    /// Detection priority order
    pub const ALL: [Format; 3] = [Format::JsonLd, Format::Microdata, Format::Rdfa];

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::JsonLd => "json-ld",
            Format::Microdata => "microdata",
            Format::Rdfa => "rdfa",
        }
    }

    /// Accepted format names, comma separated
    pub fn accepted() -> String {
        Self::ALL.map(|format| format.as_str()).join(", ")
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One markup syntax to graph conversion
#[async_trait]
pub trait FormatConverter: Send + Sync {
    fn format(&self) -> Format;

    /// Convert `text`, resolving relative references against `base`
    async fn convert(&self, text: &str, base: &str) -> Result<Graph, ConversionError>;
}

/// Result of one converter run
#[derive(Debug)]
pub enum AttemptOutcome {
    Success(Graph),
    Failure(ConversionError),
}

impl AttemptOutcome {
    /// An empty graph counts as a failed attempt
    pub fn from_result(result: Result<Graph, ConversionError>) -> Self {
        match result {
            Ok(graph) if graph.is_empty() => AttemptOutcome::Failure(ConversionError::EmptyGraph),
            Ok(graph) => AttemptOutcome::Success(graph),
            Err(e) => AttemptOutcome::Failure(e),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Success(_))
    }
}

/// Graph produced by the first successful converter
#[derive(Debug)]
pub struct DetectedGraph {
    pub format: Format,
    pub graph: Graph,
}

pub struct FormatDetector {
    converters: Vec<Box<dyn FormatConverter>>,
}

impl FormatDetector {
    /// JSON-LD, then Microdata, then RDFa
    pub fn new() -> Self {
        Self::with_converters(vec![
            Box::new(JsonLdConverter),
            Box::new(MicrodataConverter),
            Box::new(RdfaConverter::default()),
        ])
    }

    pub fn with_converters(converters: Vec<Box<dyn FormatConverter>>) -> Self {
        Self { converters }
    }

    pub fn formats(&self) -> Vec<Format> {
        self.converters.iter().map(|c| c.format()).collect()
    }

    pub async fn detect(&self, text: &str, base: &str) -> Result<DetectedGraph, FormatDetectionError> {
        let mut failures = Vec::with_capacity(self.converters.len());

        for converter in &self.converters {
            let format = converter.format();
            match AttemptOutcome::from_result(converter.convert(text, base).await) {
                AttemptOutcome::Success(graph) => {
                    debug!(%format, quads = graph.len(), "markup format detected");
                    return Ok(DetectedGraph { format, graph });
                }
                AttemptOutcome::Failure(reason) => {
                    warn!(%format, %reason, "format attempt failed");
                    failures.push((format, reason));
                }
            }
        }

        Err(FormatDetectionError::new(failures))
    }
}

impl Default for FormatDetector {
    fn default() -> Self {
        Self::new()
    }
}
