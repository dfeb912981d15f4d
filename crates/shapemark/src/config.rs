//! # Validator Configuration
//!
//! Options fixed for the lifetime of a [`crate::MarkupValidator`]

use crate::error::ValidatorError;
use serde::{Deserialize, Serialize};
use shapemark_shacl::AnnotationMap;
use url::Url;
use uuid::Uuid;

pub const DEFAULT_BASE_URL_PREFIX: &str = "https://example.org/";

/// Validator options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorOptions {
    /// Turtle `rdfs:subClassOf` assertions merged into every call's data
    pub subclasses: Option<String>,

    /// Output field name -> predicate IRI looked up on the raising shape
    pub annotations: AnnotationMap,

    /// Prefix of the per-call document base URL
    pub base_url_prefix: String,

    /// Base IRI for relative references in the shape schema
    pub schema_base: Option<String>,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            subclasses: None,
            annotations: AnnotationMap::new(),
            base_url_prefix: DEFAULT_BASE_URL_PREFIX.to_string(),
            schema_base: None,
        }
    }
}

impl ValidatorOptions {
    pub fn from_json_str(json: &str) -> Result<Self, ValidatorError> {
        let options: Self = serde_json::from_str(json).map_err(|e| ValidatorError::Config(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ValidatorError> {
        let prefix = Url::parse(&self.base_url_prefix).map_err(|e| {
            ValidatorError::Config(format!("base_url_prefix '{}': {}", self.base_url_prefix, e))
        })?;
        if prefix.cannot_be_a_base() {
            return Err(ValidatorError::Config(format!(
                "base_url_prefix '{}' cannot be used as a base",
                self.base_url_prefix
            )));
        }

        for (name, predicate) in &self.annotations {
            if name.is_empty() {
                return Err(ValidatorError::Config("annotation name must not be empty".to_string()));
            }
            if predicate.is_empty() {
                return Err(ValidatorError::Config(format!("annotation '{}' has no predicate", name)));
            }
        }
        Ok(())
    }

    pub fn with_subclasses(mut self, turtle: impl Into<String>) -> Self {
        self.subclasses = Some(turtle.into());
        self
    }

    pub fn with_annotation(mut self, name: impl Into<String>, predicate: impl Into<String>) -> Self {
        self.annotations.insert(name.into(), predicate.into());
        self
    }

    pub fn with_base_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.base_url_prefix = prefix.into();
        self
    }

    pub fn with_schema_base(mut self, base: impl Into<String>) -> Self {
        self.schema_base = Some(base.into());
        self
    }

    /// Fresh document identifier for one validation call
    pub fn generate_base_url(&self) -> String {
        format!("{}{}", self.base_url_prefix, Uuid::new_v4())
    }
}
