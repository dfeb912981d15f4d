//! SHACL 検証レポート

use serde::{Deserialize, Serialize};
use shapemark_core::vocabulary::sh;
use shapemark_core::Term;

/// Validation Report
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub conforms: bool,
    pub results: Vec<ValidationResult>,
}

/// Validation Result (raw engine failure)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    pub focus_node: Term,

    pub result_path: Option<Term>,

    pub value: Option<Term>,

    pub source_constraint_component: String,

    /// Shape node that raised the result
    pub source_shape: Term,

    /// `sh:resultMessage` literals
    pub messages: Vec<Term>,

    /// `sh:resultSeverity` IRI
    pub severity: Option<String>,
}

/// Normalized severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    /// `sh:Info` → info, `sh:Warning` → warning, anything else → error
    pub fn from_iri(iri: Option<&str>) -> Self {
        match iri {
            Some(sh::INFO) => Severity::Info,
            Some(sh::WARNING) => Severity::Warning,
            _ => Severity::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ValidationReport {
    pub fn from_results(results: Vec<ValidationResult>) -> Self {
        Self {
            conforms: results.is_empty(),
            results,
        }
    }

    /// 人間可読形式で出力
    pub fn to_simple_string(&self) -> String {
        let mut output = format!(
            "Validation Report: {}\n",
            if self.conforms { "CONFORMS" } else { "DOES NOT CONFORM" }
        );

        for (i, result) in self.results.iter().enumerate() {
            let message = result
                .messages
                .first()
                .map(|m| m.value())
                .unwrap_or("No message");
            output.push_str(&format!("Result {}: {}\n", i + 1, message));
            output.push_str(&format!("  Focus Node: {}\n", result.focus_node));
            if let Some(path) = &result.result_path {
                output.push_str(&format!("  Path: {}\n", path));
            }
            if let Some(value) = &result.value {
                output.push_str(&format!("  Value: {}\n", value));
            }
            output.push_str(&format!("  Severity: {}\n", Severity::from_iri(result.severity.as_deref())));
            output.push_str(&format!("  Constraint: {}\n", result.source_constraint_component));
            output.push('\n');
        }

        output
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn info_count(&self) -> usize {
        self.count(Severity::Info)
    }

    fn count(&self, severity: Severity) -> usize {
        self.results
            .iter()
            .filter(|r| Severity::from_iri(r.severity.as_deref()) == severity)
            .count()
    }
}
