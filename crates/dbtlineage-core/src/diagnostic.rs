//! Diagnostic codes and run-report entries
//!
//! IMPORTANT: Diagnostic codes are versioned and stable.
//! NEVER rename or remove codes - downstream report consumers match on them.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};

/// Diagnostic code registry (v1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    /// A column type could not be mapped to a canonical type
    TypeUnmapped,

    /// A node's dependencies are absent or not present in the manifest
    UpstreamMissing,

    /// A node expected to have catalog data has no catalog entry or columns
    CatalogEntryMissing,

    /// An input document could not be read or parsed
    InputInvalid,
}

impl DiagnosticCode {
    /// Get the diagnostic code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TypeUnmapped => "TYPE_UNMAPPED",
            Self::UpstreamMissing => "UPSTREAM_MISSING",
            Self::CatalogEntryMissing => "CATALOG_ENTRY_MISSING",
            Self::InputInvalid => "INPUT_INVALID",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Warning - recorded, processing continues
    Warn,

    /// Failure - the run was aborted
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A diagnostic message attached to a dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable diagnostic code
    pub code: DiagnosticCode,

    /// Severity level
    pub severity: Severity,

    /// Dataset (dbt node key) this diagnostic refers to
    pub dataset: String,

    /// Human-readable message
    pub message: String,

    /// Offending raw value, if any (e.g. the unmapped type string)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with minimal fields
    pub fn new(
        code: DiagnosticCode,
        severity: Severity,
        dataset: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            severity,
            dataset: dataset.into(),
            message: message.into(),
            actual: None,
        }
    }

    /// Warning for a column type with no canonical mapping
    pub fn unmapped_type(dataset: impl Into<String>, column_type: impl Into<String>) -> Self {
        let column_type = column_type.into();
        Self::new(
            DiagnosticCode::TypeUnmapped,
            Severity::Warn,
            dataset,
            format!("unable to map type {} to metadata schema", column_type),
        )
        .with_actual(column_type)
    }

    /// Set the offending value
    pub fn with_actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = Some(actual.into());
        self
    }
}
