//! Run report (stable v1)
//!
//! One report is owned by one source run. It accumulates work-unit
//! acknowledgments and non-fatal diagnostics and is retrieved after the pass.

use serde::{Deserialize, Serialize};
use crate::diagnostic::{Diagnostic, Severity};

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Summary counters for a run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    /// Number of work units emitted
    pub workunits_produced: usize,

    /// Number of warnings recorded
    pub warnings: usize,

    /// Number of failures recorded
    pub failures: usize,
}

/// Source run report (report.json v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReport {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp the report was created (ISO 8601)
    pub timestamp: String,

    /// Summary counters
    pub summary: ReportSummary,

    /// Ids of every work unit emitted, in emission order
    pub workunit_ids: Vec<String>,

    /// Warnings and failures in the order they were recorded
    pub diagnostics: Vec<Diagnostic>,
}

impl SourceReport {
    /// Create a new empty report
    pub fn new() -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary: ReportSummary::default(),
            workunit_ids: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Acknowledge an emitted work unit
    pub fn report_workunit(&mut self, id: impl Into<String>) {
        self.summary.workunits_produced += 1;
        self.workunit_ids.push(id.into());
    }

    /// Record a diagnostic, counting it by severity
    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Warn => self.summary.warnings += 1,
            Severity::Error => self.summary.failures += 1,
            Severity::Info => {}
        }

        self.diagnostics.push(diagnostic);
    }

    /// Record a non-fatal warning
    pub fn report_warning(&mut self, diagnostic: Diagnostic) {
        self.add_diagnostic(Diagnostic {
            severity: Severity::Warn,
            ..diagnostic
        });
    }

    /// Record a failure
    pub fn report_failure(&mut self, diagnostic: Diagnostic) {
        self.add_diagnostic(Diagnostic {
            severity: Severity::Error,
            ..diagnostic
        });
    }

    /// All warnings recorded so far
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warn)
    }

    /// Warnings recorded against one dataset
    pub fn warnings_for<'a>(&'a self, dataset: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.warnings().filter(move |d| d.dataset == dataset)
    }

    /// Check if any failure was recorded
    pub fn has_failures(&self) -> bool {
        self.summary.failures > 0
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        std::fs::write(path, json)
    }
}

impl Default for SourceReport {
    fn default() -> Self {
        Self::new()
    }
}
