//! dbt ingestion source
//!
//! [`DbtSource`] loads the manifest and catalog, extracts nodes and yields
//! one [`MetadataWorkUnit`] per node. Each call to
//! [`DbtSource::get_workunits`] re-reads both files; nothing is cached.
//!
//! ```rust,ignore
//! let mut source = DbtSource::from_config_file(Path::new("dbtlineage.toml"))?;
//! for workunit in source.get_workunits()? {
//!     sink.write(&workunit)?;
//! }
//! let report = source.get_report();
//! ```

use std::path::Path;

use dbtlineage_core::{
    Aspect, ConfigError, DatasetSnapshot, Diagnostic, DiagnosticCode, MetadataWorkUnit, Severity,
    SourceConfig, SourceReport,
};

use crate::aspects;
use crate::catalog::{Catalog, CatalogError};
use crate::extract::{extract_dbt_entities, DbtNode, ExtractError, ExtractOptions};
use crate::manifest::{Manifest, ManifestError};

/// Platform of the source itself, used in schema aspects
pub const DBT_PLATFORM: &str = "dbt";

/// Lifecycle of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// Constructed, nothing emitted yet
    Ready,

    /// A work unit pass has started
    Emitting,

    /// Closed; no further passes
    Closed,
}

/// Errors that abort a source run
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("dbt source is closed")]
    Closed,
}

/// Extracts dbt metadata for ingestion
#[derive(Debug)]
pub struct DbtSource {
    config: SourceConfig,
    platform: String,
    report: SourceReport,
    state: SourceState,
}

impl DbtSource {
    /// Create a source, validating the config before any file access
    pub fn new(config: SourceConfig) -> Result<Self, SourceError> {
        config.validate()?;

        Ok(Self {
            config,
            platform: DBT_PLATFORM.to_string(),
            report: SourceReport::new(),
            state: SourceState::Ready,
        })
    }

    /// Create a source from a TOML config file
    pub fn from_config_file(path: &Path) -> Result<Self, SourceError> {
        Self::new(SourceConfig::from_file(path)?)
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    /// Read both artifacts and extract nodes
    pub fn load_nodes(&self) -> Result<Vec<DbtNode>, SourceError> {
        tracing::info!(path = %self.config.manifest_path.display(), "loading dbt manifest");
        let manifest = Manifest::from_file(&self.config.manifest_path)?;

        tracing::info!(path = %self.config.catalog_path.display(), "loading dbt catalog");
        let catalog = Catalog::from_file(&self.config.catalog_path)?;

        let options = ExtractOptions {
            load_schemas: self.config.load_schemas,
            target_platform: &self.config.target_platform,
            env: &self.config.env,
            node_type_pattern: &self.config.node_type_pattern,
        };

        Ok(extract_dbt_entities(&manifest, &catalog, &options)?)
    }

    /// Start a pass over all nodes
    ///
    /// Loading and extraction happen here, so any fatal error surfaces before
    /// the first work unit. Work units are then built lazily, one per `next`.
    pub fn get_workunits(&mut self) -> Result<WorkUnits<'_>, SourceError> {
        if self.state == SourceState::Closed {
            return Err(SourceError::Closed);
        }

        self.state = SourceState::Emitting;

        let nodes = match self.load_nodes() {
            Ok(nodes) => nodes,
            Err(e) => {
                self.report.report_failure(failure_diagnostic(&e));
                return Err(e);
            }
        };

        Ok(WorkUnits {
            nodes: nodes.into_iter(),
            source: self,
        })
    }

    /// Build the work unit of one node, accounting it in the report
    fn workunit_for(&mut self, node: &DbtNode) -> MetadataWorkUnit {
        let mut snapshot = DatasetSnapshot::new(node.datahub_urn.clone());

        snapshot.aspects.push(Aspect::DatasetProperties(aspects::dataset_properties(node)));
        snapshot.aspects.push(Aspect::UpstreamLineage(aspects::upstream_lineage(&node.upstream_urns)));

        if self.config.load_schemas {
            let schema = aspects::schema_metadata(&mut self.report, node, &self.platform);
            snapshot.aspects.push(Aspect::SchemaMetadata(schema));
        }

        let workunit = MetadataWorkUnit::from_snapshot(snapshot);
        self.report.report_workunit(workunit.id.clone());

        tracing::debug!(id = %workunit.id, "emitted work unit");
        workunit
    }

    /// Report of the current run
    pub fn get_report(&self) -> &SourceReport {
        &self.report
    }

    /// Consume the source, keeping its report
    pub fn into_report(self) -> SourceReport {
        self.report
    }

    /// Close the source; closing twice is a no-op
    pub fn close(&mut self) {
        self.state = SourceState::Closed;
    }
}

fn failure_diagnostic(error: &SourceError) -> Diagnostic {
    let (code, dataset) = match error {
        SourceError::Extract(
            ExtractError::MissingUpstream { node, .. } | ExtractError::MissingDependsOn { node },
        ) => (DiagnosticCode::UpstreamMissing, node.clone()),
        SourceError::Extract(
            ExtractError::MissingCatalogEntry { node } | ExtractError::MissingColumns { node },
        ) => (DiagnosticCode::CatalogEntryMissing, node.clone()),
        _ => (DiagnosticCode::InputInvalid, String::new()),
    };

    Diagnostic::new(code, Severity::Error, dataset, error.to_string())
}

/// Lazy pass over extracted nodes
///
/// Dropping it early stops work at the next node boundary; already-yielded
/// work units stay valid.
pub struct WorkUnits<'a> {
    nodes: std::vec::IntoIter<DbtNode>,
    source: &'a mut DbtSource,
}

impl WorkUnits<'_> {
    /// Nodes not yet emitted
    pub fn remaining(&self) -> usize {
        self.nodes.len()
    }
}

impl Iterator for WorkUnits<'_> {
    type Item = MetadataWorkUnit;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.nodes.next()?;
        Some(self.source.workunit_for(&node))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.nodes.size_hint()
    }
}
