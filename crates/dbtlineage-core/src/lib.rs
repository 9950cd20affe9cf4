//! dbtlineage Core
//!
//! Domain types shared by the dbt source and its callers: output records,
//! urns, run report and configuration.
//! Never rename diagnostic codes - they are part of the report format.

pub mod diagnostic;
pub mod schema;
pub mod report;
pub mod config;
pub mod urn;

pub use diagnostic::{Diagnostic, DiagnosticCode, Severity};
pub use schema::{
    Aspect, AuditStamp, CanonicalType, DatasetLineageType, DatasetProperties, DatasetSnapshot,
    MetadataChangeEvent, MetadataWorkUnit, PlatformSchema, SchemaField, SchemaMetadata, Upstream,
    UpstreamLineage, DBT_EXECUTOR_ACTOR,
};
pub use report::{SourceReport, ReportSummary, ReportVersion};
pub use config::{SourceConfig, AllowDenyPattern, ConfigError};
pub use urn::{dataset_urn, data_platform_urn};
