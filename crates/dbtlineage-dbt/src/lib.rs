//! dbt artifact ingestion
//!
//! This crate handles:
//! - Parsing manifest.json and catalog.json (dbt-generated artifacts)
//! - Joining both into normalized nodes with resolved urns and upstreams
//! - Mapping warehouse column types to canonical types
//! - Emitting one metadata work unit per node

pub mod manifest;
pub mod catalog;
pub mod types;
pub mod extract;
pub mod aspects;
pub mod source;

pub use manifest::{Manifest, ManifestEntry, EntryKind, DependsOn, ManifestError};
pub use catalog::{Catalog, CatalogEntry, CatalogColumn, CatalogMetadata, CatalogError};
pub use types::{TypeMapper, TypeLayer};
pub use extract::{extract_dbt_entities, DbtNode, DbtColumn, NodeCategory, ExtractOptions, ExtractError};
pub use source::{DbtSource, SourceState, SourceError, WorkUnits, DBT_PLATFORM};
