//! Joins manifest entries with catalog entries into normalized dbt nodes
//!
//! Every surviving manifest entry becomes one [`DbtNode`] carrying its urn,
//! its columns (when catalog schemas are loaded) and the urns of its
//! upstream dependencies. A broken join is an error, never skipped.

use std::collections::BTreeMap;

use dbtlineage_core::{dataset_urn, AllowDenyPattern};

use crate::catalog::{Catalog, CatalogEntry};
use crate::manifest::{EntryKind, Manifest, ManifestEntry};

/// Materialization used for nodes that exist only inside other queries
pub const EPHEMERAL: &str = "ephemeral";

/// Model vs source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    Model,
    Source,
}

/// A physical column of a dbt node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbtColumn {
    pub name: String,

    /// Warehouse comment, empty when absent
    pub comment: String,

    /// Position in the relation
    pub index: i64,

    /// Warehouse-reported type
    pub data_type: String,
}

/// One dbt model or source, ready for emission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbtNode {
    /// Manifest key (e.g. "model.shop.orders")
    pub dbt_name: String,

    pub database: String,
    pub schema: String,

    /// Name used in the urn
    pub name: String,

    /// Original file path, diagnostic only
    pub dbt_file_path: String,

    /// Raw dbt resource type (model, source, seed, ...)
    pub node_type: String,

    pub category: NodeCategory,

    /// table, view, ephemeral, or the catalog's relation type for sources
    pub materialization: String,

    /// Columns in catalog index order
    pub columns: Vec<DbtColumn>,

    /// Urns of the datasets this node is derived from
    pub upstream_urns: Vec<String>,

    /// Resolved dataset urn
    pub datahub_urn: String,
}

/// Options shared by every node of one extraction
#[derive(Debug, Clone)]
pub struct ExtractOptions<'a> {
    /// Whether columns are loaded from the catalog
    pub load_schemas: bool,

    /// Platform tag embedded in urns
    pub target_platform: &'a str,

    /// Environment tag embedded in urns
    pub env: &'a str,

    /// Filter over resource types
    pub node_type_pattern: &'a AllowDenyPattern,
}

/// Join failures; the manifest and catalog are expected to be consistent
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("node {node} depends on {upstream}, which is not in the manifest")]
    MissingUpstream { node: String, upstream: String },

    #[error("node {node} has no depends_on.nodes in the manifest")]
    MissingDependsOn { node: String },

    #[error("node {node} has no entry in the catalog")]
    MissingCatalogEntry { node: String },

    #[error("catalog entry of node {node} has no columns")]
    MissingColumns { node: String },
}

/// Extract every allowed entry of a manifest, joined with the catalog
pub fn extract_dbt_entities(
    manifest: &Manifest,
    catalog: &Catalog,
    options: &ExtractOptions<'_>,
) -> Result<Vec<DbtNode>, ExtractError> {
    let entries = manifest.all_entries();
    let catalog_entries = catalog.all_entries();

    let mut nodes = Vec::with_capacity(entries.len());

    for (key, entry) in &entries {
        if !options.node_type_pattern.allowed(&entry.resource_type) {
            tracing::debug!(node = key, resource_type = %entry.resource_type, "skipping filtered node");
            continue;
        }

        nodes.push(extract_node(key, entry, &entries, &catalog_entries, options)?);
    }

    tracing::info!(extracted = nodes.len(), total = entries.len(), "extracted dbt nodes");

    Ok(nodes)
}

fn extract_node(
    key: &str,
    entry: &ManifestEntry,
    entries: &BTreeMap<&str, &ManifestEntry>,
    catalog: &BTreeMap<&str, &CatalogEntry>,
    options: &ExtractOptions<'_>,
) -> Result<DbtNode, ExtractError> {
    let lookup_catalog = || {
        catalog
            .get(key)
            .copied()
            .ok_or_else(|| ExtractError::MissingCatalogEntry { node: key.to_string() })
    };

    let (category, materialization, upstream_urns) = match &entry.kind {
        EntryKind::Model { materialized, depends_on } => (
            NodeCategory::Model,
            materialized.clone(),
            resolve_upstreams(
                key,
                depends_on
                    .as_deref()
                    .ok_or_else(|| ExtractError::MissingDependsOn { node: key.to_string() })?,
                entries,
                options,
            )?,
        ),
        EntryKind::Source => (
            NodeCategory::Source,
            lookup_catalog()?.metadata.relation_type.clone(),
            Vec::new(),
        ),
    };

    let columns = if materialization != EPHEMERAL && options.load_schemas {
        tracing::debug!(node = key, "loading schema info");
        columns_of(key, lookup_catalog()?)?
    } else {
        Vec::new()
    };

    let name = entry.logical_name(options.load_schemas).to_string();
    let datahub_urn = dataset_urn(
        &entry.database,
        &entry.schema,
        &name,
        options.target_platform,
        options.env,
    );

    Ok(DbtNode {
        dbt_name: key.to_string(),
        database: entry.database.clone(),
        schema: entry.schema.clone(),
        name,
        dbt_file_path: entry.original_file_path.clone(),
        node_type: entry.resource_type.clone(),
        category,
        materialization,
        columns,
        upstream_urns,
        datahub_urn,
    })
}

/// Resolve dependency keys to urns, in declaration order
fn resolve_upstreams(
    node: &str,
    depends_on: &[String],
    entries: &BTreeMap<&str, &ManifestEntry>,
    options: &ExtractOptions<'_>,
) -> Result<Vec<String>, ExtractError> {
    depends_on
        .iter()
        .map(|upstream| {
            let entry = entries.get(upstream.as_str()).ok_or_else(|| ExtractError::MissingUpstream {
                node: node.to_string(),
                upstream: upstream.clone(),
            })?;

            Ok(dataset_urn(
                &entry.database,
                &entry.schema,
                entry.logical_name(options.load_schemas),
                options.target_platform,
                options.env,
            ))
        })
        .collect()
}

fn columns_of(node: &str, entry: &CatalogEntry) -> Result<Vec<DbtColumn>, ExtractError> {
    let columns = entry
        .ordered_columns()
        .ok_or_else(|| ExtractError::MissingColumns { node: node.to_string() })?;

    Ok(columns
        .into_iter()
        .map(|column| DbtColumn {
            name: column.name.clone(),
            comment: column.comment.clone().unwrap_or_default(),
            index: column.index,
            data_type: column.data_type.clone(),
        })
        .collect())
}
