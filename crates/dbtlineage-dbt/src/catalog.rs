//! dbt catalog.json parsing
//!
//! The catalog describes what `dbt docs generate` found in the warehouse:
//! relation type and the physical columns of every node and source.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// dbt catalog.json structure (subset of fields we care about)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Catalog {
    /// Catalog entries for models, seeds and snapshots
    pub nodes: BTreeMap<String, CatalogEntry>,

    /// Catalog entries for sources
    pub sources: BTreeMap<String, CatalogEntry>,
}

impl Catalog {
    /// Load catalog from file
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::IoError(path.display().to_string(), e.to_string()))?;

        Self::from_str(&contents)
    }

    /// Parse catalog from JSON string
    pub fn from_str(json: &str) -> Result<Self, CatalogError> {
        serde_json::from_str(json)
            .map_err(|e| CatalogError::ParseError(e.to_string()))
    }

    /// Nodes and sources merged into one keyed map (sources win on collision)
    pub fn all_entries(&self) -> BTreeMap<&str, &CatalogEntry> {
        self.nodes
            .iter()
            .chain(self.sources.iter())
            .map(|(key, entry)| (key.as_str(), entry))
            .collect()
    }
}

/// A catalog entry for one relation
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogEntry {
    /// Relation metadata
    pub metadata: CatalogMetadata,

    /// Columns keyed by column name; `None` when the entry has no `columns`
    #[serde(default)]
    pub columns: Option<BTreeMap<String, CatalogColumn>>,
}

impl CatalogEntry {
    /// Columns in declared index order, `None` when the entry has no `columns`
    pub fn ordered_columns(&self) -> Option<Vec<&CatalogColumn>> {
        let mut columns: Vec<&CatalogColumn> = self.columns.as_ref()?.values().collect();
        columns.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.name.cmp(&b.name)));
        Some(columns)
    }
}

/// Relation metadata reported by the warehouse
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogMetadata {
    /// Relation type (BASE TABLE, VIEW, ...)
    #[serde(rename = "type")]
    pub relation_type: String,
}

/// A physical column
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogColumn {
    pub name: String,

    /// Warehouse comment; null when absent
    #[serde(default)]
    pub comment: Option<String>,

    /// Warehouse-reported type
    #[serde(rename = "type")]
    pub data_type: String,

    /// Position in the relation
    pub index: i64,
}

/// Catalog parsing errors
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read catalog file {0}: {1}")]
    IoError(String, String),

    #[error("Failed to parse catalog JSON: {0}")]
    ParseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "metadata": {"dbt_version": "1.7.0"},
        "nodes": {},
        "sources": {
            "source.shop.raw.events": {
                "metadata": {"type": "BASE TABLE", "schema": "public", "name": "raw_events"},
                "columns": {
                    "payload": {"name": "payload", "comment": null, "type": "jsonb", "index": 2},
                    "id": {"name": "id", "comment": "primary key", "type": "integer", "index": 1}
                },
                "stats": {}
            }
        },
        "errors": null
    }"#;

    #[test]
    fn parses_catalog() {
        let catalog = Catalog::from_str(CATALOG).unwrap();
        let events = &catalog.sources["source.shop.raw.events"];

        assert_eq!(events.metadata.relation_type, "BASE TABLE");
        let columns = events.columns.as_ref().unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns["id"].comment.as_deref(), Some("primary key"));
        assert_eq!(columns["payload"].comment, None);
    }

    #[test]
    fn columns_follow_index() {
        let catalog = Catalog::from_str(CATALOG).unwrap();
        let names: Vec<&str> = catalog.sources["source.shop.raw.events"]
            .ordered_columns()
            .unwrap()
            .iter()
            .map(|c| c.name.as_str())
            .collect();

        assert_eq!(names, vec!["id", "payload"]);
    }

    #[test]
    fn entry_without_columns_has_none() {
        let json = r#"{"nodes": {"model.a": {"metadata": {"type": "VIEW"}}}, "sources": {}}"#;
        let catalog = Catalog::from_str(json).unwrap();

        assert_eq!(catalog.nodes["model.a"].columns, None);
        assert!(catalog.nodes["model.a"].ordered_columns().is_none());
    }

    #[test]
    fn invalid_json_is_parse_error() {
        assert!(matches!(Catalog::from_str("{not json"), Err(CatalogError::ParseError(_))));
    }
}
