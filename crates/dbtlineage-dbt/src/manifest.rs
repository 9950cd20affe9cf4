//! dbt manifest.json parsing
//!
//! Parses the manifest into typed entries. Models and sources are told apart
//! once, at parse time, by the presence of `config.materialized`.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// dbt manifest.json structure (subset of fields we care about)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Manifest {
    /// Model, seed, snapshot and test nodes
    pub nodes: BTreeMap<String, ManifestEntry>,

    /// Source definitions
    pub sources: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// Load manifest from file
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ManifestError::IoError(path.display().to_string(), e.to_string()))?;

        Self::from_str(&contents)
    }

    /// Parse manifest from JSON string
    pub fn from_str(json: &str) -> Result<Self, ManifestError> {
        serde_json::from_str(json)
            .map_err(|e| ManifestError::ParseError(e.to_string()))
    }

    /// Nodes and sources merged into one keyed map
    ///
    /// A source whose key collides with a node replaces it.
    pub fn all_entries(&self) -> BTreeMap<&str, &ManifestEntry> {
        self.nodes
            .iter()
            .chain(self.sources.iter())
            .map(|(key, entry)| (key.as_str(), entry))
            .collect()
    }

}

/// Whether an entry is a model (materialized by dbt) or a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// Declares a materialization and its dependencies
    ///
    /// `depends_on` is `None` when the entry carries no `depends_on.nodes`.
    Model {
        materialized: String,
        depends_on: Option<Vec<String>>,
    },

    /// External table; materialization comes from the catalog
    Source,
}

/// A node or source in the manifest
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawManifestEntry")]
pub struct ManifestEntry {
    /// Resource type (model, source, seed, snapshot, ...)
    pub resource_type: String,

    /// Database name
    pub database: String,

    /// Schema name
    pub schema: String,

    /// Original file path, diagnostic only
    pub original_file_path: String,

    /// Node name
    pub name: String,

    /// Physical identifier, sources only
    pub identifier: Option<String>,

    /// Model vs source
    pub kind: EntryKind,
}

impl ManifestEntry {
    /// Name used in the urn
    ///
    /// The physical identifier wins only when catalog schemas are not loaded;
    /// the catalog is keyed by logical name.
    pub fn logical_name(&self, load_schemas: bool) -> &str {
        match &self.identifier {
            Some(identifier) if !load_schemas => identifier,
            _ => &self.name,
        }
    }
}

#[derive(Deserialize)]
struct RawManifestEntry {
    resource_type: String,
    database: String,
    schema: String,
    original_file_path: String,
    name: String,
    /// Outer `None` when absent, inner `None` when explicitly null
    #[serde(default, deserialize_with = "present")]
    identifier: Option<Option<String>>,
    config: RawConfig,
    #[serde(default)]
    depends_on: Option<DependsOn>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    materialized: Option<String>,
}

/// Dependencies structure
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DependsOn {
    /// List of node unique_ids this node depends on
    #[serde(default)]
    pub nodes: Option<Vec<String>>,
}

impl TryFrom<RawManifestEntry> for ManifestEntry {
    type Error = String;

    fn try_from(raw: RawManifestEntry) -> Result<Self, Self::Error> {
        let identifier = match raw.identifier {
            Some(None) => return Err(format!("entry {} has a null identifier", raw.name)),
            Some(identifier) => identifier,
            None => None,
        };

        let kind = match raw.config.materialized {
            Some(materialized) => EntryKind::Model {
                materialized,
                depends_on: raw.depends_on.and_then(|d| d.nodes),
            },
            None => EntryKind::Source,
        };

        Ok(Self {
            resource_type: raw.resource_type,
            database: raw.database,
            schema: raw.schema,
            original_file_path: raw.original_file_path,
            name: raw.name,
            identifier,
            kind,
        })
    }
}

/// Manifest parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read manifest file {0}: {1}")]
    IoError(String, String),

    #[error("Failed to parse manifest JSON: {0}")]
    ParseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "nodes": {
            "model.shop.orders": {
                "resource_type": "model",
                "database": "db",
                "schema": "analytics",
                "original_file_path": "models/orders.sql",
                "name": "orders",
                "config": {"materialized": "table", "enabled": true},
                "depends_on": {"nodes": ["source.shop.raw.events"], "macros": []}
            }
        },
        "sources": {
            "source.shop.raw.events": {
                "resource_type": "source",
                "database": "db",
                "schema": "public",
                "original_file_path": "models/sources.yml",
                "name": "events",
                "identifier": "raw_events",
                "config": {"enabled": true}
            }
        }
    }"#;

    #[test]
    fn parses_models_and_sources() {
        let manifest = Manifest::from_str(MANIFEST).unwrap();

        let orders = &manifest.nodes["model.shop.orders"];
        assert_eq!(
            orders.kind,
            EntryKind::Model {
                materialized: "table".to_string(),
                depends_on: Some(vec!["source.shop.raw.events".to_string()]),
            }
        );

        let events = &manifest.sources["source.shop.raw.events"];
        assert_eq!(events.kind, EntryKind::Source);
    }

    #[test]
    fn logical_name_prefers_identifier_without_schemas() {
        let manifest = Manifest::from_str(MANIFEST).unwrap();
        let events = &manifest.sources["source.shop.raw.events"];

        assert_eq!(events.logical_name(false), "raw_events");
        assert_eq!(events.logical_name(true), "events");
    }

    #[test]
    fn merged_entries_cover_both_maps() {
        let manifest = Manifest::from_str(MANIFEST).unwrap();
        let all = manifest.all_entries();
        assert_eq!(all.len(), 2);
        assert!(all.contains_key("model.shop.orders"));
    }

    #[test]
    fn missing_required_field_is_parse_error() {
        let json = r#"{"nodes": {"model.a": {"resource_type": "model"}}, "sources": {}}"#;
        assert!(matches!(Manifest::from_str(json), Err(ManifestError::ParseError(_))));
    }

    fn single_model(extra: &str) -> String {
        format!(
            r#"{{
                "nodes": {{
                    "model.a": {{
                        "resource_type": "model",
                        "database": "db",
                        "schema": "s",
                        "original_file_path": "models/a.sql",
                        "name": "a"{}
                    }}
                }},
                "sources": {{}}
            }}"#,
            extra
        )
    }

    #[test]
    fn model_without_depends_on_keeps_it_absent() {
        let manifest = Manifest::from_str(&single_model(r#", "config": {"materialized": "table"}"#)).unwrap();

        assert_eq!(
            manifest.nodes["model.a"].kind,
            EntryKind::Model {
                materialized: "table".to_string(),
                depends_on: None,
            }
        );
    }

    #[test]
    fn missing_config_is_parse_error() {
        let result = Manifest::from_str(&single_model(""));
        assert!(matches!(result, Err(ManifestError::ParseError(_))));
    }

    #[test]
    fn null_identifier_is_parse_error() {
        let json = single_model(r#", "identifier": null, "config": {}"#);
        match Manifest::from_str(&json) {
            Err(ManifestError::ParseError(message)) => assert!(message.contains("null identifier")),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
