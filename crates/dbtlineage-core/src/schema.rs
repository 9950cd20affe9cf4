//! Metadata record types and canonical type system
//!
//! These mirror the metadata-event aspects consumed by the ingestion sink.
//! Field names serialize in camelCase to match the sink's wire format.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Synthetic actor stamped on every lineage and schema audit entry
pub const DBT_EXECUTOR_ACTOR: &str = "urn:li:corpuser:dbt_executor";

/// Canonical column type, independent of the source database dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalType {
    /// Boolean type
    #[serde(rename = "BooleanType")]
    Boolean,

    /// Raw bytes / binary
    #[serde(rename = "BytesType")]
    Bytes,

    /// Any numeric type (integer, float, decimal)
    #[serde(rename = "NumberType")]
    Number,

    /// String/text type
    #[serde(rename = "StringType")]
    String,

    /// Date or timestamp
    #[serde(rename = "DateType")]
    Date,

    /// Time of day or timestamp
    #[serde(rename = "TimeType")]
    Time,

    /// Array type
    #[serde(rename = "ArrayType")]
    Array,

    /// Semi-structured record (variant/object)
    #[serde(rename = "RecordType")]
    Record,

    /// Unknown type (no mapping found)
    #[serde(rename = "NullType")]
    Null,
}

impl CanonicalType {
    /// Stable tag used in the sink's schema representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "BooleanType",
            Self::Bytes => "BytesType",
            Self::Number => "NumberType",
            Self::String => "StringType",
            Self::Date => "DateType",
            Self::Time => "TimeType",
            Self::Array => "ArrayType",
            Self::Record => "RecordType",
            Self::Null => "NullType",
        }
    }
}

impl std::fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Actor + time pair recorded on lineage and schema aspects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStamp {
    /// Epoch milliseconds
    pub time: i64,

    /// Actor urn
    pub actor: String,
}

impl AuditStamp {
    /// Stamp attributed to the dbt executor
    pub fn dbt_executor(time: i64) -> Self {
        Self {
            time,
            actor: DBT_EXECUTOR_ACTOR.to_string(),
        }
    }
}

/// Kind of lineage relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatasetLineageType {
    /// Dataset derived by a transformation
    Transformed,
}

/// One upstream edge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upstream {
    /// Upstream dataset urn
    pub dataset: String,

    /// When and by whom the edge was recorded
    pub audit_stamp: AuditStamp,

    /// Relationship type
    #[serde(rename = "type")]
    pub lineage_type: DatasetLineageType,
}

/// Upstream lineage aspect, always present even when empty
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamLineage {
    /// Upstream edges in declaration order
    pub upstreams: Vec<Upstream>,
}

/// A single field of a schema aspect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaField {
    /// Column name
    pub field_path: String,

    /// Type as reported by the database
    pub native_data_type: String,

    /// Canonical type
    #[serde(rename = "type")]
    pub field_type: CanonicalType,

    /// Column comment
    pub description: String,

    /// Always false, nullability is not detected
    pub nullable: bool,

    /// Always false
    pub recursive: bool,
}

/// Physical schema representation placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlatformSchema {
    /// DDL text; dbt sources always emit an empty one
    #[serde(rename = "MySqlDDL")]
    MySqlDdl {
        #[serde(rename = "tableSchema")]
        table_schema: String,
    },
}

impl Default for PlatformSchema {
    fn default() -> Self {
        Self::MySqlDdl {
            table_schema: String::new(),
        }
    }
}

/// Schema aspect for one dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaMetadata {
    /// Schema name (dbt node key)
    pub schema_name: String,

    /// Platform urn
    pub platform: String,

    /// Always 0
    pub version: i64,

    /// Always empty
    pub hash: String,

    /// Physical schema placeholder
    pub platform_schema: PlatformSchema,

    /// Creation stamp
    pub created: AuditStamp,

    /// Last modification stamp, equal to `created`
    pub last_modified: AuditStamp,

    /// Ordered fields
    pub fields: Vec<SchemaField>,
}

impl SchemaMetadata {
    /// Find a field by path
    pub fn find_field(&self, path: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.field_path == path)
    }

    /// Field paths in order
    pub fn field_paths(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.field_path.as_str()).collect()
    }
}

/// Dataset properties aspect
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetProperties {
    /// Free-form description
    pub description: String,

    /// Flat string properties
    pub custom_properties: BTreeMap<String, String>,

    /// Tags
    pub tags: Vec<String>,
}

/// One aspect of a dataset snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aspect {
    DatasetProperties(DatasetProperties),
    UpstreamLineage(UpstreamLineage),
    SchemaMetadata(SchemaMetadata),
}

/// Dataset identity plus its aspects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSnapshot {
    /// Dataset urn
    pub urn: String,

    /// Aspects in emission order
    pub aspects: Vec<Aspect>,
}

impl DatasetSnapshot {
    /// Snapshot with no aspects yet
    pub fn new(urn: impl Into<String>) -> Self {
        Self {
            urn: urn.into(),
            aspects: Vec::new(),
        }
    }

    /// Properties aspect, if attached
    pub fn properties(&self) -> Option<&DatasetProperties> {
        self.aspects.iter().find_map(|a| match a {
            Aspect::DatasetProperties(p) => Some(p),
            _ => None,
        })
    }

    /// Lineage aspect, if attached
    pub fn upstream_lineage(&self) -> Option<&UpstreamLineage> {
        self.aspects.iter().find_map(|a| match a {
            Aspect::UpstreamLineage(l) => Some(l),
            _ => None,
        })
    }

    /// Schema aspect, if attached
    pub fn schema_metadata(&self) -> Option<&SchemaMetadata> {
        self.aspects.iter().find_map(|a| match a {
            Aspect::SchemaMetadata(s) => Some(s),
            _ => None,
        })
    }
}

/// Metadata change event proposing one snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataChangeEvent {
    pub proposed_snapshot: DatasetSnapshot,
}

/// Composite output record handed to the sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataWorkUnit {
    /// Unique id, the dataset urn
    pub id: String,

    /// Wrapped event
    pub mce: MetadataChangeEvent,
}

impl MetadataWorkUnit {
    /// Wrap a snapshot, keyed by its urn
    pub fn from_snapshot(snapshot: DatasetSnapshot) -> Self {
        Self {
            id: snapshot.urn.clone(),
            mce: MetadataChangeEvent {
                proposed_snapshot: snapshot,
            },
        }
    }

    /// The wrapped snapshot
    pub fn snapshot(&self) -> &DatasetSnapshot {
        &self.mce.proposed_snapshot
    }
}
