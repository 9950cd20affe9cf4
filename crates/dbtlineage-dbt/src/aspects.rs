//! Builds the metadata aspects emitted for each dbt node

use std::collections::BTreeMap;

use dbtlineage_core::{
    data_platform_urn, AuditStamp, DatasetLineageType, DatasetProperties, PlatformSchema,
    SchemaField, SchemaMetadata, SourceReport, Upstream, UpstreamLineage,
};

use crate::extract::DbtNode;
use crate::types::TypeMapper;

/// Current wall-clock time as whole seconds, in epoch milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp() * 1000
}

/// Flat string properties describing a node
pub fn custom_properties(node: &DbtNode) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("dbt_node_type".to_string(), node.node_type.clone()),
        ("materialization".to_string(), node.materialization.clone()),
        ("dbt_file_path".to_string(), node.dbt_file_path.clone()),
    ])
}

/// Properties aspect: the node key as description plus custom properties
pub fn dataset_properties(node: &DbtNode) -> DatasetProperties {
    DatasetProperties {
        description: node.dbt_name.clone(),
        custom_properties: custom_properties(node),
        tags: Vec::new(),
    }
}

/// Lineage aspect stamped with the current time
pub fn upstream_lineage(upstream_urns: &[String]) -> UpstreamLineage {
    upstream_lineage_at(upstream_urns, now_millis())
}

/// Lineage aspect with one transformed edge per urn, order preserved
pub fn upstream_lineage_at(upstream_urns: &[String], time: i64) -> UpstreamLineage {
    UpstreamLineage {
        upstreams: upstream_urns
            .iter()
            .map(|urn| Upstream {
                dataset: urn.clone(),
                audit_stamp: AuditStamp::dbt_executor(time),
                lineage_type: DatasetLineageType::Transformed,
            })
            .collect(),
    }
}

/// Schema aspect stamped with the current time
pub fn schema_metadata(report: &mut SourceReport, node: &DbtNode, platform: &str) -> SchemaMetadata {
    schema_metadata_at(report, node, platform, now_millis())
}

/// Schema aspect with one field per column, order preserved
///
/// Unmapped column types are recorded in `report` against the node key.
/// `nullable` is always false; nullability is not detected.
pub fn schema_metadata_at(
    report: &mut SourceReport,
    node: &DbtNode,
    platform: &str,
    time: i64,
) -> SchemaMetadata {
    let fields = node
        .columns
        .iter()
        .map(|column| SchemaField {
            field_path: column.name.clone(),
            native_data_type: column.data_type.clone(),
            field_type: TypeMapper::map(report, &node.dbt_name, &column.data_type),
            description: column.comment.clone(),
            nullable: false,
            recursive: false,
        })
        .collect();

    let stamp = AuditStamp::dbt_executor(time);

    SchemaMetadata {
        schema_name: node.dbt_name.clone(),
        platform: data_platform_urn(platform),
        version: 0,
        hash: String::new(),
        platform_schema: PlatformSchema::default(),
        created: stamp.clone(),
        last_modified: stamp,
        fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{DbtColumn, NodeCategory};
    use dbtlineage_core::{CanonicalType, DBT_EXECUTOR_ACTOR};

    fn node(columns: Vec<DbtColumn>) -> DbtNode {
        DbtNode {
            dbt_name: "model.shop.orders".to_string(),
            database: "db".to_string(),
            schema: "analytics".to_string(),
            name: "orders".to_string(),
            dbt_file_path: "models/orders.sql".to_string(),
            node_type: "model".to_string(),
            category: NodeCategory::Model,
            materialization: "table".to_string(),
            columns,
            upstream_urns: Vec::new(),
            datahub_urn: "urn:li:dataset:(urn:li:dataPlatform:postgres,db.analytics.orders,PROD)".to_string(),
        }
    }

    fn column(name: &str, index: i64, data_type: &str) -> DbtColumn {
        DbtColumn {
            name: name.to_string(),
            comment: format!("{} column", name),
            index,
            data_type: data_type.to_string(),
        }
    }

    #[test]
    fn lineage_preserves_order() {
        let urns = vec!["urn:b".to_string(), "urn:a".to_string()];
        let lineage = upstream_lineage_at(&urns, 42_000);

        assert_eq!(lineage.upstreams.len(), 2);
        assert_eq!(lineage.upstreams[0].dataset, "urn:b");
        assert_eq!(lineage.upstreams[1].dataset, "urn:a");
        assert!(lineage.upstreams.iter().all(|u| {
            u.audit_stamp.time == 42_000
                && u.audit_stamp.actor == DBT_EXECUTOR_ACTOR
                && u.lineage_type == DatasetLineageType::Transformed
        }));
    }

    #[test]
    fn empty_lineage_is_present() {
        let lineage = upstream_lineage(&[]);
        assert!(lineage.upstreams.is_empty());
    }

    #[test]
    fn schema_maps_columns_in_order() {
        let mut report = SourceReport::new();
        let node = node(vec![column("id", 1, "integer"), column("code", 2, "varchar(8)")]);
        let schema = schema_metadata_at(&mut report, &node, "dbt", 1_000);

        assert_eq!(schema.field_paths(), vec!["id", "code"]);
        assert_eq!(schema.fields[0].field_type, CanonicalType::Number);
        assert_eq!(schema.fields[1].field_type, CanonicalType::String);
        assert_eq!(schema.fields[1].native_data_type, "varchar(8)");
        assert_eq!(schema.fields[0].description, "id column");
        assert!(schema.fields.iter().all(|f| !f.nullable && !f.recursive));
        assert_eq!(schema.platform, "urn:li:dataPlatform:dbt");
        assert_eq!(schema.schema_name, "model.shop.orders");
        assert_eq!(schema.created, schema.last_modified);
        assert_eq!(report.summary.warnings, 0);
    }

    #[test]
    fn schema_reports_unknown_types() {
        let mut report = SourceReport::new();
        let node = node(vec![column("shape", 1, "totally_unknown_type")]);
        let schema = schema_metadata(&mut report, &node, "dbt");

        assert_eq!(schema.fields[0].field_type, CanonicalType::Null);
        assert_eq!(report.warnings_for("model.shop.orders").count(), 1);
    }

    #[test]
    fn properties_of_node() {
        let props = dataset_properties(&node(Vec::new()));

        assert_eq!(props.description, "model.shop.orders");
        assert_eq!(props.custom_properties["dbt_node_type"], "model");
        assert_eq!(props.custom_properties["materialization"], "table");
        assert_eq!(props.custom_properties["dbt_file_path"], "models/orders.sql");
        assert!(props.tags.is_empty());
    }
}
