//! Dataset and platform urn construction

/// Build the urn of a dataset platform, e.g. `urn:li:dataPlatform:postgres`
pub fn data_platform_urn(platform: &str) -> String {
    format!("urn:li:dataPlatform:{}", platform)
}

/// Resolve the stable identifier of a dataset
///
/// The `database.schema.name` triple has every `"` removed and is embedded
/// verbatim otherwise; separators or reserved characters inside a component
/// are not escaped, so distinct inputs may collide.
pub fn dataset_urn(database: &str, schema: &str, name: &str, platform: &str, env: &str) -> String {
    let fqn = format!("{}.{}.{}", database, schema, name).replace('"', "");
    format!("urn:li:dataset:({},{},{})", data_platform_urn(platform), fqn, env)
}
