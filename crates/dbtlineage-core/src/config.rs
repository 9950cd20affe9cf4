//! Source configuration schema (dbtlineage.toml)

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Allow/deny filter over plain strings (dbt resource types)
///
/// A value is allowed when no deny pattern matches it and at least one allow
/// pattern does. Patterns are regular expressions anchored at the start of
/// the value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "PatternSpec", into = "PatternSpec")]
pub struct AllowDenyPattern {
    /// `None` allows every value not denied
    allow: Option<Vec<Regex>>,
    deny: Vec<Regex>,
}

/// Serialized form of [`AllowDenyPattern`]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PatternSpec {
    #[serde(default = "allow_everything")]
    allow: Vec<String>,

    #[serde(default)]
    deny: Vec<String>,
}

const ALLOW_ANY: &str = ".*";

fn allow_everything() -> Vec<String> {
    vec![ALLOW_ANY.to_string()]
}

impl AllowDenyPattern {
    /// Build a pattern from allow and deny expressions
    pub fn new<A, D>(allow: A, deny: D) -> Result<Self, ConfigError>
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        Ok(Self {
            allow: Some(compile_all(allow)?),
            deny: compile_all(deny)?,
        })
    }

    /// Pattern that allows every value
    pub fn allow_all() -> Self {
        Self {
            allow: None,
            deny: Vec::new(),
        }
    }

    /// Check whether a value passes the filter
    pub fn allowed(&self, value: &str) -> bool {
        if self.deny.iter().any(|re| re.is_match(value)) {
            return false;
        }

        match &self.allow {
            Some(allow) => allow.iter().any(|re| re.is_match(value)),
            None => true,
        }
    }

    /// Allow expressions as written
    pub fn allow_patterns(&self) -> Vec<&str> {
        match &self.allow {
            Some(allow) => allow.iter().map(strip_anchor).collect(),
            None => vec![ALLOW_ANY],
        }
    }

    /// Deny expressions as written
    pub fn deny_patterns(&self) -> Vec<&str> {
        self.deny.iter().map(strip_anchor).collect()
    }
}

impl Default for AllowDenyPattern {
    fn default() -> Self {
        Self::allow_all()
    }
}

impl PartialEq for AllowDenyPattern {
    fn eq(&self, other: &Self) -> bool {
        self.allow_patterns() == other.allow_patterns()
            && self.deny_patterns() == other.deny_patterns()
    }
}

impl TryFrom<PatternSpec> for AllowDenyPattern {
    type Error = ConfigError;

    fn try_from(spec: PatternSpec) -> Result<Self, Self::Error> {
        Self::new(spec.allow, spec.deny)
    }
}

impl From<AllowDenyPattern> for PatternSpec {
    fn from(pattern: AllowDenyPattern) -> Self {
        Self {
            allow: pattern.allow_patterns().into_iter().map(String::from).collect(),
            deny: pattern.deny_patterns().into_iter().map(String::from).collect(),
        }
    }
}

const ANCHOR_PREFIX: &str = "^(?:";
const ANCHOR_SUFFIX: &str = ")";

fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("{}{}{}", ANCHOR_PREFIX, pattern, ANCHOR_SUFFIX))
}

fn strip_anchor(re: &Regex) -> &str {
    let src = re.as_str();
    src.strip_prefix(ANCHOR_PREFIX)
        .and_then(|s| s.strip_suffix(ANCHOR_SUFFIX))
        .unwrap_or(src)
}

fn compile_all<I>(patterns: I) -> Result<Vec<Regex>, ConfigError>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    patterns
        .into_iter()
        .map(|p| {
            let p = p.as_ref();
            anchored(p).map_err(|e| ConfigError::Invalid(format!("bad pattern '{}': {}", p, e)))
        })
        .collect()
}

fn default_env() -> String {
    "PROD".to_string()
}

/// Configuration of one dbt source run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path to dbt's manifest.json
    pub manifest_path: PathBuf,

    /// Path to dbt's catalog.json
    pub catalog_path: PathBuf,

    /// Environment tag embedded in every urn
    #[serde(default = "default_env")]
    pub env: String,

    /// Platform the dbt project materializes into (postgres, snowflake, ...)
    pub target_platform: String,

    /// Whether column schemas are loaded from the catalog
    pub load_schemas: bool,

    /// Filter over dbt resource types
    #[serde(default)]
    pub node_type_pattern: AllowDenyPattern,
}

impl SourceConfig {
    /// Config with defaults for the optional fields
    pub fn new(
        manifest_path: impl Into<PathBuf>,
        catalog_path: impl Into<PathBuf>,
        target_platform: impl Into<String>,
        load_schemas: bool,
    ) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            catalog_path: catalog_path.into(),
            env: default_env(),
            target_platform: target_platform.into(),
            load_schemas,
            node_type_pattern: AllowDenyPattern::allow_all(),
        }
    }

    /// Set the environment tag
    pub fn with_env(mut self, env: impl Into<String>) -> Self {
        self.env = env.into();
        self
    }

    /// Set the resource type filter
    pub fn with_node_type_pattern(mut self, pattern: AllowDenyPattern) -> Self {
        self.node_type_pattern = pattern;
        self
    }

    /// Load config from TOML file
    ///
    /// Relative artifact paths are resolved against the config file's directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut config = Self::from_toml(&contents)?;

        if let Some(parent) = path.parent() {
            config.manifest_path = parent.join(&config.manifest_path);
            config.catalog_path = parent.join(&config.catalog_path);
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would produce malformed urns
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_platform.trim().is_empty() {
            return Err(ConfigError::Invalid("target_platform must not be empty".to_string()));
        }

        if self.env.trim().is_empty() {
            return Err(ConfigError::Invalid("env must not be empty".to_string()));
        }

        Ok(())
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        manifest_path = "target/manifest.json"
        catalog_path = "target/catalog.json"
        target_platform = "postgres"
        load_schemas = true
    "#;

    #[test]
    fn defaults_applied() {
        let config = SourceConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.env, "PROD");
        assert!(config.load_schemas);
        assert!(config.node_type_pattern.allowed("model"));
        assert!(config.node_type_pattern.allowed("source"));
    }

    #[test]
    fn missing_required_field() {
        let err = SourceConfig::from_toml(r#"manifest_path = "m.json""#).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn empty_platform_rejected() {
        let toml = MINIMAL.replace("\"postgres\"", "\"\"");
        let err = SourceConfig::from_toml(&toml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn pattern_from_toml() {
        let toml = format!("{}\n[node_type_pattern]\ndeny = [\"seed\", \"test\"]\n", MINIMAL);
        let config = SourceConfig::from_toml(&toml).unwrap();

        assert!(config.node_type_pattern.allowed("model"));
        assert!(!config.node_type_pattern.allowed("seed"));
        assert!(!config.node_type_pattern.allowed("test"));
    }

    #[test]
    fn invalid_pattern_rejected() {
        let toml = format!("{}\n[node_type_pattern]\nallow = [\"(unclosed\"]\n", MINIMAL);
        assert!(SourceConfig::from_toml(&toml).is_err());
    }

    #[test]
    fn deny_wins_over_allow() {
        let pattern = AllowDenyPattern::new(["model", "source"], ["source"]).unwrap();
        assert!(pattern.allowed("model"));
        assert!(!pattern.allowed("source"));
        assert!(!pattern.allowed("snapshot"));
    }

    #[test]
    fn patterns_anchor_at_start() {
        let pattern = AllowDenyPattern::new(["model"], Vec::<String>::new()).unwrap();
        assert!(pattern.allowed("model"));
        assert!(!pattern.allowed("seed_model"));
    }

    #[test]
    fn allow_all_matches_everything() {
        let pattern = AllowDenyPattern::allow_all();
        assert!(pattern.allowed("model"));
        assert!(pattern.allowed(""));
        assert_eq!(pattern.allow_patterns(), vec![".*"]);
        assert_eq!(pattern, AllowDenyPattern::new([".*"], Vec::<String>::new()).unwrap());
    }

    #[test]
    fn config_toml_roundtrip() {
        let config = SourceConfig::new("m.json", "c.json", "snowflake", false)
            .with_env("DEV")
            .with_node_type_pattern(AllowDenyPattern::new(["model"], ["seed"]).unwrap());

        let toml = toml::to_string(&config).unwrap();
        let parsed = SourceConfig::from_toml(&toml).unwrap();
        assert_eq!(config, parsed);
    }
}
