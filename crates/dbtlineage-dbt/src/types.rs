//! Warehouse column type to canonical type mapping
//!
//! Exact names are looked up in layers, highest precedence first:
//!
//! 1. [`TypeLayer::Snowflake`] - Snowflake keywords (upper case)
//! 2. [`TypeLayer::Postgres`] - PostgreSQL names and aliases
//! 3. [`TypeLayer::Base`] - generic SQL names reported by dbt's SQL adapter
//!
//! A name present in several layers maps to the highest layer's type, e.g.
//! `timestamp with time zone` is a date in the base layer but a time in the
//! Postgres layer, so it maps to [`CanonicalType::Time`].
//!
//! Names with no exact match go through [`TypeMapper::resolve_modified_type`],
//! which strips length/precision modifiers and retries.

use dbtlineage_core::{CanonicalType, Diagnostic, SourceReport};

/// One vendor table of exact type names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeLayer {
    Snowflake,
    Postgres,
    Base,
}

impl TypeLayer {
    /// Layers in lookup order
    pub const PRECEDENCE: [TypeLayer; 3] = [TypeLayer::Snowflake, TypeLayer::Postgres, TypeLayer::Base];

    /// Exact lookup within this layer only
    pub fn lookup(self, column_type: &str) -> Option<CanonicalType> {
        match self {
            Self::Snowflake => snowflake_type(column_type),
            Self::Postgres => postgres_type(column_type),
            Self::Base => base_type(column_type),
        }
    }
}

fn base_type(column_type: &str) -> Option<CanonicalType> {
    use CanonicalType::*;

    let mapped = match column_type {
        "boolean" => Boolean,
        "date" => Date,
        "time" => Time,
        "numeric" | "integer" | "float8" => Number,
        "text" => String,
        "timestamp with time zone" | "timestamp without time zone" => Date,
        _ => return None,
    };
    Some(mapped)
}

fn postgres_type(column_type: &str) -> Option<CanonicalType> {
    use CanonicalType::*;

    let mapped = match column_type {
        "boolean" | "bool" => Boolean,
        "bytea" | "bit" | "bit varying" | "varbit" => Bytes,

        "smallint" | "integer" | "bigint" | "int" | "int2" | "int4" | "int8" => Number,
        "serial" | "bigserial" | "smallserial" | "oid" => Number,
        "real" | "double precision" | "float4" | "float8" | "numeric" | "decimal" | "money" => Number,

        "text" | "varchar" | "character varying" | "char" | "character" | "bpchar" | "name" => String,
        "citext" | "uuid" | "xml" => String,

        "date" => Date,
        "time" | "timetz" | "time with time zone" | "time without time zone" => Time,
        "timestamp" | "timestamptz" => Time,
        "timestamp with time zone" | "timestamp without time zone" => Time,
        "interval" => Time,

        "json" | "jsonb" => Record,
        _ => return None,
    };
    Some(mapped)
}

fn snowflake_type(column_type: &str) -> Option<CanonicalType> {
    use CanonicalType::*;

    let mapped = match column_type {
        "NUMBER" | "DECIMAL" | "NUMERIC" => Number,
        "INT" | "INTEGER" | "BIGINT" | "SMALLINT" | "TINYINT" | "BYTEINT" => Number,
        "FLOAT" | "FLOAT4" | "FLOAT8" | "DOUBLE" | "DOUBLE PRECISION" | "REAL" => Number,

        "VARCHAR" | "CHAR" | "CHARACTER" | "STRING" | "TEXT" => String,
        "BINARY" | "VARBINARY" => Bytes,
        "BOOLEAN" => Boolean,

        "DATE" | "DATETIME" => Date,
        "TIME" => Time,
        "TIMESTAMP" | "TIMESTAMP_LTZ" | "TIMESTAMP_NTZ" | "TIMESTAMP_TZ" => Time,

        "VARIANT" | "OBJECT" => Record,
        "ARRAY" => Array,
        _ => return None,
    };
    Some(mapped)
}

/// Maps warehouse-reported column types to canonical types
pub struct TypeMapper;

impl TypeMapper {
    /// Exact-name lookup across all layers, returning the winning layer
    pub fn lookup_exact(column_type: &str) -> Option<(TypeLayer, CanonicalType)> {
        TypeLayer::PRECEDENCE
            .iter()
            .find_map(|layer| layer.lookup(column_type).map(|t| (*layer, t)))
    }

    /// Resolve parameterized variants such as `varchar(255)`,
    /// `NUMBER(38,0)`, `timestamp(3) with time zone` or `integer[]`
    pub fn resolve_modified_type(column_type: &str) -> Option<CanonicalType> {
        let trimmed = column_type.trim();

        if trimmed.ends_with("[]") {
            return Some(CanonicalType::Array);
        }

        if trimmed.starts_with("character varying") {
            return Some(CanonicalType::String);
        }

        let base = strip_modifiers(trimmed);
        if base.is_empty() {
            return None;
        }

        Self::lookup_exact(&base)
            .or_else(|| Self::lookup_exact(&base.to_lowercase()))
            .map(|(_, t)| t)
    }

    /// Exact lookup, then modified-type resolution
    pub fn resolve(column_type: &str) -> Option<CanonicalType> {
        Self::lookup_exact(column_type)
            .map(|(_, t)| t)
            .or_else(|| Self::resolve_modified_type(column_type))
    }

    /// Map a column type, never failing
    ///
    /// Unknown types map to [`CanonicalType::Null`] and record exactly one
    /// warning against `dataset` in the report.
    pub fn map(report: &mut SourceReport, dataset: &str, column_type: &str) -> CanonicalType {
        match Self::resolve(column_type) {
            Some(mapped) => mapped,
            None => {
                tracing::warn!(dataset, column_type, "unable to map column type");
                report.report_warning(Diagnostic::unmapped_type(dataset, column_type));
                CanonicalType::Null
            }
        }
    }
}

/// Drop every parenthesized modifier and normalize whitespace
fn strip_modifiers(column_type: &str) -> String {
    let mut base = String::with_capacity(column_type.len());
    let mut depth = 0usize;

    for c in column_type.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => base.push(c),
            _ => {}
        }
    }

    base.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_matches() {
        assert_eq!(TypeMapper::resolve("integer"), Some(CanonicalType::Number));
        assert_eq!(TypeMapper::resolve("text"), Some(CanonicalType::String));
        assert_eq!(TypeMapper::resolve("boolean"), Some(CanonicalType::Boolean));
        assert_eq!(TypeMapper::resolve("VARIANT"), Some(CanonicalType::Record));
        assert_eq!(TypeMapper::resolve("TIMESTAMP_NTZ"), Some(CanonicalType::Time));
    }

    #[test]
    fn higher_layer_wins() {
        assert_eq!(
            TypeMapper::lookup_exact("timestamp with time zone"),
            Some((TypeLayer::Postgres, CanonicalType::Time))
        );
        assert_eq!(TypeLayer::Base.lookup("timestamp with time zone"), Some(CanonicalType::Date));
        assert_eq!(
            TypeMapper::lookup_exact("NUMBER"),
            Some((TypeLayer::Snowflake, CanonicalType::Number))
        );
    }

    #[test]
    fn modified_types() {
        assert_eq!(TypeMapper::resolve("varchar(255)"), Some(CanonicalType::String));
        assert_eq!(TypeMapper::resolve("character varying(64)"), Some(CanonicalType::String));
        assert_eq!(TypeMapper::resolve("numeric(10, 2)"), Some(CanonicalType::Number));
        assert_eq!(TypeMapper::resolve("NUMBER(38,0)"), Some(CanonicalType::Number));
        assert_eq!(
            TypeMapper::resolve("timestamp(3) with time zone"),
            Some(CanonicalType::Time)
        );
        assert_eq!(TypeMapper::resolve("integer[]"), Some(CanonicalType::Array));
        assert_eq!(TypeMapper::resolve("VARCHAR(16777216)"), Some(CanonicalType::String));
    }

    #[test]
    fn postgres_bit_and_interval() {
        assert_eq!(TypeMapper::resolve("interval"), Some(CanonicalType::Time));
        assert_eq!(TypeMapper::resolve("interval(6)"), Some(CanonicalType::Time));
        assert_eq!(TypeMapper::resolve("bit"), Some(CanonicalType::Bytes));
        assert_eq!(TypeMapper::resolve("bit(8)"), Some(CanonicalType::Bytes));
        assert_eq!(TypeMapper::resolve("bit varying(64)"), Some(CanonicalType::Bytes));
    }

    #[test]
    fn case_folded_retry() {
        assert_eq!(TypeMapper::resolve("Character(1)"), Some(CanonicalType::String));
    }

    #[test]
    fn unknown_type_has_no_resolution() {
        assert_eq!(TypeMapper::resolve("totally_unknown_type"), None);
        assert_eq!(TypeMapper::resolve("()"), None);
    }

    #[test]
    fn map_records_no_warning_for_modified_type() {
        let mut report = SourceReport::new();
        let mapped = TypeMapper::map(&mut report, "model.shop.orders", "varchar(255)");

        assert_eq!(mapped, CanonicalType::String);
        assert_eq!(report.summary.warnings, 0);
    }

    #[test]
    fn map_falls_back_to_null_with_one_warning() {
        let mut report = SourceReport::new();
        let mapped = TypeMapper::map(&mut report, "model.shop.orders", "totally_unknown_type");

        assert_eq!(mapped, CanonicalType::Null);
        assert_eq!(report.summary.warnings, 1);

        let warning = report.warnings().next().unwrap();
        assert_eq!(warning.dataset, "model.shop.orders");
        assert_eq!(warning.actual.as_deref(), Some("totally_unknown_type"));
    }

    #[test]
    fn strip_modifiers_normalizes() {
        assert_eq!(strip_modifiers("timestamp(6)  without time zone"), "timestamp without time zone");
        assert_eq!(strip_modifiers("decimal(10,(2))"), "decimal");
    }
}
