//! Type conversion functions for CLI to internal types.
//!
//! This module translates the user-facing enums of the `cli` module into
//! the types used by the parser, the rule engine and the formatters.

use crate::{
    cli::{Dialect, Format, MinSeverity, TreeFormat},
    output::OutputFormat,
    parse::SqlDialect,
    rules::Severity
};

/// Converts a CLI dialect enum to the internal SQL dialect type.
///
/// # Example
///
/// ```
/// use query_pattern_analyzer::{app::convert_dialect, cli::Dialect, parse::SqlDialect};
///
/// let dialect = convert_dialect(Dialect::Snowflake);
/// assert_eq!(dialect, SqlDialect::Snowflake);
/// ```
pub fn convert_dialect(dialect: Dialect) -> SqlDialect {
    match dialect {
        Dialect::Generic => SqlDialect::Generic,
        Dialect::Snowflake => SqlDialect::Snowflake,
        Dialect::Postgresql => SqlDialect::PostgreSQL,
        Dialect::Mysql => SqlDialect::MySQL,
        Dialect::Sqlite => SqlDialect::SQLite,
        Dialect::Clickhouse => SqlDialect::ClickHouse,
        Dialect::Bigquery => SqlDialect::BigQuery
    }
}

/// Converts a CLI format enum to the internal output format type.
pub fn convert_format(format: Format) -> OutputFormat {
    match format {
        Format::Text => OutputFormat::Text,
        Format::Json => OutputFormat::Json,
        Format::Yaml => OutputFormat::Yaml
    }
}

/// Converts the `parse` command's tree format.
pub fn convert_tree_format(format: TreeFormat) -> OutputFormat {
    match format {
        TreeFormat::Json => OutputFormat::Json,
        TreeFormat::Yaml => OutputFormat::Yaml
    }
}

pub fn convert_severity(severity: MinSeverity) -> Severity {
    match severity {
        MinSeverity::Info => Severity::Info,
        MinSeverity::Warning => Severity::Warning,
        MinSeverity::Critical => Severity::Critical
    }
}
