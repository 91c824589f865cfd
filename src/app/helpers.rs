//! Helper functions for CLI operations.
//!
//! Reading input, choosing how to decode it, merging CLI flags over the
//! configuration file, and mapping a report to an exit code.

use std::{
    fs::read_to_string,
    io::{self, Read},
    path::Path
};

use super::convert::{convert_dialect, convert_format};
use crate::{
    cli::{Dialect, Format, InputKind},
    config::{OutputConfig, RulesConfig},
    error::{AppResult, config_error, file_read_error, input_decode_error},
    ingest::{RawDocument, RawQuery},
    output::{OutputFormat, OutputOptions},
    parse::parse_sql,
    report::Report
};

/// Calculates the process exit code for an analysis report.
///
/// - `0` - No critical findings
/// - `1` - At least one critical finding
///
/// # Example
///
/// ```
/// use query_pattern_analyzer::{app::calculate_exit_code, report::ReportBuilder};
///
/// let report = ReportBuilder::new(["unused-cte"]).build(vec![]);
/// assert_eq!(calculate_exit_code(&report), 0);
/// ```
pub fn calculate_exit_code(report: &Report) -> i32 {
    if report.has_critical() { 1 } else { 0 }
}

/// Reads a query file, or standard input when the path is "-".
///
/// # Errors
///
/// Returns an error if the file cannot be read or stdin fails.
pub fn read_queries_input(path: &str) -> AppResult<String> {
    if path == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| file_read_error("stdin", e))?;
        Ok(buffer)
    } else {
        read_to_string(path).map_err(|e| file_read_error(path, e))
    }
}

/// Resolves `auto` from the file extension; anything unrecognized is SQL.
///
/// # Example
///
/// ```
/// use query_pattern_analyzer::{app::detect_input, cli::InputKind};
///
/// assert_eq!(detect_input("tree.yml", InputKind::Auto), InputKind::Yaml);
/// assert_eq!(detect_input("model.sql", InputKind::Auto), InputKind::Sql);
/// assert_eq!(detect_input("-", InputKind::Json), InputKind::Json);
/// ```
pub fn detect_input(path: &str, input: InputKind) -> InputKind {
    if input != InputKind::Auto {
        return input;
    }
    let extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("json") => InputKind::Json,
        Some("yaml" | "yml") => InputKind::Yaml,
        _ => InputKind::Sql
    }
}

/// Decodes input text into raw query trees.
///
/// # Errors
///
/// SQL syntax errors, or a JSON/YAML document that does not match the raw
/// tree schema.
pub fn load_raw_queries(
    content: &str,
    input: InputKind,
    dialect: Dialect
) -> AppResult<Vec<RawQuery>> {
    match input {
        InputKind::Json => serde_json::from_str::<RawDocument>(content)
            .map(RawDocument::into_queries)
            .map_err(|e| input_decode_error("JSON", e)),
        InputKind::Yaml => serde_yaml::from_str::<RawDocument>(content)
            .map(RawDocument::into_queries)
            .map_err(|e| input_decode_error("YAML", e)),
        InputKind::Sql | InputKind::Auto => parse_sql(content, convert_dialect(dialect))
    }
}

/// Creates output options, CLI flags first, then the config file.
///
/// # Errors
///
/// Returns an error if the config names an unknown output format.
pub fn create_output_options(
    format: Option<Format>,
    config: &OutputConfig,
    no_color: bool,
    verbose: bool
) -> AppResult<OutputOptions> {
    let format = match (format, config.format.as_deref()) {
        (Some(format), _) => convert_format(format),
        (None, Some(name)) => OutputFormat::parse(name)
            .ok_or_else(|| config_error(format!("Unknown output format '{}'", name)))?,
        (None, None) => OutputFormat::Text
    };
    Ok(OutputOptions {
        format,
        colored: !no_color && config.colored.unwrap_or(true),
        verbose
    })
}

/// Applies CLI rule overrides on top of the config file.
pub fn effective_rules_config(mut config: RulesConfig, window_threshold: Option<usize>) -> RulesConfig {
    if let Some(threshold) = window_threshold {
        config.window_threshold = threshold;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportBuilder;

    #[test]
    fn test_detect_input_case_insensitive() {
        assert_eq!(detect_input("TREE.JSON", InputKind::Auto), InputKind::Json);
    }

    #[test]
    fn test_detect_input_without_extension() {
        assert_eq!(detect_input("-", InputKind::Auto), InputKind::Sql);
    }

    #[test]
    fn test_exit_code_without_findings() {
        let report = ReportBuilder::new(Vec::new()).build(vec![]);
        assert_eq!(calculate_exit_code(&report), 0);
    }

    #[test]
    fn test_cli_format_beats_config() {
        let config = OutputConfig {
            format:  Some("yaml".into()),
            colored: Some(false)
        };
        let opts = create_output_options(Some(Format::Json), &config, false, false).unwrap();
        assert_eq!(opts.format, OutputFormat::Json);
        assert!(!opts.colored);
    }

    #[test]
    fn test_unknown_config_format() {
        let config = OutputConfig {
            format:  Some("sarif".into()),
            colored: None
        };
        assert!(create_output_options(None, &config, false, false).is_err());
    }

    #[test]
    fn test_window_threshold_override() {
        let config = effective_rules_config(RulesConfig::default(), Some(7));
        assert_eq!(config.window_threshold, 7);
        let config = effective_rules_config(RulesConfig::default(), None);
        assert_eq!(config.window_threshold, 3);
    }

    #[test]
    fn test_load_single_json_query() {
        let queries = load_raw_queries(
            r#"{"version": 1, "body": {"branches": []}}"#,
            InputKind::Json,
            Dialect::Generic
        )
        .unwrap();
        assert_eq!(queries.len(), 1);
    }

    #[test]
    fn test_load_invalid_yaml() {
        assert!(load_raw_queries("version: [", InputKind::Yaml, Dialect::Generic).is_err());
    }
}
