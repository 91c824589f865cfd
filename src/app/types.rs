//! Application types for CLI commands.
//!
//! This module defines the data structures passed between the CLI and the
//! analysis pipeline: command parameters, analysis results, and the output
//! of a finished command.

use crate::{
    cli::{Dialect, Format, InputKind, MinSeverity},
    report::Report
};

/// Parameters for the analyze command.
///
/// # Example
///
/// ```
/// use query_pattern_analyzer::{
///     app::AnalyzeParams,
///     cli::{Dialect, InputKind, MinSeverity}
/// };
///
/// let params = AnalyzeParams {
///     query_path:       "models/customers.sql".to_string(),
///     input:            InputKind::Auto,
///     dialect:          Dialect::Snowflake,
///     format:           None,
///     min_severity:     MinSeverity::Info,
///     window_threshold: None,
///     verbose:          false,
///     no_color:         true
/// };
/// ```
#[derive(Debug, Clone)]
pub struct AnalyzeParams {
    /// Path to the query file or "-" for stdin input.
    pub query_path:       String,
    /// How to read the query file.
    pub input:            InputKind,
    /// SQL dialect for parsing.
    pub dialect:          Dialect,
    /// Output format; falls back to config, then text.
    pub format:           Option<Format>,
    /// Findings below this severity are dropped from the output.
    pub min_severity:     MinSeverity,
    /// Overrides `rules.window_threshold` from config.
    pub window_threshold: Option<usize>,
    /// List zero-count rules and show cost multipliers.
    pub verbose:          bool,
    /// Disable colored terminal output.
    pub no_color:         bool
}

/// Result of one analysis run.
#[derive(Debug, Clone)]
pub struct AnalyzeResult {
    /// 0 without critical findings, 1 otherwise.
    pub exit_code: i32,
    /// Rendered report.
    pub output:    String,
    /// Report after the severity filter.
    pub report:    Report
}

/// Output from CLI command execution.
///
/// Represents the final output ready for display, including the exit
/// code and all lines to be printed to stdout.
///
/// # Example
///
/// ```
/// use query_pattern_analyzer::app::CommandOutput;
///
/// let output = CommandOutput {
///     exit_code: 0,
///     stdout:    vec!["No anti-patterns found.".to_string()]
/// };
/// ```
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code for the process (0 = clean, 1 = critical findings).
    pub exit_code: i32,
    /// Lines to print to stdout.
    pub stdout:    Vec<String>
}
