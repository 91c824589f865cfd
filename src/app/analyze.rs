//! Core command execution logic.
//!
//! `run_analyze` drives the full pipeline: read, decode, ingest, run the
//! rules, filter by severity and render. `run_parse` stops after decoding
//! and prints the raw tree.

use tracing::debug;

use super::{
    convert::{convert_dialect, convert_severity, convert_tree_format},
    helpers::{
        calculate_exit_code, create_output_options, detect_input, effective_rules_config,
        load_raw_queries, read_queries_input
    },
    types::{AnalyzeParams, AnalyzeResult}
};
use crate::{
    cli::{Dialect, TreeFormat},
    config::Config,
    error::AppResult,
    ingest::ingest_all,
    output::{OutputOptions, format_raw_queries, format_report, format_rules},
    parse::parse_sql,
    rules::RuleRunner
};

/// Executes the complete analysis pipeline.
///
/// 1. **Input**: Reads the query file (or stdin) and decodes it as SQL or
///    as a JSON/YAML parse tree
/// 2. **Ingest**: Validates every tree and resolves CTE references; a
///    malformed tree aborts here, before any rule runs
/// 3. **Rules**: Runs all enabled rules in parallel
/// 4. **Report**: Filters by minimum severity and renders the output
///
/// # Errors
///
/// Returns an error if:
/// - The query file cannot be read
/// - SQL parsing or tree decoding fails
/// - A tree is malformed
/// - The config names an unknown output format
///
/// # Example
///
/// ```no_run
/// use query_pattern_analyzer::{
///     app::{AnalyzeParams, run_analyze},
///     cli::{Dialect, InputKind, MinSeverity},
///     config::Config
/// };
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let params = AnalyzeParams {
///     query_path:       "target/compiled/customers.sql".to_string(),
///     input:            InputKind::Auto,
///     dialect:          Dialect::Snowflake,
///     format:           None,
///     min_severity:     MinSeverity::Warning,
///     window_threshold: None,
///     verbose:          false,
///     no_color:         false
/// };
///
/// let result = run_analyze(params, Config::default())?;
/// println!("{}", result.output);
/// # Ok(())
/// # }
/// ```
pub fn run_analyze(params: AnalyzeParams, config: Config) -> AppResult<AnalyzeResult> {
    let content = read_queries_input(&params.query_path)?;
    let input = detect_input(&params.query_path, params.input);
    debug!(path = %params.query_path, ?input, "reading queries");
    let raw = load_raw_queries(&content, input, params.dialect)?;
    let models = ingest_all(raw)?;

    let output_opts =
        create_output_options(params.format, &config.output, params.no_color, params.verbose)?;
    let runner = RuleRunner::with_config(effective_rules_config(
        config.rules,
        params.window_threshold
    ));
    let report = runner
        .analyze(&models)
        .at_least(convert_severity(params.min_severity));

    Ok(AnalyzeResult {
        exit_code: calculate_exit_code(&report),
        output: format_report(&report, &output_opts),
        report
    })
}

/// Parses SQL and renders the raw trees the adapter produced.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the SQL does not parse.
pub fn run_parse(path: &str, dialect: Dialect, format: TreeFormat) -> AppResult<String> {
    let content = read_queries_input(path)?;
    let queries = parse_sql(&content, convert_dialect(dialect))?;
    Ok(format_raw_queries(&queries, convert_tree_format(format)))
}

/// Renders the rules enabled under `config`.
pub fn list_rules(config: Config, opts: &OutputOptions) -> String {
    format_rules(&RuleRunner::with_config(config.rules).rules(), opts)
}
