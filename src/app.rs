//! Application logic for the Query Pattern Analyzer CLI.
//!
//! This module contains the command handlers separated from the main
//! entry point to enable testing.

mod analyze;
mod convert;
mod helpers;
mod types;

pub use analyze::{list_rules, run_analyze, run_parse};
pub use convert::{convert_dialect, convert_format, convert_severity, convert_tree_format};
pub use helpers::{
    calculate_exit_code, create_output_options, detect_input, effective_rules_config,
    load_raw_queries, read_queries_input
};
pub use types::{AnalyzeParams, AnalyzeResult, CommandOutput};

use crate::{cli::Commands, config::Config, error::AppResult};

/// Execute one CLI command.
///
/// Nothing is printed here; the caller writes `stdout` and exits with
/// `exit_code`.
///
/// # Errors
///
/// Any error of the underlying command. Callers map it to exit code 2.
pub fn run_command(command: Commands, config: Config) -> AppResult<CommandOutput> {
    match command {
        Commands::Analyze {
            query_file,
            format,
            min_severity,
            input,
            dialect,
            window_threshold,
            no_color,
            verbose
        } => {
            let params = AnalyzeParams {
                query_path: query_file.display().to_string(),
                input,
                dialect,
                format,
                min_severity,
                window_threshold,
                verbose,
                no_color
            };
            let result = run_analyze(params, config)?;
            Ok(CommandOutput {
                exit_code: result.exit_code,
                stdout:    vec![result.output]
            })
        }
        Commands::Parse {
            query_file,
            dialect,
            format
        } => Ok(CommandOutput {
            exit_code: 0,
            stdout:    vec![run_parse(&query_file.display().to_string(), dialect, format)?]
        }),
        Commands::Rules => {
            let opts = create_output_options(None, &config.output, false, false)?;
            Ok(CommandOutput {
                exit_code: 0,
                stdout:    vec![list_rules(config, &opts)]
            })
        }
    }
}
