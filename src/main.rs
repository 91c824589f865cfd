//! # Query Pattern Analyzer
//!
//! Static detection of inefficient patterns in analytical SQL.
//!
//! `query-pattern-analyzer` reads compiled SQL models (or a JSON/YAML parse
//! tree from any external parser), resolves their CTE structure, and runs a
//! set of anti-pattern rules over every CTE and the final SELECT. It only
//! detects; it never rewrites a query.
//!
//! # Architecture
//!
//! 1. **Parse** - SQL text is parsed with `sqlparser` into the versioned raw
//!    tree. JSON and YAML trees skip this step.
//! 2. **Ingest** - Trees are validated and CTE references resolved. A
//!    malformed tree aborts the run before any rule executes.
//! 3. **Rules** - 11 built-in rules run in parallel using [`rayon`].
//! 4. **Report** - Findings are ordered by severity, then source position,
//!    and rendered as text, JSON or YAML.
//!
//! # Quick Start
//!
//! ```bash
//! # Analyze a compiled model
//! query-pattern-analyzer analyze target/compiled/customers.sql --dialect snowflake
//!
//! # Only warnings and above, as JSON
//! query-pattern-analyzer analyze model.sql --min-severity warning -f json
//!
//! # Analyze a parse tree produced elsewhere
//! query-pattern-analyzer analyze tree.json
//!
//! # See the tree the SQL adapter builds
//! query-pattern-analyzer parse model.sql -f yaml
//!
//! # List rules
//! query-pattern-analyzer rules
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded from (in order of precedence):
//!
//! 1. Command-line arguments
//! 2. `.query-analyzer.toml` in current directory
//! 3. `~/.config/query-analyzer/config.toml`
//!
//! ```toml
//! [rules]
//! disabled = ["unused-cte"]
//! window_threshold = 4
//!
//! [rules.severity]
//! self-join = "critical"
//!
//! [output]
//! format = "text"
//! colored = true
//! ```
//!
//! # Exit Codes
//!
//! - `0` - No critical findings
//! - `1` - At least one critical finding
//! - `2` - Error (unreadable input, parse failure, malformed tree, bad config)
//!
//! # Logging
//!
//! Diagnostics go to stderr through `tracing`. Set `RUST_LOG=debug` to see
//! parse, ingest and rule execution counts.

use std::process;

use clap::Parser;
use query_pattern_analyzer::{app::run_command, cli::Cli, config::Config, error::AppResult};
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();
    match run() {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run() -> AppResult<i32> {
    let cli = Cli::parse();
    let config = Config::load()?;
    let output = run_command(cli.command, config)?;
    for line in output.stdout {
        println!("{}", line);
    }
    Ok(output.exit_code)
}
