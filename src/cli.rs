use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Query Pattern Analyzer - Detect anti-patterns in analytical SQL
#[derive(Parser, Debug)]
#[command(name = "query-pattern-analyzer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze queries for anti-patterns
    Analyze {
        /// Query file: SQL or a JSON/YAML parse tree (use - for stdin)
        query_file: PathBuf,

        /// Output format (overrides config)
        #[arg(short = 'f', long, value_enum)]
        format: Option<Format>,

        /// Hide findings below this severity
        #[arg(long, value_enum, default_value = "info")]
        min_severity: MinSeverity,

        /// How to read the query file
        #[arg(short, long, value_enum, default_value = "auto")]
        input: InputKind,

        /// SQL dialect for parsing
        #[arg(long, value_enum, default_value = "generic")]
        dialect: Dialect,

        /// Distinct window specifications tolerated per scope (overrides config)
        #[arg(long)]
        window_threshold: Option<usize>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// List rules without findings and show cost multipliers
        #[arg(short, long)]
        verbose: bool
    },

    /// Print the parse tree the SQL adapter produces
    Parse {
        /// SQL file (use - for stdin)
        query_file: PathBuf,

        /// SQL dialect for parsing
        #[arg(long, value_enum, default_value = "generic")]
        dialect: Dialect,

        /// Tree format
        #[arg(short = 'f', long, value_enum, default_value = "json")]
        format: TreeFormat
    },

    /// List built-in rules
    Rules
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Dialect {
    Generic,
    Snowflake,
    Postgresql,
    Mysql,
    Sqlite,
    Clickhouse,
    Bigquery
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Format {
    Text,
    Json,
    Yaml
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TreeFormat {
    Json,
    Yaml
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputKind {
    /// Pick from the file extension, SQL otherwise
    Auto,
    Sql,
    Json,
    Yaml
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MinSeverity {
    Info,
    Warning,
    Critical
}
