// SPDX-FileCopyrightText: 2025 RAprogramm
// SPDX-License-Identifier: MIT

use clap::Parser;
use query_pattern_analyzer::cli::{Cli, Commands, Dialect, Format, InputKind, MinSeverity, TreeFormat};

#[test]
fn test_analyze_defaults() {
    let cli = Cli::try_parse_from(["query-pattern-analyzer", "analyze", "model.sql"]).unwrap();
    match cli.command {
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
            assert_eq!(query_file.to_str(), Some("model.sql"));
            assert!(format.is_none());
            assert!(matches!(min_severity, MinSeverity::Info));
            assert_eq!(input, InputKind::Auto);
            assert!(matches!(dialect, Dialect::Generic));
            assert!(window_threshold.is_none());
            assert!(!no_color);
            assert!(!verbose);
        }
        _ => panic!("expected analyze")
    }
}

#[test]
fn test_analyze_all_flags() {
    let cli = Cli::try_parse_from([
        "query-pattern-analyzer",
        "analyze",
        "-",
        "--format",
        "yaml",
        "--min-severity",
        "critical",
        "--input",
        "json",
        "--dialect",
        "snowflake",
        "--window-threshold",
        "6",
        "--no-color",
        "--verbose"
    ])
    .unwrap();
    match cli.command {
        Commands::Analyze {
            format,
            min_severity,
            input,
            dialect,
            window_threshold,
            no_color,
            verbose,
            ..
        } => {
            assert!(matches!(format, Some(Format::Yaml)));
            assert!(matches!(min_severity, MinSeverity::Critical));
            assert_eq!(input, InputKind::Json);
            assert!(matches!(dialect, Dialect::Snowflake));
            assert_eq!(window_threshold, Some(6));
            assert!(no_color);
            assert!(verbose);
        }
        _ => panic!("expected analyze")
    }
}

#[test]
fn test_parse_command() {
    let cli = Cli::try_parse_from([
        "query-pattern-analyzer",
        "parse",
        "model.sql",
        "-f",
        "yaml",
        "--dialect",
        "bigquery"
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Commands::Parse {
            format: TreeFormat::Yaml,
            dialect: Dialect::Bigquery,
            ..
        }
    ));
}

#[test]
fn test_rules_command() {
    let cli = Cli::try_parse_from(["query-pattern-analyzer", "rules"]).unwrap();
    assert!(matches!(cli.command, Commands::Rules));
}

#[test]
fn test_unknown_severity_rejected() {
    assert!(
        Cli::try_parse_from([
            "query-pattern-analyzer",
            "analyze",
            "model.sql",
            "--min-severity",
            "fatal"
        ])
        .is_err()
    );
}

#[test]
fn test_missing_query_file_rejected() {
    assert!(Cli::try_parse_from(["query-pattern-analyzer", "analyze"]).is_err());
}

#[test]
fn test_parse_rejects_text_format() {
    assert!(Cli::try_parse_from(["query-pattern-analyzer", "parse", "x.sql", "-f", "text"]).is_err());
}
