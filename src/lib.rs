//! # Query Pattern Analyzer Library
//!
//! Static detection of inefficient patterns in analytical SQL.
//!
//! Parse trees come in through [`ingest`] (from JSON/YAML, or from SQL text
//! via [`parse`]), are validated into a [`model::QueryModel`], and are then
//! checked by the parallel rule engine in [`rules`]. [`report`] orders and
//! counts the findings.
//!
//! ```
//! use query_pattern_analyzer::{ingest::ingest_all, parse::{SqlDialect, parse_sql}, rules::RuleRunner};
//!
//! let sql = "SELECT a.id FROM users a CROSS JOIN users b";
//! let models = ingest_all(parse_sql(sql, SqlDialect::Generic).unwrap()).unwrap();
//! let report = RuleRunner::new().analyze(&models);
//! assert!(report.has_critical());
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod ingest;
pub mod model;
pub mod output;
pub mod parse;
pub mod report;
pub mod rules;
