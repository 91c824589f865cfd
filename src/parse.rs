//! SQL text adapter.
//!
//! Walks the `sqlparser` AST and emits the versioned raw tree consumed by
//! [`crate::ingest`]. Only statements that carry a query are kept: plain
//! `SELECT`/`WITH`, `CREATE TABLE … AS` and `INSERT … SELECT`.

mod expr;
mod query;
mod table;

pub use query::convert_query;
use rayon::prelude::*;
use sqlparser::{
    ast::Statement,
    dialect::{
        BigQueryDialect, ClickHouseDialect, Dialect, GenericDialect, MySqlDialect,
        PostgreSqlDialect, SQLiteDialect, SnowflakeDialect
    },
    parser::Parser
};
use tracing::debug;

use crate::{
    error::{AppResult, query_parse_error},
    ingest::RawQuery
};

/// SQL dialect for parsing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum SqlDialect {
    #[default]
    Generic,
    Snowflake,
    PostgreSQL,
    MySQL,
    SQLite,
    ClickHouse,
    BigQuery
}

impl SqlDialect {
    /// Convert to sqlparser dialect for parsing
    pub fn into_parser_dialect(self) -> Box<dyn Dialect> {
        match self {
            Self::Generic => Box::new(GenericDialect {}),
            Self::Snowflake => Box::new(SnowflakeDialect {}),
            Self::PostgreSQL => Box::new(PostgreSqlDialect {}),
            Self::MySQL => Box::new(MySqlDialect {}),
            Self::SQLite => Box::new(SQLiteDialect {}),
            Self::ClickHouse => Box::new(ClickHouseDialect {}),
            Self::BigQuery => Box::new(BigQueryDialect {})
        }
    }
}

/// Parse SQL text into raw query trees, one per query-bearing statement.
///
/// # Notes
///
/// - Statements are converted in parallel; output keeps source order
/// - DDL and DML without a query are skipped
pub fn parse_sql(sql: &str, dialect: SqlDialect) -> AppResult<Vec<RawQuery>> {
    let parser_dialect = dialect.into_parser_dialect();
    let statements = Parser::parse_sql(parser_dialect.as_ref(), sql)
        .map_err(|e| query_parse_error(e.to_string()))?;
    let total = statements.len();
    let queries: Vec<RawQuery> = statements
        .into_par_iter()
        .filter_map(|stmt| convert_statement(&stmt))
        .collect();
    debug!(statements = total, queries = queries.len(), ?dialect, "parsed SQL");
    Ok(queries)
}

fn convert_statement(stmt: &Statement) -> Option<RawQuery> {
    match stmt {
        Statement::Query(query) => Some(convert_query(query)),
        Statement::CreateTable(create) => create.query.as_deref().map(convert_query),
        Statement::Insert(insert) => insert.source.as_deref().map(convert_query),
        _ => None
    }
}
