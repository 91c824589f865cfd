use std::fmt;

pub use masterror::{AppError, AppResult};

/// Create file read error
pub fn file_read_error(path: &str, source: std::io::Error) -> AppError {
    AppError::internal(format!("Failed to read file '{}': {}", path, source))
}

/// Create query parse error with optional position info
pub fn query_parse_error(message: impl Into<String>) -> AppError {
    let msg = message.into();
    AppError::bad_request(format_sql_error("Query parse error", &msg))
}

/// Create error for a parse tree document that cannot be decoded
pub fn input_decode_error(format: &str, message: impl fmt::Display) -> AppError {
    AppError::bad_request(format!("Invalid {} parse tree: {}", format, message))
}

/// Create config error
pub fn config_error(message: impl Into<String>) -> AppError {
    AppError::bad_request(message.into())
}

/// Create error for a structurally invalid parse tree
pub fn malformed_query_error(err: &MalformedQueryError) -> AppError {
    AppError::bad_request(format!("Malformed query: {}", err))
}

/// Why the ingestor rejected a parse tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    /// A required structural field is absent
    MissingField,
    /// Two CTEs share a name
    DuplicateCte,
    /// A reference marked as a CTE names no prior CTE
    UnresolvedCte,
    /// A table name matches a CTE declared later in the statement
    ForwardReference,
    /// The document declares a schema version this build cannot read
    UnsupportedVersion
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField => write!(f, "missing field"),
            Self::DuplicateCte => write!(f, "duplicate CTE"),
            Self::UnresolvedCte => write!(f, "unresolved CTE reference"),
            Self::ForwardReference => write!(f, "forward CTE reference"),
            Self::UnsupportedVersion => write!(f, "unsupported schema version")
        }
    }
}

/// Parse tree rejected at ingestion; analysis aborts with no report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedQueryError {
    pub reason: MalformedReason,
    pub detail: String
}

impl MalformedQueryError {
    pub fn new(reason: MalformedReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into()
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::new(MalformedReason::MissingField, field)
    }
}

impl fmt::Display for MalformedQueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.reason, self.detail)
    }
}

impl std::error::Error for MalformedQueryError {}

impl From<MalformedQueryError> for AppError {
    fn from(err: MalformedQueryError) -> Self {
        malformed_query_error(&err)
    }
}

/// A rule met a model shape it cannot classify.
///
/// Never fatal: the runner logs it and reports a synthetic finding instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleEvaluationError {
    pub rule_id: &'static str,
    pub message: String
}

impl RuleEvaluationError {
    pub fn new(rule_id: &'static str, message: impl Into<String>) -> Self {
        Self {
            rule_id,
            message: message.into()
        }
    }
}

impl fmt::Display for RuleEvaluationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule '{}' could not complete: {}", self.rule_id, self.message)
    }
}

impl std::error::Error for RuleEvaluationError {}

/// Format SQL error with position highlighting
fn format_sql_error(prefix: &str, message: &str) -> String {
    // sqlparser reports positions as "... at Line: X, Column: Y"
    if let Some(pos) = extract_position(message) {
        format!(
            "{} at line {}, column {}:\n  {}",
            prefix, pos.line, pos.column, message
        )
    } else {
        format!("{}:\n  {}", prefix, message)
    }
}

struct SqlPosition {
    line:   usize,
    column: usize
}

fn extract_position(message: &str) -> Option<SqlPosition> {
    let line_marker = "Line: ";
    let line_start = message.find(line_marker)? + line_marker.len();
    let rest = &message[line_start..];
    let line_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    let line = rest[..line_end].parse().ok()?;

    let col_marker = "Column";
    let col_start = rest.find(col_marker)? + col_marker.len();
    let rest = rest[col_start..].trim_start_matches([':', ' ']);
    let col_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    let column = rest[..col_end].parse().ok()?;

    Some(SqlPosition {
        line,
        column
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_position_with_colon() {
        let pos = extract_position("Expected: end of statement, found: x at Line: 3, Column: 14")
            .unwrap();
        assert_eq!(pos.line, 3);
        assert_eq!(pos.column, 14);
    }

    #[test]
    fn test_extract_position_without_colon() {
        let pos = extract_position("Error at Line: 999, Column 12345").unwrap();
        assert_eq!(pos.line, 999);
        assert_eq!(pos.column, 12345);
    }

    #[test]
    fn test_extract_position_absent() {
        assert!(extract_position("Unexpected token").is_none());
    }

    #[test]
    fn test_format_sql_error_includes_position() {
        let msg = format_sql_error("Query parse error", "bad at Line: 2, Column: 5");
        assert!(msg.starts_with("Query parse error at line 2, column 5"));
    }
}
