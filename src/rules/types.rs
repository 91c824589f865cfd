//! Type definitions for the rule system.
//!
//! - [`Severity`] - Finding severity levels (Info, Warning, Critical)
//! - [`RuleCategory`] - What kind of inefficiency a rule targets
//! - [`Location`] - Statement, scope and clause a finding points at
//! - [`Finding`] - One detected anti-pattern instance

use serde::Serialize;

use crate::{error::RuleEvaluationError, model::Scope};

/// Severity level of a finding.
///
/// Ordered from lowest to highest for sorting purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Worth knowing, rarely expensive on its own
    Info,
    /// Likely to waste compute at scale
    Warning,
    /// Multiplies cost with input size (exit code 1)
    Critical
}

impl Severity {
    /// Parse a configuration value. `warn` and `error` are accepted aliases.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "info" => Some(Self::Info),
            "warning" | "warn" => Some(Self::Warning),
            "critical" | "error" => Some(Self::Critical),
            _ => None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical"
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Critical => write!(f, "CRIT")
        }
    }
}

/// Category of a rule for grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    /// Reading more data than needed
    Scan,
    /// Row multiplication through joins
    Join,
    /// Filters the engine cannot prune with
    Predicate,
    /// Statement layout: CTEs, sorts, set operations, windows
    Structure,
    /// Repeated computation
    Aggregation
}

impl std::fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scan => write!(f, "Scan"),
            Self::Join => write!(f, "Join"),
            Self::Predicate => write!(f, "Predicate"),
            Self::Structure => write!(f, "Structure"),
            Self::Aggregation => write!(f, "Aggregation")
        }
    }
}

/// Clause within a scope, in SQL reading order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Clause {
    /// The scope as a whole
    Definition,
    Select,
    From,
    Join,
    Where,
    GroupBy,
    Having,
    Window,
    SetOperation,
    OrderBy
}

impl std::fmt::Display for Clause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Definition => write!(f, "definition"),
            Self::Select => write!(f, "SELECT"),
            Self::From => write!(f, "FROM"),
            Self::Join => write!(f, "JOIN"),
            Self::Where => write!(f, "WHERE"),
            Self::GroupBy => write!(f, "GROUP BY"),
            Self::Having => write!(f, "HAVING"),
            Self::Window => write!(f, "OVER"),
            Self::SetOperation => write!(f, "UNION"),
            Self::OrderBy => write!(f, "ORDER BY")
        }
    }
}

/// Where a finding points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    /// Zero-based index of the statement in the input
    pub statement: usize,
    pub scope:     Scope,
    pub clause:    Clause
}

impl Location {
    pub fn new(statement: usize, scope: Scope, clause: Clause) -> Self {
        Self {
            statement,
            scope,
            clause
        }
    }

    /// Source position: statement, CTE declaration order (final SELECT
    /// last), clause order.
    pub fn sort_key(&self) -> (usize, usize, Clause) {
        (self.statement, self.scope.position(), self.clause)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "statement #{}, {}, {}",
            self.statement + 1,
            self.scope,
            self.clause
        )
    }
}

/// Metadata about a rule for identification and configuration.
#[derive(Debug, Clone, Serialize)]
pub struct RuleInfo {
    /// Unique rule identifier (e.g., "unused-cte")
    pub id:          &'static str,
    /// Human-readable rule name
    pub name:        &'static str,
    /// Default severity level
    pub severity:    Severity,
    pub category:    RuleCategory,
    /// One-line description of what the rule detects
    pub description: &'static str
}

/// One detected anti-pattern instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    /// Identifier of the rule that produced this finding
    pub rule:            &'static str,
    pub rule_name:       &'static str,
    pub severity:        Severity,
    pub category:        RuleCategory,
    pub location:        Location,
    /// Why this is inefficient, in terms of the query
    pub rationale:       String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion:      Option<String>,
    /// Unitless relative cost heuristic
    pub cost_multiplier: f64
}

impl Finding {
    /// Finding with the rule's default severity and a neutral cost.
    pub fn new(info: &RuleInfo, location: Location, rationale: impl Into<String>) -> Self {
        Self {
            rule: info.id,
            rule_name: info.name,
            severity: info.severity,
            category: info.category,
            location,
            rationale: rationale.into(),
            suggestion: None,
            cost_multiplier: 1.0
        }
    }

    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    #[must_use]
    pub fn with_cost(mut self, cost_multiplier: f64) -> Self {
        self.cost_multiplier = cost_multiplier;
        self
    }

    /// Synthetic finding reported in place of a rule that failed.
    pub fn evaluation_failure(info: &RuleInfo, statement: usize, err: &RuleEvaluationError) -> Self {
        Self {
            rule:            info.id,
            rule_name:       info.name,
            severity:        Severity::Info,
            category:        info.category,
            location:        Location::new(statement, Scope::Final, Clause::Definition),
            rationale:       format!(
                "Rule could not complete on this statement: {}",
                err.message
            ),
            suggestion:      None,
            cost_multiplier: 1.0
        }
    }
}
