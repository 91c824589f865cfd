//! Anti-pattern rule engine.
//!
//! Each rule is a pure function from a [`QueryModel`] to findings. The
//! [`RuleRunner`] executes every enabled rule in parallel using [`rayon`],
//! across statements and across rules, and only merges the results once
//! all of them have completed.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌───────────────┐     ┌────────┐
//! │ QueryModels │────▶│  RuleRunner  │────▶│ ReportBuilder │────▶│ Report │
//! └─────────────┘     └──────────────┘     └───────────────┘     └────────┘
//!                            │
//!                     ┌──────┴──────┐
//!                     │    Rules    │
//!                     │  (parallel) │
//!                     └─────────────┘
//! ```
//!
//! # Built-in rules
//!
//! | ID | Severity | Cost |
//! |----|----------|------|
//! | `unfiltered-full-scan` | critical | 10 |
//! | `redundant-source-scan` | warning | 2 |
//! | `non-sargable-predicate` | warning | 3 |
//! | `cross-join-without-filter` | critical | 100 |
//! | `correlated-subquery` | warning | 25 |
//! | `excessive-window-functions` | info | 1 + 0.25 per window |
//! | `materialize-time-order-by` | info | 1.5 |
//! | `self-join` | warning | 2 |
//! | `unused-cte` | info | 1 |
//! | `union-all-fan-out` | warning | branch count |
//! | `redundant-aggregation` | info | 1.1 |
//!
//! # Configuration
//!
//! ```toml
//! [rules]
//! disabled = ["unused-cte"]
//! window_threshold = 5
//!
//! [rules.severity]
//! self-join = "critical"
//! ```
//!
//! # Failures
//!
//! A rule that meets a model shape it cannot classify returns a
//! [`RuleEvaluationError`]. The runner logs it and reports a synthetic
//! `info` finding under that rule's id; the other rules are unaffected.
//!
//! # Implementing Custom Rules
//!
//! ```
//! use query_pattern_analyzer::{
//!     error::RuleEvaluationError,
//!     model::QueryModel,
//!     rules::{Finding, Rule, RuleCategory, RuleInfo, Severity}
//! };
//!
//! pub struct NoCtes;
//!
//! impl Rule for NoCtes {
//!     fn info(&self) -> RuleInfo {
//!         RuleInfo {
//!             id:          "no-ctes",
//!             name:        "No CTEs",
//!             severity:    Severity::Info,
//!             category:    RuleCategory::Structure,
//!             description: "Statement defines no CTEs"
//!         }
//!     }
//!
//!     fn check(
//!         &self,
//!         model: &QueryModel,
//!         statement: usize
//!     ) -> Result<Vec<Finding>, RuleEvaluationError> {
//!         Ok(vec![])
//!     }
//! }
//! ```

mod aggregation;
mod join;
mod predicate;
mod scan;
mod structure;
mod types;
mod walk;

use std::collections::HashMap;

pub use aggregation::RedundantAggregation;
pub use join::{CrossJoinWithoutFilter, SelfJoin};
pub use predicate::{CorrelatedSubquery, NonSargablePredicate};
use rayon::prelude::*;
pub use scan::{RedundantSourceScan, UnfilteredFullScan, UnusedCte};
pub use structure::{
    DEFAULT_FAN_OUT_MIN_BRANCHES, DEFAULT_WINDOW_THRESHOLD, ExcessiveWindowFunctions,
    MaterializeTimeOrderBy, UnionAllFanOut
};
use tracing::{debug, warn};
pub use types::{Clause, Finding, Location, RuleCategory, RuleInfo, Severity};

use crate::{
    config::RulesConfig,
    error::RuleEvaluationError,
    model::QueryModel,
    report::{Report, ReportBuilder}
};

/// Trait for implementing anti-pattern rules.
///
/// Rules are stateless analyzers that examine one statement and return the
/// findings in it. They must be `Send + Sync` for parallel execution.
pub trait Rule: Send + Sync {
    /// Returns metadata about this rule.
    fn info(&self) -> RuleInfo;

    /// Analyzes a statement.
    ///
    /// # Arguments
    ///
    /// * `model` - The ingested statement
    /// * `statement` - Zero-based index of this statement in the input
    ///
    /// # Errors
    ///
    /// [`RuleEvaluationError`] when the model has a shape the rule cannot
    /// classify.
    fn check(&self, model: &QueryModel, statement: usize) -> Result<Vec<Finding>, RuleEvaluationError>;
}

/// Parallel rule execution engine.
///
/// Holds the enabled rules and their severity overrides.
///
/// # Example
///
/// ```
/// use query_pattern_analyzer::{config::RulesConfig, model::QueryModel, rules::RuleRunner};
///
/// let config = RulesConfig {
///     disabled: vec!["unused-cte".into()],
///     ..Default::default()
/// };
///
/// let runner = RuleRunner::with_config(config);
/// let report = runner.analyze(&[QueryModel::default()]);
///
/// assert!(report.findings().is_empty());
/// assert_eq!(report.summary().len(), 10);
/// ```
pub struct RuleRunner {
    rules:          Vec<Box<dyn Rule>>,
    severity_cache: HashMap<&'static str, Severity>
}

impl Default for RuleRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleRunner {
    /// Create a new runner with all default rules
    pub fn new() -> Self {
        Self::with_config(RulesConfig::default())
    }

    /// Create a new runner with configuration
    ///
    /// # Notes
    ///
    /// - Disabled ids are matched case-insensitively
    /// - Unknown severity strings are ignored
    pub fn with_config(config: RulesConfig) -> Self {
        let all_rules: Vec<Box<dyn Rule>> = vec![
            Box::new(UnfilteredFullScan),
            Box::new(RedundantSourceScan),
            Box::new(NonSargablePredicate),
            Box::new(CrossJoinWithoutFilter),
            Box::new(CorrelatedSubquery),
            Box::new(ExcessiveWindowFunctions::new(config.window_threshold)),
            Box::new(MaterializeTimeOrderBy),
            Box::new(SelfJoin),
            Box::new(UnusedCte),
            Box::new(UnionAllFanOut::new(config.fan_out_min_branches)),
            Box::new(RedundantAggregation),
        ];
        let rules: Vec<Box<dyn Rule>> = all_rules
            .into_iter()
            .filter(|r| {
                !config
                    .disabled
                    .iter()
                    .any(|d| d.eq_ignore_ascii_case(r.info().id))
            })
            .collect();
        let mut severity_cache = HashMap::new();
        for rule in &rules {
            let rule_id = rule.info().id;
            if let Some(sev_str) = config.severity.get(rule_id)
                && let Some(sev) = Severity::parse(sev_str)
            {
                severity_cache.insert(rule_id, sev);
            }
        }
        Self {
            rules,
            severity_cache
        }
    }

    /// Metadata of every enabled rule, in registration order
    pub fn rules(&self) -> Vec<RuleInfo> {
        self.rules.iter().map(|r| r.info()).collect()
    }

    /// Ids of every enabled rule, in registration order
    pub fn rule_ids(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.info().id).collect()
    }

    /// Run every rule on one statement (parallel across rules)
    pub fn check(&self, model: &QueryModel, statement: usize) -> Vec<Finding> {
        self.rules
            .par_iter()
            .flat_map(|rule| self.evaluate(rule.as_ref(), model, statement))
            .collect()
    }

    /// Run every rule on every statement (parallel execution)
    pub fn run(&self, models: &[QueryModel]) -> Vec<Finding> {
        let findings: Vec<Finding> = models
            .par_iter()
            .enumerate()
            .flat_map(|(idx, model)| self.check(model, idx))
            .collect();
        debug!(
            statements = models.len(),
            rules = self.rules.len(),
            findings = findings.len(),
            "rules executed"
        );
        findings
    }

    /// Run every rule and build the report
    pub fn analyze(&self, models: &[QueryModel]) -> Report {
        ReportBuilder::new(self.rule_ids())
            .statements(models.len())
            .build(self.run(models))
    }

    fn evaluate(&self, rule: &dyn Rule, model: &QueryModel, statement: usize) -> Vec<Finding> {
        let info = rule.info();
        match rule.check(model, statement) {
            Ok(mut findings) => {
                if let Some(&severity) = self.severity_cache.get(info.id) {
                    for finding in &mut findings {
                        finding.severity = severity;
                    }
                }
                findings
            }
            Err(err) => {
                warn!(
                    rule = err.rule_id,
                    statement,
                    error = %err.message,
                    "rule evaluation failed"
                );
                vec![Finding::evaluation_failure(&info, statement, &err)]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QueryBody, Select, TableRef};

    struct Failing;

    impl Rule for Failing {
        fn info(&self) -> RuleInfo {
            RuleInfo {
                id:          "failing",
                name:        "Failing",
                severity:    Severity::Critical,
                category:    RuleCategory::Structure,
                description: "always fails"
            }
        }

        fn check(&self, _: &QueryModel, _: usize) -> Result<Vec<Finding>, RuleEvaluationError> {
            Err(RuleEvaluationError::new("failing", "boom"))
        }
    }

    #[test]
    fn test_evaluation_failure_becomes_info_finding() {
        let runner = RuleRunner::new();
        let findings = runner.evaluate(&Failing, &QueryModel::default(), 2);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Info);
        assert_eq!(findings[0].rule, "failing");
        assert_eq!(findings[0].location.statement, 2);
        assert!(findings[0].rationale.contains("boom"));
    }

    #[test]
    fn test_severity_override_applies() {
        let mut config = RulesConfig::default();
        config.severity.insert("unused-cte".into(), "critical".into());
        let runner = RuleRunner::with_config(config);
        let model = QueryModel::new(
            vec![crate::model::Cte::new(
                "dead",
                QueryBody::single(Select {
                    from: Some(TableRef::base("t")),
                    ..Default::default()
                })
            )],
            QueryBody::default()
        );
        let findings: Vec<Finding> = runner
            .check(&model, 0)
            .into_iter()
            .filter(|f| f.rule == "unused-cte")
            .collect();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
    }

    #[test]
    fn test_disabled_rules_are_skipped() {
        let config = RulesConfig {
            disabled: vec!["SELF-JOIN".into()],
            ..Default::default()
        };
        let runner = RuleRunner::with_config(config);
        assert!(!runner.rule_ids().contains(&"self-join"));
        assert_eq!(runner.rule_ids().len(), 10);
    }
}
