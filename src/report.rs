//! Report assembly.
//!
//! [`ReportBuilder`] orders findings deterministically and counts them per
//! rule and per severity. It performs no detection of its own.

use indexmap::IndexMap;
use serde::Serialize;

use crate::rules::{Finding, Severity};

/// Finding counts per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub critical: usize,
    pub warning:  usize,
    pub info:     usize
}

impl SeverityCounts {
    fn of(findings: &[Finding]) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            match finding.severity {
                Severity::Critical => counts.critical += 1,
                Severity::Warning => counts.warning += 1,
                Severity::Info => counts.info += 1
            }
        }
        counts
    }
}

/// Immutable analysis result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    findings:            Vec<Finding>,
    summary:             IndexMap<&'static str, usize>,
    counts:              SeverityCounts,
    statements_analyzed: usize,
    rules_executed:      usize
}

impl Report {
    /// Findings, most severe first, then in source order
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Rule id to finding count, including rules that found nothing
    pub fn summary(&self) -> &IndexMap<&'static str, usize> {
        &self.summary
    }

    pub fn counts(&self) -> SeverityCounts {
        self.counts
    }

    pub fn critical_count(&self) -> usize {
        self.counts.critical
    }

    pub fn warning_count(&self) -> usize {
        self.counts.warning
    }

    pub fn info_count(&self) -> usize {
        self.counts.info
    }

    pub fn has_critical(&self) -> bool {
        self.counts.critical > 0
    }

    pub fn statements_analyzed(&self) -> usize {
        self.statements_analyzed
    }

    pub fn rules_executed(&self) -> usize {
        self.rules_executed
    }

    /// New report keeping only findings at or above `min`.
    pub fn at_least(&self, min: Severity) -> Report {
        let findings: Vec<Finding> = self
            .findings
            .iter()
            .filter(|f| f.severity >= min)
            .cloned()
            .collect();
        Report {
            summary: summarize(self.summary.keys().copied(), &findings),
            counts: SeverityCounts::of(&findings),
            findings,
            statements_analyzed: self.statements_analyzed,
            rules_executed: self.rules_executed
        }
    }
}

fn summarize(
    rule_ids: impl IntoIterator<Item = &'static str>,
    findings: &[Finding]
) -> IndexMap<&'static str, usize> {
    let mut summary: IndexMap<&'static str, usize> =
        rule_ids.into_iter().map(|id| (id, 0)).collect();
    for finding in findings {
        *summary.entry(finding.rule).or_insert(0) += 1;
    }
    summary
}

/// Builds [`Report`]s for a fixed set of registered rules.
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    rule_ids:   Vec<&'static str>,
    statements: usize
}

impl ReportBuilder {
    pub fn new(rule_ids: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            rule_ids:   rule_ids.into_iter().collect(),
            statements: 0
        }
    }

    /// Number of statements the findings came from.
    #[must_use]
    pub fn statements(mut self, count: usize) -> Self {
        self.statements = count;
        self
    }

    /// Order findings and count them.
    ///
    /// Ordering is severity descending, then statement, CTE declaration
    /// order (final SELECT last), clause, rule id. The sort is stable, so
    /// findings equal on all of these keep the order the rules emitted.
    pub fn build(&self, mut findings: Vec<Finding>) -> Report {
        findings.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| a.location.sort_key().cmp(&b.location.sort_key()))
                .then_with(|| a.rule.cmp(b.rule))
        });
        Report {
            summary: summarize(self.rule_ids.iter().copied(), &findings),
            counts: SeverityCounts::of(&findings),
            findings,
            statements_analyzed: self.statements,
            rules_executed: self.rule_ids.len()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::Scope,
        rules::{Clause, Location, RuleCategory, RuleInfo}
    };

    fn finding(rule: &'static str, severity: Severity, scope: Scope, clause: Clause) -> Finding {
        let info = RuleInfo {
            id: rule,
            name: rule,
            severity,
            category: RuleCategory::Structure,
            description: ""
        };
        Finding::new(&info, Location::new(0, scope, clause), "x")
    }

    fn cte(index: usize) -> Scope {
        Scope::Cte {
            index,
            name: format!("c{}", index).into()
        }
    }

    #[test]
    fn test_orders_by_severity_then_source() {
        let report = ReportBuilder::new(["a", "b", "c"]).build(vec![
            finding("a", Severity::Info, cte(0), Clause::From),
            finding("b", Severity::Critical, Scope::Final, Clause::Join),
            finding("c", Severity::Critical, cte(1), Clause::Join),
        ]);
        let rules: Vec<&str> = report.findings().iter().map(|f| f.rule).collect();
        assert_eq!(rules, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_summary_includes_zero_counts() {
        let report = ReportBuilder::new(["a", "b"])
            .build(vec![finding("a", Severity::Warning, Scope::Final, Clause::Where)]);
        assert_eq!(report.summary().get("a"), Some(&1));
        assert_eq!(report.summary().get("b"), Some(&0));
        assert_eq!(report.rules_executed(), 2);
    }

    #[test]
    fn test_at_least_builds_filtered_copy() {
        let report = ReportBuilder::new(["a", "b"]).build(vec![
            finding("a", Severity::Info, Scope::Final, Clause::Where),
            finding("b", Severity::Critical, Scope::Final, Clause::Join),
        ]);
        let filtered = report.at_least(Severity::Warning);
        assert_eq!(filtered.findings().len(), 1);
        assert_eq!(filtered.summary().get("a"), Some(&0));
        assert_eq!(report.findings().len(), 2);
        assert!(filtered.has_critical());
    }
}
