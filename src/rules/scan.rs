use indexmap::IndexSet;

use super::{
    Clause, Finding, Location, Rule, RuleCategory, RuleInfo, Severity,
    walk::check_cte_refs
};
use crate::{
    error::RuleEvaluationError,
    model::{QueryBody, QueryModel, Source, TableRef}
};

/// CTE scanning a base table with no filter anywhere downstream
pub struct UnfilteredFullScan;

impl Rule for UnfilteredFullScan {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id:          "unfiltered-full-scan",
            name:        "Unfiltered full scan",
            severity:    Severity::Critical,
            category:    RuleCategory::Scan,
            description: "CTE reads a base table with no WHERE or LIMIT and no consumer filters it"
        }
    }

    fn check(&self, model: &QueryModel, statement: usize) -> Result<Vec<Finding>, RuleEvaluationError> {
        let info = self.info();
        let mut findings = Vec::new();
        for (index, cte) in model.ctes.iter().enumerate() {
            if cte.body.limit.is_some() {
                continue;
            }
            let Some(table) = unfiltered_base(&cte.body) else {
                continue;
            };
            let readers = model.direct_readers(index);
            if readers.iter().any(|(_, select)| select.is_filtered()) {
                continue;
            }
            let consumers = match readers.len() {
                0 => "it has no consumers".to_string(),
                1 => "its consumer does not filter it either".to_string(),
                n => format!("none of its {} consumers filter it either", n)
            };
            findings.push(
                Finding::new(
                    &info,
                    Location::new(statement, model.scope_of(index), Clause::From),
                    format!(
                        "CTE `{}` reads base table `{}` without a WHERE predicate or LIMIT, and {}; every run scans the whole table",
                        cte.name, table.name, consumers
                    )
                )
                .with_suggestion(
                    "Push a selective predicate (date range, partition key) into the CTE"
                )
                .with_cost(10.0)
            );
        }
        Ok(findings)
    }
}

/// First base table an unfiltered branch reads, directly or through
/// unfiltered, unlimited derived tables.
fn unfiltered_base(body: &QueryBody) -> Option<&TableRef> {
    body.branches
        .iter()
        .filter(|select| !select.is_filtered())
        .flat_map(|select| select.sources())
        .find_map(|table| match &table.source {
            Source::Base => Some(table),
            Source::Derived(sub) if sub.limit.is_none() => unfiltered_base(sub),
            _ => None
        })
}

/// Structurally identical CTEs scanning the same base table
pub struct RedundantSourceScan;

impl RedundantSourceScan {
    fn base_tables(body: &QueryBody) -> IndexSet<&str> {
        body.branches
            .iter()
            .flat_map(|select| select.sources())
            .filter(|table| table.source == Source::Base)
            .map(|table| table.name.as_str())
            .collect()
    }
}

impl Rule for RedundantSourceScan {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id:          "redundant-source-scan",
            name:        "Redundant source scan",
            severity:    Severity::Warning,
            category:    RuleCategory::Scan,
            description: "Two CTEs compute the same body over the same base table"
        }
    }

    fn check(&self, model: &QueryModel, statement: usize) -> Result<Vec<Finding>, RuleEvaluationError> {
        let info = self.info();
        let signatures: Vec<String> = model.ctes.iter().map(|cte| cte.body.signature()).collect();
        let mut findings = Vec::new();
        for (j, later) in model.ctes.iter().enumerate() {
            for (i, earlier) in model.ctes.iter().enumerate().take(j) {
                if signatures[i] != signatures[j] {
                    continue;
                }
                let shared: Vec<&str> = Self::base_tables(&earlier.body)
                    .intersection(&Self::base_tables(&later.body))
                    .copied()
                    .collect();
                let Some(table) = shared.first() else {
                    continue;
                };
                findings.push(
                    Finding::new(
                        &info,
                        Location::new(statement, model.scope_of(j), Clause::Definition),
                        format!(
                            "CTE `{}` repeats the scan of `{}` already performed by CTE `{}` with an identical body",
                            later.name, table, earlier.name
                        )
                    )
                    .with_suggestion(format!(
                        "Reference `{}` instead of recomputing it",
                        earlier.name
                    ))
                    .with_cost(2.0)
                );
            }
        }
        Ok(findings)
    }
}

/// CTE defined but never read
pub struct UnusedCte;

impl Rule for UnusedCte {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id:          "unused-cte",
            name:        "Unused CTE",
            severity:    Severity::Info,
            category:    RuleCategory::Structure,
            description: "CTE is never referenced by a later CTE or the final SELECT"
        }
    }

    fn check(&self, model: &QueryModel, statement: usize) -> Result<Vec<Finding>, RuleEvaluationError> {
        check_cte_refs(model, self.info().id)?;
        let info = self.info();
        Ok(model
            .ctes
            .iter()
            .enumerate()
            .filter(|(index, _)| !model.is_referenced(*index))
            .map(|(index, cte)| {
                Finding::new(
                    &info,
                    Location::new(statement, model.scope_of(index), Clause::Definition),
                    format!("CTE `{}` is defined but never referenced", cte.name)
                )
                .with_suggestion("Remove the CTE; some engines still evaluate it")
                .with_cost(1.0)
            })
            .collect())
    }
}
