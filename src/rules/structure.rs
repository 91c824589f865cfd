use compact_str::CompactString;
use indexmap::{IndexMap, IndexSet};

use super::{
    Clause, Finding, Location, Rule, RuleCategory, RuleInfo, Severity,
    walk::{check_set_shape, selects}
};
use crate::{
    error::RuleEvaluationError,
    model::{BinaryOp, Expr, Literal, QueryBody, QueryModel, Select, SetOperation}
};

/// Default number of distinct window specifications tolerated per scope.
pub const DEFAULT_WINDOW_THRESHOLD: usize = 3;

/// Default number of UNION ALL branches that counts as a fan-out.
pub const DEFAULT_FAN_OUT_MIN_BRANCHES: usize = 3;

/// Too many distinct window specifications in one scope
pub struct ExcessiveWindowFunctions {
    threshold: usize
}

impl ExcessiveWindowFunctions {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold
        }
    }
}

impl Default for ExcessiveWindowFunctions {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_THRESHOLD)
    }
}

impl Rule for ExcessiveWindowFunctions {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id:          "excessive-window-functions",
            name:        "Excessive window functions",
            severity:    Severity::Info,
            category:    RuleCategory::Structure,
            description: "Many distinct window specifications within one CTE or the final SELECT"
        }
    }

    fn check(&self, model: &QueryModel, statement: usize) -> Result<Vec<Finding>, RuleEvaluationError> {
        let info = self.info();
        let mut findings = Vec::new();
        for (scope, body) in model.scopes() {
            let distinct: IndexSet<String> = selects(body)
                .into_iter()
                .flat_map(|select| &select.windows)
                .map(|window| window.key())
                .collect();
            let count = distinct.len();
            if count <= self.threshold {
                continue;
            }
            findings.push(
                Finding::new(
                    &info,
                    Location::new(statement, scope.clone(), Clause::Window),
                    format!(
                        "{} uses {} distinct window specifications (threshold {}); each distinct partitioning forces its own sort",
                        scope, count, self.threshold
                    )
                )
                .with_suggestion("Share PARTITION BY / ORDER BY keys, or split the work across CTEs")
                .with_cost(1.0 + 0.25 * count as f64)
            );
        }
        Ok(findings)
    }
}

/// Sorted CTE whose order nothing uses
pub struct MaterializeTimeOrderBy;

impl Rule for MaterializeTimeOrderBy {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id:          "materialize-time-order-by",
            name:        "ORDER BY in CTE",
            severity:    Severity::Info,
            category:    RuleCategory::Structure,
            description: "CTE sorts its rows although it is not the statement's final output"
        }
    }

    fn check(&self, model: &QueryModel, statement: usize) -> Result<Vec<Finding>, RuleEvaluationError> {
        let info = self.info();
        Ok(model
            .ctes
            .iter()
            .enumerate()
            .filter(|(_, cte)| cte.body.has_order_by())
            .map(|(index, cte)| {
                let (rationale, suggestion) = match cte.body.limit {
                    Some(limit) => (
                        format!(
                            "CTE `{}` sorts its input to keep the top {} rows; the sort runs at materialization time and its order is not guaranteed downstream",
                            cte.name, limit
                        ),
                        "Use a window function (ROW_NUMBER() ... QUALIFY / WHERE rn <= N) or move the top-N to the final SELECT"
                    ),
                    None => (
                        format!(
                            "CTE `{}` sorts its output but is not the final result; the sort is wasted when the CTE is materialized",
                            cte.name
                        ),
                        "Move the ORDER BY to the final SELECT, or drop it"
                    )
                };
                Finding::new(
                    &info,
                    Location::new(statement, model.scope_of(index), Clause::OrderBy),
                    rationale
                )
                .with_suggestion(suggestion)
                .with_cost(1.5)
            })
            .collect())
    }
}

/// UNION ALL branches re-reading one source with a different literal filter
pub struct UnionAllFanOut {
    min_branches: usize
}

/// Source and filtered column a branch shares with its siblings.
type FanOutKey = (CompactString, CompactString);

impl UnionAllFanOut {
    pub fn new(min_branches: usize) -> Self {
        Self {
            min_branches
        }
    }

    /// `(source, column) -> literal` pairs of a single-source branch.
    fn literal_filters(select: &Select) -> Vec<(FanOutKey, &Literal)> {
        let Some(from) = &select.from else {
            return Vec::new();
        };
        if !select.joins.is_empty() {
            return Vec::new();
        }
        select
            .predicates
            .iter()
            .filter_map(|predicate| match predicate {
                Expr::Binary {
                    op: BinaryOp::Eq | BinaryOp::Like | BinaryOp::ILike,
                    left,
                    right
                } => match (&**left, &**right) {
                    (Expr::Column(col), Expr::Literal(lit))
                    | (Expr::Literal(lit), Expr::Column(col)) => {
                        Some(((from.name.clone(), col.name.clone()), lit))
                    }
                    _ => None
                },
                _ => None
            })
            .collect()
    }

    /// Largest fan-out group in a body: branch count, source, column.
    fn widest(body: &QueryBody) -> Option<(usize, FanOutKey)> {
        let mut best: Option<(usize, FanOutKey)> = None;
        let mut groups: IndexMap<FanOutKey, IndexSet<&Literal>> = IndexMap::new();
        for (i, select) in body.branches.iter().enumerate() {
            let continues_run = i > 0 && body.set_operations[i - 1] == SetOperation::UnionAll;
            if !continues_run {
                groups.clear();
            }
            for (key, literal) in Self::literal_filters(select) {
                let literals = groups.entry(key.clone()).or_default();
                literals.insert(literal);
                let count = literals.len();
                if best.as_ref().is_none_or(|(n, _)| count > *n) {
                    best = Some((count, key));
                }
            }
        }
        best
    }
}

impl Default for UnionAllFanOut {
    fn default() -> Self {
        Self::new(DEFAULT_FAN_OUT_MIN_BRANCHES)
    }
}

impl Rule for UnionAllFanOut {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id:          "union-all-fan-out",
            name:        "UNION ALL fan-out",
            severity:    Severity::Warning,
            category:    RuleCategory::Scan,
            description: "UNION ALL branches each re-read one source filtered on a different literal"
        }
    }

    fn check(&self, model: &QueryModel, statement: usize) -> Result<Vec<Finding>, RuleEvaluationError> {
        let info = self.info();
        let mut findings = Vec::new();
        for (scope, body) in model.scopes() {
            check_set_shape(body, info.id)?;
            let Some((branches, (source, column))) = Self::widest(body) else {
                continue;
            };
            if branches < self.min_branches.max(2) {
                continue;
            }
            findings.push(
                Finding::new(
                    &info,
                    Location::new(statement, scope.clone(), Clause::SetOperation),
                    format!(
                        "{} UNION ALL branches in {} each read `{}` filtering `{}` on a different literal; the source is scanned {} times",
                        branches, scope, source, column, branches
                    )
                )
                .with_suggestion(format!(
                    "Read `{}` once and derive the branch label with CASE on `{}`",
                    source, column
                ))
                .with_cost(branches as f64)
            );
        }
        Ok(findings)
    }
}
