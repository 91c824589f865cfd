use super::{
    Clause, Finding, Location, Rule, RuleCategory, RuleInfo, Severity,
    walk::{is_column_comparison, selects}
};
use crate::{
    error::RuleEvaluationError,
    model::{ColumnRef, Expr, Join, JoinKind, QueryModel, Scope, Select, Source, TableRef, Target}
};

/// Cartesian product with nothing to narrow it
pub struct CrossJoinWithoutFilter;

impl CrossJoinWithoutFilter {
    fn is_cartesian(join: &Join) -> bool {
        match join.kind {
            JoinKind::Cross => true,
            JoinKind::Inner => !join.has_condition(),
            _ => false
        }
    }

    fn compensated(model: &QueryModel, scope: &Scope, select: &Select, join: &Join) -> bool {
        let binding = join.right.binding();
        if select
            .predicates
            .iter()
            .any(|p| is_column_comparison(p, Some(binding)))
        {
            return true;
        }
        match scope {
            Scope::Cte {
                index, ..
            } => model
                .direct_readers(*index)
                .iter()
                .any(|(_, reader)| Self::reader_compensates(model, *index, reader)),
            Scope::Final => false
        }
    }

    /// Reader filters the CTE's product on two of its output columns.
    fn reader_compensates(model: &QueryModel, index: usize, reader: &Select) -> bool {
        let Some(first) = model.cte(index).and_then(|cte| cte.body.branches.first()) else {
            return false;
        };
        let bindings: Vec<&str> = reader
            .sources()
            .filter(|t| matches!(t.source, Source::Cte(i) if i == index))
            .map(TableRef::binding)
            .collect();
        let outputs: Vec<String> = first.projection.iter().map(|p| p.output_name()).collect();
        let open = first.projection.iter().any(|p| matches!(p.expr, Expr::Wildcard { .. }));
        let from_cte = |col: &ColumnRef| match col.qualifier.as_deref() {
            Some(q) => bindings.contains(&q.rsplit('.').next().unwrap_or(q)),
            None => open || outputs.iter().any(|o| o == col.name.as_str())
        };
        reader.predicates.iter().any(|p| match p {
            Expr::Binary {
                left,
                right,
                ..
            } if is_column_comparison(p, None) => left
                .columns()
                .into_iter()
                .chain(right.columns())
                .all(|col| from_cte(col)),
            _ => false
        })
    }
}

impl Rule for CrossJoinWithoutFilter {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id:          "cross-join-without-filter",
            name:        "Cross join without filter",
            severity:    Severity::Critical,
            category:    RuleCategory::Join,
            description: "CROSS JOIN or condition-less INNER JOIN with no compensating filter"
        }
    }

    fn check(&self, model: &QueryModel, statement: usize) -> Result<Vec<Finding>, RuleEvaluationError> {
        let info = self.info();
        let mut findings = Vec::new();
        for (scope, body) in model.scopes() {
            for select in selects(body) {
                for join in &select.joins {
                    if !Self::is_cartesian(join) || Self::compensated(model, &scope, select, join) {
                        continue;
                    }
                    let kind = if join.kind == JoinKind::Cross {
                        "CROSS JOIN"
                    } else {
                        "INNER JOIN without a condition"
                    };
                    findings.push(
                        Finding::new(
                            &info,
                            Location::new(statement, scope.clone(), Clause::Join),
                            format!(
                                "{} of `{}` with `{}` in {} has no compensating filter; output grows as the product of both inputs",
                                kind,
                                join.left.binding(),
                                join.right.binding(),
                                scope
                            )
                        )
                        .with_suggestion(
                            "Add a join condition, or filter the product on a column of each side"
                        )
                        .with_cost(100.0)
                    );
                }
            }
        }
        Ok(findings)
    }
}

/// Same physical source on both sides of a join
pub struct SelfJoin;

impl SelfJoin {
    fn describe(model: &QueryModel, target: &Target) -> String {
        match target {
            Target::Base(name) => format!("table `{}`", name),
            Target::Cte(index) => model
                .cte(*index)
                .map(|cte| format!("CTE `{}`", cte.name))
                .unwrap_or_default(),
            Target::Derived => String::new()
        }
    }
}

impl Rule for SelfJoin {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id:          "self-join",
            name:        "Self-join",
            severity:    Severity::Warning,
            category:    RuleCategory::Join,
            description: "Both sides of a join resolve to the same base table or CTE"
        }
    }

    fn check(&self, model: &QueryModel, statement: usize) -> Result<Vec<Finding>, RuleEvaluationError> {
        let info = self.info();
        let unresolved = |index: usize| {
            RuleEvaluationError::new(info.id, format!("join reads CTE #{} which is not defined", index))
        };
        let mut findings = Vec::new();
        for (scope, body) in model.scopes() {
            for select in selects(body) {
                for join in &select.joins {
                    let left = model.resolve(&join.left).map_err(|e| unresolved(e.0))?;
                    let right = model.resolve(&join.right).map_err(|e| unresolved(e.0))?;
                    if left == Target::Derived || left != right {
                        continue;
                    }
                    findings.push(
                        Finding::new(
                            &info,
                            Location::new(statement, scope.clone(), Clause::Join),
                            format!(
                                "`{}` and `{}` in {} both read {}",
                                join.left.binding(),
                                join.right.binding(),
                                scope,
                                Self::describe(model, &left)
                            )
                        )
                        .with_suggestion(
                            "Compute both sides in one pass with window functions or conditional aggregation"
                        )
                        .with_cost(2.0)
                    );
                }
            }
        }
        Ok(findings)
    }
}
