use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;

use super::{Clause, Finding, Location, Rule, RuleCategory, RuleInfo, Severity, walk::selects};
use crate::{
    error::RuleEvaluationError,
    model::{Expr, FunctionCall, QueryBody, QueryModel}
};

/// Functions that hide a column from pruning and index lookups.
static NON_SARGABLE_FN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(upper|lower|trim|ltrim|rtrim|length|len|position|left|right|substr|substring|regexp_\w+|rlike|year|month|day|date|to_date|coalesce)$"
    )
    .expect("valid regex")
});

/// Filter on a function-wrapped column
pub struct NonSargablePredicate;

impl NonSargablePredicate {
    /// Wrapping call when `expr` is a listed function over a column.
    fn wrapped(expr: &Expr) -> Option<&FunctionCall> {
        let func = expr.as_function()?;
        let name = func.name.rsplit('.').next().unwrap_or(func.name.as_str());
        let wraps_column = func.args.iter().any(|arg| !arg.columns().is_empty());
        (NON_SARGABLE_FN.is_match(name) && wraps_column).then_some(func)
    }

    /// First wrapped operand of a comparison, BETWEEN or IN list.
    fn offending(predicate: &Expr) -> Option<&FunctionCall> {
        let mut found = None;
        predicate.walk(&mut |e| {
            if found.is_some() {
                return;
            }
            found = match e {
                Expr::Binary {
                    op,
                    left,
                    right
                } if op.is_comparison() => Self::wrapped(left).or_else(|| Self::wrapped(right)),
                Expr::Between {
                    expr, ..
                }
                | Expr::InList {
                    expr, ..
                } => Self::wrapped(expr),
                _ => None
            };
        });
        found
    }
}

impl Rule for NonSargablePredicate {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id:          "non-sargable-predicate",
            name:        "Non-sargable predicate",
            severity:    Severity::Warning,
            category:    RuleCategory::Predicate,
            description: "WHERE compares a column wrapped in a function call"
        }
    }

    fn check(&self, model: &QueryModel, statement: usize) -> Result<Vec<Finding>, RuleEvaluationError> {
        let info = self.info();
        let mut findings = Vec::new();
        for (scope, body) in model.scopes() {
            for select in selects(body) {
                for predicate in &select.predicates {
                    let Some(func) = Self::offending(predicate) else {
                        continue;
                    };
                    let call = Expr::Function(func.clone());
                    findings.push(
                        Finding::new(
                            &info,
                            Location::new(statement, scope.clone(), Clause::Where),
                            format!(
                                "`{}` in the WHERE clause of {} wraps a column in `{}()`; the filter cannot prune partitions or use indexes",
                                call, scope, func.name
                            )
                        )
                        .with_suggestion(
                            "Compare the raw column, or precompute the expression upstream"
                        )
                        .with_cost(3.0)
                    );
                }
            }
        }
        Ok(findings)
    }
}

/// Scalar subquery in a SELECT list that reads outer columns
pub struct CorrelatedSubquery;

impl CorrelatedSubquery {
    /// Outer qualifiers the subquery's filters reference.
    fn correlations<'a>(sub: &'a QueryBody, outer: &IndexSet<&str>) -> IndexSet<&'a str> {
        let mut refs = IndexSet::new();
        for select in selects(sub) {
            let inner = select.bindings();
            for predicate in select.predicates.iter().chain(&select.having) {
                for col in predicate.columns() {
                    let Some(qualifier) = col.qualifier.as_deref() else {
                        continue;
                    };
                    let binding = qualifier.rsplit('.').next().unwrap_or(qualifier);
                    if outer.contains(binding) && !inner.contains(binding) {
                        refs.insert(binding);
                    }
                }
            }
        }
        refs
    }
}

impl Rule for CorrelatedSubquery {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id:          "correlated-subquery",
            name:        "Correlated subquery",
            severity:    Severity::Warning,
            category:    RuleCategory::Predicate,
            description: "Scalar subquery in the SELECT list filters on outer columns"
        }
    }

    fn check(&self, model: &QueryModel, statement: usize) -> Result<Vec<Finding>, RuleEvaluationError> {
        let info = self.info();
        let mut findings = Vec::new();
        for (scope, body) in model.scopes() {
            for select in selects(body) {
                let outer = select.bindings();
                for item in &select.projection {
                    let mut subqueries = Vec::new();
                    item.expr.walk(&mut |e| {
                        if let Expr::Subquery(sub) = e {
                            subqueries.push(&**sub);
                        }
                    });
                    for sub in subqueries {
                        let refs = Self::correlations(sub, &outer);
                        if refs.is_empty() {
                            continue;
                        }
                        let refs: Vec<String> = refs.iter().map(|r| format!("`{}`", r)).collect();
                        findings.push(
                            Finding::new(
                                &info,
                                Location::new(statement, scope.clone(), Clause::Select),
                                format!(
                                    "Scalar subquery for column `{}` in {} filters on outer {}; it is re-evaluated for every outer row",
                                    item.output_name(),
                                    scope,
                                    refs.join(", ")
                                )
                            )
                            .with_suggestion("Pre-aggregate in a CTE and join it once")
                            .with_cost(25.0)
                        );
                    }
                }
            }
        }
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BinaryOp, Projection, Select, TableRef};

    fn filtered(predicate: Expr) -> QueryModel {
        QueryModel::new(
            vec![],
            QueryBody::single(Select {
                from: Some(TableRef::base("users")),
                predicates: vec![predicate],
                ..Default::default()
            })
        )
    }

    #[test]
    fn test_upper_on_column_is_non_sargable() {
        let model = filtered(Expr::binary(
            BinaryOp::Eq,
            Expr::function("upper", vec![Expr::column(None, "email")]),
            Expr::string("A@B.C")
        ));
        let findings = NonSargablePredicate.check(&model, 0).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].location.clause, Clause::Where);
    }

    #[test]
    fn test_function_on_literal_side_is_fine() {
        let model = filtered(Expr::binary(
            BinaryOp::Eq,
            Expr::column(None, "email"),
            Expr::function("lower", vec![Expr::string("X")])
        ));
        assert!(NonSargablePredicate.check(&model, 0).unwrap().is_empty());
    }

    #[test]
    fn test_regexp_family_matches() {
        let model = filtered(Expr::binary(
            BinaryOp::Eq,
            Expr::function("regexp_substr", vec![Expr::column(None, "sku")]),
            Expr::string("x")
        ));
        assert_eq!(NonSargablePredicate.check(&model, 0).unwrap().len(), 1);
    }

    #[test]
    fn test_correlated_scalar_subquery() {
        let sub = QueryBody::single(Select {
            projection: vec![Projection::new(Expr::function("count", vec![Expr::Wildcard {
                qualifier: None
            }]))],
            from: Some(TableRef::base("orders").with_alias("o")),
            predicates: vec![Expr::binary(
                BinaryOp::Eq,
                Expr::column(Some("o"), "customer_id"),
                Expr::column(Some("c"), "id")
            )],
            ..Default::default()
        });
        let model = QueryModel::new(
            vec![],
            QueryBody::single(Select {
                projection: vec![Projection::aliased(Expr::Subquery(Box::new(sub)), "orders")],
                from: Some(TableRef::base("customers").with_alias("c")),
                ..Default::default()
            })
        );
        let findings = CorrelatedSubquery.check(&model, 0).unwrap();
        assert_eq!(findings.len(), 1);
        assert!(findings[0].rationale.contains("`c`"));
    }

    #[test]
    fn test_uncorrelated_scalar_subquery() {
        let sub = QueryBody::single(Select {
            from: Some(TableRef::base("orders")),
            ..Default::default()
        });
        let model = QueryModel::new(
            vec![],
            QueryBody::single(Select {
                projection: vec![Projection::new(Expr::Subquery(Box::new(sub)))],
                from: Some(TableRef::base("customers").with_alias("c")),
                ..Default::default()
            })
        );
        assert!(CorrelatedSubquery.check(&model, 0).unwrap().is_empty());
    }
}
