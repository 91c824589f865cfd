use indexmap::IndexMap;

use super::{Clause, Finding, Location, Rule, RuleCategory, RuleInfo, Severity, walk::selects};
use crate::{
    error::RuleEvaluationError,
    model::{Expr, FunctionCall, Literal, QueryModel}
};

/// Same aggregate computed twice in one SELECT
pub struct RedundantAggregation;

impl RedundantAggregation {
    /// `count(*)`, `count(1)`, `count(col)` and `sum(1)`.
    fn is_row_count(func: &FunctionCall) -> bool {
        let one = |e: &Expr| matches!(e.as_literal(), Some(Literal::Number(n)) if n == "1");
        match (func.name.as_str(), func.args.as_slice(), func.distinct) {
            ("count", [Expr::Wildcard { .. }], false) | ("count", [Expr::Column(_)], false) => true,
            ("count", [arg], false) | ("sum", [arg], false) => one(arg),
            _ => false
        }
    }

    /// Equivalence key of a top-level aggregate projection.
    fn key(expr: &Expr) -> Option<String> {
        let func = expr.as_function().filter(|f| f.is_aggregate())?;
        if Self::is_row_count(func) {
            return Some("count(*)".to_string());
        }
        let args: Vec<String> = func.args.iter().map(Expr::canonical).collect();
        Some(format!(
            "{}({}{})",
            func.name,
            if func.distinct { "distinct " } else { "" },
            args.join(", ")
        ))
    }
}

impl Rule for RedundantAggregation {
    fn info(&self) -> RuleInfo {
        RuleInfo {
            id:          "redundant-aggregation",
            name:        "Redundant aggregation",
            severity:    Severity::Info,
            category:    RuleCategory::Aggregation,
            description: "Two output columns of one SELECT compute the same aggregate"
        }
    }

    fn check(&self, model: &QueryModel, statement: usize) -> Result<Vec<Finding>, RuleEvaluationError> {
        let info = self.info();
        let mut findings = Vec::new();
        for (scope, body) in model.scopes() {
            for select in selects(body).into_iter().filter(|s| s.is_aggregate()) {
                let mut groups: IndexMap<String, Vec<String>> = IndexMap::new();
                for item in &select.projection {
                    if let Some(key) = Self::key(&item.expr) {
                        groups.entry(key).or_default().push(item.output_name());
                    }
                }
                for (aggregate, columns) in groups.into_iter().filter(|(_, cols)| cols.len() >= 2) {
                    let columns: Vec<String> = columns.iter().map(|c| format!("`{}`", c)).collect();
                    findings.push(
                        Finding::new(
                            &info,
                            Location::new(statement, scope.clone(), Clause::Select),
                            format!(
                                "{} in {} all compute `{}`",
                                columns.join(", "),
                                scope,
                                aggregate
                            )
                        )
                        .with_suggestion("Compute the aggregate once and reuse the column downstream")
                        .with_cost(1.1)
                    );
                }
            }
        }
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Projection, QueryBody, Select, TableRef};

    fn aggregate(projection: Vec<Projection>) -> QueryModel {
        QueryModel::new(
            vec![],
            QueryBody::single(Select {
                projection,
                from: Some(TableRef::base("orders")),
                group_by: vec![Expr::column(None, "customer_id")],
                ..Default::default()
            })
        )
    }

    #[test]
    fn test_row_count_variants_are_equivalent() {
        let model = aggregate(vec![
            Projection::aliased(
                Expr::function("count", vec![Expr::Wildcard {
                    qualifier: None
                }]),
                "n"
            ),
            Projection::aliased(Expr::function("sum", vec![Expr::number("1")]), "m"),
            Projection::aliased(Expr::function("count", vec![Expr::column(None, "id")]), "k"),
        ]);
        let findings = RedundantAggregation.check(&model, 0).unwrap();
        assert_eq!(findings.len(), 1);
        assert!(findings[0].rationale.contains("`n`, `m`, `k`"));
    }

    #[test]
    fn test_distinct_aggregates_differ() {
        let model = aggregate(vec![
            Projection::new(Expr::function("sum", vec![Expr::column(None, "amount")])),
            Projection::new(Expr::function("avg", vec![Expr::column(None, "amount")])),
        ]);
        assert!(RedundantAggregation.check(&model, 0).unwrap().is_empty());
    }

    #[test]
    fn test_qualifiers_do_not_matter() {
        let model = aggregate(vec![
            Projection::aliased(Expr::function("sum", vec![Expr::column(Some("o"), "amount")]), "a"),
            Projection::aliased(Expr::function("sum", vec![Expr::column(None, "amount")]), "b"),
        ]);
        assert_eq!(RedundantAggregation.check(&model, 0).unwrap().len(), 1);
    }
}
