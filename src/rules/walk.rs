//! Traversal helpers shared by the rules.

use crate::{
    error::RuleEvaluationError,
    model::{Expr, QueryBody, QueryModel, Select, Source}
};

/// Every SELECT of a body, including those inside derived tables, in
/// source order. Expression subqueries are not entered.
pub fn selects(body: &QueryBody) -> Vec<&Select> {
    let mut out = Vec::new();
    collect_selects(body, &mut out);
    out
}

fn collect_selects<'a>(body: &'a QueryBody, out: &mut Vec<&'a Select>) {
    for select in &body.branches {
        out.push(select);
        for table in select.sources() {
            if let Source::Derived(sub) = &table.source {
                collect_selects(sub, out);
            }
        }
    }
}

/// Predicate comparing two column-bearing operands (`a.x = b.y`).
///
/// With `binding` set, at least one column must be qualified by it.
pub fn is_column_comparison(expr: &Expr, binding: Option<&str>) -> bool {
    let Expr::Binary {
        op,
        left,
        right
    } = expr
    else {
        return false;
    };
    if !op.is_comparison() {
        return false;
    }
    let (left, right) = (left.columns(), right.columns());
    if left.is_empty() || right.is_empty() {
        return false;
    }
    match binding {
        None => true,
        Some(binding) => left
            .iter()
            .chain(&right)
            .any(|col| col.qualifier.as_deref().and_then(|q| q.rsplit('.').next()) == Some(binding))
    }
}

/// Fail when a body's branch and set-operation counts disagree.
pub fn check_set_shape(body: &QueryBody, rule_id: &'static str) -> Result<(), RuleEvaluationError> {
    if body.branches.is_empty() && body.set_operations.is_empty() {
        return Ok(());
    }
    if body.set_operations.len() + 1 != body.branches.len() {
        return Err(RuleEvaluationError::new(
            rule_id,
            format!(
                "{} set operations between {} branches",
                body.set_operations.len(),
                body.branches.len()
            )
        ));
    }
    Ok(())
}

/// Fail when any scope reads a CTE index the model does not define.
pub fn check_cte_refs(model: &QueryModel, rule_id: &'static str) -> Result<(), RuleEvaluationError> {
    for (scope, body) in model.scopes() {
        if let Some(index) = body
            .referenced_ctes()
            .into_iter()
            .find(|&i| model.cte(i).is_none())
        {
            return Err(RuleEvaluationError::new(
                rule_id,
                format!("{} reads CTE #{} which is not defined", scope, index)
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BinaryOp, TableRef};

    #[test]
    fn test_selects_enters_derived_tables() {
        let inner = QueryBody::single(Select {
            from: Some(TableRef::base("orders")),
            ..Default::default()
        });
        let body = QueryBody::single(Select {
            from: Some(TableRef::derived("o", inner)),
            ..Default::default()
        });
        assert_eq!(selects(&body).len(), 2);
    }

    #[test]
    fn test_column_comparison_with_binding() {
        let pred = Expr::binary(
            BinaryOp::Eq,
            Expr::column(Some("a"), "id"),
            Expr::column(Some("b"), "a_id")
        );
        assert!(is_column_comparison(&pred, Some("b")));
        assert!(!is_column_comparison(&pred, Some("c")));
        assert!(is_column_comparison(&pred, None));
    }

    #[test]
    fn test_column_to_literal_is_not_a_join_predicate() {
        let pred = Expr::binary(BinaryOp::Eq, Expr::column(Some("b"), "x"), Expr::number("1"));
        assert!(!is_column_comparison(&pred, None));
    }

    #[test]
    fn test_set_shape_mismatch() {
        let body = QueryBody {
            branches: vec![Select::default()],
            set_operations: vec![crate::model::SetOperation::UnionAll],
            ..Default::default()
        };
        assert!(check_set_shape(&body, "x").is_err());
    }
}
