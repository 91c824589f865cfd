use sqlparser::ast::{
    self, GroupByExpr, LimitClause, OrderByKind, SelectItem, SelectItemQualifiedWildcardKind,
    SetExpr, SetOperator, SetQuantifier
};
use tracing::debug;

use super::{expr::convert_expr, table::add_from_item};
use crate::{
    ingest::{RawBody, RawCte, RawExpr, RawProjection, RawQuery, RawSelect, SCHEMA_VERSION},
    model::SetOperation
};

/// Convert a top-level query, hoisting its `WITH` list into CTEs.
pub fn convert_query(query: &ast::Query) -> RawQuery {
    let ctes = query
        .with
        .iter()
        .flat_map(|with| &with.cte_tables)
        .map(|cte| RawCte {
            name: Some(cte.alias.name.to_string()),
            body: Some(convert_body(&cte.query))
        })
        .collect();
    RawQuery {
        version: SCHEMA_VERSION,
        ctes,
        body: body_of(query)
    }
}

/// Convert a nested query (CTE body, derived table, subquery).
pub fn convert_body(query: &ast::Query) -> RawBody {
    if query.with.is_some() {
        debug!("nested WITH clause is not hoisted; its names read as base tables");
    }
    body_of(query)
}

fn body_of(query: &ast::Query) -> RawBody {
    if query.order_by.is_none()
        && query.limit_clause.is_none()
        && let SetExpr::Query(inner) = query.body.as_ref()
    {
        return body_of(inner);
    }
    let mut body = RawBody::default();
    flatten(&query.body, &mut body);
    body.order_by = order_by(query);
    body.limit = limit(query);
    body
}

/// Flatten a set-operation tree into branches joined left to right.
fn flatten(set_expr: &SetExpr, body: &mut RawBody) {
    match set_expr {
        SetExpr::Select(select) => body.branches.push(convert_select(select)),
        SetExpr::Query(query) => flatten(&query.body, body),
        SetExpr::SetOperation {
            op,
            set_quantifier,
            left,
            right
        } => {
            flatten(left, body);
            body.set_operations
                .push(set_operation(op, set_quantifier));
            flatten(right, body);
        }
        // VALUES, TABLE and DML bodies carry no SELECT clauses
        _ => body.branches.push(RawSelect::default())
    }
}

fn set_operation(op: &SetOperator, quantifier: &SetQuantifier) -> SetOperation {
    match op {
        SetOperator::Union if matches!(quantifier, SetQuantifier::All | SetQuantifier::AllByName) => {
            SetOperation::UnionAll
        }
        SetOperator::Union => SetOperation::Union,
        SetOperator::Intersect => SetOperation::Intersect,
        _ => SetOperation::Except
    }
}

fn order_by(query: &ast::Query) -> Vec<RawExpr> {
    match &query.order_by {
        Some(order_by) => match &order_by.kind {
            OrderByKind::Expressions(exprs) => exprs.iter().map(|e| convert_expr(&e.expr)).collect(),
            _ => vec![RawExpr::Raw {
                sql: "all".to_string()
            }]
        },
        None => Vec::new()
    }
}

fn limit(query: &ast::Query) -> Option<u64> {
    let expr = match query.limit_clause.as_ref()? {
        LimitClause::LimitOffset {
            limit, ..
        } => limit.as_ref()?,
        LimitClause::OffsetCommaLimit {
            limit, ..
        } => limit
    };
    if let ast::Expr::Value(val) = expr
        && let ast::Value::Number(n, _) = &val.value
    {
        n.parse().ok()
    } else {
        None
    }
}

fn convert_select(select: &ast::Select) -> RawSelect {
    let mut out = RawSelect {
        distinct: matches!(
            select.distinct,
            Some(ast::Distinct::Distinct | ast::Distinct::On(_))
        ),
        projection: select.projection.iter().map(projection).collect(),
        predicates: select.selection.iter().map(convert_expr).collect(),
        having: select.having.iter().map(convert_expr).collect(),
        qualify: select.qualify.iter().map(convert_expr).collect(),
        ..Default::default()
    };
    out.group_by = match &select.group_by {
        GroupByExpr::Expressions(exprs, _) => exprs.iter().map(convert_expr).collect(),
        GroupByExpr::All(_) => vec![RawExpr::Raw {
            sql: "all".to_string()
        }]
    };
    for item in &select.from {
        add_from_item(item, &mut out);
    }
    out
}

fn projection(item: &SelectItem) -> RawProjection {
    match item {
        SelectItem::UnnamedExpr(expr) => RawProjection {
            expr:  convert_expr(expr),
            alias: None
        },
        SelectItem::ExprWithAlias {
            expr,
            alias
        } => RawProjection {
            expr:  convert_expr(expr),
            alias: Some(alias.to_string())
        },
        SelectItem::QualifiedWildcard(kind, _) => {
            let qualifier = match kind {
                SelectItemQualifiedWildcardKind::ObjectName(name) => name.to_string(),
                SelectItemQualifiedWildcardKind::Expr(expr) => expr.to_string()
            };
            RawProjection {
                expr:  RawExpr::Wildcard {
                    qualifier: Some(qualifier)
                },
                alias: None
            }
        }
        SelectItem::Wildcard(_) => RawProjection {
            expr:  RawExpr::Wildcard {
                qualifier: None
            },
            alias: None
        }
    }
}
