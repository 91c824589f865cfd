use sqlparser::ast::{self, JoinOperator, TableFactor, TableWithJoins};

use super::{expr::convert_expr, query::convert_body};
use crate::{
    ingest::{RawJoin, RawJoinConstraint, RawSelect, RawSourceKind, RawTableRef},
    model::JoinKind
};

/// Add one comma-separated `FROM` item to `select`.
///
/// The first item becomes the root; later items are implicit cross joins.
pub fn add_from_item(item: &TableWithJoins, select: &mut RawSelect) {
    let root = relation(&item.relation, &mut select.joins);
    if select.from.is_none() {
        select.from = Some(root);
    } else {
        select.joins.push(RawJoin {
            kind:       Some(JoinKind::Cross),
            left:       None,
            right:      Some(root),
            constraint: None
        });
    }
    for join in &item.joins {
        push_join(join, None, &mut select.joins);
    }
}

fn push_join(join: &ast::Join, left: Option<&RawTableRef>, joins: &mut Vec<RawJoin>) {
    let right = relation(&join.relation, joins);
    let (kind, constraint) = join_kind(&join.join_operator);
    joins.push(RawJoin {
        kind: Some(kind),
        left: left.cloned(),
        right: Some(right),
        constraint: constraint.and_then(convert_constraint)
    });
}

fn relation(factor: &TableFactor, joins: &mut Vec<RawJoin>) -> RawTableRef {
    match factor {
        TableFactor::Table {
            name,
            alias,
            ..
        } => RawTableRef {
            name: Some(name.to_string()),
            alias: alias_name(alias.as_ref()),
            ..Default::default()
        },
        TableFactor::Derived {
            subquery,
            alias,
            ..
        } => RawTableRef {
            alias: alias_name(alias.as_ref()),
            subquery: Some(Box::new(convert_body(subquery))),
            ..Default::default()
        },
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => {
            let root = relation(&table_with_joins.relation, joins);
            for join in &table_with_joins.joins {
                push_join(join, Some(&root), joins);
            }
            root
        }
        // Table functions, UNNEST, FLATTEN and friends
        other => RawTableRef {
            name: Some(other.to_string()),
            kind: Some(RawSourceKind::Table),
            ..Default::default()
        }
    }
}

fn alias_name(alias: Option<&ast::TableAlias>) -> Option<String> {
    alias.map(|a| a.name.to_string())
}

fn join_kind(op: &JoinOperator) -> (JoinKind, Option<&ast::JoinConstraint>) {
    match op {
        JoinOperator::Join(c) | JoinOperator::Inner(c) => (JoinKind::Inner, Some(c)),
        JoinOperator::Left(c) | JoinOperator::LeftOuter(c) => (JoinKind::Left, Some(c)),
        JoinOperator::Right(c) | JoinOperator::RightOuter(c) => (JoinKind::Right, Some(c)),
        JoinOperator::FullOuter(c) => (JoinKind::Full, Some(c)),
        JoinOperator::CrossJoin(c) => (JoinKind::Cross, Some(c)),
        _ => (JoinKind::Other, None)
    }
}

fn convert_constraint(constraint: &ast::JoinConstraint) -> Option<RawJoinConstraint> {
    match constraint {
        ast::JoinConstraint::On(expr) => Some(RawJoinConstraint::On {
            condition: convert_expr(expr)
        }),
        ast::JoinConstraint::Using(columns) => Some(RawJoinConstraint::Using {
            columns: columns.iter().map(ToString::to_string).collect()
        }),
        ast::JoinConstraint::Natural => Some(RawJoinConstraint::Natural),
        ast::JoinConstraint::None => None
    }
}
