//! Query model ingestion.
//!
//! Turns an external parser's output ([`RawQuery`], schema v1) into an
//! immutable [`QueryModel`]:
//!
//! 1. checks the schema version and CTE name uniqueness;
//! 2. resolves every table reference to a base table, a prior CTE or a
//!    derived table, and rejects forward references;
//! 3. normalizes identifiers (unquoted, lowercase);
//! 4. splits `AND` chains in `WHERE`/`HAVING` into separate predicates;
//! 5. collects window specifications from each projection.
//!
//! Ingestion either succeeds completely or fails with a
//! [`MalformedQueryError`]; no rule ever sees a partially built model.

mod normalize;
pub mod raw;

use compact_str::CompactString;
pub use normalize::{normalize_identifier, normalize_part};
pub use raw::{
    RawBody, RawCte, RawDocument, RawExpr, RawJoin, RawJoinConstraint, RawProjection, RawQuery,
    RawSelect, RawSourceKind, RawTableRef, RawWhen, RawWindow, SCHEMA_VERSION
};
use tracing::debug;

use crate::{
    error::{MalformedQueryError, MalformedReason},
    model::{
        ColumnRef, Cte, Expr, FunctionCall, Join, JoinConstraint, Projection, QueryBody,
        QueryModel, Select, Source, TableRef, WindowSpec
    }
};

/// Ingest one parse tree.
///
/// # Errors
///
/// Returns [`MalformedQueryError`] when a required field is missing, CTE
/// names repeat, a CTE reference does not resolve to a prior definition,
/// or the schema version is not supported.
pub fn ingest(raw: RawQuery) -> Result<QueryModel, MalformedQueryError> {
    if raw.version != SCHEMA_VERSION {
        return Err(MalformedQueryError::new(
            MalformedReason::UnsupportedVersion,
            format!("got {}, expected {}", raw.version, SCHEMA_VERSION)
        ));
    }
    let mut declared: Vec<CompactString> = Vec::with_capacity(raw.ctes.len());
    for (position, cte) in raw.ctes.iter().enumerate() {
        let name = cte
            .name
            .as_deref()
            .map(normalize_identifier)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| MalformedQueryError::missing(format!("name of CTE #{}", position + 1)))?;
        if declared.contains(&name) {
            return Err(MalformedQueryError::new(
                MalformedReason::DuplicateCte,
                format!("`{}` is defined more than once", name)
            ));
        }
        declared.push(name);
    }
    let mut ctes = Vec::with_capacity(declared.len());
    for (index, cte) in raw.ctes.into_iter().enumerate() {
        let name = &declared[index];
        let body = cte
            .body
            .ok_or_else(|| MalformedQueryError::missing(format!("body of CTE `{}`", name)))?;
        let resolver = Resolver {
            declared: &declared,
            current:  Some(index)
        };
        ctes.push(Cte {
            name: name.clone(),
            body: resolver.body(body)?
        });
    }
    let resolver = Resolver {
        declared: &declared,
        current:  None
    };
    let body = resolver.body(raw.body)?;
    let model = QueryModel::new(ctes, body);
    debug!(
        ctes = model.ctes.len(),
        branches = model.body.branches.len(),
        "ingested query model"
    );
    Ok(model)
}

/// Ingest every statement of a document, stopping at the first malformed one.
pub fn ingest_all(queries: Vec<RawQuery>) -> Result<Vec<QueryModel>, MalformedQueryError> {
    queries.into_iter().map(ingest).collect()
}

/// Name resolution context for one scope.
struct Resolver<'a> {
    declared: &'a [CompactString],
    /// CTE being defined, `None` for the final SELECT
    current:  Option<usize>
}

impl Resolver<'_> {
    /// CTEs declared strictly before the current scope.
    fn visible(&self) -> usize {
        self.current.unwrap_or(self.declared.len())
    }

    fn body(&self, raw: RawBody) -> Result<QueryBody, MalformedQueryError> {
        let branches = raw
            .branches
            .into_iter()
            .map(|select| self.select(select))
            .collect::<Result<Vec<_>, _>>()?;
        let order_by = raw
            .order_by
            .into_iter()
            .map(|e| self.expr(e))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(QueryBody {
            branches,
            set_operations: raw.set_operations,
            order_by,
            limit: raw.limit
        })
    }

    fn select(&self, raw: RawSelect) -> Result<Select, MalformedQueryError> {
        let from = raw.from.map(|t| self.table(t)).transpose()?;
        let mut joins = Vec::with_capacity(raw.joins.len());
        for (position, join) in raw.joins.into_iter().enumerate() {
            let kind = join.kind.ok_or_else(|| {
                MalformedQueryError::missing(format!("kind of join #{}", position + 1))
            })?;
            let right = join.right.ok_or_else(|| {
                MalformedQueryError::missing(format!("right table of join #{}", position + 1))
            })?;
            let right = self.table(right)?;
            let left = match join.left {
                Some(left) => self.table(left)?,
                None => from.clone().ok_or_else(|| {
                    MalformedQueryError::missing(format!(
                        "left table of join #{} (no FROM root)",
                        position + 1
                    ))
                })?
            };
            let constraint = join.constraint.map(|c| self.constraint(c)).transpose()?;
            joins.push(Join {
                kind,
                left,
                right,
                constraint
            });
        }
        let projection = raw
            .projection
            .into_iter()
            .map(|p| {
                Ok(Projection {
                    expr:  self.expr(p.expr)?,
                    alias: p.alias.as_deref().map(normalize_part)
                })
            })
            .collect::<Result<Vec<_>, MalformedQueryError>>()?;
        let windows = projection
            .iter()
            .flat_map(|p| p.expr.windows())
            .cloned()
            .collect();
        Ok(Select {
            distinct: raw.distinct,
            projection,
            from,
            joins,
            predicates: self.conjuncts(raw.predicates)?,
            group_by: raw
                .group_by
                .into_iter()
                .map(|e| self.expr(e))
                .collect::<Result<Vec<_>, _>>()?,
            having: self.conjuncts(raw.having)?,
            qualify: self.conjuncts(raw.qualify)?,
            windows
        })
    }

    fn conjuncts(&self, raw: Vec<RawExpr>) -> Result<Vec<Expr>, MalformedQueryError> {
        let mut out = Vec::with_capacity(raw.len());
        for e in raw {
            out.extend(self.expr(e)?.split_conjunction());
        }
        Ok(out)
    }

    fn constraint(&self, raw: RawJoinConstraint) -> Result<JoinConstraint, MalformedQueryError> {
        Ok(match raw {
            RawJoinConstraint::On {
                condition
            } => JoinConstraint::On(self.expr(condition)?),
            RawJoinConstraint::Using {
                columns
            } => JoinConstraint::Using(columns.iter().map(|c| normalize_part(c)).collect()),
            RawJoinConstraint::Natural => JoinConstraint::Natural
        })
    }

    fn table(&self, raw: RawTableRef) -> Result<TableRef, MalformedQueryError> {
        let alias = raw.alias.as_deref().map(normalize_part);
        if let Some(subquery) = raw.subquery {
            let name = alias
                .clone()
                .or_else(|| raw.name.as_deref().map(normalize_identifier))
                .unwrap_or_else(|| CompactString::const_new("(subquery)"));
            return Ok(TableRef {
                name,
                alias,
                source: Source::Derived(Box::new(self.body(*subquery)?))
            });
        }
        let name = raw
            .name
            .as_deref()
            .map(normalize_identifier)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| MalformedQueryError::missing("table name or subquery"))?;
        let source = self.resolve(&name, raw.kind)?;
        Ok(TableRef {
            name,
            alias,
            source
        })
    }

    fn resolve(
        &self,
        name: &str,
        kind: Option<RawSourceKind>
    ) -> Result<Source, MalformedQueryError> {
        let position = self.declared.iter().position(|d| d == name);
        match (kind, position) {
            (Some(RawSourceKind::Table), _) => Ok(Source::Base),
            (_, Some(index)) if index < self.visible() => Ok(Source::Cte(index)),
            (Some(RawSourceKind::Cte), _) => Err(MalformedQueryError::new(
                MalformedReason::UnresolvedCte,
                format!("`{}` is not defined before it is used", name)
            )),
            // A non-recursive CTE reading its own name reads the base table
            (None, Some(index)) if Some(index) == self.current => Ok(Source::Base),
            (None, Some(_)) => Err(MalformedQueryError::new(
                MalformedReason::ForwardReference,
                format!("`{}` is used before its definition", name)
            )),
            (None, None) => Ok(Source::Base)
        }
    }

    fn exprs(&self, raw: Vec<RawExpr>) -> Result<Vec<Expr>, MalformedQueryError> {
        raw.into_iter().map(|e| self.expr(e)).collect()
    }

    fn boxed(&self, raw: RawExpr) -> Result<Box<Expr>, MalformedQueryError> {
        Ok(Box::new(self.expr(raw)?))
    }

    fn expr(&self, raw: RawExpr) -> Result<Expr, MalformedQueryError> {
        Ok(match raw {
            RawExpr::Column {
                qualifier,
                name
            } => Expr::Column(ColumnRef {
                qualifier: qualifier.as_deref().map(normalize_identifier),
                name:      normalize_part(&name)
            }),
            RawExpr::Literal {
                value
            } => Expr::Literal(value),
            RawExpr::Wildcard {
                qualifier
            } => Expr::Wildcard {
                qualifier: qualifier.as_deref().map(normalize_identifier)
            },
            RawExpr::Function {
                name,
                args,
                distinct,
                over
            } => {
                let name = normalize_identifier(&name);
                let over = match over {
                    Some(window) => Some(WindowSpec {
                        function:     name.clone(),
                        window_name:  window.name.as_deref().map(normalize_part),
                        partition_by: self.exprs(window.partition_by)?,
                        order_by:     self.exprs(window.order_by)?
                    }),
                    None => None
                };
                Expr::Function(FunctionCall {
                    name,
                    args: self.exprs(args)?,
                    distinct,
                    over
                })
            }
            RawExpr::Binary {
                op,
                left,
                right
            } => Expr::Binary {
                op,
                left: self.boxed(*left)?,
                right: self.boxed(*right)?
            },
            RawExpr::Unary {
                op,
                expr
            } => Expr::Unary {
                op:   op.to_lowercase().into(),
                expr: self.boxed(*expr)?
            },
            RawExpr::InList {
                expr,
                list,
                negated
            } => Expr::InList {
                expr: self.boxed(*expr)?,
                list: self.exprs(list)?,
                negated
            },
            RawExpr::Between {
                expr,
                low,
                high,
                negated
            } => Expr::Between {
                expr: self.boxed(*expr)?,
                low: self.boxed(*low)?,
                high: self.boxed(*high)?,
                negated
            },
            RawExpr::IsNull {
                expr,
                negated
            } => Expr::IsNull {
                expr: self.boxed(*expr)?,
                negated
            },
            RawExpr::Case {
                operand,
                conditions,
                else_result
            } => Expr::Case {
                operand:     operand.map(|o| self.boxed(*o)).transpose()?,
                conditions:  conditions
                    .into_iter()
                    .map(|w| Ok((self.expr(w.condition)?, self.expr(w.result)?)))
                    .collect::<Result<Vec<_>, MalformedQueryError>>()?,
                else_result: else_result.map(|e| self.boxed(*e)).transpose()?
            },
            RawExpr::Cast {
                expr,
                data_type
            } => Expr::Cast {
                expr:      self.boxed(*expr)?,
                data_type: data_type.to_lowercase().into()
            },
            RawExpr::Subquery {
                query
            } => Expr::Subquery(Box::new(self.body(*query)?)),
            RawExpr::Exists {
                query,
                negated
            } => Expr::Exists {
                query: Box::new(self.body(*query)?),
                negated
            },
            RawExpr::InSubquery {
                expr,
                query,
                negated
            } => Expr::InSubquery {
                expr: self.boxed(*expr)?,
                query: Box::new(self.body(*query)?),
                negated
            },
            RawExpr::Raw {
                sql
            } => Expr::Raw(sql)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JoinKind;

    fn select_from(name: &str) -> RawSelect {
        RawSelect {
            projection: vec![RawProjection {
                expr:  RawExpr::Wildcard {
                    qualifier: None
                },
                alias: None
            }],
            from: Some(RawTableRef::named(name)),
            ..Default::default()
        }
    }

    fn body_from(name: &str) -> RawBody {
        RawBody {
            branches: vec![select_from(name)],
            ..Default::default()
        }
    }

    #[test]
    fn test_resolves_prior_cte() {
        let raw = RawQuery {
            ctes: vec![RawCte {
                name: Some("Base".into()),
                body: Some(body_from("db.orders"))
            }],
            body: body_from("base"),
            ..Default::default()
        };
        let model = ingest(raw).unwrap();
        assert_eq!(model.ctes[0].name, "base");
        let from = model.body.branches[0].from.as_ref().unwrap();
        assert_eq!(from.source, Source::Cte(0));
    }

    #[test]
    fn test_self_named_cte_reads_base_table() {
        let raw = RawQuery {
            ctes: vec![RawCte {
                name: Some("orders".into()),
                body: Some(body_from("orders"))
            }],
            body: body_from("orders"),
            ..Default::default()
        };
        let model = ingest(raw).unwrap();
        let inner = model.ctes[0].body.branches[0].from.as_ref().unwrap();
        assert_eq!(inner.source, Source::Base);
        let outer = model.body.branches[0].from.as_ref().unwrap();
        assert_eq!(outer.source, Source::Cte(0));
    }

    #[test]
    fn test_join_left_defaults_to_from_root() {
        let mut select = select_from("a");
        select.joins.push(RawJoin {
            kind: Some(JoinKind::Cross),
            right: Some(RawTableRef::named("b")),
            ..Default::default()
        });
        let raw = RawQuery {
            body: RawBody {
                branches: vec![select],
                ..Default::default()
            },
            ..Default::default()
        };
        let model = ingest(raw).unwrap();
        let join = &model.body.branches[0].joins[0];
        assert_eq!(join.left.name, "a");
        assert_eq!(join.right.name, "b");
    }
}
