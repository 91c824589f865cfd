use sqlparser::ast::{self, FunctionArg, FunctionArgExpr, FunctionArguments, Value, WindowType};

use super::query::convert_body;
use crate::{
    ingest::{RawExpr, RawWhen, RawWindow},
    model::{BinaryOp, Literal}
};

fn boxed(expr: &ast::Expr) -> Box<RawExpr> {
    Box::new(convert_expr(expr))
}

/// Convert a sqlparser expression; unclassified constructs keep their SQL.
pub fn convert_expr(expr: &ast::Expr) -> RawExpr {
    use sqlparser::ast::Expr;

    match expr {
        Expr::Identifier(ident) => RawExpr::column(None, &ident.to_string()),
        Expr::CompoundIdentifier(idents) => match idents.split_last() {
            Some((name, [])) => RawExpr::column(None, &name.to_string()),
            Some((name, qualifier)) => {
                let qualifier: Vec<String> = qualifier.iter().map(ToString::to_string).collect();
                RawExpr::column(Some(&qualifier.join(".")), &name.to_string())
            }
            None => RawExpr::Raw {
                sql: expr.to_string()
            }
        },
        Expr::Value(value) => RawExpr::Literal {
            value: literal(&value.value)
        },
        Expr::BinaryOp {
            left,
            op,
            right
        } => RawExpr::Binary {
            op:    BinaryOp::from_symbol(&op.to_string()),
            left:  boxed(left),
            right: boxed(right)
        },
        Expr::Like {
            negated,
            expr,
            pattern,
            ..
        } => RawExpr::Binary {
            op:    if *negated { BinaryOp::NotLike } else { BinaryOp::Like },
            left:  boxed(expr),
            right: boxed(pattern)
        },
        Expr::ILike {
            negated,
            expr,
            pattern,
            ..
        } => RawExpr::Binary {
            op:    if *negated {
                BinaryOp::NotILike
            } else {
                BinaryOp::ILike
            },
            left:  boxed(expr),
            right: boxed(pattern)
        },
        Expr::UnaryOp {
            op,
            expr
        } => RawExpr::Unary {
            op:   op.to_string(),
            expr: boxed(expr)
        },
        Expr::Nested(inner) => convert_expr(inner),
        Expr::InList {
            expr,
            list,
            negated
        } => RawExpr::InList {
            expr:    boxed(expr),
            list:    list.iter().map(convert_expr).collect(),
            negated: *negated
        },
        Expr::InSubquery {
            expr,
            subquery,
            negated
        } => RawExpr::InSubquery {
            expr:    boxed(expr),
            query:   Box::new(convert_body(subquery)),
            negated: *negated
        },
        Expr::Between {
            expr,
            negated,
            low,
            high
        } => RawExpr::Between {
            expr:    boxed(expr),
            low:     boxed(low),
            high:    boxed(high),
            negated: *negated
        },
        Expr::IsNull(inner) => RawExpr::IsNull {
            expr:    boxed(inner),
            negated: false
        },
        Expr::IsNotNull(inner) => RawExpr::IsNull {
            expr:    boxed(inner),
            negated: true
        },
        Expr::Case {
            operand,
            conditions,
            else_result,
            ..
        } => RawExpr::Case {
            operand:     operand.as_deref().map(boxed),
            conditions:  conditions
                .iter()
                .map(|when| RawWhen {
                    condition: convert_expr(&when.condition),
                    result:    convert_expr(&when.result)
                })
                .collect(),
            else_result: else_result.as_deref().map(boxed)
        },
        Expr::Cast {
            expr,
            data_type,
            ..
        } => RawExpr::Cast {
            expr:      boxed(expr),
            data_type: data_type.to_string()
        },
        Expr::Extract {
            field,
            expr,
            ..
        } => RawExpr::Function {
            name:     "extract".to_string(),
            args:     vec![
                RawExpr::Raw {
                    sql: field.to_string()
                },
                convert_expr(expr),
            ],
            distinct: false,
            over:     None
        },
        Expr::Trim {
            expr,
            trim_what,
            trim_characters,
            ..
        } => {
            let mut args = vec![convert_expr(expr)];
            args.extend(trim_what.as_deref().map(convert_expr));
            args.extend(trim_characters.iter().flatten().map(convert_expr));
            call("trim", args)
        }
        Expr::Position {
            expr,
            r#in
        } => call("position", vec![convert_expr(expr), convert_expr(r#in)]),
        Expr::Substring {
            expr,
            substring_from,
            substring_for,
            shorthand,
            ..
        } => {
            let mut args = vec![convert_expr(expr)];
            args.extend(substring_from.as_deref().map(convert_expr));
            args.extend(substring_for.as_deref().map(convert_expr));
            call(if *shorthand { "substr" } else { "substring" }, args)
        }
        Expr::Function(func) => function(func),
        Expr::Subquery(query) => RawExpr::Subquery {
            query: Box::new(convert_body(query))
        },
        Expr::Exists {
            subquery,
            negated
        } => RawExpr::Exists {
            query:   Box::new(convert_body(subquery)),
            negated: *negated
        },
        other => RawExpr::Raw {
            sql: other.to_string()
        }
    }
}

/// Plain call for functions sqlparser gives their own syntax node.
fn call(name: &str, args: Vec<RawExpr>) -> RawExpr {
    RawExpr::Function {
        name: name.to_string(),
        args,
        distinct: false,
        over: None
    }
}

fn literal(value: &Value) -> Literal {
    match value {
        Value::Number(n, _) => Literal::Number(n.as_str().into()),
        Value::SingleQuotedString(s)
        | Value::DoubleQuotedString(s)
        | Value::NationalStringLiteral(s) => Literal::String(s.clone()),
        Value::Boolean(b) => Literal::Boolean(*b),
        Value::Null => Literal::Null,
        other => Literal::Other(other.to_string())
    }
}

fn function(func: &ast::Function) -> RawExpr {
    let mut args = Vec::new();
    let mut distinct = false;
    match &func.args {
        FunctionArguments::None => {}
        FunctionArguments::Subquery(query) => args.push(RawExpr::Subquery {
            query: Box::new(convert_body(query))
        }),
        FunctionArguments::List(list) => {
            distinct = matches!(
                list.duplicate_treatment,
                Some(ast::DuplicateTreatment::Distinct)
            );
            for arg in &list.args {
                let arg = match arg {
                    FunctionArg::Unnamed(arg)
                    | FunctionArg::Named {
                        arg, ..
                    }
                    | FunctionArg::ExprNamed {
                        arg, ..
                    } => arg
                };
                args.push(match arg {
                    FunctionArgExpr::Expr(e) => convert_expr(e),
                    FunctionArgExpr::QualifiedWildcard(name) => RawExpr::Wildcard {
                        qualifier: Some(name.to_string())
                    },
                    FunctionArgExpr::Wildcard => RawExpr::Wildcard {
                        qualifier: None
                    }
                });
            }
        }
    }
    let over = func.over.as_ref().map(|over| match over {
        WindowType::WindowSpec(spec) => RawWindow {
            name:         spec.window_name.as_ref().map(ToString::to_string),
            partition_by: spec.partition_by.iter().map(convert_expr).collect(),
            order_by:     spec.order_by.iter().map(|o| convert_expr(&o.expr)).collect()
        },
        WindowType::NamedWindow(name) => RawWindow {
            name: Some(name.to_string()),
            ..Default::default()
        }
    });
    RawExpr::Function {
        name: func.name.to_string(),
        args,
        distinct,
        over
    }
}

#[cfg(test)]
mod tests {
    use sqlparser::{dialect::GenericDialect, parser::Parser};

    use super::*;

    fn parse(sql: &str) -> RawExpr {
        let expr = Parser::new(&GenericDialect {})
            .try_with_sql(sql)
            .unwrap()
            .parse_expr()
            .unwrap();
        convert_expr(&expr)
    }

    #[test]
    fn test_compound_identifier_splits_qualifier() {
        assert_eq!(parse("o.customer_id"), RawExpr::column(Some("o"), "customer_id"));
    }

    #[test]
    fn test_like_maps_to_binary() {
        match parse("name NOT LIKE 'a%'") {
            RawExpr::Binary {
                op, ..
            } => assert_eq!(op, BinaryOp::NotLike),
            other => panic!("unexpected {:?}", other)
        }
    }

    #[test]
    fn test_count_star_keeps_wildcard_arg() {
        match parse("COUNT(*)") {
            RawExpr::Function {
                name,
                args,
                ..
            } => {
                assert_eq!(name, "COUNT");
                assert_eq!(args, vec![RawExpr::Wildcard {
                    qualifier: None
                }]);
            }
            other => panic!("unexpected {:?}", other)
        }
    }

    fn call_shape(sql: &str) -> (String, usize) {
        match parse(sql) {
            RawExpr::Function {
                name,
                args,
                ..
            } => (name, args.len()),
            other => panic!("unexpected {:?}", other)
        }
    }

    #[test]
    fn test_trim_becomes_function() {
        assert_eq!(call_shape("TRIM(email)"), ("trim".to_string(), 1));
        assert_eq!(call_shape("TRIM(BOTH 'x' FROM email)"), ("trim".to_string(), 2));
    }

    #[test]
    fn test_position_becomes_function() {
        assert_eq!(call_shape("POSITION('@' IN email)"), ("position".to_string(), 2));
    }

    #[test]
    fn test_substring_becomes_function() {
        assert_eq!(call_shape("SUBSTRING(email, 1, 3)"), ("substring".to_string(), 3));
        assert_eq!(call_shape("SUBSTRING(email FROM 2)"), ("substring".to_string(), 2));
    }

    #[test]
    fn test_window_function_carries_over_clause() {
        match parse("ROW_NUMBER() OVER (PARTITION BY a ORDER BY b)") {
            RawExpr::Function {
                over: Some(over), ..
            } => {
                assert_eq!(over.partition_by.len(), 1);
                assert_eq!(over.order_by.len(), 1);
            }
            other => panic!("unexpected {:?}", other)
        }
    }
}
