//! Normalized expression tree.
//!
//! Expressions reach the model already normalized by the ingestor: column
//! and function names are lowercase and unquoted, and top-level `AND`
//! chains in filters are split into separate predicates. Nested query
//! bodies (scalar subqueries, `EXISTS`, `IN (SELECT …)`) are kept as full
//! [`QueryBody`] values so rules can inspect them like any other scope.

use std::fmt::{self, Write};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use super::QueryBody;

/// Aggregate functions recognized when classifying a SELECT as aggregating.
const AGGREGATES: &[&str] = &[
    "count",
    "count_if",
    "sum",
    "avg",
    "min",
    "max",
    "median",
    "mode",
    "stddev",
    "stddev_pop",
    "stddev_samp",
    "variance",
    "var_pop",
    "var_samp",
    "listagg",
    "array_agg",
    "string_agg",
    "approx_count_distinct",
    "any_value",
    "bool_and",
    "bool_or",
    "object_agg"
];

/// Reference to a column, optionally qualified by a table binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub qualifier: Option<CompactString>,
    pub name:      CompactString
}

impl ColumnRef {
    pub fn new(qualifier: Option<&str>, name: &str) -> Self {
        Self {
            qualifier: qualifier.map(Into::into),
            name:      name.into()
        }
    }
}

/// Literal value as written in the query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Number(CompactString),
    String(String),
    Boolean(bool),
    Null,
    /// Intervals, typed strings and anything else kept verbatim
    Other(String)
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::Boolean(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Self::Null => write!(f, "null"),
            Self::Other(s) => write!(f, "{}", s)
        }
    }
}

/// Binary operator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
    NotLike,
    ILike,
    NotILike,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Concat,
    Other(CompactString)
}

impl BinaryOp {
    /// Map an operator symbol (as printed by a SQL parser) to an operator.
    pub fn from_symbol(symbol: &str) -> Self {
        match symbol.trim().to_ascii_uppercase().as_str() {
            "AND" => Self::And,
            "OR" => Self::Or,
            "=" | "==" => Self::Eq,
            "<>" | "!=" => Self::NotEq,
            "<" => Self::Lt,
            "<=" => Self::LtEq,
            ">" => Self::Gt,
            ">=" => Self::GtEq,
            "LIKE" => Self::Like,
            "NOT LIKE" => Self::NotLike,
            "ILIKE" => Self::ILike,
            "NOT ILIKE" => Self::NotILike,
            "+" => Self::Plus,
            "-" => Self::Minus,
            "*" => Self::Multiply,
            "/" => Self::Divide,
            "%" => Self::Modulo,
            "||" => Self::Concat,
            other => Self::Other(other.into())
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Like => "like",
            Self::NotLike => "not like",
            Self::ILike => "ilike",
            Self::NotILike => "not ilike",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
            Self::Concat => "||",
            Self::Other(op) => op.as_str()
        }
    }

    /// Comparison and pattern-matching operators, i.e. the ones a filter
    /// predicate is built from.
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Eq
                | Self::NotEq
                | Self::Lt
                | Self::LtEq
                | Self::Gt
                | Self::GtEq
                | Self::Like
                | Self::NotLike
                | Self::ILike
                | Self::NotILike
        )
    }
}

/// Window clause attached to a function call.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSpec {
    /// Name of the function evaluated over the window
    pub function:     CompactString,
    /// Named window reference (`OVER w`), if any
    pub window_name:  Option<CompactString>,
    pub partition_by: Vec<Expr>,
    pub order_by:     Vec<Expr>
}

impl WindowSpec {
    /// Canonical key used to tell window specifications apart.
    pub fn key(&self) -> String {
        let mut key = String::new();
        let _ = write!(key, "{}|", self.function);
        if let Some(name) = &self.window_name {
            let _ = write!(key, "w:{}|", name);
        }
        key.push_str(&join_canonical(&self.partition_by));
        key.push('|');
        key.push_str(&join_canonical(&self.order_by));
        key
    }
}

/// Function call, including aggregates and window functions.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name:     CompactString,
    pub args:     Vec<Expr>,
    pub distinct: bool,
    pub over:     Option<WindowSpec>
}

impl FunctionCall {
    /// Whether this is a plain (non-window) aggregate call.
    pub fn is_aggregate(&self) -> bool {
        self.over.is_none() && AGGREGATES.contains(&self.name.as_str())
    }
}

/// Normalized SQL expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(ColumnRef),
    Literal(Literal),
    Wildcard {
        qualifier: Option<CompactString>
    },
    Function(FunctionCall),
    Binary {
        op:    BinaryOp,
        left:  Box<Expr>,
        right: Box<Expr>
    },
    Unary {
        op:   CompactString,
        expr: Box<Expr>
    },
    InList {
        expr:    Box<Expr>,
        list:    Vec<Expr>,
        negated: bool
    },
    Between {
        expr:    Box<Expr>,
        low:     Box<Expr>,
        high:    Box<Expr>,
        negated: bool
    },
    IsNull {
        expr:    Box<Expr>,
        negated: bool
    },
    Case {
        operand:     Option<Box<Expr>>,
        conditions:  Vec<(Expr, Expr)>,
        else_result: Option<Box<Expr>>
    },
    Cast {
        expr:      Box<Expr>,
        data_type: CompactString
    },
    Subquery(Box<QueryBody>),
    Exists {
        query:   Box<QueryBody>,
        negated: bool
    },
    InSubquery {
        expr:    Box<Expr>,
        query:   Box<QueryBody>,
        negated: bool
    },
    /// Construct the parser adapter could not classify, kept as SQL text
    Raw(String)
}

impl Expr {
    pub fn column(qualifier: Option<&str>, name: &str) -> Self {
        Self::Column(ColumnRef::new(qualifier, name))
    }

    pub fn number(value: &str) -> Self {
        Self::Literal(Literal::Number(value.into()))
    }

    pub fn string(value: &str) -> Self {
        Self::Literal(Literal::String(value.to_string()))
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right)
        }
    }

    pub fn function(name: &str, args: Vec<Expr>) -> Self {
        Self::Function(FunctionCall {
            name: name.into(),
            args,
            distinct: false,
            over: None
        })
    }

    pub fn as_column(&self) -> Option<&ColumnRef> {
        match self {
            Self::Column(col) => Some(col),
            _ => None
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal(lit) => Some(lit),
            _ => None
        }
    }

    pub fn as_function(&self) -> Option<&FunctionCall> {
        match self {
            Self::Function(func) => Some(func),
            _ => None
        }
    }

    /// Visit this expression and every child expression in pre-order.
    ///
    /// Nested query bodies are not entered; use
    /// [`for_each_subquery`](Self::for_each_subquery) for those.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Expr)) {
        visit(self);
        match self {
            Self::Function(func) => {
                for arg in &func.args {
                    arg.walk(visit);
                }
                if let Some(over) = &func.over {
                    for e in over.partition_by.iter().chain(&over.order_by) {
                        e.walk(visit);
                    }
                }
            }
            Self::Binary {
                left,
                right,
                ..
            } => {
                left.walk(visit);
                right.walk(visit);
            }
            Self::Unary {
                expr, ..
            }
            | Self::IsNull {
                expr, ..
            }
            | Self::Cast {
                expr, ..
            }
            | Self::InSubquery {
                expr, ..
            } => expr.walk(visit),
            Self::InList {
                expr,
                list,
                ..
            } => {
                expr.walk(visit);
                for item in list {
                    item.walk(visit);
                }
            }
            Self::Between {
                expr,
                low,
                high,
                ..
            } => {
                expr.walk(visit);
                low.walk(visit);
                high.walk(visit);
            }
            Self::Case {
                operand,
                conditions,
                else_result
            } => {
                if let Some(op) = operand {
                    op.walk(visit);
                }
                for (when, then) in conditions {
                    when.walk(visit);
                    then.walk(visit);
                }
                if let Some(e) = else_result {
                    e.walk(visit);
                }
            }
            Self::Column(_)
            | Self::Literal(_)
            | Self::Wildcard {
                ..
            }
            | Self::Subquery(_)
            | Self::Exists {
                ..
            }
            | Self::Raw(_) => {}
        }
    }

    /// Columns referenced by this expression, outside nested subqueries.
    pub fn columns(&self) -> Vec<&ColumnRef> {
        let mut cols = Vec::new();
        self.walk(&mut |e| {
            if let Self::Column(col) = e {
                cols.push(col);
            }
        });
        cols
    }

    /// Call `visit` for every query body nested directly in this expression.
    pub fn for_each_subquery<'a>(&'a self, visit: &mut impl FnMut(&'a QueryBody)) {
        self.walk(&mut |e| match e {
            Self::Subquery(query)
            | Self::Exists {
                query, ..
            }
            | Self::InSubquery {
                query, ..
            } => visit(&**query),
            _ => {}
        });
    }

    /// Window specifications of window-function calls in this expression.
    pub fn windows(&self) -> Vec<&WindowSpec> {
        let mut windows = Vec::new();
        self.walk(&mut |e| {
            if let Self::Function(FunctionCall {
                over: Some(over), ..
            }) = e
            {
                windows.push(over);
            }
        });
        windows
    }

    /// Whether the expression calls an aggregate outside of a window.
    pub fn contains_aggregate(&self) -> bool {
        let mut found = false;
        self.walk(&mut |e| {
            if let Self::Function(func) = e
                && func.is_aggregate()
            {
                found = true;
            }
        });
        found
    }

    /// Split a top-level `AND` chain into its conjuncts.
    pub fn split_conjunction(self) -> Vec<Expr> {
        match self {
            Self::Binary {
                op: BinaryOp::And,
                left,
                right
            } => {
                let mut parts = left.split_conjunction();
                parts.extend(right.split_conjunction());
                parts
            }
            other => vec![other]
        }
    }

    /// Qualifier-free rendering used for structural comparison.
    ///
    /// Two expressions that differ only by table aliases render the same.
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        render(self, &mut out, true);
        out
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        render(self, &mut out, false);
        f.write_str(&out)
    }
}

/// Sorted, comma-joined canonical forms.
pub(crate) fn join_canonical(exprs: &[Expr]) -> String {
    let mut parts: Vec<String> = exprs.iter().map(Expr::canonical).collect();
    parts.sort();
    parts.join(",")
}

fn render_list(exprs: &[Expr], out: &mut String, strip: bool) {
    for (i, e) in exprs.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        render(e, out, strip);
    }
}

fn render(expr: &Expr, out: &mut String, strip: bool) {
    match expr {
        Expr::Column(col) => {
            if !strip && let Some(q) = &col.qualifier {
                out.push_str(q);
                out.push('.');
            }
            out.push_str(&col.name);
        }
        Expr::Literal(lit) => {
            let _ = write!(out, "{}", lit);
        }
        Expr::Wildcard {
            qualifier
        } => {
            if !strip && let Some(q) = qualifier {
                out.push_str(q);
                out.push('.');
            }
            out.push('*');
        }
        Expr::Function(func) => {
            out.push_str(&func.name);
            out.push('(');
            if func.distinct {
                out.push_str("distinct ");
            }
            render_list(&func.args, out, strip);
            out.push(')');
            if let Some(over) = &func.over {
                out.push_str(" over (");
                if let Some(name) = &over.window_name {
                    out.push_str(name);
                }
                if !over.partition_by.is_empty() {
                    out.push_str("partition by ");
                    render_list(&over.partition_by, out, strip);
                }
                if !over.order_by.is_empty() {
                    if !over.partition_by.is_empty() {
                        out.push(' ');
                    }
                    out.push_str("order by ");
                    render_list(&over.order_by, out, strip);
                }
                out.push(')');
            }
        }
        Expr::Binary {
            op,
            left,
            right
        } => {
            out.push('(');
            render(left, out, strip);
            let _ = write!(out, " {} ", op.symbol());
            render(right, out, strip);
            out.push(')');
        }
        Expr::Unary {
            op,
            expr
        } => {
            let _ = write!(out, "{} ", op);
            render(expr, out, strip);
        }
        Expr::InList {
            expr,
            list,
            negated
        } => {
            render(expr, out, strip);
            out.push_str(if *negated { " not in (" } else { " in (" });
            render_list(list, out, strip);
            out.push(')');
        }
        Expr::Between {
            expr,
            low,
            high,
            negated
        } => {
            render(expr, out, strip);
            out.push_str(if *negated { " not between " } else { " between " });
            render(low, out, strip);
            out.push_str(" and ");
            render(high, out, strip);
        }
        Expr::IsNull {
            expr,
            negated
        } => {
            render(expr, out, strip);
            out.push_str(if *negated { " is not null" } else { " is null" });
        }
        Expr::Case {
            operand,
            conditions,
            else_result
        } => {
            out.push_str("case");
            if let Some(op) = operand {
                out.push(' ');
                render(op, out, strip);
            }
            for (when, then) in conditions {
                out.push_str(" when ");
                render(when, out, strip);
                out.push_str(" then ");
                render(then, out, strip);
            }
            if let Some(e) = else_result {
                out.push_str(" else ");
                render(e, out, strip);
            }
            out.push_str(" end");
        }
        Expr::Cast {
            expr,
            data_type
        } => {
            out.push_str("cast(");
            render(expr, out, strip);
            let _ = write!(out, " as {})", data_type);
        }
        Expr::Subquery(query) => {
            let _ = write!(out, "({})", query.signature());
        }
        Expr::Exists {
            query,
            negated
        } => {
            let _ = write!(
                out,
                "{}exists ({})",
                if *negated { "not " } else { "" },
                query.signature()
            );
        }
        Expr::InSubquery {
            expr,
            query,
            negated
        } => {
            render(expr, out, strip);
            let _ = write!(
                out,
                "{} ({})",
                if *negated { " not in" } else { " in" },
                query.signature()
            );
        }
        Expr::Raw(sql) => out.push_str(&sql.to_lowercase())
    }
}
