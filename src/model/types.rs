use std::fmt::Write;

use compact_str::CompactString;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::expr::{Expr, WindowSpec, join_canonical};

/// Column list of a `USING` clause; rarely more than a few names.
pub type ColumnVec = SmallVec<[CompactString; 4]>;

/// Named intermediate query definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Cte {
    pub name: CompactString,
    pub body: QueryBody
}

impl Cte {
    pub fn new(name: &str, body: QueryBody) -> Self {
        Self {
            name: name.into(),
            body
        }
    }
}

/// Set operator joining two SELECT branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetOperation {
    Union,
    UnionAll,
    Intersect,
    Except
}

impl std::fmt::Display for SetOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Union => write!(f, "UNION"),
            Self::UnionAll => write!(f, "UNION ALL"),
            Self::Intersect => write!(f, "INTERSECT"),
            Self::Except => write!(f, "EXCEPT")
        }
    }
}

/// Clause set of a CTE, of a derived table, or of the outermost statement.
///
/// `branches[i + 1]` is joined to the preceding branches by
/// `set_operations[i]`. `ORDER BY` and `LIMIT` apply to the body as a whole.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryBody {
    pub branches:       Vec<Select>,
    pub set_operations: Vec<SetOperation>,
    pub order_by:       Vec<Expr>,
    pub limit:          Option<u64>
}

impl QueryBody {
    /// Body made of a single SELECT.
    pub fn single(select: Select) -> Self {
        Self {
            branches: vec![select],
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    pub fn has_order_by(&self) -> bool {
        !self.order_by.is_empty()
    }

    /// Indices of every CTE this body reads, including through derived
    /// tables and nested subqueries, in first-seen order.
    pub fn referenced_ctes(&self) -> IndexSet<usize> {
        let mut refs = IndexSet::new();
        collect_cte_refs(self, &mut refs);
        refs
    }

    /// Canonical structural signature.
    ///
    /// Column order, aliases and qualifiers do not affect the result; two
    /// bodies with equal signatures read the same rows the same way.
    pub fn signature(&self) -> String {
        let mut sig = String::new();
        for (i, branch) in self.branches.iter().enumerate() {
            if i > 0 {
                let op = self
                    .set_operations
                    .get(i - 1)
                    .map(|op| op.to_string())
                    .unwrap_or_default();
                let _ = write!(sig, " {} ", op);
            }
            sig.push_str(&branch.signature());
        }
        if self.has_order_by() {
            let _ = write!(sig, " order[{}]", join_canonical(&self.order_by));
        }
        if let Some(limit) = self.limit {
            let _ = write!(sig, " limit[{}]", limit);
        }
        sig
    }
}

fn collect_cte_refs(body: &QueryBody, refs: &mut IndexSet<usize>) {
    for select in &body.branches {
        for table in select.sources() {
            match &table.source {
                Source::Cte(index) => {
                    refs.insert(*index);
                }
                Source::Derived(sub) => collect_cte_refs(sub, refs),
                Source::Base => {}
            }
        }
        for expr in select.expressions() {
            expr.for_each_subquery(&mut |sub| collect_cte_refs(sub, refs));
        }
    }
}

/// Output column of a SELECT.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub expr:  Expr,
    pub alias: Option<CompactString>
}

impl Projection {
    pub fn new(expr: Expr) -> Self {
        Self {
            expr,
            alias: None
        }
    }

    pub fn aliased(expr: Expr, alias: &str) -> Self {
        Self {
            expr,
            alias: Some(alias.into())
        }
    }

    /// Name the column is exposed as.
    pub fn output_name(&self) -> String {
        match (&self.alias, &self.expr) {
            (Some(alias), _) => alias.to_string(),
            (None, Expr::Column(col)) => col.name.to_string(),
            (None, expr) => expr.to_string()
        }
    }
}

/// What a table reference reads from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// Physical table or view outside the statement
    Base,
    /// CTE at the given declaration index
    Cte(usize),
    /// Subquery in `FROM`
    Derived(Box<QueryBody>)
}

/// Item of a `FROM` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    /// Normalized (possibly multi-part) name; for derived tables, the alias
    pub name:   CompactString,
    pub alias:  Option<CompactString>,
    pub source: Source
}

impl TableRef {
    pub fn base(name: &str) -> Self {
        Self {
            name:   name.into(),
            alias:  None,
            source: Source::Base
        }
    }

    pub fn cte(name: &str, index: usize) -> Self {
        Self {
            name:   name.into(),
            alias:  None,
            source: Source::Cte(index)
        }
    }

    pub fn derived(alias: &str, body: QueryBody) -> Self {
        Self {
            name:   alias.into(),
            alias:  Some(alias.into()),
            source: Source::Derived(Box::new(body))
        }
    }

    #[must_use]
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Name this item is addressable by inside its SELECT.
    pub fn binding(&self) -> &str {
        match &self.alias {
            Some(alias) => alias.as_str(),
            None => self.name.rsplit('.').next().unwrap_or(self.name.as_str())
        }
    }

    fn signature(&self) -> String {
        match &self.source {
            Source::Base => self.name.to_string(),
            Source::Cte(_) => format!("cte:{}", self.name),
            Source::Derived(body) => format!("({})", body.signature())
        }
    }
}

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
    /// Semi, anti, apply and other dialect-specific joins
    Other
}

impl std::fmt::Display for JoinKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inner => write!(f, "INNER JOIN"),
            Self::Left => write!(f, "LEFT JOIN"),
            Self::Right => write!(f, "RIGHT JOIN"),
            Self::Full => write!(f, "FULL JOIN"),
            Self::Cross => write!(f, "CROSS JOIN"),
            Self::Other => write!(f, "JOIN")
        }
    }
}

/// Join condition.
#[derive(Debug, Clone, PartialEq)]
pub enum JoinConstraint {
    On(Expr),
    Using(ColumnVec),
    Natural
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind:       JoinKind,
    pub left:       TableRef,
    pub right:      TableRef,
    pub constraint: Option<JoinConstraint>
}

impl Join {
    pub fn has_condition(&self) -> bool {
        self.constraint.is_some()
    }

    fn signature(&self) -> String {
        let condition = match &self.constraint {
            Some(JoinConstraint::On(expr)) => expr.canonical(),
            Some(JoinConstraint::Using(cols)) => format!("using({})", cols.join(",")),
            Some(JoinConstraint::Natural) => "natural".to_string(),
            None => String::new()
        };
        format!("{} {} on {}", self.kind, self.right.signature(), condition)
    }
}

/// One SELECT branch with its clause set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Select {
    pub distinct:   bool,
    pub projection: Vec<Projection>,
    pub from:       Option<TableRef>,
    pub joins:      Vec<Join>,
    pub predicates: Vec<Expr>,
    pub group_by:   Vec<Expr>,
    pub having:     Vec<Expr>,
    /// `QUALIFY` conjuncts
    pub qualify:    Vec<Expr>,
    /// Window specifications collected from the projection
    pub windows:    Vec<WindowSpec>
}

impl Select {
    /// `FROM` root followed by the right side of every join.
    pub fn sources(&self) -> impl Iterator<Item = &TableRef> {
        self.from
            .iter()
            .chain(self.joins.iter().map(|join| &join.right))
    }

    /// Names the sources are addressable by.
    pub fn bindings(&self) -> IndexSet<&str> {
        self.sources().map(TableRef::binding).collect()
    }

    /// Every expression held directly by this SELECT.
    pub fn expressions(&self) -> impl Iterator<Item = &Expr> {
        let join_conditions = self.joins.iter().filter_map(|join| match &join.constraint {
            Some(JoinConstraint::On(expr)) => Some(expr),
            _ => None
        });
        self.projection
            .iter()
            .map(|p| &p.expr)
            .chain(join_conditions)
            .chain(&self.predicates)
            .chain(&self.group_by)
            .chain(&self.having)
            .chain(&self.qualify)
    }

    /// WHERE or QUALIFY drops rows.
    pub fn is_filtered(&self) -> bool {
        !self.predicates.is_empty() || !self.qualify.is_empty()
    }

    /// Whether the SELECT groups or aggregates its input.
    pub fn is_aggregate(&self) -> bool {
        !self.group_by.is_empty() || self.projection.iter().any(|p| p.expr.contains_aggregate())
    }

    /// Single source, no filtering, joining or reshaping.
    pub fn is_pass_through(&self) -> bool {
        self.from.is_some()
            && self.joins.is_empty()
            && self.predicates.is_empty()
            && self.group_by.is_empty()
            && self.having.is_empty()
            && self.qualify.is_empty()
            && !self.distinct
            && self
                .projection
                .iter()
                .all(|p| matches!(p.expr, Expr::Column(_) | Expr::Wildcard { .. }))
    }

    fn signature(&self) -> String {
        let mut sig = String::from("select");
        if self.distinct {
            sig.push_str(" distinct");
        }
        let projection: Vec<Expr> = self.projection.iter().map(|p| p.expr.clone()).collect();
        let _ = write!(sig, " [{}]", join_canonical(&projection));
        if let Some(from) = &self.from {
            let _ = write!(sig, " from {}", from.signature());
        }
        for join in &self.joins {
            let _ = write!(sig, " {}", join.signature());
        }
        if !self.predicates.is_empty() {
            let _ = write!(sig, " where[{}]", join_canonical(&self.predicates));
        }
        if !self.group_by.is_empty() {
            let _ = write!(sig, " group[{}]", join_canonical(&self.group_by));
        }
        if !self.having.is_empty() {
            let _ = write!(sig, " having[{}]", join_canonical(&self.having));
        }
        if !self.qualify.is_empty() {
            let _ = write!(sig, " qualify[{}]", join_canonical(&self.qualify));
        }
        sig
    }
}
