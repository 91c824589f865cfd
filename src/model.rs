//! Normalized query model.
//!
//! A [`QueryModel`] is the immutable representation of one compiled SQL
//! statement that every rule reads: the CTE definitions in declaration
//! order, followed by the outermost body.
//!
//! ```text
//! QueryModel
//! ├── ctes: [Cte { name, body: QueryBody }, …]   (declaration order)
//! └── body: QueryBody                            (final SELECT)
//!
//! QueryBody ── branches: [Select] joined by set_operations
//!           ── order_by, limit
//!
//! Select    ── projection, from, joins, predicates,
//!              group_by, having, windows
//! ```
//!
//! Models are produced by [`crate::ingest`], either from a deserialized
//! parse tree or from SQL text through [`crate::parse`]. They can also be
//! assembled by hand, which is how most rule tests build their inputs.

mod expr;
mod types;

use compact_str::CompactString;
pub use expr::{BinaryOp, ColumnRef, Expr, FunctionCall, Literal, WindowSpec};
use serde::Serialize;
pub use types::{
    ColumnVec, Cte, Join, JoinConstraint, JoinKind, Projection, QueryBody, Select, SetOperation,
    Source, TableRef
};

/// Parsed representation of one compiled SQL statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryModel {
    pub ctes: Vec<Cte>,
    pub body: QueryBody
}

/// Part of a statement a clause belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    Cte {
        index: usize,
        name:  CompactString
    },
    Final
}

impl Scope {
    /// Declaration position; the final SELECT sorts after every CTE.
    pub fn position(&self) -> usize {
        match self {
            Self::Cte {
                index, ..
            } => *index,
            Self::Final => usize::MAX
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cte {
                name, ..
            } => write!(f, "CTE `{}`", name),
            Self::Final => write!(f, "final SELECT")
        }
    }
}

/// Physical origin a table reference resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Base(CompactString),
    Cte(usize),
    Derived
}

/// A CTE index that does not exist in the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DanglingCte(pub usize);

impl QueryModel {
    pub fn new(ctes: Vec<Cte>, body: QueryBody) -> Self {
        Self {
            ctes,
            body
        }
    }

    /// No CTEs and no final SELECT branches.
    pub fn is_empty(&self) -> bool {
        self.ctes.is_empty() && self.body.is_empty()
    }

    pub fn cte(&self, index: usize) -> Option<&Cte> {
        self.ctes.get(index)
    }

    pub fn cte_index(&self, name: &str) -> Option<usize> {
        self.ctes.iter().position(|cte| cte.name == name)
    }

    pub fn scope_of(&self, index: usize) -> Scope {
        match self.ctes.get(index) {
            Some(cte) => Scope::Cte {
                index,
                name: cte.name.clone()
            },
            None => Scope::Final
        }
    }

    /// Every scope with its body: CTEs in declaration order, then the
    /// final SELECT.
    pub fn scopes(&self) -> impl Iterator<Item = (Scope, &QueryBody)> {
        self.ctes
            .iter()
            .enumerate()
            .map(|(index, cte)| {
                (
                    Scope::Cte {
                        index,
                        name: cte.name.clone()
                    },
                    &cte.body
                )
            })
            .chain(std::iter::once((Scope::Final, &self.body)))
    }

    /// Top-level SELECT branches that read CTE `index` directly in their
    /// `FROM` or `JOIN` list, with the scope they belong to.
    pub fn direct_readers(&self, index: usize) -> Vec<(Scope, &Select)> {
        self.scopes()
            .filter(|(scope, _)| scope.position() > index)
            .flat_map(|(scope, body)| {
                body.branches
                    .iter()
                    .filter(move |select| {
                        select
                            .sources()
                            .any(|t| matches!(t.source, Source::Cte(i) if i == index))
                    })
                    .map(move |select| (scope.clone(), select))
            })
            .collect()
    }

    /// Whether CTE `index` is read anywhere after its declaration.
    pub fn is_referenced(&self, index: usize) -> bool {
        self.scopes()
            .filter(|(scope, _)| scope.position() > index)
            .any(|(_, body)| body.referenced_ctes().contains(&index))
    }

    /// Resolve a table reference to what it physically reads.
    ///
    /// References to pass-through CTEs (a single unfiltered projection of
    /// one source) are followed to their source.
    pub fn resolve(&self, table: &TableRef) -> Result<Target, DanglingCte> {
        match &table.source {
            Source::Base => Ok(Target::Base(table.name.clone())),
            Source::Derived(_) => Ok(Target::Derived),
            Source::Cte(index) => {
                let cte = self.cte(*index).ok_or(DanglingCte(*index))?;
                match cte.body.branches.as_slice() {
                    [select] if select.is_pass_through() && cte.body.set_operations.is_empty() => {
                        match &select.from {
                            Some(from) if !matches!(from.source, Source::Cte(i) if i >= *index) => {
                                self.resolve(from)
                            }
                            _ => Ok(Target::Cte(*index))
                        }
                    }
                    _ => Ok(Target::Cte(*index))
                }
            }
        }
    }
}
