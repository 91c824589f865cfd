//! Versioned parse-tree schema accepted by the ingestor.
//!
//! Any parser adapter that emits this shape, as JSON, YAML or in-process
//! values, can feed the analyzer. The bundled [`crate::parse`] adapter
//! produces it from SQL text; `query-pattern-analyzer parse <file>` prints
//! it for reference.
//!
//! # Schema version 1
//!
//! ```json
//! {
//!   "version": 1,
//!   "ctes": [
//!     {
//!       "name": "recent_orders",
//!       "body": {
//!         "branches": [{
//!           "projection": [{ "expr": { "kind": "column", "name": "id" } }],
//!           "from": { "name": "shop.orders", "alias": "o" },
//!           "joins": [{
//!             "kind": "left",
//!             "right": { "name": "customers", "alias": "c" },
//!             "constraint": {
//!               "type": "on",
//!               "condition": {
//!                 "kind": "binary", "op": "eq",
//!                 "left":  { "kind": "column", "qualifier": "o", "name": "customer_id" },
//!                 "right": { "kind": "column", "qualifier": "c", "name": "id" }
//!               }
//!             }
//!           }],
//!           "predicates": [{
//!             "kind": "binary", "op": "gt",
//!             "left":  { "kind": "column", "name": "created_at" },
//!             "right": { "kind": "literal", "value": { "string": "2024-01-01" } }
//!           }]
//!         }],
//!         "set_operations": [],
//!         "order_by": [],
//!         "limit": null
//!       }
//!     }
//!   ],
//!   "body": { "branches": [{ "from": { "name": "recent_orders", "kind": "cte" } }] }
//! }
//! ```
//!
//! Required fields are modelled as `Option` so that their absence surfaces
//! as a [`MalformedQueryError`](crate::error::MalformedQueryError) with
//! context, rather than as an opaque decoding failure:
//!
//! | Field | Required |
//! |-------|----------|
//! | `ctes[].name`, `ctes[].body` | yes |
//! | `joins[].kind`, `joins[].right` | yes |
//! | `joins[].left` | no, defaults to the `FROM` root |
//! | table `name` or `subquery` | one of them |
//! | table `kind` (`table` / `cte`) | no, resolved by name |

use serde::{Deserialize, Serialize};

use crate::model::{BinaryOp, JoinKind, Literal, SetOperation};

/// Schema version this build reads and writes.
pub const SCHEMA_VERSION: u32 = 1;

fn schema_version() -> u32 {
    SCHEMA_VERSION
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Parse tree of one statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawQuery {
    #[serde(default = "schema_version")]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ctes:    Vec<RawCte>,
    #[serde(default)]
    pub body:    RawBody
}

impl Default for RawQuery {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            ctes:    Vec::new(),
            body:    RawBody::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCte {
    pub name: Option<String>,
    pub body: Option<RawBody>
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawBody {
    #[serde(default)]
    pub branches:       Vec<RawSelect>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub set_operations: Vec<SetOperation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by:       Vec<RawExpr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit:          Option<u64>
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSelect {
    #[serde(default, skip_serializing_if = "is_false")]
    pub distinct:   bool,
    #[serde(default)]
    pub projection: Vec<RawProjection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from:       Option<RawTableRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub joins:      Vec<RawJoin>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub predicates: Vec<RawExpr>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_by:   Vec<RawExpr>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub having:     Vec<RawExpr>,
    /// Filter over window results (Snowflake, BigQuery, DuckDB)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qualify:    Vec<RawExpr>
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawProjection {
    pub expr:  RawExpr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>
}

/// Explicit classification of a table reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawSourceKind {
    Table,
    Cte
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTableRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name:     Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias:    Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind:     Option<RawSourceKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subquery: Option<Box<RawBody>>
}

impl RawTableRef {
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawJoinConstraint {
    On { condition: RawExpr },
    Using { columns: Vec<String> },
    Natural
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawJoin {
    pub kind:       Option<JoinKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left:       Option<RawTableRef>,
    pub right:      Option<RawTableRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<RawJoinConstraint>
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawWindow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name:         Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partition_by: Vec<RawExpr>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by:     Vec<RawExpr>
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawWhen {
    pub condition: RawExpr,
    pub result:    RawExpr
}

/// Expression node, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawExpr {
    Column {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        qualifier: Option<String>,
        name:      String
    },
    Literal {
        value: Literal
    },
    Wildcard {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        qualifier: Option<String>
    },
    Function {
        name:     String,
        #[serde(default)]
        args:     Vec<RawExpr>,
        #[serde(default, skip_serializing_if = "is_false")]
        distinct: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        over:     Option<RawWindow>
    },
    Binary {
        op:    BinaryOp,
        left:  Box<RawExpr>,
        right: Box<RawExpr>
    },
    Unary {
        op:   String,
        expr: Box<RawExpr>
    },
    InList {
        expr:    Box<RawExpr>,
        list:    Vec<RawExpr>,
        #[serde(default)]
        negated: bool
    },
    Between {
        expr:    Box<RawExpr>,
        low:     Box<RawExpr>,
        high:    Box<RawExpr>,
        #[serde(default)]
        negated: bool
    },
    IsNull {
        expr:    Box<RawExpr>,
        #[serde(default)]
        negated: bool
    },
    Case {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operand:     Option<Box<RawExpr>>,
        conditions:  Vec<RawWhen>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        else_result: Option<Box<RawExpr>>
    },
    Cast {
        expr:      Box<RawExpr>,
        data_type: String
    },
    Subquery {
        query: Box<RawBody>
    },
    Exists {
        query:   Box<RawBody>,
        #[serde(default)]
        negated: bool
    },
    InSubquery {
        expr:    Box<RawExpr>,
        query:   Box<RawBody>,
        #[serde(default)]
        negated: bool
    },
    Raw {
        sql: String
    }
}

impl RawExpr {
    pub fn column(qualifier: Option<&str>, name: &str) -> Self {
        Self::Column {
            qualifier: qualifier.map(str::to_string),
            name:      name.to_string()
        }
    }
}

/// Top-level document: a single statement or a list of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDocument {
    Many(Vec<RawQuery>),
    One(RawQuery)
}

impl RawDocument {
    pub fn into_queries(self) -> Vec<RawQuery> {
        match self {
            Self::Many(queries) => queries,
            Self::One(query) => vec![query]
        }
    }
}
