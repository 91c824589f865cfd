use query_pattern_analyzer::{
    ingest::{RawExpr, RawSourceKind},
    model::{JoinKind, SetOperation},
    parse::{SqlDialect, parse_sql}
};

#[test]
fn test_with_clause_becomes_ctes() {
    let sql = "WITH a AS (SELECT id FROM t), b AS (SELECT id FROM a) SELECT * FROM b";
    let queries = parse_sql(sql, SqlDialect::Generic).unwrap();
    assert_eq!(queries.len(), 1);
    let names: Vec<_> = queries[0]
        .ctes
        .iter()
        .map(|c| c.name.clone().unwrap())
        .collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn test_non_query_statements_are_skipped() {
    let sql = "CREATE TABLE t (id INT); SELECT id FROM t; DROP TABLE t;";
    let queries = parse_sql(sql, SqlDialect::Generic).unwrap();
    assert_eq!(queries.len(), 1);
}

#[test]
fn test_insert_select_keeps_query() {
    let sql = "INSERT INTO archive SELECT * FROM orders WHERE status = 'closed'";
    let queries = parse_sql(sql, SqlDialect::Generic).unwrap();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].body.branches[0].predicates.len(), 1);
}

#[test]
fn test_create_table_as_keeps_query() {
    let sql = "CREATE TABLE snapshot AS SELECT id FROM orders";
    let queries = parse_sql(sql, SqlDialect::Generic).unwrap();
    assert_eq!(queries.len(), 1);
}

#[test]
fn test_comma_join_is_cross() {
    let queries = parse_sql("SELECT * FROM a, b", SqlDialect::Generic).unwrap();
    let select = &queries[0].body.branches[0];
    assert_eq!(select.joins.len(), 1);
    assert_eq!(select.joins[0].kind, Some(JoinKind::Cross));
    assert!(select.joins[0].left.is_none());
}

#[test]
fn test_join_kinds() {
    let sql = "SELECT * FROM a JOIN b ON a.id = b.id LEFT JOIN c ON a.id = c.id FULL OUTER JOIN d ON a.id = d.id";
    let queries = parse_sql(sql, SqlDialect::Generic).unwrap();
    let kinds: Vec<_> = queries[0].body.branches[0]
        .joins
        .iter()
        .map(|j| j.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![Some(JoinKind::Inner), Some(JoinKind::Left), Some(JoinKind::Full)]
    );
}

#[test]
fn test_union_all_branches() {
    let sql = "SELECT 1 UNION ALL SELECT 2 UNION SELECT 3 EXCEPT SELECT 4";
    let queries = parse_sql(sql, SqlDialect::Generic).unwrap();
    let body = &queries[0].body;
    assert_eq!(body.branches.len(), 4);
    assert_eq!(
        body.set_operations,
        vec![SetOperation::UnionAll, SetOperation::Union, SetOperation::Except]
    );
}

#[test]
fn test_order_by_and_limit() {
    let queries = parse_sql("SELECT id FROM t ORDER BY id LIMIT 5", SqlDialect::Generic).unwrap();
    assert_eq!(queries[0].body.order_by.len(), 1);
    assert_eq!(queries[0].body.limit, Some(5));
}

#[test]
fn test_derived_table_keeps_subquery() {
    let sql = "SELECT x.id FROM (SELECT id FROM t) x";
    let queries = parse_sql(sql, SqlDialect::Generic).unwrap();
    let from = queries[0].body.branches[0].from.as_ref().unwrap();
    assert!(from.subquery.is_some());
    assert_eq!(from.alias.as_deref(), Some("x"));
    assert_ne!(from.kind, Some(RawSourceKind::Cte));
}

#[test]
fn test_window_function_is_kept() {
    let sql = "SELECT ROW_NUMBER() OVER (PARTITION BY a ORDER BY b) FROM t";
    let queries = parse_sql(sql, SqlDialect::Generic).unwrap();
    let expr = &queries[0].body.branches[0].projection[0].expr;
    assert!(matches!(
        expr,
        RawExpr::Function {
            over: Some(_),
            ..
        }
    ));
}

#[test]
fn test_snowflake_dialect() {
    let sql = "SELECT id FROM raw.events QUALIFY ROW_NUMBER() OVER (PARTITION BY id ORDER BY ts DESC) = 1";
    assert!(parse_sql(sql, SqlDialect::Snowflake).is_ok());
}

#[test]
fn test_qualify_is_kept() {
    let sql = "SELECT id FROM raw.events QUALIFY ROW_NUMBER() OVER (PARTITION BY id ORDER BY ts DESC) = 1";
    let queries = parse_sql(sql, SqlDialect::Snowflake).unwrap();
    let select = &queries[0].body.branches[0];
    assert!(select.predicates.is_empty());
    assert_eq!(select.qualify.len(), 1);
}

#[test]
fn test_string_functions_become_calls() {
    let sql = "SELECT id FROM users WHERE TRIM(a) = 'x' AND POSITION('@' IN b) > 0 AND SUBSTRING(c, 1, 2) = 'ab'";
    let queries = parse_sql(sql, SqlDialect::Generic).unwrap();
    let rendered = serde_json::to_string(&queries[0].body.branches[0].predicates).unwrap();
    for name in ["\"trim\"", "\"position\"", "\"substring\""] {
        assert!(rendered.contains(name), "{} missing from {}", name, rendered);
    }
}

#[test]
fn test_syntax_error() {
    assert!(parse_sql("SELECT id FROM", SqlDialect::Generic).is_err());
}

#[test]
fn test_empty_input() {
    assert!(parse_sql("", SqlDialect::Generic).unwrap().is_empty());
}
