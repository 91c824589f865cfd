use query_pattern_analyzer::{
    error::MalformedReason,
    ingest::{RawQuery, ingest, ingest_all},
    model::{Scope, Source, Target},
    parse::{SqlDialect, parse_sql}
};

fn from_json(json: &str) -> RawQuery {
    serde_json::from_str(json).unwrap()
}

fn from_sql(sql: &str) -> RawQuery {
    parse_sql(sql, SqlDialect::Generic).unwrap().remove(0)
}

#[test]
fn test_empty_query_is_valid() {
    let model = ingest(RawQuery::default()).unwrap();
    assert!(model.is_empty());
    assert!(model.ctes.is_empty());
}

#[test]
fn test_cte_chain_resolves() {
    let model = ingest(from_sql(
        "WITH a AS (SELECT id FROM raw.t), b AS (SELECT id FROM a) SELECT * FROM b"
    ))
    .unwrap();
    assert_eq!(model.ctes.len(), 2);
    let from_b = model.ctes[1].body.branches[0].from.as_ref().unwrap();
    assert_eq!(from_b.source, Source::Cte(0));
    assert_eq!(model.resolve(from_b), Ok(Target::Base("raw.t".into())));
    let final_from = model.body.branches[0].from.as_ref().unwrap();
    assert_eq!(final_from.source, Source::Cte(1));
}

#[test]
fn test_identifiers_are_normalized() {
    let model = ingest(from_sql(
        r#"WITH "Recent" AS (SELECT id FROM RAW.Orders) SELECT * FROM recent"#
    ))
    .unwrap();
    assert_eq!(model.ctes[0].name, "recent");
    let from = model.ctes[0].body.branches[0].from.as_ref().unwrap();
    assert_eq!(from.name, "raw.orders");
    assert_eq!(model.body.branches[0].from.as_ref().unwrap().source, Source::Cte(0));
}

#[test]
fn test_filtered_cte_is_not_followed() {
    let model = ingest(from_sql(
        "WITH a AS (SELECT id FROM raw.t WHERE id > 0) SELECT * FROM a"
    ))
    .unwrap();
    let from = model.body.branches[0].from.as_ref().unwrap();
    assert_eq!(model.resolve(from), Ok(Target::Cte(0)));
}

#[test]
fn test_where_is_split_into_conjuncts() {
    let model = ingest(from_sql("SELECT id FROM t WHERE a = 1 AND b > 2 AND c IS NULL")).unwrap();
    assert_eq!(model.body.branches[0].predicates.len(), 3);
}

#[test]
fn test_scope_positions() {
    let model = ingest(from_sql("WITH a AS (SELECT 1), b AS (SELECT 2) SELECT * FROM a, b")).unwrap();
    let positions: Vec<usize> = model.scopes().map(|(scope, _)| scope.position()).collect();
    assert_eq!(positions, vec![0, 1, 2]);
    assert_eq!(model.scopes().last().unwrap().0, Scope::Final);
}

#[test]
fn test_duplicate_cte_rejected() {
    let err = ingest(from_sql("WITH a AS (SELECT 1), A AS (SELECT 2) SELECT * FROM a")).unwrap_err();
    assert_eq!(err.reason, MalformedReason::DuplicateCte);
}

#[test]
fn test_forward_reference_rejected() {
    let err = ingest(from_sql("WITH a AS (SELECT * FROM b), b AS (SELECT 1) SELECT * FROM a"))
        .unwrap_err();
    assert_eq!(err.reason, MalformedReason::ForwardReference);
    assert!(err.detail.contains('b'));
}

#[test]
fn test_unresolved_cte_rejected() {
    let err = ingest(from_json(
        r#"{"version": 1, "body": {"branches": [{"from": {"name": "ghost", "kind": "cte"}}]}}"#
    ))
    .unwrap_err();
    assert_eq!(err.reason, MalformedReason::UnresolvedCte);
}

#[test]
fn test_missing_cte_name_rejected() {
    let err = ingest(from_json(
        r#"{"ctes": [{"body": {"branches": []}}], "body": {"branches": []}}"#
    ))
    .unwrap_err();
    assert_eq!(err.reason, MalformedReason::MissingField);
}

#[test]
fn test_missing_join_kind_rejected() {
    let err = ingest(from_json(
        r#"{"body": {"branches": [{"from": {"name": "a"}, "joins": [{"right": {"name": "b"}}]}]}}"#
    ))
    .unwrap_err();
    assert_eq!(err.reason, MalformedReason::MissingField);
}

#[test]
fn test_unsupported_version_rejected() {
    let err = ingest(from_json(r#"{"version": 2, "body": {"branches": []}}"#)).unwrap_err();
    assert_eq!(err.reason, MalformedReason::UnsupportedVersion);
}

#[test]
fn test_ingest_all_stops_at_first_malformed() {
    let good = from_sql("SELECT 1");
    let bad = from_json(r#"{"version": 9}"#);
    assert!(ingest_all(vec![good.clone(), bad, good]).is_err());
}

#[test]
fn test_window_specs_are_collected() {
    let model = ingest(from_sql(
        "SELECT ROW_NUMBER() OVER (PARTITION BY a ORDER BY b), SUM(x) OVER (PARTITION BY a) FROM t"
    ))
    .unwrap();
    assert_eq!(model.body.branches[0].windows.len(), 2);
}
