use query_pattern_analyzer::{
    ingest::ingest_all,
    output::{OutputFormat, OutputOptions, format_raw_queries, format_report, format_rules},
    parse::{SqlDialect, parse_sql},
    report::Report,
    rules::RuleRunner
};

fn report(sql: &str) -> Report {
    let models = ingest_all(parse_sql(sql, SqlDialect::Generic).unwrap()).unwrap();
    RuleRunner::new().analyze(&models)
}

fn opts(format: OutputFormat) -> OutputOptions {
    OutputOptions {
        format,
        colored: false,
        verbose: false
    }
}

#[test]
fn test_json_report_shape() {
    let out = format_report(&report("SELECT * FROM a CROSS JOIN b"), &opts(OutputFormat::Json));
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    let finding = &value["findings"][0];
    assert_eq!(finding["rule"], "cross-join-without-filter");
    assert_eq!(finding["severity"], "critical");
    assert_eq!(finding["location"]["scope"]["kind"], "final");
    assert_eq!(finding["location"]["clause"], "join");
    assert_eq!(finding["cost_multiplier"], 100.0);
    assert!(finding["suggestion"].is_string());
    assert_eq!(value["summary"]["cross-join-without-filter"], 1);
    assert_eq!(value["summary"]["unused-cte"], 0);
    assert_eq!(value["counts"]["critical"], 1);
}

#[test]
fn test_json_summary_keeps_registration_order() {
    let out = format_report(&report("SELECT 1"), &opts(OutputFormat::Json));
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    let keys: Vec<&String> = value["summary"].as_object().unwrap().keys().collect();
    assert_eq!(keys.len(), 11);
    assert_eq!(keys[0], "unfiltered-full-scan");
}

#[test]
fn test_yaml_report() {
    let out = format_report(
        &report("WITH a AS (SELECT 1) SELECT 2"),
        &opts(OutputFormat::Yaml)
    );
    assert!(out.contains("rule: unused-cte"));
    assert!(out.contains("kind: cte"));
    assert!(out.contains("name: a"));
}

#[test]
fn test_text_report_plain() {
    let out = format_report(&report("SELECT * FROM a CROSS JOIN b"), &opts(OutputFormat::Text));
    assert!(out.contains("[CRIT] cross-join-without-filter (statement #1, final SELECT, JOIN)"));
    assert!(out.contains("Summary: 1 critical, 0 warning, 0 info (1 statements, 11 rules)"));
    assert!(!out.contains("\u{1b}["));
}

#[test]
fn test_text_report_colored() {
    colored::control::set_override(true);
    let colored_opts = OutputOptions {
        format:  OutputFormat::Text,
        colored: true,
        verbose: false
    };
    let out = format_report(&report("SELECT * FROM a CROSS JOIN b"), &colored_opts);
    assert!(out.contains("\u{1b}["));
}

#[test]
fn test_rules_listing() {
    let rules = RuleRunner::new().rules();
    let text = format_rules(&rules, &opts(OutputFormat::Text));
    assert_eq!(text.lines().count(), 11);
    assert!(text.contains("[CRIT]"));

    let json = format_rules(&rules, &opts(OutputFormat::Json));
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value.as_array().unwrap().len(), 11);
    assert_eq!(value[0]["category"], "scan");
}

#[test]
fn test_raw_tree_formats() {
    let queries = parse_sql("WITH a AS (SELECT 1) SELECT * FROM a", SqlDialect::Generic).unwrap();
    let json = format_raw_queries(&queries, OutputFormat::Json);
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value[0]["version"], 1);
    assert_eq!(value[0]["ctes"][0]["name"], "a");

    let yaml = format_raw_queries(&queries, OutputFormat::Yaml);
    assert!(yaml.contains("version: 1"));
}
