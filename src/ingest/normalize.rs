use std::sync::LazyLock;

use compact_str::CompactString;
use regex::Regex;

/// Quoted identifier part: `"x"`, `` `x` `` or `[x]`.
static QUOTED_PART: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(?:"(?P<dq>.*)"|`(?P<bq>.*)`|\[(?P<sq>.*)\])$"#).expect("valid regex")
});

/// Normalize one identifier part: strip quoting, lowercase.
pub fn normalize_part(part: &str) -> CompactString {
    let part = part.trim();
    let unquoted = QUOTED_PART
        .captures(part)
        .and_then(|caps| caps.name("dq").or(caps.name("bq")).or(caps.name("sq")))
        .map_or(part, |m| m.as_str());
    unquoted.to_lowercase().into()
}

/// Normalize a possibly multi-part identifier (`db.schema.table`).
pub fn normalize_identifier(name: &str) -> CompactString {
    let parts: Vec<CompactString> = split_parts(name).iter().map(|p| normalize_part(p)).collect();
    parts.join(".").into()
}

/// Split on dots that are not inside quotes.
fn split_parts(name: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    for (i, c) in name.char_indices() {
        match (quote, c) {
            (None, '"' | '`') => quote = Some(c),
            (None, '[') => quote = Some(']'),
            (Some(q), c) if c == q => quote = None,
            (None, '.') => {
                parts.push(&name[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&name[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plain() {
        assert_eq!(normalize_identifier("Orders"), "orders");
    }

    #[test]
    fn test_normalize_multi_part_quoted() {
        assert_eq!(
            normalize_identifier(r#"SNOWFLAKE."ACCOUNT_USAGE".Query_History"#),
            "snowflake.account_usage.query_history"
        );
    }

    #[test]
    fn test_normalize_quoted_dot_is_kept() {
        assert_eq!(normalize_identifier(r#""a.b".c"#), "a.b.c");
        assert_eq!(split_parts(r#""a.b".c"#).len(), 2);
    }

    #[test]
    fn test_normalize_brackets_and_backticks() {
        assert_eq!(normalize_part("[Users]"), "users");
        assert_eq!(normalize_part("`Users`"), "users");
    }
}
