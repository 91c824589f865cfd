use colored::{ColoredString, Colorize};

use crate::{
    ingest::RawQuery,
    report::Report,
    rules::{RuleInfo, Severity}
};

/// Output format for results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml
}

impl OutputFormat {
    /// Parse a config file value
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None
        }
    }
}

/// Output options
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format:  OutputFormat,
    pub colored: bool,
    pub verbose: bool
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format:  OutputFormat::Text,
            colored: true,
            verbose: false
        }
    }
}

/// Format an analysis report based on output options
pub fn format_report(report: &Report, opts: &OutputOptions) -> String {
    match opts.format {
        OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
        OutputFormat::Yaml => serde_yaml::to_string(report).unwrap_or_default(),
        OutputFormat::Text => format_text_report(report, opts)
    }
}

/// Format the built-in rule list
pub fn format_rules(rules: &[RuleInfo], opts: &OutputOptions) -> String {
    match opts.format {
        OutputFormat::Json => serde_json::to_string_pretty(rules).unwrap_or_default(),
        OutputFormat::Yaml => serde_yaml::to_string(rules).unwrap_or_default(),
        OutputFormat::Text => {
            let width = rules.iter().map(|r| r.id.len()).max().unwrap_or(0);
            let mut out = String::new();
            for rule in rules {
                let id = format!("{:<width$}", rule.id, width = width);
                out.push_str(&format!(
                    "{}  {}  {:<11}  {}\n",
                    paint(&id, opts, |s| s.bold()),
                    severity_label(rule.severity, opts),
                    rule.category.to_string(),
                    rule.description
                ));
            }
            out
        }
    }
}

/// Serialize raw parse trees; text falls back to JSON
pub fn format_raw_queries(queries: &[RawQuery], format: OutputFormat) -> String {
    match format {
        OutputFormat::Yaml => serde_yaml::to_string(queries).unwrap_or_default(),
        OutputFormat::Json | OutputFormat::Text => {
            serde_json::to_string_pretty(queries).unwrap_or_default()
        }
    }
}

fn paint(text: &str, opts: &OutputOptions, style: fn(&str) -> ColoredString) -> String {
    if opts.colored {
        style(text).to_string()
    } else {
        text.to_string()
    }
}

fn severity_label(severity: Severity, opts: &OutputOptions) -> String {
    let label = format!("[{}]", severity);
    match severity {
        Severity::Critical => paint(&label, opts, |s| s.red().bold()),
        Severity::Warning => paint(&label, opts, |s| s.yellow()),
        Severity::Info => paint(&label, opts, |s| s.blue())
    }
}

fn format_text_report(report: &Report, opts: &OutputOptions) -> String {
    let mut out = String::new();
    out.push_str(&paint("=== Query Pattern Analysis ===", opts, |s| s.bold()));
    out.push_str("\n\n");

    if report.findings().is_empty() {
        out.push_str(&paint("No anti-patterns found.", opts, |s| s.green()));
        out.push_str("\n\n");
    }

    for finding in report.findings() {
        out.push_str(&format!(
            "{} {} ({})\n",
            severity_label(finding.severity, opts),
            paint(finding.rule, opts, |s| s.cyan().bold()),
            finding.location
        ));
        out.push_str(&format!("  {}\n", finding.rationale));
        if let Some(suggestion) = &finding.suggestion {
            out.push_str(&format!("  {} {}\n", paint("->", opts, |s| s.green()), suggestion));
        }
        if opts.verbose {
            out.push_str(&format!("  cost x{}\n", finding.cost_multiplier));
        }
        out.push('\n');
    }

    let counts = report.counts();
    let critical = format!("{} critical", counts.critical);
    let warning = format!("{} warning", counts.warning);
    let info = format!("{} info", counts.info);
    out.push_str(&format!(
        "Summary: {}, {}, {} ({} statements, {} rules)\n",
        paint(&critical, opts, |s| s.red()),
        paint(&warning, opts, |s| s.yellow()),
        paint(&info, opts, |s| s.blue()),
        report.statements_analyzed(),
        report.rules_executed()
    ));

    let width = report.summary().keys().map(|id| id.len()).max().unwrap_or(0);
    for (rule, count) in report.summary() {
        if *count == 0 && !opts.verbose {
            continue;
        }
        out.push_str(&format!("  {:<width$}  {}\n", rule, count, width = width));
    }

    out
}
