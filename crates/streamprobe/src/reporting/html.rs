//! Self-contained HTML run report.

use super::outcome::{RunSummary, ScenarioOutcome, ScenarioStatus};
use super::ReportError;
use crate::config::{HtmlConfig, HtmlTheme};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const FALLBACK_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const BASE_CSS: &str = "\
body { font-family: -apple-system, 'Segoe UI', Roboto, sans-serif; margin: 0; padding: 24px; }
h1 { margin: 0 0 4px 0; } h2 { margin-top: 32px; }
.subtitle { opacity: .7; margin-bottom: 24px; }
.cards { display: flex; gap: 16px; flex-wrap: wrap; }
.card { border-radius: 6px; padding: 16px 24px; min-width: 120px; }
.card .count { font-size: 2em; font-weight: bold; }
.table { width: 100%; border-collapse: collapse; margin-top: 12px; }
.table td, .table th { padding: 8px; text-align: left; vertical-align: top; }
.badge { border-radius: 4px; padding: 2px 8px; font-size: .85em; }
.badge-pass { background-color: #00af00; color: #ffffff; }
.badge-fail { background-color: #f44336; color: #ffffff; }
.badge-skip { background-color: #ff9800; color: #ffffff; }
.badge-info { background-color: #2196f3; color: #ffffff; margin-right: 4px; }
.error { white-space: pre-wrap; font-family: monospace; }
";

const DARK_CSS: &str = "\
body.dark { background-color: #1a1a1a; color: #ffffff; }
.dark .card { background-color: #2d2d2d; box-shadow: 0 2px 6px rgba(0,0,0,0.5); }
.dark .table { color: #ffffff; }
.dark .table td, .dark .table th { border-top: 1px solid #404040; }
.dark .table thead th { border-bottom: 2px solid #404040; }
";

const STANDARD_CSS: &str = "\
body.standard { background-color: #f5f5f5; color: #212121; }
.standard .card { background-color: #ffffff; box-shadow: 0 1px 3px rgba(0,0,0,0.2); }
.standard .table td, .standard .table th { border-top: 1px solid #e0e0e0; }
.standard .table thead th { border-bottom: 2px solid #e0e0e0; }
";

/// Renders collected outcomes into a single HTML page: a dashboard with
/// counts, the scenario table grouped by feature, a tag index, and the
/// failures with their messages.
#[derive(Debug, Clone)]
pub struct HtmlReport {
    config: HtmlConfig,
    generated_at: DateTime<Utc>,
}

impl HtmlReport {
    pub fn new(config: HtmlConfig) -> Self {
        Self {
            config,
            generated_at: Utc::now(),
        }
    }

    pub fn with_generated_at(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = generated_at;
        self
    }

    pub fn out(&self) -> &Path {
        &self.config.out
    }

    pub fn render(&self, outcomes: &[ScenarioOutcome]) -> String {
        let summary = RunSummary::from_outcomes(outcomes);
        let theme = match self.config.theme {
            HtmlTheme::Dark => ("dark", DARK_CSS),
            HtmlTheme::Standard => ("standard", STANDARD_CSS),
        };

        let mut html = String::with_capacity(4096);
        let _ = write!(
            html,
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
             <title>{}</title>\n<style>\n{}{}</style>\n</head>\n<body class=\"{}\">\n",
            escape_html(&self.config.document_title),
            BASE_CSS,
            theme.1,
            theme.0
        );
        let _ = write!(
            html,
            "<h1>{}</h1>\n<div class=\"subtitle\">Generated {}</div>\n",
            escape_html(&self.config.report_name),
            escape_html(&self.timestamp(&self.generated_at))
        );

        self.render_dashboard(&mut html, &summary);
        self.render_scenarios(&mut html, outcomes);
        self.render_tags(&mut html, outcomes);
        self.render_failures(&mut html, outcomes);

        html.push_str("</body>\n</html>\n");
        html
    }

    /// Render and write the report, creating parent directories.
    pub fn write(&self, outcomes: &[ScenarioOutcome]) -> Result<PathBuf, ReportError> {
        let path = self.config.out.clone();
        let io_err = |source| ReportError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(&path, self.render(outcomes)).map_err(io_err)?;

        info!("Wrote HTML report to {}", path.display());
        Ok(path)
    }

    fn render_dashboard(&self, html: &mut String, summary: &RunSummary) {
        html.push_str("<div class=\"cards\">\n");
        for (label, count, badge) in [
            ("Total", summary.total(), "badge-info"),
            ("Passed", summary.passed, "badge-pass"),
            ("Failed", summary.failed, "badge-fail"),
            ("Skipped", summary.skipped, "badge-skip"),
        ] {
            let _ = write!(
                html,
                "<div class=\"card\"><span class=\"badge {badge}\">{label}</span>\
                 <div class=\"count\" id=\"count-{}\">{count}</div></div>\n",
                label.to_lowercase()
            );
        }
        html.push_str("</div>\n");
    }

    fn render_scenarios(&self, html: &mut String, outcomes: &[ScenarioOutcome]) {
        let mut by_feature: BTreeMap<&str, Vec<&ScenarioOutcome>> = BTreeMap::new();
        for outcome in outcomes {
            by_feature.entry(&outcome.feature).or_default().push(outcome);
        }

        for (feature, scenarios) in by_feature {
            let _ = write!(
                html,
                "<h2>{}</h2>\n<table class=\"table\">\n<thead><tr><th>Status</th>\
                 <th>Scenario</th><th>Tags</th><th>Started</th><th>Duration</th></tr></thead>\n<tbody>\n",
                escape_html(feature)
            );
            for outcome in scenarios {
                let tags: String = outcome
                    .tags
                    .iter()
                    .map(|tag| format!("<span class=\"badge badge-info\">{}</span>", escape_html(tag)))
                    .collect();
                let _ = write!(
                    html,
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:.3}s</td></tr>\n",
                    status_badge(outcome.status),
                    escape_html(&outcome.name),
                    tags,
                    escape_html(&self.timestamp(&outcome.started_at)),
                    outcome.duration.as_secs_f64()
                );
            }
            html.push_str("</tbody>\n</table>\n");
        }
    }

    fn render_tags(&self, html: &mut String, outcomes: &[ScenarioOutcome]) {
        let mut by_tag: BTreeMap<&str, RunSummary> = BTreeMap::new();
        for outcome in outcomes {
            for tag in &outcome.tags {
                let entry = by_tag.entry(tag).or_default();
                match outcome.status {
                    ScenarioStatus::Passed => entry.passed += 1,
                    ScenarioStatus::Failed => entry.failed += 1,
                    ScenarioStatus::Skipped => entry.skipped += 1,
                }
            }
        }
        if by_tag.is_empty() {
            return;
        }

        html.push_str(
            "<h2>Tags</h2>\n<table class=\"table\">\n<thead><tr><th>Tag</th><th>Passed</th>\
             <th>Failed</th><th>Skipped</th></tr></thead>\n<tbody>\n",
        );
        for (tag, counts) in by_tag {
            let _ = write!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                escape_html(tag),
                counts.passed,
                counts.failed,
                counts.skipped
            );
        }
        html.push_str("</tbody>\n</table>\n");
    }

    fn render_failures(&self, html: &mut String, outcomes: &[ScenarioOutcome]) {
        let failures: Vec<_> = outcomes
            .iter()
            .filter(|o| o.status == ScenarioStatus::Failed)
            .collect();
        if failures.is_empty() {
            return;
        }

        html.push_str("<h2>Failures</h2>\n");
        for outcome in failures {
            let _ = write!(
                html,
                "<div class=\"card\"><strong>{} / {}</strong><div class=\"error\">{}</div></div>\n",
                escape_html(&outcome.feature),
                escape_html(&outcome.name),
                escape_html(outcome.error.as_deref().unwrap_or("no error message recorded"))
            );
        }
    }

    fn timestamp(&self, at: &DateTime<Utc>) -> String {
        let format = if is_valid_format(&self.config.timestamp_format) {
            self.config.timestamp_format.as_str()
        } else {
            warn!(
                "Invalid timestamp format '{}', using {}",
                self.config.timestamp_format, FALLBACK_TIMESTAMP_FORMAT
            );
            FALLBACK_TIMESTAMP_FORMAT
        };
        at.format(format).to_string()
    }
}

fn is_valid_format(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

fn status_badge(status: ScenarioStatus) -> String {
    let class = match status {
        ScenarioStatus::Passed => "badge-pass",
        ScenarioStatus::Failed => "badge-fail",
        ScenarioStatus::Skipped => "badge-skip",
    };
    format!("<span class=\"badge {class}\">{status}</span>")
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
