//! Report rendering.
//!
//! Thin presentation layer over [`OkrReport`]: statuses are always taken
//! from the aggregation accessors, never recomputed here, so every output
//! format agrees on what the status of a node is. Two formats are
//! supported: Markdown for humans and JSON for downstream tooling.

use crate::error::Result;
use crate::model::{IssueState, IssueWithUpdates, Status, WeeklyUpdate};
use crate::okr::OkrReport;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;

/// Longest update excerpt shown under a report line.
const EXCERPT_LIMIT: usize = 200;

// =========================================================================
// Markdown
// =========================================================================

/// Render the report as a Markdown document.
#[must_use]
pub fn render_markdown(report: &OkrReport, title: &str, generated_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {title}");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "_Generated: {}_",
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "**Objectives:** {} | **Key Results:** {}",
        report.objectives.len(),
        report.total_key_results()
    );

    if report.objectives.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "_No objectives found._");
    }

    for objective in &report.objectives {
        let status = objective.objective_status();
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "## {} {} (#{})",
            status.emoji(),
            objective.issue.title,
            objective.issue.number
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "**Status:** {}", status.label());

        if let Some(update) = objective.latest_update() {
            let _ = writeln!(out);
            write_update_quote(&mut out, update, "");
        }

        if !objective.children.is_empty() {
            let _ = writeln!(out);
            for child in &objective.children {
                write_key_result(&mut out, child);
            }
        }
    }

    if !report.warnings.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "## Warnings");
        let _ = writeln!(out);
        for warning in &report.warnings {
            let _ = writeln!(out, "- {warning}");
        }
    }

    out
}

fn write_key_result(out: &mut String, child: &IssueWithUpdates) {
    let status = child.key_result_status();
    let _ = writeln!(
        out,
        "- {} [#{}]({}) {} \u{2014} {}",
        status.emoji(),
        child.issue.number,
        child.issue.url,
        child.issue.title,
        status.label()
    );
    if let Some(update) = child.latest_update() {
        write_update_quote(out, update, "  ");
    }
}

fn write_update_quote(out: &mut String, update: &WeeklyUpdate, indent: &str) {
    let _ = writeln!(
        out,
        "{indent}> **{}** ({}): {}",
        update.date,
        update.author,
        excerpt(&update.content)
    );
}

/// First line of the update body, truncated on a char boundary.
fn excerpt(content: &str) -> String {
    let first_line = content.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let trimmed = first_line.trim();
    if trimmed.chars().count() <= EXCERPT_LIMIT {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(EXCERPT_LIMIT).collect();
        format!("{cut}\u{2026}")
    }
}

// =========================================================================
// JSON
// =========================================================================

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    title: &'a str,
    generated_at: DateTime<Utc>,
    summary: JsonSummary,
    objectives: Vec<JsonNode<'a>>,
    warnings: &'a [String],
}

#[derive(Debug, Serialize)]
struct JsonSummary {
    objectives: usize,
    key_results: usize,
    warnings: usize,
}

#[derive(Debug, Serialize)]
struct JsonNode<'a> {
    number: u64,
    title: &'a str,
    url: &'a str,
    state: IssueState,
    status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    latest_update: Option<&'a WeeklyUpdate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    key_results: Vec<JsonNode<'a>>,
}

impl<'a> JsonNode<'a> {
    fn objective(node: &'a IssueWithUpdates) -> Self {
        Self {
            status: node.objective_status(),
            key_results: node.children.iter().map(Self::key_result).collect(),
            ..Self::common(node)
        }
    }

    fn key_result(node: &'a IssueWithUpdates) -> Self {
        Self {
            status: node.key_result_status(),
            key_results: Vec::new(),
            ..Self::common(node)
        }
    }

    fn common(node: &'a IssueWithUpdates) -> Self {
        Self {
            number: node.issue.number,
            title: &node.issue.title,
            url: &node.issue.url,
            state: node.issue.state,
            status: Status::Unknown,
            latest_update: node.latest_update(),
            key_results: Vec::new(),
        }
    }
}

/// Render the report as pretty-printed JSON.
pub fn render_json(report: &OkrReport, title: &str, generated_at: DateTime<Utc>) -> Result<String> {
    let doc = JsonReport {
        title,
        generated_at,
        summary: JsonSummary {
            objectives: report.objectives.len(),
            key_results: report.total_key_results(),
            warnings: report.warnings.len(),
        },
        objectives: report.objectives.iter().map(JsonNode::objective).collect(),
        warnings: &report.warnings,
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}
