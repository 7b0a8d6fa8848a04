//! Weekly-update extraction from raw issue comments.
//!
//! A comment qualifies as a weekly update iff its body matches, case
//! insensitively, `weekly update YYYY-MM-DD`. Status detection applies a
//! fixed priority order over keywords and emoji; the first rule that
//! matches wins. Both functions are pure string transforms with no network
//! dependency.

use crate::model::{RawComment, Status, WeeklyUpdate};
use regex::Regex;
use std::sync::OnceLock;

fn weekly_update_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)weekly\s+update\s+(\d{4}-\d{2}-\d{2})")
            .unwrap_or_else(|e| panic!("invalid weekly-update regex: {e}"))
    })
}

/// Convert raw comments into weekly updates, sorted newest-first.
///
/// Comments that do not match the weekly-update pattern are skipped. If
/// the date group fails to capture, the comment's creation date is used
/// instead. The sort is stable, so same-date updates keep their original
/// fetch order.
#[must_use]
pub fn parse_weekly_updates(comments: &[RawComment]) -> Vec<WeeklyUpdate> {
    let mut updates: Vec<WeeklyUpdate> = comments
        .iter()
        .filter_map(|comment| {
            let captures = weekly_update_re().captures(&comment.body)?;
            let date = captures
                .get(1)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| comment.created_at.format("%Y-%m-%d").to_string());
            Some(WeeklyUpdate {
                date,
                content: comment.body.clone(),
                author: comment.author.clone(),
                status: detect_status(&comment.body),
            })
        })
        .collect();

    // ISO dates compare lexicographically; stable sort preserves fetch
    // order for ties.
    updates.sort_by(|a, b| b.date.cmp(&a.date));
    updates
}

/// Detect the status symbol claimed by an update's content.
///
/// Rules are applied in fixed priority order, first match wins:
/// Completed, Blocked, Delayed, Caution, AtRisk, OnTrack. Keyword matching
/// is case-insensitive substring match; emoji matching is exact glyph
/// match.
#[must_use]
pub fn detect_status(content: &str) -> Status {
    let lower = content.to_lowercase();
    let contains_any =
        |needles: &[&str]| needles.iter().any(|needle| lower.contains(needle));

    if contains_any(&["completed", "done", "finished"]) || content.contains('\u{2705}') {
        return Status::Completed;
    }

    let red_circle = content.contains('\u{1F534}');
    if contains_any(&["blocked", "stuck"])
        || content.contains('\u{1F6AB}')
        || (red_circle && lower.contains("cannot"))
    {
        return Status::Blocked;
    }

    if (red_circle && contains_any(&["delay", "behind"])) || lower.contains("delayed") {
        return Status::Delayed;
    }

    if content.contains('\u{1F7E1}')
        || content.contains("\u{26A0}\u{FE0F}")
        || contains_any(&["caution", "warning"])
    {
        return Status::Caution;
    }

    if contains_any(&["at risk", "at-risk", "risk"]) {
        return Status::AtRisk;
    }

    if content.contains('\u{1F7E2}')
        || content.contains('\u{2705}')
        || contains_any(&["on track", "progress"])
    {
        return Status::OnTrack;
    }

    Status::Unknown
}
