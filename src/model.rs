//! Domain model for the OKR report pipeline.
//!
//! Issues are immutable once fetched; their [`IssueType`] is assigned once
//! during hierarchy resolution. Weekly updates are always kept sorted
//! newest-first, so `updates[0]` is the latest update when any exist.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Open/closed state of a GitHub issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    #[default]
    Open,
    Closed,
}

/// Role of an issue in the OKR hierarchy.
///
/// Assigned during hierarchy resolution; issues start out unclassified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum IssueType {
    Objective,
    KeyResult,
    #[default]
    Unclassified,
}

/// Status symbol detected from a weekly update or derived by aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    OnTrack,
    Caution,
    Delayed,
    AtRisk,
    Blocked,
    Completed,
    #[default]
    Unknown,
}

impl Status {
    /// Human-readable label for report output.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::OnTrack => "On Track",
            Self::Caution => "Caution",
            Self::Delayed => "Delayed",
            Self::AtRisk => "At Risk",
            Self::Blocked => "Blocked",
            Self::Completed => "Completed",
            Self::Unknown => "Unknown",
        }
    }

    /// Status indicator emoji for report output.
    #[must_use]
    pub fn emoji(&self) -> &'static str {
        match self {
            Self::OnTrack => "\u{1F7E2}",   // 🟢
            Self::Caution => "\u{1F7E1}",   // 🟡
            Self::Delayed => "\u{1F534}",   // 🔴
            Self::AtRisk => "\u{26A0}\u{FE0F}", // ⚠️
            Self::Blocked => "\u{1F6AB}",   // 🚫
            Self::Completed => "\u{2705}",  // ✅
            Self::Unknown => "\u{26AA}",    // ⚪
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A GitHub issue as consumed by the OKR pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub url: String,
    #[serde(default)]
    pub state: IssueState,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(rename = "type", default)]
    pub kind: IssueType,
}

impl Issue {
    /// Check if the issue is an objective.
    #[must_use]
    pub fn is_objective(&self) -> bool {
        self.kind == IssueType::Objective
    }

    /// Check if the issue is a key result.
    #[must_use]
    pub fn is_key_result(&self) -> bool {
        self.kind == IssueType::KeyResult
    }

    /// Check if the issue carries a specific label (case-insensitive).
    #[must_use]
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l.eq_ignore_ascii_case(label))
    }

    /// Check if the issue carries every one of the required labels.
    ///
    /// An empty requirement list matches every issue.
    #[must_use]
    pub fn has_all_labels(&self, required: &[String]) -> bool {
        required.iter().all(|r| self.has_label(r))
    }
}

/// A raw issue comment as returned by the comments endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawComment {
    pub body: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

/// A dated, status-tagged weekly update extracted from one comment.
///
/// Dates are ISO `YYYY-MM-DD` strings, so lexicographic order equals
/// chronological order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyUpdate {
    pub date: String,
    pub content: String,
    pub author: String,
    pub status: Status,
}

/// An issue together with its update history and, for objectives, its
/// ordered key-result children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueWithUpdates {
    pub issue: Issue,
    /// Sorted descending by date; `updates[0]` is the latest.
    #[serde(default)]
    pub updates: Vec<WeeklyUpdate>,
    #[serde(default)]
    pub children: Vec<IssueWithUpdates>,
}

impl IssueWithUpdates {
    /// Wrap an issue with no updates and no children.
    #[must_use]
    pub fn bare(issue: Issue) -> Self {
        Self {
            issue,
            updates: Vec::new(),
            children: Vec::new(),
        }
    }

    /// The most recent weekly update, if any.
    #[must_use]
    pub fn latest_update(&self) -> Option<&WeeklyUpdate> {
        self.updates.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue_with_labels(labels: &[&str]) -> Issue {
        Issue {
            number: 1,
            title: "Ship the thing".into(),
            body: String::new(),
            url: "https://github.com/acme/platform/issues/1".into(),
            state: IssueState::Open,
            labels: labels.iter().map(|s| s.to_string()).collect(),
            kind: IssueType::Unclassified,
        }
    }

    #[test]
    fn test_has_label_case_insensitive() {
        let issue = issue_with_labels(&["OKR", "q3"]);
        assert!(issue.has_label("okr"));
        assert!(issue.has_label("Q3"));
        assert!(!issue.has_label("q4"));
    }

    #[test]
    fn test_has_all_labels() {
        let issue = issue_with_labels(&["okr", "objective"]);
        assert!(issue.has_all_labels(&["okr".into()]));
        assert!(issue.has_all_labels(&["okr".into(), "Objective".into()]));
        assert!(!issue.has_all_labels(&["okr".into(), "q4".into()]));
        assert!(issue.has_all_labels(&[]));
    }

    #[test]
    fn test_latest_update_is_first() {
        let mut node = IssueWithUpdates::bare(issue_with_labels(&[]));
        assert!(node.latest_update().is_none());

        node.updates = vec![
            WeeklyUpdate {
                date: "2025-07-09".into(),
                content: "newest".into(),
                author: "alice".into(),
                status: Status::OnTrack,
            },
            WeeklyUpdate {
                date: "2025-07-01".into(),
                content: "older".into(),
                author: "alice".into(),
                status: Status::Caution,
            },
        ];
        assert_eq!(node.latest_update().map(|u| u.date.as_str()), Some("2025-07-09"));
    }

    #[test]
    fn test_issue_state_serde_lowercase() {
        let json = serde_json::to_string(&IssueState::Closed).unwrap();
        assert_eq!(json, "\"closed\"");
        let state: IssueState = serde_json::from_str("\"open\"").unwrap();
        assert_eq!(state, IssueState::Open);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(Status::AtRisk.to_string(), "At Risk");
        assert_eq!(Status::OnTrack.emoji(), "\u{1F7E2}");
    }
}
