//! Objective/Key-Result classification from textual parent references.
//!
//! Hierarchy is textual-reference-based only: the remote API exposes no
//! structural relationship, so parent links are recovered by scanning each
//! issue's title and body against an ordered pattern list. Classification
//! operates on the already label-filtered issue set; references to issues
//! outside that set are dangling and intentionally ignored.

use crate::model::{Issue, IssueType};
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Ordered parent-reference patterns; the first match wins and each issue
/// records at most one parent.
const PARENT_PATTERNS: &[&str] = &[
    r"(?i)parent\s*(?:issue)?\s*:?\s*#(\d+)",
    r"(?i)parent\s*(?:issue)?\s*:?\s*https://github\.com/[^/\s]+/[^/\s]+/issues/(\d+)",
    r"(?i)part\s*of\s*#(\d+)",
    r"(?i)child\s*of\s*#(\d+)",
    r"(?i)subtask\s*of\s*#(\d+)",
    r"(?i)depends\s*on\s*#(\d+)",
    r"(?i)relates\s*to\s*#(\d+)",
    r"(?i)blocking\s*#(\d+)",
    r"(?i)blocked\s*by\s*#(\d+)",
];

fn parent_regexes() -> &'static Vec<Regex> {
    static REGEXES: OnceLock<Vec<Regex>> = OnceLock::new();
    REGEXES.get_or_init(|| {
        PARENT_PATTERNS
            .iter()
            .map(|p| Regex::new(p).unwrap_or_else(|e| panic!("invalid parent pattern {p}: {e}")))
            .collect()
    })
}

/// Result of classifying a filtered issue set into a two-level hierarchy.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Children recorded per parent issue number, in source order.
    pub parent_to_children: BTreeMap<u64, Vec<Issue>>,
    /// Objectives in source order.
    pub objectives: Vec<Issue>,
}

/// Extract the parent issue number referenced by an issue's title or body.
///
/// Scans patterns in priority order over the concatenated title and body;
/// self-references are skipped so an issue can never become its own
/// parent.
#[must_use]
pub fn extract_parent_number(issue: &Issue) -> Option<u64> {
    let text = format!("{}\n{}", issue.title, issue.body);
    for regex in parent_regexes() {
        let Some(captures) = regex.captures(&text) else {
            continue;
        };
        let Some(parent) = captures.get(1).and_then(|m| m.as_str().parse::<u64>().ok()) else {
            continue;
        };
        if parent == issue.number {
            continue;
        }
        debug!(issue = issue.number, parent, "found parent reference");
        return Some(parent);
    }
    None
}

/// Classify a label-filtered issue set into objectives and key results.
///
/// An issue with at least one recorded child and no recorded parent
/// becomes an objective; an issue with a recorded parent becomes a key
/// result; everything else stays unclassified. If no objectives emerge at
/// all, every issue is forcibly treated as an objective with no children
/// so the report is never empty while at least one issue survived
/// filtering.
#[must_use]
pub fn classify(issues: Vec<Issue>) -> Classification {
    let mut issues = issues;
    let members: HashSet<u64> = issues.iter().map(|i| i.number).collect();

    // Record one parent per issue, dropping dangling references.
    let mut parent_of: HashMap<u64, u64> = HashMap::new();
    for issue in &issues {
        if let Some(parent) = extract_parent_number(issue) {
            if members.contains(&parent) {
                parent_of.insert(issue.number, parent);
            } else {
                debug!(
                    issue = issue.number,
                    parent, "ignoring dangling parent reference"
                );
            }
        }
    }

    let mut parent_to_children: BTreeMap<u64, Vec<Issue>> = BTreeMap::new();
    for issue in &mut issues {
        if parent_of.contains_key(&issue.number) {
            issue.kind = IssueType::KeyResult;
        }
    }
    for issue in &issues {
        if let Some(&parent) = parent_of.get(&issue.number) {
            parent_to_children.entry(parent).or_default().push(issue.clone());
        }
    }

    let mut objectives = Vec::new();
    for issue in &mut issues {
        let has_children = parent_to_children.contains_key(&issue.number);
        let has_parent = parent_of.contains_key(&issue.number);
        if has_children && !has_parent {
            issue.kind = IssueType::Objective;
            objectives.push(issue.clone());
        }
    }

    if objectives.is_empty() {
        warn!(
            count = issues.len(),
            "no parent/child relationships found, treating every issue as an objective"
        );
        for issue in &mut issues {
            issue.kind = IssueType::Objective;
        }
        return Classification {
            parent_to_children: BTreeMap::new(),
            objectives: issues,
        };
    }

    Classification {
        parent_to_children,
        objectives,
    }
}
