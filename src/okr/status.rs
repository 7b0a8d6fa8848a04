//! Status aggregation for key results and objectives.
//!
//! These are pure, deterministic functions of the issue tree: they never
//! mutate state and repeated calls on identical input yield identical
//! output, which keeps regenerated reports reproducible. Renderers must
//! obtain statuses through these accessors rather than recompute them.

use crate::model::{IssueState, IssueWithUpdates, Status};

/// Effective status of a key result.
///
/// A closed issue is Completed regardless of its update content. For open
/// issues, the newest update with a recognized status decides; a claimed
/// Completed on a still-open issue is downgraded to OnTrack. With no
/// recognized status anywhere, the result is Unknown.
#[must_use]
pub fn key_result_status(node: &IssueWithUpdates) -> Status {
    if node.issue.state == IssueState::Closed {
        return Status::Completed;
    }

    for update in &node.updates {
        if update.status != Status::Unknown {
            return reconcile_open(update.status);
        }
    }

    // No update carried a recognized status; fall back to the latest
    // update's status under the same open/closed reconciliation.
    match node.latest_update() {
        Some(update) => reconcile_open(update.status),
        None => Status::Unknown,
    }
}

/// An open issue cannot legitimately be "completed".
fn reconcile_open(status: Status) -> Status {
    if status == Status::Completed {
        Status::OnTrack
    } else {
        status
    }
}

/// Effective status of an objective, aggregated from its key results.
///
/// With no children this behaves exactly like [`key_result_status`] on the
/// objective itself. Otherwise child statuses resolve by strict priority:
/// any Blocked, then any Delayed, then any AtRisk, then any Caution; all
/// Completed wins Completed; a Completed majority or any OnTrack yields
/// OnTrack; else Unknown.
#[must_use]
pub fn objective_status(node: &IssueWithUpdates) -> Status {
    if node.children.is_empty() {
        return key_result_status(node);
    }

    let statuses: Vec<Status> = node.children.iter().map(key_result_status).collect();
    let total = statuses.len();
    let count = |status: Status| statuses.iter().filter(|s| **s == status).count();

    if count(Status::Blocked) > 0 {
        return Status::Blocked;
    }
    if count(Status::Delayed) > 0 {
        return Status::Delayed;
    }
    if count(Status::AtRisk) > 0 {
        return Status::AtRisk;
    }
    if count(Status::Caution) > 0 {
        return Status::Caution;
    }

    let completed = count(Status::Completed);
    if completed == total {
        return Status::Completed;
    }
    if completed >= total.div_ceil(2) {
        return Status::OnTrack;
    }
    if count(Status::OnTrack) > 0 {
        return Status::OnTrack;
    }
    Status::Unknown
}

impl IssueWithUpdates {
    /// See [`key_result_status`].
    #[must_use]
    pub fn key_result_status(&self) -> Status {
        key_result_status(self)
    }

    /// See [`objective_status`].
    #[must_use]
    pub fn objective_status(&self) -> Status {
        objective_status(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Issue, IssueType, WeeklyUpdate};

    fn node(state: IssueState, statuses: &[Status]) -> IssueWithUpdates {
        let issue = Issue {
            number: 1,
            title: "Issue".into(),
            body: String::new(),
            url: "https://github.com/acme/platform/issues/1".into(),
            state,
            labels: vec![],
            kind: IssueType::KeyResult,
        };
        let updates = statuses
            .iter()
            .enumerate()
            .map(|(i, status)| WeeklyUpdate {
                date: format!("2025-07-{:02}", 28 - i),
                content: "weekly update".into(),
                author: "alice".into(),
                status: *status,
            })
            .collect();
        IssueWithUpdates {
            issue,
            updates,
            children: Vec::new(),
        }
    }

    fn objective(children: Vec<IssueWithUpdates>) -> IssueWithUpdates {
        let mut obj = node(IssueState::Open, &[]);
        obj.issue.kind = IssueType::Objective;
        obj.children = children;
        obj
    }

    #[test]
    fn test_closed_issue_always_completed() {
        let n = node(IssueState::Closed, &[Status::Blocked, Status::AtRisk]);
        assert_eq!(key_result_status(&n), Status::Completed);
        assert_eq!(key_result_status(&node(IssueState::Closed, &[])), Status::Completed);
    }

    #[test]
    fn test_newest_recognized_status_wins() {
        let n = node(IssueState::Open, &[Status::Unknown, Status::Blocked, Status::OnTrack]);
        assert_eq!(key_result_status(&n), Status::Blocked);
    }

    #[test]
    fn test_open_completed_downgrades_to_on_track() {
        let n = node(IssueState::Open, &[Status::Completed]);
        assert_eq!(key_result_status(&n), Status::OnTrack);
    }

    #[test]
    fn test_no_updates_is_unknown() {
        assert_eq!(key_result_status(&node(IssueState::Open, &[])), Status::Unknown);
    }

    #[test]
    fn test_all_unrecognized_is_unknown() {
        let n = node(IssueState::Open, &[Status::Unknown, Status::Unknown]);
        assert_eq!(key_result_status(&n), Status::Unknown);
    }

    #[test]
    fn test_objective_without_children_behaves_like_kr() {
        let mut obj = node(IssueState::Open, &[Status::Caution]);
        obj.issue.kind = IssueType::Objective;
        assert_eq!(objective_status(&obj), Status::Caution);
    }

    #[test]
    fn test_one_blocked_child_blocks_objective() {
        let children = vec![
            node(IssueState::Closed, &[]),
            node(IssueState::Closed, &[]),
            node(IssueState::Open, &[Status::Blocked]),
            node(IssueState::Closed, &[]),
        ];
        assert_eq!(objective_status(&objective(children)), Status::Blocked);
    }

    #[test]
    fn test_priority_order() {
        let delayed_and_at_risk = vec![
            node(IssueState::Open, &[Status::AtRisk]),
            node(IssueState::Open, &[Status::Delayed]),
        ];
        assert_eq!(objective_status(&objective(delayed_and_at_risk)), Status::Delayed);

        let at_risk_and_caution = vec![
            node(IssueState::Open, &[Status::Caution]),
            node(IssueState::Open, &[Status::AtRisk]),
        ];
        assert_eq!(objective_status(&objective(at_risk_and_caution)), Status::AtRisk);
    }

    #[test]
    fn test_all_children_completed() {
        let children = vec![node(IssueState::Closed, &[]), node(IssueState::Closed, &[])];
        assert_eq!(objective_status(&objective(children)), Status::Completed);
    }

    #[test]
    fn test_completed_majority_is_on_track() {
        let children = vec![
            node(IssueState::Closed, &[]),
            node(IssueState::Closed, &[]),
            node(IssueState::Open, &[]),
        ];
        // 2 of 3 completed >= ceil(3/2).
        assert_eq!(objective_status(&objective(children)), Status::OnTrack);
    }

    #[test]
    fn test_minority_completed_without_on_track_is_unknown() {
        let children = vec![
            node(IssueState::Closed, &[]),
            node(IssueState::Open, &[]),
            node(IssueState::Open, &[]),
        ];
        assert_eq!(objective_status(&objective(children)), Status::Unknown);
    }

    #[test]
    fn test_any_on_track_child_carries_objective() {
        let children = vec![
            node(IssueState::Open, &[Status::OnTrack]),
            node(IssueState::Open, &[]),
            node(IssueState::Open, &[]),
        ];
        assert_eq!(objective_status(&objective(children)), Status::OnTrack);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let obj = objective(vec![
            node(IssueState::Open, &[Status::Caution]),
            node(IssueState::Closed, &[]),
        ]);
        let first = objective_status(&obj);
        let second = objective_status(&obj);
        assert_eq!(first, second);
        assert_eq!(obj.children.len(), 2); // no mutation
    }
}
