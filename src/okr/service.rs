//! End-to-end report assembly.
//!
//! The service drives the pipeline: fetch the filtered issue set, resolve
//! the hierarchy, then hydrate each objective and its key results with
//! parsed weekly updates. Per-issue comment failures degrade to an empty
//! update list and a recorded warning instead of aborting the run; only
//! total API unreachability (or cancellation) fails the report.

use crate::error::Result;
use crate::github::GitHubClient;
use crate::model::{Issue, IssueWithUpdates};
use crate::okr::hierarchy::classify;
use crate::updates::parse_weekly_updates;
use futures::stream::{self, StreamExt, TryStreamExt};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use tracing::{info, warn};

/// Repository scope and processing options for one report run.
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// Default owner for issues whose URL cannot be parsed.
    pub owner: String,
    /// Default repository for issues whose URL cannot be parsed.
    pub repo: String,
    /// Labels an issue must all carry to take part in the report.
    pub required_labels: Vec<String>,
    /// Bound on parallel objective hydration.
    pub max_concurrency: usize,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            required_labels: Vec::new(),
            max_concurrency: 4,
        }
    }
}

/// A best-effort report: the objective tree plus explicit warnings for
/// every degradation encountered while building it.
#[derive(Debug, Clone, Serialize)]
pub struct OkrReport {
    pub objectives: Vec<IssueWithUpdates>,
    pub warnings: Vec<String>,
}

impl OkrReport {
    /// Total number of key results across all objectives.
    #[must_use]
    pub fn total_key_results(&self) -> usize {
        self.objectives.iter().map(|o| o.children.len()).sum()
    }
}

/// Orchestrates fetching, classification, and hydration into a report.
pub struct OkrService {
    client: GitHubClient,
    options: ServiceOptions,
}

impl OkrService {
    /// Create a service over a configured client.
    #[must_use]
    pub fn new(client: GitHubClient, options: ServiceOptions) -> Self {
        Self { client, options }
    }

    /// Access the underlying client (stats, cache sweeps).
    #[must_use]
    pub fn client(&self) -> &GitHubClient {
        &self.client
    }

    /// Fetch, classify, and hydrate the full objective tree.
    pub async fn build_report(&self, query: &str) -> Result<OkrReport> {
        let issues = self
            .client
            .fetch_issues(&self.options.owner, &self.options.repo, query)
            .await?;

        let total = issues.len();
        let filtered: Vec<Issue> = issues
            .into_iter()
            .filter(|i| i.has_all_labels(&self.options.required_labels))
            .collect();
        info!(
            total,
            filtered = filtered.len(),
            labels = ?self.options.required_labels,
            "label filtering complete"
        );

        if filtered.is_empty() {
            let mut warnings = Vec::new();
            if total > 0 {
                warnings.push(format!(
                    "none of the {total} fetched issues carried the required labels"
                ));
            }
            return Ok(OkrReport {
                objectives: Vec::new(),
                warnings,
            });
        }

        let classification = classify(filtered);
        let mut children_map = classification.parent_to_children;

        let hydrated: Vec<(IssueWithUpdates, Vec<String>)> = stream::iter(
            classification.objectives.into_iter().map(|objective| {
                let children = children_map.remove(&objective.number).unwrap_or_default();
                self.hydrate_objective(objective, children)
            }),
        )
        .buffered(self.options.max_concurrency.max(1))
        .try_collect()
        .await?;

        let mut objectives = Vec::with_capacity(hydrated.len());
        let mut warnings = Vec::new();
        for (objective, mut objective_warnings) in hydrated {
            objectives.push(objective);
            warnings.append(&mut objective_warnings);
        }

        info!(
            objectives = objectives.len(),
            key_results = objectives.iter().map(|o| o.children.len()).sum::<usize>(),
            warnings = warnings.len(),
            "report assembled"
        );
        Ok(OkrReport {
            objectives,
            warnings,
        })
    }

    /// Hydrate an objective and its children, sequentially per objective so
    /// child order stays source order.
    async fn hydrate_objective(
        &self,
        objective: Issue,
        children: Vec<Issue>,
    ) -> Result<(IssueWithUpdates, Vec<String>)> {
        let mut warnings = Vec::new();
        let mut node = self.hydrate_issue(objective, &mut warnings).await?;
        for child in children {
            let hydrated = self.hydrate_issue(child, &mut warnings).await?;
            node.children.push(hydrated);
        }
        Ok((node, warnings))
    }

    /// Fetch and parse one issue's updates. Failures degrade to an empty
    /// update list plus a warning; cancellation propagates.
    async fn hydrate_issue(
        &self,
        issue: Issue,
        warnings: &mut Vec<String>,
    ) -> Result<IssueWithUpdates> {
        let (owner, repo) = owner_repo_from_url(&issue.url)
            .unwrap_or_else(|| (self.options.owner.clone(), self.options.repo.clone()));

        match self.client.fetch_comments(&owner, &repo, issue.number).await {
            Ok(comments) => {
                let updates = parse_weekly_updates(&comments);
                Ok(IssueWithUpdates {
                    issue,
                    updates,
                    children: Vec::new(),
                })
            }
            Err(err) if err.is_cancelled() => Err(err),
            Err(err) => {
                warn!(issue = issue.number, error = %err, "continuing without updates");
                warnings.push(format!(
                    "issue #{}: could not fetch updates: {err}",
                    issue.number
                ));
                Ok(IssueWithUpdates::bare(issue))
            }
        }
    }
}

/// Extract `(owner, repo)` from a GitHub issue URL.
#[must_use]
pub fn owner_repo_from_url(url: &str) -> Option<(String, String)> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"https://github\.com/([^/\s]+)/([^/\s]+)/issues/\d+")
            .unwrap_or_else(|e| panic!("invalid issue-url regex: {e}"))
    });
    let captures = re.captures(url)?;
    Some((captures[1].to_string(), captures[2].to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::{FetchOptions, GitHubClient};
    use crate::model::{IssueState, IssueType, RawComment, Status};
    use crate::testing::{MockFailure, MockTransport};
    use chrono::Utc;
    use std::sync::Arc;

    fn issue(number: u64, title: &str, body: &str, state: IssueState) -> Issue {
        Issue {
            number,
            title: title.into(),
            body: body.into(),
            url: format!("https://github.com/acme/platform/issues/{number}"),
            state,
            labels: vec!["okr".into()],
            kind: IssueType::Unclassified,
        }
    }

    fn update_comment(date: &str, rest: &str) -> RawComment {
        RawComment {
            body: format!("weekly update {date}\n\n{rest}"),
            author: "alice".into(),
            created_at: Utc::now(),
        }
    }

    fn service(transport: Arc<MockTransport>) -> OkrService {
        let client = GitHubClient::new(
            transport,
            FetchOptions {
                requests_per_hour: 3_600_000,
                ..FetchOptions::default()
            },
        );
        OkrService::new(
            client,
            ServiceOptions {
                owner: "acme".into(),
                repo: "platform".into(),
                required_labels: vec!["okr".into()],
                max_concurrency: 2,
            },
        )
    }

    #[test]
    fn test_owner_repo_from_url() {
        assert_eq!(
            owner_repo_from_url("https://github.com/acme/platform/issues/12"),
            Some(("acme".into(), "platform".into()))
        );
        assert_eq!(owner_repo_from_url("https://example.com/not/github"), None);
    }

    #[tokio::test]
    async fn test_full_report_assembly() {
        let transport = Arc::new(
            MockTransport::new()
                .with_issues(vec![
                    issue(5, "Improve reliability", "", IssueState::Open),
                    issue(10, "Reduce pages", "Parent Issue: #5", IssueState::Open),
                    issue(11, "Error budget", "part of #5", IssueState::Closed),
                ])
                .with_comments(5, vec![update_comment("2025-07-01", "on track")])
                .with_comments(10, vec![update_comment("2025-07-02", "blocked on vendor")]),
        );
        let service = service(transport);

        let report = service.build_report("is:issue label:okr").await.unwrap();

        assert!(report.warnings.is_empty());
        assert_eq!(report.objectives.len(), 1);
        let objective = &report.objectives[0];
        assert_eq!(objective.issue.number, 5);
        assert_eq!(objective.children.len(), 2);
        assert_eq!(report.total_key_results(), 2);

        assert_eq!(objective.children[0].key_result_status(), Status::Blocked);
        assert_eq!(objective.children[1].key_result_status(), Status::Completed);
        assert_eq!(objective.objective_status(), Status::Blocked);
    }

    #[tokio::test]
    async fn test_comment_failure_degrades_with_warning() {
        let transport = Arc::new(
            MockTransport::new()
                .with_issues(vec![issue(1, "Solo objective", "", IssueState::Open)])
                .with_comment_failures(1, MockFailure::NotFound),
        );
        let service = service(transport);

        let report = service.build_report("is:issue").await.unwrap();

        assert_eq!(report.objectives.len(), 1);
        assert!(report.objectives[0].updates.is_empty());
        assert_eq!(report.objectives[0].objective_status(), Status::Unknown);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("issue #1"));
    }

    #[tokio::test]
    async fn test_label_filter_excludes_issues() {
        let mut unlabeled = issue(2, "Not an OKR", "", IssueState::Open);
        unlabeled.labels = vec!["bug".into()];
        let transport = Arc::new(
            MockTransport::new()
                .with_issues(vec![issue(1, "Objective", "", IssueState::Open), unlabeled])
                .with_comments(1, vec![]),
        );
        let service = service(transport);

        let report = service.build_report("is:issue").await.unwrap();
        assert_eq!(report.objectives.len(), 1);
        assert_eq!(report.objectives[0].issue.number, 1);
    }

    #[tokio::test]
    async fn test_nothing_survives_filter() {
        let mut unlabeled = issue(2, "Not an OKR", "", IssueState::Open);
        unlabeled.labels = vec!["bug".into()];
        let transport = Arc::new(MockTransport::new().with_issues(vec![unlabeled]));
        let service = service(transport);

        let report = service.build_report("is:issue").await.unwrap();
        assert!(report.objectives.is_empty());
        assert_eq!(report.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_total_unreachability_fails_run() {
        let transport = Arc::new(
            MockTransport::new()
                .with_issues(vec![issue(1, "Objective", "", IssueState::Open)])
                .with_search_failures(10, MockFailure::ConnectionReset),
        );
        let service = service(transport);

        tokio::time::pause();
        let err = service.build_report("is:issue").await.unwrap_err();
        assert!(err.to_string().contains("search_issues"));
    }
}
