//! End-to-end pipeline tests over a scripted transport: fetch, classify,
//! hydrate, aggregate, render.

use chrono::Utc;
use okr_fetcher::github::{FetchOptions, GitHubClient};
use okr_fetcher::model::{Issue, IssueState, IssueType, RawComment, Status};
use okr_fetcher::okr::{OkrService, ServiceOptions};
use okr_fetcher::report;
use okr_fetcher::testing::MockTransport;
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

fn comment(date: &str, rest: &str) -> RawComment {
    RawComment {
        body: format!("Weekly Update {date}\n\n{rest}"),
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
            max_concurrency: 4,
        },
    )
}

#[tokio::test]
async fn two_objective_tree_renders_markdown() {
    let transport = Arc::new(
        MockTransport::new()
            .with_issues(vec![
                issue(1, "Improve reliability", "", IssueState::Open),
                issue(2, "Grow adoption", "", IssueState::Open),
                issue(10, "Reduce pages", "Parent Issue: #1", IssueState::Open),
                issue(11, "Error budget", "part of #1", IssueState::Closed),
                issue(20, "Ship integrations", "child of #2", IssueState::Open),
            ])
            .with_comments(10, vec![comment("2025-07-02", "\u{1F534} cannot proceed")])
            .with_comments(20, vec![comment("2025-07-03", "\u{1F7E2} on track")]),
    );

    let report_data = service(transport).build_report("is:issue label:okr").await.unwrap();

    assert!(report_data.warnings.is_empty());
    assert_eq!(report_data.objectives.len(), 2);
    assert_eq!(report_data.total_key_results(), 3);

    // Red circle plus blocking language reads as Blocked, and one blocked
    // key result blocks its objective.
    let first = &report_data.objectives[0];
    assert_eq!(first.children[0].key_result_status(), Status::Blocked);
    assert_eq!(first.objective_status(), Status::Blocked);
    let second = &report_data.objectives[1];
    assert_eq!(second.objective_status(), Status::OnTrack);

    let md = report::render_markdown(&report_data, "Quarterly OKRs", Utc::now());
    assert!(md.contains("# Quarterly OKRs"));
    assert!(md.contains("Improve reliability (#1)"));
    assert!(md.contains("Grow adoption (#2)"));
    assert!(md.contains("[#11]"));
}

#[tokio::test]
async fn flat_issue_set_falls_back_to_all_objectives() {
    let transport = Arc::new(MockTransport::new().with_issues(vec![
        issue(1, "Standalone A", "", IssueState::Open),
        issue(2, "Standalone B", "", IssueState::Closed),
    ]));

    let report_data = service(transport).build_report("is:issue").await.unwrap();

    assert_eq!(report_data.objectives.len(), 2);
    assert!(report_data.objectives.iter().all(|o| o.children.is_empty()));
    assert_eq!(report_data.objectives[1].objective_status(), Status::Completed);
}

#[tokio::test]
async fn hierarchy_survives_pagination() {
    // 120 issues at 100 per page forces a second search page; the child
    // on page two must still attach to its parent from page one.
    let mut issues: Vec<Issue> = (1..=119)
        .map(|n| issue(n, &format!("Issue {n}"), "", IssueState::Open))
        .collect();
    issues.push(issue(120, "Late child", "Parent Issue: #1", IssueState::Open));
    let transport = Arc::new(MockTransport::new().with_issues(issues));

    let report_data = service(transport.clone()).build_report("is:issue").await.unwrap();

    assert_eq!(transport.search_calls(), 2);
    let parent = report_data
        .objectives
        .iter()
        .find(|o| o.issue.number == 1)
        .unwrap();
    assert_eq!(parent.children.len(), 1);
    assert_eq!(parent.children[0].issue.number, 120);
}

#[tokio::test]
async fn repeated_runs_are_deterministic() {
    let transport = Arc::new(
        MockTransport::new()
            .with_issues(vec![
                issue(1, "Objective", "", IssueState::Open),
                issue(3, "KR one", "part of #1", IssueState::Open),
                issue(2, "KR two", "part of #1", IssueState::Open),
            ])
            .with_comments(3, vec![comment("2025-06-15", "warning: slipping")]),
    );
    let service = service(transport);

    let first = service.build_report("is:issue").await.unwrap();
    let second = service.build_report("is:issue").await.unwrap();

    let a = report::render_json(&first, "OKRs", chrono::DateTime::UNIX_EPOCH).unwrap();
    let b = report::render_json(&second, "OKRs", chrono::DateTime::UNIX_EPOCH).unwrap();
    assert_eq!(a, b);

    // Children keep source order, statuses come from parsed updates.
    assert_eq!(first.objectives[0].children[0].issue.number, 3);
    assert_eq!(
        first.objectives[0].children[0].key_result_status(),
        Status::Caution
    );
}
