//! Testing infrastructure: a scripted mock transport.
//!
//! [`MockTransport`] provides a controllable test double for the GitHub
//! API, enabling deterministic tests of the client's retry, caching, and
//! pagination policy without any network. Failures are injected as a
//! countdown: the first N calls fail with the configured error, then the
//! scripted data is served.

use crate::error::{OkrError, Result};
use crate::github::transport::{ApiTransport, Page, QuotaUpdate};
use crate::model::{Issue, RawComment};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

/// Kinds of injected failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockFailure {
    /// Transient: request timeout.
    Timeout,
    /// Transient: connection reset by peer.
    #[default]
    ConnectionReset,
    /// Transient: HTTP 503.
    ServerError,
    /// Transient: HTTP 429 rate-limit signal.
    RateLimited,
    /// Permanent: HTTP 404.
    NotFound,
}

impl MockFailure {
    fn to_error(self) -> OkrError {
        match self {
            Self::Timeout => OkrError::timeout("mock timeout"),
            Self::ConnectionReset => OkrError::connection("connection reset by peer"),
            Self::ServerError => OkrError::Server { status: 503 },
            Self::RateLimited => OkrError::RateLimited { reset_at: None },
            Self::NotFound => OkrError::from_status(404, "mock not found"),
        }
    }
}

/// Scripted [`ApiTransport`] implementation.
///
/// # Example
///
/// ```rust,ignore
/// let transport = MockTransport::new()
///     .with_issues(issues)
///     .with_search_failures(2, MockFailure::ConnectionReset);
///
/// // First two searches fail transiently, the third serves `issues`.
/// ```
#[derive(Debug, Default)]
pub struct MockTransport {
    issues: Vec<Issue>,
    comments: HashMap<u64, Vec<RawComment>>,
    search_failures: AtomicU32,
    search_failure_kind: MockFailure,
    comment_failures: AtomicU32,
    comment_failure_kind: MockFailure,
    search_calls: AtomicU32,
    comment_calls: AtomicU32,
}

impl MockTransport {
    /// Create an empty mock serving no issues and no comments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the issues returned by searches (paged by `per_page`).
    #[must_use]
    pub fn with_issues(mut self, issues: Vec<Issue>) -> Self {
        self.issues = issues;
        self
    }

    /// Set the comments returned for one issue number.
    #[must_use]
    pub fn with_comments(mut self, number: u64, comments: Vec<RawComment>) -> Self {
        self.comments.insert(number, comments);
        self
    }

    /// Fail the first `count` search calls with the given error kind.
    #[must_use]
    pub fn with_search_failures(self, count: u32, kind: MockFailure) -> Self {
        self.search_failures.store(count, Ordering::Relaxed);
        Self {
            search_failure_kind: kind,
            ..self
        }
    }

    /// Fail the first `count` comment calls with the given error kind.
    #[must_use]
    pub fn with_comment_failures(self, count: u32, kind: MockFailure) -> Self {
        self.comment_failures.store(count, Ordering::Relaxed);
        Self {
            comment_failure_kind: kind,
            ..self
        }
    }

    /// Number of search calls observed.
    #[must_use]
    pub fn search_calls(&self) -> u32 {
        self.search_calls.load(Ordering::Relaxed)
    }

    /// Number of comment calls observed.
    #[must_use]
    pub fn comment_calls(&self) -> u32 {
        self.comment_calls.load(Ordering::Relaxed)
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        let mut current = counter.load(Ordering::Relaxed);
        while current > 0 {
            match counter.compare_exchange(
                current,
                current - 1,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
        false
    }

    fn paged<T: Clone>(items: &[T], page: u32, per_page: u32) -> Page<T> {
        let per_page = per_page.max(1) as usize;
        let start = (page.max(1) as usize - 1) * per_page;
        let end = (start + per_page).min(items.len());
        let slice = if start < items.len() {
            items[start..end].to_vec()
        } else {
            Vec::new()
        };
        Page {
            items: slice,
            next_page: (end < items.len()).then(|| page + 1),
            quota: Some(QuotaUpdate {
                remaining: 4999,
                reset_at: None,
            }),
        }
    }
}

#[async_trait]
impl ApiTransport for MockTransport {
    async fn search_issues(
        &self,
        _owner: &str,
        _repo: &str,
        _query: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Issue>> {
        self.search_calls.fetch_add(1, Ordering::Relaxed);
        if Self::take_failure(&self.search_failures) {
            return Err(self.search_failure_kind.to_error());
        }
        Ok(Self::paged(&self.issues, page, per_page))
    }

    async fn issue_comments(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
        page: u32,
        per_page: u32,
    ) -> Result<Page<RawComment>> {
        self.comment_calls.fetch_add(1, Ordering::Relaxed);
        if Self::take_failure(&self.comment_failures) {
            return Err(self.comment_failure_kind.to_error());
        }
        let comments = self.comments.get(&number).cloned().unwrap_or_default();
        Ok(Self::paged(&comments, page, per_page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IssueState, IssueType};

    fn issues(n: u64) -> Vec<Issue> {
        (1..=n)
            .map(|i| Issue {
                number: i,
                title: format!("Issue {i}"),
                body: String::new(),
                url: format!("https://github.com/acme/platform/issues/{i}"),
                state: IssueState::Open,
                labels: vec![],
                kind: IssueType::Unclassified,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_paging_splits_results() {
        let mock = MockTransport::new().with_issues(issues(5));
        let first = mock.search_issues("o", "r", "q", 1, 2).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.next_page, Some(2));

        let last = mock.search_issues("o", "r", "q", 3, 2).await.unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.next_page, None);
        assert_eq!(mock.search_calls(), 2);
    }

    #[tokio::test]
    async fn test_failure_countdown() {
        let mock = MockTransport::new()
            .with_issues(issues(1))
            .with_search_failures(2, MockFailure::Timeout);

        assert!(mock.search_issues("o", "r", "q", 1, 10).await.is_err());
        assert!(mock.search_issues("o", "r", "q", 1, 10).await.is_err());
        assert!(mock.search_issues("o", "r", "q", 1, 10).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_issue_has_no_comments() {
        let mock = MockTransport::new();
        let page = mock.issue_comments("o", "r", 42, 1, 10).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.next_page, None);
    }
}
