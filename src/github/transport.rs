//! Wire-level access to the GitHub REST API.
//!
//! The [`ApiTransport`] trait isolates single-page HTTP fetches so the
//! client's retry, caching, and rate-limiting policy can be tested against
//! a scripted mock without any network. [`HttpTransport`] is the reqwest
//! implementation used in production.

use crate::error::{OkrError, Result};
use crate::model::{Issue, IssueState, IssueType, RawComment};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;

/// Default REST endpoint; overridable for self-hosted instances.
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Quota information extracted from rate-limit response headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaUpdate {
    pub remaining: u32,
    pub reset_at: Option<DateTime<Utc>>,
}

/// One page of results plus pagination and quota metadata.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page: Option<u32>,
    pub quota: Option<QuotaUpdate>,
}

/// Single-page access to the issue search and comment list endpoints.
///
/// Implementations perform exactly one outbound request per call; all
/// policy (retry, caching, rate limiting, pagination loops) lives in the
/// client.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// Fetch one page of issue search results for `repo:{owner}/{repo} {query}`.
    async fn search_issues(
        &self,
        owner: &str,
        repo: &str,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Issue>>;

    /// Fetch one page of comments for an issue.
    async fn issue_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        page: u32,
        per_page: u32,
    ) -> Result<Page<RawComment>>;
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    items: Vec<ApiIssue>,
}

#[derive(Debug, Deserialize)]
struct ApiIssue {
    number: u64,
    title: String,
    #[serde(default)]
    body: Option<String>,
    html_url: String,
    state: String,
    #[serde(default)]
    labels: Vec<ApiLabel>,
}

#[derive(Debug, Deserialize)]
struct ApiLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiComment {
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    user: Option<ApiUser>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    login: String,
}

impl From<ApiIssue> for Issue {
    fn from(api: ApiIssue) -> Self {
        Issue {
            number: api.number,
            title: api.title,
            body: api.body.unwrap_or_default(),
            url: api.html_url,
            state: if api.state.eq_ignore_ascii_case("closed") {
                IssueState::Closed
            } else {
                IssueState::Open
            },
            labels: api.labels.into_iter().map(|l| l.name).collect(),
            kind: IssueType::Unclassified,
        }
    }
}

impl From<ApiComment> for RawComment {
    fn from(api: ApiComment) -> Self {
        RawComment {
            body: api.body.unwrap_or_default(),
            author: api
                .user
                .map(|u| u.login)
                .unwrap_or_else(|| "unknown".to_string()),
            created_at: api.created_at,
        }
    }
}

// =============================================================================
// HTTP transport
// =============================================================================

/// reqwest-backed [`ApiTransport`] speaking the GitHub REST v3 API.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Token is deliberately omitted.
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpTransport {
    /// Create a transport authenticated with a bearer token.
    ///
    /// The token is sent in the `Authorization` header only; it is never
    /// logged, cached, or included in errors.
    pub fn new(token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("okr-fetcher/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.into(),
        })
    }

    /// Point the transport at a non-default API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get(&self, url: String, params: &[(&str, String)]) -> Result<reqwest::Response> {
        let response = self
            .http
            .get(url)
            .query(params)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let reset_at = parse_reset_header(response.headers());
            let message = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                429 => OkrError::RateLimited { reset_at },
                code => OkrError::from_status(code, truncate(&message, 200)),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl ApiTransport for HttpTransport {
    async fn search_issues(
        &self,
        owner: &str,
        repo: &str,
        query: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Issue>> {
        let url = format!("{}/search/issues", self.base_url);
        let q = format!("repo:{owner}/{repo} {query}");
        let params = [
            ("q", q),
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];
        let response = self.get(url, &params).await?;
        let quota = parse_quota(response.headers());
        let next_page = parse_next_page(response.headers(), page);
        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| OkrError::malformed(format!("search response: {e}")))?;
        Ok(Page {
            items: body.items.into_iter().map(Issue::from).collect(),
            next_page,
            quota,
        })
    }

    async fn issue_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        page: u32,
        per_page: u32,
    ) -> Result<Page<RawComment>> {
        let url = format!("{}/repos/{owner}/{repo}/issues/{number}/comments", self.base_url);
        let params = [
            ("page", page.to_string()),
            ("per_page", per_page.to_string()),
        ];
        let response = self.get(url, &params).await?;
        let quota = parse_quota(response.headers());
        let next_page = parse_next_page(response.headers(), page);
        let body: Vec<ApiComment> = response
            .json()
            .await
            .map_err(|e| OkrError::malformed(format!("comments response: {e}")))?;
        Ok(Page {
            items: body.into_iter().map(RawComment::from).collect(),
            next_page,
            quota,
        })
    }
}

// =============================================================================
// Header parsing
// =============================================================================

fn header_str<'a>(headers: &'a reqwest::header::HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn parse_reset_header(headers: &reqwest::header::HeaderMap) -> Option<DateTime<Utc>> {
    let epoch: i64 = header_str(headers, "x-ratelimit-reset")?.parse().ok()?;
    Utc.timestamp_opt(epoch, 0).single()
}

fn parse_quota(headers: &reqwest::header::HeaderMap) -> Option<QuotaUpdate> {
    let remaining: u32 = header_str(headers, "x-ratelimit-remaining")?.parse().ok()?;
    Some(QuotaUpdate {
        remaining,
        reset_at: parse_reset_header(headers),
    })
}

/// Extract the next page number from the `Link` header's `rel="next"` entry.
fn parse_next_page(headers: &reqwest::header::HeaderMap, current_page: u32) -> Option<u32> {
    let link = header_str(headers, "link")?;
    next_page_from_link(link, current_page)
}

fn next_page_from_link(link: &str, current_page: u32) -> Option<u32> {
    static NEXT_RE: OnceLock<Regex> = OnceLock::new();
    let re = NEXT_RE.get_or_init(|| {
        Regex::new(r#"<[^>]*[?&]page=(\d+)[^>]*>\s*;\s*rel="next""#)
            .unwrap_or_else(|e| panic!("invalid link-header regex: {e}"))
    });
    let next: u32 = re.captures(link)?.get(1)?.as_str().parse().ok()?;
    // Guard against a server echoing the current page back.
    (next > current_page).then_some(next)
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut end = max;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &s[..end])
    }
}
