//! Resilient GitHub API client.
//!
//! Wraps an [`ApiTransport`] with the fetch policy: read-through response
//! caching, a shared token-bucket rate gate, retry with quadratic backoff
//! for transient failures, pagination with a memory bound, and usage
//! statistics.
//!
//! # Architecture
//!
//! ```text
//! fetch_issues/fetch_comments
//!        │ cache lookup (hit → return)
//!        ▼
//!   with_retry ──► pagination loop ──► limiter.acquire ──► transport
//!        │                                                     │
//!        └── backoff sleep (attempt² s)        stats/quota ◄───┘
//! ```

use crate::error::{OkrError, Result};
use crate::github::cache::{CachedPayload, ResponseCache};
use crate::github::limiter::RateLimiter;
use crate::github::stats::ClientStats;
use crate::github::transport::ApiTransport;
use crate::model::{Issue, RawComment};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Tunable fetch policy for one client instance.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Hourly request budget feeding the token bucket.
    pub requests_per_hour: u32,
    /// Items requested per page.
    pub per_page: u32,
    /// Maximum attempts per logical operation.
    pub max_retries: u32,
    /// Cap on accumulated search results to bound memory.
    pub max_issues: usize,
    /// Whether the read-through cache is active.
    pub cache_enabled: bool,
    /// TTL for cached issue searches.
    pub issues_ttl: Duration,
    /// TTL for cached comment lists.
    pub comments_ttl: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            requests_per_hour: 5000,
            per_page: 100,
            max_retries: 3,
            max_issues: 10_000,
            cache_enabled: true,
            issues_ttl: Duration::from_secs(10 * 60),
            comments_ttl: Duration::from_secs(5 * 60),
        }
    }
}

/// GitHub API client with caching, rate limiting, and retry.
pub struct GitHubClient {
    transport: Arc<dyn ApiTransport>,
    limiter: RateLimiter,
    cache: Option<ResponseCache>,
    stats: Arc<ClientStats>,
    options: FetchOptions,
    cancel: CancellationToken,
}

impl GitHubClient {
    /// Create a client over the given transport.
    #[must_use]
    pub fn new(transport: Arc<dyn ApiTransport>, options: FetchOptions) -> Self {
        let cache = options.cache_enabled.then(ResponseCache::new);
        Self {
            transport,
            limiter: RateLimiter::new(options.requests_per_hour),
            cache,
            stats: Arc::new(ClientStats::new()),
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Attach a cancellation token; every suspension point observes it.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle to the shared usage counters.
    #[must_use]
    pub fn stats(&self) -> Arc<ClientStats> {
        Arc::clone(&self.stats)
    }

    /// Search for issues, following pagination until exhausted or the
    /// configured maximum issue count is reached.
    pub async fn fetch_issues(&self, owner: &str, repo: &str, query: &str) -> Result<Vec<Issue>> {
        if query.trim().is_empty() {
            return Err(OkrError::invalid_config(
                "filter.query",
                "no search query specified",
            ));
        }

        let key = format!("search:{owner}/{repo}:{query}");
        if let Some(CachedPayload::Issues(issues)) = self.cache_get(&key) {
            self.stats.record_cache_hit();
            debug!(count = issues.len(), %owner, %repo, "issue search served from cache");
            return Ok(issues);
        }

        let issues = self
            .with_retry("search_issues", owner, repo, || {
                self.search_all_pages(owner, repo, query)
            })
            .await?;

        self.cache_put(key, CachedPayload::Issues(issues.clone()), self.options.issues_ttl);
        info!(count = issues.len(), %owner, %repo, "fetched issues");
        Ok(issues)
    }

    /// Fetch every comment for one issue across all pages.
    pub async fn fetch_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<RawComment>> {
        let key = format!("comments:{owner}/{repo}:{number}");
        if let Some(CachedPayload::Comments(comments)) = self.cache_get(&key) {
            self.stats.record_cache_hit();
            debug!(count = comments.len(), issue = number, "comments served from cache");
            return Ok(comments);
        }

        let comments = self
            .with_retry("list_comments", owner, repo, || {
                self.comment_all_pages(owner, repo, number)
            })
            .await?;

        self.cache_put(
            key,
            CachedPayload::Comments(comments.clone()),
            self.options.comments_ttl,
        );
        debug!(count = comments.len(), issue = number, "fetched comments");
        Ok(comments)
    }

    /// Sweep expired cache entries.
    pub fn sweep_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear_expired();
        }
    }

    fn cache_get(&self, key: &str) -> Option<CachedPayload> {
        self.cache.as_ref().and_then(|c| c.get(key))
    }

    fn cache_put(&self, key: String, payload: CachedPayload, ttl: Duration) {
        if let Some(cache) = &self.cache {
            cache.put(key, payload, ttl);
        }
    }

    async fn search_all_pages(&self, owner: &str, repo: &str, query: &str) -> Result<Vec<Issue>> {
        let mut all = Vec::new();
        let mut page = 1;
        loop {
            self.limiter.acquire(&self.cancel).await?;
            self.stats.record_api_call();
            let result = self
                .transport
                .search_issues(owner, repo, query, page, self.options.per_page)
                .await?;
            if let Some(quota) = result.quota {
                self.stats.update_quota(quota.remaining, quota.reset_at);
            }
            all.extend(result.items);

            if all.len() >= self.options.max_issues {
                warn!(
                    limit = self.options.max_issues,
                    "limiting search results to bound memory"
                );
                all.truncate(self.options.max_issues);
                break;
            }
            match result.next_page {
                Some(next) => page = next,
                None => break,
            }
        }
        Ok(all)
    }

    async fn comment_all_pages(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<RawComment>> {
        let mut all = Vec::new();
        let mut page = 1;
        loop {
            self.limiter.acquire(&self.cancel).await?;
            self.stats.record_api_call();
            let result = self
                .transport
                .issue_comments(owner, repo, number, page, self.options.per_page)
                .await?;
            if let Some(quota) = result.quota {
                self.stats.update_quota(quota.remaining, quota.reset_at);
            }
            all.extend(result.items);
            match result.next_page {
                Some(next) => page = next,
                None => break,
            }
        }
        Ok(all)
    }

    /// Run a logical operation up to `max_retries` times, sleeping
    /// `attempt²` seconds between attempts. Only transient errors are
    /// retried; the final failure is tagged with the operation and
    /// repository.
    async fn with_retry<T, F, Fut>(
        &self,
        operation: &str,
        owner: &str,
        repo: &str,
        run: F,
    ) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let max_attempts = self.options.max_retries.max(1);
        let mut attempt: u32 = 1;
        loop {
            match run().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if err.is_rate_limit() {
                        self.stats.record_rate_limit_hit();
                    }
                    if err.is_cancelled() {
                        return Err(err);
                    }
                    if attempt >= max_attempts || !err.is_transient() {
                        self.stats.record_error();
                        return Err(OkrError::api(operation, owner, repo, err));
                    }

                    let delay = Duration::from_secs(u64::from(attempt * attempt));
                    warn!(
                        %operation,
                        attempt,
                        max_attempts,
                        delay_secs = delay.as_secs(),
                        error = %err,
                        "operation failed, will retry"
                    );
                    self.stats.record_retry();
                    tokio::select! {
                        _ = self.cancel.cancelled() => return Err(OkrError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
            }
        }
    }
}
