//! API usage statistics for the GitHub client.
//!
//! Counters are monotonically increasing and updated atomically so that
//! concurrent fetch workers can share one instance. Quota information is
//! refreshed from response headers as pages arrive.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Default, Clone)]
struct QuotaState {
    remaining: Option<u32>,
    reset_at: Option<DateTime<Utc>>,
    last_api_call: Option<DateTime<Utc>>,
}

/// Shared, thread-safe usage counters for one client instance.
///
/// Passed by handle into the client rather than living in a global, so
/// multiple independent clients can coexist in tests.
#[derive(Debug, Default)]
pub struct ClientStats {
    api_calls: AtomicU64,
    cache_hits: AtomicU64,
    errors: AtomicU64,
    retries: AtomicU64,
    rate_limit_hits: AtomicU64,
    quota: Mutex<QuotaState>,
}

impl ClientStats {
    /// Create a zeroed stats instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one outbound API call.
    pub fn record_api_call(&self) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
        let mut quota = self.quota.lock().unwrap_or_else(|e| e.into_inner());
        quota.last_api_call = Some(Utc::now());
    }

    /// Record a cache hit that avoided an outbound call.
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an operation that failed after exhausting its retries.
    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one retry attempt.
    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an explicit rate-limit response (HTTP 429).
    pub fn record_rate_limit_hit(&self) {
        self.rate_limit_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Update last-known quota from response headers.
    pub fn update_quota(&self, remaining: u32, reset_at: Option<DateTime<Utc>>) {
        let mut quota = self.quota.lock().unwrap_or_else(|e| e.into_inner());
        quota.remaining = Some(remaining);
        if reset_at.is_some() {
            quota.reset_at = reset_at;
        }
    }

    /// Take a point-in-time copy of all counters.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        let quota = self
            .quota
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        StatsSnapshot {
            api_calls: self.api_calls.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            rate_limit_hits: self.rate_limit_hits.load(Ordering::Relaxed),
            remaining_quota: quota.remaining,
            quota_reset_at: quota.reset_at,
            last_api_call: quota.last_api_call,
        }
    }
}

/// Immutable copy of the counters at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub api_calls: u64,
    pub cache_hits: u64,
    pub errors: u64,
    pub retries: u64,
    pub rate_limit_hits: u64,
    pub remaining_quota: Option<u32>,
    pub quota_reset_at: Option<DateTime<Utc>>,
    pub last_api_call: Option<DateTime<Utc>>,
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "API calls:       {}", self.api_calls)?;
        writeln!(f, "Cache hits:      {}", self.cache_hits)?;
        writeln!(f, "Retries:         {}", self.retries)?;
        writeln!(f, "Errors:          {}", self.errors)?;
        writeln!(f, "Rate-limit hits: {}", self.rate_limit_hits)?;
        match self.remaining_quota {
            Some(remaining) => writeln!(f, "Remaining quota: {remaining}")?,
            None => writeln!(f, "Remaining quota: unknown")?,
        }
        if let Some(reset) = self.quota_reset_at {
            writeln!(f, "Quota resets at: {}", reset.to_rfc3339())?;
        }
        Ok(())
    }
}
