//! Resilient access to the GitHub issue-tracking API.
//!
//! This module is the fetch layer of the pipeline: it turns an unreliable,
//! rate-limited, paginated remote API into two dependable operations,
//! [`GitHubClient::fetch_issues`] and [`GitHubClient::fetch_comments`].
//!
//! The pieces compose as follows:
//!
//! - [`transport`] - single-page HTTP fetches behind the [`ApiTransport`]
//!   trait (reqwest in production, a scripted mock in tests)
//! - [`limiter`] - the shared token-bucket gate every outbound call passes
//! - [`cache`] - read-through TTL cache; failures are never cached
//! - [`stats`] - atomic usage counters shared by handle
//! - [`client`] - the policy layer tying them together

pub mod cache;
pub mod client;
pub mod limiter;
pub mod stats;
pub mod transport;

pub use cache::{CachedPayload, ResponseCache};
pub use client::{FetchOptions, GitHubClient};
pub use limiter::RateLimiter;
pub use stats::{ClientStats, StatsSnapshot};
pub use transport::{ApiTransport, HttpTransport, Page, QuotaUpdate, DEFAULT_BASE_URL};
