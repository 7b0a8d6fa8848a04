//! Token-bucket rate limiter shared by every outbound API call.
//!
//! The bucket is sized from a requests-per-hour budget with a fixed burst
//! capacity of 10 and refills continuously. Acquisition awaits until a
//! token is available and observes cancellation, returning
//! [`OkrError::Cancelled`] instead of hanging.

use crate::error::{OkrError, Result};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Burst capacity of the token bucket.
const BURST_CAPACITY: f64 = 10.0;

/// Default hourly budget when none is configured (GitHub's authenticated
/// REST limit).
const DEFAULT_REQUESTS_PER_HOUR: u32 = 5000;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Continuously refilling token bucket gating outbound API calls.
#[derive(Debug)]
pub struct RateLimiter {
    tokens_per_sec: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    /// Create a limiter from an hourly request budget.
    ///
    /// A zero budget falls back to the default of 5000 requests per hour.
    #[must_use]
    pub fn new(requests_per_hour: u32) -> Self {
        let budget = if requests_per_hour == 0 {
            DEFAULT_REQUESTS_PER_HOUR
        } else {
            requests_per_hour
        };
        Self {
            tokens_per_sec: f64::from(budget) / 3600.0,
            bucket: Mutex::new(Bucket {
                tokens: BURST_CAPACITY,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Take one token, waiting for refill if the bucket is empty.
    ///
    /// Returns [`OkrError::Cancelled`] if `cancel` fires while waiting.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<()> {
        loop {
            let wait = self.try_take();
            let Some(wait) = wait else {
                return Ok(());
            };
            tokio::select! {
                _ = cancel.cancelled() => return Err(OkrError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Attempt to take a token. Returns `None` on success, or the duration
    /// to wait before enough tokens will have refilled.
    fn try_take(&self) -> Option<Duration> {
        let mut bucket = self.bucket.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.tokens_per_sec).min(BURST_CAPACITY);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            None
        } else {
            let deficit = 1.0 - bucket.tokens;
            Some(Duration::from_secs_f64(deficit / self.tokens_per_sec))
        }
    }
}
