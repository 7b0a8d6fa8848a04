//! Custom error types for the OKR fetcher.
//!
//! This module provides structured error types that encode the retry
//! taxonomy used by the GitHub client: transient errors are retried with
//! backoff, permanent errors surface immediately.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for OKR fetcher operations
#[derive(Error, Debug)]
pub enum OkrError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Failed to load configuration
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig { field: String, reason: String },

    // =========================================================================
    // Transient API Errors (retried with backoff)
    // =========================================================================
    /// Request timed out
    #[error("Request timed out: {message}")]
    Timeout { message: String },

    /// Connection failed (reset, refused, DNS)
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// Server-side error (500/502/503)
    #[error("Server error: HTTP {status}")]
    Server { status: u16 },

    /// Explicit rate-limit signal (HTTP 429 or exhausted quota)
    #[error("Rate limited by API{}", reset_hint(.reset_at))]
    RateLimited { reset_at: Option<DateTime<Utc>> },

    // =========================================================================
    // Permanent API Errors (never retried)
    // =========================================================================
    /// Non-retryable HTTP error (4xx other than 429)
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Response body could not be parsed
    #[error("Malformed API response: {message}")]
    MalformedResponse { message: String },

    /// A URL did not match the expected GitHub shape
    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },

    // =========================================================================
    // Operation-level Errors
    // =========================================================================
    /// An API operation failed after exhausting retries
    #[error("{operation} failed for {owner}/{repo}: {source}")]
    Api {
        operation: String,
        owner: String,
        repo: String,
        #[source]
        source: Box<OkrError>,
    },

    /// The run was cancelled before the operation completed
    #[error("Operation cancelled")]
    Cancelled,

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// IO error wrapper
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON error wrapper
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn reset_hint(reset_at: &Option<DateTime<Utc>>) -> String {
    match reset_at {
        Some(t) => format!(" (resets at {})", t.to_rfc3339()),
        None => String::new(),
    }
}

impl OkrError {
    // =========================================================================
    // Constructor helpers
    // =========================================================================

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            path: None,
        }
    }

    /// Create a configuration error with path
    pub fn config_with_path(message: impl Into<String>, path: PathBuf) -> Self {
        Self::Config {
            message: message.into(),
            path: Some(path),
        }
    }

    /// Create an invalid-configuration error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a malformed-response error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    /// Tag an error with the failing operation and repository
    pub fn api(
        operation: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        source: OkrError,
    ) -> Self {
        Self::Api {
            operation: operation.into(),
            owner: owner.into(),
            repo: repo.into(),
            source: Box::new(source),
        }
    }

    /// Map an HTTP status code to the appropriate error variant
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            429 => Self::RateLimited { reset_at: None },
            500 | 502 | 503 => Self::Server { status },
            _ => Self::Http {
                status,
                message: message.into(),
            },
        }
    }

    // =========================================================================
    // Classification helpers
    // =========================================================================

    /// Check if this error is transient and worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. }
            | Self::Connection { .. }
            | Self::Server { .. }
            | Self::RateLimited { .. } => true,
            Self::Api { source, .. } => source.is_transient(),
            _ => false,
        }
    }

    /// Check if this error is an explicit rate-limit signal
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Check if this error means the run was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Get error code for exit status
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } | Self::InvalidConfig { .. } => 7,
            Self::Cancelled => 130,
            _ => 1,
        }
    }
}

impl From<reqwest::Error> for OkrError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(err.to_string())
        } else if err.is_connect() {
            Self::connection(err.to_string())
        } else if err.is_decode() {
            Self::malformed(err.to_string())
        } else {
            Self::connection(err.to_string())
        }
    }
}

/// Type alias for OKR fetcher results
pub type Result<T> = std::result::Result<T, OkrError>;
