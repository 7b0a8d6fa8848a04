//! Configuration loading and validation.
//!
//! Configuration lives in a TOML file; every field has a sensible default
//! so a minimal file only needs the repository coordinates. The GitHub
//! token is deliberately not part of the file: it is supplied via the
//! `GITHUB_TOKEN` environment variable and never written to disk.

use crate::error::{OkrError, Result};
use crate::github::FetchOptions;
use crate::okr::ServiceOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub github: GithubSection,
    #[serde(default)]
    pub labels: LabelsSection,
    #[serde(default)]
    pub filter: FilterSection,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub output: OutputSection,
    #[serde(default)]
    pub performance: PerformanceSection,
}

/// Repository coordinates and fetch policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GithubSection {
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_hour: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_max_issues")]
    pub max_issues: usize,
}

impl Default for GithubSection {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            timeout_seconds: default_timeout_seconds(),
            rate_limit_per_hour: default_rate_limit(),
            max_retries: default_max_retries(),
            page_size: default_page_size(),
            max_issues: default_max_issues(),
        }
    }
}

/// Labels an issue must carry to take part in the report.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LabelsSection {
    #[serde(default)]
    pub required: Vec<String>,
}

/// Issue search configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FilterSection {
    /// Explicit search query; overrides the synthesized label query.
    #[serde(default)]
    pub query: String,
}

/// Response cache policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CacheSection {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_issues_ttl_minutes")]
    pub issues_ttl_minutes: u64,
    #[serde(default = "default_comments_ttl_minutes")]
    pub comments_ttl_minutes: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            issues_ttl_minutes: default_issues_ttl_minutes(),
            comments_ttl_minutes: default_comments_ttl_minutes(),
        }
    }
}

/// Report output options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    /// `markdown` or `json`.
    #[serde(default = "default_format")]
    pub format: String,
    /// Output path; empty writes to stdout.
    #[serde(default)]
    pub file: String,
    #[serde(default = "default_title")]
    pub title: String,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            format: default_format(),
            file: String::new(),
            title: default_title(),
        }
    }
}

/// Processing parallelism.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PerformanceSection {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for PerformanceSection {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

fn default_timeout_seconds() -> u64 {
    30
}
fn default_rate_limit() -> u32 {
    5000
}
fn default_max_retries() -> u32 {
    3
}
fn default_page_size() -> u32 {
    100
}
fn default_max_issues() -> usize {
    10_000
}
fn default_true() -> bool {
    true
}
fn default_issues_ttl_minutes() -> u64 {
    10
}
fn default_comments_ttl_minutes() -> u64 {
    5
}
fn default_format() -> String {
    "markdown".to_string()
}
fn default_title() -> String {
    "OKR Status Report".to_string()
}
fn default_max_concurrency() -> usize {
    4
}

/// Commented example configuration written by `init-config`.
pub const EXAMPLE_CONFIG: &str = r#"# okr-fetcher configuration
#
# The GitHub token is read from the GITHUB_TOKEN environment variable
# and must never be stored in this file.

[github]
owner = "my-org"
repo = "my-repo"
# timeout_seconds = 30
# rate_limit_per_hour = 5000
# max_retries = 3
# page_size = 100
# max_issues = 10000

[labels]
# Issues must carry every listed label to appear in the report.
required = ["okr"]

[filter]
# Explicit search query; when empty, a query is synthesized from the
# required labels.
query = ""

[cache]
enabled = true
issues_ttl_minutes = 10
comments_ttl_minutes = 5

[output]
# "markdown" or "json"; empty file means stdout.
format = "markdown"
file = ""
title = "OKR Status Report"

[performance]
max_concurrency = 4
"#;

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            OkrError::config_with_path(format!("cannot read config: {e}"), path.to_path_buf())
        })?;
        let config: Config = toml::from_str(&raw).map_err(|e| {
            OkrError::config_with_path(format!("cannot parse config: {e}"), path.to_path_buf())
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the commented example configuration.
    pub fn write_example(path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), EXAMPLE_CONFIG)?;
        Ok(())
    }

    /// Validate field ranges and required values.
    pub fn validate(&self) -> Result<()> {
        if self.github.owner.trim().is_empty() {
            return Err(OkrError::invalid_config("github.owner", "must not be empty"));
        }
        if self.github.repo.trim().is_empty() {
            return Err(OkrError::invalid_config("github.repo", "must not be empty"));
        }
        if !(1..=100).contains(&self.github.page_size) {
            return Err(OkrError::invalid_config(
                "github.page_size",
                "must be between 1 and 100",
            ));
        }
        if self.github.max_retries == 0 {
            return Err(OkrError::invalid_config(
                "github.max_retries",
                "must be at least 1",
            ));
        }
        if self.output.format != "markdown" && self.output.format != "json" {
            return Err(OkrError::invalid_config(
                "output.format",
                "must be \"markdown\" or \"json\"",
            ));
        }
        Ok(())
    }

    /// Required labels with whitespace trimmed and empties dropped.
    #[must_use]
    pub fn required_labels(&self) -> Vec<String> {
        self.labels
            .required
            .iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect()
    }

    /// The search query: the explicit filter query when set, otherwise a
    /// query synthesized from the required labels.
    #[must_use]
    pub fn search_query(&self) -> String {
        if !self.filter.query.trim().is_empty() {
            return self.filter.query.trim().to_string();
        }
        let labels = self.required_labels();
        if labels.is_empty() {
            return "is:issue".to_string();
        }
        let mut parts: Vec<String> = labels
            .iter()
            .map(|l| format!("label:\"{l}\""))
            .collect();
        parts.push("is:issue".to_string());
        parts.join(" ")
    }

    /// Fetch policy derived from this configuration.
    #[must_use]
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            requests_per_hour: self.github.rate_limit_per_hour,
            per_page: self.github.page_size,
            max_retries: self.github.max_retries,
            max_issues: self.github.max_issues,
            cache_enabled: self.cache.enabled,
            issues_ttl: Duration::from_secs(self.cache.issues_ttl_minutes * 60),
            comments_ttl: Duration::from_secs(self.cache.comments_ttl_minutes * 60),
        }
    }

    /// Service scope derived from this configuration.
    #[must_use]
    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            owner: self.github.owner.clone(),
            repo: self.github.repo.clone(),
            required_labels: self.required_labels(),
            max_concurrency: self.performance.max_concurrency,
        }
    }

    /// HTTP timeout for outbound requests.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.github.timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> Config {
        let mut config = Config::default();
        config.github.owner = "acme".into();
        config.github.repo = "platform".into();
        config
    }

    #[test]
    fn test_minimal_toml_gets_defaults() {
        let config: Config = toml::from_str(
            r#"
            [github]
            owner = "acme"
            repo = "platform"
            "#,
        )
        .unwrap();
        assert_eq!(config.github.rate_limit_per_hour, 5000);
        assert_eq!(config.github.max_retries, 3);
        assert_eq!(config.github.page_size, 100);
        assert_eq!(config.github.max_issues, 10_000);
        assert!(config.cache.enabled);
        assert_eq!(config.output.format, "markdown");
        config.validate().unwrap();
    }

    #[test]
    fn test_example_config_parses_and_validates() {
        let config: Config = toml::from_str(EXAMPLE_CONFIG).unwrap();
        config.validate().unwrap();
        assert_eq!(config.github.owner, "my-org");
        assert_eq!(config.required_labels(), vec!["okr".to_string()]);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: std::result::Result<Config, _> = toml::from_str(
            r#"
            [github]
            owner = "acme"
            repo = "platform"
            tokenn = "typo"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_requires_owner_and_repo() {
        let config = Config::default();
        assert!(matches!(
            config.validate(),
            Err(OkrError::InvalidConfig { ref field, .. }) if field == "github.owner"
        ));
    }

    #[test]
    fn test_validation_rejects_bad_page_size() {
        let mut config = minimal();
        config.github.page_size = 0;
        assert!(config.validate().is_err());
        config.github.page_size = 250;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_unknown_format() {
        let mut config = minimal();
        config.output.format = "google-docs".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_search_query_prefers_explicit_query() {
        let mut config = minimal();
        config.filter.query = "is:issue is:open label:okr".into();
        config.labels.required = vec!["ignored".into()];
        assert_eq!(config.search_query(), "is:issue is:open label:okr");
    }

    #[test]
    fn test_search_query_synthesized_from_labels() {
        let mut config = minimal();
        config.labels.required = vec!["okr".into(), "q3 2025".into()];
        assert_eq!(
            config.search_query(),
            "label:\"okr\" label:\"q3 2025\" is:issue"
        );
    }

    #[test]
    fn test_search_query_without_labels() {
        assert_eq!(minimal().search_query(), "is:issue");
    }

    #[test]
    fn test_required_labels_trimmed() {
        let mut config = minimal();
        config.labels.required = vec!["  okr ".into(), "   ".into()];
        assert_eq!(config.required_labels(), vec!["okr".to_string()]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load("/nonexistent/config.toml").unwrap_err();
        assert!(matches!(err, OkrError::Config { path: Some(_), .. }));
    }

    #[test]
    fn test_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        Config::write_example(&path).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.github.owner, "my-org");
    }

    #[test]
    fn test_fetch_options_derivation() {
        let mut config = minimal();
        config.cache.issues_ttl_minutes = 2;
        let options = config.fetch_options();
        assert_eq!(options.issues_ttl, Duration::from_secs(120));
        assert_eq!(options.per_page, 100);
    }
}
