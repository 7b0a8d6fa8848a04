//! okr-fetcher: generate OKR status reports from GitHub issues.
//!
//! The pipeline has three layers:
//!
//! - **Fetch** ([`github`]): a rate-limited, retrying, caching client over
//!   the GitHub search and comments endpoints.
//! - **Resolve** ([`okr`], [`updates`]): pure hierarchy resolution and
//!   status aggregation over the fetched issues and their weekly updates.
//! - **Render** ([`report`]): Markdown and JSON views of the assembled
//!   objective tree.
//!
//! # Example
//!
//! ```rust,ignore
//! let transport = Arc::new(HttpTransport::new(token, config.timeout())?);
//! let client = GitHubClient::new(transport, config.fetch_options());
//! let service = OkrService::new(client, config.service_options());
//! let report = service.build_report(&config.search_query()).await?;
//! println!("{}", report::render_markdown(&report, &config.output.title, Utc::now()));
//! ```

pub mod config;
pub mod error;
pub mod github;
pub mod model;
pub mod okr;
pub mod report;
pub mod testing;
pub mod updates;

pub use config::Config;
pub use error::{OkrError, Result};
pub use github::{ApiTransport, FetchOptions, GitHubClient, HttpTransport, StatsSnapshot};
pub use model::{Issue, IssueState, IssueType, IssueWithUpdates, RawComment, Status, WeeklyUpdate};
pub use okr::{OkrReport, OkrService, ServiceOptions};
