//! The OKR engine: hierarchy resolution, status aggregation, and report
//! orchestration.
//!
//! [`hierarchy`] and [`status`] are pure and never raise errors; they
//! degrade to defined fallbacks (forced objectives, Unknown status) so a
//! best-effort report can always be produced. [`service`] wires them to
//! the fetch layer.

pub mod hierarchy;
pub mod service;
pub mod status;

pub use hierarchy::{classify, extract_parent_number, Classification};
pub use service::{owner_repo_from_url, OkrReport, OkrService, ServiceOptions};
pub use status::{key_result_status, objective_status};
