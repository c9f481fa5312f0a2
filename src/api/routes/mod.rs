//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`jobs`] — Job submission, status polling, clearing
//! - [`anime`] — Anime information and search
//! - [`system`] — Health, events, OpenAPI

use serde::{Deserialize, Serialize};

mod anime;
mod jobs;
mod system;

// Re-export all handlers so `routes::function_name` continues to work
pub use anime::*;
pub use jobs::*;
pub use system::*;

// ============================================================================
// Request/Response Types (shared across handlers)
// ============================================================================

/// Request body for POST /jobs
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmitJobRequest {
    /// Anime page URL to download from
    pub url: String,

    /// Per-job options; omitted fields take their defaults
    #[serde(default)]
    pub options: crate::config::JobOptions,
}

/// Response body for POST /jobs
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmitJobResponse {
    /// Allocated job id
    pub job_id: crate::types::JobId,

    /// Human-readable confirmation
    pub message: String,
}

/// Request body for POST /anime/info
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct AnimeInfoRequest {
    /// Anime page URL to resolve
    pub url: String,
}

/// Request body for POST /search
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SearchRequest {
    /// Search keyword
    pub query: String,

    /// Maximum number of results (default: 20)
    #[serde(default)]
    pub max_results: Option<usize>,
}
