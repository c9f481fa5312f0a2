//! OpenAPI documentation and schema generation
//!
//! This module defines the OpenAPI specification for the kai-dl REST API
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the kai-dl REST API
///
/// The spec can be accessed via:
/// - `/api/v1/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "kai-dl REST API",
        version = "0.1.0",
        description = "REST API for submitting and monitoring anime download jobs",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:6789/api/v1", description = "Local development server")
    ),
    paths(
        // Jobs
        crate::api::routes::submit_job,
        crate::api::routes::list_jobs,
        crate::api::routes::get_job,
        crate::api::routes::clear_job,

        // Anime
        crate::api::routes::anime_info,
        crate::api::routes::search,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::JobId,
        crate::types::JobStatus,
        crate::types::LogLevel,
        crate::types::LogEntry,
        crate::types::JobSnapshot,
        crate::types::AnimeInfo,
        crate::types::EpisodeSummary,
        crate::types::LanguageAvailability,
        crate::types::SearchResult,
        crate::types::Event,

        // Config types from config.rs
        crate::config::JobOptions,
        crate::config::DownloadMode,
        crate::config::SubtitleMode,

        // API request/response types from routes
        crate::api::routes::SubmitJobRequest,
        crate::api::routes::SubmitJobResponse,
        crate::api::routes::AnimeInfoRequest,
        crate::api::routes::SearchRequest,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "jobs", description = "Download jobs - Submit, poll, and clear download jobs"),
        (name = "anime", description = "Anime - Resolve page URLs into metadata and search the site"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events"),
    )
)]
pub struct ApiDoc;
