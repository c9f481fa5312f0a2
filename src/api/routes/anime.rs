//! Anime information and search handlers.

use super::{AnimeInfoRequest, SearchRequest};
use crate::api::AppState;
use crate::error::{ApiError, Error};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// POST /anime/info - Resolve anime information for a page URL
#[utoipa::path(
    post,
    path = "/api/v1/anime/info",
    tag = "anime",
    request_body = AnimeInfoRequest,
    responses(
        (status = 200, description = "Resolved anime information", body = crate::types::AnimeInfo),
        (status = 400, description = "Missing URL", body = ApiError),
        (status = 422, description = "Page structure not recognized", body = ApiError),
        (status = 502, description = "Site or gateway unreachable", body = ApiError)
    )
)]
pub async fn anime_info(
    State(state): State<AppState>,
    Json(request): Json<AnimeInfoRequest>,
) -> Response {
    if request.url.trim().is_empty() {
        return Error::Config {
            message: "no URL provided".into(),
            key: Some("url".into()),
        }
        .into_response();
    }

    match state.downloader.anime_info(request.url.trim()).await {
        Ok(info) => (StatusCode::OK, Json(info)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /search - Search the site for anime by keyword
#[utoipa::path(
    post,
    path = "/api/v1/search",
    tag = "anime",
    request_body = SearchRequest,
    responses(
        (status = 200, description = "Search results", body = Vec<crate::types::SearchResult>),
        (status = 400, description = "Missing query", body = ApiError),
        (status = 502, description = "Site unreachable", body = ApiError)
    )
)]
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Response {
    if request.query.trim().is_empty() {
        return Error::Config {
            message: "no query provided".into(),
            key: Some("query".into()),
        }
        .into_response();
    }

    match state
        .downloader
        .search(request.query.trim(), request.max_results)
        .await
    {
        Ok(results) => (StatusCode::OK, Json(results)).into_response(),
        Err(e) => e.into_response(),
    }
}
