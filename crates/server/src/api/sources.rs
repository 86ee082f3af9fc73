//! Source API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use indexhub_core::{OrchestratorError, SourceSummary};

use super::search::error_response;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SourcesResponse {
    pub initialized: bool,
    pub sources: Vec<SourceSummary>,
}

#[derive(Debug, Serialize)]
pub struct SourceCountResponse {
    /// Configured sources, whether or not they initialized.
    pub configured: usize,
    pub initialized: usize,
}

#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub link: String,
}

/// GET /api/v1/sources
pub async fn list_sources(State(state): State<Arc<AppState>>) -> Json<SourcesResponse> {
    let orchestrator = state.orchestrator();
    Json(SourcesResponse {
        initialized: orchestrator.is_initialized(),
        sources: orchestrator.sources(),
    })
}

/// GET /api/v1/sources/count
pub async fn count_sources(State(state): State<Arc<AppState>>) -> Json<SourceCountResponse> {
    let orchestrator = state.orchestrator();
    Json(SourceCountResponse {
        configured: orchestrator.source_count().await,
        initialized: orchestrator.sources().len(),
    })
}

/// POST /api/v1/sources/{id}/download
///
/// Fetch a result's payload through the source that produced it, so the
/// source's session cookies apply.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<DownloadRequest>,
) -> Response {
    match state.orchestrator().download(&id, &body.link).await {
        Ok(bytes) => {
            let content_type = if body.link.starts_with("magnet:") {
                "text/plain; charset=utf-8"
            } else {
                "application/x-bittorrent"
            };
            ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        Err(OrchestratorError::NotInitialized) => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            OrchestratorError::NotInitialized,
        )
        .into_response(),
        Err(e @ OrchestratorError::UnknownSource(_)) => {
            error_response(StatusCode::NOT_FOUND, e).into_response()
        }
        Err(e @ OrchestratorError::Download(_)) => {
            warn!(source = %id, error = %e, "Download failed");
            error_response(StatusCode::BAD_GATEWAY, e).into_response()
        }
    }
}
