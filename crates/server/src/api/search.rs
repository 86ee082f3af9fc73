//! Search API handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::unbounded_channel;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use uuid::Uuid;

use indexhub_core::{
    OrchestratorError, OrchestratorEvent, Query, QueryOutcome, QuerySummary, QueryType,
    SourceSummary,
};

use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

/// A query as submitted by clients, over HTTP or the WebSocket.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(default, alias = "query")]
    pub term: String,
    #[serde(default, rename = "type")]
    pub query_type: QueryType,
    #[serde(default)]
    pub categories: Vec<u32>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub season: Option<u32>,
    #[serde(default)]
    pub episode: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl SearchRequest {
    pub fn into_query(self) -> Query {
        Query {
            query_type: self.query_type,
            term: self.term,
            imdb_id: self.imdb_id,
            season: self.season,
            episode: self.episode,
            categories: self.categories,
            limit: self.limit,
            ..Default::default()
        }
    }
}

/// One source's outcome for the query.
#[derive(Debug, Serialize)]
pub struct SourceOutcome {
    pub source: SourceSummary,
    pub outcome: QueryOutcome,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub query_id: Uuid,
    pub summary: QuerySummary,
    pub sources: Vec<SourceOutcome>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn error_response(status: StatusCode, error: impl ToString) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/search
///
/// Run a query to completion and return every source's outcome at once.
/// Dropping the request (client disconnect) cancels the query.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, impl IntoResponse> {
    let query = body.into_query();
    let query_id = query.id;
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let (tx, mut rx) = unbounded_channel();
    let orchestrator = Arc::clone(state.orchestrator());
    let task = tokio::spawn(async move { orchestrator.execute(query, cancel, tx).await });

    let summary = match task.await {
        Ok(Ok(summary)) => summary,
        Ok(Err(OrchestratorError::NotInitialized)) => {
            return Err(error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "sources are not initialized yet",
            ))
        }
        Ok(Err(e)) => return Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, e)),
        Err(e) => {
            warn!(query_id = %query_id, error = %e, "Search task failed");
            return Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, e));
        }
    };

    let mut sources = Vec::with_capacity(summary.selected);
    while let Ok(event) = rx.try_recv() {
        if let OrchestratorEvent::SourceResult {
            source, outcome, ..
        } = event
        {
            sources.push(SourceOutcome { source, outcome });
        }
    }

    Ok(Json(SearchResponse {
        query_id,
        summary,
        sources,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_request_defaults() {
        let request: SearchRequest = serde_json::from_str(r#"{"query": "ubuntu"}"#).unwrap();
        let query = request.into_query();
        assert_eq!(query.term, "ubuntu");
        assert_eq!(query.query_type, QueryType::Search);
        assert!(query.categories.is_empty());
        assert_eq!(query.limit, None);
    }

    #[test]
    fn test_search_request_tv() {
        let request: SearchRequest = serde_json::from_str(
            r#"{"term": "show", "type": "tvsearch", "season": 2, "episode": "5", "categories": [5000]}"#,
        )
        .unwrap();
        let query = request.into_query();
        assert!(query.is_tv_search());
        assert_eq!(query.search_string(), "show S02E05");
        assert_eq!(query.categories, vec![5000]);
    }
}
