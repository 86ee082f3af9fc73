//! Types for the query orchestrator.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::registry::InitAttempt;
use crate::source::{ResultItem, SourceError, SourceSummary};

/// Errors that can occur during orchestration.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// `execute` was called before `initialize`.
    #[error("orchestrator not initialized")]
    NotInitialized,

    #[error("unknown source: {0}")]
    UnknownSource(String),

    #[error("download failed: {0}")]
    Download(#[from] SourceError),
}

/// Why a source failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The site is down or served an anti-bot challenge.
    Unreachable,
    Error,
}

/// Terminal result of one source for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QueryOutcome {
    Success { items: Vec<ResultItem> },
    Aborted,
    Failure { kind: FailureKind, message: String },
}

impl QueryOutcome {
    pub fn failure(message: impl Into<String>) -> Self {
        QueryOutcome::Failure {
            kind: FailureKind::Error,
            message: message.into(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QueryOutcome::Success { .. } => "success",
            QueryOutcome::Aborted => "aborted",
            QueryOutcome::Failure { .. } => "failure",
        }
    }
}

impl From<&SourceError> for QueryOutcome {
    fn from(e: &SourceError) -> Self {
        QueryOutcome::Failure {
            kind: if e.is_unreachable() {
                FailureKind::Unreachable
            } else {
                FailureKind::Error
            },
            message: e.to_string(),
        }
    }
}

/// Everything a hosting application can observe.
///
/// Delivered over the channel passed to each call; one subscriber per query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrchestratorEvent {
    SourceResult {
        query_id: Uuid,
        source: SourceSummary,
        outcome: QueryOutcome,
    },
    /// Every source settled and the query was not cancelled.
    QueryFinished { query_id: Uuid },
    SourcesInitialized { count: usize },
    SourceInitProcessed(InitAttempt),
}

/// Returned by `execute` once every task settled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QuerySummary {
    pub query_id: Uuid,
    pub selected: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub aborted: usize,
    pub cancelled: bool,
    pub duration_ms: u64,
}
