//! Query orchestrator implementation.
//!
//! Fans one query out to every capable source, one task per source, and
//! streams each source's outcome as soon as it settles:
//! - Only one query is in flight; a new one cancels the previous query and
//!   waits for its tasks to drain before dispatching.
//! - Cancellation is checked before and after each source call. An in-flight
//!   call is never interrupted, its result is just reported as aborted.
//! - A failing or panicking source only affects its own outcome.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::OrchestratorConfig;
use crate::metrics;
use crate::registry::SourceRegistry;
use crate::source::{Query, SourceAdapter, SourceError, SourceSummary};

use super::filter::post_process;
use super::types::{OrchestratorError, OrchestratorEvent, QueryOutcome, QuerySummary};

pub struct QueryOrchestrator {
    config: OrchestratorConfig,
    registry: Option<SourceRegistry>,
    sources: OnceCell<Vec<Arc<dyn SourceAdapter>>>,
    /// Token of the most recent query, cancelled when a newer one starts.
    current: Mutex<Option<(Uuid, CancellationToken)>>,
    /// Held until every task of the current query settled, even when the
    /// `execute` future itself is dropped early.
    in_flight: Arc<tokio::sync::Mutex<()>>,
}

impl QueryOrchestrator {
    /// Orchestrator whose sources come from `registry` on [`initialize`](Self::initialize).
    pub fn new(config: OrchestratorConfig, registry: SourceRegistry) -> Self {
        Self {
            config,
            registry: Some(registry),
            sources: OnceCell::new(),
            current: Mutex::new(None),
            in_flight: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Orchestrator over an already-built source list; initialized immediately.
    pub fn with_sources(config: OrchestratorConfig, sources: Vec<Arc<dyn SourceAdapter>>) -> Self {
        Self {
            config,
            registry: None,
            sources: OnceCell::new_with(Some(sources)),
            current: Mutex::new(None),
            in_flight: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Build every source once. Later calls return the same count without
    /// emitting events.
    pub async fn initialize(&self, events: &UnboundedSender<OrchestratorEvent>) -> usize {
        let sources = self
            .sources
            .get_or_init(|| async {
                let sources = match &self.registry {
                    Some(registry) => {
                        registry
                            .read_all(|attempt| {
                                let _ = events.send(OrchestratorEvent::SourceInitProcessed(attempt));
                            })
                            .await
                    }
                    None => Vec::new(),
                };
                let _ = events.send(OrchestratorEvent::SourcesInitialized {
                    count: sources.len(),
                });
                sources
            })
            .await;
        sources.len()
    }

    pub fn is_initialized(&self) -> bool {
        self.sources.initialized()
    }

    /// Initialized sources; empty before [`initialize`](Self::initialize).
    pub fn sources(&self) -> Vec<SourceSummary> {
        self.sources
            .get()
            .map(|sources| sources.iter().map(|s| s.info().summary()).collect())
            .unwrap_or_default()
    }

    /// Approximate number of configured sources (see [`SourceRegistry::source_count`]).
    pub async fn source_count(&self) -> usize {
        match &self.registry {
            Some(registry) => registry.source_count().await,
            None => self.sources.get().map(Vec::len).unwrap_or(0),
        }
    }

    /// Run `query` against every selected source.
    ///
    /// Emits exactly one [`OrchestratorEvent::SourceResult`] per selected
    /// source, then [`OrchestratorEvent::QueryFinished`] unless `cancel` was
    /// triggered. Dropping the returned future cancels the query; the next
    /// `execute` still waits for its tasks to settle.
    pub async fn execute(
        &self,
        query: Query,
        cancel: CancellationToken,
        events: UnboundedSender<OrchestratorEvent>,
    ) -> Result<QuerySummary, OrchestratorError> {
        let sources = self.sources.get().ok_or(OrchestratorError::NotInitialized)?;

        self.supersede(query.id, &cancel);
        // Dropping this future mid-query cancels it; the tasks then fade to
        // aborted while still holding the drain lock.
        let cancel_on_drop = cancel.clone().drop_guard();
        let drain = Arc::new(Arc::clone(&self.in_flight).lock_owned().await);
        let start = Instant::now();

        let selected: Vec<Arc<dyn SourceAdapter>> = sources
            .iter()
            .filter(|s| self.config.queryable_kinds.contains(&s.kind()) && s.can_handle(&query))
            .cloned()
            .collect();

        info!(
            query_id = %query.id,
            term = %query.term,
            selected = selected.len(),
            "Executing query"
        );
        metrics::QUERIES_EXECUTED.inc();

        let query = Arc::new(query);
        let timeout = self.config.source_timeout_secs.map(Duration::from_secs);
        let tasks: Vec<_> = selected
            .iter()
            .map(|adapter| {
                let summary = adapter.info().summary();
                let task = run_source(
                    adapter.clone(),
                    query.clone(),
                    cancel.clone(),
                    timeout,
                    events.clone(),
                );
                let drain = Arc::clone(&drain);
                let handle = tokio::spawn(async move {
                    let _drain = drain;
                    task.await
                });
                (summary, handle)
            })
            .collect();

        let mut summary = QuerySummary {
            query_id: query.id,
            selected: selected.len(),
            ..Default::default()
        };
        for (source, handle) in tasks {
            let outcome_label = match handle.await {
                Ok(label) => label,
                Err(e) => {
                    warn!(source = %source.id, error = %e, "Source task panicked");
                    let outcome = QueryOutcome::failure("adapter task panicked");
                    let label = outcome.label();
                    metrics::SOURCE_OUTCOMES
                        .with_label_values(&[source.id.as_str(), label])
                        .inc();
                    let _ = events.send(OrchestratorEvent::SourceResult {
                        query_id: query.id,
                        source,
                        outcome,
                    });
                    label
                }
            };
            match outcome_label {
                "success" => summary.succeeded += 1,
                "aborted" => summary.aborted += 1,
                _ => summary.failed += 1,
            }
        }

        summary.cancelled = cancel.is_cancelled();
        summary.duration_ms = start.elapsed().as_millis() as u64;
        if !summary.cancelled {
            let _ = events.send(OrchestratorEvent::QueryFinished { query_id: query.id });
        }
        self.release(query.id);
        let _ = cancel_on_drop.disarm();
        drop(drain);

        info!(
            query_id = %query.id,
            succeeded = summary.succeeded,
            failed = summary.failed,
            aborted = summary.aborted,
            cancelled = summary.cancelled,
            duration_ms = summary.duration_ms,
            "Query settled"
        );
        Ok(summary)
    }

    /// Forward a download to the source that produced the link.
    pub async fn download(&self, source_id: &str, link: &str) -> Result<Vec<u8>, OrchestratorError> {
        let sources = self.sources.get().ok_or(OrchestratorError::NotInitialized)?;
        let adapter = sources
            .iter()
            .find(|s| s.id() == source_id)
            .ok_or_else(|| OrchestratorError::UnknownSource(source_id.to_string()))?;
        Ok(adapter.download(link).await?)
    }

    /// Cancel the in-flight query, if any, and make `cancel` the current one.
    fn supersede(&self, query_id: Uuid, cancel: &CancellationToken) {
        let previous = match self.current.lock() {
            Ok(mut current) => current.replace((query_id, cancel.clone())),
            Err(poisoned) => poisoned.into_inner().replace((query_id, cancel.clone())),
        };
        if let Some((previous_id, token)) = previous {
            if !token.is_cancelled() {
                debug!(previous = %previous_id, next = %query_id, "Superseding query");
                token.cancel();
            }
        }
    }

    fn release(&self, query_id: Uuid) {
        if let Ok(mut current) = self.current.lock() {
            if current.as_ref().is_some_and(|(id, _)| *id == query_id) {
                *current = None;
            }
        }
    }
}

/// One source's share of a query. Sends its own outcome and returns its label.
async fn run_source(
    adapter: Arc<dyn SourceAdapter>,
    query: Arc<Query>,
    cancel: CancellationToken,
    timeout: Option<Duration>,
    events: UnboundedSender<OrchestratorEvent>,
) -> &'static str {
    let source = adapter.info();
    let outcome = if cancel.is_cancelled() {
        QueryOutcome::Aborted
    } else {
        let start = Instant::now();
        let call = adapter.results_for_query(&query);
        let result = match timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
                Err(SourceError::Other(format!(
                    "timed out after {}s",
                    limit.as_secs()
                )))
            }),
            None => call.await,
        };
        metrics::SOURCE_LATENCY
            .with_label_values(&[source.id.as_str()])
            .observe(start.elapsed().as_secs_f64());

        match result {
            Ok(_) if cancel.is_cancelled() => QueryOutcome::Aborted,
            Ok(items) => QueryOutcome::Success {
                items: post_process(items, &query, source, Utc::now()),
            },
            Err(e) => {
                warn!(source = %source.id, error = %e, "Source query failed");
                QueryOutcome::from(&e)
            }
        }
    };

    let label = outcome.label();
    metrics::SOURCE_OUTCOMES
        .with_label_values(&[source.id.as_str(), label])
        .inc();
    debug!(source = %source.id, outcome = label, "Source settled");
    let _ = events.send(OrchestratorEvent::SourceResult {
        query_id: query.id,
        source: source.summary(),
        outcome,
    });
    label
}
