//! Query orchestrator.
//!
//! Per query: `Idle -> Pending -> {Completed | Aborted}`. Outcomes are
//! delivered as [`OrchestratorEvent`]s over a channel supplied by the caller.

mod filter;
mod runner;
mod types;

pub use filter::post_process;
pub use runner::QueryOrchestrator;
pub use types::{FailureKind, OrchestratorError, OrchestratorEvent, QueryOutcome, QuerySummary};
