use std::sync::Arc;

use indexhub_core::{Config, QueryOrchestrator, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    orchestrator: Arc<QueryOrchestrator>,
}

impl AppState {
    pub fn new(config: Config, orchestrator: Arc<QueryOrchestrator>) -> Self {
        Self {
            config,
            orchestrator,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn orchestrator(&self) -> &Arc<QueryOrchestrator> {
        &self.orchestrator
    }
}
