//! Source registry.
//!
//! Builds every configured adapter at startup. Native adapters come from an
//! explicit [`NativeRegistry`]; data-described ones from a
//! [`DefinitionRepository`] run through a [`DefinitionInterpreter`] on
//! blocking workers. A failure constructs nothing for that one source and is
//! reported through the progress callback; the batch always continues.

mod context;
mod definitions;
mod error;
mod native;

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use crate::source::SourceAdapter;

pub use context::AdapterContext;
pub use definitions::{
    DefinitionInterpreter, DefinitionRepository, DirectoryDefinitionRepository,
    InMemoryDefinitionRepository,
};
pub use error::RegistryError;
pub use native::{AdapterConstructor, NativeRegistry};

/// Outcome of one attempted adapter instantiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitAttempt {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InitAttempt {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

pub struct SourceRegistry {
    ctx: AdapterContext,
    native: NativeRegistry,
    definitions: Option<(Arc<dyn DefinitionRepository>, Arc<dyn DefinitionInterpreter>)>,
}

impl SourceRegistry {
    pub fn new(ctx: AdapterContext, native: NativeRegistry) -> Self {
        Self {
            ctx,
            native,
            definitions: None,
        }
    }

    pub fn with_definitions(
        mut self,
        repository: Arc<dyn DefinitionRepository>,
        interpreter: Arc<dyn DefinitionInterpreter>,
    ) -> Self {
        self.definitions = Some((repository, interpreter));
        self
    }

    /// Instantiate every source.
    ///
    /// `on_processed` fires once per attempt, success or failure. Sources
    /// whose id was already taken are dropped. Meant to run once at startup.
    pub async fn read_all<F>(&self, on_processed: F) -> Vec<Arc<dyn SourceAdapter>>
    where
        F: Fn(InitAttempt) + Send + Sync,
    {
        let (natives, definitions) =
            tokio::join!(self.build_natives(), self.build_definitions());

        let mut seen = HashSet::new();
        let mut sources = Vec::new();
        for (name, result) in natives.into_iter().chain(definitions) {
            let result = result.and_then(|adapter| {
                if seen.insert(adapter.id().to_string()) {
                    Ok(adapter)
                } else {
                    Err(RegistryError::DuplicateId(adapter.id().to_string()))
                }
            });
            match result {
                Ok(adapter) => {
                    on_processed(InitAttempt {
                        name: adapter.info().name.clone(),
                        error: None,
                    });
                    sources.push(adapter);
                }
                Err(e) => {
                    error!(source = %name, error = %e, "Dropping source");
                    on_processed(InitAttempt {
                        name,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        info!(count = sources.len(), "Sources initialized");
        sources
    }

    async fn build_natives(&self) -> Vec<(String, Result<Arc<dyn SourceAdapter>, RegistryError>)> {
        self.native.build(&self.ctx)
    }

    async fn build_definitions(
        &self,
    ) -> Vec<(String, Result<Arc<dyn SourceAdapter>, RegistryError>)> {
        let Some((repository, interpreter)) = &self.definitions else {
            return Vec::new();
        };
        let raw_definitions = match repository.read_definitions().await {
            Ok(raw) => raw,
            Err(e) => {
                error!(error = %e, "Failed to read definitions");
                return Vec::new();
            }
        };

        let tasks = raw_definitions.into_iter().enumerate().map(|(index, raw)| {
            let interpreter = interpreter.clone();
            let ctx = self.ctx.clone();
            async move {
                let result = tokio::task::spawn_blocking(move || interpreter.interpret(&raw, &ctx))
                    .await
                    .unwrap_or_else(|e| {
                        Err(RegistryError::DefinitionParse {
                            id: None,
                            reason: format!("interpreter task failed: {}", e),
                        })
                    });
                let name = match &result {
                    Ok(adapter) => adapter.id().to_string(),
                    Err(e) => e
                        .source_id()
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("definition #{}", index + 1)),
                };
                (name, result)
            }
        });
        futures::future::join_all(tasks).await
    }

    /// Approximate number of sources: definition count plus native entries.
    ///
    /// Not a count of successfully initialized sources.
    pub async fn source_count(&self) -> usize {
        let definitions = match &self.definitions {
            Some((repository, _)) => repository.source_count().await,
            None => 0,
        };
        definitions + self.native.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::TomlDefinitionInterpreter;
    use crate::testing::{fixtures, MockSource, MockTransport};
    use std::sync::Mutex;

    fn ctx() -> AdapterContext {
        fixtures::adapter_context(Arc::new(MockTransport::new()))
    }

    fn native(ids: &[&str]) -> NativeRegistry {
        let mut registry = NativeRegistry::new();
        for id in ids {
            let id = id.to_string();
            registry.register(id.clone(), move |_| {
                let source: Arc<dyn SourceAdapter> = Arc::new(MockSource::new(&id));
                Ok(source)
            });
        }
        registry
    }

    #[tokio::test]
    async fn test_failures_are_dropped_and_reported() {
        let mut natives = native(&["good"]);
        natives.register("bad", |_| {
            Err(RegistryError::Construction {
                id: "bad".into(),
                reason: "boom".into(),
            })
        });
        let repo = InMemoryDefinitionRepository::new(vec![
            fixtures::definition_toml("def-one"),
            "this is not toml [".to_string(),
        ]);
        let registry = SourceRegistry::new(ctx(), natives)
            .with_definitions(Arc::new(repo), Arc::new(TomlDefinitionInterpreter));

        let attempts = Mutex::new(Vec::new());
        let sources = registry
            .read_all(|attempt| attempts.lock().unwrap().push(attempt))
            .await;

        let ids: Vec<_> = sources.iter().map(|s| s.id().to_string()).collect();
        assert_eq!(ids, vec!["good", "def-one"]);

        let attempts = attempts.into_inner().unwrap();
        assert_eq!(attempts.len(), 4);
        assert_eq!(attempts.iter().filter(|a| a.succeeded()).count(), 2);
        assert!(attempts.iter().any(|a| a.name == "bad" && !a.succeeded()));
        assert!(attempts
            .iter()
            .any(|a| a.name == "definition #2" && !a.succeeded()));
    }

    #[tokio::test]
    async fn test_duplicate_ids_keep_first() {
        let registry = SourceRegistry::new(ctx(), native(&["same", "same"]));
        let attempts = Mutex::new(Vec::new());
        let sources = registry
            .read_all(|attempt| attempts.lock().unwrap().push(attempt))
            .await;

        assert_eq!(sources.len(), 1);
        let attempts = attempts.into_inner().unwrap();
        assert_eq!(attempts.len(), 2);
        assert!(!attempts[1].succeeded());
    }

    #[tokio::test]
    async fn test_source_count_sums_families() {
        let repo = InMemoryDefinitionRepository::new(vec![
            fixtures::definition_toml("a"),
            fixtures::definition_toml("b"),
        ]);
        let registry = SourceRegistry::new(ctx(), native(&["n1", "n2", "n3", "n4", "n5"]))
            .with_definitions(Arc::new(repo), Arc::new(TomlDefinitionInterpreter));
        assert_eq!(registry.source_count().await, 7);
    }
}
