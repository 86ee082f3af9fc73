//! Where data-described sources come from and how they are interpreted.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::source::SourceAdapter;

use super::{AdapterContext, RegistryError};

/// Supplies raw definition documents.
#[async_trait]
pub trait DefinitionRepository: Send + Sync {
    async fn read_definitions(&self) -> Result<Vec<String>, RegistryError>;

    /// Number of definitions available, without parsing them.
    async fn source_count(&self) -> usize;
}

/// Turns one raw definition into an adapter.
///
/// Called from blocking worker threads, so implementations must not await.
pub trait DefinitionInterpreter: Send + Sync {
    fn interpret(
        &self,
        raw: &str,
        ctx: &AdapterContext,
    ) -> Result<Arc<dyn SourceAdapter>, RegistryError>;
}

/// Reads every `*.toml` file of a directory, sorted by file name.
#[derive(Debug, Clone)]
pub struct DirectoryDefinitionRepository {
    dir: PathBuf,
}

impl DirectoryDefinitionRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn definition_files(&self) -> Result<Vec<PathBuf>, RegistryError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(|e| {
            RegistryError::Repository(format!("cannot read {}: {}", self.dir.display(), e))
        })?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RegistryError::Repository(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "toml") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl DefinitionRepository for DirectoryDefinitionRepository {
    async fn read_definitions(&self) -> Result<Vec<String>, RegistryError> {
        let mut definitions = Vec::new();
        for path in self.definition_files().await? {
            match tokio::fs::read_to_string(&path).await {
                Ok(raw) => definitions.push(raw),
                Err(e) => error!(path = %path.display(), error = %e, "Failed to read definition"),
            }
        }
        debug!(dir = %self.dir.display(), count = definitions.len(), "Loaded definitions");
        Ok(definitions)
    }

    async fn source_count(&self) -> usize {
        self.definition_files().await.map(|f| f.len()).unwrap_or(0)
    }
}

/// Definitions held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDefinitionRepository {
    definitions: Vec<String>,
}

impl InMemoryDefinitionRepository {
    pub fn new(definitions: Vec<String>) -> Self {
        Self { definitions }
    }
}

#[async_trait]
impl DefinitionRepository for InMemoryDefinitionRepository {
    async fn read_definitions(&self) -> Result<Vec<String>, RegistryError> {
        Ok(self.definitions.clone())
    }

    async fn source_count(&self) -> usize {
        self.definitions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_directory_repository_reads_toml_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.toml"), "id = \"b\"").unwrap();
        std::fs::write(dir.path().join("a.toml"), "id = \"a\"").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let repo = DirectoryDefinitionRepository::new(dir.path());
        assert_eq!(repo.source_count().await, 2);
        let definitions = repo.read_definitions().await.unwrap();
        assert_eq!(definitions, vec!["id = \"a\"".to_string(), "id = \"b\"".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let repo = DirectoryDefinitionRepository::new("/nonexistent/definitions");
        assert_eq!(repo.source_count().await, 0);
        assert!(matches!(
            repo.read_definitions().await,
            Err(RegistryError::Repository(_))
        ));
    }
}
