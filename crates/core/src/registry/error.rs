use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("failed to parse definition {}: {reason}", .id.as_deref().unwrap_or("<unknown>"))]
    DefinitionParse { id: Option<String>, reason: String },

    #[error("failed to construct source {id}: {reason}")]
    Construction { id: String, reason: String },

    #[error("duplicate source id: {0}")]
    DuplicateId(String),

    #[error("definition repository error: {0}")]
    Repository(String),
}

impl RegistryError {
    /// Which source the error is about, if known.
    pub fn source_id(&self) -> Option<&str> {
        match self {
            RegistryError::DefinitionParse { id, .. } => id.as_deref(),
            RegistryError::Construction { id, .. } | RegistryError::DuplicateId(id) => Some(id),
            RegistryError::Repository(_) => None,
        }
    }
}
