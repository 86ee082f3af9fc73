pub mod adapters;
pub mod category;
pub mod config;
pub mod http;
pub mod metrics;
pub mod orchestrator;
pub mod registry;
pub mod source;
pub mod testing;

pub use adapters::{native_registry, DefinitionAdapter, TomlDefinitionInterpreter};
pub use category::{Category, CategoryMapper};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use http::{
    FetchError, FetchRequest, FetchResponse, HttpTransport, ReqwestTransport, SessionClient,
};
pub use orchestrator::{
    FailureKind, OrchestratorError, OrchestratorEvent, QueryOrchestrator, QueryOutcome,
    QuerySummary,
};
pub use registry::{
    AdapterContext, DirectoryDefinitionRepository, InitAttempt, NativeRegistry, RegistryError,
    SourceRegistry,
};
pub use source::{
    CapabilitySet, Query, QueryType, ResultItem, Source, SourceAdapter, SourceError, SourceKind,
    SourceSummary,
};
