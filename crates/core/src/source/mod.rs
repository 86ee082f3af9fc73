//! Source adapter contract.
//!
//! A source is one remote index. Its adapter turns a [`Query`] into
//! [`ResultItem`]s using its own [`SessionClient`](crate::http::SessionClient).

mod adapter;
mod cache;
mod error;
mod query;
mod settings;
mod types;

pub use adapter::SourceAdapter;
pub use cache::{CacheKey, ResultCache};
pub use error::SourceError;
pub use query::{Query, QueryType};
pub use settings::{InMemorySettingsStore, PersistingObserver, SettingsStore, StoredSettings};
pub use types::{CapabilitySet, ResultItem, Source, SourceKind, SourceSummary};

pub use crate::http::{SessionObserver, SessionState};
