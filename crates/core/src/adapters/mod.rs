//! Concrete source adapters.

pub mod definition;
mod jackett;

use std::sync::Arc;

pub use definition::{Definition, DefinitionAdapter, TomlDefinitionInterpreter};
pub use jackett::JackettAdapter;

use crate::config::NativeSourceConfig;
use crate::registry::NativeRegistry;
use crate::source::SourceAdapter;

/// Register one native constructor per configured `[[sources]]` entry.
pub fn native_registry(sources: &[NativeSourceConfig]) -> NativeRegistry {
    let mut registry = NativeRegistry::new();
    for source in sources {
        match source {
            NativeSourceConfig::Jackett(config) => {
                let config = config.clone();
                registry.register(config.id.clone(), move |ctx| {
                    let adapter: Arc<dyn SourceAdapter> =
                        Arc::new(JackettAdapter::new(config.clone(), ctx)?);
                    Ok(adapter)
                });
            }
        }
    }
    registry
}
