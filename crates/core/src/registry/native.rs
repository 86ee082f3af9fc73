use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::source::SourceAdapter;

use super::{AdapterContext, RegistryError};

/// Constructor of one natively implemented source.
pub type AdapterConstructor =
    Box<dyn Fn(&AdapterContext) -> Result<Arc<dyn SourceAdapter>, RegistryError> + Send + Sync>;

/// Explicit list of native adapters, resolved at startup.
#[derive(Default)]
pub struct NativeRegistry {
    entries: Vec<(String, AdapterConstructor)>,
}

impl NativeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, id: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(&AdapterContext) -> Result<Arc<dyn SourceAdapter>, RegistryError>
            + Send
            + Sync
            + 'static,
    {
        self.entries.push((id.into(), Box::new(constructor)));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    /// Run every constructor, in registration order.
    ///
    /// A panicking constructor yields a construction error for its own entry.
    pub fn build(
        &self,
        ctx: &AdapterContext,
    ) -> Vec<(String, Result<Arc<dyn SourceAdapter>, RegistryError>)> {
        self.entries
            .iter()
            .map(|(id, constructor)| {
                let result = panic::catch_unwind(AssertUnwindSafe(|| constructor(ctx)))
                    .unwrap_or_else(|payload| {
                        Err(RegistryError::Construction {
                            id: id.clone(),
                            reason: format!("constructor panicked: {}", panic_message(&*payload)),
                        })
                    });
                (id.clone(), result)
            })
            .collect()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

impl std::fmt::Debug for NativeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeRegistry")
            .field("ids", &self.ids().collect::<Vec<_>>())
            .finish()
    }
}
