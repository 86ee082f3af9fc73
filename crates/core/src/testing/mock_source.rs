//! Mock source adapter for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

use crate::category::CategoryMapper;
use crate::source::{
    CapabilitySet, Query, ResultItem, Source, SourceAdapter, SourceError, SourceKind,
};

#[derive(Default)]
struct Behavior {
    items: Vec<ResultItem>,
    error: Option<SourceError>,
    delay: Option<Duration>,
    panic: bool,
}

/// Mock implementation of the SourceAdapter trait.
///
/// Provides controllable behavior for testing:
/// - Return configurable items or a configured error
/// - Delay the answer to keep a call in flight
/// - Panic inside the query call
/// - Record every query for assertions
pub struct MockSource {
    source: Source,
    behavior: Mutex<Behavior>,
    queries: Mutex<Vec<Query>>,
    downloads: Mutex<Vec<String>>,
    started: Notify,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl std::fmt::Debug for MockSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSource")
            .field("id", &self.source.id)
            .field("kind", &self.source.kind)
            .finish_non_exhaustive()
    }
}

impl MockSource {
    /// A public source handling every query type and every category.
    pub fn new(id: &str) -> Self {
        Self {
            source: Source {
                id: id.to_string(),
                name: id.to_string(),
                description: format!("mock source {}", id),
                kind: SourceKind::Public,
                site_link: format!("https://{}.example/", id),
                caps: CapabilitySet::all(),
                categories: CategoryMapper::identity(),
            },
            behavior: Mutex::new(Behavior::default()),
            queries: Mutex::new(Vec::new()),
            downloads: Mutex::new(Vec::new()),
            started: Notify::new(),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub fn with_kind(mut self, kind: SourceKind) -> Self {
        self.source.kind = kind;
        self
    }

    pub fn with_caps(mut self, caps: CapabilitySet) -> Self {
        self.source.caps = caps;
        self
    }

    pub fn with_categories(mut self, categories: CategoryMapper) -> Self {
        self.source.categories = categories;
        self
    }

    pub fn with_items(self, items: Vec<ResultItem>) -> Self {
        self.set_items(items);
        self
    }

    pub fn with_error(self, error: SourceError) -> Self {
        self.set_error(Some(error));
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        self.behavior.lock().unwrap().delay = Some(delay);
        self
    }

    pub fn with_panic(self) -> Self {
        self.behavior.lock().unwrap().panic = true;
        self
    }

    pub fn set_items(&self, items: Vec<ResultItem>) {
        self.behavior.lock().unwrap().items = items;
    }

    pub fn set_error(&self, error: Option<SourceError>) {
        self.behavior.lock().unwrap().error = error;
    }

    /// Queries received so far.
    pub fn queries(&self) -> Vec<Query> {
        self.queries.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }

    /// Highest number of query calls observed running at the same time.
    pub fn max_concurrent_calls(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Resolves once a query call has started.
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }
}

/// Counts a running query call; also released when the call is dropped.
struct ActiveCall<'a>(&'a AtomicUsize);

impl<'a> ActiveCall<'a> {
    fn enter(active: &'a AtomicUsize, max_active: &AtomicUsize) -> Self {
        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
        max_active.fetch_max(now, Ordering::SeqCst);
        Self(active)
    }
}

impl Drop for ActiveCall<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SourceAdapter for MockSource {
    fn info(&self) -> &Source {
        &self.source
    }

    async fn results_for_query(&self, query: &Query) -> Result<Vec<ResultItem>, SourceError> {
        self.queries.lock().unwrap().push(query.clone());
        self.started.notify_one();
        let _active = ActiveCall::enter(&self.active, &self.max_active);

        let (items, error, delay, panic) = {
            let behavior = self.behavior.lock().unwrap();
            (
                behavior.items.clone(),
                behavior.error.clone(),
                behavior.delay,
                behavior.panic,
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if panic {
            panic!("mock source {} panicked", self.source.id);
        }
        match error {
            Some(error) => Err(error),
            None => Ok(items),
        }
    }

    async fn download(&self, link: &str) -> Result<Vec<u8>, SourceError> {
        self.downloads.lock().unwrap().push(link.to_string());
        Ok(link.as_bytes().to_vec())
    }
}
