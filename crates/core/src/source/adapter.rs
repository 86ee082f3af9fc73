use async_trait::async_trait;

use super::{Query, ResultItem, Source, SourceError, SourceKind};

/// Contract every source implementation fulfils.
///
/// An adapter owns its session state; the orchestrator only ever calls
/// these methods.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn info(&self) -> &Source;

    fn id(&self) -> &str {
        &self.info().id
    }

    fn kind(&self) -> SourceKind {
        self.info().kind
    }

    fn can_handle(&self, query: &Query) -> bool {
        self.info().can_handle(query)
    }

    /// Run `query` against the remote site.
    ///
    /// Returns raw items; category filtering, limits and date
    /// normalization happen in the orchestrator.
    async fn results_for_query(&self, query: &Query) -> Result<Vec<ResultItem>, SourceError>;

    /// Fetch the payload behind a result's link.
    async fn download(&self, link: &str) -> Result<Vec<u8>, SourceError>;
}
