//! Contract of the full-text search engine holding the flat records.

use crate::rga::model::record::RgaRecord;

pub mod filter;
pub mod memory;

pub use memory::MemoryEngine;

/// Cursor over the records matching a query, in engine order.
pub type RecordIter = Box<dyn Iterator<Item = RgaRecord> + Send>;

/// A filter query against one collection.
#[derive(Debug, Default, Clone, PartialEq, Eq, derive_new::new)]
pub struct EngineQuery {
    /// Native filters, all of which must match.
    pub filters: Vec<String>,
    /// Fields to return; all fields if empty.
    pub fields: Vec<String>,
    /// Maximal number of records to return.
    pub limit: Option<usize>,
}

/// Facet to compute over the matching records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FacetRequest {
    /// Buckets of the distinct values of `field`, ordered by value.
    Terms {
        field: String,
        skip: usize,
        limit: Option<usize>,
    },
    /// Number of distinct values of the field.
    Unique(String),
}

/// One facet bucket.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, derive_new::new)]
pub struct FacetBucket {
    pub value: String,
    /// Number of matching records carrying the value.
    pub count: usize,
}

/// Result of a facet request.
#[derive(Debug, Default, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FacetResult {
    pub buckets: Vec<FacetBucket>,
    /// Set for aggregations such as [`FacetRequest::Unique`].
    pub aggregation: Option<usize>,
}

impl FacetResult {
    /// The bucket values.
    pub fn values(&self) -> Vec<String> {
        self.buckets.iter().map(|bucket| bucket.value.clone()).collect()
    }
}

/// Operations consumed from the search engine.
pub trait SearchEngine: Send + Sync {
    /// Whether the engine can serve `collection`'s requests.
    fn is_alive(&self, collection: &str) -> bool;

    fn exists(&self, collection: &str) -> Result<bool, anyhow::Error>;

    fn create(&self, collection: &str) -> Result<(), anyhow::Error>;

    /// Insert `records`, replacing records with the same id.
    fn insert(&self, collection: &str, records: Vec<RgaRecord>) -> Result<(), anyhow::Error>;

    fn query(&self, collection: &str, query: &EngineQuery) -> Result<RecordIter, anyhow::Error>;

    fn facet(
        &self,
        collection: &str,
        filters: &[String],
        request: &FacetRequest,
    ) -> Result<FacetResult, anyhow::Error>;
}
