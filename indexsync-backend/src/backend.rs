//! The search backend abstraction.

use crate::error::BackendResult;
use async_trait::async_trait;
use indexsync_model::SearchDocument;
use serde_json::{json, Map, Value};

/// A query as handed to the backend. Both forms pass through verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchQuery {
    /// Textual (Lucene syntax) query string.
    Text(String),
    /// Structured query DSL expression.
    Structured(Value),
}

impl From<&str> for SearchQuery {
    fn from(query: &str) -> Self {
        Self::Text(query.to_string())
    }
}

impl From<String> for SearchQuery {
    fn from(query: String) -> Self {
        Self::Text(query)
    }
}

impl From<Value> for SearchQuery {
    fn from(query: Value) -> Self {
        Self::Structured(query)
    }
}

/// One search call. Only ids and type tags come back; document sources are
/// never requested.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub doc_types: Vec<String>,
    pub query: SearchQuery,
    pub analyze_wildcard: bool,
    pub offset: usize,
    pub limit: usize,
}

/// A search result entry, in backend order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub doc_type: String,
    pub id: String,
}

impl SearchHit {
    pub fn new(doc_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            doc_type: doc_type.into(),
            id: id.into(),
        }
    }
}

/// Schema of one document type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeMapping {
    pub doc_type: String,
    /// Field name to mapping attributes, in declaration order.
    pub properties: Map<String, Value>,
    /// Whether the backend keeps the raw document source.
    pub source_enabled: bool,
}

impl TypeMapping {
    /// The mapping body as the backend expects it.
    pub fn to_json(&self) -> Value {
        let mut mapping = Map::new();
        mapping.insert(
            self.doc_type.clone(),
            json!({
                "properties": self.properties,
                "_source": { "enabled": self.source_enabled },
            }),
        );
        Value::Object(mapping)
    }
}

/// A document the backend rejected during a bulk write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFailure {
    pub doc_type: String,
    pub id: String,
    pub reason: String,
}

/// Outcome of a bulk write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkSummary {
    pub indexed: usize,
    pub failed: Vec<BulkFailure>,
}

impl BulkSummary {
    /// Folds another summary into this one.
    pub fn merge(&mut self, other: BulkSummary) {
        self.indexed += other.indexed;
        self.failed.extend(other.failed);
    }
}

/// A search backend holding one or more indexes of typed documents.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Creates or replaces a document.
    async fn upsert(&self, index: &str, doc_type: &str, id: &str, body: &Value)
    -> BackendResult<()>;

    /// Deletes a document. Returns `false` if it did not exist.
    async fn delete(&self, index: &str, doc_type: &str, id: &str) -> BackendResult<bool>;

    /// Runs a search and returns hits in backend order.
    async fn search(&self, index: &str, request: &SearchRequest) -> BackendResult<Vec<SearchHit>>;

    /// Creates the index. An existing index is not an error.
    async fn create_index(&self, index: &str) -> BackendResult<()>;

    /// Drops the index. A missing index is not an error.
    async fn drop_index(&self, index: &str) -> BackendResult<()>;

    /// Publishes the schema of one document type.
    async fn put_mapping(&self, index: &str, mapping: &TypeMapping) -> BackendResult<()>;

    /// Writes many documents in one round trip.
    async fn bulk_index(&self, index: &str, documents: &[SearchDocument])
    -> BackendResult<BulkSummary>;
}
