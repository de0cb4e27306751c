//! Search execution and hit rehydration.
//!
//! Hits come back from the backend in relevance (or sort) order, possibly
//! mixing document types. They are cut into maximal runs of one type, and
//! each run is loaded from the store in a single batch when the consumer
//! reaches it. Grouping all ids by type up front would lose the ordering.

use crate::error::{EngineError, EngineResult};
use crate::store::ObjectStore;
use futures::stream::{self, BoxStream, StreamExt};
use indexsync_backend::{SearchBackend, SearchHit, SearchQuery, SearchRequest};
use indexsync_model::{DomainObject, ModelError, ObjectId, TypeKey, TypeRegistry};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Lazy sequence of rehydrated objects, in hit order.
pub type ObjectStream = BoxStream<'static, EngineResult<Arc<dyn DomainObject>>>;

/// Paging and analysis options of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    pub analyze_wildcard: bool,
    pub offset: usize,
    pub limit: usize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            analyze_wildcard: false,
            offset: 0,
            limit: 10,
        }
    }
}

/// Consecutive hits sharing one document type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitRun {
    pub doc_type: String,
    pub ids: Vec<String>,
}

/// Splits hits into maximal contiguous runs of the same document type.
pub fn partition_runs(hits: &[SearchHit]) -> Vec<HitRun> {
    let mut runs: Vec<HitRun> = Vec::new();
    for hit in hits {
        match runs.last_mut() {
            Some(run) if run.doc_type == hit.doc_type => run.ids.push(hit.id.clone()),
            _ => runs.push(HitRun {
                doc_type: hit.doc_type.clone(),
                ids: vec![hit.id.clone()],
            }),
        }
    }
    runs
}

/// Runs searches against the index and resolves hits into objects.
pub struct QueryRouter {
    registry: Arc<TypeRegistry>,
    backend: Arc<dyn SearchBackend>,
    index: String,
}

impl QueryRouter {
    pub fn new(registry: Arc<TypeRegistry>, backend: Arc<dyn SearchBackend>, index: impl Into<String>) -> Self {
        Self {
            registry,
            backend,
            index: index.into(),
        }
    }

    /// Searches the document types of `types` and returns the matching
    /// objects from `store`.
    ///
    /// The query is passed through verbatim; restricting the search to the
    /// requested document types is the only filtering applied. The search
    /// itself runs before this returns, store lookups happen lazily.
    pub async fn route(
        &self,
        store: Arc<dyn ObjectStore>,
        types: &[&str],
        query: SearchQuery,
        options: QueryOptions,
    ) -> EngineResult<ObjectStream> {
        if types.is_empty() {
            return Ok(stream::empty().boxed());
        }

        // Requested types sharing a document type are fetched as their
        // nearest common ancestor, so no requested subtype is dropped.
        let mut doc_types: Vec<String> = Vec::new();
        let mut type_for_doc: HashMap<String, TypeKey> = HashMap::new();
        for &type_name in types {
            let key = self.registry.resolve(type_name)?;
            let root = self
                .registry
                .indexed_root_of(key)
                .ok_or_else(|| ModelError::NotIndexable(type_name.to_string()))?;
            let doc_type = self.registry.name(root).to_string();
            match type_for_doc.get_mut(&doc_type) {
                Some(fetch_as) => {
                    *fetch_as = self.registry.common_ancestor(*fetch_as, key).unwrap_or(root);
                }
                None => {
                    doc_types.push(doc_type.clone());
                    type_for_doc.insert(doc_type, key);
                }
            }
        }

        let request = SearchRequest {
            doc_types,
            query,
            analyze_wildcard: options.analyze_wildcard,
            offset: options.offset,
            limit: options.limit,
        };
        let hits = self.backend.search(&self.index, &request).await?;
        debug!("Query over {:?} returned {} hits", request.doc_types, hits.len());

        let hits: Vec<SearchHit> = hits
            .into_iter()
            .filter(|hit| {
                let known = type_for_doc.contains_key(&hit.doc_type);
                if !known {
                    warn!("Ignoring hit {} of unrequested type {}", hit.id, hit.doc_type);
                }
                known
            })
            .collect();

        let mut batches: Vec<(String, Vec<ObjectId>)> = Vec::new();
        for run in partition_runs(&hits) {
            let ids = run
                .ids
                .iter()
                .map(|id| {
                    id.parse::<ObjectId>()
                        .map_err(|e| EngineError::InvalidHit(format!("{}/{id}: {e}", run.doc_type)))
                })
                .collect::<EngineResult<Vec<_>>>()?;
            let fetch_as = type_for_doc[&run.doc_type];
            batches.push((self.registry.name(fetch_as).to_string(), ids));
        }

        let objects = stream::iter(batches)
            .then(move |(type_name, ids)| {
                let store = store.clone();
                async move { store.fetch_by_ids(&type_name, &ids).await }
            })
            .flat_map(|batch| match batch {
                Ok(objects) => stream::iter(objects.into_iter().map(Ok)).left_stream(),
                Err(e) => stream::once(async move { Err(e) }).right_stream(),
            });

        Ok(objects.boxed())
    }
}
