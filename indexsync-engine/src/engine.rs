//! The engine facade.
//!
//! [`IndexSync`] owns the type registry, the document compiler and the
//! handles to the backend and the store. Everything else in the crate
//! borrows it.

use crate::capture::ChangeCapture;
use crate::error::EngineResult;
use crate::mapping::MappingPublisher;
use crate::query::{ObjectStream, QueryOptions, QueryRouter};
use crate::store::ObjectStore;
use indexsync_backend::{BulkSummary, SearchBackend, SearchQuery};
use indexsync_model::{DocumentCompiler, DomainObject, ModelError, ObjectId, TypeRegistry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Index used when none is configured.
pub const DEFAULT_INDEX: &str = "score";

/// Objects loaded per round trip while rebuilding the index.
pub const DEFAULT_REFRESH_BATCH_SIZE: usize = 100;

/// Configuration for the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Name of the index holding every document type.
    pub index: String,
    /// Page size used by [`IndexSync::refresh`].
    pub refresh_batch_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            index: DEFAULT_INDEX.to_string(),
            refresh_batch_size: DEFAULT_REFRESH_BATCH_SIZE,
        }
    }
}

/// Keeps one search index in step with an object store.
pub struct IndexSync {
    config: EngineConfig,
    registry: Arc<TypeRegistry>,
    compiler: DocumentCompiler,
    backend: Arc<dyn SearchBackend>,
    store: Arc<dyn ObjectStore>,
    router: QueryRouter,
    publisher: MappingPublisher,
}

impl IndexSync {
    pub fn new(
        config: EngineConfig,
        registry: Arc<TypeRegistry>,
        backend: Arc<dyn SearchBackend>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        let router = QueryRouter::new(registry.clone(), backend.clone(), config.index.clone());
        let publisher =
            MappingPublisher::new(registry.clone(), backend.clone(), config.index.clone());
        Self {
            compiler: DocumentCompiler::new(registry.clone()),
            config,
            registry,
            backend,
            store,
            router,
            publisher,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the index name.
    pub fn index(&self) -> &str {
        &self.config.index
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn compiler(&self) -> &DocumentCompiler {
        &self.compiler
    }

    pub fn backend(&self) -> &Arc<dyn SearchBackend> {
        &self.backend
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Opens a change capture for a new transaction.
    pub fn begin_change_capture(&self) -> ChangeCapture {
        ChangeCapture::new()
    }

    // ── Document writes ──────────────────────────────────────────

    /// Converts `object` and writes it to the index, replacing any previous
    /// version.
    pub async fn insert(&self, object: &dyn DomainObject) -> EngineResult<()> {
        let doc = self.compiler.convert(object)?;
        debug!("Indexing {}#{} as {}", doc.concrete_class, doc.id, doc.doc_type);
        self.backend
            .upsert(self.index(), &doc.doc_type, &doc.id.to_string(), &doc.body())
            .await?;
        Ok(())
    }

    /// Removes the document of `object` from the index.
    ///
    /// Returns `false` if there was nothing to remove.
    pub async fn delete(&self, object: &dyn DomainObject) -> EngineResult<bool> {
        let type_name = object.type_name();
        let root = self
            .registry
            .indexed_root_of_name(type_name)?
            .ok_or_else(|| ModelError::NotIndexable(type_name.to_string()))?;
        let id = object
            .id()
            .ok_or_else(|| ModelError::MissingId(type_name.to_string()))?;

        let doc_type = self.registry.name(root);
        let existed = self
            .backend
            .delete(self.index(), doc_type, &id.to_string())
            .await?;
        if !existed {
            debug!("No indexed document for {}#{}", type_name, id);
        }
        Ok(existed)
    }

    // ── Queries ──────────────────────────────────────────────────

    /// Searches the given types and yields matching objects from the
    /// engine's store, in hit order.
    pub async fn query(
        &self,
        types: &[&str],
        query: impl Into<SearchQuery>,
        options: QueryOptions,
    ) -> EngineResult<ObjectStream> {
        self.query_in(self.store.clone(), types, query, options).await
    }

    /// Like [`IndexSync::query`], rehydrating from `store` instead.
    pub async fn query_in(
        &self,
        store: Arc<dyn ObjectStore>,
        types: &[&str],
        query: impl Into<SearchQuery>,
        options: QueryOptions,
    ) -> EngineResult<ObjectStream> {
        self.router.route(store, types, query.into(), options).await
    }

    // ── Index lifecycle ──────────────────────────────────────────

    /// Drops the index.
    pub async fn destroy_index(&self) -> EngineResult<()> {
        self.publisher.destroy().await
    }

    /// Creates the index and publishes every mapping. Returns the published
    /// document types.
    pub async fn create_index(&self, destroy_first: bool) -> EngineResult<Vec<String>> {
        self.publisher.publish_schema(destroy_first).await
    }

    /// Re-indexes every stored object of every indexable type.
    ///
    /// Objects are loaded in pages of `refresh_batch_size` and written with
    /// one bulk request per page. Documents the backend rejects are reported
    /// in the summary; store and transport errors abort the refresh.
    pub async fn refresh(&self) -> EngineResult<BulkSummary> {
        let batch_size = self.config.refresh_batch_size.max(1);
        let mut total = BulkSummary::default();

        for &root in self.registry.indexable_root_types() {
            let type_name = self.registry.name(root);
            let started = Instant::now();
            let mut summary = BulkSummary::default();
            let mut after: Option<ObjectId> = None;

            loop {
                let objects = self.store.load_batch(type_name, after, batch_size).await?;
                if objects.is_empty() {
                    break;
                }
                let docs = objects
                    .iter()
                    .map(|o| self.compiler.convert(o.as_ref()))
                    .collect::<Result<Vec<_>, _>>()?;
                summary.merge(self.backend.bulk_index(self.index(), &docs).await?);

                after = docs.last().map(|d| d.id);
                if objects.len() < batch_size {
                    break;
                }
            }

            if !summary.failed.is_empty() {
                warn!("{} {} documents rejected during refresh", summary.failed.len(), type_name);
            }
            info!(
                "Refreshed {} {} documents in {:.2?}",
                summary.indexed,
                type_name,
                started.elapsed()
            );
            total.merge(summary);
        }

        Ok(total)
    }
}
