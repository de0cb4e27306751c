//! In-memory search backend for testing.
//!
//! Stores documents per index, records every call in order, serves scripted
//! search hits and can be told to fail specific operations.

use crate::backend::{BulkSummary, SearchBackend, SearchHit, SearchRequest, TypeMapping};
use crate::error::{BackendError, BackendResult};
use async_trait::async_trait;
use indexsync_model::SearchDocument;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A call received by [`MockBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Upsert {
        index: String,
        doc_type: String,
        id: String,
        body: Value,
    },
    Delete {
        index: String,
        doc_type: String,
        id: String,
        existed: bool,
    },
    Search {
        index: String,
        request: SearchRequest,
    },
    CreateIndex(String),
    DropIndex(String),
    PutMapping {
        index: String,
        mapping: TypeMapping,
    },
    Bulk {
        index: String,
        ids: Vec<String>,
    },
}

type DocKey = (String, String);

#[derive(Debug, Default)]
struct MockState {
    indexes: HashMap<String, BTreeMap<DocKey, Value>>,
    mappings: HashMap<String, HashMap<String, TypeMapping>>,
    calls: Vec<BackendCall>,
    hits: Vec<SearchHit>,
    failing_ids: HashSet<String>,
    conflicting_types: HashSet<String>,
    unavailable: bool,
}

/// Recording [`SearchBackend`] kept entirely in memory.
#[derive(Debug, Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hits returned by every subsequent search.
    pub fn set_hits(&self, hits: Vec<SearchHit>) {
        self.state().hits = hits;
    }

    /// Makes writes and deletes of document `id` fail as unavailable.
    pub fn fail_id(&self, id: impl Into<String>) {
        self.state().failing_ids.insert(id.into());
    }

    /// Makes mapping publication for `doc_type` fail with a schema conflict.
    pub fn conflict_on(&self, doc_type: impl Into<String>) {
        self.state().conflicting_types.insert(doc_type.into());
    }

    /// Makes every call fail as unavailable (or recover).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    /// All calls received so far, in order.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.state().calls.clone()
    }

    /// Forgets recorded calls, keeping stored data.
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Body of a stored document.
    pub fn document(&self, index: &str, doc_type: &str, id: &str) -> Option<Value> {
        self.state()
            .indexes
            .get(index)
            .and_then(|docs| docs.get(&(doc_type.to_string(), id.to_string())))
            .cloned()
    }

    /// Number of documents stored in `index`.
    pub fn document_count(&self, index: &str) -> usize {
        self.state().indexes.get(index).map_or(0, BTreeMap::len)
    }

    pub fn index_exists(&self, index: &str) -> bool {
        self.state().indexes.contains_key(index)
    }

    /// Published mapping of `doc_type` in `index`.
    pub fn mapping(&self, index: &str, doc_type: &str) -> Option<TypeMapping> {
        self.state()
            .mappings
            .get(index)
            .and_then(|m| m.get(doc_type))
            .cloned()
    }

    fn check_available(state: &MockState) -> BackendResult<()> {
        if state.unavailable {
            return Err(BackendError::Unavailable("mock backend offline".into()));
        }
        Ok(())
    }

    fn check_id(state: &MockState, id: &str) -> BackendResult<()> {
        Self::check_available(state)?;
        if state.failing_ids.contains(id) {
            return Err(BackendError::Unavailable(format!("write of {id} refused")));
        }
        Ok(())
    }
}

#[async_trait]
impl SearchBackend for MockBackend {
    async fn upsert(
        &self,
        index: &str,
        doc_type: &str,
        id: &str,
        body: &Value,
    ) -> BackendResult<()> {
        let mut state = self.state();
        state.calls.push(BackendCall::Upsert {
            index: index.into(),
            doc_type: doc_type.into(),
            id: id.into(),
            body: body.clone(),
        });
        Self::check_id(&state, id)?;
        state
            .indexes
            .entry(index.into())
            .or_default()
            .insert((doc_type.into(), id.into()), body.clone());
        Ok(())
    }

    async fn delete(&self, index: &str, doc_type: &str, id: &str) -> BackendResult<bool> {
        let mut state = self.state();
        if let Err(e) = Self::check_id(&state, id) {
            state.calls.push(BackendCall::Delete {
                index: index.into(),
                doc_type: doc_type.into(),
                id: id.into(),
                existed: false,
            });
            return Err(e);
        }
        let existed = state
            .indexes
            .get_mut(index)
            .and_then(|docs| docs.remove(&(doc_type.to_string(), id.to_string())))
            .is_some();
        state.calls.push(BackendCall::Delete {
            index: index.into(),
            doc_type: doc_type.into(),
            id: id.into(),
            existed,
        });
        Ok(existed)
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> BackendResult<Vec<SearchHit>> {
        let mut state = self.state();
        state.calls.push(BackendCall::Search {
            index: index.into(),
            request: request.clone(),
        });
        Self::check_available(&state)?;
        Ok(state.hits.clone())
    }

    async fn create_index(&self, index: &str) -> BackendResult<()> {
        let mut state = self.state();
        state.calls.push(BackendCall::CreateIndex(index.into()));
        Self::check_available(&state)?;
        state.indexes.entry(index.into()).or_default();
        Ok(())
    }

    async fn drop_index(&self, index: &str) -> BackendResult<()> {
        let mut state = self.state();
        state.calls.push(BackendCall::DropIndex(index.into()));
        Self::check_available(&state)?;
        state.indexes.remove(index);
        state.mappings.remove(index);
        Ok(())
    }

    async fn put_mapping(&self, index: &str, mapping: &TypeMapping) -> BackendResult<()> {
        let mut state = self.state();
        state.calls.push(BackendCall::PutMapping {
            index: index.into(),
            mapping: mapping.clone(),
        });
        Self::check_available(&state)?;
        if state.conflicting_types.contains(&mapping.doc_type) {
            return Err(BackendError::SchemaConflict {
                doc_type: mapping.doc_type.clone(),
                reason: "mapper conflict".into(),
            });
        }
        state
            .mappings
            .entry(index.into())
            .or_default()
            .insert(mapping.doc_type.clone(), mapping.clone());
        Ok(())
    }

    async fn bulk_index(
        &self,
        index: &str,
        documents: &[SearchDocument],
    ) -> BackendResult<BulkSummary> {
        let mut state = self.state();
        state.calls.push(BackendCall::Bulk {
            index: index.into(),
            ids: documents.iter().map(|d| d.id.to_string()).collect(),
        });
        Self::check_available(&state)?;

        let mut summary = BulkSummary::default();
        for doc in documents {
            let id = doc.id.to_string();
            if state.failing_ids.contains(&id) {
                summary.failed.push(crate::BulkFailure {
                    doc_type: doc.doc_type.clone(),
                    id,
                    reason: "refused".into(),
                });
                continue;
            }
            state
                .indexes
                .entry(index.into())
                .or_default()
                .insert((doc.doc_type.clone(), id), doc.body());
            summary.indexed += 1;
        }
        Ok(summary)
    }
}
