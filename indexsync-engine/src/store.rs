//! Object store abstraction.
//!
//! The engine reads objects back from the store in two ways: by id, when
//! rehydrating search hits, and page by page, when rebuilding the index.

use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use indexsync_model::{DomainObject, ObjectId, TypeRegistry};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// The transactional object store, as seen by the engine.
///
/// `type_name` always selects the type *and its subtypes*.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Loads the objects with the given ids, in the order of `ids`.
    /// Ids with no matching object are skipped.
    async fn fetch_by_ids(
        &self,
        type_name: &str,
        ids: &[ObjectId],
    ) -> EngineResult<Vec<Arc<dyn DomainObject>>>;

    /// Loads up to `limit` objects with ids greater than `after`, ascending
    /// by id. Repeating with the last returned id walks the whole type.
    async fn load_batch(
        &self,
        type_name: &str,
        after: Option<ObjectId>,
        limit: usize,
    ) -> EngineResult<Vec<Arc<dyn DomainObject>>>;
}

#[derive(Default)]
struct MemoryState {
    objects: BTreeMap<ObjectId, Arc<dyn DomainObject>>,
    fetches: Vec<(String, Vec<ObjectId>)>,
}

/// An [`ObjectStore`] held in memory, keyed by object id.
pub struct MemoryStore {
    registry: Arc<TypeRegistry>,
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            state: Mutex::new(MemoryState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores an object. It must already carry an id.
    pub fn insert(&self, object: Arc<dyn DomainObject>) -> EngineResult<()> {
        let id = object.id().ok_or_else(|| {
            EngineError::Store(format!("{} object has no id", object.type_name()))
        })?;
        self.state().objects.insert(id, object);
        Ok(())
    }

    /// Removes an object, returning it if it was stored.
    pub fn remove(&self, id: ObjectId) -> Option<Arc<dyn DomainObject>> {
        self.state().objects.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.state().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().objects.is_empty()
    }

    /// Every `fetch_by_ids` call received so far.
    pub fn fetches(&self) -> Vec<(String, Vec<ObjectId>)> {
        self.state().fetches.clone()
    }

    fn is_a(&self, object: &dyn DomainObject, type_name: &str) -> bool {
        let Some(key) = self.registry.lookup(object.type_name()) else {
            return false;
        };
        self.registry
            .ancestors(key)
            .any(|k| self.registry.name(k) == type_name)
    }

    fn check_type(&self, type_name: &str) -> EngineResult<()> {
        self.registry.resolve(type_name)?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn fetch_by_ids(
        &self,
        type_name: &str,
        ids: &[ObjectId],
    ) -> EngineResult<Vec<Arc<dyn DomainObject>>> {
        self.check_type(type_name)?;
        let mut state = self.state();
        state.fetches.push((type_name.to_string(), ids.to_vec()));
        Ok(ids
            .iter()
            .filter_map(|id| state.objects.get(id))
            .filter(|obj| self.is_a(obj.as_ref(), type_name))
            .cloned()
            .collect())
    }

    async fn load_batch(
        &self,
        type_name: &str,
        after: Option<ObjectId>,
        limit: usize,
    ) -> EngineResult<Vec<Arc<dyn DomainObject>>> {
        self.check_type(type_name)?;
        let lower = after.map_or(Bound::Unbounded, Bound::Excluded);
        let state = self.state();
        Ok(state
            .objects
            .range((lower, Bound::Unbounded))
            .map(|(_, obj)| obj)
            .filter(|obj| self.is_a(obj.as_ref(), type_name))
            .take(limit)
            .cloned()
            .collect())
    }
}
