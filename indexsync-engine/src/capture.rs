//! Transaction-scoped change capture.
//!
//! Which objects changed has to be decided before commit, while the store
//! still knows what it is about to flush. The index writes can only happen
//! after commit, once new objects have ids and the data is durable. A
//! [`ChangeCapture`] carries the decision from one phase to the other. It is
//! owned by a single transaction, so concurrent transactions never share
//! change sets.

use crate::engine::IndexSync;
use crate::error::{EngineError, EngineResult};
use indexsync_model::{DomainObject, ObjectId, TypeRegistry};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// An object the store reports as possibly modified.
#[derive(Debug, Clone)]
pub struct ModifiedCandidate {
    pub object: Arc<dyn DomainObject>,
    /// Whether any field value actually changed.
    pub changed: bool,
}

impl ModifiedCandidate {
    pub fn new(object: Arc<dyn DomainObject>, changed: bool) -> Self {
        Self { object, changed }
    }
}

/// What the store is about to flush.
#[derive(Debug, Clone, Default)]
pub struct FlushCandidates {
    pub created: Vec<Arc<dyn DomainObject>>,
    pub modified: Vec<ModifiedCandidate>,
    pub deleted: Vec<Arc<dyn DomainObject>>,
    /// If set, only these objects (by identity) are considered.
    pub restrict: Option<Vec<Arc<dyn DomainObject>>>,
}

impl FlushCandidates {
    fn admits(&self, object: &Arc<dyn DomainObject>) -> bool {
        match &self.restrict {
            Some(allowed) => allowed.iter().any(|a| Arc::ptr_eq(a, object)),
            None => true,
        }
    }
}

/// Lifecycle of a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Collecting,
    Committed,
}

/// Which post-commit write failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOp {
    Index,
    Remove,
}

/// A post-commit write that failed. The transaction stays committed.
#[derive(Debug)]
pub struct DrainFailure {
    pub op: DrainOp,
    pub type_name: String,
    pub id: Option<ObjectId>,
    pub error: EngineError,
}

impl fmt::Display for DrainFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.id.map_or_else(|| "?".to_string(), |id| id.to_string());
        write!(f, "{:?} {}#{}: {}", self.op, self.type_name, id, self.error)
    }
}

/// Outcome of draining a capture after commit.
#[derive(Debug, Default)]
pub struct DrainReport {
    pub indexed: usize,
    pub removed: usize,
    pub failures: Vec<DrainFailure>,
}

impl DrainReport {
    /// True if every write succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Change set of one transaction.
#[derive(Debug)]
pub struct ChangeCapture {
    state: CaptureState,
    to_index: Vec<Arc<dyn DomainObject>>,
    to_remove: Vec<Arc<dyn DomainObject>>,
}

impl Default for ChangeCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeCapture {
    pub fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            to_index: Vec::new(),
            to_remove: Vec::new(),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Objects waiting to be indexed.
    pub fn to_index(&self) -> &[Arc<dyn DomainObject>] {
        &self.to_index
    }

    /// Objects waiting to be removed from the index.
    pub fn to_remove(&self) -> &[Arc<dyn DomainObject>] {
        &self.to_remove
    }

    /// Pre-commit hook: decides which flushed objects touch the index.
    ///
    /// Objects outside `restrict`, modified objects without an actual field
    /// change, and objects of non-indexable types are skipped. An object of
    /// an unregistered type is a configuration error; the capture is then
    /// reset to idle with nothing collected. A second flush within the same
    /// transaction starts collection over.
    pub fn before_commit(
        &mut self,
        sync: &IndexSync,
        candidates: FlushCandidates,
    ) -> EngineResult<()> {
        if self.state == CaptureState::Collecting
            && (!self.to_index.is_empty() || !self.to_remove.is_empty())
        {
            debug!(
                "Restarting collection, discarding {} index and {} remove entries",
                self.to_index.len(),
                self.to_remove.len()
            );
        }
        self.to_index.clear();
        self.to_remove.clear();
        self.state = CaptureState::Collecting;

        if let Err(e) = self.collect(sync.registry(), &candidates) {
            self.rollback();
            return Err(e);
        }

        debug!(
            "Captured {} objects to index, {} to remove",
            self.to_index.len(),
            self.to_remove.len()
        );
        Ok(())
    }

    fn collect(&mut self, registry: &TypeRegistry, candidates: &FlushCandidates) -> EngineResult<()> {
        for object in &candidates.created {
            if candidates.admits(object) && is_indexable(registry, object.as_ref())? {
                push_unique(&mut self.to_index, object);
            }
        }
        for candidate in &candidates.modified {
            if !candidate.changed {
                continue;
            }
            let object = &candidate.object;
            if candidates.admits(object) && is_indexable(registry, object.as_ref())? {
                push_unique(&mut self.to_index, object);
            }
        }
        for object in &candidates.deleted {
            if candidates.admits(object) && is_indexable(registry, object.as_ref())? {
                push_unique(&mut self.to_remove, object);
            }
        }
        Ok(())
    }

    /// Post-commit hook: applies the captured changes to the index.
    ///
    /// Every object is attempted; failures are logged and reported, never
    /// propagated. Both sets are empty afterwards, whatever happened.
    pub async fn after_commit(&mut self, sync: &IndexSync) -> DrainReport {
        let mut report = DrainReport::default();
        if self.state != CaptureState::Collecting {
            return report;
        }
        self.state = CaptureState::Committed;

        let to_index = std::mem::take(&mut self.to_index);
        let to_remove = std::mem::take(&mut self.to_remove);

        for object in to_index {
            match sync.insert(object.as_ref()).await {
                Ok(()) => report.indexed += 1,
                Err(error) => report.failures.push(failure(DrainOp::Index, object.as_ref(), error)),
            }
        }
        for object in to_remove {
            match sync.delete(object.as_ref()).await {
                Ok(_) => report.removed += 1,
                Err(error) => report.failures.push(failure(DrainOp::Remove, object.as_ref(), error)),
            }
        }

        for f in &report.failures {
            warn!("Index write after commit failed: {}", f);
        }
        self.state = CaptureState::Idle;
        report
    }

    /// Rollback hook: forgets everything collected.
    pub fn rollback(&mut self) {
        self.to_index.clear();
        self.to_remove.clear();
        self.state = CaptureState::Idle;
    }
}

fn is_indexable(registry: &TypeRegistry, object: &dyn DomainObject) -> EngineResult<bool> {
    let indexable = registry.indexed_root_of_name(object.type_name())?.is_some();
    if !indexable {
        debug!("Skipping non-indexable {} object", object.type_name());
    }
    Ok(indexable)
}

fn push_unique(set: &mut Vec<Arc<dyn DomainObject>>, object: &Arc<dyn DomainObject>) {
    if !set.iter().any(|o| Arc::ptr_eq(o, object)) {
        set.push(object.clone());
    }
}

fn failure(op: DrainOp, object: &dyn DomainObject, error: EngineError) -> DrainFailure {
    DrainFailure {
        op,
        type_name: object.type_name().to_string(),
        id: object.id(),
        error,
    }
}
