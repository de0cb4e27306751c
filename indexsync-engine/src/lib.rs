//! Search index synchronization engine.
//!
//! Keeps a search backend consistent with a transactional object store and
//! resolves search hits back into live domain objects.
//!
//! # Components
//!
//! - **Mapping**: derives and publishes one schema per indexable root type
//! - **Capture**: collects changed objects before commit, writes them after
//! - **Query**: runs a search and rehydrates hits in backend order
//! - **Store**: the object store contract plus an in-memory implementation
//!
//! # Transaction lifecycle
//!
//! 1. The host opens a [`ChangeCapture`] for its transaction
//! 2. At flush, it hands over created, modified and deleted objects
//!    ([`ChangeCapture::before_commit`])
//! 3. After a successful commit it drains the capture
//!    ([`ChangeCapture::after_commit`]); after a rollback it discards it
//!
//! # Example
//!
//! ```
//! use indexsync_backend::mock::MockBackend;
//! use indexsync_engine::{EngineConfig, IndexSync, MemoryStore};
//! use indexsync_model::{FieldDeclarations, FieldDefinition, TypeDecl, TypeRegistry};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(
//!     TypeRegistry::new([
//!         TypeDecl::root("Content"),
//!         TypeDecl::child("Article", "Content")
//!             .with_fields(FieldDeclarations::new().field("title", FieldDefinition::text())),
//!     ])
//!     .unwrap(),
//! );
//! let store = Arc::new(MemoryStore::new(registry.clone()));
//! let sync = IndexSync::new(
//!     EngineConfig::default(),
//!     registry,
//!     Arc::new(MockBackend::new()),
//!     store,
//! );
//! assert_eq!(sync.index(), "score");
//! ```

mod capture;
mod engine;
mod error;
mod mapping;
mod query;
pub mod store;

pub use capture::{
    CaptureState, ChangeCapture, DrainFailure, DrainOp, DrainReport, FlushCandidates,
    ModifiedCandidate,
};
pub use engine::{EngineConfig, IndexSync, DEFAULT_INDEX, DEFAULT_REFRESH_BATCH_SIZE};
pub use error::{EngineError, EngineResult};
pub use mapping::{build_mapping, MappingPublisher};
pub use query::{partition_runs, HitRun, ObjectStream, QueryOptions, QueryRouter};
pub use store::{MemoryStore, ObjectStore};
