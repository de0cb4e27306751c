//! Search backend contract for indexsync.
//!
//! The engine never speaks to a search cluster directly. It talks to a
//! [`SearchBackend`], which this crate implements twice:
//! - [`ElasticBackend`]: REST client for an Elasticsearch 1.x style API
//! - [`mock::MockBackend`]: in-memory recorder for tests
//!
//! # Example
//!
//! ```
//! use indexsync_backend::{ElasticBackend, ElasticConfig};
//!
//! let config = ElasticConfig {
//!     base_url: "http://search.internal:9200".to_string(),
//!     ..Default::default()
//! };
//! let backend = ElasticBackend::new(config).unwrap();
//! ```

mod backend;
mod elastic;
mod error;
pub mod mock;

pub use backend::{
    BulkFailure, BulkSummary, SearchBackend, SearchHit, SearchQuery, SearchRequest, TypeMapping,
};
pub use elastic::{ElasticBackend, ElasticConfig};
pub use error::{BackendError, BackendResult};
