//! Domain model for indexsync.
//!
//! Defines the pieces every other layer builds on:
//! - [`ObjectId`]: identifier the object store assigns to a domain object
//! - [`DomainObject`]: how the engine reads ids, type tags and field values
//! - [`FieldDeclarations`]: per-type search field definitions and converters
//! - [`TypeRegistry`]: the static type graph and indexed-root resolution
//! - [`DocumentCompiler`]: compiled per-type plans producing [`SearchDocument`]s
//!
//! # Example
//!
//! ```
//! use indexsync_model::{FieldDeclarations, FieldDefinition, TypeDecl, TypeRegistry};
//!
//! let registry = TypeRegistry::new([
//!     TypeDecl::root("Content"),
//!     TypeDecl::child("Article", "Content")
//!         .with_fields(FieldDeclarations::new().field("title", FieldDefinition::text())),
//! ])
//! .unwrap();
//!
//! let article = registry.resolve("Article").unwrap();
//! assert_eq!(registry.indexed_root_of(article), Some(article));
//! ```

mod compiler;
mod document;
mod error;
mod field;
mod ids;
mod object;
mod registry;

pub use compiler::{DocumentCompiler, DocumentPlan, FieldStep};
pub use document::{SearchDocument, RESERVED_KEYS};
pub use error::{ModelError, ModelResult};
pub use field::{Converter, FieldDeclaration, FieldDeclarations, FieldDefinition};
pub use ids::ObjectId;
pub use object::DomainObject;
pub use registry::{TypeDecl, TypeKey, TypeRegistry};
