//! Schema derivation and publication.

use crate::error::EngineResult;
use indexsync_backend::{SearchBackend, TypeMapping};
use indexsync_model::{FieldDefinition, TypeKey, TypeRegistry};
use serde_json::Map;
use std::sync::Arc;
use tracing::{debug, info};

/// Derives the mapping of the document type anchored at `root`.
///
/// Field declarations of the whole subtree are merged depth-first, the first
/// declaration of a name winning. `class` and `concrete_class` are always
/// exact-match strings, and the raw source is not stored: documents are only
/// ever read back as ids.
pub fn build_mapping(registry: &TypeRegistry, root: TypeKey) -> TypeMapping {
    let mut properties = Map::new();
    for decl in registry.subtree_fields(root) {
        properties.insert(decl.name.clone(), decl.definition.to_json());
    }
    properties.insert("class".into(), FieldDefinition::keyword().to_json());
    properties.insert("concrete_class".into(), FieldDefinition::keyword().to_json());

    TypeMapping {
        doc_type: registry.name(root).to_string(),
        properties,
        source_enabled: false,
    }
}

/// Publishes the schema of every indexable root type to the backend.
pub struct MappingPublisher {
    registry: Arc<TypeRegistry>,
    backend: Arc<dyn SearchBackend>,
    index: String,
}

impl MappingPublisher {
    pub fn new(registry: Arc<TypeRegistry>, backend: Arc<dyn SearchBackend>, index: impl Into<String>) -> Self {
        Self {
            registry,
            backend,
            index: index.into(),
        }
    }

    /// Drops the index.
    pub async fn destroy(&self) -> EngineResult<()> {
        info!("Dropping index {}", self.index);
        self.backend.drop_index(&self.index).await?;
        Ok(())
    }

    /// Ensures the index exists and publishes one mapping per indexable root
    /// type, dropping the index first if `destroy_first` is set.
    ///
    /// Mappings are applied one type at a time. A failure stops publication
    /// but leaves the mappings already published in place. Returns the
    /// published document types.
    pub async fn publish_schema(&self, destroy_first: bool) -> EngineResult<Vec<String>> {
        if destroy_first {
            self.destroy().await?;
        }
        self.backend.create_index(&self.index).await?;

        let mut published = Vec::new();
        for &root in self.registry.indexable_root_types() {
            let mapping = build_mapping(&self.registry, root);
            debug!(
                "Publishing mapping for {} ({} properties)",
                mapping.doc_type,
                mapping.properties.len()
            );
            self.backend.put_mapping(&self.index, &mapping).await?;
            published.push(mapping.doc_type);
        }

        info!("Published {} mappings to index {}", published.len(), self.index);
        Ok(published)
    }
}
