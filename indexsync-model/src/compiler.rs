//! Per-type document plans and the process-wide plan cache.
//!
//! A plan holds everything about a document that depends only on the
//! concrete type (type tags, which fields to read, which converters to run),
//! so producing a document from an object is a straight walk over its steps.

use crate::document::{SearchDocument, RESERVED_KEYS};
use crate::error::{ModelError, ModelResult};
use crate::field::Converter;
use crate::registry::{TypeKey, TypeRegistry};
use crate::DomainObject;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Extraction of one document field.
#[derive(Debug, Clone)]
pub struct FieldStep {
    pub name: String,
    pub converter: Option<Converter>,
}

impl FieldStep {
    /// Reads the raw value from `object` and applies the converter, if any.
    pub fn extract(&self, object: &dyn DomainObject) -> Value {
        let raw = object.field_value(&self.name).unwrap_or(Value::Null);
        match &self.converter {
            Some(converter) => converter.apply(&raw, object),
            None => raw,
        }
    }
}

/// Compiled conversion for one concrete type. Read-only once built.
#[derive(Debug, Clone)]
pub struct DocumentPlan {
    pub type_key: TypeKey,
    pub doc_type: String,
    pub classes: Vec<String>,
    pub concrete_class: String,
    pub steps: Vec<FieldStep>,
}

impl DocumentPlan {
    /// Builds the plan for `key`, walking from the concrete type up to its
    /// indexed root. The first declaration of a name wins, so subtypes
    /// override their ancestors.
    pub fn build(registry: &TypeRegistry, key: TypeKey) -> ModelResult<Self> {
        let root = registry
            .indexed_root_of(key)
            .ok_or_else(|| ModelError::NotIndexable(registry.name(key).to_string()))?;

        let mut steps: Vec<FieldStep> = Vec::new();
        for k in registry.ancestors(key) {
            if let Some(fields) = registry.fields(k) {
                for decl in fields.iter() {
                    if RESERVED_KEYS.contains(&decl.name.as_str()) {
                        debug!("Ignoring reserved field {} on {}", decl.name, registry.name(k));
                        continue;
                    }
                    if steps.iter().any(|s| s.name == decl.name) {
                        continue;
                    }
                    steps.push(FieldStep {
                        name: decl.name.clone(),
                        converter: decl.converter.clone(),
                    });
                }
            }
            if k == root {
                break;
            }
        }

        Ok(Self {
            type_key: key,
            doc_type: registry.name(root).to_string(),
            classes: registry.class_chain(key)?,
            concrete_class: registry.name(key).to_string(),
            steps,
        })
    }

    /// Produces the document for `object`, which must already have an id.
    pub fn render(&self, object: &dyn DomainObject) -> ModelResult<SearchDocument> {
        let id = object
            .id()
            .ok_or_else(|| ModelError::MissingId(object.type_name().to_string()))?;
        let mut fields = Map::new();
        for step in &self.steps {
            fields.insert(step.name.clone(), step.extract(object));
        }
        Ok(SearchDocument {
            id,
            doc_type: self.doc_type.clone(),
            classes: self.classes.clone(),
            concrete_class: self.concrete_class.clone(),
            fields,
        })
    }
}

/// Compiles and caches one [`DocumentPlan`] per concrete type.
///
/// Plans are built outside the lock. If two callers race on the same type
/// both build, the first insert is kept and both get that entry.
#[derive(Debug)]
pub struct DocumentCompiler {
    registry: Arc<TypeRegistry>,
    plans: RwLock<HashMap<TypeKey, Arc<DocumentPlan>>>,
}

impl DocumentCompiler {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            plans: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    /// Returns the cached plan for `key`, compiling it on first use.
    pub fn compile(&self, key: TypeKey) -> ModelResult<Arc<DocumentPlan>> {
        if let Some(plan) = self
            .plans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(plan.clone());
        }

        let plan = Arc::new(DocumentPlan::build(&self.registry, key)?);
        debug!(
            "Compiled document plan for {} ({} fields)",
            plan.concrete_class,
            plan.steps.len()
        );
        let mut plans = self.plans.write().unwrap_or_else(PoisonError::into_inner);
        Ok(plans.entry(key).or_insert(plan).clone())
    }

    /// Converts `object` into its search document.
    pub fn convert(&self, object: &dyn DomainObject) -> ModelResult<SearchDocument> {
        let key = self.registry.resolve(object.type_name())?;
        self.compile(key)?.render(object)
    }

    /// Number of compiled plans held.
    pub fn cached(&self) -> usize {
        self.plans.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}
