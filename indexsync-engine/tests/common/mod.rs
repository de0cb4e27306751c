//! Shared fixtures for engine tests.

#![allow(dead_code)]

use indexsync_backend::mock::MockBackend;
use indexsync_engine::{EngineConfig, IndexSync, MemoryStore};
use indexsync_model::{
    Converter, DomainObject, FieldDeclarations, FieldDefinition, ObjectId, TypeDecl, TypeRegistry,
};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

/// Routes engine logs to the test output (`RUST_LOG=debug cargo test`).
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A stored object. The id stays unset (0) until [`Record::assign_id`],
/// like a freshly created object before the store flushes it.
#[derive(Debug)]
pub struct Record {
    type_name: String,
    id: AtomicU64,
    values: Map<String, Value>,
}

impl Record {
    pub fn new(type_name: &str, id: u64, values: Value) -> Arc<Self> {
        let values = match values {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Arc::new(Self {
            type_name: type_name.to_string(),
            id: AtomicU64::new(id),
            values,
        })
    }

    pub fn unsaved(type_name: &str, values: Value) -> Arc<Self> {
        Self::new(type_name, 0, values)
    }

    pub fn assign_id(&self, id: u64) {
        self.id.store(id, Ordering::SeqCst);
    }
}

impl DomainObject for Record {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn id(&self) -> Option<ObjectId> {
        match self.id.load(Ordering::SeqCst) {
            0 => None,
            id => Some(ObjectId::new(id)),
        }
    }

    fn field_value(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }
}

/// Content (undeclared)
/// ├── Article { title, views }
/// │   └── Review { rating, title (uppercased) }
/// └── Video { title, duration }
/// Folder (undeclared, not indexable)
/// └── Archive (undeclared)
pub fn registry() -> Arc<TypeRegistry> {
    Arc::new(
        TypeRegistry::new([
            TypeDecl::root("Content"),
            TypeDecl::child("Article", "Content").with_fields(
                FieldDeclarations::new()
                    .field("title", FieldDefinition::text())
                    .field("views", FieldDefinition::integer()),
            ),
            TypeDecl::child("Review", "Article").with_fields(
                FieldDeclarations::new()
                    .field("rating", FieldDefinition::integer())
                    .converted(
                        "title",
                        FieldDefinition::text(),
                        Converter::value_only(|v| {
                            json!(v.as_str().unwrap_or_default().to_uppercase())
                        }),
                    ),
            ),
            TypeDecl::child("Video", "Content").with_fields(
                FieldDeclarations::new()
                    .field("title", FieldDefinition::text())
                    .field("duration", FieldDefinition::integer()),
            ),
            TypeDecl::root("Folder"),
            TypeDecl::child("Archive", "Folder"),
        ])
        .expect("fixture registry is valid"),
    )
}

/// An engine over the fixture registry with a mock backend and an
/// in-memory store.
pub struct Harness {
    pub sync: IndexSync,
    pub backend: Arc<MockBackend>,
    pub store: Arc<MemoryStore>,
}

pub fn harness() -> Harness {
    harness_with(EngineConfig::default())
}

pub fn harness_with(config: EngineConfig) -> Harness {
    init_tracing();
    let registry = registry();
    let backend = Arc::new(MockBackend::new());
    let store = Arc::new(MemoryStore::new(registry.clone()));
    let sync = IndexSync::new(config, registry, backend.clone(), store.clone());
    Harness {
        sync,
        backend,
        store,
    }
}

/// Upcasts a record for the engine APIs.
pub fn obj(record: &Arc<Record>) -> Arc<dyn DomainObject> {
    record.clone()
}
