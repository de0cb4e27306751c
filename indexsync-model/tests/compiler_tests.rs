use indexsync_model::{
    Converter, DocumentCompiler, DomainObject, FieldDeclarations, FieldDefinition, ModelError,
    ObjectId, TypeDecl, TypeRegistry,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};
use std::sync::Arc;

#[derive(Debug)]
struct Record {
    type_name: &'static str,
    id: Option<u64>,
    values: Map<String, Value>,
}

impl Record {
    fn new(type_name: &'static str, id: u64, values: Value) -> Self {
        let Value::Object(values) = values else {
            panic!("record values must be an object");
        };
        Self {
            type_name,
            id: Some(id),
            values,
        }
    }
}

impl DomainObject for Record {
    fn type_name(&self) -> &str {
        self.type_name
    }

    fn id(&self) -> Option<ObjectId> {
        self.id.map(ObjectId::new)
    }

    fn field_value(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }
}

fn registry() -> Arc<TypeRegistry> {
    Arc::new(
        TypeRegistry::new([
            TypeDecl::root("Content"),
            TypeDecl::child("Article", "Content").with_fields(
                FieldDeclarations::new()
                    .field("title", FieldDefinition::text())
                    .converted(
                        "tags",
                        FieldDefinition::keyword(),
                        Converter::value_only(|v| {
                            json!(v.as_str().unwrap_or_default().split(',').collect::<Vec<_>>())
                        }),
                    ),
            ),
            TypeDecl::child("Review", "Article").with_fields(
                FieldDeclarations::new()
                    .converted(
                        "title",
                        FieldDefinition::text(),
                        Converter::value_and_object(|v, obj| {
                            let rating = obj.field_value("rating").unwrap_or(Value::Null);
                            json!(format!("{} ({}/5)", v.as_str().unwrap_or_default(), rating))
                        }),
                    )
                    .field("rating", FieldDefinition::integer()),
            ),
            TypeDecl::child("Folder", "Content"),
        ])
        .unwrap(),
    )
}

// ── Plan shape ───────────────────────────────────────────────────

#[test]
fn plan_for_root_type() {
    let registry = registry();
    let compiler = DocumentCompiler::new(registry.clone());
    let plan = compiler.compile(registry.lookup("Article").unwrap()).unwrap();

    assert_eq!(plan.doc_type, "Article");
    assert_eq!(plan.concrete_class, "Article");
    assert_eq!(plan.classes, vec!["Article"]);
    let steps: Vec<&str> = plan.steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(steps, vec!["title", "tags"]);
}

#[test]
fn plan_for_subtype_walks_up_to_root() {
    let registry = registry();
    let compiler = DocumentCompiler::new(registry.clone());
    let plan = compiler.compile(registry.lookup("Review").unwrap()).unwrap();

    assert_eq!(plan.doc_type, "Article");
    assert_eq!(plan.concrete_class, "Review");
    assert_eq!(plan.classes, vec!["Review", "Article"]);
    let steps: Vec<&str> = plan.steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(steps, vec!["title", "rating", "tags"]);
}

#[test]
fn compile_non_indexable_type_fails() {
    let registry = registry();
    let compiler = DocumentCompiler::new(registry.clone());
    let result = compiler.compile(registry.lookup("Folder").unwrap());
    assert!(matches!(result, Err(ModelError::NotIndexable(name)) if name == "Folder"));
    assert_eq!(compiler.cached(), 0);
}

#[test]
fn reserved_names_are_not_overridden() {
    let registry = Arc::new(
        TypeRegistry::new([TypeDecl::root("Page").with_fields(
            FieldDeclarations::new()
                .field("class", FieldDefinition::text())
                .field("body", FieldDefinition::text()),
        )])
        .unwrap(),
    );
    let compiler = DocumentCompiler::new(registry);
    let doc = compiler
        .convert(&Record::new("Page", 4, json!({"class": "x", "body": "b"})))
        .unwrap();
    assert_eq!(doc.get("class"), Some(json!(["Page"])));
    assert_eq!(doc.get("body"), Some(json!("b")));
}

// ── Documents ────────────────────────────────────────────────────

#[test]
fn article_document() {
    let compiler = DocumentCompiler::new(registry());
    let article = Record::new("Article", 1, json!({"title": "Hello", "tags": "a,b"}));
    let doc = compiler.convert(&article).unwrap();

    assert_eq!(
        doc.to_json(),
        json!({
            "_id": "1",
            "_type": "Article",
            "class": ["Article"],
            "concrete_class": "Article",
            "title": "Hello",
            "tags": ["a", "b"],
        })
    );
}

#[test]
fn body_omits_addressing_metadata() {
    let compiler = DocumentCompiler::new(registry());
    let doc = compiler
        .convert(&Record::new("Article", 1, json!({"title": "Hello"})))
        .unwrap();
    let body = doc.body();
    assert!(body.get("_id").is_none());
    assert!(body.get("_type").is_none());
    assert_eq!(body["class"], json!(["Article"]));
}

#[test]
fn subtype_converter_takes_precedence() {
    let compiler = DocumentCompiler::new(registry());
    let review = Record::new(
        "Review",
        9,
        json!({"title": "Great", "rating": 4, "tags": "x"}),
    );
    let doc = compiler.convert(&review).unwrap();

    assert_eq!(doc.doc_type, "Article");
    assert_eq!(doc.get("_type"), Some(json!("Article")));
    assert_eq!(doc.get("class"), Some(json!(["Review", "Article"])));
    assert_eq!(doc.get("concrete_class"), Some(json!("Review")));
    assert_eq!(doc.get("title"), Some(json!("Great (4/5)")));
    assert_eq!(doc.get("tags"), Some(json!(["x"])));
}

#[test]
fn missing_field_is_null() {
    let compiler = DocumentCompiler::new(registry());
    let doc = compiler
        .convert(&Record::new("Review", 2, json!({"title": "t"})))
        .unwrap();
    assert_eq!(doc.get("rating"), Some(Value::Null));
}

#[test]
fn object_without_id_cannot_render() {
    let compiler = DocumentCompiler::new(registry());
    let mut article = Record::new("Article", 1, json!({}));
    article.id = None;
    assert!(matches!(
        compiler.convert(&article),
        Err(ModelError::MissingId(name)) if name == "Article"
    ));
}

#[test]
fn unknown_object_type_fails() {
    let compiler = DocumentCompiler::new(registry());
    let result = compiler.convert(&Record::new("Podcast", 1, json!({})));
    assert!(matches!(result, Err(ModelError::UnknownType(_))));
}

// ── Cache ────────────────────────────────────────────────────────

#[test]
fn plans_are_cached_per_type() {
    let registry = registry();
    let compiler = DocumentCompiler::new(registry.clone());
    let article = registry.lookup("Article").unwrap();

    let first = compiler.compile(article).unwrap();
    let second = compiler.compile(article).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(compiler.cached(), 1);

    compiler.compile(registry.lookup("Review").unwrap()).unwrap();
    assert_eq!(compiler.cached(), 2);
}

#[test]
fn concurrent_compiles_converge() {
    let registry = registry();
    let compiler = Arc::new(DocumentCompiler::new(registry.clone()));
    let review = registry.lookup("Review").unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let compiler = compiler.clone();
            std::thread::spawn(move || compiler.compile(review).unwrap())
        })
        .collect();
    let plans: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let cached = compiler.compile(review).unwrap();
    assert_eq!(compiler.cached(), 1);
    for plan in plans {
        assert_eq!(plan.classes, cached.classes);
        assert_eq!(plan.steps.len(), cached.steps.len());
    }
}
