use indexsync_model::{FieldDeclarations, FieldDefinition, ModelError, TypeDecl, TypeRegistry};
use pretty_assertions::assert_eq;

fn title() -> FieldDeclarations {
    FieldDeclarations::new().field("title", FieldDefinition::text())
}

/// Content
/// ├── Article (title)
/// │   └── Review (rating)
/// ├── Video (duration)
/// └── Folder
///     └── Image (caption)
fn content_registry() -> TypeRegistry {
    TypeRegistry::new([
        TypeDecl::root("Content"),
        TypeDecl::child("Article", "Content").with_fields(title()),
        TypeDecl::child("Review", "Article")
            .with_fields(FieldDeclarations::new().field("rating", FieldDefinition::integer())),
        TypeDecl::child("Video", "Content")
            .with_fields(FieldDeclarations::new().field("duration", FieldDefinition::integer())),
        TypeDecl::child("Folder", "Content"),
        TypeDecl::child("Image", "Folder")
            .with_fields(FieldDeclarations::new().field("caption", FieldDefinition::text())),
    ])
    .unwrap()
}

fn names(registry: &TypeRegistry, keys: &[indexsync_model::TypeKey]) -> Vec<String> {
    keys.iter().map(|k| registry.name(*k).to_string()).collect()
}

// ── Construction ─────────────────────────────────────────────────

#[test]
fn registry_lookup_by_name() {
    let registry = content_registry();
    assert_eq!(registry.len(), 6);
    let article = registry.lookup("Article").unwrap();
    assert_eq!(registry.name(article), "Article");
    assert_eq!(registry.parent(article), registry.lookup("Content"));
    assert!(registry.lookup("Podcast").is_none());
}

#[test]
fn resolve_unknown_type_fails() {
    let registry = content_registry();
    assert!(matches!(
        registry.resolve("Podcast"),
        Err(ModelError::UnknownType(name)) if name == "Podcast"
    ));
}

#[test]
fn duplicate_type_rejected() {
    let result = TypeRegistry::new([TypeDecl::root("Content"), TypeDecl::root("Content")]);
    assert!(matches!(result, Err(ModelError::DuplicateType(name)) if name == "Content"));
}

#[test]
fn parent_must_be_registered_first() {
    let result = TypeRegistry::new([
        TypeDecl::child("Article", "Content"),
        TypeDecl::root("Content"),
    ]);
    assert!(matches!(
        result,
        Err(ModelError::UnknownParent { type_name, parent })
            if type_name == "Article" && parent == "Content"
    ));
}

#[test]
fn children_in_registration_order() {
    let registry = content_registry();
    let content = registry.lookup("Content").unwrap();
    assert_eq!(
        names(&registry, registry.children(content)),
        vec!["Article", "Video", "Folder"]
    );
}

// ── Indexed roots ────────────────────────────────────────────────

#[test]
fn declaring_type_is_its_own_root() {
    let registry = content_registry();
    let article = registry.lookup("Article").unwrap();
    assert_eq!(registry.indexed_root_of(article), Some(article));
}

#[test]
fn subtype_resolves_to_highest_declaring_ancestor() {
    let registry = content_registry();
    let review = registry.lookup("Review").unwrap();
    assert_eq!(registry.indexed_root_of(review), registry.lookup("Article"));
}

#[test]
fn type_without_declaring_ancestor_is_not_indexable() {
    let registry = content_registry();
    assert_eq!(registry.indexed_root_of(registry.lookup("Content").unwrap()), None);
    assert_eq!(registry.indexed_root_of(registry.lookup("Folder").unwrap()), None);
}

#[test]
fn undeclared_subtype_of_indexed_type_inherits_root() {
    let registry = TypeRegistry::new([
        TypeDecl::root("Content"),
        TypeDecl::child("Article", "Content").with_fields(title()),
        TypeDecl::child("NewsArticle", "Article"),
    ])
    .unwrap();
    let news = registry.lookup("NewsArticle").unwrap();
    assert_eq!(registry.indexed_root_of(news), registry.lookup("Article"));
}

#[test]
fn declaring_top_level_type_anchors_whole_tree() {
    let registry = TypeRegistry::new([
        TypeDecl::root("Content").with_fields(title()),
        TypeDecl::child("Article", "Content").with_fields(title()),
    ])
    .unwrap();
    let article = registry.lookup("Article").unwrap();
    assert_eq!(registry.indexed_root_of(article), registry.lookup("Content"));
}

#[test]
fn indexed_root_by_name() {
    let registry = content_registry();
    assert_eq!(
        registry.indexed_root_of_name("Image").unwrap(),
        registry.lookup("Image")
    );
    assert!(registry.indexed_root_of_name("Podcast").is_err());
}

#[test]
fn class_chain_runs_up_to_root() {
    let registry = content_registry();
    let review = registry.lookup("Review").unwrap();
    assert_eq!(registry.class_chain(review).unwrap(), vec!["Review", "Article"]);

    let folder = registry.lookup("Folder").unwrap();
    assert!(matches!(
        registry.class_chain(folder),
        Err(ModelError::NotIndexable(name)) if name == "Folder"
    ));
}

// ── Indexable roots ──────────────────────────────────────────────

#[test]
fn indexable_roots_depth_first() {
    let registry = content_registry();
    assert_eq!(
        names(&registry, registry.indexable_root_types()),
        vec!["Article", "Video", "Image"]
    );
}

#[test]
fn indexable_roots_do_not_descend_into_indexed_types() {
    let registry = content_registry();
    let roots = names(&registry, registry.indexable_root_types());
    assert!(!roots.contains(&"Review".to_string()));
}

#[test]
fn indexable_roots_cover_every_top_level_type() {
    let registry = TypeRegistry::new([
        TypeDecl::root("Content"),
        TypeDecl::root("User").with_fields(FieldDeclarations::new().field("name", FieldDefinition::text())),
        TypeDecl::child("Article", "Content").with_fields(title()),
    ])
    .unwrap();
    assert_eq!(
        names(&registry, registry.indexable_root_types()),
        vec!["Article", "User"]
    );
}

#[test]
fn indexable_roots_empty_without_declarations() {
    let registry = TypeRegistry::new([TypeDecl::root("Content")]).unwrap();
    assert!(registry.indexable_root_types().is_empty());
}

#[test]
fn common_ancestor_is_most_derived_shared_type() {
    let registry = content_registry();
    let key = |n: &str| registry.lookup(n).unwrap();

    assert_eq!(registry.common_ancestor(key("Review"), key("Article")), Some(key("Article")));
    assert_eq!(registry.common_ancestor(key("Article"), key("Review")), Some(key("Article")));
    assert_eq!(registry.common_ancestor(key("Review"), key("Video")), Some(key("Content")));
    assert_eq!(registry.common_ancestor(key("Image"), key("Image")), Some(key("Image")));

    let forest = TypeRegistry::new([TypeDecl::root("Content"), TypeDecl::root("User")]).unwrap();
    assert_eq!(
        forest.common_ancestor(forest.lookup("Content").unwrap(), forest.lookup("User").unwrap()),
        None
    );
}

// ── Subtrees ─────────────────────────────────────────────────────

#[test]
fn subtree_is_preorder() {
    let registry = content_registry();
    let content = registry.lookup("Content").unwrap();
    assert_eq!(
        names(&registry, &registry.subtree(content)),
        vec!["Content", "Article", "Review", "Video", "Folder", "Image"]
    );
}

#[test]
fn subtree_fields_first_seen_wins() {
    let registry = TypeRegistry::new([
        TypeDecl::root("Content"),
        TypeDecl::child("Article", "Content").with_fields(title()),
        TypeDecl::child("Review", "Article").with_fields(
            FieldDeclarations::new()
                .field("title", FieldDefinition::keyword())
                .field("rating", FieldDefinition::integer()),
        ),
    ])
    .unwrap();
    let article = registry.lookup("Article").unwrap();
    let fields = registry.subtree_fields(article);
    let field_names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(field_names, vec!["title", "rating"]);
    assert_eq!(fields[0].definition, FieldDefinition::text());
}
