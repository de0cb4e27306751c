//! Static domain type graph.
//!
//! Types are registered once at startup, parents before children. Every
//! lookup the engine performs at runtime (indexed roots, ancestor chains,
//! indexable anchors) is resolved when the registry is built and never
//! changes afterwards.

use crate::error::{ModelError, ModelResult};
use crate::field::{FieldDeclaration, FieldDeclarations};
use std::collections::HashMap;
use std::fmt;

/// Stable handle of a registered type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey(usize);

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Registration entry for one domain type.
#[derive(Debug, Clone)]
pub struct TypeDecl {
    name: String,
    parent: Option<String>,
    fields: Option<FieldDeclarations>,
}

impl TypeDecl {
    /// A type without a parent (the base of a hierarchy).
    pub fn root(name: &str) -> Self {
        Self {
            name: name.into(),
            parent: None,
            fields: None,
        }
    }

    /// A type deriving from `parent`.
    pub fn child(name: &str, parent: &str) -> Self {
        Self {
            name: name.into(),
            parent: Some(parent.into()),
            fields: None,
        }
    }

    /// Attaches a field declaration set, making the type indexable.
    #[must_use]
    pub fn with_fields(mut self, fields: FieldDeclarations) -> Self {
        self.fields = Some(fields);
        self
    }
}

#[derive(Debug)]
struct TypeNode {
    name: String,
    parent: Option<TypeKey>,
    children: Vec<TypeKey>,
    fields: Option<FieldDeclarations>,
    indexed_root: Option<TypeKey>,
}

/// The registered type hierarchy (a forest, traversed in registration order).
#[derive(Debug)]
pub struct TypeRegistry {
    nodes: Vec<TypeNode>,
    by_name: HashMap<String, TypeKey>,
    tops: Vec<TypeKey>,
    indexable_roots: Vec<TypeKey>,
}

impl TypeRegistry {
    /// Builds the registry from declarations given parents-first.
    pub fn new(decls: impl IntoIterator<Item = TypeDecl>) -> ModelResult<Self> {
        let mut registry = Self {
            nodes: Vec::new(),
            by_name: HashMap::new(),
            tops: Vec::new(),
            indexable_roots: Vec::new(),
        };

        for decl in decls {
            if registry.by_name.contains_key(&decl.name) {
                return Err(ModelError::DuplicateType(decl.name));
            }
            let key = TypeKey(registry.nodes.len());
            let parent = match &decl.parent {
                Some(parent) => {
                    let parent_key = registry.by_name.get(parent).copied().ok_or_else(|| {
                        ModelError::UnknownParent {
                            type_name: decl.name.clone(),
                            parent: parent.clone(),
                        }
                    })?;
                    registry.nodes[parent_key.0].children.push(key);
                    Some(parent_key)
                }
                None => {
                    registry.tops.push(key);
                    None
                }
            };
            registry.by_name.insert(decl.name.clone(), key);
            registry.nodes.push(TypeNode {
                name: decl.name,
                parent,
                children: Vec::new(),
                fields: decl.fields,
                indexed_root: None,
            });
        }

        for idx in 0..registry.nodes.len() {
            let root = registry.compute_indexed_root(TypeKey(idx));
            registry.nodes[idx].indexed_root = root;
        }
        registry.indexable_roots = registry.compute_indexable_roots();

        Ok(registry)
    }

    /// Looks up a type by its tag.
    pub fn lookup(&self, name: &str) -> Option<TypeKey> {
        self.by_name.get(name).copied()
    }

    /// Looks up a type by its tag, failing on unregistered names.
    pub fn resolve(&self, name: &str) -> ModelResult<TypeKey> {
        self.lookup(name)
            .ok_or_else(|| ModelError::UnknownType(name.to_string()))
    }

    /// The type's tag.
    pub fn name(&self, key: TypeKey) -> &str {
        &self.nodes[key.0].name
    }

    pub fn parent(&self, key: TypeKey) -> Option<TypeKey> {
        self.nodes[key.0].parent
    }

    /// Direct subtypes, in registration order.
    pub fn children(&self, key: TypeKey) -> &[TypeKey] {
        &self.nodes[key.0].children
    }

    /// The type's own field declaration set, if it has one.
    pub fn fields(&self, key: TypeKey) -> Option<&FieldDeclarations> {
        self.nodes[key.0].fields.as_ref()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walks from `key` (inclusive) up to the top of its hierarchy.
    pub fn ancestors(&self, key: TypeKey) -> impl Iterator<Item = TypeKey> + '_ {
        std::iter::successors(Some(key), move |k| self.nodes[k.0].parent)
    }

    /// The highest type on the ancestor chain (inclusive) that declares
    /// fields. `None` means objects of this type are not indexable.
    pub fn indexed_root_of(&self, key: TypeKey) -> Option<TypeKey> {
        self.nodes[key.0].indexed_root
    }

    /// [`indexed_root_of`](Self::indexed_root_of) by type tag.
    pub fn indexed_root_of_name(&self, name: &str) -> ModelResult<Option<TypeKey>> {
        Ok(self.indexed_root_of(self.resolve(name)?))
    }

    /// Every type usable as a document-type anchor: a depth-first walk that
    /// stops descending at the first declaring type on each path.
    pub fn indexable_root_types(&self) -> &[TypeKey] {
        &self.indexable_roots
    }

    /// Type tags from `key` up to its indexed root, inclusive.
    pub fn class_chain(&self, key: TypeKey) -> ModelResult<Vec<String>> {
        let root = self
            .indexed_root_of(key)
            .ok_or_else(|| ModelError::NotIndexable(self.name(key).to_string()))?;
        let mut chain = Vec::new();
        for k in self.ancestors(key) {
            chain.push(self.name(k).to_string());
            if k == root {
                break;
            }
        }
        Ok(chain)
    }

    /// The most derived type that is an ancestor (inclusive) of both `a` and
    /// `b`. `None` if they sit in different hierarchies.
    pub fn common_ancestor(&self, a: TypeKey, b: TypeKey) -> Option<TypeKey> {
        let chain: Vec<TypeKey> = self.ancestors(a).collect();
        self.ancestors(b).find(|k| chain.contains(k))
    }

    /// Depth-first, pre-order walk of `key` and all its subtypes.
    pub fn subtree(&self, key: TypeKey) -> Vec<TypeKey> {
        let mut out = Vec::new();
        let mut stack = vec![key];
        while let Some(k) = stack.pop() {
            out.push(k);
            stack.extend(self.children(k).iter().rev());
        }
        out
    }

    /// Field declarations of the whole subtree under `key`, first-seen wins
    /// by depth-first order.
    pub fn subtree_fields(&self, key: TypeKey) -> Vec<&FieldDeclaration> {
        let mut seen: Vec<&FieldDeclaration> = Vec::new();
        for k in self.subtree(key) {
            let Some(fields) = self.fields(k) else {
                continue;
            };
            for decl in fields.iter() {
                if !seen.iter().any(|d| d.name == decl.name) {
                    seen.push(decl);
                }
            }
        }
        seen
    }

    fn compute_indexed_root(&self, key: TypeKey) -> Option<TypeKey> {
        self.ancestors(key)
            .filter(|k| self.nodes[k.0].fields.is_some())
            .last()
    }

    fn compute_indexable_roots(&self) -> Vec<TypeKey> {
        let mut found = Vec::new();
        let mut stack: Vec<TypeKey> = self.tops.iter().rev().copied().collect();
        while let Some(k) = stack.pop() {
            if self.nodes[k.0].fields.is_some() {
                found.push(k);
                continue;
            }
            stack.extend(self.children(k).iter().rev());
        }
        found
    }
}
