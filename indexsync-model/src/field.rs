use crate::DomainObject;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Backend mapping attributes for one search field (e.g. `{"type": "text"}`).
///
/// Kept as an ordered JSON object so that any attribute the backend
/// understands (analyzers, boosts, formats) can be passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldDefinition(Map<String, Value>);

impl FieldDefinition {
    /// A definition with only a `type` attribute.
    pub fn new(field_type: &str) -> Self {
        let mut attrs = Map::new();
        attrs.insert("type".into(), Value::String(field_type.into()));
        Self(attrs)
    }

    /// Shorthand for an analyzed full-text field.
    pub fn text() -> Self {
        Self::new("text")
    }

    /// Shorthand for an integer field.
    pub fn integer() -> Self {
        Self::new("integer")
    }

    /// Shorthand for a date field.
    pub fn date() -> Self {
        Self::new("date")
    }

    /// Shorthand for a boolean field.
    pub fn boolean() -> Self {
        Self::new("boolean")
    }

    /// Shorthand for an exact-match (non-analyzed) string field.
    pub fn keyword() -> Self {
        Self::new("string").with("index", "not_analyzed")
    }

    /// Adds or replaces an attribute.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Returns the `type` attribute, if any.
    pub fn field_type(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    /// Returns the attributes as a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

type ValueFn = dyn Fn(&Value) -> Value + Send + Sync;
type ValueAndObjectFn = dyn Fn(&Value, &dyn DomainObject) -> Value + Send + Sync;

/// Transforms a raw field value before it is written to a document.
///
/// The calling convention is fixed when the field is declared: a converter
/// either sees the raw value alone, or the raw value plus the whole object
/// (so it can reference sibling fields).
#[derive(Clone)]
pub enum Converter {
    ValueOnly(Arc<ValueFn>),
    ValueAndObject(Arc<ValueAndObjectFn>),
}

impl Converter {
    /// Wraps a converter that only needs the raw value.
    pub fn value_only<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Self::ValueOnly(Arc::new(f))
    }

    /// Wraps a converter that also receives the owning object.
    pub fn value_and_object<F>(f: F) -> Self
    where
        F: Fn(&Value, &dyn DomainObject) -> Value + Send + Sync + 'static,
    {
        Self::ValueAndObject(Arc::new(f))
    }

    /// Applies the converter.
    pub fn apply(&self, raw: &Value, object: &dyn DomainObject) -> Value {
        match self {
            Self::ValueOnly(f) => f(raw),
            Self::ValueAndObject(f) => f(raw, object),
        }
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValueOnly(_) => f.write_str("Converter::ValueOnly"),
            Self::ValueAndObject(_) => f.write_str("Converter::ValueAndObject"),
        }
    }
}

/// One declared search field of a domain type.
#[derive(Debug, Clone)]
pub struct FieldDeclaration {
    pub name: String,
    pub definition: FieldDefinition,
    pub converter: Option<Converter>,
}

/// Ordered set of field declarations attached to a domain type.
///
/// Re-declaring a name replaces the earlier declaration in place, so the
/// original position is kept.
#[derive(Debug, Clone, Default)]
pub struct FieldDeclarations {
    fields: Vec<FieldDeclaration>,
}

impl FieldDeclarations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a field whose raw value is indexed as-is.
    #[must_use]
    pub fn field(mut self, name: &str, definition: FieldDefinition) -> Self {
        self.insert(FieldDeclaration {
            name: name.into(),
            definition,
            converter: None,
        });
        self
    }

    /// Declares a field whose value passes through `converter` first.
    #[must_use]
    pub fn converted(mut self, name: &str, definition: FieldDefinition, converter: Converter) -> Self {
        self.insert(FieldDeclaration {
            name: name.into(),
            definition,
            converter: Some(converter),
        });
        self
    }

    /// Inserts a declaration, replacing any existing one with the same name.
    pub fn insert(&mut self, declaration: FieldDeclaration) {
        match self.fields.iter_mut().find(|f| f.name == declaration.name) {
            Some(existing) => *existing = declaration,
            None => self.fields.push(declaration),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldDeclaration> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDeclaration> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
