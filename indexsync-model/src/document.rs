use crate::ObjectId;
use serde_json::{Map, Value};

/// Document keys the engine fills itself; declared fields never override them.
pub const RESERVED_KEYS: [&str; 4] = ["_id", "_type", "class", "concrete_class"];

/// A flat search document produced from one domain object.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchDocument {
    /// Identifier of the source object (`_id`).
    pub id: ObjectId,
    /// Tag of the indexed root type (`_type`).
    pub doc_type: String,
    /// Type tags from the concrete type up to the indexed root (`class`).
    pub classes: Vec<String>,
    /// Tag of the object's exact type (`concrete_class`).
    pub concrete_class: String,
    /// Declared field values, in plan order.
    pub fields: Map<String, Value>,
}

impl SearchDocument {
    /// The body sent to the backend: everything except `_id` and `_type`,
    /// which travel as addressing metadata instead.
    pub fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert(
            "class".into(),
            Value::Array(self.classes.iter().cloned().map(Value::String).collect()),
        );
        body.insert(
            "concrete_class".into(),
            Value::String(self.concrete_class.clone()),
        );
        for (name, value) in &self.fields {
            body.insert(name.clone(), value.clone());
        }
        Value::Object(body)
    }

    /// The full document, metadata included.
    pub fn to_json(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("_id".into(), Value::String(self.id.to_string()));
        doc.insert("_type".into(), Value::String(self.doc_type.clone()));
        if let Value::Object(body) = self.body() {
            doc.extend(body);
        }
        Value::Object(doc)
    }

    /// Reads one key of [`to_json`](Self::to_json) without building it.
    pub fn get(&self, key: &str) -> Option<Value> {
        match key {
            "_id" => Some(Value::String(self.id.to_string())),
            "_type" => Some(Value::String(self.doc_type.clone())),
            "class" => Some(Value::Array(
                self.classes.iter().cloned().map(Value::String).collect(),
            )),
            "concrete_class" => Some(Value::String(self.concrete_class.clone())),
            _ => self.fields.get(key).cloned(),
        }
    }
}
