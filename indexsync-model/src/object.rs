use crate::ObjectId;
use serde_json::Value;
use std::fmt;

/// A live object managed by the object store.
///
/// The engine never inspects objects reflectively. Everything it needs goes
/// through these three accessors, which the host implements per type.
pub trait DomainObject: Send + Sync + fmt::Debug {
    /// Tag of the object's exact (concrete) type, as registered in the
    /// [`TypeRegistry`](crate::TypeRegistry).
    fn type_name(&self) -> &str;

    /// Store-assigned identifier. `None` until the store has flushed a newly
    /// created object.
    fn id(&self) -> Option<ObjectId>;

    /// Raw value of a declared field. `None` is indexed as JSON null.
    fn field_value(&self, name: &str) -> Option<Value>;
}
