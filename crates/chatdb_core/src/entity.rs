//! Typed entities.

use crate::error::{StoreError, StoreResult};
use ciborium::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A record type stored in one collection.
///
/// Entities are plain serde structs. Their serialized field names are the
/// persisted field names, so index key paths refer to them directly.
///
/// ```rust,ignore
/// #[derive(Serialize, Deserialize)]
/// struct Note { id: String, author: String }
///
/// impl Entity for Note {
///     const COLLECTION: &'static str = "notes";
///     fn key(&self) -> &str { &self.id }
/// }
/// ```
pub trait Entity: Serialize + DeserializeOwned {
    /// Collection holding this entity.
    const COLLECTION: &'static str;

    /// Primary key.
    ///
    /// Must match the field at the collection's key path; typed writes
    /// reject an entity whose key and key field disagree.
    fn key(&self) -> &str;

    /// Checks the entity before it is written.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEntity` describing the first violated rule.
    fn validate(&self) -> StoreResult<()> {
        Ok(())
    }

    /// Converts the entity into a document.
    fn to_document(&self) -> StoreResult<Value> {
        Ok(Value::serialized(self)?)
    }

    /// Reads an entity back from a document.
    fn from_document(document: &Value) -> StoreResult<Self> {
        document.deserialized().map_err(|e| {
            StoreError::corruption(format!(
                "document in {} does not decode: {e}",
                Self::COLLECTION
            ))
        })
    }
}
