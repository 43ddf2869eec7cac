//! In-process document database engine.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use serde_json::Value;

use shopfront_core::error::Result;

/// Named collections of JSON documents keyed by id.
///
/// Critical sections are short and never held across an await point; callers
/// needing read-modify-write atomicity go through [`DocumentDb::modify`].
#[derive(Debug, Default)]
pub struct DocumentDb {
    collections: RwLock<HashMap<String, BTreeMap<String, Value>>>,
}

impl DocumentDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new document. Returns `false` when the id is already taken.
    pub fn insert(&self, collection: &str, id: &str, document: Value) -> bool {
        let mut collections = self.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.contains_key(id) {
            return false;
        }
        docs.insert(id.to_string(), document);
        true
    }

    pub fn get(&self, collection: &str, id: &str) -> Option<Value> {
        self.collections
            .read()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    /// Remove a document. Returns `false` when it was absent.
    pub fn remove(&self, collection: &str, id: &str) -> bool {
        let mut collections = self.collections.write();
        collections
            .get_mut(collection)
            .is_some_and(|docs| docs.remove(id).is_some())
    }

    /// Atomically mutate one document under the write lock.
    ///
    /// `f` runs against a working copy; the store is only updated when it
    /// returns `Ok`, so a failed mutation leaves the document untouched.
    /// Returns `Ok(None)` when the document does not exist.
    pub fn modify<R>(
        &self,
        collection: &str,
        id: &str,
        f: impl FnOnce(&mut Value) -> Result<R>,
    ) -> Result<Option<R>> {
        let mut collections = self.collections.write();
        let Some(doc) = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
        else {
            return Ok(None);
        };
        let mut working = doc.clone();
        let out = f(&mut working)?;
        *doc = working;
        Ok(Some(out))
    }

    /// All documents of a collection in id order. The expensive path —
    /// every non-indexed query in the adapter starts here.
    pub fn scan(&self, collection: &str) -> Vec<Value> {
        self.collections
            .read()
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map_or(0, BTreeMap::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shopfront_core::StoreError;

    #[test]
    fn insert_rejects_duplicate_ids() {
        let db = DocumentDb::new();
        assert!(db.insert("products", "p1", json!({"id": "p1"})));
        assert!(!db.insert("products", "p1", json!({"id": "p1"})));
        assert_eq!(db.count("products"), 1);
    }

    #[test]
    fn failed_modify_leaves_document_untouched() {
        let db = DocumentDb::new();
        db.insert("products", "p1", json!({"stock": 3}));
        let result = db.modify("products", "p1", |doc| {
            doc["stock"] = json!(0);
            Err::<(), _>(StoreError::validation("boom"))
        });
        assert!(result.is_err());
        assert_eq!(db.get("products", "p1").unwrap()["stock"], json!(3));
    }

    #[test]
    fn modify_missing_document_is_none() {
        let db = DocumentDb::new();
        let outcome = db.modify("products", "nope", |_| Ok(()));
        assert!(matches!(outcome, Ok(None)));
    }
}
