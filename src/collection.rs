//! Target-collection collaborator contract.
//!
//! The target collection is the externally-owned store the fixtures
//! populate. The facade only ever addresses it by document id sets, so the
//! contract is a fixed set of id-based operations rather than a general
//! query surface.

use crate::error::Result;
use crate::types::DocId;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Contract the facade requires from a backing collection.
///
/// Implementations must treat an empty id set as "nothing", never as "no
/// restriction": `remove_by_ids(&[])` removes nothing and returns 0.
pub trait TargetCollection: Send + Sync {
    /// Create a document, returning its id, or `None` if the backing store
    /// declined the write.
    fn create(&self, payload: &Value) -> Result<Option<DocId>>;

    /// Patch a document by id. Returns the affected count (0 or 1).
    fn update_by_id(&self, id: &DocId, patch: &Value) -> Result<u64>;

    /// Remove the documents with the given ids. Returns the removed count.
    fn remove_by_ids(&self, ids: &[DocId]) -> Result<u64>;

    /// Fetch the documents with the given ids, skipping missing ones.
    fn find_by_ids(&self, ids: &[DocId]) -> Result<Vec<Value>>;

    /// Fetch a single document by id.
    fn find_one_by_id(&self, id: &DocId) -> Result<Option<Value>>;
}

/// In-memory [`TargetCollection`] backed by a hash map.
///
/// Reference implementation for tests and embedders without a real backing
/// store. Updates merge object patches into object documents key by key
/// (set semantics); non-object patches replace the document.
pub struct MemoryCollection {
    docs: RwLock<HashMap<DocId, Value>>,
    next_id: AtomicU64,
}

impl Default for MemoryCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of documents currently stored.
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }
}

impl TargetCollection for MemoryCollection {
    fn create(&self, payload: &Value) -> Result<Option<DocId>> {
        let id = DocId(self.next_id.fetch_add(1, Ordering::SeqCst).to_string());
        self.docs.write().insert(id.clone(), payload.clone());
        Ok(Some(id))
    }

    fn update_by_id(&self, id: &DocId, patch: &Value) -> Result<u64> {
        let mut docs = self.docs.write();
        let Some(doc) = docs.get_mut(id) else {
            return Ok(0);
        };

        match (doc.as_object_mut(), patch.as_object()) {
            (Some(fields), Some(patch_fields)) => {
                for (key, value) in patch_fields {
                    fields.insert(key.clone(), value.clone());
                }
            }
            _ => *doc = patch.clone(),
        }

        Ok(1)
    }

    fn remove_by_ids(&self, ids: &[DocId]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut docs = self.docs.write();
        let mut removed = 0;
        for id in ids {
            if docs.remove(id).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn find_by_ids(&self, ids: &[DocId]) -> Result<Vec<Value>> {
        let docs = self.docs.read();
        Ok(ids.iter().filter_map(|id| docs.get(id).cloned()).collect())
    }

    fn find_one_by_id(&self, id: &DocId) -> Result<Option<Value>> {
        Ok(self.docs.read().get(id).cloned())
    }
}
