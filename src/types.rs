//! Core types for the fixture store.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Identifier of a document in the target collection.
///
/// Assigned by the collection (or a create override), opaque to this crate.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocId(pub String);

impl fmt::Debug for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocId({})", self.0)
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DocId {
    fn from(s: &str) -> Self {
        DocId(s.to_string())
    }
}

impl From<String> for DocId {
    fn from(s: String) -> Self {
        DocId(s)
    }
}

/// Registry-assigned identifier of a fixture record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content digest of a fixture payload (SHA-256 over canonical JSON).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Compute the digest of a payload.
    ///
    /// The payload is serialized to a JSON value first, which orders map keys,
    /// so logically equal payloads hash equal regardless of key insertion
    /// order at any nesting level. Array order is significant.
    pub fn of<T: Serialize>(payload: &T) -> Result<Self> {
        let value = serde_json::to_value(payload)?;
        let canonical = serde_json::to_vec(&value)?;
        Ok(Self::from_bytes(&canonical))
    }

    /// Compute the digest of raw bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        ContentHash(hasher.finalize().into())
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> std::result::Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(ContentHash(arr))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({}...)", &self.to_hex()[..8])
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Logical identity of a fixture within its owning collection.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Identity {
    /// Explicit caller-supplied key.
    Key(String),

    /// Content digest of the payload.
    Hash(ContentHash),
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Key(k) => write!(f, "Key({})", k),
            Identity::Hash(h) => write!(f, "Hash({}...)", &h.to_hex()[..8]),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Key(k) => write!(f, "{}", k),
            Identity::Hash(h) => write!(f, "{}", h),
        }
    }
}

/// How a facade derives fixture identities.
///
/// Fixed at facade construction; never inferred from argument shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentityStrategy {
    /// Callers supply a logical key per fixture.
    ExplicitKey,

    /// Identity is the content hash of the payload.
    ContentHash,
}

impl Default for IdentityStrategy {
    fn default() -> Self {
        IdentityStrategy::ExplicitKey
    }
}

impl fmt::Display for IdentityStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityStrategy::ExplicitKey => write!(f, "explicit-key"),
            IdentityStrategy::ContentHash => write!(f, "content-hash"),
        }
    }
}

/// One fixture the store created and is responsible for tracking.
///
/// Exists iff the corresponding target document was confirmed created and not
/// yet removed through this API. `identity` and `target_doc_id` are immutable
/// once registered.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FixtureRecord {
    /// Registry-assigned identifier.
    pub id: RecordId,

    /// Name of the target collection this record belongs to.
    pub owner: String,

    /// Logical identity within the owning collection.
    pub identity: Identity,

    /// Identifier of the document this fixture produced.
    pub target_doc_id: DocId,
}

/// Aggregated mutation counts for one collection name, emitted once per
/// debounce cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationReport {
    /// Collection name the counts belong to.
    pub collection: String,

    pub added: u64,
    pub changed: u64,
    pub removed: u64,
}

impl fmt::Display for MutationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fixtures [{}] added {} changed {} removed {}",
            self.collection, self.added, self.changed, self.removed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hash_roundtrip() {
        let hash = ContentHash::from_bytes(b"hello world");
        let hex = hash.to_hex();
        let parsed = ContentHash::from_hex(&hex).unwrap();
        assert_eq!(hash, parsed);
    }

    #[test]
    fn test_hash_key_order_independent() {
        let a = json!({"name": "admin", "role": "root", "active": true});
        let b = json!({"role": "root", "active": true, "name": "admin"});
        assert_eq!(ContentHash::of(&a).unwrap(), ContentHash::of(&b).unwrap());
    }

    #[test]
    fn test_hash_nested_key_order_independent() {
        let a = json!({"user": {"name": "a", "age": 1}, "tags": ["x", "y"]});
        let b = json!({"tags": ["x", "y"], "user": {"age": 1, "name": "a"}});
        assert_eq!(ContentHash::of(&a).unwrap(), ContentHash::of(&b).unwrap());
    }

    #[test]
    fn test_hash_array_order_significant() {
        let a = json!({"tags": ["x", "y"]});
        let b = json!({"tags": ["y", "x"]});
        assert_ne!(ContentHash::of(&a).unwrap(), ContentHash::of(&b).unwrap());
    }

    #[test]
    fn test_hash_distinct_payloads() {
        let a = json!({"name": "admin"});
        let b = json!({"name": "guest"});
        assert_ne!(ContentHash::of(&a).unwrap(), ContentHash::of(&b).unwrap());
    }

    #[test]
    fn test_identity_display() {
        let key = Identity::Key("admin".to_string());
        assert_eq!(key.to_string(), "admin");

        let hash = Identity::Hash(ContentHash::from_bytes(b"data"));
        assert_eq!(hash.to_string().len(), 64);
    }

    #[test]
    fn test_report_display() {
        let report = MutationReport {
            collection: "users".to_string(),
            added: 3,
            changed: 1,
            removed: 2,
        };
        let text = report.to_string();
        assert!(text.contains("users"));
        assert!(text.contains("added 3"));
        assert!(text.contains("changed 1"));
        assert!(text.contains("removed 2"));
    }
}
