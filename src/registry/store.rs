//! File-backed registry of fixture records.

use crate::error::{FixtureError, Result};
use crate::types::{DocId, FixtureRecord, Identity, RecordId};
use fs2::FileExt;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Magic bytes for the registry file.
const REGISTRY_MAGIC: &[u8; 4] = b"FXR\0";

/// Current registry format version.
const REGISTRY_VERSION: u8 = 1;

/// Sanity limit on the encoded record list (the registry holds fixture
/// bookkeeping, not data; anything larger is corruption).
const MAX_BODY_SIZE: usize = 64 * 1024 * 1024;

/// Persistent registry of fixture records, keyed by owning collection name.
///
/// Shared process-wide state: open one registry per backing file and hand
/// `Arc` clones to every facade. The backing file is exclusive-locked for the
/// registry's lifetime, so a second process opening the same path fails with
/// [`FixtureError::Locked`].
pub struct FixtureRegistry {
    /// Path to the registry file.
    path: PathBuf,

    /// Lock file held for exclusive access.
    _lock_file: File,

    /// Live records by owning collection name.
    records: RwLock<HashMap<String, Vec<FixtureRecord>>>,

    /// Counter for assigning record IDs.
    next_id: AtomicU64,
}

impl FixtureRegistry {
    /// Open the registry at `path`, loading existing records if the file
    /// exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let lock_file = Self::acquire_lock(&path)?;

        let registry = Self {
            path: path.clone(),
            _lock_file: lock_file,
            records: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        };

        if path.exists() {
            registry.load_from_file()?;
        }

        Ok(registry)
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_path = path.with_extension("lock");
        let lock_file = File::create(lock_path)?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| FixtureError::Locked)?;

        Ok(lock_file)
    }

    /// Register a fixture record.
    ///
    /// Must only be called after the target document is confirmed created;
    /// the registry never holds speculative state. Persisted before
    /// returning.
    pub fn register(
        &self,
        owner: &str,
        identity: Identity,
        target_doc_id: DocId,
    ) -> Result<RecordId> {
        let id = RecordId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let record = FixtureRecord {
            id,
            owner: owner.to_string(),
            identity,
            target_doc_id,
        };

        debug!(owner, record = %id, doc = %record.target_doc_id, "registering fixture");

        self.records
            .write()
            .entry(owner.to_string())
            .or_default()
            .push(record);

        self.save()?;
        Ok(id)
    }

    /// Exact lookup. Returns the first live record for the identity; with
    /// duplicates allowed there may be more, see [`find_by_identity`].
    ///
    /// [`find_by_identity`]: FixtureRegistry::find_by_identity
    pub fn find(&self, owner: &str, identity: &Identity) -> Option<FixtureRecord> {
        self.records
            .read()
            .get(owner)
            .and_then(|records| records.iter().find(|r| &r.identity == identity))
            .cloned()
    }

    /// All live records matching an identity.
    pub fn find_by_identity(&self, owner: &str, identity: &Identity) -> Vec<FixtureRecord> {
        self.records
            .read()
            .get(owner)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| &r.identity == identity)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All live records for a collection name.
    pub fn find_all(&self, owner: &str) -> Vec<FixtureRecord> {
        self.records
            .read()
            .get(owner)
            .cloned()
            .unwrap_or_default()
    }

    /// Remove records matching an identity. Returns the removed count
    /// (0 or 1 unless duplicates were allowed).
    pub fn unregister(&self, owner: &str, identity: &Identity) -> Result<u64> {
        let removed = self.retain(owner, |r| &r.identity != identity);
        if removed > 0 {
            debug!(owner, %identity, removed, "unregistered fixtures");
            self.save()?;
        }
        Ok(removed)
    }

    /// Remove records whose target document id is in `doc_ids`.
    ///
    /// Used after destructive collection calls to drop exactly the records
    /// whose documents were confirmed removed.
    pub fn unregister_docs(&self, owner: &str, doc_ids: &[DocId]) -> Result<u64> {
        if doc_ids.is_empty() {
            return Ok(0);
        }

        let doc_ids: HashSet<&DocId> = doc_ids.iter().collect();
        let removed = self.retain(owner, |r| !doc_ids.contains(&r.target_doc_id));
        if removed > 0 {
            debug!(owner, removed, "unregistered fixtures by doc id");
            self.save()?;
        }
        Ok(removed)
    }

    /// Remove every record for a collection name. Returns the removed count.
    pub fn unregister_all(&self, owner: &str) -> Result<u64> {
        let removed = self
            .records
            .write()
            .remove(owner)
            .map(|records| records.len() as u64)
            .unwrap_or(0);

        if removed > 0 {
            debug!(owner, removed, "cleared fixture records");
            self.save()?;
        }
        Ok(removed)
    }

    /// Number of live records for a collection name.
    pub fn count(&self, owner: &str) -> usize {
        self.records
            .read()
            .get(owner)
            .map(|records| records.len())
            .unwrap_or(0)
    }

    /// Keep records matching the predicate; return how many were dropped.
    fn retain<F>(&self, owner: &str, keep: F) -> u64
    where
        F: Fn(&FixtureRecord) -> bool,
    {
        let mut records = self.records.write();
        let Some(list) = records.get_mut(owner) else {
            return 0;
        };

        let before = list.len();
        list.retain(|r| keep(r));
        let removed = (before - list.len()) as u64;

        if list.is_empty() {
            records.remove(owner);
        }

        removed
    }

    /// Save the registry to its file.
    pub fn save(&self) -> Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;

        // Write magic
        file.write_all(REGISTRY_MAGIC)?;

        // Write version
        file.write_all(&[REGISTRY_VERSION])?;

        // Write next record id
        file.write_all(&self.next_id.load(Ordering::SeqCst).to_le_bytes())?;

        // Serialize records with MessagePack
        let encoded = {
            let records = self.records.read();
            let all: Vec<&FixtureRecord> = records.values().flatten().collect();
            rmp_serde::to_vec(&all)?
        };

        file.write_all(&(encoded.len() as u64).to_le_bytes())?;
        file.write_all(&encoded)?;

        // Write checksum over the encoded body
        let checksum = crc32fast::hash(&encoded);
        file.write_all(&checksum.to_le_bytes())?;

        file.sync_all()?;
        Ok(())
    }

    /// Load the registry from its file.
    fn load_from_file(&self) -> Result<()> {
        let mut file = File::open(&self.path)?;

        // Read magic
        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != REGISTRY_MAGIC {
            return Err(FixtureError::InvalidFormat("Invalid registry magic".into()));
        }

        // Read version
        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != REGISTRY_VERSION {
            return Err(FixtureError::InvalidFormat(format!(
                "Unsupported registry version: {}",
                version[0]
            )));
        }

        // Read next record id
        let mut next_id_bytes = [0u8; 8];
        file.read_exact(&mut next_id_bytes)?;
        self.next_id
            .store(u64::from_le_bytes(next_id_bytes), Ordering::SeqCst);

        // Read records
        let mut len_bytes = [0u8; 8];
        file.read_exact(&mut len_bytes)?;
        let len = u64::from_le_bytes(len_bytes) as usize;

        if len > MAX_BODY_SIZE {
            return Err(FixtureError::InvalidFormat(
                "Registry record list too large".into(),
            ));
        }

        let mut encoded = vec![0u8; len];
        file.read_exact(&mut encoded)?;

        let mut checksum_bytes = [0u8; 4];
        file.read_exact(&mut checksum_bytes)?;
        let stored = u32::from_le_bytes(checksum_bytes);

        let computed = crc32fast::hash(&encoded);
        if stored != computed {
            return Err(FixtureError::ChecksumMismatch {
                expected: stored,
                got: computed,
            });
        }

        let all: Vec<FixtureRecord> = rmp_serde::from_slice(&encoded)?;

        let mut records = self.records.write();
        for record in all {
            records.entry(record.owner.clone()).or_default().push(record);
        }

        Ok(())
    }
}
