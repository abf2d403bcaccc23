//! Scoped fixture API over one target collection.
//!
//! A [`FixtureSet`] composes the registry, the mutation counter and a
//! target-collection collaborator into the operation surface callers use:
//! insert, update, remove, flush, count and get. Each mutating operation
//! runs lookup, collection mutation and registry bookkeeping as one step
//! under the facade's write lock, with the collection mutated before any
//! bookkeeping so failures leave registry and counters untouched.

use crate::collection::TargetCollection;
use crate::counter::MutationCounter;
use crate::error::{FixtureError, Result};
use crate::registry::FixtureRegistry;
use crate::types::{ContentHash, DocId, Identity, IdentityStrategy};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Override for the create operation.
pub type CreateFn = Box<dyn Fn(&Value) -> Result<Option<DocId>> + Send + Sync>;

/// Override for the update operation.
pub type UpdateFn = Box<dyn Fn(&DocId, &Value) -> Result<u64> + Send + Sync>;

/// Override for the remove operation.
pub type RemoveFn = Box<dyn Fn(&[DocId]) -> Result<u64> + Send + Sync>;

/// How a caller names an existing fixture: by explicit key on an
/// explicit-key facade, by payload (hashed) on a content-hash facade.
#[derive(Clone, Copy, Debug)]
pub enum FixtureRef<'a> {
    Key(&'a str),
    Payload(&'a Value),
}

impl<'a> From<&'a str> for FixtureRef<'a> {
    fn from(key: &'a str) -> Self {
        FixtureRef::Key(key)
    }
}

impl<'a> From<&'a Value> for FixtureRef<'a> {
    fn from(payload: &'a Value) -> Self {
        FixtureRef::Payload(payload)
    }
}

/// Builder for [`FixtureSet`].
///
/// The collection name, collaborator, registry and counter are required;
/// identity strategy, duplicate policy and per-operation overrides are
/// optional.
pub struct FixtureSetBuilder {
    name: String,
    collection: Arc<dyn TargetCollection>,
    registry: Arc<FixtureRegistry>,
    counter: Arc<MutationCounter>,
    strategy: IdentityStrategy,
    allow_duplicates: bool,
    create_fn: Option<CreateFn>,
    update_fn: Option<UpdateFn>,
    remove_fn: Option<RemoveFn>,
}

impl FixtureSetBuilder {
    pub fn new(
        name: impl Into<String>,
        collection: Arc<dyn TargetCollection>,
        registry: Arc<FixtureRegistry>,
        counter: Arc<MutationCounter>,
    ) -> Self {
        Self {
            name: name.into(),
            collection,
            registry,
            counter,
            strategy: IdentityStrategy::default(),
            allow_duplicates: false,
            create_fn: None,
            update_fn: None,
            remove_fn: None,
        }
    }

    /// Set the identity strategy (default: explicit key).
    pub fn identity(mut self, strategy: IdentityStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Allow multiple records sharing one content hash. Only meaningful in
    /// content-hash mode; ignored for explicit keys, which stay unique.
    pub fn allow_duplicates(mut self, allow: bool) -> Self {
        self.allow_duplicates = allow;
        self
    }

    /// Call `f` instead of the collection's `create`.
    pub fn create_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Option<DocId>> + Send + Sync + 'static,
    {
        self.create_fn = Some(Box::new(f));
        self
    }

    /// Call `f` instead of the collection's `update_by_id`.
    pub fn update_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&DocId, &Value) -> Result<u64> + Send + Sync + 'static,
    {
        self.update_fn = Some(Box::new(f));
        self
    }

    /// Call `f` instead of the collection's `remove_by_ids`. Also used by
    /// `flush`.
    pub fn remove_with<F>(mut self, f: F) -> Self
    where
        F: Fn(&[DocId]) -> Result<u64> + Send + Sync + 'static,
    {
        self.remove_fn = Some(Box::new(f));
        self
    }

    pub fn build(self) -> FixtureSet {
        FixtureSet {
            name: self.name,
            collection: self.collection,
            registry: self.registry,
            counter: self.counter,
            strategy: self.strategy,
            allow_duplicates: self.allow_duplicates,
            create_fn: self.create_fn,
            update_fn: self.update_fn,
            remove_fn: self.remove_fn,
            write_lock: Mutex::new(()),
        }
    }
}

/// Idempotent fixture operations scoped to one collection name.
///
/// Operations on one instance are serialized by an internal write lock.
/// Distinct instances over the same collection name require external
/// serialization.
pub struct FixtureSet {
    name: String,
    collection: Arc<dyn TargetCollection>,
    registry: Arc<FixtureRegistry>,
    counter: Arc<MutationCounter>,
    strategy: IdentityStrategy,
    allow_duplicates: bool,
    create_fn: Option<CreateFn>,
    update_fn: Option<UpdateFn>,
    remove_fn: Option<RemoveFn>,

    /// Serializes lookup-then-mutate-then-register sequences so two
    /// concurrent inserts cannot both observe an absent identity.
    write_lock: Mutex<()>,
}

impl FixtureSet {
    /// Start building a fixture set.
    pub fn builder(
        name: impl Into<String>,
        collection: Arc<dyn TargetCollection>,
        registry: Arc<FixtureRegistry>,
        counter: Arc<MutationCounter>,
    ) -> FixtureSetBuilder {
        FixtureSetBuilder::new(name, collection, registry, counter)
    }

    /// Collection name this set manages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert a fixture on a content-hash facade.
    ///
    /// Returns `Ok(None)` without touching the collection when a record with
    /// the payload's hash is already live (unless duplicates are allowed),
    /// or when create declines to produce an id.
    pub fn insert(&self, payload: &Value) -> Result<Option<DocId>> {
        self.require_strategy(IdentityStrategy::ContentHash, "payload")?;
        let identity = Identity::Hash(ContentHash::of(payload)?);
        self.insert_inner(identity, payload)
    }

    /// Insert a fixture under an explicit key on an explicit-key facade.
    ///
    /// Returns `Ok(None)` without touching the collection when the key is
    /// already live, or when create declines to produce an id.
    pub fn insert_keyed(&self, key: &str, payload: &Value) -> Result<Option<DocId>> {
        self.require_strategy(IdentityStrategy::ExplicitKey, "key")?;
        self.insert_inner(Identity::Key(key.to_string()), payload)
    }

    fn insert_inner(&self, identity: Identity, payload: &Value) -> Result<Option<DocId>> {
        let _guard = self.write_lock.lock();

        let duplicates_allowed =
            self.allow_duplicates && self.strategy == IdentityStrategy::ContentHash;
        if !duplicates_allowed && self.registry.find(&self.name, &identity).is_some() {
            debug!(collection = %self.name, %identity, "fixture already live, skipping insert");
            return Ok(None);
        }

        let created = match &self.create_fn {
            Some(create) => create(payload)?,
            None => self.collection.create(payload)?,
        };

        let Some(doc_id) = created else {
            debug!(collection = %self.name, %identity, "create produced no id, skipping insert");
            return Ok(None);
        };

        self.registry
            .register(&self.name, identity, doc_id.clone())?;
        self.counter.record_added(&self.name, 1);

        Ok(Some(doc_id))
    }

    /// Patch the document(s) of a live fixture. Returns the affected count;
    /// 0 when no live record matches.
    pub fn update(&self, fixture: FixtureRef<'_>, patch: &Value) -> Result<u64> {
        let identity = self.resolve(fixture)?;
        let _guard = self.write_lock.lock();

        let records = self.registry.find_by_identity(&self.name, &identity);
        if records.is_empty() {
            return Ok(0);
        }

        let mut affected = 0;
        for record in &records {
            affected += match &self.update_fn {
                Some(update) => update(&record.target_doc_id, patch)?,
                None => self.collection.update_by_id(&record.target_doc_id, patch)?,
            };
        }

        self.counter.record_changed(&self.name, affected);
        Ok(affected)
    }

    /// Remove the document(s) of a live fixture and drop their registry
    /// records. Returns the removed count; 0 when no live record matches.
    pub fn remove(&self, fixture: FixtureRef<'_>) -> Result<u64> {
        let identity = self.resolve(fixture)?;
        let _guard = self.write_lock.lock();

        let records = self.registry.find_by_identity(&self.name, &identity);
        if records.is_empty() {
            return Ok(0);
        }

        let ids: Vec<DocId> = records.into_iter().map(|r| r.target_doc_id).collect();
        self.remove_documents(&ids)
    }

    /// Remove every live fixture for this collection name.
    ///
    /// Returns 0 immediately, without any collection call, when there are
    /// none. An empty id set must never reach the collection: it could be
    /// misread as "no restriction".
    pub fn flush(&self) -> Result<u64> {
        let _guard = self.write_lock.lock();

        let records = self.registry.find_all(&self.name);
        if records.is_empty() {
            return Ok(0);
        }

        let ids: Vec<DocId> = records.into_iter().map(|r| r.target_doc_id).collect();
        self.remove_documents(&ids)
    }

    /// Target documents first, registry second: entries are dropped only
    /// for documents confirmed removed, so a failed removal can leave a
    /// dedup entry but never an orphaned document.
    fn remove_documents(&self, ids: &[DocId]) -> Result<u64> {
        let removed = match &self.remove_fn {
            Some(remove) => remove(ids)?,
            None => self.collection.remove_by_ids(ids)?,
        };

        if removed as usize == ids.len() {
            self.registry.unregister_docs(&self.name, ids)?;
        } else {
            // Partial removal: keep entries for documents that survived.
            let mut confirmed = Vec::with_capacity(removed as usize);
            for id in ids {
                if self.collection.find_one_by_id(id)?.is_none() {
                    confirmed.push(id.clone());
                }
            }
            self.registry.unregister_docs(&self.name, &confirmed)?;
        }

        self.counter.record_removed(&self.name, removed);
        Ok(removed)
    }

    /// Number of live fixture records for this collection name.
    pub fn count(&self) -> usize {
        self.registry.count(&self.name)
    }

    /// Fetch the target document of a live fixture.
    pub fn get(&self, fixture: FixtureRef<'_>) -> Result<Option<Value>> {
        let identity = self.resolve(fixture)?;
        match self.registry.find(&self.name, &identity) {
            Some(record) => self.collection.find_one_by_id(&record.target_doc_id),
            None => Ok(None),
        }
    }

    /// Fetch every target document tracked by this set.
    pub fn get_all(&self) -> Result<Vec<Value>> {
        let ids = self.target_ids();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.collection.find_by_ids(&ids)
    }

    /// Target document ids of every live fixture for this collection name.
    pub fn target_ids(&self) -> Vec<DocId> {
        self.registry
            .find_all(&self.name)
            .into_iter()
            .map(|r| r.target_doc_id)
            .collect()
    }

    fn resolve(&self, fixture: FixtureRef<'_>) -> Result<Identity> {
        match (self.strategy, fixture) {
            (IdentityStrategy::ExplicitKey, FixtureRef::Key(key)) => {
                Ok(Identity::Key(key.to_string()))
            }
            (IdentityStrategy::ContentHash, FixtureRef::Payload(payload)) => {
                Ok(Identity::Hash(ContentHash::of(payload)?))
            }
            (strategy, FixtureRef::Key(_)) => Err(FixtureError::StrategyMismatch {
                expected: strategy.to_string(),
                got: "key".to_string(),
            }),
            (strategy, FixtureRef::Payload(_)) => Err(FixtureError::StrategyMismatch {
                expected: strategy.to_string(),
                got: "payload".to_string(),
            }),
        }
    }

    fn require_strategy(&self, expected: IdentityStrategy, got: &str) -> Result<()> {
        if self.strategy == expected {
            Ok(())
        } else {
            Err(FixtureError::StrategyMismatch {
                expected: self.strategy.to_string(),
                got: got.to_string(),
            })
        }
    }
}
