//! In-memory store backend.
//!
//! Records live in ordered maps behind an async-aware read-write lock, so
//! cursor order is insertion order and the backend can be shared across
//! async tasks. Sessions stage a full snapshot of the store and swap it in
//! on commit, which gives pipeline transactions all-or-nothing visibility.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bson::{Bson, Uuid};
use indexmap::IndexMap;
use mea::rwlock::RwLock;

use docmodel_core::client::{
    Ack, RawCollection, RawRecord, StoreClient, StoreDatabase, StoreSession,
};
use docmodel_core::criteria::Criteria;
use docmodel_core::error::{DocModelError, DocModelResult};

type CollectionMap = IndexMap<String, RawRecord>;
type StoreMap = HashMap<String, CollectionMap>;

/// Thread-safe in-memory document store.
///
/// Cloning shares the underlying data. Queries scan the whole collection;
/// there is no indexing. Intended for tests and small datasets.
///
/// # Example
///
/// ```ignore
/// use docmodel_memory::MemoryStore;
/// use docmodel_core::client::StoreClient;
///
/// let store = MemoryStore::new();
/// let database = store.database("app")?;
/// ```
#[derive(Default, Clone, Debug)]
pub struct MemoryStore {
    store: Arc<RwLock<StoreMap>>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    fn database(&self, name: &str) -> DocModelResult<Arc<dyn StoreDatabase>> {
        if name.is_empty() {
            return Err(DocModelError::DatabaseMissing);
        }
        Ok(Arc::new(MemoryDatabase {
            name: name.to_string(),
            store: Arc::clone(&self.store),
        }))
    }

    async fn start_session(
        &self,
        _causal_consistency: bool,
    ) -> DocModelResult<Box<dyn StoreSession>> {
        Ok(Box::new(MemorySession {
            store: Arc::clone(&self.store),
            staged: None,
            ended: false,
        }))
    }
}

/// A named database over the shared store map.
///
/// The in-memory backend keeps all collections in one flat namespace; the
/// database name exists only to satisfy the connection surface.
#[derive(Debug)]
struct MemoryDatabase {
    name: String,
    store: Arc<RwLock<StoreMap>>,
}

#[async_trait]
impl StoreDatabase for MemoryDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    async fn collection(
        &self,
        name: &str,
        create_if_missing: bool,
    ) -> DocModelResult<Arc<dyn RawCollection>> {
        if create_if_missing {
            let mut store = self.store.write().await;
            if store.contains_key(name) {
                return Err(DocModelError::CollectionExists(name.to_string()));
            }
            store.insert(name.to_string(), CollectionMap::new());
        }
        Ok(Arc::new(MemoryCollection {
            name: name.to_string(),
            store: Arc::clone(&self.store),
        }))
    }
}

#[derive(Debug)]
struct MemoryCollection {
    name: String,
    store: Arc<RwLock<StoreMap>>,
}

/// Whether a record satisfies every criteria pair.
fn matches(record: &RawRecord, criteria: &Criteria) -> bool {
    criteria
        .pairs()
        .iter()
        .all(|(field, value)| record.get(field) == Some(value))
}

fn identity_key(identity: Uuid) -> String {
    identity.to_string()
}

#[async_trait]
impl RawCollection for MemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find(
        &self,
        criteria: &Criteria,
        limit: Option<usize>,
    ) -> DocModelResult<Vec<RawRecord>> {
        let store = self.store.read().await;
        let records = match store.get(&self.name) {
            Some(records) => records,
            None => return Ok(Vec::new()),
        };

        Ok(records
            .values()
            .filter(|record| matches(record, criteria))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn find_one(&self, criteria: &Criteria) -> DocModelResult<Option<RawRecord>> {
        Ok(self.find(criteria, Some(1)).await?.into_iter().next())
    }

    async fn insert_one(&self, mut record: RawRecord) -> DocModelResult<Ack> {
        let identity = match record.get("_id") {
            Some(Bson::Binary(binary)) => binary
                .to_uuid()
                .map_err(|err| DocModelError::Backend(err.to_string()))?,
            Some(other) => {
                return Err(DocModelError::Backend(format!(
                    "_id must be a UUID, got {other}"
                )));
            }
            None => {
                let identity = Uuid::new();
                record.insert("_id", identity);
                identity
            }
        };

        let key = identity_key(identity);
        let mut store = self.store.write().await;
        let records = store.entry(self.name.clone()).or_default();
        if records.contains_key(&key) {
            return Err(DocModelError::Backend(format!(
                "duplicate _id {key} in collection {}",
                self.name
            )));
        }
        records.insert(key, record);

        Ok(Ack::acknowledged())
    }

    async fn update_one(&self, identity: Uuid, set: RawRecord) -> DocModelResult<Ack> {
        let key = identity_key(identity);
        let mut store = self.store.write().await;
        let record = store
            .get_mut(&self.name)
            .and_then(|records| records.get_mut(&key))
            .ok_or_else(|| DocModelError::DocumentNotFound(key.clone(), self.name.clone()))?;

        for (field, value) in set {
            record.insert(field, value);
        }

        Ok(Ack::with_counts(1, 1))
    }

    async fn delete_one(&self, identity: Uuid) -> DocModelResult<Ack> {
        let key = identity_key(identity);
        let mut store = self.store.write().await;
        store
            .get_mut(&self.name)
            .and_then(|records| records.shift_remove(&key))
            .ok_or_else(|| DocModelError::DocumentNotFound(key, self.name.clone()))?;

        Ok(Ack::with_counts(1, 1))
    }
}

/// A session staging writes against a snapshot of the whole store.
///
/// `start_transaction` clones the current store; transactional writes apply
/// to the clone; commit swaps the clone in wholesale and abort discards it.
/// Writes outside a transaction are rejected.
///
/// Because commit replaces the whole store with the snapshot, any direct
/// (non-session) write made between `start_transaction` and commit is
/// discarded. That trade keeps transactions all-or-nothing without
/// per-record locking; serialize direct writes around open transactions
/// when it matters.
struct MemorySession {
    store: Arc<RwLock<StoreMap>>,
    staged: Option<StoreMap>,
    ended: bool,
}

impl MemorySession {
    fn staged_mut(&mut self) -> DocModelResult<&mut StoreMap> {
        self.staged
            .as_mut()
            .ok_or_else(|| DocModelError::Session("no transaction in progress".to_string()))
    }

    fn staged_collection(
        &mut self,
        collection: &str,
    ) -> DocModelResult<&mut CollectionMap> {
        Ok(self.staged_mut()?.entry(collection.to_string()).or_default())
    }
}

#[async_trait]
impl StoreSession for MemorySession {
    async fn start_transaction(&mut self) -> DocModelResult<()> {
        if self.ended {
            return Err(DocModelError::Session("session already ended".to_string()));
        }
        if self.staged.is_some() {
            return Err(DocModelError::Session(
                "transaction already in progress".to_string(),
            ));
        }
        self.staged = Some(self.store.read().await.clone());
        Ok(())
    }

    async fn insert_one(&mut self, collection: &str, mut record: RawRecord) -> DocModelResult<()> {
        let identity = match record.get("_id") {
            Some(Bson::Binary(binary)) => binary
                .to_uuid()
                .map_err(|err| DocModelError::Backend(err.to_string()))?,
            _ => {
                let identity = Uuid::new();
                record.insert("_id", identity);
                identity
            }
        };

        let records = self.staged_collection(collection)?;
        let key = identity_key(identity);
        if records.contains_key(&key) {
            return Err(DocModelError::Backend(format!(
                "duplicate _id {key} in collection {collection}"
            )));
        }
        records.insert(key, record);
        Ok(())
    }

    async fn update_one(
        &mut self,
        collection: &str,
        identity: Uuid,
        set: RawRecord,
    ) -> DocModelResult<()> {
        let records = self.staged_collection(collection)?;
        let key = identity_key(identity);
        let record = records
            .get_mut(&key)
            .ok_or_else(|| DocModelError::DocumentNotFound(key.clone(), collection.to_string()))?;

        for (field, value) in set {
            record.insert(field, value);
        }
        Ok(())
    }

    async fn delete_one(&mut self, collection: &str, identity: Uuid) -> DocModelResult<()> {
        let records = self.staged_collection(collection)?;
        let key = identity_key(identity);
        records
            .shift_remove(&key)
            .ok_or_else(|| DocModelError::DocumentNotFound(key, collection.to_string()))?;
        Ok(())
    }

    async fn commit_transaction(&mut self) -> DocModelResult<()> {
        let staged = self
            .staged
            .take()
            .ok_or_else(|| DocModelError::Session("no transaction to commit".to_string()))?;
        *self.store.write().await = staged;
        Ok(())
    }

    async fn abort_transaction(&mut self) -> DocModelResult<()> {
        self.staged = None;
        Ok(())
    }

    async fn end_session(&mut self) -> DocModelResult<()> {
        self.staged = None;
        self.ended = true;
        Ok(())
    }
}
