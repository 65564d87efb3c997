//! Store collaborator interface.
//!
//! These traits abstract the document store the model layer sits on: a
//! connection handle, a database handle, per-collection read/write
//! primitives, and a transactional session. The core consumes them through
//! trait objects so backends can be selected at runtime; the in-memory and
//! MongoDB backends are separate crates.
//!
//! Every method is a blocking round trip to the store from the caller's
//! point of view; cancellation and timeouts are the backend's concern.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use bson::Uuid;

use crate::criteria::Criteria;
use crate::error::DocModelResult;

/// A raw store record in the store's native document representation.
pub type RawRecord = bson::Document;

/// A write acknowledgment from the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ack {
    /// Whether the store acknowledged the write.
    pub acknowledged: bool,
    /// Documents matched by the write's filter (updates and deletes).
    pub matched: u64,
    /// Documents actually modified.
    pub modified: u64,
}

impl Ack {
    pub fn acknowledged() -> Self {
        Self { acknowledged: true, matched: 0, modified: 0 }
    }

    pub fn with_counts(matched: u64, modified: u64) -> Self {
        Self { acknowledged: true, matched, modified }
    }
}

/// An open connection to a document store.
#[async_trait]
pub trait StoreClient: Send + Sync + Debug {
    /// Resolves a database handle.
    ///
    /// # Errors
    ///
    /// Fails with [`DatabaseMissing`](crate::error::DocModelError::DatabaseMissing)
    /// when `name` is empty.
    fn database(&self, name: &str) -> DocModelResult<Arc<dyn StoreDatabase>>;

    /// Starts a store session for transactional work.
    ///
    /// Each call produces an independent session; sessions are never shared
    /// across concurrent pipeline invocations.
    async fn start_session(
        &self,
        causal_consistency: bool,
    ) -> DocModelResult<Box<dyn StoreSession>>;
}

/// A database within a store connection.
#[async_trait]
pub trait StoreDatabase: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// Resolves a raw collection handle.
    ///
    /// With `create_if_missing` set, the backend attempts creation and
    /// reports [`CollectionExists`](crate::error::DocModelError::CollectionExists)
    /// when the collection is already present, letting the caller fall back
    /// to a plain attach.
    async fn collection(
        &self,
        name: &str,
        create_if_missing: bool,
    ) -> DocModelResult<Arc<dyn RawCollection>>;
}

/// Read/write primitives over one store collection.
#[async_trait]
pub trait RawCollection: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// Finds records matching the equality criteria, in cursor order.
    ///
    /// The result is finite and forward-only; when `limit` is set the
    /// backend stops producing records at that count.
    async fn find(
        &self,
        criteria: &Criteria,
        limit: Option<usize>,
    ) -> DocModelResult<Vec<RawRecord>>;

    /// Finds the first record matching the criteria, if any.
    async fn find_one(&self, criteria: &Criteria) -> DocModelResult<Option<RawRecord>>;

    /// Writes the record as given. The caller does not inject an identity;
    /// the backend assigns one when the record carries none.
    async fn insert_one(&self, record: RawRecord) -> DocModelResult<Ack>;

    /// Applies a partial update to the record with the given identity. The
    /// backend wraps `set` in its native set-style envelope; whole-document
    /// replacement and array-element updates are not supported.
    async fn update_one(&self, identity: Uuid, set: RawRecord) -> DocModelResult<Ack>;

    /// Deletes the record with the given identity.
    async fn delete_one(&self, identity: Uuid) -> DocModelResult<Ack>;
}

/// A store session scoping one transaction.
///
/// The pipeline executor drives a session through exactly one transaction:
/// `start_transaction`, a sequence of writes, then either
/// `commit_transaction` or `abort_transaction`, and finally `end_session`.
/// Writes outside a transaction are a session error.
#[async_trait]
pub trait StoreSession: Send {
    async fn start_transaction(&mut self) -> DocModelResult<()>;

    async fn insert_one(&mut self, collection: &str, record: RawRecord) -> DocModelResult<()>;

    async fn update_one(
        &mut self,
        collection: &str,
        identity: Uuid,
        set: RawRecord,
    ) -> DocModelResult<()>;

    async fn delete_one(&mut self, collection: &str, identity: Uuid) -> DocModelResult<()>;

    async fn commit_transaction(&mut self) -> DocModelResult<()>;

    async fn abort_transaction(&mut self) -> DocModelResult<()>;

    /// Ends the session. Idempotent; a session is also ended by abort paths.
    async fn end_session(&mut self) -> DocModelResult<()>;
}
