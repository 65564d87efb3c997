//! MongoDB store backend.
//!
//! Implements the store collaborator traits on top of the official async
//! MongoDB driver. Reads translate criteria straight into driver filters;
//! writes use the driver's single-document operations; pipeline sessions map
//! onto driver client sessions and multi-document transactions.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bson::{Uuid, doc};
use futures::TryStreamExt;
use mongodb::error::ErrorKind;
use mongodb::options::{ClientOptions, FindOptions};
use mongodb::{Client, ClientSession, Collection as MongoCollection, Database};

use docmodel_core::client::{
    Ack, RawCollection, RawRecord, StoreClient, StoreDatabase, StoreSession,
};
use docmodel_core::config::ConnectionConfig;
use docmodel_core::criteria::Criteria;
use docmodel_core::error::{DocModelError, DocModelResult};

// Server error code for "collection already exists".
const NAMESPACE_EXISTS: i32 = 48;

fn backend_err(err: mongodb::error::Error) -> DocModelError {
    DocModelError::Backend(err.to_string())
}

/// A MongoDB-backed store client.
///
/// The configured database is what pipeline sessions write against; the
/// registry resolves its database handle by name through [`StoreClient`].
pub struct MongoStore {
    client: Client,
    database: String,
}

impl MongoStore {
    /// Connects using the configuration's URI and database name.
    ///
    /// # Errors
    ///
    /// Fails with [`DocModelError::UriMissing`] or
    /// [`DocModelError::DatabaseMissing`] when the configuration is
    /// incomplete, and with [`DocModelError::Backend`] when the driver
    /// rejects the options.
    pub async fn connect(config: &ConnectionConfig) -> DocModelResult<Self> {
        let options = ClientOptions::parse(config.uri()?)
            .await
            .map_err(backend_err)?;
        let client = Client::with_options(options).map_err(backend_err)?;
        Ok(Self::new(client, config.database_name()?))
    }

    /// Wraps an already-connected driver client.
    pub fn new(client: Client, database: impl Into<String>) -> Self {
        Self { client, database: database.into() }
    }
}

impl fmt::Debug for MongoStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoStore")
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StoreClient for MongoStore {
    fn database(&self, name: &str) -> DocModelResult<Arc<dyn StoreDatabase>> {
        if name.is_empty() {
            return Err(DocModelError::DatabaseMissing);
        }
        Ok(Arc::new(MongoDatabaseHandle {
            database: self.client.database(name),
        }))
    }

    async fn start_session(
        &self,
        causal_consistency: bool,
    ) -> DocModelResult<Box<dyn StoreSession>> {
        let session = self
            .client
            .start_session()
            .causal_consistency(causal_consistency)
            .await
            .map_err(backend_err)?;
        Ok(Box::new(MongoSession {
            session,
            database: self.client.database(&self.database),
        }))
    }
}

struct MongoDatabaseHandle {
    database: Database,
}

impl fmt::Debug for MongoDatabaseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoDatabaseHandle")
            .field("name", &self.database.name())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl StoreDatabase for MongoDatabaseHandle {
    fn name(&self) -> &str {
        self.database.name()
    }

    async fn collection(
        &self,
        name: &str,
        create_if_missing: bool,
    ) -> DocModelResult<Arc<dyn RawCollection>> {
        if create_if_missing {
            if let Err(err) = self.database.create_collection(name).await {
                return Err(match *err.kind {
                    ErrorKind::Command(ref command) if command.code == NAMESPACE_EXISTS => {
                        DocModelError::CollectionExists(name.to_string())
                    }
                    _ => backend_err(err),
                });
            }
        }
        Ok(Arc::new(MongoRawCollection {
            collection: self.database.collection(name),
        }))
    }
}

struct MongoRawCollection {
    collection: MongoCollection<RawRecord>,
}

impl fmt::Debug for MongoRawCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoRawCollection")
            .field("name", &self.collection.name())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RawCollection for MongoRawCollection {
    fn name(&self) -> &str {
        self.collection.name()
    }

    async fn find(
        &self,
        criteria: &Criteria,
        limit: Option<usize>,
    ) -> DocModelResult<Vec<RawRecord>> {
        let mut options = FindOptions::default();
        if let Some(limit) = limit {
            options.limit = Some(limit as i64);
        }

        self.collection
            .find(criteria.to_record())
            .with_options(options)
            .await
            .map_err(backend_err)?
            .try_collect()
            .await
            .map_err(backend_err)
    }

    async fn find_one(&self, criteria: &Criteria) -> DocModelResult<Option<RawRecord>> {
        self.collection
            .find_one(criteria.to_record())
            .await
            .map_err(backend_err)
    }

    async fn insert_one(&self, record: RawRecord) -> DocModelResult<Ack> {
        self.collection
            .insert_one(record)
            .await
            .map_err(backend_err)?;
        Ok(Ack::acknowledged())
    }

    async fn update_one(&self, identity: Uuid, set: RawRecord) -> DocModelResult<Ack> {
        let result = self
            .collection
            .update_one(doc! { "_id": identity }, doc! { "$set": set })
            .await
            .map_err(backend_err)?;
        Ok(Ack::with_counts(result.matched_count, result.modified_count))
    }

    async fn delete_one(&self, identity: Uuid) -> DocModelResult<Ack> {
        let result = self
            .collection
            .delete_one(doc! { "_id": identity })
            .await
            .map_err(backend_err)?;
        Ok(Ack::with_counts(result.deleted_count, result.deleted_count))
    }
}

/// A driver client session scoped to the configured database.
///
/// The driver ends its session on drop, so `end_session` has nothing left
/// to do explicitly.
struct MongoSession {
    session: ClientSession,
    database: Database,
}

impl MongoSession {
    fn collection(&self, name: &str) -> MongoCollection<RawRecord> {
        self.database.collection(name)
    }
}

#[async_trait]
impl StoreSession for MongoSession {
    async fn start_transaction(&mut self) -> DocModelResult<()> {
        self.session.start_transaction().await.map_err(backend_err)
    }

    async fn insert_one(&mut self, collection: &str, record: RawRecord) -> DocModelResult<()> {
        self.collection(collection)
            .insert_one(record)
            .session(&mut self.session)
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn update_one(
        &mut self,
        collection: &str,
        identity: Uuid,
        set: RawRecord,
    ) -> DocModelResult<()> {
        self.collection(collection)
            .update_one(doc! { "_id": identity }, doc! { "$set": set })
            .session(&mut self.session)
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn delete_one(&mut self, collection: &str, identity: Uuid) -> DocModelResult<()> {
        self.collection(collection)
            .delete_one(doc! { "_id": identity })
            .session(&mut self.session)
            .await
            .map_err(backend_err)?;
        Ok(())
    }

    async fn commit_transaction(&mut self) -> DocModelResult<()> {
        self.session.commit_transaction().await.map_err(backend_err)
    }

    async fn abort_transaction(&mut self) -> DocModelResult<()> {
        self.session.abort_transaction().await.map_err(backend_err)
    }

    async fn end_session(&mut self) -> DocModelResult<()> {
        Ok(())
    }
}
