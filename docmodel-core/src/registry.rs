//! The model registry: one connection context, many collections.
//!
//! A [`Registry`] binds a store client to a configured database and holds
//! the live collection handles produced by model registration. The handle
//! map is behind an async `RwLock` so concurrent registrations and lookups
//! are safe; re-registering a model overwrites its previous handle, leaving
//! exactly one live instance per name.

use std::collections::HashMap;
use std::sync::Arc;

use mea::rwlock::RwLock;

use crate::client::{StoreClient, StoreDatabase};
use crate::collection::Collection;
use crate::config::ConnectionConfig;
use crate::error::{DocModelError, DocModelResult};
use crate::schema::{Model, Schema};

/// The connection context shared by a hosting application.
#[derive(Debug)]
pub struct Registry {
    client: Arc<dyn StoreClient>,
    database: Arc<dyn StoreDatabase>,
    collections: RwLock<HashMap<String, Arc<Collection>>>,
}

impl Registry {
    /// Binds a store client to the configured database.
    ///
    /// # Errors
    ///
    /// Fails with [`DocModelError::DatabaseMissing`] when the configuration
    /// names no database, or with the client's error when the database
    /// handle cannot be resolved.
    pub fn initialize(
        client: Arc<dyn StoreClient>,
        config: &ConnectionConfig,
    ) -> DocModelResult<Self> {
        let database = client.database(config.database_name()?)?;
        Ok(Self {
            client,
            database,
            collections: RwLock::new(HashMap::new()),
        })
    }

    /// Registers a model, creating its store collection when absent and
    /// attaching to it when present.
    ///
    /// Registration extracts the schema, resolves the raw collection
    /// (create-or-attach), binds the session client for pipelines, and
    /// stores the handle under the model's collection name. Re-registration
    /// replaces the previous handle. Returns the live handle.
    pub async fn register<M: Model>(&self) -> DocModelResult<Arc<Collection>> {
        let name = M::collection_name();
        if name.is_empty() {
            return Err(DocModelError::CollectionNameMissing);
        }

        let schema = Schema::extract::<M>()?;

        let raw = match self.database.collection(name, true).await {
            Ok(raw) => raw,
            // Already present in the store; attach instead.
            Err(DocModelError::CollectionExists(_)) => {
                self.database.collection(name, false).await?
            }
            Err(err) => return Err(err),
        };

        let collection = Arc::new(Collection::new(name, schema, raw)?);
        collection.bind_session_client(Arc::clone(&self.client));

        self.collections
            .write()
            .await
            .insert(name.to_string(), Arc::clone(&collection));

        // Consistency check after releasing the write lock.
        if !self.collections.read().await.contains_key(name) {
            return Err(DocModelError::RegistrationFailed(name.to_string()));
        }

        log::info!("registered collection {name}");
        Ok(collection)
    }

    /// Looks up a live collection handle by name.
    ///
    /// # Errors
    ///
    /// Fails with [`DocModelError::CollectionNameMissing`] on an empty name
    /// and [`DocModelError::CollectionNotFound`] for an unregistered one.
    pub async fn get_collection(&self, name: &str) -> DocModelResult<Arc<Collection>> {
        if name.is_empty() {
            return Err(DocModelError::CollectionNameMissing);
        }
        self.collections
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| DocModelError::CollectionNotFound(name.to_string()))
    }

    pub fn client(&self) -> &Arc<dyn StoreClient> {
        &self.client
    }

    pub fn database(&self) -> &Arc<dyn StoreDatabase> {
        &self.database
    }

    /// The names of all registered collections, in no particular order.
    pub async fn collection_names(&self) -> Vec<String> {
        self.collections.read().await.keys().cloned().collect()
    }
}
