//! Main docmodel crate providing a schema-mapped document access layer.
//!
//! This crate is the primary entry point for users of the docmodel
//! framework. It re-exports the core types from the sub-crates and provides
//! convenient access to the storage backends.
//!
//! # Features
//!
//! - **Declared models** - Collections are described by an explicit, ordered
//!   field list with per-field validators
//! - **Change-tracked documents** - Reads materialize fully-shaped documents;
//!   saves ship only the fields that actually changed
//! - **Transactional pipelines** - Multi-write operations run all-or-nothing
//!   on one store session
//! - **Multiple backends** - In-memory and MongoDB backends behind the same
//!   collaborator traits
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use docmodel::{prelude::*, memory::MemoryStore};
//!
//! struct Contact;
//!
//! impl Model for Contact {
//!     fn collection_name() -> &'static str {
//!         "contacts"
//!     }
//!
//!     fn fields() -> Vec<(&'static str, Field)> {
//!         vec![
//!             ("name", Field::string().required()),
//!             ("email", Field::string().max_length(256)),
//!             ("age", Field::integer()),
//!         ]
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConnectionConfig::new().database("app");
//!     let registry = Registry::initialize(Arc::new(MemoryStore::new()), &config)?;
//!
//!     // Register the model; this creates or attaches the store collection.
//!     let contacts = registry.register::<Contact>().await?;
//!
//!     // Insert a record and read it back.
//!     contacts
//!         .insert_one(bson::doc! { "name": "Alice", "age": 30 })
//!         .await?;
//!
//!     let alice = contacts.get(&Criteria::new().eq("name", "Alice")).await?;
//!     println!("{:?}", alice.value("age"));
//!
//!     // Change tracking: only the diff goes to the store.
//!     let mut alice = alice;
//!     alice.set("age", 31)?;
//!     alice.save().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Transactional pipelines
//!
//! Multiple writes can run atomically through a collection's pipeline:
//!
//! ```ignore
//! use docmodel::prelude::*;
//!
//! let committed = contacts
//!     .multiple_operation(vec![
//!         Operation::InsertOne(bson::doc! { "name": "Bob" }),
//!         Operation::DeleteOne(alice),
//!     ])
//!     .await?;
//! assert!(committed);
//! ```
//!
//! Any failing step aborts the whole pipeline; nothing is partially
//! committed.
//!
//! # Backends
//!
//! - [`memory`] - Fast in-memory storage for development and testing
//! - [`mongodb`] - Persistent MongoDB backend (requires `mongodb` feature)

pub mod prelude;

pub use docmodel_core::{
    client, collection, config, criteria, document, error, field, pipeline, registry, schema,
    validators,
};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docmodel_memory::MemoryStore;
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docmodel_mongodb::MongoStore;
}
