//! MongoDB backend implementation for docmodel.
//!
//! This crate provides a MongoDB-based implementation of the store
//! collaborator traits, enabling persistent storage with multi-document
//! transactions through the official async driver.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docmodel = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! The backend connects from a [`ConnectionConfig`], which can be built
//! explicitly or read from the `MONGO_*` environment variables.
//!
//! [`ConnectionConfig`]: docmodel_core::config::ConnectionConfig
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use docmodel_core::{config::ConnectionConfig, registry::Registry};
//! use docmodel_mongodb::MongoStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConnectionConfig::from_env();
//!     let store = MongoStore::connect(&config).await?;
//!     let registry = Registry::initialize(Arc::new(store), &config)?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_mongodb;

pub mod store;

pub use store::MongoStore;
