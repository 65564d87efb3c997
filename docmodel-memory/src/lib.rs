//! In-memory store backend for docmodel.
//!
//! This crate provides a thread-safe, in-memory implementation of the store
//! collaborator traits. It is ideal for development, testing, and examples;
//! nothing is persisted.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes behind an
//!   async-aware RwLock
//! - **Insertion-order cursors** - Reads return records in the order they
//!   were written
//! - **Snapshot transactions** - Sessions stage a copy of the store and
//!   swap it in on commit, so pipelines are all-or-nothing
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use docmodel_core::{config::ConnectionConfig, registry::Registry};
//! use docmodel_memory::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConnectionConfig::new().database("app");
//!     let registry = Registry::initialize(Arc::new(MemoryStore::new()), &config)?;
//!     let contacts = registry.register::<Contact>().await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_memory;

pub mod store;

pub use store::MemoryStore;
