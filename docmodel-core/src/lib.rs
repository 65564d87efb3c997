//! A schema-mapped document access layer for document stores.
//!
//! This crate is the core of the docmodel project and provides:
//!
//! - **Fields and validation** ([`field`], [`validators`]) - Typed scalar
//!   fields with accumulating validators
//! - **Models and schemas** ([`schema`]) - Static model declarations and
//!   schema extraction
//! - **Documents** ([`document`]) - Materialized records with snapshot-based
//!   change tracking
//! - **Collections** ([`collection`], [`criteria`]) - Schema-bound read and
//!   write operations over a store collection
//! - **Transactional pipelines** ([`pipeline`]) - All-or-nothing multi-write
//!   execution on one store session
//! - **Registry and configuration** ([`registry`], [`config`]) - The
//!   connection context holding live collection handles
//! - **Store collaborator interface** ([`client`]) - Backend traits the core
//!   is written against
//! - **Error handling** ([`error`]) - Error taxonomy with per-error fix
//!   suggestions
//!
//! # Example
//!
//! ```ignore
//! use docmodel_core::{field::Field, schema::Model};
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
//!             ("age", Field::integer()),
//!         ]
//!     }
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmodel_core;

pub mod client;
pub mod collection;
pub mod config;
pub mod criteria;
pub mod document;
pub mod error;
pub mod field;
pub mod pipeline;
pub mod registry;
pub mod schema;
pub mod validators;
