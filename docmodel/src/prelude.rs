//! Convenient re-exports of commonly used types from docmodel.
//!
//! Import this prelude module to quickly access the most frequently used
//! types and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docmodel::prelude::*;
//! ```
//!
//! This provides access to:
//! - Model and field declarations
//! - Documents, collections, and criteria
//! - The registry and connection configuration
//! - Transactional pipeline operations
//! - Store collaborator traits and error types

pub use docmodel_core::{
    client::{Ack, RawCollection, RawRecord, StoreClient, StoreDatabase, StoreSession},
    collection::Collection,
    config::ConnectionConfig,
    criteria::Criteria,
    document::{Document, DocumentSet},
    error::{DocModelError, DocModelResult, ValidationFailure},
    field::{Field, FieldKind, Validator},
    pipeline::Operation,
    registry::Registry,
    schema::{Model, Schema},
};
