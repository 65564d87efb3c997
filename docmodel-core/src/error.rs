//! Error and result types for the document model layer.
//!
//! Every error carries a human-readable message (its `Display` output) and a
//! suggested fix obtainable through [`DocModelError::fix`], intended for
//! direct surfacing to a developer-caller.

use std::fmt;

use bson::error::Error as BsonError;
use serde::Serialize;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// A single validation failure produced by a field validator.
///
/// Failures are accumulated on the owning [`Field`](crate::field::Field)
/// rather than raised, so a caller can inspect every violation in one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationFailure {
    /// What went wrong with the value.
    pub message: String,
    /// How the caller can correct it.
    pub fix: String,
}

impl ValidationFailure {
    pub fn new(message: impl Into<String>, fix: impl Into<String>) -> Self {
        Self { message: message.into(), fix: fix.into() }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (fix: {})", self.message, self.fix)
    }
}

/// Represents all possible errors raised by the document model layer.
///
/// Two error kinds from the source taxonomy are absent by construction:
/// a non-callable validator cannot be expressed (validators are closures)
/// and registering a non-model type is rejected by the `Model` trait bound.
#[derive(Error, Debug)]
pub enum DocModelError {
    /// Host and port are required before a connection URI can be built.
    #[error("MONGO_HOST and MONGO_PORT are required in configuration")]
    UriMissing,
    /// No database name was configured.
    #[error("no database name configured")]
    DatabaseMissing,
    /// A model declared an empty collection name, or a lookup was attempted
    /// with an empty name.
    #[error("collection name cannot be empty")]
    CollectionNameMissing,
    /// No collection is registered under the given name.
    #[error("collection not registered: {0}")]
    CollectionNotFound(String),
    /// The store reported that a collection with this name already exists.
    #[error("collection already exists: {0}")]
    CollectionExists(String),
    /// The model declares no fields; a field-less model is invalid by
    /// construction.
    #[error("model {0} declares no fields")]
    SchemaEmpty(String),
    /// A field value violated one of its validators.
    #[error("validation failed: {0}")]
    Validation(ValidationFailure),
    /// A key does not name a declared field of the model.
    #[error("unknown field: {0}")]
    UnknownField(String),
    /// `changed_data` was called before any pending data was set.
    #[error("no pending data set on document")]
    PendingDataMissing,
    /// The post-registration consistency check failed.
    #[error("unable to register collection {0}")]
    RegistrationFailed(String),
    /// No document with the given identity exists in the collection.
    #[error("document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// A pipeline operation descriptor failed validation before execution.
    #[error("invalid pipeline operation: {0}")]
    InvalidOperation(String),
    /// A store session could not be acquired or used.
    #[error("session error: {0}")]
    Session(String),
    /// Serialization error when converting between value representations.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// An error reported by the underlying store.
    #[error("backend error: {0}")]
    Backend(String),
}

impl DocModelError {
    /// A suggested fix for the error, suitable for developer-facing output.
    pub fn fix(&self) -> &'static str {
        match self {
            Self::UriMissing => "provide MONGO_HOST and MONGO_PORT values",
            Self::DatabaseMissing => "add a MONGO_DATABASE value to the configuration",
            Self::CollectionNameMissing => "declare a non-empty collection name on the model",
            Self::CollectionNotFound(_) => "register the model before looking its collection up",
            Self::CollectionExists(_) => "attach to the existing collection instead of creating it",
            Self::SchemaEmpty(_) => "declare at least one field on the model",
            Self::Validation(_) => "provide a value that satisfies the field validators",
            Self::UnknownField(_) => "only use field names declared by the model",
            Self::PendingDataMissing => "set pending data on the document before diffing",
            Self::RegistrationFailed(_) => "retry the registration",
            Self::DocumentNotFound(..) => "check the document identity before writing",
            Self::InvalidOperation(_) => "correct the operation payload before re-running the pipeline",
            Self::Session(_) => "ensure the collection was registered through a connected registry",
            Self::Serialization(_) => "check that the value converts to a store document",
            Self::Backend(_) => "inspect the store error and retry if transient",
        }
    }
}

/// A specialized `Result` type for document model operations.
pub type DocModelResult<T> = Result<T, DocModelError>;

impl From<BsonError> for DocModelError {
    fn from(err: BsonError) -> Self {
        DocModelError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocModelError {
    fn from(err: SerdeJsonError) -> Self {
        DocModelError::Serialization(err.to_string())
    }
}

impl From<ValidationFailure> for DocModelError {
    fn from(failure: ValidationFailure) -> Self {
        DocModelError::Validation(failure)
    }
}
