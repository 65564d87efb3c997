//! Model declarations and schema extraction.
//!
//! A model declares its collection name and an ordered list of fields; the
//! extractor turns that declaration into a [`Schema`], the ordered
//! name-to-field-prototype mapping a collection is built around. Extraction
//! happens once per registration; each materialized document clones the
//! prototypes so value state is never shared.

use indexmap::IndexMap;

use crate::error::{DocModelError, DocModelResult};
use crate::field::Field;

/// A collection model declaration.
///
/// The field list is explicit and ordered; there is no runtime reflection.
/// The trait bound is also what makes registering a non-model type
/// impossible.
///
/// # Example
///
/// ```ignore
/// use docmodel_core::{field::Field, schema::Model};
///
/// struct Contact;
///
/// impl Model for Contact {
///     fn collection_name() -> &'static str {
///         "contacts"
///     }
///
///     fn fields() -> Vec<(&'static str, Field)> {
///         vec![
///             ("name", Field::string()),
///             ("email", Field::string().max_length(256)),
///             ("age", Field::integer()),
///         ]
///     }
/// }
/// ```
pub trait Model: Send + Sync + 'static {
    /// The name of the backing store collection. Must be non-empty.
    fn collection_name() -> &'static str;

    /// The model's fields, in declaration order.
    fn fields() -> Vec<(&'static str, Field)>;
}

/// An ordered mapping from field name to its prototype [`Field`].
///
/// Invariants: non-empty, never contains a field named `_id` (identity is
/// store-assigned, not a declared field), immutable once extracted.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: IndexMap<String, Field>,
}

impl Schema {
    /// Extracts the schema from a model declaration.
    pub fn extract<M: Model>() -> DocModelResult<Self> {
        Self::from_fields(M::collection_name(), M::fields())
    }

    /// Builds a schema from an explicit field list, preserving declaration
    /// order and dropping any entry literally named `_id`.
    ///
    /// # Errors
    ///
    /// Returns [`DocModelError::SchemaEmpty`] when no fields remain; a model
    /// with no fields is invalid by construction.
    pub fn from_fields(
        model: &str,
        fields: Vec<(&'static str, Field)>,
    ) -> DocModelResult<Self> {
        let fields: IndexMap<String, Field> = fields
            .into_iter()
            .filter(|(name, _)| *name != "_id")
            .map(|(name, field)| (name.to_string(), field))
            .collect();

        if fields.is_empty() {
            return Err(DocModelError::SchemaEmpty(model.to_string()));
        }

        Ok(Self { fields })
    }

    /// Whether `name` is a declared field.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Field names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Clones the prototypes into a fresh per-document field map.
    pub(crate) fn instantiate(&self) -> IndexMap<String, Field> {
        self.fields.clone()
    }
}
