//! Materialized documents and change tracking.
//!
//! A [`Document`] is one store record materialized through a collection's
//! schema: a fully-shaped field map, a snapshot of the values at load time,
//! and an optional set of caller-supplied pending values. "Changed data" is
//! a pure diff between the pending values and the load-time snapshot, so
//! partial updates ship only what actually changed.

use std::fmt;
use std::ops::Index;
use std::sync::Arc;

use bson::{Bson, Uuid};
use indexmap::IndexMap;

use crate::client::{Ack, RawRecord};
use crate::collection::Collection;
use crate::error::{DocModelError, DocModelResult, ValidationFailure};
use crate::field::Field;

/// A materialized record with identity, current values, and a pre-mutation
/// snapshot.
///
/// Documents hold a non-owning back-reference to their collection so `save`
/// and `delete` can delegate to it. They are not thread-safe; concurrent
/// mutation must be serialized by the caller.
pub struct Document {
    identity: Uuid,
    fields: IndexMap<String, Field>,
    initial: IndexMap<String, Bson>,
    pending: Option<IndexMap<String, Bson>>,
    collection: Arc<Collection>,
}

impl Document {
    /// Materializes a document from a raw store record.
    ///
    /// Every schema field is present in the result; fields absent from the
    /// record stay at their prototype default. An empty or missing record is
    /// legal and produces a fully-shaped document with all fields unset.
    /// Identity comes from the record's `_id` when the store assigned one,
    /// otherwise it is generated locally.
    pub(crate) fn materialize(collection: Arc<Collection>, record: Option<RawRecord>) -> Self {
        let record = record.unwrap_or_default();
        let identity = identity_of(&record).unwrap_or_else(Uuid::new);

        let mut fields = collection.schema().instantiate();
        for (name, field) in fields.iter_mut() {
            if let Some(value) = record.get(name) {
                field.set_value(value.clone());
            }
        }

        let initial = fields
            .iter()
            .filter_map(|(name, field)| field.value().map(|v| (name.clone(), v.clone())))
            .collect();

        Self { identity, fields, initial, pending: None, collection }
    }

    /// The store-assigned (or locally generated) identity. Immutable.
    pub fn identity(&self) -> Uuid {
        self.identity
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Field names in schema order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// The current value of a field: the pending value when one is staged,
    /// otherwise the load-time value.
    pub fn value(&self, name: &str) -> Option<&Bson> {
        if let Some(pending) = &self.pending {
            if let Some(value) = pending.get(name) {
                return Some(value);
            }
        }
        self.initial.get(name)
    }

    /// The load-time snapshot of set values.
    pub fn initial(&self) -> &IndexMap<String, Bson> {
        &self.initial
    }

    /// Stages one pending value.
    ///
    /// # Errors
    ///
    /// Fails with [`DocModelError::UnknownField`] when `name` is not a
    /// declared field.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Bson>) -> DocModelResult<()> {
        let name = name.into();
        if !self.fields.contains_key(&name) {
            return Err(DocModelError::UnknownField(name));
        }
        self.pending
            .get_or_insert_with(IndexMap::new)
            .insert(name, value.into());
        Ok(())
    }

    /// Stages pending values wholesale. Keys are validated by
    /// [`Document::changed_data`], not here.
    pub fn set_pending(&mut self, values: impl IntoIterator<Item = (String, Bson)>) {
        self.pending = Some(values.into_iter().collect());
    }

    /// The subset of pending keys whose value differs from the load-time
    /// snapshot. A pure diff; no store interaction.
    ///
    /// # Errors
    ///
    /// Fails with [`DocModelError::PendingDataMissing`] when pending data was
    /// never set, and with [`DocModelError::UnknownField`] when a pending key
    /// is not a declared field.
    pub fn changed_data(&self) -> DocModelResult<IndexMap<String, Bson>> {
        let pending = self
            .pending
            .as_ref()
            .ok_or(DocModelError::PendingDataMissing)?;

        let mut changed = IndexMap::new();
        for (name, value) in pending {
            if !self.fields.contains_key(name) {
                return Err(DocModelError::UnknownField(name.clone()));
            }
            if self.initial.get(name) != Some(value) {
                changed.insert(name.clone(), value.clone());
            }
        }
        Ok(changed)
    }

    /// The full current value map: the load-time snapshot overlaid with any
    /// pending values. Never includes the identity.
    pub fn cleaned_data(&self) -> IndexMap<String, Bson> {
        let mut cleaned = self.initial.clone();
        if let Some(pending) = &self.pending {
            for (name, value) in pending {
                cleaned.insert(name.clone(), value.clone());
            }
        }
        cleaned
    }

    /// Applies pending values onto the owned fields and runs every field's
    /// validators, accumulating failures on the fields.
    pub fn validate(&mut self) {
        for (name, field) in self.fields.iter_mut() {
            if let Some(value) = self.pending.as_ref().and_then(|p| p.get(name)) {
                field.set_value(value.clone());
            }
            field.run_validators();
        }
    }

    /// All validation failures accumulated on this document's fields.
    pub fn errors(&self) -> Vec<ValidationFailure> {
        self.fields
            .values()
            .flat_map(|field| field.errors().iter().cloned())
            .collect()
    }

    pub fn is_valid(&self) -> bool {
        self.fields.values().all(Field::is_valid)
    }

    /// Persists this document through its collection.
    ///
    /// A non-empty change set goes down the partial-update path keyed by this
    /// document's identity; an empty change set inserts the full cleaned
    /// values instead. The identity is attached as the store's correlation
    /// key on insert but is never part of the caller-visible payload.
    pub async fn save(&self) -> DocModelResult<Ack> {
        let changed = self.changed_data()?;
        if changed.is_empty() {
            self.collection.insert_document(self).await
        } else {
            let update: RawRecord = changed.into_iter().collect();
            self.collection.update_one(self, update).await
        }
    }

    /// Deletes this document from the store, keyed by identity.
    pub async fn delete(&self) -> DocModelResult<Ack> {
        self.collection.delete_one(self).await
    }

    /// The cleaned values as a JSON value, for surfacing to a hosting
    /// application.
    pub fn to_json(&self) -> DocModelResult<serde_json::Value> {
        let record: RawRecord = self.cleaned_data().into_iter().collect();
        Ok(serde_json::to_value(&record)?)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("identity", &self.identity)
            .field("collection", &self.collection.name())
            .field("fields", &self.fields)
            .field("pending", &self.pending)
            .finish()
    }
}

fn identity_of(record: &RawRecord) -> Option<Uuid> {
    match record.get("_id") {
        Some(Bson::Binary(binary)) => binary.to_uuid().ok(),
        _ => None,
    }
}

/// An ordered, immutable sequence of documents from one read operation,
/// preserving store cursor order.
#[derive(Debug, Default)]
pub struct DocumentSet(Vec<Document>);

impl DocumentSet {
    pub(crate) fn new(documents: Vec<Document>) -> Self {
        Self(documents)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Document> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.0.iter()
    }
}

impl Index<usize> for DocumentSet {
    type Output = Document;

    fn index(&self, index: usize) -> &Document {
        &self.0[index]
    }
}

impl IntoIterator for DocumentSet {
    type Item = Document;
    type IntoIter = std::vec::IntoIter<Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a DocumentSet {
    type Item = &'a Document;
    type IntoIter = std::slice::Iter<'a, Document>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::tests::test_collection;
    use bson::doc;

    fn materialized(record: Option<RawRecord>) -> Document {
        Document::materialize(test_collection(), record)
    }

    #[test]
    fn empty_record_yields_fully_shaped_document() {
        let doc = materialized(None);
        let names: Vec<&str> = doc.field_names().collect();
        assert_eq!(names, vec!["name", "email", "age"]);
        assert!(doc.value("name").is_none());
        assert!(doc.initial().is_empty());
    }

    #[test]
    fn record_values_land_in_fields_and_snapshot() {
        let doc = materialized(Some(doc! { "name": "Alice", "age": 30 }));
        assert_eq!(doc.value("name"), Some(&Bson::String("Alice".into())));
        assert_eq!(doc.initial().get("age"), Some(&Bson::Int32(30)));
        assert!(doc.value("email").is_none());
    }

    #[test]
    fn identity_is_taken_from_the_record() {
        let id = Uuid::new();
        let doc = materialized(Some(doc! { "_id": id, "name": "Alice" }));
        assert_eq!(doc.identity(), id);
    }

    #[test]
    fn identity_is_generated_when_absent() {
        let a = materialized(None);
        let b = materialized(None);
        assert_ne!(a.identity(), b.identity());
    }

    #[test]
    fn changed_data_without_pending_fails() {
        let doc = materialized(Some(doc! { "name": "Alice" }));
        assert!(matches!(
            doc.changed_data(),
            Err(DocModelError::PendingDataMissing)
        ));
    }

    #[test]
    fn identical_pending_diffs_to_nothing() {
        let mut doc = materialized(Some(doc! { "name": "Alice", "age": 30 }));
        doc.set_pending(vec![
            ("name".to_string(), Bson::String("Alice".into())),
            ("age".to_string(), Bson::Int32(30)),
        ]);
        assert!(doc.changed_data().unwrap().is_empty());
    }

    #[test]
    fn single_change_diffs_to_exactly_that_key() {
        let mut doc = materialized(Some(doc! { "name": "Alice", "age": 30 }));
        doc.set("age", 31).unwrap();
        let changed = doc.changed_data().unwrap();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed.get("age"), Some(&Bson::Int32(31)));
    }

    #[test]
    fn unknown_pending_key_fails_the_diff() {
        let mut doc = materialized(None);
        doc.set_pending(vec![("nickname".to_string(), Bson::String("Al".into()))]);
        assert!(matches!(
            doc.changed_data(),
            Err(DocModelError::UnknownField(name)) if name == "nickname"
        ));
    }

    #[test]
    fn set_rejects_undeclared_fields() {
        let mut doc = materialized(None);
        assert!(matches!(
            doc.set("nickname", "Al"),
            Err(DocModelError::UnknownField(_))
        ));
    }

    #[test]
    fn cleaned_data_overlays_pending_and_omits_identity() {
        let id = Uuid::new();
        let mut doc = materialized(Some(doc! { "_id": id, "name": "Alice", "age": 30 }));
        doc.set("age", 31).unwrap();
        let cleaned = doc.cleaned_data();
        assert_eq!(cleaned.get("name"), Some(&Bson::String("Alice".into())));
        assert_eq!(cleaned.get("age"), Some(&Bson::Int32(31)));
        assert!(!cleaned.contains_key("_id"));
    }

    #[test]
    fn validate_applies_pending_then_collects_errors() {
        let mut doc = materialized(None);
        doc.set("age", "not a number").unwrap();
        doc.validate();
        assert!(!doc.is_valid());
        assert!(doc.errors().iter().any(|f| f.message.contains("should be int")));
    }

    #[test]
    fn document_set_preserves_order() {
        let set = DocumentSet::new(vec![
            materialized(Some(doc! { "age": 1 })),
            materialized(Some(doc! { "age": 2 })),
        ]);
        assert_eq!(set.len(), 2);
        assert_eq!(set[0].value("age"), Some(&Bson::Int32(1)));
        assert_eq!(set.get(1).unwrap().value("age"), Some(&Bson::Int32(2)));
        assert!(set.get(2).is_none());
    }
}
