//! Schema-bound collection handles.
//!
//! A [`Collection`] pairs a schema with the raw store collection it maps
//! onto. Reads materialize documents through the schema; writes go through
//! the raw collaborator unmodified. Handles are shared (`Arc`) and live in
//! the registry once registered.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::client::{Ack, RawCollection, RawRecord, StoreClient};
use crate::criteria::Criteria;
use crate::document::{Document, DocumentSet};
use crate::error::{DocModelError, DocModelResult, ValidationFailure};
use crate::pipeline::{self, Operation};
use crate::schema::Schema;

/// A schema-bound handle over one store collection.
pub struct Collection {
    name: String,
    schema: Schema,
    raw: Arc<dyn RawCollection>,
    session_client: OnceCell<Arc<dyn StoreClient>>,
    validation_errors: Mutex<Vec<ValidationFailure>>,
}

impl Collection {
    /// Binds a schema to a raw collection handle.
    ///
    /// # Errors
    ///
    /// Fails with [`DocModelError::CollectionNameMissing`] on an empty name.
    pub(crate) fn new(
        name: impl Into<String>,
        schema: Schema,
        raw: Arc<dyn RawCollection>,
    ) -> DocModelResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(DocModelError::CollectionNameMissing);
        }
        Ok(Self {
            name,
            schema,
            raw,
            session_client: OnceCell::new(),
            validation_errors: Mutex::new(Vec::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Injects the client handle used to open pipeline sessions. Set once at
    /// registration; later calls are ignored.
    pub(crate) fn bind_session_client(&self, client: Arc<dyn StoreClient>) {
        let _ = self.session_client.set(client);
    }

    pub(crate) fn session_client(&self) -> DocModelResult<Arc<dyn StoreClient>> {
        self.session_client.get().cloned().ok_or_else(|| {
            DocModelError::Session(format!(
                "collection {} has no session client bound",
                self.name
            ))
        })
    }

    /// Materializes every record in the collection, in cursor order.
    pub async fn all(self: &Arc<Self>) -> DocModelResult<DocumentSet> {
        self.filter(&Criteria::new()).await
    }

    /// Materializes the records matching the criteria. The criteria pass
    /// through to the store unmodified; no match yields an empty set, never
    /// an error.
    pub async fn filter(self: &Arc<Self>, criteria: &Criteria) -> DocModelResult<DocumentSet> {
        let records = self.raw.find(criteria, None).await?;
        Ok(self.materialize_all(records))
    }

    /// Materializes at most `limit` matching records; fewer when fewer
    /// exist. Absent criteria means a full scan.
    pub async fn find_limit(
        self: &Arc<Self>,
        limit: usize,
        criteria: Option<&Criteria>,
    ) -> DocModelResult<DocumentSet> {
        let all = Criteria::new();
        let criteria = criteria.unwrap_or(&all);
        let records = self.raw.find(criteria, Some(limit)).await?;
        Ok(self.materialize_all(records))
    }

    /// Materializes the first record matching the criteria.
    ///
    /// Empty criteria and no-match both yield a fully-shaped document with
    /// every field unset; this operation never fails on missing data and
    /// never returns "nothing". Empty criteria skip the store round trip
    /// entirely.
    pub async fn get(self: &Arc<Self>, criteria: &Criteria) -> DocModelResult<Document> {
        let record = if criteria.is_empty() {
            None
        } else {
            self.raw.find_one(criteria).await?
        };
        Ok(Document::materialize(Arc::clone(self), record))
    }

    /// Writes a raw record verbatim. No identity is injected; the backend
    /// assigns one when the record carries none.
    pub async fn insert_one(&self, record: RawRecord) -> DocModelResult<Ack> {
        log::debug!("insert into {}", self.name);
        self.raw.insert_one(record).await
    }

    /// Inserts a document's full cleaned values, attaching its identity as
    /// the store correlation key.
    pub(crate) async fn insert_document(&self, document: &Document) -> DocModelResult<Ack> {
        let mut record = RawRecord::new();
        record.insert("_id", document.identity());
        for (name, value) in document.cleaned_data() {
            record.insert(name, value);
        }
        self.insert_one(record).await
    }

    /// Applies a partial update keyed strictly by the document's identity.
    /// The backend wraps `set` in its native set-style envelope; whole
    /// document replacement is not supported.
    pub async fn update_one(&self, document: &Document, set: RawRecord) -> DocModelResult<Ack> {
        log::debug!("update {} in {}", document.identity(), self.name);
        self.raw.update_one(document.identity(), set).await
    }

    /// Deletes the document with the given identity.
    pub async fn delete_one(&self, document: &Document) -> DocModelResult<Ack> {
        log::debug!("delete {} from {}", document.identity(), self.name);
        self.raw.delete_one(document.identity()).await
    }

    /// Runs a sequence of write operations in one store transaction.
    /// See [`pipeline`] for the execution contract.
    pub async fn multiple_operation(&self, operations: Vec<Operation>) -> DocModelResult<bool> {
        pipeline::execute(self, operations).await
    }

    /// Validates a document and accumulates its failures on the collection.
    pub fn validate(&self, document: &mut Document) {
        document.validate();
        self.validation_errors.lock().extend(document.errors());
    }

    /// Whether no validation failure has been accumulated.
    pub fn is_valid(&self) -> bool {
        self.validation_errors.lock().is_empty()
    }

    /// The accumulated validation failures, in accumulation order.
    pub fn validation_errors(&self) -> Vec<ValidationFailure> {
        self.validation_errors.lock().clone()
    }

    /// Drops the accumulated failures, returning them.
    pub fn take_validation_errors(&self) -> Vec<ValidationFailure> {
        std::mem::take(&mut *self.validation_errors.lock())
    }

    fn materialize_all(self: &Arc<Self>, records: Vec<RawRecord>) -> DocumentSet {
        DocumentSet::new(
            records
                .into_iter()
                .map(|record| Document::materialize(Arc::clone(self), Some(record)))
                .collect(),
        )
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .field("raw", &self.raw)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use bson::Uuid;
    use crate::field::Field;

    /// A raw collection that accepts nothing; enough to exercise the
    /// materialization and diffing paths, which never touch the store.
    #[derive(Debug)]
    struct NullRaw;

    #[async_trait]
    impl RawCollection for NullRaw {
        fn name(&self) -> &str {
            "contacts"
        }

        async fn find(
            &self,
            _criteria: &Criteria,
            _limit: Option<usize>,
        ) -> DocModelResult<Vec<RawRecord>> {
            Ok(Vec::new())
        }

        async fn find_one(&self, _criteria: &Criteria) -> DocModelResult<Option<RawRecord>> {
            Ok(None)
        }

        async fn insert_one(&self, _record: RawRecord) -> DocModelResult<Ack> {
            Ok(Ack::acknowledged())
        }

        async fn update_one(&self, _identity: Uuid, _set: RawRecord) -> DocModelResult<Ack> {
            Ok(Ack::with_counts(0, 0))
        }

        async fn delete_one(&self, _identity: Uuid) -> DocModelResult<Ack> {
            Ok(Ack::with_counts(0, 0))
        }
    }

    pub(crate) fn test_collection() -> Arc<Collection> {
        let schema = Schema::from_fields(
            "contacts",
            vec![
                ("name", Field::string()),
                ("email", Field::string().max_length(256)),
                ("age", Field::integer()),
            ],
        )
        .unwrap();
        Arc::new(Collection::new("contacts", schema, Arc::new(NullRaw)).unwrap())
    }

    #[test]
    fn empty_name_is_rejected() {
        let schema = Schema::from_fields("contacts", vec![("name", Field::string())]).unwrap();
        let err = Collection::new("", schema, Arc::new(NullRaw)).unwrap_err();
        assert!(matches!(err, DocModelError::CollectionNameMissing));
    }

    #[test]
    fn session_client_is_an_error_until_bound() {
        let collection = test_collection();
        assert!(matches!(
            collection.session_client(),
            Err(DocModelError::Session(_))
        ));
    }

    #[test]
    fn validation_failures_accumulate_on_the_collection() {
        let collection = test_collection();
        let mut doc = Document::materialize(Arc::clone(&collection), None);
        doc.set("age", "not a number").unwrap();
        collection.validate(&mut doc);
        assert!(!collection.is_valid());
        assert_eq!(collection.validation_errors().len(), doc.errors().len());

        let taken = collection.take_validation_errors();
        assert!(!taken.is_empty());
        assert!(collection.is_valid());
    }

    #[tokio::test]
    async fn get_with_empty_criteria_skips_the_store() {
        let collection = test_collection();
        let doc = collection.get(&Criteria::new()).await.unwrap();
        assert!(doc.value("name").is_none());
        assert_eq!(doc.field_names().count(), 3);
    }
}
