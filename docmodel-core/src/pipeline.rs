//! Transactional write pipelines.
//!
//! A pipeline is an ordered list of write [`Operation`]s executed inside one
//! store transaction on one session. Payloads are validated in full before
//! any store interaction, so a malformed descriptor never leaves a partial
//! transaction behind. Execution is a strict state machine:
//! `Idle -> InTransaction -> {Committed | Aborted}`; both terminal states
//! end the session and there is no transition out of either.
//!
//! Ordering and atomicity hold within a single call only. Concurrent
//! pipelines are last-write-wins at the store; serializing overlapping
//! callers is the caller's responsibility.

use crate::client::{RawRecord, StoreSession};
use crate::collection::Collection;
use crate::document::Document;
use crate::error::{DocModelError, DocModelResult};
use crate::schema::Schema;

/// One write in a pipeline.
///
/// Update and delete operations are addressed by a materialized document's
/// identity; there is no criteria-based bulk write.
#[derive(Debug)]
pub enum Operation {
    /// Insert the record as given.
    InsertOne(RawRecord),
    /// Apply `set` as a partial update to the document's record.
    UpdateOne { filter: Document, set: RawRecord },
    /// Delete the document's record.
    DeleteOne(Document),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    Idle,
    InTransaction,
    Committed,
    Aborted,
}

/// A store session driven through the pipeline state machine. Transitions
/// are checked at every step; both terminal states end the session, and
/// nothing transitions out of a terminal state.
struct PipelineSession {
    session: Box<dyn StoreSession>,
    state: PipelineState,
}

impl PipelineSession {
    fn new(session: Box<dyn StoreSession>) -> Self {
        Self { session, state: PipelineState::Idle }
    }

    fn expect(&self, state: PipelineState) -> DocModelResult<()> {
        if self.state == state {
            Ok(())
        } else {
            Err(DocModelError::Session(format!(
                "pipeline is {:?}, expected {:?}",
                self.state, state
            )))
        }
    }

    async fn begin(&mut self) -> DocModelResult<()> {
        self.expect(PipelineState::Idle)?;
        if let Err(err) = self.session.start_transaction().await {
            self.end(PipelineState::Aborted).await;
            return Err(err);
        }
        self.state = PipelineState::InTransaction;
        Ok(())
    }

    async fn apply(&mut self, collection: &str, operation: Operation) -> DocModelResult<()> {
        self.expect(PipelineState::InTransaction)?;
        match operation {
            Operation::InsertOne(record) => self.session.insert_one(collection, record).await,
            Operation::UpdateOne { filter, set } => {
                self.session
                    .update_one(collection, filter.identity(), set)
                    .await
            }
            Operation::DeleteOne(document) => {
                self.session.delete_one(collection, document.identity()).await
            }
        }
    }

    async fn commit(&mut self) -> DocModelResult<()> {
        self.expect(PipelineState::InTransaction)?;
        if let Err(err) = self.session.commit_transaction().await {
            // The transaction is already dead after a failed commit; the
            // driver rejects a follow-up abort, so just end the session.
            self.end(PipelineState::Aborted).await;
            return Err(err);
        }
        self.end(PipelineState::Committed).await;
        Ok(())
    }

    /// Aborts the transaction and ends the session. Best-effort: failures
    /// here are logged, never propagated, so the caller's original step
    /// error is what surfaces.
    async fn abort(&mut self) {
        if let Err(err) = self.session.abort_transaction().await {
            log::warn!("failed to abort transaction: {err}");
        }
        self.end(PipelineState::Aborted).await;
    }

    /// Ends the session and lands in a terminal state, unconditionally.
    async fn end(&mut self, state: PipelineState) {
        if let Err(err) = self.session.end_session().await {
            log::warn!("failed to end session: {err}");
        }
        self.state = state;
    }
}

/// Runs the operations in one transaction on a fresh session.
///
/// Any step failure aborts the transaction, ends the session, and
/// propagates that step's error; nothing is retried and nothing is
/// partially committed. A clean pass commits, ends the session, and
/// returns `Ok(true)`.
pub(crate) async fn execute(
    collection: &Collection,
    operations: Vec<Operation>,
) -> DocModelResult<bool> {
    validate_operations(collection.schema(), &operations)?;

    let client = collection.session_client()?;
    let mut pipeline = PipelineSession::new(client.start_session(true).await?);

    log::debug!(
        "pipeline on {}: {} operation(s)",
        collection.name(),
        operations.len()
    );

    pipeline.begin().await?;

    for operation in operations {
        if let Err(err) = pipeline.apply(collection.name(), operation).await {
            log::warn!("pipeline on {} aborted: {}", collection.name(), err);
            pipeline.abort().await;
            return Err(err);
        }
    }

    if let Err(err) = pipeline.commit().await {
        log::warn!("pipeline on {} failed to commit: {}", collection.name(), err);
        return Err(err);
    }

    log::debug!("pipeline on {} committed", collection.name());
    Ok(true)
}

/// Residual payload validation, run in full before any store interaction.
/// Insert and update payloads must be non-empty and only name declared
/// fields; inserts may additionally carry the `_id` correlation key.
fn validate_operations(schema: &Schema, operations: &[Operation]) -> DocModelResult<()> {
    for operation in operations {
        match operation {
            Operation::InsertOne(record) => {
                if record.is_empty() {
                    return Err(DocModelError::InvalidOperation(
                        "insertOne payload is empty".to_string(),
                    ));
                }
                for key in record.keys() {
                    if key != "_id" && !schema.contains(key) {
                        return Err(DocModelError::InvalidOperation(format!(
                            "insertOne payload names undeclared field {key}"
                        )));
                    }
                }
            }
            Operation::UpdateOne { set, .. } => {
                if set.is_empty() {
                    return Err(DocModelError::InvalidOperation(
                        "updateOne set payload is empty".to_string(),
                    ));
                }
                for key in set.keys() {
                    if !schema.contains(key) {
                        return Err(DocModelError::InvalidOperation(format!(
                            "updateOne set payload names undeclared field {key}"
                        )));
                    }
                }
            }
            Operation::DeleteOne(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::client::{StoreClient, StoreDatabase};
    use crate::collection::tests::test_collection;
    use async_trait::async_trait;
    use bson::{Uuid, doc};

    /// A client whose sessions fail on demand, for exercising the abort and
    /// commit paths.
    #[derive(Debug, Default)]
    struct FlakySessionClient {
        fail_step: bool,
        fail_abort: bool,
        fail_commit: bool,
        aborted: Arc<AtomicBool>,
        ended: Arc<AtomicBool>,
    }

    #[async_trait]
    impl StoreClient for FlakySessionClient {
        fn database(&self, _name: &str) -> DocModelResult<Arc<dyn StoreDatabase>> {
            Err(DocModelError::Backend("sessions only".to_string()))
        }

        async fn start_session(
            &self,
            _causal_consistency: bool,
        ) -> DocModelResult<Box<dyn StoreSession>> {
            Ok(Box::new(FlakySession {
                fail_step: self.fail_step,
                fail_abort: self.fail_abort,
                fail_commit: self.fail_commit,
                aborted: Arc::clone(&self.aborted),
                ended: Arc::clone(&self.ended),
            }))
        }
    }

    struct FlakySession {
        fail_step: bool,
        fail_abort: bool,
        fail_commit: bool,
        aborted: Arc<AtomicBool>,
        ended: Arc<AtomicBool>,
    }

    #[async_trait]
    impl StoreSession for FlakySession {
        async fn start_transaction(&mut self) -> DocModelResult<()> {
            Ok(())
        }

        async fn insert_one(
            &mut self,
            _collection: &str,
            _record: RawRecord,
        ) -> DocModelResult<()> {
            if self.fail_step {
                return Err(DocModelError::Backend("insert refused".to_string()));
            }
            Ok(())
        }

        async fn update_one(
            &mut self,
            _collection: &str,
            _identity: Uuid,
            _set: RawRecord,
        ) -> DocModelResult<()> {
            Ok(())
        }

        async fn delete_one(&mut self, _collection: &str, _identity: Uuid) -> DocModelResult<()> {
            Ok(())
        }

        async fn commit_transaction(&mut self) -> DocModelResult<()> {
            if self.fail_commit {
                return Err(DocModelError::Backend("commit refused".to_string()));
            }
            Ok(())
        }

        async fn abort_transaction(&mut self) -> DocModelResult<()> {
            self.aborted.store(true, Ordering::SeqCst);
            if self.fail_abort {
                return Err(DocModelError::Backend("abort refused".to_string()));
            }
            Ok(())
        }

        async fn end_session(&mut self) -> DocModelResult<()> {
            self.ended.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn empty_insert_payload_is_rejected() {
        let collection = test_collection();
        let err = validate_operations(
            collection.schema(),
            &[Operation::InsertOne(RawRecord::new())],
        )
        .unwrap_err();
        assert!(matches!(err, DocModelError::InvalidOperation(_)));
    }

    #[test]
    fn insert_payload_may_carry_the_identity_key() {
        let collection = test_collection();
        let ops = [Operation::InsertOne(
            doc! { "_id": bson::Uuid::new(), "name": "Alice" },
        )];
        assert!(validate_operations(collection.schema(), &ops).is_ok());
    }

    #[test]
    fn undeclared_insert_field_is_rejected() {
        let collection = test_collection();
        let ops = [Operation::InsertOne(doc! { "nickname": "Al" })];
        let err = validate_operations(collection.schema(), &ops).unwrap_err();
        assert!(matches!(
            err,
            DocModelError::InvalidOperation(message) if message.contains("nickname")
        ));
    }

    #[tokio::test]
    async fn undeclared_update_field_is_rejected_before_any_store_work() {
        let collection = test_collection();
        let filter = collection.get(&crate::criteria::Criteria::new()).await.unwrap();
        let ops = [Operation::UpdateOne { filter, set: doc! { "nickname": "Al" } }];
        let err = validate_operations(collection.schema(), &ops).unwrap_err();
        assert!(matches!(err, DocModelError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn empty_update_set_is_rejected() {
        let collection = test_collection();
        let filter = collection.get(&crate::criteria::Criteria::new()).await.unwrap();
        let ops = [Operation::UpdateOne { filter, set: RawRecord::new() }];
        assert!(validate_operations(collection.schema(), &ops).is_err());
    }

    #[tokio::test]
    async fn step_error_surfaces_even_when_abort_fails() {
        let collection = test_collection();
        let ended = Arc::new(AtomicBool::new(false));
        let aborted = Arc::new(AtomicBool::new(false));
        collection.bind_session_client(Arc::new(FlakySessionClient {
            fail_step: true,
            fail_abort: true,
            aborted: Arc::clone(&aborted),
            ended: Arc::clone(&ended),
            ..Default::default()
        }));

        let err = collection
            .multiple_operation(vec![Operation::InsertOne(doc! { "name": "Alice" })])
            .await
            .unwrap_err();

        // The failing step is what the caller sees; the abort failure is
        // only logged, and the session is still ended.
        assert!(matches!(
            err,
            DocModelError::Backend(ref message) if message == "insert refused"
        ));
        assert!(aborted.load(Ordering::SeqCst));
        assert!(ended.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn commit_failure_ends_the_session_without_a_follow_up_abort() {
        let collection = test_collection();
        let ended = Arc::new(AtomicBool::new(false));
        let aborted = Arc::new(AtomicBool::new(false));
        collection.bind_session_client(Arc::new(FlakySessionClient {
            fail_commit: true,
            aborted: Arc::clone(&aborted),
            ended: Arc::clone(&ended),
            ..Default::default()
        }));

        let err = collection
            .multiple_operation(vec![Operation::InsertOne(doc! { "name": "Alice" })])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DocModelError::Backend(ref message) if message == "commit refused"
        ));
        assert!(!aborted.load(Ordering::SeqCst));
        assert!(ended.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn pipeline_without_a_bound_session_client_fails() {
        let collection = test_collection();
        let err = collection
            .multiple_operation(vec![Operation::InsertOne(doc! { "name": "Alice" })])
            .await
            .unwrap_err();
        assert!(matches!(err, DocModelError::Session(_)));
    }
}
