//! Push/pull gateway between local entities and the shared public store
//!
//! One generic pair of operations covers all four entity kinds via the
//! [`Mirrored`] trait. The gateway owns no retry policy: transport errors
//! surface to the caller unmodified. On the read path it applies the
//! best-effort decode rule: a record that fails to decode is logged and
//! skipped so one malformed remote record cannot block the rest of the
//! directory.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{SyncError, SyncResult};
use crate::mapper::{IdentityPolicy, Mirrored};
use crate::query::{Predicate, Sort};
use crate::store::PublicStore;

/// Network-facing push (upsert) and pull (predicate query) operations.
///
/// Explicitly constructed with its store handle and identity policy; no
/// process-wide shared instance exists. Cloning is cheap and all methods
/// take `&self`, so concurrent call sites are independent round trips.
pub struct SyncGateway<S> {
    store: Arc<S>,
    identity_policy: IdentityPolicy,
}

impl<S> Clone for SyncGateway<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            identity_policy: self.identity_policy,
        }
    }
}

impl<S: PublicStore> SyncGateway<S> {
    /// Create a gateway with the default identity policy
    /// ([`IdentityPolicy::Preserve`]).
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            identity_policy: IdentityPolicy::default(),
        }
    }

    /// Override the identity policy applied when decoding fetched records
    pub fn with_identity_policy(mut self, policy: IdentityPolicy) -> Self {
        self.identity_policy = policy;
        self
    }

    /// The policy this gateway decodes record identity with
    pub fn identity_policy(&self) -> IdentityPolicy {
        self.identity_policy
    }

    /// Shared-store handle this gateway talks to
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Map the entity to its wire record and upsert it into the store.
    ///
    /// The record is keyed by the entity's own identifier, so re-pushing the
    /// same entity overwrites in place (last write wins). Transport failures
    /// surface to the caller; this layer performs no retry.
    pub async fn push<M: Mirrored>(&self, entity: &M) -> SyncResult<()> {
        let record = entity.to_record();
        debug!(kind = %record.kind, id = %record.id, "push");
        self.store.upsert(record).await
    }

    /// Query the store and map each matching record back to an entity.
    ///
    /// Records that fail to decode are skipped with a warning rather than
    /// failing the batch.
    pub async fn fetch<M: Mirrored>(
        &self,
        predicate: &Predicate,
        sort: &Sort,
    ) -> SyncResult<Vec<M>> {
        let records = self.store.query(M::KIND, predicate, sort).await?;
        let total = records.len();

        let mut entities = Vec::with_capacity(total);
        for record in &records {
            match M::from_record(record, self.identity_policy) {
                Some(entity) => entities.push(entity),
                None => {
                    let err = SyncError::Decode {
                        kind: record.kind,
                        record_id: record.id.clone(),
                        reason: "missing or mis-typed required field, or unparseable id"
                            .to_string(),
                    };
                    warn!(%err, "skipping undecodable record");
                }
            }
        }
        debug!(kind = %M::KIND, total, decoded = entities.len(), "fetch");
        Ok(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{FieldValue, RecordKind, WireRecord};
    use crate::store::MemoryStore;
    use crate::types::{ChatMessage, LiveSession, MessageKind, SessionId};

    fn gateway() -> SyncGateway<MemoryStore> {
        SyncGateway::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_push_then_fetch_roundtrip() {
        let gw = gateway();
        let session = LiveSession::new("Psalm 23 Study", "", "userA", "Bible Study");
        gw.push(&session).await.unwrap();

        let fetched: Vec<LiveSession> = gw
            .fetch(&Predicate::All, &Sort::descending("startTime"))
            .await
            .unwrap();
        assert_eq!(fetched, vec![session]);
    }

    #[tokio::test]
    async fn test_repush_overwrites_instead_of_duplicating() {
        let gw = gateway();
        let mut session = LiveSession::new("Study", "", "userA", "Prayer");
        gw.push(&session).await.unwrap();

        session.close();
        gw.push(&session).await.unwrap();

        let fetched: Vec<LiveSession> = gw
            .fetch(&Predicate::All, &Sort::descending("startTime"))
            .await
            .unwrap();
        assert_eq!(fetched.len(), 1);
        assert!(!fetched[0].is_active);
    }

    #[tokio::test]
    async fn test_fetch_skips_undecodable_records() {
        let store = Arc::new(MemoryStore::new());
        let gw = SyncGateway::new(Arc::clone(&store));

        let good = LiveSession::new("Good", "", "userA", "Prayer");
        gw.push(&good).await.unwrap();

        // A remote record missing the required title field
        store.seed(
            WireRecord::new(RecordKind::Session, SessionId::new().to_string())
                .set("details", FieldValue::Text(String::new()))
                .set("hostId", FieldValue::Text("userB".to_string()))
                .set("category", FieldValue::Text("Prayer".to_string()))
                .set("startTime", FieldValue::Timestamp(0))
                .set("maxParticipants", FieldValue::Integer(4)),
        );

        let fetched: Vec<LiveSession> = gw
            .fetch(&Predicate::All, &Sort::descending("startTime"))
            .await
            .unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].title, "Good");
    }

    #[tokio::test]
    async fn test_fetch_respects_predicate_and_sort() {
        let gw = gateway();
        let session_a = SessionId::new();
        let session_b = SessionId::new();

        let mut m1 = ChatMessage::new(session_a, "u1", "One", "first", MessageKind::Text);
        m1.timestamp = 100;
        let mut m2 = ChatMessage::new(session_a, "u2", "Two", "second", MessageKind::Text);
        m2.timestamp = 200;
        let mut other = ChatMessage::new(session_b, "u3", "Three", "noise", MessageKind::Text);
        other.timestamp = 150;

        // Push newest first; the sort must fix the order
        gw.push(&m2).await.unwrap();
        gw.push(&m1).await.unwrap();
        gw.push(&other).await.unwrap();

        let fetched: Vec<ChatMessage> = gw
            .fetch(
                &Predicate::text_eq("sessionId", session_a.to_string()),
                &Sort::ascending("timestamp"),
            )
            .await
            .unwrap();
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[0].body, "first");
        assert_eq!(fetched[1].body, "second");
    }

    #[tokio::test]
    async fn test_transport_error_surfaces_on_push() {
        let store = Arc::new(MemoryStore::new());
        let gw = SyncGateway::new(Arc::clone(&store));
        store.set_offline(true);

        let session = LiveSession::new("Study", "", "userA", "Prayer");
        let err = gw.push(&session).await.unwrap_err();
        assert!(matches!(err, SyncError::Transport(_)));
    }

    #[tokio::test]
    async fn test_reassign_policy_mints_fresh_ids() {
        let store = Arc::new(MemoryStore::new());
        let gw = SyncGateway::new(Arc::clone(&store))
            .with_identity_policy(IdentityPolicy::Reassign);

        let session = LiveSession::new("Study", "", "userA", "Prayer");
        gw.push(&session).await.unwrap();

        let fetched: Vec<LiveSession> = gw
            .fetch(&Predicate::All, &Sort::descending("startTime"))
            .await
            .unwrap();
        assert_ne!(fetched[0].id, session.id);
        assert_eq!(fetched[0].title, session.title);
    }
}
