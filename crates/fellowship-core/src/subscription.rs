//! Change subscription manager
//!
//! Registers the two subscription shapes the directory uses: one global
//! watch over all session records, and one per-session watch over that
//! session's chat messages. Subscription ids are deterministic, so
//! re-registering is an idempotent replace rather than a duplicate.
//!
//! A fired subscription delivers a payload-less [`ChangeNotification`];
//! the client's only correct response is to re-issue the matching fetch.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use crate::error::SyncResult;
use crate::query::Predicate;
use crate::record::RecordKind;
use crate::store::{ChangeNotification, PublicStore, Subscription, SubscriptionId, TriggerSet};
use crate::types::SessionId;

/// Fixed id of the global session-list subscription
pub const SESSIONS_SUBSCRIPTION_ID: &str = "live-sessions-updates";

/// Id prefix for per-session chat subscriptions
const MESSAGES_SUBSCRIPTION_PREFIX: &str = "chat-messages-";

/// Registers and removes persistent, predicate-scoped subscriptions.
///
/// Explicitly constructed around a store handle; dropping the manager does
/// not tear down store-side registrations (they are persistent by design),
/// use [`SubscriptionManager::unwatch`] for that.
pub struct SubscriptionManager<S> {
    store: Arc<S>,
}

impl<S> Clone for SubscriptionManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: PublicStore> SubscriptionManager<S> {
    /// Create a manager over the given store handle
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Deterministic id of the chat subscription for one session
    pub fn messages_subscription_id(session_id: SessionId) -> SubscriptionId {
        SubscriptionId::new(format!("{MESSAGES_SUBSCRIPTION_PREFIX}{session_id}"))
    }

    /// Watch all session records for create/update/delete.
    ///
    /// Used to refresh the public session list. Idempotent: the fixed
    /// subscription id makes repeated calls replace the registration.
    pub async fn watch_sessions(&self) -> SyncResult<SubscriptionId> {
        let id = SubscriptionId::new(SESSIONS_SUBSCRIPTION_ID);
        debug!(subscription = %id, "watch sessions");
        self.store
            .save_subscription(Subscription {
                id: id.clone(),
                kind: RecordKind::Session,
                predicate: Predicate::All,
                triggers: TriggerSet::ALL,
            })
            .await?;
        Ok(id)
    }

    /// Watch one session's chat messages for create/update.
    ///
    /// Messages are never deleted, so the delete trigger is not registered.
    pub async fn watch_messages(&self, session_id: SessionId) -> SyncResult<SubscriptionId> {
        let id = Self::messages_subscription_id(session_id);
        debug!(subscription = %id, "watch messages");
        self.store
            .save_subscription(Subscription {
                id: id.clone(),
                kind: RecordKind::Message,
                predicate: Predicate::text_eq("sessionId", session_id.to_string()),
                triggers: TriggerSet::CREATE_UPDATE,
            })
            .await?;
        Ok(id)
    }

    /// Remove a standing subscription by id
    pub async fn unwatch(&self, id: &SubscriptionId) -> SyncResult<()> {
        debug!(subscription = %id, "unwatch");
        self.store.delete_subscription(id).await
    }

    /// Obtain a fresh receiver for change notifications
    pub fn notifications(&self) -> broadcast::Receiver<ChangeNotification> {
        self.store.notifications()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::SyncGateway;
    use crate::store::MemoryStore;
    use crate::types::{ChatMessage, LiveSession, MessageKind};
    use crate::SyncError;

    fn setup() -> (Arc<MemoryStore>, SubscriptionManager<MemoryStore>, SyncGateway<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (
            Arc::clone(&store),
            SubscriptionManager::new(Arc::clone(&store)),
            SyncGateway::new(store),
        )
    }

    #[tokio::test]
    async fn test_session_watch_fires_on_publish() {
        let (_, manager, gateway) = setup();
        let id = manager.watch_sessions().await.unwrap();
        let mut rx = manager.notifications();

        let session = LiveSession::new("Study", "", "userA", "Prayer");
        gateway.push(&session).await.unwrap();

        let notification = rx.try_recv().unwrap();
        assert_eq!(notification.subscription_id, id);
        assert_eq!(notification.kind, RecordKind::Session);
    }

    #[tokio::test]
    async fn test_message_watch_is_session_scoped() {
        let (_, manager, gateway) = setup();
        let watched = SessionId::new();
        let other = SessionId::new();
        manager.watch_messages(watched).await.unwrap();

        let mut rx = manager.notifications();
        gateway
            .push(&ChatMessage::new(other, "u", "U", "elsewhere", MessageKind::Text))
            .await
            .unwrap();
        assert!(rx.try_recv().is_err());

        gateway
            .push(&ChatMessage::new(watched, "u", "U", "here", MessageKind::Text))
            .await
            .unwrap();
        let notification = rx.try_recv().unwrap();
        assert_eq!(
            notification.subscription_id,
            SubscriptionManager::<MemoryStore>::messages_subscription_id(watched)
        );
    }

    #[tokio::test]
    async fn test_rewatching_replaces_not_duplicates() {
        let (_, manager, gateway) = setup();
        manager.watch_sessions().await.unwrap();
        manager.watch_sessions().await.unwrap();

        let mut rx = manager.notifications();
        gateway
            .push(&LiveSession::new("Study", "", "userA", "Prayer"))
            .await
            .unwrap();

        // Exactly one notification despite two registrations
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unwatch_stops_notifications() {
        let (_, manager, gateway) = setup();
        let id = manager.watch_sessions().await.unwrap();
        manager.unwatch(&id).await.unwrap();

        let mut rx = manager.notifications();
        gateway
            .push(&LiveSession::new("Study", "", "userA", "Prayer"))
            .await
            .unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscribe_surfaces_transport_error() {
        let (store, manager, _) = setup();
        store.set_offline(true);
        let err = manager.watch_sessions().await.unwrap_err();
        assert!(matches!(err, SyncError::Transport(_)));
    }
}
