//! Shared public store abstraction and backends
//!
//! The public store is the multi-tenant, network-visible record store every
//! account pushes to and pulls from. This module defines the [`PublicStore`]
//! trait (upsert, predicate query, persistent subscriptions, change
//! notifications) and two backends:
//!
//! - [`MemoryStore`]: in-process store with a fault toggle, used in tests
//!   and as a local stand-in for the remote service.
//! - [`RedbStore`]: redb-backed store usable as a shared on-disk database
//!   for multiple local clients (and by the CLI).
//!
//! Upserts are last-write-wins by `(kind, id)`; there is no version or
//! conflict check. Notifications are payload-less "something changed,
//! re-fetch" tokens delivered at-least-once with no ordering guarantee.

use std::collections::HashMap;
use std::future::Future;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::SyncResult;
use crate::query::{Predicate, Sort};
use crate::record::{RecordKind, WireRecord};

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

/// Capacity of the change-notification broadcast channel.
///
/// Lagging receivers drop notifications, which the at-least-once, re-fetch
/// contract tolerates: a later notification triggers the same re-fetch.
const NOTIFICATION_CHANNEL_CAPACITY: usize = 256;

/// Caller-chosen idempotency key for a persistent subscription
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub String);

impl SubscriptionId {
    /// Wrap a caller-chosen key
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which store-side mutation fired a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeTrigger {
    /// A record with a new identifier was written
    Created,
    /// An existing record was overwritten
    Updated,
    /// A record was removed (never performed by this subsystem, but
    /// subscriptions may still register interest)
    Deleted,
}

/// Set of triggers a subscription fires on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerSet {
    /// Fire on record creation
    pub on_create: bool,
    /// Fire on record update
    pub on_update: bool,
    /// Fire on record deletion
    pub on_delete: bool,
}

impl TriggerSet {
    /// Fire on creation, update, and deletion
    pub const ALL: TriggerSet = TriggerSet {
        on_create: true,
        on_update: true,
        on_delete: true,
    };

    /// Fire on creation and update only
    pub const CREATE_UPDATE: TriggerSet = TriggerSet {
        on_create: true,
        on_update: true,
        on_delete: false,
    };

    /// Whether this set includes the given trigger
    pub fn contains(&self, trigger: ChangeTrigger) -> bool {
        match trigger {
            ChangeTrigger::Created => self.on_create,
            ChangeTrigger::Updated => self.on_update,
            ChangeTrigger::Deleted => self.on_delete,
        }
    }
}

/// A standing, predicate-scoped interest registered with the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Idempotency key; saving again under the same id replaces, never duplicates
    pub id: SubscriptionId,
    /// Record kind the subscription watches
    pub kind: RecordKind,
    /// Filter over watched records
    pub predicate: Predicate,
    /// Mutations that fire a notification
    pub triggers: TriggerSet,
}

/// Payload-less token telling a client that matching records changed.
///
/// Never a source of data itself: receipt means "re-issue the corresponding
/// fetch". Delivery is at-least-once and out-of-band from any fetch call.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeNotification {
    /// Which subscription matched
    pub subscription_id: SubscriptionId,
    /// Kind of the record that changed
    pub kind: RecordKind,
    /// What happened to it
    pub trigger: ChangeTrigger,
}

/// The shared public store every account reads and writes
///
/// All operations are asynchronous and independent round trips; the store
/// holds no per-client state beyond registered subscriptions.
pub trait PublicStore: Send + Sync {
    /// Create or overwrite the record keyed by `(kind, id)`.
    ///
    /// Last write wins; no version check. Fires matching subscriptions.
    fn upsert(&self, record: WireRecord) -> impl Future<Output = SyncResult<()>> + Send;

    /// Return all records of `kind` matching `predicate`, ordered by `sort`.
    fn query(
        &self,
        kind: RecordKind,
        predicate: &Predicate,
        sort: &Sort,
    ) -> impl Future<Output = SyncResult<Vec<WireRecord>>> + Send;

    /// Register a subscription, silently replacing any existing one with the
    /// same id.
    fn save_subscription(&self, subscription: Subscription)
        -> impl Future<Output = SyncResult<()>> + Send;

    /// Remove a subscription by id.
    ///
    /// Errors with [`crate::SyncError::SubscriptionNotFound`] if absent.
    fn delete_subscription(
        &self,
        id: &SubscriptionId,
    ) -> impl Future<Output = SyncResult<()>> + Send;

    /// Obtain a fresh receiver for change notifications.
    ///
    /// Each receiver sees notifications sent after it was created.
    fn notifications(&self) -> broadcast::Receiver<ChangeNotification>;
}

/// In-process subscription table shared by the store backends.
///
/// Evaluates registered predicates against every upsert and broadcasts
/// [`ChangeNotification`] tokens to all receivers.
pub(crate) struct SubscriptionRegistry {
    subscriptions: Mutex<HashMap<SubscriptionId, Subscription>>,
    tx: broadcast::Sender<ChangeNotification>,
}

impl SubscriptionRegistry {
    pub(crate) fn new() -> Self {
        let (tx, _) = broadcast::channel(NOTIFICATION_CHANNEL_CAPACITY);
        Self {
            subscriptions: Mutex::new(HashMap::new()),
            tx,
        }
    }

    /// Insert or replace a subscription; returns whether one was replaced
    pub(crate) fn save(&self, subscription: Subscription) -> bool {
        let mut subs = self.subscriptions.lock();
        subs.insert(subscription.id.clone(), subscription).is_some()
    }

    /// Remove a subscription; returns whether it existed
    pub(crate) fn delete(&self, id: &SubscriptionId) -> bool {
        self.subscriptions.lock().remove(id).is_some()
    }

    /// Fire notifications for every subscription matching this mutation
    pub(crate) fn notify(&self, record: &WireRecord, trigger: ChangeTrigger) {
        let subs = self.subscriptions.lock();
        for sub in subs.values() {
            if sub.kind == record.kind
                && sub.triggers.contains(trigger)
                && sub.predicate.matches(record)
            {
                let notification = ChangeNotification {
                    subscription_id: sub.id.clone(),
                    kind: record.kind,
                    trigger,
                };
                // No receivers is fine; notifications are best-effort
                if self.tx.send(notification).is_err() {
                    debug!(subscription = %sub.id, "no notification receivers");
                }
            }
        }
    }

    pub(crate) fn receiver(&self) -> broadcast::Receiver<ChangeNotification> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;

    fn session_record(id: &str) -> WireRecord {
        WireRecord::new(RecordKind::Session, id)
            .set("title", FieldValue::Text("Study".to_string()))
    }

    #[test]
    fn test_trigger_set_contains() {
        assert!(TriggerSet::ALL.contains(ChangeTrigger::Deleted));
        assert!(TriggerSet::CREATE_UPDATE.contains(ChangeTrigger::Created));
        assert!(!TriggerSet::CREATE_UPDATE.contains(ChangeTrigger::Deleted));
    }

    #[test]
    fn test_registry_save_is_idempotent_replace() {
        let registry = SubscriptionRegistry::new();
        let sub = Subscription {
            id: SubscriptionId::new("s1"),
            kind: RecordKind::Session,
            predicate: Predicate::All,
            triggers: TriggerSet::ALL,
        };
        assert!(!registry.save(sub.clone()));
        assert!(registry.save(sub.clone()));
        // One registration despite two saves
        assert!(registry.delete(&sub.id));
        assert!(!registry.delete(&sub.id));
    }

    #[test]
    fn test_registry_delete() {
        let registry = SubscriptionRegistry::new();
        let id = SubscriptionId::new("s1");
        assert!(!registry.delete(&id));
        registry.save(Subscription {
            id: id.clone(),
            kind: RecordKind::Session,
            predicate: Predicate::All,
            triggers: TriggerSet::ALL,
        });
        assert!(registry.delete(&id));
        assert!(!registry.delete(&id));
    }

    #[test]
    fn test_registry_notifies_matching_subscription() {
        let registry = SubscriptionRegistry::new();
        registry.save(Subscription {
            id: SubscriptionId::new("sessions"),
            kind: RecordKind::Session,
            predicate: Predicate::All,
            triggers: TriggerSet::ALL,
        });

        let mut rx = registry.receiver();
        registry.notify(&session_record("a"), ChangeTrigger::Created);

        let notification = rx.try_recv().unwrap();
        assert_eq!(notification.subscription_id, SubscriptionId::new("sessions"));
        assert_eq!(notification.kind, RecordKind::Session);
        assert_eq!(notification.trigger, ChangeTrigger::Created);
    }

    #[test]
    fn test_registry_filters_kind_trigger_and_predicate() {
        let registry = SubscriptionRegistry::new();
        registry.save(Subscription {
            id: SubscriptionId::new("one-session"),
            kind: RecordKind::Session,
            predicate: Predicate::text_eq("title", "Other"),
            triggers: TriggerSet::CREATE_UPDATE,
        });

        let mut rx = registry.receiver();

        // Wrong kind
        registry.notify(
            &WireRecord::new(RecordKind::Message, "m"),
            ChangeTrigger::Created,
        );
        // Wrong trigger
        registry.notify(&session_record("a"), ChangeTrigger::Deleted);
        // Predicate mismatch
        registry.notify(&session_record("a"), ChangeTrigger::Created);

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_notify_without_receivers_does_not_panic() {
        let registry = SubscriptionRegistry::new();
        registry.save(Subscription {
            id: SubscriptionId::new("s"),
            kind: RecordKind::Session,
            predicate: Predicate::All,
            triggers: TriggerSet::ALL,
        });
        registry.notify(&session_record("a"), ChangeTrigger::Created);
    }
}
