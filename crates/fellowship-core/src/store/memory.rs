//! In-memory public store backend
//!
//! Backs unit and integration tests, and serves as a local stand-in for the
//! remote store during development. The `set_offline` toggle simulates
//! transport failure so callers' error paths are testable.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::trace;

use crate::error::{SyncError, SyncResult};
use crate::query::{Predicate, Sort};
use crate::record::{RecordKind, WireRecord};
use crate::store::{
    ChangeNotification, ChangeTrigger, PublicStore, Subscription, SubscriptionId,
    SubscriptionRegistry,
};

/// In-process implementation of [`PublicStore`]
pub struct MemoryStore {
    records: Mutex<BTreeMap<(RecordKind, String), WireRecord>>,
    registry: SubscriptionRegistry,
    offline: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            registry: SubscriptionRegistry::new(),
            offline: AtomicBool::new(false),
        }
    }

    /// Simulate the store being unreachable.
    ///
    /// While offline, every trait operation fails with
    /// [`SyncError::Transport`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Insert a record without firing subscriptions or checking the offline
    /// flag. Lets tests seed malformed remote records as another client
    /// would have left them.
    pub fn seed(&self, record: WireRecord) {
        self.records
            .lock()
            .insert((record.kind, record.id.clone()), record);
    }

    /// Number of records of the given kind currently stored
    pub fn len(&self, kind: RecordKind) -> usize {
        self.records.lock().keys().filter(|(k, _)| *k == kind).count()
    }

    fn check_online(&self) -> SyncResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(SyncError::Transport("store unreachable".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PublicStore for MemoryStore {
    async fn upsert(&self, record: WireRecord) -> SyncResult<()> {
        self.check_online()?;

        let trigger = {
            let mut records = self.records.lock();
            let key = (record.kind, record.id.clone());
            match records.insert(key, record.clone()) {
                Some(_) => ChangeTrigger::Updated,
                None => ChangeTrigger::Created,
            }
        };
        trace!(kind = %record.kind, id = %record.id, ?trigger, "upsert");

        self.registry.notify(&record, trigger);
        Ok(())
    }

    async fn query(
        &self,
        kind: RecordKind,
        predicate: &Predicate,
        sort: &Sort,
    ) -> SyncResult<Vec<WireRecord>> {
        self.check_online()?;

        let mut matches: Vec<WireRecord> = self
            .records
            .lock()
            .values()
            .filter(|r| r.kind == kind && predicate.matches(r))
            .cloned()
            .collect();
        sort.apply(&mut matches);
        Ok(matches)
    }

    async fn save_subscription(&self, subscription: Subscription) -> SyncResult<()> {
        self.check_online()?;
        let replaced = self.registry.save(subscription);
        trace!(replaced, "subscription saved");
        Ok(())
    }

    async fn delete_subscription(&self, id: &SubscriptionId) -> SyncResult<()> {
        self.check_online()?;
        if self.registry.delete(id) {
            Ok(())
        } else {
            Err(SyncError::SubscriptionNotFound(id.to_string()))
        }
    }

    fn notifications(&self) -> broadcast::Receiver<ChangeNotification> {
        self.registry.receiver()
    }
}
