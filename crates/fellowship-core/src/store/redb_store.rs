//! Redb-backed public store
//!
//! ACID-compliant on-disk implementation of [`PublicStore`]: one table per
//! record kind plus a table of persistent subscriptions, all values stored
//! as serde_json. A single database file can be shared by multiple local
//! clients through cloned handles; subscriptions survive reopen.
//!
//! Change notifications are delivered in-process: every client holding a
//! clone of the same `RedbStore` shares one broadcast channel.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use redb::{Database, ReadableTable, TableDefinition};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};
use crate::query::{Predicate, Sort};
use crate::record::{RecordKind, WireRecord};
use crate::store::{
    ChangeNotification, ChangeTrigger, PublicStore, Subscription, SubscriptionId,
    SubscriptionRegistry,
};

// Table definitions, one per mirrored record kind
const SESSIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("sessions");
const PARTICIPANTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("participants");
const MESSAGES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("messages");
const INVITATIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("invitations");
const SUBSCRIPTIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("subscriptions");

fn table_for(kind: RecordKind) -> TableDefinition<'static, &'static str, &'static [u8]> {
    match kind {
        RecordKind::Session => SESSIONS_TABLE,
        RecordKind::Participant => PARTICIPANTS_TABLE,
        RecordKind::Message => MESSAGES_TABLE,
        RecordKind::Invitation => INVITATIONS_TABLE,
    }
}

/// On-disk implementation of [`PublicStore`] using redb
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<RwLock<Database>>,
    registry: Arc<SubscriptionRegistry>,
}

impl RedbStore {
    /// Open (or create) the store at the given path.
    ///
    /// Creates the parent directory and all tables if needed, and reloads
    /// any persisted subscriptions into the in-process registry.
    pub fn open(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        info!(?path, "Opening public store");

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SESSIONS_TABLE)?;
            let _ = write_txn.open_table(PARTICIPANTS_TABLE)?;
            let _ = write_txn.open_table(MESSAGES_TABLE)?;
            let _ = write_txn.open_table(INVITATIONS_TABLE)?;
            let _ = write_txn.open_table(SUBSCRIPTIONS_TABLE)?;
        }
        write_txn.commit()?;

        let store = Self {
            db: Arc::new(RwLock::new(db)),
            registry: Arc::new(SubscriptionRegistry::new()),
        };
        store.reload_subscriptions()?;
        Ok(store)
    }

    /// Load persisted subscriptions back into the registry
    fn reload_subscriptions(&self) -> SyncResult<()> {
        let db = self.db.read();
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(SUBSCRIPTIONS_TABLE)?;

        let mut count = 0usize;
        for entry in table.iter()? {
            let (_, value) = entry?;
            let subscription: Subscription = serde_json::from_slice(value.value())
                .map_err(|e| SyncError::Serialization(e.to_string()))?;
            self.registry.save(subscription);
            count += 1;
        }
        if count > 0 {
            debug!(count, "reloaded persisted subscriptions");
        }
        Ok(())
    }

    fn write_record(&self, record: &WireRecord) -> SyncResult<ChangeTrigger> {
        let db = self.db.read();
        let write_txn = db.begin_write()?;
        let existed;
        {
            let mut table = write_txn.open_table(table_for(record.kind))?;
            let data = serde_json::to_vec(record)
                .map_err(|e| SyncError::Serialization(e.to_string()))?;
            // The insert guard borrows the table; drop it inside the block
            existed = table.insert(record.id.as_str(), data.as_slice())?.is_some();
        }
        write_txn.commit()?;
        Ok(if existed {
            ChangeTrigger::Updated
        } else {
            ChangeTrigger::Created
        })
    }

    fn read_matching(&self, kind: RecordKind, predicate: &Predicate) -> SyncResult<Vec<WireRecord>> {
        let db = self.db.read();
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(table_for(kind))?;

        let mut matches = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let record: WireRecord = serde_json::from_slice(value.value())
                .map_err(|e| SyncError::Serialization(e.to_string()))?;
            if predicate.matches(&record) {
                matches.push(record);
            }
        }
        Ok(matches)
    }

    fn write_subscription(&self, subscription: &Subscription) -> SyncResult<()> {
        let db = self.db.read();
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(SUBSCRIPTIONS_TABLE)?;
            let data = serde_json::to_vec(subscription)
                .map_err(|e| SyncError::Serialization(e.to_string()))?;
            table.insert(subscription.id.0.as_str(), data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn remove_subscription(&self, id: &SubscriptionId) -> SyncResult<bool> {
        let db = self.db.read();
        let write_txn = db.begin_write()?;
        let existed;
        {
            let mut table = write_txn.open_table(SUBSCRIPTIONS_TABLE)?;
            // The remove guard borrows the table; drop it inside the block
            existed = table.remove(id.0.as_str())?.is_some();
        }
        write_txn.commit()?;
        Ok(existed)
    }
}

impl PublicStore for RedbStore {
    async fn upsert(&self, record: WireRecord) -> SyncResult<()> {
        let trigger = self.write_record(&record)?;
        self.registry.notify(&record, trigger);
        Ok(())
    }

    async fn query(
        &self,
        kind: RecordKind,
        predicate: &Predicate,
        sort: &Sort,
    ) -> SyncResult<Vec<WireRecord>> {
        let mut matches = self.read_matching(kind, predicate)?;
        sort.apply(&mut matches);
        Ok(matches)
    }

    async fn save_subscription(&self, subscription: Subscription) -> SyncResult<()> {
        self.write_subscription(&subscription)?;
        self.registry.save(subscription);
        Ok(())
    }

    async fn delete_subscription(&self, id: &SubscriptionId) -> SyncResult<()> {
        let existed = self.remove_subscription(id)?;
        self.registry.delete(id);
        if existed {
            Ok(())
        } else {
            Err(SyncError::SubscriptionNotFound(id.to_string()))
        }
    }

    fn notifications(&self) -> broadcast::Receiver<ChangeNotification> {
        self.registry.receiver()
    }
}
