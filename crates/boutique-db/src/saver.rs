//! # Debounced Saver
//!
//! Persistence is asynchronous and decoupled: every mutation updates memory
//! first, then queues a save of the full snapshot. Rapid mutations collapse
//! into one write.
//!
//! ## Save Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  mutation ──► schedule(snapshot) ──► abort pending task                 │
//! │                     │                                                   │
//! │                     ▼                                                   │
//! │               status = Syncing                                          │
//! │                     │                                                   │
//! │                     ▼                                                   │
//! │               sleep(debounce)  ← another mutation? task aborted,        │
//! │                     │            newer snapshot wins                    │
//! │                     ▼                                                   │
//! │               write 5 dataset documents                                 │
//! │                     │                                                   │
//! │            ┌────────┴────────┐                                          │
//! │            ▼                 ▼                                          │
//! │      status = Synced   status = Error (logged, mutation stands)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed save NEVER propagates to the mutation that triggered it; the
//! sync status indicator is the only surface.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use boutique_core::types::{Customer, Expense, Product, Sale, TrashItem};

use crate::error::StoreResult;
use crate::keys::{data_key, Dataset};
use crate::store::Store;

/// Default debounce window between a mutation and its write.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(1);

// =============================================================================
// Sync Status
// =============================================================================

/// What the status indicator in the UI shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Everything in memory is on disk.
    Synced,
    /// A save is pending or in flight.
    Syncing,
    /// The last save failed; in-memory state is still authoritative.
    Error,
}

// =============================================================================
// Snapshot
// =============================================================================

/// The full persisted state of one user: the five dataset collections.
///
/// This is also the export/import document format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub customers: Vec<Customer>,
    pub sales: Vec<Sale>,
    pub expenses: Vec<Expense>,
    pub products: Vec<Product>,
    pub trash: Vec<TrashItem>,
}

// =============================================================================
// Saver
// =============================================================================

/// Debounced fire-and-forget persistence for one user's snapshot.
pub struct Saver {
    store: Store,
    user_id: String,
    debounce: Duration,
    status: Arc<RwLock<SyncStatus>>,
    pending: Option<JoinHandle<()>>,
}

impl Saver {
    pub fn new(store: Store, user_id: impl Into<String>) -> Self {
        Self::with_debounce(store, user_id, DEFAULT_DEBOUNCE)
    }

    /// Tests shrink the window to keep themselves fast.
    pub fn with_debounce(store: Store, user_id: impl Into<String>, debounce: Duration) -> Self {
        Saver {
            store,
            user_id: user_id.into(),
            debounce,
            status: Arc::new(RwLock::new(SyncStatus::Synced)),
            pending: None,
        }
    }

    /// Shared handle to the status indicator.
    pub fn status_handle(&self) -> Arc<RwLock<SyncStatus>> {
        Arc::clone(&self.status)
    }

    pub async fn status(&self) -> SyncStatus {
        *self.status.read().await
    }

    /// Queues a save of `snapshot`. Any not-yet-written earlier snapshot
    /// is dropped; the newest state always wins.
    pub async fn schedule(&mut self, snapshot: Snapshot) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        *self.status.write().await = SyncStatus::Syncing;

        let store = self.store.clone();
        let user_id = self.user_id.clone();
        let status = Arc::clone(&self.status);
        let debounce = self.debounce;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            match write_snapshot(&store, &user_id, &snapshot).await {
                Ok(()) => {
                    debug!(%user_id, "Snapshot persisted");
                    *status.write().await = SyncStatus::Synced;
                }
                Err(e) => {
                    // The mutation already happened in memory; all we can
                    // do is flag the indicator and keep serving
                    warn!(%user_id, error = %e, "Snapshot save failed");
                    *status.write().await = SyncStatus::Error;
                }
            }
        }));
    }

    /// Writes `snapshot` immediately, skipping the debounce. For shutdown
    /// and for destructive operations that must not stay memory-only.
    pub async fn flush(&mut self, snapshot: Snapshot) -> StoreResult<()> {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        *self.status.write().await = SyncStatus::Syncing;
        match write_snapshot(&self.store, &self.user_id, &snapshot).await {
            Ok(()) => {
                *self.status.write().await = SyncStatus::Synced;
                Ok(())
            }
            Err(e) => {
                *self.status.write().await = SyncStatus::Error;
                Err(e)
            }
        }
    }
}

async fn write_snapshot(store: &Store, user_id: &str, snapshot: &Snapshot) -> StoreResult<()> {
    store
        .save(&data_key(Dataset::Customers, user_id), &snapshot.customers)
        .await?;
    store
        .save(&data_key(Dataset::Sales, user_id), &snapshot.sales)
        .await?;
    store
        .save(&data_key(Dataset::Expenses, user_id), &snapshot.expenses)
        .await?;
    store
        .save(&data_key(Dataset::Products, user_id), &snapshot.products)
        .await?;
    store
        .save(&data_key(Dataset::Trash, user_id), &snapshot.trash)
        .await?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
