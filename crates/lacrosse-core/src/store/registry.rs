// ── Snapshot-based device registry ──
//
// Readers get an immutable `Arc<RegistrySnapshot>`; the single writer
// swaps in a whole new snapshot through a `watch` channel, so nobody ever
// sees a half-replaced device set.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::model::{AccountInfo, DeviceRecord};

/// One consistent view of the registry.
#[derive(Debug, Default)]
pub struct RegistrySnapshot {
    devices: Arc<Vec<Arc<DeviceRecord>>>,
    /// Name -> position in `devices`.
    index: HashMap<String, usize>,
    pub account: Option<AccountInfo>,
    pub last_refreshed_at: Option<DateTime<Utc>>,
}

impl RegistrySnapshot {
    pub(crate) fn new(
        records: Vec<DeviceRecord>,
        account: AccountInfo,
        refreshed_at: DateTime<Utc>,
    ) -> Self {
        let index = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.clone(), i))
            .collect();
        Self {
            devices: Arc::new(records.into_iter().map(Arc::new).collect()),
            index,
            account: Some(account),
            last_refreshed_at: Some(refreshed_at),
        }
    }

    /// Devices in portal order (cheap `Arc` clone).
    pub fn devices(&self) -> Arc<Vec<Arc<DeviceRecord>>> {
        Arc::clone(&self.devices)
    }

    pub fn get(&self, name: &str) -> Option<Arc<DeviceRecord>> {
        let i = *self.index.get(name)?;
        self.devices.get(i).map(Arc::clone)
    }

    pub fn names(&self) -> Vec<String> {
        self.devices.iter().map(|d| d.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

/// Mapping from device name to last known record.
pub struct DeviceRegistry {
    snapshot: watch::Sender<Arc<RegistrySnapshot>>,
    /// Every name registered since the process started.
    pub(super) known: Mutex<HashSet<String>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(RegistrySnapshot::default()));
        Self {
            snapshot,
            known: Mutex::new(HashSet::new()),
        }
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(&self.snapshot.borrow())
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub fn subscribe(&self) -> watch::Receiver<Arc<RegistrySnapshot>> {
        self.snapshot.subscribe()
    }

    pub fn devices(&self) -> Arc<Vec<Arc<DeviceRecord>>> {
        self.snapshot().devices()
    }

    pub fn get(&self, name: &str) -> Option<Arc<DeviceRecord>> {
        self.snapshot().get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.snapshot().names()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn last_refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.snapshot().last_refreshed_at
    }

    pub fn account(&self) -> Option<AccountInfo> {
        self.snapshot().account.clone()
    }

    /// Swap in a new snapshot and notify subscribers.
    pub(super) fn install(&self, snapshot: RegistrySnapshot) {
        // `send_replace` updates unconditionally, even with zero receivers.
        self.snapshot.send_replace(Arc::new(snapshot));
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
