//! Device registry: the fixed catalog of device entries.
//!
//! Built once from [`CATALOG`], in declaration order. Membership never
//! changes afterwards, so lookups need no synchronization; each entry guards
//! its own state with an exclusive lock.

use tokio::sync::Mutex;

use smarthome_domain::catalog::{CATALOG, CatalogEntry, DEVICE_COUNT};
use smarthome_domain::kind::DeviceKind;
use smarthome_domain::state::DeviceState;

use crate::error::NotFoundError;

/// Position of an entry in the registry, equal to its catalog index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceIndex(usize);

impl DeviceIndex {
    #[must_use]
    pub fn get(self) -> usize {
        self.0
    }
}

/// One simulated device and the lock over its state.
#[derive(Debug)]
pub struct DeviceEntry {
    identity: &'static str,
    kind: DeviceKind,
    pub(crate) state: Mutex<DeviceState>,
}

impl DeviceEntry {
    fn from_catalog(entry: CatalogEntry) -> Self {
        Self {
            identity: entry.identity,
            kind: entry.kind,
            state: Mutex::new(entry.initial_state()),
        }
    }

    #[must_use]
    pub fn identity(&self) -> &'static str {
        self.identity
    }

    #[must_use]
    pub fn kind(&self) -> DeviceKind {
        self.kind
    }
}

/// Immutable, ordered set of device entries.
#[derive(Debug)]
pub struct Registry {
    entries: [DeviceEntry; DEVICE_COUNT],
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            entries: CATALOG.map(DeviceEntry::from_catalog),
        }
    }
}

impl Registry {
    /// Build every catalog entry with its default state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Find an entry by identity.
    ///
    /// # Errors
    ///
    /// Returns [`NotFoundError`] when no entry has that identity.
    pub fn lookup(&self, identity: &str) -> Result<(DeviceIndex, &DeviceEntry), NotFoundError> {
        self.iter()
            .find(|(_, entry)| entry.identity == identity)
            .ok_or_else(|| NotFoundError {
                identity: identity.to_string(),
            })
    }

    /// Entry at `index`. Indices only come from this registry's catalog size,
    /// so every index is in bounds.
    #[must_use]
    pub fn get(&self, index: DeviceIndex) -> &DeviceEntry {
        &self.entries[index.0]
    }

    /// Entries in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = (DeviceIndex, &DeviceEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (DeviceIndex(i), entry))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
