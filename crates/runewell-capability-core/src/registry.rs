//! # Capability Registry
//!
//! The process-wide name→provider table.
//!
//! Provider packages are loaded through independent loading contexts, each of
//! which could carry its *own* copy of registry accessor code. If every copy
//! also owned its own map, a provider registered in context A would be
//! invisible to a reader in context B ("ghosting"). The registry therefore
//! separates the thin accessor every package constructs from the single
//! [`RegistryStore`] they all delegate to, anchored once per process.
//!
//! Writes are last-write-wins per name with no cross-name ordering guarantee;
//! lookups never fail and never panic.

use crate::capability::Capability;
use crate::name::CapabilityName;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::warn;

/// One registered provider plus its usability flag.
///
/// An `initialize()` failure flips `usable` off: the entry stays listed for
/// diagnostics but is hidden from `get()` so the resolver never binds it.
struct RegistryEntry {
    provider: Arc<dyn Capability>,
    usable: bool,
}

/// The single physically shared backing store.
///
/// Safe under concurrent register/unregister/get from multiple host threads.
pub struct RegistryStore {
    entries: DashMap<CapabilityName, RegistryEntry>,
}

static SHARED_STORE: OnceCell<Arc<RegistryStore>> = OnceCell::new();

impl RegistryStore {
    fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// The process-wide anchor. Every call returns the same store.
    pub fn shared() -> Arc<RegistryStore> {
        SHARED_STORE
            .get_or_init(|| Arc::new(RegistryStore::new()))
            .clone()
    }
}

/// Thin accessor to the capability registry.
///
/// Cheap to clone; every provider package constructs its own accessor, and
/// all of them delegate to one backing store.
///
/// # Example
///
/// ```no_run
/// use runewell_capability_core::CapabilityRegistry;
///
/// let registry = CapabilityRegistry::attach();
/// for name in registry.list() {
///     println!("capability: {name}");
/// }
/// ```
#[derive(Clone)]
pub struct CapabilityRegistry {
    store: Arc<RegistryStore>,
}

impl CapabilityRegistry {
    /// Attach to the process-wide shared store.
    ///
    /// This is the accessor provider packages use to rendezvous.
    pub fn attach() -> Self {
        Self {
            store: RegistryStore::shared(),
        }
    }

    /// Create an accessor over a private store.
    ///
    /// Used by tests and by hosts that run several isolated worlds.
    pub fn isolated() -> Self {
        Self {
            store: Arc::new(RegistryStore::new()),
        }
    }

    /// Register a provider under its canonical name.
    ///
    /// A duplicate name overwrites the previous entry with a logged warning;
    /// self-registration runs once per package per process, so an overwrite
    /// signals a packaging mistake rather than normal operation.
    pub fn register(&self, provider: Arc<dyn Capability>) {
        let name = provider.name().clone();
        let entry = RegistryEntry {
            provider,
            usable: true,
        };

        if self.store.entries.insert(name.clone(), entry).is_some() {
            warn!(capability = %name, "re-registered capability; previous provider replaced");
        }
    }

    /// Remove a provider. No-op if the name is absent.
    pub fn unregister(&self, name: &CapabilityName) -> bool {
        self.store.entries.remove(name).is_some()
    }

    /// Look up a usable provider by name.
    pub fn get(&self, name: &CapabilityName) -> Option<Arc<dyn Capability>> {
        self.store
            .entries
            .get(name)
            .filter(|entry| entry.usable)
            .map(|entry| Arc::clone(&entry.provider))
    }

    /// Whether a usable provider is registered under the name.
    pub fn has(&self, name: &CapabilityName) -> bool {
        self.get(name).is_some()
    }

    /// All registered names (including unusable entries), sorted.
    pub fn list(&self) -> Vec<CapabilityName> {
        let mut names: Vec<_> = self
            .store
            .entries
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Number of registered entries.
    pub fn count(&self) -> usize {
        self.store.entries.len()
    }

    /// Hide a provider from `get()` after an initialization failure.
    ///
    /// Returns false if the name is not registered.
    pub fn mark_unusable(&self, name: &CapabilityName) -> bool {
        match self.store.entries.get_mut(name) {
            Some(mut entry) => {
                entry.usable = false;
                true
            }
            None => false,
        }
    }

    /// Remove every entry. Test support.
    pub fn clear(&self) {
        self.store.entries.clear();
    }
}
