//! Two-phase provider lifecycle.
//!
//! Phase one ("attach") runs at package load: the loader maps each manifest's
//! entry point to a registration function and calls it with a registry
//! accessor. Registration only wires the facade into the registry; a failure
//! is recorded and the host continues with the remaining packages.
//!
//! Phase two runs `initialize()` on every attached provider in discovery
//! order with an explicit [`InitContext`]. A failure marks that provider
//! unusable in the registry and moves on; neither phase has an enforced
//! timeout, so a hanging `initialize()` blocks startup (the per-provider log
//! line makes the hang attributable).

use crate::discovery::DiscoveredProvider;
use crate::error::{RuntimeError, RuntimeResult};
use crate::manifest::ProviderManifest;
use runewell_capability_core::{Capability, CapabilityName, CapabilityRegistry, InitContext};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};

/// Registration entry point: wires a provider facade into the registry.
pub type RegistrationFn =
    Arc<dyn Fn(&CapabilityRegistry) -> runewell_capability_core::Result<()> + Send + Sync>;

/// Maps manifest entry-point identifiers to registration functions.
///
/// Provider crates are linked into the host; the manifest names which entry
/// point a package uses, and this table supplies the function.
#[derive(Default, Clone)]
pub struct EntryPointTable {
    entries: HashMap<String, RegistrationFn>,
}

impl EntryPointTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entry point under an identifier.
    pub fn insert<F>(&mut self, entry_point: impl Into<String>, register: F)
    where
        F: Fn(&CapabilityRegistry) -> runewell_capability_core::Result<()> + Send + Sync + 'static,
    {
        self.entries.insert(entry_point.into(), Arc::new(register));
    }

    /// Look up an entry point.
    pub fn get(&self, entry_point: &str) -> Option<&RegistrationFn> {
        self.entries.get(entry_point)
    }
}

/// Lifecycle state of one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    /// Phase one completed; facade is in the registry.
    Registered,
    /// Phase two completed; provider is serving.
    Ready,
    /// A lifecycle phase failed.
    Failed(String),
    /// Provider was shut down and unregistered.
    Shutdown,
}

/// One provider the lifecycle manager tracks.
struct ManagedProvider {
    name: CapabilityName,
    path: PathBuf,
    manifest: ProviderManifest,
    handle: Option<Arc<dyn Capability>>,
    status: ProviderStatus,
}

/// Drives providers through attach, initialize, reload and shutdown.
pub struct LifecycleManager {
    registry: CapabilityRegistry,
    providers: Vec<ManagedProvider>,
}

impl LifecycleManager {
    /// Create a manager over the given registry accessor.
    pub fn new(registry: CapabilityRegistry) -> Self {
        Self {
            registry,
            providers: Vec::new(),
        }
    }

    /// The registry accessor this manager writes through.
    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Phase one: attach every discovered package.
    ///
    /// Returns the number of successfully attached providers. Failures are
    /// logged and recorded; they never abort the host.
    pub fn attach_all(
        &mut self,
        discovered: Vec<DiscoveredProvider>,
        entry_points: &EntryPointTable,
    ) -> usize {
        let mut attached = 0;

        for package in discovered {
            let name = package.manifest.capability_name();
            let entry_point = package.manifest.provider.entry_point.clone();

            let status = match entry_points.get(&entry_point) {
                None => {
                    let err = RuntimeError::UnknownEntryPoint {
                        provider: name.to_string(),
                        entry_point: entry_point.clone(),
                    };
                    warn!("{err}");
                    ProviderStatus::Failed(err.to_string())
                }
                Some(register) => match register(&self.registry) {
                    Err(e) => {
                        warn!(capability = %name, "registration failed: {e}");
                        ProviderStatus::Failed(e.to_string())
                    }
                    Ok(()) if !self.registry.has(&name) => {
                        let reason =
                            format!("entry point '{entry_point}' did not register '{name}'");
                        warn!("{reason}");
                        ProviderStatus::Failed(reason)
                    }
                    Ok(()) => {
                        info!(capability = %name, "registered provider v{}", package.manifest.provider.version);
                        attached += 1;
                        ProviderStatus::Registered
                    }
                },
            };

            let handle = self.registry.get(&name);
            self.providers.push(ManagedProvider {
                name,
                path: package.path,
                manifest: package.manifest,
                handle,
                status,
            });
        }

        attached
    }

    /// Phase two: initialize every registered provider, in attach order.
    ///
    /// Returns the number of providers that reached `Ready`. A failure marks
    /// the provider unusable in the registry and continues with the rest.
    pub async fn initialize_all(&mut self, assets_root: &Path, config_root: &Path) -> usize {
        let mut ready = 0;

        for provider in &mut self.providers {
            if provider.status != ProviderStatus::Registered {
                continue;
            }
            let Some(handle) = provider.handle.clone() else {
                provider.status = ProviderStatus::Failed("no registry handle".to_string());
                continue;
            };

            let span = info_span!("provider", capability = %provider.name);
            info!(
                capability = %provider.name,
                version = %provider.manifest.provider.version,
                "initializing provider"
            );

            let ctx = InitContext::new(assets_root, config_root, self.registry.clone())
                .with_span(span.clone());

            match handle.initialize(&ctx).instrument(span).await {
                Ok(()) => {
                    info!(capability = %provider.name, "provider ready");
                    provider.status = ProviderStatus::Ready;
                    ready += 1;
                }
                Err(e) => {
                    error!(capability = %provider.name, "initialization failed: {e}");
                    self.registry.mark_unusable(&provider.name);
                    provider.status = ProviderStatus::Failed(e.to_string());
                }
            }
        }

        ready
    }

    /// Trigger a reload on one provider, awaiting its completion signal.
    pub async fn reload(&self, name: &CapabilityName) -> RuntimeResult<()> {
        let provider = self
            .providers
            .iter()
            .find(|p| &p.name == name && p.status == ProviderStatus::Ready)
            .and_then(|p| p.handle.clone())
            .ok_or_else(|| RuntimeError::ProviderNotFound(name.to_string()))?;

        provider.reload().await.map_err(RuntimeError::from)
    }

    /// Shut down every ready provider in reverse attach order, unregistering
    /// each facade.
    pub async fn shutdown_all(&mut self) {
        for provider in self.providers.iter_mut().rev() {
            if provider.status != ProviderStatus::Ready
                && provider.status != ProviderStatus::Registered
            {
                continue;
            }
            if let Some(handle) = &provider.handle {
                handle.shutdown().await;
            }
            self.registry.unregister(&provider.name);
            info!(capability = %provider.name, "provider shut down");
            provider.status = ProviderStatus::Shutdown;
        }
    }

    /// Lifecycle status of a provider, if it was discovered.
    pub fn status(&self, name: &CapabilityName) -> Option<&ProviderStatus> {
        self.providers
            .iter()
            .find(|p| &p.name == name)
            .map(|p| &p.status)
    }

    /// Package path of a provider, if it was discovered.
    pub fn package_path(&self, name: &CapabilityName) -> Option<&Path> {
        self.providers
            .iter()
            .find(|p| &p.name == name)
            .map(|p| p.path.as_path())
    }

    /// Names and statuses of every tracked provider, in attach order.
    pub fn statuses(&self) -> Vec<(CapabilityName, ProviderStatus)> {
        self.providers
            .iter()
            .map(|p| (p.name.clone(), p.status.clone()))
            .collect()
    }

    /// Number of providers currently `Ready`.
    pub fn ready_count(&self) -> usize {
        self.providers
            .iter()
            .filter(|p| p.status == ProviderStatus::Ready)
            .count()
    }
}
