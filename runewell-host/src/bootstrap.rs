//! Host startup wiring.
//!
//! Assembles the pieces in order: registry accessor, package discovery and
//! the two lifecycle phases, script globals, the readiness broadcaster, and
//! finally the bounded capability resolution that gates the host on its
//! required capability set.

use crate::config::HostConfig;
use anyhow::{Context, Result};
use runewell_capability_core::{CapabilityName, CapabilityRegistry};
use runewell_runtime::{discover_providers, EntryPointTable, LifecycleManager};
use runewell_script_api::{
    CapabilityResolver, ReadinessBroadcaster, ScriptObject, ScriptScope, ScriptValue,
};
use tracing::{info, warn};

/// Version advertised to provider manifests for `min_host_version` checks.
pub const HOST_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Entry points for the provider crates linked into this host.
pub fn builtin_entry_points() -> EntryPointTable {
    let mut table = EntryPointTable::new();
    table.insert("terrain", provider_terrain::register);
    table.insert("loot", provider_loot::register);
    table
}

/// A running host: the lifecycle manager plus the script-side machinery.
pub struct Host {
    pub registry: CapabilityRegistry,
    pub lifecycle: LifecycleManager,
    pub scope: ScriptScope,
    pub readiness: ReadinessBroadcaster,
}

impl Host {
    /// Bring the host up over the given registry accessor.
    ///
    /// Runs both lifecycle phases, installs the script globals, spawns the
    /// readiness poll and awaits the Ready transition, then resolves the
    /// required capability set within the configured deadline. Resolution is
    /// all-or-fatal; a partial set aborts startup.
    pub async fn start(config: &HostConfig, registry: CapabilityRegistry) -> Result<Self> {
        let discovered = if config.host.provider_dir.is_dir() {
            discover_providers(&config.host.provider_dir, HOST_VERSION)
                .with_context(|| {
                    format!(
                        "provider discovery failed in {}",
                        config.host.provider_dir.display()
                    )
                })?
        } else {
            warn!(
                "provider directory {} does not exist; only builtin packages load",
                config.host.provider_dir.display()
            );
            Vec::new()
        };
        info!("discovered {} provider package(s)", discovered.len());

        let mut lifecycle = LifecycleManager::new(registry.clone());
        let attached = lifecycle.attach_all(discovered, &builtin_entry_points());
        info!("attached {attached} provider(s)");

        let ready = lifecycle
            .initialize_all(&config.host.assets_root, &config.host.config_root)
            .await;
        info!("{ready} provider(s) ready");

        let scope = ScriptScope::new();
        install_script_globals(&scope, &registry);

        let readiness = ReadinessBroadcaster::with_poll_interval(config.readiness_poll());
        readiness.install_bindings(&scope);
        // Detached; the task exits on its own at the Ready transition.
        let _poll = readiness.spawn(scope.clone());
        readiness.wait_ready().await;

        let required = config.required_capabilities();
        detect_capabilities(&registry, &required);

        let resolver = CapabilityResolver::new(registry.clone(), scope.clone())
            .with_poll_interval(config.resolve_poll());
        resolver
            .resolve(&required, config.resolve_timeout())
            .await
            .context("required capability set did not resolve")?;

        Ok(Self {
            registry,
            lifecycle,
            scope,
            readiness,
        })
    }

    /// Shut every provider down and unregister it.
    pub async fn shutdown(&mut self) {
        self.lifecycle.shutdown_all().await;
    }
}

/// Install the globals the embedded scripts see: the host API handle, the
/// filesystem shim, and the interop object the resolver probes for.
pub fn install_script_globals(scope: &ScriptScope, registry: &CapabilityRegistry) {
    let host = ScriptObject::new("host");
    host.set("version", ScriptValue::Str(HOST_VERSION.to_string()));
    let stats_registry = registry.clone();
    host.set(
        "stats",
        ScriptValue::function(move |_args| {
            let lines: Vec<String> = stats_registry
                .list()
                .iter()
                .filter_map(|name| stats_registry.get(name))
                .map(|provider| format!("{}: {}", provider.name(), provider.stats_text()))
                .collect();
            Ok(ScriptValue::Str(lines.join("\n")))
        }),
    );
    scope.set("host", ScriptValue::Object(host));

    let fs = ScriptObject::new("fs");
    fs.set(
        "read",
        ScriptValue::function(|args| {
            let path = args.first().and_then(|v| v.as_str()).ok_or_else(|| {
                runewell_script_api::ScriptError::BadArgument(
                    "fs.read expects a path string".to_string(),
                )
            })?;
            let content = std::fs::read_to_string(path).map_err(|e| {
                runewell_script_api::ScriptError::BadArgument(format!("fs.read {path}: {e}"))
            })?;
            Ok(ScriptValue::Str(content))
        }),
    );
    scope.set("fs", ScriptValue::Object(fs));

    let interop = ScriptObject::new("interop");
    let lookup = registry.clone();
    interop.set(
        "resolve_type",
        ScriptValue::function(move |args| {
            let name = args
                .first()
                .and_then(|v| v.as_str())
                .and_then(|s| CapabilityName::new(s).ok());
            match name.and_then(|n| lookup.get(&n)) {
                Some(provider) => Ok(ScriptValue::Capability(provider)),
                None => Ok(ScriptValue::Unit),
            }
        }),
    );
    scope.set("interop", ScriptValue::Object(interop));
}

/// Log which of the required capabilities are already serving. Purely
/// informational; the resolver does the authoritative bounded wait.
fn detect_capabilities(registry: &CapabilityRegistry, required: &[CapabilityName]) {
    info!("capability detection started");
    for name in required {
        if registry.get(name).is_some() {
            info!("capability available: {name}");
        } else {
            warn!("capability missing: {name}");
        }
    }
    info!("capability detection complete");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_entry_points_register() {
        let table = builtin_entry_points();
        let registry = CapabilityRegistry::isolated();

        table.get("terrain").unwrap()(&registry).unwrap();
        table.get("loot").unwrap()(&registry).unwrap();
        assert!(table.get("weather").is_none());
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn test_script_globals() {
        let registry = CapabilityRegistry::isolated();
        let scope = ScriptScope::new();
        install_script_globals(&scope, &registry);

        assert!(scope.has("host"));
        assert!(scope.has("fs"));
        assert!(scope.has("interop"));

        let host = scope.get("host").unwrap();
        let version = host.as_object().unwrap().get("version").unwrap();
        assert_eq!(version.as_str(), Some(HOST_VERSION));
    }

    #[test]
    fn test_interop_resolves_registered_capability() {
        let registry = CapabilityRegistry::isolated();
        provider_terrain::register(&registry).unwrap();
        let scope = ScriptScope::new();
        install_script_globals(&scope, &registry);

        let interop = scope.get("interop").unwrap();
        let resolve = interop.as_object().unwrap().get("resolve_type").unwrap();
        let resolve = resolve.as_function().unwrap();

        let hit = resolve(&[ScriptValue::Str(
            provider_terrain::CAPABILITY_NAME.to_string(),
        )])
        .unwrap();
        assert!(matches!(hit, ScriptValue::Capability(_)));

        let miss = resolve(&[ScriptValue::Str("runewell:weather".to_string())]).unwrap();
        assert!(matches!(miss, ScriptValue::Unit));
    }
}
