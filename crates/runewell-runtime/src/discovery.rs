//! Provider discovery from the host-configured provider directory.
//!
//! A single directory is scanned at startup; each subdirectory containing a
//! `provider.toml` is a provider package. No manual enumeration: the scan is
//! the source of truth.
//!
//! The returned list is load-ordered: declared dependencies come before their
//! dependents, ties resolved by name so the order is deterministic. A
//! dependency cycle is logged and broken by name order rather than refusing
//! to load.

use crate::error::RuntimeResult;
use crate::manifest::ProviderManifest;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A discovered provider package.
#[derive(Debug, Clone)]
pub struct DiscoveredProvider {
    /// Path to the package directory.
    pub path: PathBuf,

    /// Parsed manifest.
    pub manifest: ProviderManifest,
}

impl DiscoveredProvider {
    /// The capability name this package registers.
    pub fn name(&self) -> String {
        self.manifest.provider.name.clone()
    }
}

/// Discover a single provider package from a path.
pub fn discover_provider(path: &Path) -> RuntimeResult<DiscoveredProvider> {
    let manifest_path = path.join("provider.toml");
    let manifest = ProviderManifest::from_file(&manifest_path)?;

    Ok(DiscoveredProvider {
        path: path.to_path_buf(),
        manifest,
    })
}

/// Discover all provider packages under `dir`, in dependency load order.
///
/// Unreadable packages, duplicate names and providers requiring a newer host
/// are skipped with a warning; discovery itself only fails on IO errors
/// reading the directory listing.
pub fn discover_providers(dir: &Path, host_version: &str) -> RuntimeResult<Vec<DiscoveredProvider>> {
    let mut discovered = Vec::new();
    let mut seen_names: HashSet<String> = HashSet::new();

    if !dir.exists() {
        warn!("provider directory {:?} does not exist", dir);
        return Ok(discovered);
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    paths.sort();

    for path in paths {
        let manifest_path = path.join("provider.toml");
        if !manifest_path.exists() {
            debug!("skipping {:?}: no provider.toml", path);
            continue;
        }

        let manifest = match ProviderManifest::from_file(&manifest_path) {
            Ok(m) => m,
            Err(e) => {
                warn!("failed to load manifest from {:?}: {}", manifest_path, e);
                continue;
            }
        };

        if !manifest.supports_host(host_version) {
            warn!(
                "skipping provider '{}': requires host >= {}, have {}",
                manifest.provider.name,
                manifest.provider.min_host_version.as_deref().unwrap_or("?"),
                host_version
            );
            continue;
        }

        if !seen_names.insert(manifest.provider.name.clone()) {
            warn!(
                "skipping duplicate provider '{}' at {:?}",
                manifest.provider.name, path
            );
            continue;
        }

        info!(
            "discovered provider: {} v{} at {:?}",
            manifest.provider.name, manifest.provider.version, path
        );
        discovered.push(DiscoveredProvider { path, manifest });
    }

    Ok(order_by_dependencies(discovered))
}

/// Stable topological sort: dependencies before dependents, names break ties.
fn order_by_dependencies(discovered: Vec<DiscoveredProvider>) -> Vec<DiscoveredProvider> {
    let mut by_name: BTreeMap<String, DiscoveredProvider> = discovered
        .into_iter()
        .map(|p| (p.name(), p))
        .collect();

    let mut ordered = Vec::with_capacity(by_name.len());
    let mut placed: HashSet<String> = HashSet::new();

    while !by_name.is_empty() {
        // Ready = every declared dependency is already placed or not present
        // in this scan (external dependencies don't block load order).
        let ready: Vec<String> = by_name
            .iter()
            .filter(|(_, p)| {
                p.manifest
                    .provider
                    .dependencies
                    .iter()
                    .all(|dep| placed.contains(dep) || !by_name.contains_key(dep))
            })
            .map(|(name, _)| name.clone())
            .collect();

        if ready.is_empty() {
            // Cycle: break it deterministically by name order.
            let names: Vec<String> = by_name.keys().cloned().collect();
            warn!("dependency cycle among providers {:?}; loading in name order", names);
            for name in names {
                placed.insert(name.clone());
                ordered.push(by_name.remove(&name).expect("key listed above"));
            }
            break;
        }

        for name in ready {
            placed.insert(name.clone());
            ordered.push(by_name.remove(&name).expect("key listed above"));
        }
    }

    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_provider(dir: &Path, dir_name: &str, name: &str, deps: &[&str]) {
        let package_dir = dir.join(dir_name);
        std::fs::create_dir_all(&package_dir).unwrap();

        let deps = deps
            .iter()
            .map(|d| format!("\"{d}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let manifest = format!(
            r#"
[provider]
name = "{name}"
version = "0.1.0"
entry_point = "{}"
dependencies = [{deps}]
"#,
            name.split(':').last().unwrap()
        );

        let mut file = std::fs::File::create(package_dir.join("provider.toml")).unwrap();
        file.write_all(manifest.as_bytes()).unwrap();
    }

    #[test]
    fn test_discover_missing_dir_is_empty() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        let found = discover_providers(&missing, "0.1.0").unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_discover_skips_non_packages() {
        let temp = TempDir::new().unwrap();
        create_test_provider(temp.path(), "terrain", "runewell:terrain", &[]);
        std::fs::create_dir_all(temp.path().join("not-a-package")).unwrap();

        let found = discover_providers(temp.path(), "0.1.0").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name(), "runewell:terrain");
    }

    #[test]
    fn test_duplicate_names_first_wins() {
        let temp = TempDir::new().unwrap();
        create_test_provider(temp.path(), "a-first", "runewell:terrain", &[]);
        create_test_provider(temp.path(), "b-second", "runewell:terrain", &[]);

        let found = discover_providers(temp.path(), "0.1.0").unwrap();
        assert_eq!(found.len(), 1);
        assert!(found[0].path.ends_with("a-first"));
    }

    #[test]
    fn test_dependencies_order_load() {
        let temp = TempDir::new().unwrap();
        create_test_provider(temp.path(), "loot", "runewell:loot", &["runewell:terrain"]);
        create_test_provider(temp.path(), "terrain", "runewell:terrain", &[]);

        let found = discover_providers(temp.path(), "0.1.0").unwrap();
        let names: Vec<String> = found.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["runewell:terrain", "runewell:loot"]);
    }

    #[test]
    fn test_external_dependency_does_not_block() {
        let temp = TempDir::new().unwrap();
        create_test_provider(temp.path(), "loot", "runewell:loot", &["other:mod"]);

        let found = discover_providers(temp.path(), "0.1.0").unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_cycle_breaks_by_name_order() {
        let temp = TempDir::new().unwrap();
        create_test_provider(temp.path(), "a", "runewell:alpha", &["runewell:beta"]);
        create_test_provider(temp.path(), "b", "runewell:beta", &["runewell:alpha"]);

        let found = discover_providers(temp.path(), "0.1.0").unwrap();
        let names: Vec<String> = found.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["runewell:alpha", "runewell:beta"]);
    }

    #[test]
    fn test_host_version_gate() {
        let temp = TempDir::new().unwrap();
        let package_dir = temp.path().join("future");
        std::fs::create_dir_all(&package_dir).unwrap();
        std::fs::write(
            package_dir.join("provider.toml"),
            r#"
[provider]
name = "runewell:future"
version = "1.0.0"
entry_point = "future"
min_host_version = "99.0.0"
"#,
        )
        .unwrap();

        let found = discover_providers(temp.path(), "0.1.0").unwrap();
        assert!(found.is_empty());
    }
}
