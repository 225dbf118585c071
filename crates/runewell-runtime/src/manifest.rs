//! Provider manifest parsing.
//!
//! Each provider package carries a `provider.toml` describing its metadata,
//! entry point, declared dependencies and host-version constraint. The host
//! loader consumes manifests for discovery order only; schema validation
//! beyond structural checks is out of scope.

use crate::error::{RuntimeError, RuntimeResult};
use runewell_capability_core::CapabilityName;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Provider manifest structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderManifest {
    /// Provider metadata.
    pub provider: ProviderMetadata,

    /// Custom configuration key-value pairs.
    #[serde(default)]
    pub config: HashMap<String, toml::Value>,
}

/// Provider metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Capability name this provider registers under (`namespace:path`).
    pub name: String,

    /// Version string (semver).
    pub version: String,

    /// Identifier of the registration entry point inside the package.
    pub entry_point: String,

    /// Provider description.
    #[serde(default)]
    pub description: Option<String>,

    /// Provider author(s).
    #[serde(default)]
    pub authors: Vec<String>,

    /// Capability names this provider depends on; they load first.
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Minimum host version this provider supports.
    #[serde(default)]
    pub min_host_version: Option<String>,

    /// Execution environment the provider targets.
    #[serde(default = "default_environment")]
    pub environment: Environment,
}

fn default_environment() -> Environment {
    Environment::Universal
}

/// Execution environment tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    /// Runs on the dedicated/integrated server side only.
    Server,
    /// Runs on the client side only.
    Client,
    /// Runs everywhere.
    Universal,
}

impl ProviderManifest {
    /// Load a manifest from a TOML file.
    pub fn from_file(path: &Path) -> RuntimeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse a manifest from a TOML string.
    pub fn parse(content: &str) -> RuntimeResult<Self> {
        let manifest: ProviderManifest = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate the manifest structurally.
    fn validate(&self) -> RuntimeResult<()> {
        if self.provider.name.is_empty() {
            return Err(RuntimeError::InvalidManifest(
                "provider name cannot be empty".to_string(),
            ));
        }

        CapabilityName::new(&self.provider.name)
            .map_err(|e| RuntimeError::InvalidManifest(e.to_string()))?;

        if self.provider.version.is_empty() {
            return Err(RuntimeError::InvalidManifest(
                "provider version cannot be empty".to_string(),
            ));
        }

        if self.provider.entry_point.is_empty() {
            return Err(RuntimeError::InvalidManifest(
                "provider entry_point cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// The validated capability name.
    pub fn capability_name(&self) -> CapabilityName {
        // validate() already ran in every constructor.
        CapabilityName::new(&self.provider.name).expect("manifest name validated at parse time")
    }

    /// Whether the given host version satisfies `min_host_version`.
    ///
    /// Versions compare as dotted numeric triples; missing segments count as
    /// zero, and an unparseable constraint is treated as unsatisfied.
    pub fn supports_host(&self, host_version: &str) -> bool {
        match &self.provider.min_host_version {
            None => true,
            Some(min) => match (parse_version(host_version), parse_version(min)) {
                (Some(host), Some(min)) => host >= min,
                _ => false,
            },
        }
    }
}

fn parse_version(raw: &str) -> Option<(u64, u64, u64)> {
    let mut parts = raw.trim().splitn(3, '.');
    let mut next = |default| match parts.next() {
        None => Some(default),
        Some(p) => p.parse::<u64>().ok(),
    };
    Some((next(0)?, next(0)?, next(0)?))
}
