//! Host configuration loading.
//!
//! The host reads a single `runewell.toml`. A missing file is not an error;
//! the caller falls back to [`HostConfig::default`]. A present but malformed
//! file is an error, never a silent fallback.

use anyhow::{Context, Result};
use runewell_capability_core::CapabilityName;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level host configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostConfig {
    /// Host process settings
    #[serde(default)]
    pub host: HostSection,
    /// Script-side capability resolution settings
    #[serde(default)]
    pub script: ScriptSection,
}

/// Process-level settings: roots and logging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostSection {
    /// Log level (trace, debug, info, warn, error)
    /// Default: "info"
    pub log_level: String,
    /// Directory scanned for provider packages
    /// Default: "providers"
    pub provider_dir: PathBuf,
    /// Root of provider data tables
    /// Default: "assets"
    pub assets_root: PathBuf,
    /// Root of per-provider configuration
    /// Default: "config"
    pub config_root: PathBuf,
}

/// Settings for the script readiness and resolution machinery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScriptSection {
    /// Capabilities that must be bound into script scope before the host
    /// proceeds. Resolution of this set is all-or-fatal.
    pub required: Vec<String>,
    /// Hard deadline for resolving the required set, in milliseconds
    /// Default: 10000
    pub resolve_timeout_ms: u64,
    /// Resolver poll cadence, in milliseconds
    /// Default: 25
    pub resolve_poll_ms: u64,
    /// Readiness precondition poll cadence, in milliseconds
    /// Default: 100
    pub readiness_poll_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            host: HostSection::default(),
            script: ScriptSection::default(),
        }
    }
}

impl Default for HostSection {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            provider_dir: PathBuf::from("providers"),
            assets_root: PathBuf::from("assets"),
            config_root: PathBuf::from("config"),
        }
    }
}

impl Default for ScriptSection {
    fn default() -> Self {
        Self {
            required: vec![
                provider_terrain::CAPABILITY_NAME.to_string(),
                provider_loot::CAPABILITY_NAME.to_string(),
            ],
            resolve_timeout_ms: 10_000,
            resolve_poll_ms: 25,
            readiness_poll_ms: 100,
        }
    }
}

impl HostConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: HostConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.host.log_level.as_str()) {
            anyhow::bail!(
                "Invalid log_level: {}. Must be one of: {}",
                self.host.log_level,
                valid_log_levels.join(", ")
            );
        }

        if self.host.provider_dir.as_os_str().is_empty() {
            anyhow::bail!("host.provider_dir cannot be empty");
        }

        if self.script.resolve_timeout_ms == 0 {
            anyhow::bail!("script.resolve_timeout_ms must be greater than 0");
        }
        if self.script.resolve_poll_ms == 0 {
            anyhow::bail!("script.resolve_poll_ms must be greater than 0");
        }
        if self.script.readiness_poll_ms == 0 {
            anyhow::bail!("script.readiness_poll_ms must be greater than 0");
        }

        for name in &self.script.required {
            CapabilityName::new(name)
                .with_context(|| format!("Invalid required capability name: {name}"))?;
        }

        Ok(())
    }

    /// The required capability set as parsed names.
    ///
    /// Infallible after `validate()`; names that fail to parse are dropped.
    pub fn required_capabilities(&self) -> Vec<CapabilityName> {
        self.script
            .required
            .iter()
            .filter_map(|name| CapabilityName::new(name).ok())
            .collect()
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.script.resolve_timeout_ms)
    }

    pub fn resolve_poll(&self) -> Duration {
        Duration::from_millis(self.script.resolve_poll_ms)
    }

    pub fn readiness_poll(&self) -> Duration {
        Duration::from_millis(self.script.readiness_poll_ms)
    }
}
