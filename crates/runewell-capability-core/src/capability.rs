//! The `Capability` trait and provider initialization context.
//!
//! Providers go through a two-phase lifecycle:
//!
//! 1. **Attach** (package load): the package's registration entry point wires
//!    its facade into the [`CapabilityRegistry`]. This phase must stay
//!    side-effect light.
//! 2. **Initialize** (host startup): [`Capability::initialize`] runs once with
//!    an [`InitContext`], performing heavy setup and the first data-table
//!    load.
//!
//! After that, [`Capability::reload`] may run any number of times and
//! [`Capability::shutdown`] ends the provider's life.

use crate::error::Result;
use crate::name::CapabilityName;
use crate::registry::CapabilityRegistry;
use async_trait::async_trait;
use std::path::PathBuf;

/// Context handed to a provider during phase-two initialization.
///
/// Everything a provider needs is passed in explicitly; providers must not
/// reach for ambient process globals.
#[derive(Clone)]
pub struct InitContext {
    /// Read-only root for bundled assets (data-table sources live here).
    pub assets_root: PathBuf,

    /// Writable root for provider-local configuration and state.
    pub config_root: PathBuf,

    /// Provider-scoped tracing span; enter it for attributable logs.
    pub span: tracing::Span,

    /// Accessor to the sibling registry, for providers that look up peers.
    pub registry: CapabilityRegistry,
}

impl InitContext {
    /// Build a context rooted at the given directories.
    pub fn new(
        assets_root: impl Into<PathBuf>,
        config_root: impl Into<PathBuf>,
        registry: CapabilityRegistry,
    ) -> Self {
        Self {
            assets_root: assets_root.into(),
            config_root: config_root.into(),
            span: tracing::Span::current(),
            registry,
        }
    }

    /// Replace the provider-scoped span.
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }
}

/// A named unit of host-side functionality exposed to the script runtime.
///
/// The trait covers both the host-facing lifecycle and the small, plain
/// facade surface that crosses into script scope. No other host types cross
/// that boundary.
#[async_trait]
pub trait Capability: Send + Sync {
    /// The canonical capability name this provider registers under.
    fn name(&self) -> &CapabilityName;

    /// Short human-readable description.
    fn description(&self) -> &str {
        ""
    }

    /// Phase-two initialization: heavy setup and the first data-table load.
    ///
    /// A failure here marks the provider unusable in the registry; other
    /// providers keep initializing.
    async fn initialize(&self, ctx: &InitContext) -> Result<()>;

    /// Rebuild the provider's data tables, publishing atomically.
    ///
    /// A total reload failure retains the previous tables; the returned
    /// future completing is the reload's completion signal.
    async fn reload(&self) -> Result<()> {
        Ok(())
    }

    /// Release resources. The host unregisters the provider afterwards.
    async fn shutdown(&self) {}

    /// Generate output for a script request (JSON in, JSON out).
    async fn generate(&self, request: serde_json::Value) -> Result<serde_json::Value>;

    /// Provider statistics as a display string.
    fn stats_text(&self) -> String;

    /// Whether a named sub-resource (biome, loot table, ...) exists.
    fn has_resource(&self, name: &str) -> bool;
}
