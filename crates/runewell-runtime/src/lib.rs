//! # runewell-runtime
//!
//! Provider packaging runtime for Runewell.
//!
//! This crate provides:
//! - Provider manifest parsing (`provider.toml`)
//! - Provider discovery from the host-configured provider directory
//! - The two-phase provider lifecycle (attach, then initialize)
//! - Atomically reloadable provider data tables
//!
//! ## Package structure
//!
//! A provider package is a directory containing:
//! - `provider.toml` with metadata, entry point and declared dependencies
//! - whatever assets the provider's data tables load at initialize time
//!
//! ## Lifecycle
//!
//! Discovery orders packages so declared dependencies load first. Phase one
//! calls each package's registration entry point, which only wires the
//! provider facade into the registry. Phase two calls `initialize()` on each
//! provider in order; a failure marks that provider unusable and the rest
//! continue.

pub mod discovery;
pub mod error;
pub mod lifecycle;
pub mod manifest;
pub mod table;

pub use discovery::{discover_provider, discover_providers, DiscoveredProvider};
pub use error::{RuntimeError, RuntimeResult};
pub use lifecycle::{EntryPointTable, LifecycleManager, ProviderStatus};
pub use manifest::{Environment, ProviderManifest, ProviderMetadata};
pub use table::{DataTable, ReloadOutcome, TableSnapshot};
