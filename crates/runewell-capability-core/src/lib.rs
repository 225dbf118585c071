//! # runewell-capability-core
//!
//! Core traits and types for Runewell capability providers.
//!
//! A *capability* is a named unit of host-side functionality (terrain
//! generation, loot rolls, ...) exposed to the embedded script runtime.
//! Providers are packaged independently, so this crate defines the one
//! rendezvous point they all share: the [`CapabilityRegistry`].
//!
//! The registry is deliberately split in two:
//!
//! - [`registry::RegistryStore`]: the single physically shared backing
//!   store, anchored once per process.
//! - [`CapabilityRegistry`]: a thin accessor each provider package
//!   constructs for itself. Every accessor delegates to the same store, so a
//!   capability registered through one package's accessor is visible through
//!   every other package's accessor, regardless of how the packages were
//!   loaded.

pub mod capability;
pub mod error;
pub mod name;
pub mod registry;

pub use capability::{Capability, InitContext};
pub use error::{CapabilityError, Result};
pub use name::CapabilityName;
pub use registry::CapabilityRegistry;

/// Convenience prelude for provider crates.
pub mod prelude {
    pub use crate::capability::{Capability, InitContext};
    pub use crate::error::{CapabilityError, Result};
    pub use crate::name::CapabilityName;
    pub use crate::registry::CapabilityRegistry;
}
