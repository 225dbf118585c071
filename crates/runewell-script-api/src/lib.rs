//! # runewell-script-api
//!
//! The bridge between the Runewell host and its embedded script runtime.
//!
//! This crate provides:
//! - A minimal dynamic value model and global scope ([`value`], [`scope`])
//! - The host↔script readiness handshake ([`readiness`])
//! - The global-object prober that locates a native-interop handle under an
//!   unknown binding ([`probe`])
//! - The bounded-wait capability resolver that injects registry entries into
//!   script globals ([`resolver`])
//!
//! The script runtime runs as a single logical thread; everything here that
//! waits does so with timer-driven deferred rechecks (`tokio::time::sleep`),
//! never by blocking that thread.

pub mod error;
pub mod probe;
pub mod readiness;
pub mod resolver;
pub mod scope;
pub mod value;

pub use error::ScriptError;
pub use probe::{probe, InteropHandle, ProbeStrategy};
pub use readiness::ReadinessBroadcaster;
pub use resolver::{CapabilityResolver, ResolveError};
pub use scope::ScriptScope;
pub use value::{NativeFn, ScriptObject, ScriptValue};
