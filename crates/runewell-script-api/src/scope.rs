//! The script-global scope.
//!
//! One scope exists per embedded script runtime. Host-side tasks (readiness
//! polling, capability injection) and the script logical thread both touch
//! it, so reads and writes go through short-lived locks inside
//! [`ScriptObject`]; no caller ever holds a lock across an await point.

use crate::value::{ScriptObject, ScriptValue};
use runewell_capability_core::{Capability, CapabilityName};
use std::sync::Arc;

/// Global bindings of the embedded script runtime.
#[derive(Clone)]
pub struct ScriptScope {
    root: ScriptObject,
}

impl Default for ScriptScope {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptScope {
    /// Create an empty scope.
    pub fn new() -> Self {
        Self {
            root: ScriptObject::new("globals"),
        }
    }

    /// Bind a global under a name.
    pub fn set(&self, name: impl Into<String>, value: ScriptValue) {
        self.root.set(name, value);
    }

    /// Bind a non-enumerable global.
    pub fn set_hidden(&self, name: impl Into<String>, value: ScriptValue) {
        self.root.set_hidden(name, value);
    }

    /// Look up an enumerable global.
    pub fn get(&self, name: &str) -> Option<ScriptValue> {
        self.root.get(name)
    }

    /// Look up a global, including non-enumerable names.
    pub fn get_any(&self, name: &str) -> Option<ScriptValue> {
        self.root.get_any(name)
    }

    /// Whether a global (enumerable or not) is bound.
    pub fn has(&self, name: &str) -> bool {
        self.root.get_any(name).is_some()
    }

    /// Bind a capability facade under its canonical name.
    ///
    /// Re-binding the same provider is harmless; the resolver relies on that
    /// for idempotent, concurrently-safe injection.
    pub fn bind_capability(&self, name: &CapabilityName, provider: Arc<dyn Capability>) {
        self.root
            .set(name.as_str(), ScriptValue::Capability(provider));
    }

    /// Enumerable global names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.root.keys()
    }
}
