//! Global-object prober.
//!
//! Scripts need a native-interop handle ("resolve a native type by name"),
//! but the binding name it hides under varies between host builds. The
//! prober runs a ranked list of strategies, stopping at the first success,
//! and normalizes whatever it finds behind one [`InteropHandle`] so callers
//! never branch on which variant was found.
//!
//! Finding nothing is logged and non-fatal by itself; the resolver decides
//! whether the absence is fatal.

use crate::scope::ScriptScope;
use crate::value::{ScriptObject, ScriptValue};
use tracing::{debug, info, warn};

/// Well-known direct global checked first.
pub const DIRECT_GLOBAL: &str = "interop";

/// Import-style resolver global.
pub const IMPORT_RESOLVER: &str = "require";

/// Module name requested through the import-style resolver.
pub const IMPORT_MODULE: &str = "runewell.interop";

/// Root objects scanned for a child literally named [`DIRECT_GLOBAL`].
pub const SCAN_ROOTS: [&str; 3] = ["host", "runtime", "engine"];

/// Maximum property depth of the root-object scan.
pub const SCAN_DEPTH: usize = 2;

/// Generic module-resolution function global.
pub const MODULE_RESOLVER: &str = "load_module";

/// Module names speculatively queried through [`MODULE_RESOLVER`].
pub const MODULE_NAMES: [&str; 3] = ["runewell.interop", "host.native", "native"];

/// Conventionally named, possibly non-enumerable single global.
pub const HIDDEN_GLOBAL: &str = "__interop";

/// Coarse namespace object used for the last-resort wrapper.
pub const FALLBACK_NAMESPACE: &str = "host";

/// Method names meaning "resolve a type by fully-qualified name", in
/// normalization priority order.
pub const RESOLVE_METHOD_NAMES: [&str; 3] = ["resolve_type", "find_type", "import_type"];

/// The ordered probe strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStrategy {
    /// Fixed well-known direct global.
    DirectGlobal,
    /// Import-style resolver queried with a well-known module name.
    ImportResolver,
    /// Depth-bounded scan of well-known root objects.
    RootScan,
    /// Generic module-resolution function over fixed module names.
    ModuleResolver,
    /// Conventionally named, possibly non-enumerable global.
    HiddenGlobal,
    /// Coarse host namespace with a synthesized wrapper.
    NamespaceFallback,
}

const STRATEGY_ORDER: [ProbeStrategy; 6] = [
    ProbeStrategy::DirectGlobal,
    ProbeStrategy::ImportResolver,
    ProbeStrategy::RootScan,
    ProbeStrategy::ModuleResolver,
    ProbeStrategy::HiddenGlobal,
    ProbeStrategy::NamespaceFallback,
];

enum HandleKind {
    /// A duck-typed object with a canonical resolve method.
    Method {
        object: ScriptObject,
        method: &'static str,
    },
    /// Synthesized wrapper over a coarse namespace object.
    Namespace(ScriptObject),
}

/// Normalized native-interop handle.
///
/// Whichever strategy and method variant produced it, callers use one
/// `resolve` operation.
pub struct InteropHandle {
    kind: HandleKind,
    strategy: ProbeStrategy,
}

impl InteropHandle {
    /// Resolve a native type (capability facade) by fully-qualified name.
    pub fn resolve(&self, name: &str) -> Option<ScriptValue> {
        match &self.kind {
            HandleKind::Method { object, method } => {
                match object.call(method, &[ScriptValue::Str(name.to_string())]) {
                    Ok(value) if !value.is_unit() => Some(value),
                    Ok(_) => None,
                    Err(e) => {
                        debug!("interop resolve('{name}') failed: {e}");
                        None
                    }
                }
            }
            HandleKind::Namespace(namespace) => namespace.get_any(name),
        }
    }

    /// Which strategy located this handle.
    pub fn strategy(&self) -> ProbeStrategy {
        self.strategy
    }

    /// Canonical resolve method name, when one was duck-typed.
    pub fn method(&self) -> Option<&'static str> {
        match &self.kind {
            HandleKind::Method { method, .. } => Some(method),
            HandleKind::Namespace(_) => None,
        }
    }
}

/// Duck-type predicate: does this object expose a resolve-type method?
///
/// Returns the canonical method name, chosen by fixed priority when several
/// variants are present.
fn duck_type(object: &ScriptObject) -> Option<&'static str> {
    RESOLVE_METHOD_NAMES
        .iter()
        .find(|method| matches!(object.get_any(method), Some(ScriptValue::Function(_))))
        .copied()
}

fn method_handle(object: ScriptObject, strategy: ProbeStrategy) -> Option<InteropHandle> {
    duck_type(&object).map(|method| InteropHandle {
        kind: HandleKind::Method { object, method },
        strategy,
    })
}

/// Probe the scope for a native-interop handle, logging the outcome.
pub fn probe(scope: &ScriptScope) -> Option<InteropHandle> {
    match try_probe(scope) {
        Some(handle) => {
            info!(
                "located native interop handle via {:?} (method: {})",
                handle.strategy(),
                handle.method().unwrap_or("<namespace>")
            );
            Some(handle)
        }
        None => {
            warn!("native interop handle not found in script scope");
            None
        }
    }
}

/// Probe without logging the not-found case. Used by retry loops.
pub fn try_probe(scope: &ScriptScope) -> Option<InteropHandle> {
    STRATEGY_ORDER
        .iter()
        .find_map(|&strategy| run_strategy(strategy, scope))
}

fn run_strategy(strategy: ProbeStrategy, scope: &ScriptScope) -> Option<InteropHandle> {
    match strategy {
        ProbeStrategy::DirectGlobal => {
            let object = scope.get(DIRECT_GLOBAL)?.as_object()?.clone();
            method_handle(object, strategy)
        }
        ProbeStrategy::ImportResolver => {
            let resolver = scope.get(IMPORT_RESOLVER)?.as_function()?.clone();
            let value = resolver(&[ScriptValue::Str(IMPORT_MODULE.to_string())]).ok()?;
            method_handle(value.as_object()?.clone(), strategy)
        }
        ProbeStrategy::RootScan => SCAN_ROOTS.iter().find_map(|root| {
            let object = scope.get_any(root)?.as_object()?.clone();
            scan_for_child(&object, SCAN_DEPTH).and_then(|found| method_handle(found, strategy))
        }),
        ProbeStrategy::ModuleResolver => {
            let resolver = scope.get(MODULE_RESOLVER)?.as_function()?.clone();
            MODULE_NAMES.iter().find_map(|module| {
                let value = resolver(&[ScriptValue::Str(module.to_string())]).ok()?;
                method_handle(value.as_object()?.clone(), strategy)
            })
        }
        ProbeStrategy::HiddenGlobal => {
            let object = scope.get_any(HIDDEN_GLOBAL)?.as_object()?.clone();
            method_handle(object, strategy)
        }
        ProbeStrategy::NamespaceFallback => {
            let namespace = scope.get_any(FALLBACK_NAMESPACE)?.as_object()?.clone();
            debug!("synthesizing interop wrapper over '{FALLBACK_NAMESPACE}' namespace");
            Some(InteropHandle {
                kind: HandleKind::Namespace(namespace),
                strategy,
            })
        }
    }
}

/// Depth-bounded search of enumerable and non-enumerable properties for a
/// child literally named [`DIRECT_GLOBAL`] that passes the duck-type test.
fn scan_for_child(object: &ScriptObject, depth: usize) -> Option<ScriptObject> {
    if depth == 0 {
        return None;
    }

    for key in object.all_keys() {
        let Some(ScriptValue::Object(child)) = object.get_any(&key) else {
            continue;
        };
        if key == DIRECT_GLOBAL && duck_type(&child).is_some() {
            return Some(child);
        }
        if let Some(found) = scan_for_child(&child, depth - 1) {
            return Some(found);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScriptError;
    use std::sync::Arc;

    fn interop_object(method: &str) -> ScriptObject {
        let object = ScriptObject::new("interop");
        object.set(
            method,
            ScriptValue::function(|args| match args {
                [ScriptValue::Str(name)] if name == "runewell:terrain" => {
                    Ok(ScriptValue::Str("resolved".to_string()))
                }
                [ScriptValue::Str(_)] => Ok(ScriptValue::Unit),
                _ => Err(ScriptError::BadArgument("expected a name".to_string())),
            }),
        );
        object
    }

    #[test]
    fn test_direct_global_wins() {
        let scope = ScriptScope::new();
        scope.set("interop", ScriptValue::Object(interop_object("resolve_type")));

        let handle = probe(&scope).unwrap();
        assert_eq!(handle.strategy(), ProbeStrategy::DirectGlobal);
        assert_eq!(handle.method(), Some("resolve_type"));
        assert!(handle.resolve("runewell:terrain").is_some());
        assert!(handle.resolve("runewell:missing").is_none());
    }

    #[test]
    fn test_duck_type_priority_order() {
        let object = ScriptObject::new("interop");
        object.set("import_type", ScriptValue::function(|_| Ok(ScriptValue::Unit)));
        object.set("find_type", ScriptValue::function(|_| Ok(ScriptValue::Unit)));
        // find_type outranks import_type; resolve_type is absent.
        assert_eq!(duck_type(&object), Some("find_type"));
    }

    #[test]
    fn test_direct_global_without_methods_is_skipped() {
        let scope = ScriptScope::new();
        scope.set("interop", ScriptValue::Object(ScriptObject::new("empty")));
        assert!(try_probe(&scope).is_none());
    }

    #[test]
    fn test_import_resolver() {
        let scope = ScriptScope::new();
        let module = interop_object("find_type");
        scope.set(
            "require",
            ScriptValue::function(move |args| match args {
                [ScriptValue::Str(name)] if name == IMPORT_MODULE => {
                    Ok(ScriptValue::Object(module.clone()))
                }
                _ => Err(ScriptError::BadArgument("unknown module".to_string())),
            }),
        );

        let handle = probe(&scope).unwrap();
        assert_eq!(handle.strategy(), ProbeStrategy::ImportResolver);
        assert_eq!(handle.method(), Some("find_type"));
    }

    #[test]
    fn test_root_scan_finds_nested_non_enumerable_child() {
        let scope = ScriptScope::new();
        let runtime = ScriptObject::new("runtime");
        let natives = ScriptObject::new("natives");
        natives.set_hidden("interop", ScriptValue::Object(interop_object("resolve_type")));
        runtime.set("natives", ScriptValue::Object(natives));
        scope.set("runtime", ScriptValue::Object(runtime));

        let handle = probe(&scope).unwrap();
        assert_eq!(handle.strategy(), ProbeStrategy::RootScan);
    }

    #[test]
    fn test_root_scan_respects_depth_bound() {
        let scope = ScriptScope::new();
        let runtime = ScriptObject::new("runtime");
        let a = ScriptObject::new("a");
        let b = ScriptObject::new("b");
        // Depth 3 from the root: beyond the bound.
        b.set("interop", ScriptValue::Object(interop_object("resolve_type")));
        a.set("b", ScriptValue::Object(b));
        runtime.set("a", ScriptValue::Object(a));
        scope.set("runtime", ScriptValue::Object(runtime));

        assert!(try_probe(&scope).is_none());
    }

    #[test]
    fn test_module_resolver_tries_fixed_names() {
        let scope = ScriptScope::new();
        let module = interop_object("import_type");
        let calls = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen = Arc::clone(&calls);
        scope.set(
            "load_module",
            ScriptValue::function(move |args| {
                let name = args[0].as_str().unwrap_or_default().to_string();
                seen.lock().push(name.clone());
                if name == "host.native" {
                    Ok(ScriptValue::Object(module.clone()))
                } else {
                    Err(ScriptError::BadArgument("no such module".to_string()))
                }
            }),
        );

        let handle = probe(&scope).unwrap();
        assert_eq!(handle.strategy(), ProbeStrategy::ModuleResolver);
        assert_eq!(*calls.lock(), vec!["runewell.interop", "host.native"]);
    }

    #[test]
    fn test_hidden_global() {
        let scope = ScriptScope::new();
        scope.set_hidden("__interop", ScriptValue::Object(interop_object("resolve_type")));

        let handle = probe(&scope).unwrap();
        assert_eq!(handle.strategy(), ProbeStrategy::HiddenGlobal);
    }

    #[test]
    fn test_namespace_fallback_synthesizes_wrapper() {
        let scope = ScriptScope::new();
        let host = ScriptObject::new("host");
        host.set("runewell:terrain", ScriptValue::Str("facade".to_string()));
        scope.set("host", ScriptValue::Object(host));

        let handle = probe(&scope).unwrap();
        assert_eq!(handle.strategy(), ProbeStrategy::NamespaceFallback);
        assert_eq!(handle.method(), None);
        assert!(handle.resolve("runewell:terrain").is_some());
        assert!(handle.resolve("runewell:missing").is_none());
    }

    #[test]
    fn test_empty_scope_finds_nothing() {
        assert!(probe(&ScriptScope::new()).is_none());
    }
}
