//! Minimal dynamic value model for script scope.
//!
//! The host does not own a full interpreter here; it owns the boundary. The
//! model covers exactly what crosses it: plain data, native functions, duck-
//! typeable objects with enumerable and non-enumerable properties, and bound
//! capability facades.

use crate::error::ScriptError;
use parking_lot::RwLock;
use runewell_capability_core::Capability;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A host function callable from script values.
pub type NativeFn = Arc<dyn Fn(&[ScriptValue]) -> Result<ScriptValue, ScriptError> + Send + Sync>;

/// A dynamically typed script value.
#[derive(Clone)]
pub enum ScriptValue {
    /// Absence of a value.
    Unit,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// String.
    Str(String),
    /// Structured data crossing the facade boundary.
    Json(serde_json::Value),
    /// A callable host function.
    Function(NativeFn),
    /// A property-bag object.
    Object(ScriptObject),
    /// A bound capability facade.
    Capability(Arc<dyn Capability>),
}

impl ScriptValue {
    /// Wrap a native function.
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&[ScriptValue]) -> Result<ScriptValue, ScriptError> + Send + Sync + 'static,
    {
        ScriptValue::Function(Arc::new(f))
    }

    /// View as an object, if it is one.
    pub fn as_object(&self) -> Option<&ScriptObject> {
        match self {
            ScriptValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// View as a callable, if it is one.
    pub fn as_function(&self) -> Option<&NativeFn> {
        match self {
            ScriptValue::Function(f) => Some(f),
            _ => None,
        }
    }

    /// View as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this value is `Unit`.
    pub fn is_unit(&self) -> bool {
        matches!(self, ScriptValue::Unit)
    }
}

impl fmt::Debug for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Unit => write!(f, "Unit"),
            ScriptValue::Bool(b) => write!(f, "Bool({b})"),
            ScriptValue::Int(i) => write!(f, "Int({i})"),
            ScriptValue::Str(s) => write!(f, "Str({s:?})"),
            ScriptValue::Json(v) => write!(f, "Json({v})"),
            ScriptValue::Function(_) => write!(f, "Function(..)"),
            ScriptValue::Object(obj) => write!(f, "Object({})", obj.label()),
            ScriptValue::Capability(c) => write!(f, "Capability({})", c.name()),
        }
    }
}

struct ObjectInner {
    label: String,
    /// Enumerable properties, visible to key listings.
    props: RwLock<HashMap<String, ScriptValue>>,
    /// Non-enumerable properties, reachable only by direct name.
    hidden: RwLock<HashMap<String, ScriptValue>>,
}

/// A shared, property-bag script object.
///
/// Clones share state, matching reference semantics of objects inside a
/// dynamic runtime.
#[derive(Clone)]
pub struct ScriptObject {
    inner: Arc<ObjectInner>,
}

impl ScriptObject {
    /// Create an empty object with a debug label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ObjectInner {
                label: label.into(),
                props: RwLock::new(HashMap::new()),
                hidden: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// The debug label.
    pub fn label(&self) -> String {
        self.inner.label.clone()
    }

    /// Set an enumerable property.
    pub fn set(&self, key: impl Into<String>, value: ScriptValue) {
        self.inner.props.write().insert(key.into(), value);
    }

    /// Set a non-enumerable property.
    pub fn set_hidden(&self, key: impl Into<String>, value: ScriptValue) {
        self.inner.hidden.write().insert(key.into(), value);
    }

    /// Builder-style enumerable property.
    pub fn with(self, key: impl Into<String>, value: ScriptValue) -> Self {
        self.set(key, value);
        self
    }

    /// Get an enumerable property.
    pub fn get(&self, key: &str) -> Option<ScriptValue> {
        self.inner.props.read().get(key).cloned()
    }

    /// Get a property, checking enumerable then non-enumerable names.
    pub fn get_any(&self, key: &str) -> Option<ScriptValue> {
        self.get(key)
            .or_else(|| self.inner.hidden.read().get(key).cloned())
    }

    /// Enumerable property names, sorted for determinism.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.inner.props.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Every property name including non-enumerable ones, sorted.
    pub fn all_keys(&self) -> Vec<String> {
        let props = self.inner.props.read();
        let hidden = self.inner.hidden.read();
        let mut keys: Vec<String> = props.keys().chain(hidden.keys()).cloned().collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Whether two handles refer to the same object.
    pub fn same_object(&self, other: &ScriptObject) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Call a method-valued property with arguments.
    pub fn call(&self, method: &str, args: &[ScriptValue]) -> Result<ScriptValue, ScriptError> {
        match self.get_any(method) {
            Some(ScriptValue::Function(f)) => f(args),
            _ => Err(ScriptError::NotCallable(format!(
                "{}.{method}",
                self.label()
            ))),
        }
    }
}

impl fmt::Debug for ScriptObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScriptObject({}, keys: {:?})", self.label(), self.keys())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_properties() {
        let obj = ScriptObject::new("test");
        obj.set("visible", ScriptValue::Int(1));
        obj.set_hidden("__secret", ScriptValue::Int(2));

        assert!(obj.get("visible").is_some());
        assert!(obj.get("__secret").is_none());
        assert!(obj.get_any("__secret").is_some());

        assert_eq!(obj.keys(), vec!["visible"]);
        assert_eq!(obj.all_keys(), vec!["__secret", "visible"]);
    }

    #[test]
    fn test_clones_share_state() {
        let obj = ScriptObject::new("shared");
        let alias = obj.clone();
        alias.set("x", ScriptValue::Int(42));

        assert!(matches!(obj.get("x"), Some(ScriptValue::Int(42))));
        assert!(obj.same_object(&alias));
        assert!(!obj.same_object(&ScriptObject::new("shared")));
    }

    #[test]
    fn test_call_method() {
        let obj = ScriptObject::new("math");
        obj.set(
            "double",
            ScriptValue::function(|args| match args {
                [ScriptValue::Int(n)] => Ok(ScriptValue::Int(n * 2)),
                _ => Err(ScriptError::BadArgument("expected one int".to_string())),
            }),
        );

        let result = obj.call("double", &[ScriptValue::Int(21)]).unwrap();
        assert!(matches!(result, ScriptValue::Int(42)));

        assert!(matches!(
            obj.call("missing", &[]),
            Err(ScriptError::NotCallable(_))
        ));
    }
}
