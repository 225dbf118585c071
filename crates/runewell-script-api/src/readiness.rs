//! Host↔script readiness handshake.
//!
//! A one-way `NotReady → Ready` state machine. A background task polls script
//! scope at a short fixed interval for two preconditions: the designated host
//! API handle and a minimal filesystem shim. On the first tick both hold, the
//! broadcaster records the host handle, flips to Ready, and drains its
//! deferred callback queue strictly in FIFO submission order, synchronously.
//! Each callback's error is logged, never propagated.
//!
//! If the preconditions never hold, the broadcaster stays NotReady forever
//! and queued callbacks never run; no outer timeout is enforced here.

use crate::scope::ScriptScope;
use crate::value::{ScriptObject, ScriptValue};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, warn};

/// Default precondition poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Global name of the designated host API handle.
pub const HOST_GLOBAL: &str = "host";

/// Global name of the minimal filesystem shim.
pub const FS_GLOBAL: &str = "fs";

/// Method the filesystem shim must expose.
pub const FS_READ_METHOD: &str = "read";

/// A deferred ready callback. Receives the recorded host handle.
pub type ReadyCallback = Box<dyn FnOnce(&ScriptObject) -> anyhow::Result<()> + Send>;

struct Inner {
    ready: AtomicBool,
    host_handle: Mutex<Option<ScriptObject>>,
    /// Pending callbacks; emptied exactly once, at the Ready transition.
    queue: Mutex<Vec<ReadyCallback>>,
    /// Wakes `wait_ready` callers at the transition.
    transitioned: Notify,
    poll_interval: Duration,
}

/// Broadcasts the one-way NotReady→Ready transition to script-side callers.
#[derive(Clone)]
pub struct ReadinessBroadcaster {
    inner: Arc<Inner>,
}

impl Default for ReadinessBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessBroadcaster {
    /// Create a broadcaster with the default poll interval.
    pub fn new() -> Self {
        Self::with_poll_interval(DEFAULT_POLL_INTERVAL)
    }

    /// Create a broadcaster with a custom poll interval.
    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                ready: AtomicBool::new(false),
                host_handle: Mutex::new(None),
                queue: Mutex::new(Vec::new()),
                transitioned: Notify::new(),
                poll_interval,
            }),
        }
    }

    /// Whether the Ready transition has happened.
    pub fn is_ready(&self) -> bool {
        self.inner.ready.load(Ordering::Acquire)
    }

    /// Suspend until the Ready transition has happened.
    ///
    /// Returns immediately when already Ready. If the preconditions never
    /// hold this waits forever, like the queued callbacks.
    pub async fn wait_ready(&self) {
        loop {
            if self.is_ready() {
                return;
            }
            let transitioned = self.inner.transitioned.notified();
            // Re-check after registering the waiter; the transition may have
            // notified between the flag load and the registration.
            if self.is_ready() {
                return;
            }
            transitioned.await;
        }
    }

    /// The host handle recorded at the Ready transition.
    pub fn host_handle(&self) -> Option<ScriptObject> {
        self.inner.host_handle.lock().clone()
    }

    /// Register a callback to run once Ready.
    ///
    /// Before the transition the callback is queued; queued callbacks run in
    /// FIFO submission order at the transition tick. After the transition the
    /// callback runs immediately.
    pub fn on_ready(&self, callback: ReadyCallback) {
        {
            let mut queue = self.inner.queue.lock();
            // The ready check happens under the queue lock so a callback can
            // never be queued after the transition drained the queue.
            if !self.inner.ready.load(Ordering::Acquire) {
                queue.push(callback);
                return;
            }
        }

        let handle = self
            .host_handle()
            .expect("ready implies a recorded host handle");
        run_callback(callback, &handle);
    }

    /// One synchronous precondition check; transitions on success.
    ///
    /// Returns whether the broadcaster is Ready afterwards.
    pub fn check_once(&self, scope: &ScriptScope) -> bool {
        if self.is_ready() {
            return true;
        }

        match preconditions(scope) {
            Some(handle) => {
                self.transition(handle);
                true
            }
            None => {
                debug!("host readiness preconditions not yet met");
                false
            }
        }
    }

    /// Spawn the background poll task over the scope.
    pub fn spawn(&self, scope: ScriptScope) -> tokio::task::JoinHandle<()> {
        let broadcaster = self.clone();
        tokio::spawn(async move {
            loop {
                if broadcaster.check_once(&scope) {
                    break;
                }
                tokio::time::sleep(broadcaster.inner.poll_interval).await;
            }
        })
    }

    /// Record the handle, flip to Ready, and drain the queue FIFO.
    fn transition(&self, handle: ScriptObject) {
        let drained: Vec<ReadyCallback> = {
            let mut queue = self.inner.queue.lock();
            *self.inner.host_handle.lock() = Some(handle.clone());
            self.inner.ready.store(true, Ordering::Release);
            queue.drain(..).collect()
        };

        info!("host runtime ready; running {} deferred callback(s)", drained.len());
        for callback in drained {
            run_callback(callback, &handle);
        }
        self.inner.transitioned.notify_waiters();
    }

    /// Install the script-global readiness bindings: a `host_ready()` query
    /// and an `on_host_ready(f)` registration.
    pub fn install_bindings(&self, scope: &ScriptScope) {
        let query = self.clone();
        scope.set(
            "host_ready",
            ScriptValue::function(move |_args| Ok(ScriptValue::Bool(query.is_ready()))),
        );

        let registrar = self.clone();
        scope.set(
            "on_host_ready",
            ScriptValue::function(move |args| {
                let callback = match args {
                    [ScriptValue::Function(f)] => f.clone(),
                    _ => {
                        return Err(crate::error::ScriptError::BadArgument(
                            "on_host_ready expects one function".to_string(),
                        ))
                    }
                };
                registrar.on_ready(Box::new(move |handle| {
                    callback(&[ScriptValue::Object(handle.clone())])
                        .map(|_| ())
                        .map_err(anyhow::Error::from)
                }));
                Ok(ScriptValue::Unit)
            }),
        );
    }
}

fn run_callback(callback: ReadyCallback, handle: &ScriptObject) {
    if let Err(e) = callback(handle) {
        warn!("ready callback failed: {e:#}");
    }
}

/// Both preconditions: the host API handle and a filesystem shim exposing
/// `read`. Returns the host handle when they hold.
fn preconditions(scope: &ScriptScope) -> Option<ScriptObject> {
    let host = match scope.get_any(HOST_GLOBAL) {
        Some(ScriptValue::Object(obj)) => obj,
        _ => return None,
    };

    let fs = scope.get_any(FS_GLOBAL)?;
    let fs = fs.as_object()?;
    match fs.get_any(FS_READ_METHOD) {
        Some(ScriptValue::Function(_)) => Some(host),
        _ => None,
    }
}
