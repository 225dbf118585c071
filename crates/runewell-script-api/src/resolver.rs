//! Capability resolver: bounded wait plus on-demand injection.
//!
//! `resolve()` polls script scope until every requested capability name is
//! bound, injecting registry entries as they become available. The wait is a
//! hard wall-clock deadline with all-or-fatal semantics: on timeout the error
//! names exactly the still-missing subset, and the application never proceeds
//! partially capable.
//!
//! The poll suspends through the timer, so the script logical thread is
//! never starved by a blocking spin.

use crate::probe::{self, InteropHandle};
use crate::scope::ScriptScope;
use parking_lot::Mutex;
use runewell_capability_core::{CapabilityName, CapabilityRegistry};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info};

/// Default resolver poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Fatal resolution failure.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The deadline elapsed with capabilities still unbound.
    #[error("capability resolution timed out after {waited:?}; missing: {}", missing.join(", "))]
    Timeout {
        /// How long the resolver waited.
        waited: Duration,
        /// Exactly the capability names that never materialized.
        missing: Vec<String>,
    },
}

/// One in-flight resolution: the requested names, the hard deadline, and the
/// poll cadence. Lives only for the duration of a single `resolve()` call.
struct ResolutionRequest<'a> {
    names: &'a [CapabilityName],
    deadline: Instant,
    poll_interval: Duration,
}

/// Injects registry capabilities into script globals, bounded by a deadline.
pub struct CapabilityResolver {
    registry: CapabilityRegistry,
    scope: ScriptScope,
    poll_interval: Duration,
    /// Cached interop handle; probing repeats until one is found.
    handle: Mutex<Option<InteropHandle>>,
}

impl CapabilityResolver {
    /// Create a resolver over the registry and scope.
    pub fn new(registry: CapabilityRegistry, scope: ScriptScope) -> Self {
        Self {
            registry,
            scope,
            poll_interval: DEFAULT_POLL_INTERVAL,
            handle: Mutex::new(None),
        }
    }

    /// Override the poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Resolve every named capability into script scope before the timeout.
    ///
    /// Idempotent: the presence check is the first statement of each poll
    /// iteration, so a call after success returns immediately. Concurrent
    /// overlapping calls are safe; injection re-binds identical values.
    pub async fn resolve(
        &self,
        names: &[CapabilityName],
        timeout: Duration,
    ) -> Result<(), ResolveError> {
        let request = ResolutionRequest {
            names,
            deadline: Instant::now() + timeout,
            poll_interval: self.poll_interval,
        };

        loop {
            let missing = self.missing(request.names);
            if missing.is_empty() {
                debug!("all {} capabilities bound", request.names.len());
                return Ok(());
            }

            if self.ensure_handle() {
                for name in &missing {
                    self.try_inject(name);
                }
                if self.missing(request.names).is_empty() {
                    return Ok(());
                }
            }

            let now = Instant::now();
            if now >= request.deadline {
                let missing: Vec<String> = self
                    .missing(request.names)
                    .iter()
                    .map(|n| n.to_string())
                    .collect();
                return Err(ResolveError::Timeout {
                    waited: timeout,
                    missing,
                });
            }

            let remaining = request.deadline - now;
            tokio::time::sleep(request.poll_interval.min(remaining)).await;
        }
    }

    /// Names from the request not yet bound in scope.
    fn missing(&self, names: &[CapabilityName]) -> Vec<CapabilityName> {
        names
            .iter()
            .filter(|name| !self.scope.has(name.as_str()))
            .cloned()
            .collect()
    }

    /// Probe for the interop handle if we don't hold one yet.
    fn ensure_handle(&self) -> bool {
        let mut handle = self.handle.lock();
        if handle.is_none() {
            *handle = probe::try_probe(&self.scope);
        }
        handle.is_some()
    }

    /// Fetch one capability from the registry and bind it under its
    /// canonical name. Absence is not an error; the poll loop retries.
    fn try_inject(&self, name: &CapabilityName) {
        if let Some(provider) = self.registry.get(name) {
            info!(capability = %name, "binding capability into script scope");
            self.scope.bind_capability(name, provider);
        }
    }
}
