//! Named-event hooks.
//!
//! Callbacks are registered under an event name and invoked, in registration
//! order, with the full argument list whenever the event is triggered.
//! Module lifecycle code triggers [`MODULE_INSTALLED`] and
//! [`MODULE_UNINSTALLED`].

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Triggered after a module is installed. Args: `[name, version]`.
pub const MODULE_INSTALLED: &str = "module.installed";

/// Triggered after a module is uninstalled. Args: `[name]`.
pub const MODULE_UNINSTALLED: &str = "module.uninstalled";

/// Event callback.
pub type EventCallback = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// Registry of event name → callbacks.
#[derive(Default)]
pub struct EventHandler {
    events: RwLock<HashMap<String, Vec<EventCallback>>>,
}

impl std::fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let events: Vec<String> = self
            .events
            .read()
            .map(|e| e.keys().cloned().collect())
            .unwrap_or_default();
        f.debug_struct("EventHandler").field("events", &events).finish()
    }
}

impl EventHandler {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `event`.
    pub fn register<F>(&self, event: &str, callback: F)
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        match self.events.write() {
            Ok(mut events) => {
                events
                    .entry(event.to_string())
                    .or_default()
                    .push(Arc::new(callback));
            }
            Err(_) => warn!(event = %event, "Event registry poisoned; callback dropped"),
        }
    }

    /// Invoke every callback registered for `event` with `args`.
    ///
    /// Unknown events are ignored. Callbacks run outside the registry lock, so
    /// they may register further callbacks.
    pub fn trigger(&self, event: &str, args: &[Value]) {
        let callbacks: Vec<EventCallback> = match self.events.read() {
            Ok(events) => events.get(event).cloned().unwrap_or_default(),
            Err(_) => {
                warn!(event = %event, "Event registry poisoned; trigger skipped");
                return;
            }
        };
        debug!(event = %event, listeners = callbacks.len(), "Triggering event");
        for callback in &callbacks {
            callback(args);
        }
    }

    /// Number of callbacks registered for `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.events
            .read()
            .map(|e| e.get(event).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}
