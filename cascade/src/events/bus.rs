//! Named-callback event bus.

use crate::context::ContextInfo;
use crate::ports::ViewHandle;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Payload delivered to listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    /// A rendered region; the default payload.
    View(ViewHandle),
    /// A visible path, as sent with `hash` events.
    Url(String),
    /// Any other payload.
    Value(serde_json::Value),
    /// No payload and no context view to fall back to.
    Empty,
}

/// A registered callback.
pub type Listener = Arc<dyn Fn(&EventData, Option<&ContextInfo>) + Send + Sync>;

/// Registry of named listeners.
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<HashMap<String, Vec<Listener>>>,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for `event`.
    pub fn register<F>(&self, event: impl Into<String>, listener: F)
    where
        F: Fn(&EventData, Option<&ContextInfo>) + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .entry(event.into())
            .or_default()
            .push(Arc::new(listener));
    }

    /// Number of listeners registered for `event`.
    #[must_use]
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.read().get(event).map_or(0, Vec::len)
    }

    /// Calls every listener of `event` in registration order.
    ///
    /// Without explicit `data`, listeners receive the view of `context`.
    /// A panicking listener is logged and skipped. Returns the delivered
    /// payload.
    pub fn trigger(
        &self,
        event: &str,
        data: Option<EventData>,
        context: Option<&ContextInfo>,
    ) -> EventData {
        let data = data.unwrap_or_else(|| {
            context
                .and_then(|c| c.view.clone())
                .map_or(EventData::Empty, EventData::View)
        });

        // Snapshot so listeners may register while being called.
        let listeners: Vec<Listener> = self.listeners.read().get(event).cloned().unwrap_or_default();
        debug!(event, listeners = listeners.len(), "Trigger event");

        for listener in listeners {
            if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener(&data, context);
            })) {
                warn!(event, "Event listener panicked: {:?}", e);
            }
        }
        data
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.read();
        let mut events: Vec<&String> = listeners.keys().collect();
        events.sort();
        f.debug_struct("EventBus").field("events", &events).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_trigger_without_listeners() {
        let bus = EventBus::new();
        let data = bus.trigger("nothing", None, None);
        assert_eq!(data, EventData::Empty);
    }

    #[test]
    fn test_listeners_run_in_order() {
        let bus = EventBus::new();
        let calls = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second"] {
            let calls = calls.clone();
            bus.register("hash", move |data, _| {
                calls.lock().push((name, data.clone()));
            });
        }

        bus.trigger("hash", Some(EventData::Url("#/users".to_string())), None);

        let calls = calls.lock().clone();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], ("first", EventData::Url("#/users".to_string())));
        assert_eq!(calls[1].0, "second");
        assert_eq!(bus.listener_count("hash"), 2);
    }

    #[test]
    fn test_default_payload_is_context_view() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();
        bus.register("fragment-users", move |data, context| {
            *seen_clone.lock() = Some((data.clone(), context.map(|c| c.id)));
        });

        let mut context = ContextInfo::detached();
        context.view = Some(ViewHandle::new("_hierarchy-2"));
        bus.trigger("fragment-users", None, Some(&context));

        let (data, id) = seen.lock().clone().unwrap();
        assert_eq!(data, EventData::View(ViewHandle::new("_hierarchy-2")));
        assert_eq!(id, Some(context.id));
    }

    #[test]
    fn test_panicking_listener_is_suppressed() {
        let bus = EventBus::new();
        let reached = Arc::new(Mutex::new(false));
        let reached_clone = reached.clone();

        bus.register("boom", |_, _| panic!("Intentional panic"));
        bus.register("boom", move |_, _| *reached_clone.lock() = true);

        bus.trigger("boom", None, None);
        assert!(*reached.lock());
    }

    #[test]
    fn test_listener_may_register_during_trigger() {
        let bus = Arc::new(EventBus::new());
        let bus_clone = bus.clone();
        bus.register("setup", move |_, _| {
            bus_clone.register("late", |_, _| {});
        });

        bus.trigger("setup", None, None);
        assert_eq!(bus.listener_count("late"), 1);
    }
}
