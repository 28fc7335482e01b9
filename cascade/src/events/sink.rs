//! Engine event sinks.

use crate::context::ContextId;
use crate::transaction::TransactionId;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info, Level};
use uuid::Uuid;

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineEventKind {
    /// A navigation passed the access check and began a transaction.
    NavigationStarted {
        /// Requested path.
        url: String,
    },
    /// The access policy rejected a navigation.
    NavigationDenied {
        /// Requested path.
        url: String,
    },
    /// A navigation reached a terminal level.
    NavigationCompleted {
        /// Requested path.
        url: String,
        /// Deepest context after the navigation.
        current: ContextId,
    },
    /// A navigation failed with an error.
    NavigationFailed {
        /// Requested path.
        url: String,
        /// Error code.
        code: String,
    },
    /// A module was loaded and rendered.
    FragmentLoaded {
        /// Module identifier.
        id: String,
        /// The new context.
        context: ContextId,
        /// Whether it was attached as a sibling.
        sibling: bool,
    },
    /// A context was unloaded.
    ContextUnloaded {
        /// The unloaded context.
        context: ContextId,
    },
    /// A terminal context committed new parameters.
    ParametersChanged {
        /// The terminal context.
        context: ContextId,
        /// The new parameters.
        parameters: String,
    },
}

/// An event emitted by one engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineEvent {
    /// Engine instance that emitted the event.
    pub engine_id: Uuid,
    /// Transaction the event belongs to.
    pub transaction: TransactionId,
    /// RFC 3339 emission time.
    pub timestamp: String,
    /// Event details.
    #[serde(flatten)]
    pub kind: EngineEventKind,
}

impl EngineEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(engine_id: Uuid, transaction: TransactionId, kind: EngineEventKind) -> Self {
        Self {
            engine_id,
            transaction,
            timestamp: chrono::Utc::now().to_rfc3339(),
            kind,
        }
    }

    /// Dotted event type, e.g. `navigation.started`.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self.kind {
            EngineEventKind::NavigationStarted { .. } => "navigation.started",
            EngineEventKind::NavigationDenied { .. } => "navigation.denied",
            EngineEventKind::NavigationCompleted { .. } => "navigation.completed",
            EngineEventKind::NavigationFailed { .. } => "navigation.failed",
            EngineEventKind::FragmentLoaded { .. } => "fragment.loaded",
            EngineEventKind::ContextUnloaded { .. } => "context.unloaded",
            EngineEventKind::ParametersChanged { .. } => "context.parameters_changed",
        }
    }
}

/// Receives engine events.
///
/// Emission must not fail or block; sinks swallow their own errors.
pub trait EventSink: Send + Sync {
    /// Emits an event.
    fn emit(&self, event: &EngineEvent);
}

/// A sink that discards all events.
///
/// Used as the default when no sink is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn emit(&self, _event: &EngineEvent) {}
}

/// A sink that logs events using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a logging sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }
}

impl EventSink for LoggingEventSink {
    fn emit(&self, event: &EngineEvent) {
        let event_type = event.event_type();
        if self.level == Level::DEBUG {
            debug!(
                event_type,
                engine_id = %event.engine_id,
                transaction = %event.transaction,
                event_data = ?event.kind,
                "Event: {}", event_type
            );
        } else {
            info!(
                event_type,
                engine_id = %event.engine_id,
                transaction = %event.transaction,
                event_data = ?event.kind,
                "Event: {}", event_type
            );
        }
    }
}

/// A collecting sink for tests.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<EngineEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events whose type starts with `type_prefix`.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<EngineEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type().starts_with(type_prefix))
            .cloned()
            .collect()
    }

    /// Returns events belonging to `transaction`.
    #[must_use]
    pub fn events_for(&self, transaction: TransactionId) -> Vec<EngineEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.transaction == transaction)
            .cloned()
            .collect()
    }
}

impl EventSink for CollectingEventSink {
    fn emit(&self, event: &EngineEvent) {
        self.events.write().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: EngineEventKind) -> EngineEvent {
        EngineEvent::new(Uuid::nil(), TransactionId::new(1), kind)
    }

    #[test]
    fn test_noop_and_logging_sinks() {
        let started = event(EngineEventKind::NavigationStarted { url: "a/b".to_string() });
        NoOpEventSink.emit(&started);
        LoggingEventSink::default().emit(&started);
        LoggingEventSink::debug().emit(&started);
        // Should not panic
    }

    #[test]
    fn test_collecting_sink_filter() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit(&event(EngineEventKind::NavigationStarted { url: "a".to_string() }));
        sink.emit(&event(EngineEventKind::NavigationCompleted {
            url: "a".to_string(),
            current: ContextId::new(2),
        }));
        sink.emit(&event(EngineEventKind::ContextUnloaded { context: ContextId::new(3) }));

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.events_of_type("navigation.").len(), 2);
        assert_eq!(sink.events_of_type("context.").len(), 1);
        assert_eq!(sink.events_for(TransactionId::new(1)).len(), 3);

        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_event_serialization() {
        let event = event(EngineEventKind::FragmentLoaded {
            id: "users".to_string(),
            context: ContextId::new(4),
            sibling: false,
        });
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["kind"], "fragment_loaded");
        assert_eq!(value["id"], "users");
        assert_eq!(value["context"], 4);
        assert_eq!(value["transaction"], 1);
    }
}
