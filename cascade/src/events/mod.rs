//! Events.
//!
//! Two channels leave the engine:
//! - the [`EventBus`], named callbacks modules register for (`fragment-<id>`,
//!   `hash`, ...), triggered with a view or payload
//! - an [`EventSink`], typed [`EngineEvent`]s for logging and monitoring

mod bus;
mod sink;

pub use bus::{EventBus, EventData, Listener};
pub use sink::{
    CollectingEventSink, EngineEvent, EngineEventKind, EventSink, LoggingEventSink, NoOpEventSink,
};
