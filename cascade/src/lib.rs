//! # Cascade
//!
//! A navigation engine for applications built from nested modules.
//!
//! A path such as `users/42/edit` is reconciled against a chain of loaded
//! modules, one per hierarchy level, with support for:
//!
//! - **Minimal reloads**: levels whose segment is unchanged are kept
//! - **Transactional navigation**: a newer navigation supersedes an older one
//!   whose loads are still in flight, and late results are discarded
//! - **Hierarchical messages**: each module sees its ancestors' strings
//! - **Event-driven observability**: named listeners plus typed engine events
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cascade::prelude::*;
//!
//! let engine = Engine::builder(loader, view_host)
//!     .with_config(EngineConfig::from_file("cascade.json")?)
//!     .with_event_sink(Arc::new(LoggingEventSink::default()))
//!     .build()?;
//!
//! engine.register("hash", |data, _| println!("now at {data:?}"));
//! match engine.navigate("users/42", false).await? {
//!     NavigationOutcome::Completed { current, .. } => println!("showing {current}"),
//!     NavigationOutcome::Superseded { .. } => {}
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod context;
pub mod errors;
pub mod events;
pub mod messages;
pub mod navigation;
pub mod observability;
pub mod ports;
pub mod testing;
pub mod transaction;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::context::{ContextId, ContextInfo};
    pub use crate::errors::{CascadeError, Result};
    pub use crate::events::{
        CollectingEventSink, EngineEvent, EngineEventKind, EventData, EventSink, LoggingEventSink,
        NoOpEventSink,
    };
    pub use crate::navigation::{
        Engine, EngineBuilder, EngineConfig, LoadOptions, LoadOutcome, NavigationOutcome,
        NavigationPhase,
    };
    pub use crate::observability::init_tracing;
    pub use crate::ports::{
        AccessPolicy, AllowAll, Behavior, ErrorReporter, LoadedResources, ResourceKinds,
        ResourceLoader, ResourceRequest, StaticTemplate, Template, ViewHandle, ViewHost,
    };
    pub use crate::transaction::TransactionId;
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use crate::testing::TestHarness;

    #[test]
    fn test_prelude_builds_engine() {
        let harness = TestHarness::new();
        let engine: &Engine = &harness.engine;
        assert_eq!(engine.transaction(), TransactionId::NONE);
        assert_eq!(engine.current(), ContextId::ROOT);
    }
}
