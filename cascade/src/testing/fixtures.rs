//! Test fixtures wiring an engine to in-memory collaborators.

use std::sync::Arc;

use super::mocks::{hierarchy_marker, CallLog, MockModule, MockResourceLoader, MockViewHost};
use crate::events::CollectingEventSink;
use crate::navigation::{Engine, EngineConfig};

/// An engine with its mock loader, view host, event sink and call log.
pub struct TestHarness {
    /// The engine under test.
    pub engine: Engine,
    /// Resource loader serving registered modules.
    pub loader: Arc<MockResourceLoader>,
    /// View host recording renders.
    pub host: Arc<MockViewHost>,
    /// Sink collecting engine events.
    pub sink: Arc<CollectingEventSink>,
    /// Behavior calls across every module.
    pub calls: CallLog,
}

impl TestHarness {
    /// A harness whose root view hosts the level 1 container.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// A harness with a custom configuration.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_config(config: EngineConfig) -> Self {
        let loader = Arc::new(MockResourceLoader::new());
        let host = Arc::new(MockViewHost::with_root(&config.root_view, hierarchy_marker(1)));
        let sink = Arc::new(CollectingEventSink::new());
        let engine = Engine::builder(loader.clone(), host.clone())
            .with_config(config)
            .with_event_sink(sink.clone())
            .build()
            .expect("test configuration is valid");

        Self {
            engine,
            loader,
            host,
            sink,
            calls: CallLog::default(),
        }
    }

    /// Registers the module at `path` (e.g. `main/users`), served from
    /// `path/<last segment>`.
    pub fn module(&self, path: &str, module: MockModule) {
        self.loader.insert(module_base(path), module);
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Base path of the module at `path`: the path plus its last segment.
#[must_use]
pub fn module_base(path: &str) -> String {
    let id = path.rsplit('/').next().unwrap_or(path);
    format!("{path}/{id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_base() {
        assert_eq!(module_base("main"), "main/main");
        assert_eq!(module_base("main/users"), "main/users/users");
    }

    #[test]
    fn test_harness_root() {
        let harness = TestHarness::new();
        assert_eq!(harness.engine.chain(), vec![harness.engine.root()]);
        assert!(harness.host.content("body").unwrap().contains("_hierarchy-1"));
    }
}
