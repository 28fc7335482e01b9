//! In-memory collaborators for exercising an engine.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;

use crate::context::{ContextId, ContextInfo};
use crate::ports::{
    Behavior, ErrorReporter, LoadedResources, ResourceHandles, ResourceLoader, ResourceRequest,
    StaticTemplate, Template, ViewHandle, ViewHost,
};

/// Markup that makes a view host report a container for `hierarchy_index`.
#[must_use]
pub fn hierarchy_marker(hierarchy_index: usize) -> String {
    format!("<div id=\"_hierarchy-{hierarchy_index}\"></div>")
}

/// The resources a [`MockResourceLoader`] serves for one module.
#[derive(Clone, Default)]
pub struct MockModule {
    markup: Option<String>,
    messages: Option<Value>,
    behavior: Option<Arc<dyn Behavior>>,
}

impl MockModule {
    /// A module whose view has no deeper hierarchy container.
    #[must_use]
    pub fn leaf(markup: impl Into<String>) -> Self {
        Self {
            markup: Some(markup.into()),
            ..Self::default()
        }
    }

    /// A module whose view hosts the container of `next_level`.
    #[must_use]
    pub fn layout(markup: impl Into<String>, next_level: usize) -> Self {
        Self::leaf(format!("{}{}", markup.into(), hierarchy_marker(next_level)))
    }

    /// Sets the message bundle.
    #[must_use]
    pub fn with_messages(mut self, messages: Value) -> Self {
        self.messages = Some(messages);
        self
    }

    /// Sets the behavior.
    #[must_use]
    pub fn with_behavior(mut self, behavior: Arc<dyn Behavior>) -> Self {
        self.behavior = Some(behavior);
        self
    }
}

/// A resource loader serving registered modules by base path.
///
/// Loads can be held on a gate to interleave navigations, and failures can
/// be injected per base path. Zone preparation shares both tables, keyed by
/// zone name.
#[derive(Default)]
pub struct MockResourceLoader {
    modules: RwLock<HashMap<String, MockModule>>,
    failures: RwLock<HashMap<String, String>>,
    gates: RwLock<HashMap<String, Arc<Notify>>>,
    requests: Mutex<Vec<ResourceRequest>>,
    zones: Mutex<Vec<String>>,
    released: Mutex<Vec<ResourceHandles>>,
}

impl MockResourceLoader {
    /// Creates an empty loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a module under its base path (`home/id`).
    pub fn insert(&self, base: impl Into<String>, module: MockModule) {
        self.modules.write().insert(base.into(), module);
    }

    /// Makes loads of `base` fail with `message`.
    pub fn fail(&self, base: impl Into<String>, message: impl Into<String>) {
        self.failures.write().insert(base.into(), message.into());
    }

    /// Holds loads of `base` until the returned gate is notified.
    pub fn gate(&self, base: impl Into<String>) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.write().insert(base.into(), Arc::clone(&gate));
        gate
    }

    /// Every request received, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<ResourceRequest> {
        self.requests.lock().clone()
    }

    /// Number of requests received for `base`.
    #[must_use]
    pub fn request_count(&self, base: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|request| request.base() == base)
            .count()
    }

    /// Yields until a request for `base` has arrived. Returns false if none
    /// arrived within a bounded number of yields.
    pub async fn wait_for_request(&self, base: &str) -> bool {
        for _ in 0..10_000 {
            if self.request_count(base) > 0 {
                return true;
            }
            tokio::task::yield_now().await;
        }
        false
    }

    /// Yields until `zone` has been prepared at least once. Returns false if
    /// it was not within a bounded number of yields.
    pub async fn wait_for_zone(&self, zone: &str) -> bool {
        for _ in 0..10_000 {
            if self.zones.lock().iter().any(|prepared| prepared == zone) {
                return true;
            }
            tokio::task::yield_now().await;
        }
        false
    }

    /// Zones prepared, in order.
    #[must_use]
    pub fn zones(&self) -> Vec<String> {
        self.zones.lock().clone()
    }

    /// Resource handles released, in order.
    #[must_use]
    pub fn released(&self) -> Vec<ResourceHandles> {
        self.released.lock().clone()
    }
}

#[async_trait]
impl ResourceLoader for MockResourceLoader {
    async fn load(&self, request: &ResourceRequest) -> anyhow::Result<LoadedResources> {
        let base = request.base();
        self.requests.lock().push(request.clone());

        let gate = self.gates.read().get(&base).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let failure = self.failures.read().get(&base).cloned();
        if let Some(message) = failure {
            anyhow::bail!("{message}");
        }
        let module = self
            .modules
            .read()
            .get(&base)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no module registered at '{base}'"))?;

        let kinds = request.kinds;
        Ok(LoadedResources {
            template: module
                .markup
                .filter(|_| kinds.markup)
                .map(|markup| -> Arc<dyn Template> { Arc::new(StaticTemplate::new(markup)) }),
            messages: module.messages.filter(|_| kinds.messages),
            behavior: module.behavior.filter(|_| kinds.behavior),
        })
    }

    async fn prepare_zone(&self, zone: &str) -> anyhow::Result<()> {
        self.zones.lock().push(zone.to_string());

        let gate = self.gates.read().get(zone).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let failure = self.failures.read().get(zone).cloned();
        if let Some(message) = failure {
            anyhow::bail!("{message}");
        }
        Ok(())
    }

    fn release(&self, handles: &ResourceHandles) {
        self.released.lock().push(handles.clone());
    }
}

/// An in-memory view host.
///
/// A view reports a hierarchy container when its content holds the
/// matching [`hierarchy_marker`].
#[derive(Default)]
pub struct MockViewHost {
    views: RwLock<HashMap<ViewHandle, String>>,
    renders: Mutex<Vec<(ViewHandle, String)>>,
    cleared: Mutex<Vec<ViewHandle>>,
    titles: Mutex<Vec<String>>,
}

impl MockViewHost {
    /// Creates a host with a root view holding `content`.
    #[must_use]
    pub fn with_root(root: &str, content: impl Into<String>) -> Self {
        let host = Self::default();
        host.views.write().insert(ViewHandle::new(root), content.into());
        host
    }

    /// Current content of `view`.
    #[must_use]
    pub fn content(&self, view: &str) -> Option<String> {
        self.views.read().get(&ViewHandle::new(view)).cloned()
    }

    /// Every render, in order.
    #[must_use]
    pub fn renders(&self) -> Vec<(ViewHandle, String)> {
        self.renders.lock().clone()
    }

    /// Number of renders.
    #[must_use]
    pub fn render_count(&self) -> usize {
        self.renders.lock().len()
    }

    /// Views cleared before a reload.
    #[must_use]
    pub fn cleared(&self) -> Vec<ViewHandle> {
        self.cleared.lock().clone()
    }

    /// Titles set, in order.
    #[must_use]
    pub fn titles(&self) -> Vec<String> {
        self.titles.lock().clone()
    }
}

impl ViewHost for MockViewHost {
    fn find_container(&self, view: &ViewHandle, hierarchy_index: usize) -> Option<ViewHandle> {
        let views = self.views.read();
        let content = views.get(view)?;
        content
            .contains(&hierarchy_marker(hierarchy_index))
            .then(|| ViewHandle::new(format!("_hierarchy-{hierarchy_index}")))
    }

    fn find_by_id(&self, id: &str) -> Option<ViewHandle> {
        let handle = ViewHandle::new(id);
        self.views.read().contains_key(&handle).then_some(handle)
    }

    fn create_container(&self, parent: &ViewHandle, id: &str) -> ViewHandle {
        let handle = ViewHandle::new(id);
        let mut views = self.views.write();
        if let Some(content) = views.get_mut(parent) {
            content.push_str(&format!("<div id=\"{id}\"></div>"));
        }
        views.insert(handle.clone(), String::new());
        handle
    }

    fn clear(&self, view: &ViewHandle) {
        self.views.write().insert(view.clone(), String::new());
        self.cleared.lock().push(view.clone());
    }

    fn render(&self, view: &ViewHandle, content: &str) {
        self.views.write().insert(view.clone(), content.to_string());
        self.renders.lock().push((view.clone(), content.to_string()));
    }

    fn set_title(&self, title: &str) {
        self.titles.lock().push(title.to_string());
    }
}

/// A hook call observed by a [`RecordingBehavior`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BehaviorCall {
    /// `initialize` ran.
    Initialize {
        /// Module name.
        module: String,
        /// Initialized context.
        context: ContextId,
        /// Parameters handed over.
        parameters: String,
    },
    /// `unload` ran on this module's context.
    Unload {
        /// Module name.
        module: String,
        /// Departing context.
        departing: ContextId,
    },
    /// `on_hash_change` ran.
    HashChange {
        /// Module name.
        module: String,
        /// New parameters.
        parameters: String,
    },
}

/// Shared log of behavior calls across modules.
pub type CallLog = Arc<Mutex<Vec<BehaviorCall>>>;

/// A behavior that records every hook call into a shared log.
#[derive(Debug, Clone)]
pub struct RecordingBehavior {
    module: String,
    home: Option<String>,
    is_final: bool,
    log: CallLog,
}

impl RecordingBehavior {
    /// Creates a behavior for `module` writing to `log`.
    #[must_use]
    pub fn new(module: impl Into<String>, log: &CallLog) -> Self {
        Self {
            module: module.into(),
            home: None,
            is_final: false,
            log: Arc::clone(log),
        }
    }

    /// Declares a home fragment.
    #[must_use]
    pub fn with_home(mut self, home: impl Into<String>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Declares the module terminal.
    #[must_use]
    pub fn terminal(mut self) -> Self {
        self.is_final = true;
        self
    }
}

impl Behavior for RecordingBehavior {
    fn home_fragment(&self) -> Option<String> {
        self.home.clone()
    }

    fn is_final(&self) -> bool {
        self.is_final
    }

    fn initialize(&self, context: &ContextInfo, parameters: &str) {
        self.log.lock().push(BehaviorCall::Initialize {
            module: self.module.clone(),
            context: context.id,
            parameters: parameters.to_string(),
        });
    }

    fn unload(&self, departing: &ContextInfo) {
        self.log.lock().push(BehaviorCall::Unload {
            module: self.module.clone(),
            departing: departing.id,
        });
    }

    fn on_hash_change(&self, _context: &ContextInfo, parameters: &str) {
        self.log.lock().push(BehaviorCall::HashChange {
            module: self.module.clone(),
            parameters: parameters.to_string(),
        });
    }
}

/// An error reporter recording denied urls.
#[derive(Debug, Default)]
pub struct RecordingErrorReporter {
    denied: Mutex<Vec<String>>,
}

impl RecordingErrorReporter {
    /// Creates an empty reporter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Urls reported as denied, in order.
    #[must_use]
    pub fn denied(&self) -> Vec<String> {
        self.denied.lock().clone()
    }
}

impl ErrorReporter for RecordingErrorReporter {
    fn access_denied(&self, url: &str) {
        self.denied.lock().push(url.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{RenderScope, ResourceKinds};
    use crate::transaction::TransactionId;
    use serde_json::json;

    #[tokio::test]
    async fn test_loader_serves_requested_kinds() {
        let loader = MockResourceLoader::new();
        loader.insert(
            "main/users/users",
            MockModule::leaf("<ul></ul>").with_messages(json!({"title": "Users"})),
        );

        let request = ResourceRequest::new("main/users", "users", ResourceKinds::markup_only());
        let loaded = loader.load(&request).await.unwrap();
        assert!(loaded.template.is_some());
        assert!(loaded.messages.is_none());

        let info = ContextInfo::detached();
        let scope = RenderScope {
            messages: &json!({}),
            context: &info,
            transaction: TransactionId::NONE,
        };
        assert_eq!(loaded.template.unwrap().render(&scope), "<ul></ul>");
        assert_eq!(loader.request_count("main/users/users"), 1);
    }

    #[tokio::test]
    async fn test_loader_failures() {
        let loader = MockResourceLoader::new();
        loader.fail("main/x/x", "boom");

        let missing = ResourceRequest::new("main/y", "y", ResourceKinds::all());
        assert!(loader.load(&missing).await.is_err());

        let failing = ResourceRequest::new("main/x", "x", ResourceKinds::all());
        let err = loader.load(&failing).await.err().unwrap();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_view_host_containers() {
        let host = MockViewHost::with_root("body", hierarchy_marker(1));
        let body = ViewHandle::new("body");

        assert_eq!(host.find_container(&body, 1), Some(ViewHandle::new("_hierarchy-1")));
        assert_eq!(host.find_container(&body, 2), None);

        let created = host.create_container(&body, "_module-main/clock");
        assert_eq!(host.find_by_id("_module-main/clock"), Some(created));
        assert!(host.content("body").unwrap().contains("_module-main/clock"));
    }

    #[test]
    fn test_recording_behavior() {
        let log = CallLog::default();
        let behavior = RecordingBehavior::new("users", &log).with_home("list").terminal();
        behavior.initialize(&ContextInfo::detached(), "42");

        assert_eq!(behavior.home_fragment().as_deref(), Some("list"));
        assert!(behavior.is_final());
        assert_eq!(
            log.lock().clone(),
            vec![BehaviorCall::Initialize {
                module: "users".to_string(),
                context: ContextId::ROOT,
                parameters: "42".to_string(),
            }]
        );
    }
}
