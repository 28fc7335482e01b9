//! The engine instance: transaction counter, context tree and collaborators.

use super::config::EngineConfig;
use super::effects::Effects;
use super::ready::ReadyBarrier;
use super::reconcile::Walk;
use crate::context::{ContextId, ContextInfo, ContextNode, ContextTree};
use crate::errors::{CascadeError, Result};
use crate::events::{EngineEvent, EngineEventKind, EventBus, EventData, EventSink, NoOpEventSink};
use crate::messages;
use crate::observability::{NavigationSpanAttributes, SpanTimer};
use crate::ports::{AccessPolicy, AllowAll, ErrorReporter, ResourceLoader, ViewHandle, ViewHost};
use crate::transaction::{TransactionId, TransactionManager};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Where the current navigation is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationPhase {
    /// No navigation in flight.
    #[default]
    Idle,
    /// Comparing the live chain with the requested segments.
    Reconciling,
    /// Evicting a mismatched subtree.
    Unloading,
    /// Waiting on, or committing, a module load.
    Loading,
    /// Checking whether a context is terminal.
    Finalizing,
}

/// How a navigation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The walk reached a terminal context.
    Completed {
        /// Transaction of the navigation.
        transaction: TransactionId,
        /// Deepest context of the resulting chain.
        current: ContextId,
    },
    /// A newer navigation began before this one finished; its remaining
    /// results were discarded.
    Superseded {
        /// Transaction of the navigation.
        transaction: TransactionId,
    },
}

impl NavigationOutcome {
    /// Returns the transaction of the navigation.
    #[must_use]
    pub const fn transaction(&self) -> TransactionId {
        match self {
            Self::Completed { transaction, .. } | Self::Superseded { transaction } => *transaction,
        }
    }

    /// Returns true if the navigation completed.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

pub(crate) struct EngineState {
    pub(crate) transactions: TransactionManager,
    pub(crate) tree: ContextTree,
    pub(crate) phase: NavigationPhase,
    pub(crate) latest: Option<ContextId>,
    pub(crate) session: Option<Arc<Value>>,
}

impl EngineState {
    /// Staleness check against the counter and, when given, the context.
    pub(crate) fn is_current(&self, tx: TransactionId, context: Option<ContextId>) -> bool {
        self.transactions
            .is_current_for(tx, context.map(|id| self.tree.is_unloaded(id)))
    }
}

pub(crate) struct EngineInner {
    pub(crate) id: Uuid,
    pub(crate) config: EngineConfig,
    pub(crate) state: Mutex<EngineState>,
    pub(crate) loader: Arc<dyn ResourceLoader>,
    pub(crate) view_host: Arc<dyn ViewHost>,
    pub(crate) access: Arc<dyn AccessPolicy>,
    pub(crate) reporter: Option<Arc<dyn ErrorReporter>>,
    pub(crate) bus: EventBus,
    pub(crate) sink: Arc<dyn EventSink>,
    pub(crate) ready: ReadyBarrier,
}

/// A navigation engine.
///
/// Cloning is cheap and yields a handle to the same engine. Independent
/// engines share nothing.
#[derive(Clone)]
pub struct Engine {
    pub(crate) inner: Arc<EngineInner>,
}

/// Builder for [`Engine`].
pub struct EngineBuilder {
    loader: Arc<dyn ResourceLoader>,
    view_host: Arc<dyn ViewHost>,
    config: EngineConfig,
    access: Arc<dyn AccessPolicy>,
    reporter: Option<Arc<dyn ErrorReporter>>,
    sink: Arc<dyn EventSink>,
    session: Option<Value>,
}

impl EngineBuilder {
    /// Creates a builder around the two mandatory collaborators.
    #[must_use]
    pub fn new(loader: Arc<dyn ResourceLoader>, view_host: Arc<dyn ViewHost>) -> Self {
        Self {
            loader,
            view_host,
            config: EngineConfig::default(),
            access: Arc::new(AllowAll),
            reporter: None,
            sink: Arc::new(NoOpEventSink),
            session: None,
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the access policy.
    #[must_use]
    pub fn with_access_policy(mut self, policy: Arc<dyn AccessPolicy>) -> Self {
        self.access = policy;
        self
    }

    /// Sets the collaborator notified of denied navigations.
    #[must_use]
    pub fn with_error_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sets the session shared with every context created afterwards.
    #[must_use]
    pub fn with_session(mut self, session: Value) -> Self {
        self.session = Some(session);
        self
    }

    /// Validates the configuration and creates the engine with its root context.
    pub fn build(self) -> Result<Engine> {
        self.config.validate()?;

        let root = ContextNode::root(
            ViewHandle::new(self.config.root_view.clone()),
            self.config.root_path.clone(),
            self.config.root_url.clone(),
        );
        let state = EngineState {
            transactions: TransactionManager::new(),
            tree: ContextTree::new(root),
            phase: NavigationPhase::Idle,
            latest: None,
            session: self.session.map(Arc::new),
        };
        let id = Uuid::new_v4();
        info!(engine_id = %id, root_view = %self.config.root_view, "Engine created");

        Ok(Engine {
            inner: Arc::new(EngineInner {
                id,
                ready: ReadyBarrier::new(!self.config.manual_ready),
                config: self.config,
                state: Mutex::new(state),
                loader: self.loader,
                view_host: self.view_host,
                access: self.access,
                reporter: self.reporter,
                bus: EventBus::new(),
                sink: self.sink,
            }),
        })
    }
}

impl fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("config", &self.config)
            .field("has_reporter", &self.reporter.is_some())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Creates a builder.
    #[must_use]
    pub fn builder(loader: Arc<dyn ResourceLoader>, view_host: Arc<dyn ViewHost>) -> EngineBuilder {
        EngineBuilder::new(loader, view_host)
    }

    /// Creates an engine with the default configuration.
    pub fn new(loader: Arc<dyn ResourceLoader>, view_host: Arc<dyn ViewHost>) -> Result<Self> {
        EngineBuilder::new(loader, view_host).build()
    }

    /// Returns the engine instance id.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Returns the current navigation phase.
    #[must_use]
    pub fn phase(&self) -> NavigationPhase {
        self.inner.state.lock().phase
    }

    /// Returns the latest transaction id.
    #[must_use]
    pub fn transaction(&self) -> TransactionId {
        self.inner.state.lock().transactions.current()
    }

    /// Begins a new transaction, superseding every earlier one.
    pub fn begin_transaction(&self) -> TransactionId {
        self.inner.state.lock().transactions.begin()
    }

    /// Returns true if `tx` is the latest transaction and `context`, when
    /// given, has not been unloaded.
    #[must_use]
    pub fn is_current(&self, tx: TransactionId, context: Option<ContextId>) -> bool {
        self.inner.state.lock().is_current(tx, context)
    }

    /// The root context.
    #[must_use]
    pub const fn root(&self) -> ContextId {
        ContextId::ROOT
    }

    /// Deepest context of the main chain.
    #[must_use]
    pub fn current(&self) -> ContextId {
        self.inner.state.lock().tree.current()
    }

    /// The live main chain, from the root down.
    #[must_use]
    pub fn chain(&self) -> Vec<ContextId> {
        self.inner.state.lock().tree.chain()
    }

    /// Snapshot of a live context.
    #[must_use]
    pub fn context(&self, id: ContextId) -> Option<ContextInfo> {
        self.inner.state.lock().tree.info(id)
    }

    /// Snapshots of the ancestor chain from the root down to `id`.
    #[must_use]
    pub fn hierarchy(&self, id: ContextId) -> Vec<ContextInfo> {
        let state = self.inner.state.lock();
        state
            .tree
            .hierarchy(id)
            .into_iter()
            .filter_map(|ancestor| state.tree.info(ancestor))
            .collect()
    }

    /// Exposed messages of the most recently loaded live context.
    #[must_use]
    pub fn messages(&self) -> Option<Value> {
        let state = self.inner.state.lock();
        state
            .latest
            .and_then(|id| state.tree.info(id))
            .map(|info| info.messages)
    }

    /// Merged messages of `id`: its chain's bundles, nearest last.
    pub fn merged_messages(&self, id: ContextId) -> Result<Value> {
        messages::merged_messages(&self.inner.state.lock().tree, id)
    }

    /// Replaces the session handed to contexts created from now on.
    pub fn set_session(&self, session: Value) {
        self.inner.state.lock().session = Some(Arc::new(session));
    }

    /// Returns the current session.
    #[must_use]
    pub fn session(&self) -> Option<Arc<Value>> {
        self.inner.state.lock().session.clone()
    }

    /// Opens the readiness barrier. Returns true if this call opened it.
    pub fn mark_ready(&self) -> bool {
        let opened = self.inner.ready.open();
        if opened {
            debug!(engine_id = %self.inner.id, "Engine ready");
        }
        opened
    }

    /// Returns true once behaviors may be initialized.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner.ready.is_open()
    }

    /// Registers a listener on the engine's event bus.
    pub fn register<F>(&self, event: impl Into<String>, listener: F)
    where
        F: Fn(&EventData, Option<&ContextInfo>) + Send + Sync + 'static,
    {
        self.inner.bus.register(event, listener);
    }

    /// Triggers `event` on behalf of `context`, or of the current context.
    ///
    /// Without explicit data, listeners receive the context's view.
    pub fn trigger(&self, event: &str, data: Option<EventData>, context: Option<ContextId>) -> EventData {
        let info = {
            let state = self.inner.state.lock();
            let id = context.unwrap_or_else(|| state.tree.current());
            state.tree.info(id)
        };
        self.inner.bus.trigger(event, data, info.as_ref())
    }

    /// Unloads `context` and its subtree. Returns the context's parent.
    pub fn unload(&self, context: ContextId) -> Result<Option<ContextId>> {
        let (parent, effects) = {
            let mut state = self.inner.state.lock();
            let mut effects = Effects::new(state.transactions.current());
            let report = state.tree.unload(context)?;
            let parent = report.parent;
            effects.unloaded(report);
            (parent, effects)
        };
        effects.dispatch(&self.inner);
        Ok(parent)
    }

    /// Checks whether `context` is terminal and, if so, commits `parameters`.
    pub fn finalize(&self, context: ContextId, parameters: &str, tx: TransactionId) -> Result<bool> {
        let mut effects = Effects::new(tx);
        let terminal = {
            let mut state = self.inner.state.lock();
            self.finalize_locked(&mut state, context, parameters, tx, &mut effects)
        };
        effects.dispatch(&self.inner);
        terminal
    }

    /// Navigates to a slash-delimited path.
    ///
    /// A navigation superseded by a newer one resolves to
    /// [`NavigationOutcome::Superseded`] and leaves the newer tree intact.
    pub async fn navigate(&self, url: &str, reload: bool) -> Result<NavigationOutcome> {
        let inner = &self.inner;
        if !inner.access.is_allowed(url) {
            match &inner.reporter {
                Some(reporter) => reporter.access_denied(url),
                None => warn!(engine_id = %inner.id, url, "Navigation denied"),
            }
            let tx = self.transaction();
            inner.sink.emit(&EngineEvent::new(
                inner.id,
                tx,
                EngineEventKind::NavigationDenied { url: url.to_string() },
            ));
            return Err(CascadeError::AccessDenied { url: url.to_string() });
        }

        let tx = {
            let mut state = inner.state.lock();
            state.phase = NavigationPhase::Reconciling;
            state.transactions.begin()
        };
        info!(engine_id = %inner.id, %tx, url, reload, "Navigation started");
        inner.sink.emit(&EngineEvent::new(
            inner.id,
            tx,
            EngineEventKind::NavigationStarted { url: url.to_string() },
        ));

        let timer = SpanTimer::start("navigation");
        let mut fragments = self.fragments_for(url);
        let result = self.run_navigation(tx, &mut fragments, reload).await;
        let attributes = NavigationSpanAttributes::new(url)
            .with_engine_id(inner.id.to_string())
            .with_transaction(tx)
            .with_duration_ms(timer.finish());

        let completed = match result {
            Ok(completed) => completed,
            Err(e) => {
                if self.settle(tx).is_none() {
                    debug!(engine_id = %inner.id, %tx, url, error = %e, "Superseded navigation failed; discarding");
                    return Ok(NavigationOutcome::Superseded { transaction: tx });
                }
                let attributes = attributes.with_outcome("failed").with_error_code(e.code());
                warn!(
                    error = %e,
                    attributes = ?attributes.to_otel_attributes(),
                    "Navigation failed"
                );
                inner.sink.emit(&EngineEvent::new(
                    inner.id,
                    tx,
                    EngineEventKind::NavigationFailed {
                        url: url.to_string(),
                        code: e.code().to_string(),
                    },
                ));
                return Err(e);
            }
        };

        match completed.then(|| self.settle(tx)).flatten() {
            Some(current) => {
                let attributes = attributes.with_outcome("completed");
                info!(
                    %current,
                    attributes = ?attributes.to_otel_attributes(),
                    "Navigation completed"
                );
                inner.sink.emit(&EngineEvent::new(
                    inner.id,
                    tx,
                    EngineEventKind::NavigationCompleted {
                        url: url.to_string(),
                        current,
                    },
                ));
                Ok(NavigationOutcome::Completed { transaction: tx, current })
            }
            None => {
                debug!(engine_id = %inner.id, %tx, url, "Navigation superseded");
                Ok(NavigationOutcome::Superseded { transaction: tx })
            }
        }
    }

    /// Navigates to a location hash.
    ///
    /// `#/path` navigates to `path` and the empty hash to the home chain;
    /// anything else is ignored and yields `None`.
    pub async fn navigate_hash(&self, hash: &str) -> Result<Option<NavigationOutcome>> {
        let url = if hash.is_empty() {
            ""
        } else if let Some(path) = hash.strip_prefix("#/") {
            path
        } else {
            debug!(hash, "Ignoring foreign hash");
            return Ok(None);
        };
        self.navigate(url, false).await.map(Some)
    }

    fn fragments_for(&self, url: &str) -> Vec<String> {
        let config = &self.inner.config;
        let mut fragments = vec![config.root_segment.clone(), config.main_segment.clone()];
        if !url.is_empty() {
            fragments.extend(url.split('/').map(str::to_string));
        }
        fragments
    }

    async fn run_navigation(&self, tx: TransactionId, fragments: &mut Vec<String>, reload: bool) -> Result<bool> {
        let config = &self.inner.config;
        if !self.prepare_zone(tx, &config.protected_zone).await? {
            return Ok(false);
        }
        match self.reconcile(tx, fragments, 1, reload, Some(1)).await? {
            Walk::LoadedLevel => {
                if !self.prepare_zone(tx, &config.private_zone).await? {
                    return Ok(false);
                }
                let walk = self.reconcile(tx, fragments, 2, reload, None).await?;
                Ok(walk == Walk::Completed)
            }
            Walk::Completed => Ok(true),
            Walk::Superseded => Ok(false),
        }
    }

    /// Returns false if the navigation was superseded while the zone loaded.
    async fn prepare_zone(&self, tx: TransactionId, zone: &str) -> Result<bool> {
        debug!(zone, %tx, "Preparing zone");
        let prepared = self.inner.loader.prepare_zone(zone).await;
        let current = self.inner.state.lock().transactions.is_current(tx);
        match prepared {
            Err(e) if current => Err(CascadeError::resolution(zone, e)),
            Err(e) => {
                debug!(zone, %tx, error = %e, "Discarding failed zone of stale transaction");
                Ok(false)
            }
            Ok(()) => Ok(current),
        }
    }

    /// Returns the engine to idle if `tx` is still current, with the deepest context.
    fn settle(&self, tx: TransactionId) -> Option<ContextId> {
        let mut state = self.inner.state.lock();
        if !state.transactions.is_current(tx) {
            return None;
        }
        state.phase = NavigationPhase::Idle;
        Some(state.tree.current())
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("id", &self.inner.id)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
