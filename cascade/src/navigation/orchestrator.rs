//! Module loading: placement, resource resolution, attachment and rendering.

use super::effects::{guarded, Effects};
use super::engine::{Engine, EngineState, NavigationPhase};
use crate::context::{empty_messages, ContextId, ContextNode};
use crate::errors::{CascadeError, Result};
use crate::events::EngineEventKind;
use crate::messages::build_messages;
use crate::ports::{
    default_view_builder, Behavior, LoadedResources, RenderScope, ResourceKinds, ResourceRequest,
    ViewBuilder, ViewHandle,
};
use crate::transaction::TransactionId;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Options for [`Engine::load_fragment`].
#[derive(Clone, Default)]
pub struct LoadOptions {
    /// Resource kinds to request.
    pub kinds: ResourceKinds,
    /// Explicit rendering container.
    pub container: Option<ViewHandle>,
    /// Hierarchy level the module occupies; `None` attaches a sibling.
    pub hierarchy_index: Option<usize>,
    /// Segment recorded on the context. `None` creates a placeholder.
    pub fragment: Option<String>,
    /// Trailing segments handed to the behavior.
    pub parameters: String,
    /// Payload stored on the context.
    pub data: Option<Value>,
    /// Clear the container and load even if a sibling container exists.
    pub reload: bool,
    /// Replaces the default template rendering.
    pub view_builder: Option<ViewBuilder>,
}

impl LoadOptions {
    /// Creates options with markup-only loading.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the resource kinds.
    #[must_use]
    pub fn with_kinds(mut self, kinds: ResourceKinds) -> Self {
        self.kinds = kinds;
        self
    }

    /// Sets the rendering container.
    #[must_use]
    pub fn with_container(mut self, container: ViewHandle) -> Self {
        self.container = Some(container);
        self
    }

    /// Sets the hierarchy level.
    #[must_use]
    pub fn with_hierarchy_index(mut self, hierarchy_index: usize) -> Self {
        self.hierarchy_index = Some(hierarchy_index);
        self
    }

    /// Sets the fragment recorded on the context.
    #[must_use]
    pub fn with_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.fragment = Some(fragment.into());
        self
    }

    /// Sets the parameters.
    #[must_use]
    pub fn with_parameters(mut self, parameters: impl Into<String>) -> Self {
        self.parameters = parameters.into();
        self
    }

    /// Sets the context payload.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Requests a reload.
    #[must_use]
    pub fn with_reload(mut self, reload: bool) -> Self {
        self.reload = reload;
        self
    }

    /// Sets a custom view builder.
    #[must_use]
    pub fn with_view_builder(mut self, builder: ViewBuilder) -> Self {
        self.view_builder = Some(builder);
        self
    }
}

impl fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadOptions")
            .field("kinds", &self.kinds)
            .field("container", &self.container)
            .field("hierarchy_index", &self.hierarchy_index)
            .field("fragment", &self.fragment)
            .field("parameters", &self.parameters)
            .field("reload", &self.reload)
            .field("has_view_builder", &self.view_builder.is_some())
            .finish_non_exhaustive()
    }
}

/// Result of a module load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A new context was attached and rendered.
    Loaded {
        /// The new context.
        context: ContextId,
        /// Whether it was attached as a sibling.
        sibling: bool,
    },
    /// The sibling container already existed; nothing was requested.
    AlreadyCurrent {
        /// The live sibling rendered there, if known.
        context: Option<ContextId>,
    },
    /// The transaction or parent went stale; the result was discarded.
    Stale,
}

impl LoadOutcome {
    /// The context the load resolved to, if any.
    #[must_use]
    pub const fn context(&self) -> Option<ContextId> {
        match self {
            Self::Loaded { context, .. } => Some(*context),
            Self::AlreadyCurrent { context } => *context,
            Self::Stale => None,
        }
    }
}

enum Target {
    View(ViewHandle),
    Create(String),
}

struct Placement {
    target: Target,
    sibling: bool,
}

enum Resolved {
    Place(Placement),
    Existing(ViewHandle),
}

struct Committed {
    context: ContextId,
    sibling: bool,
    behavior: Option<Arc<dyn Behavior>>,
}

impl Engine {
    /// Loads module `id` from `home` under `parent` within transaction `tx`.
    ///
    /// Nothing is attached unless every requested resource resolved and the
    /// transaction is still current once they have.
    pub async fn load_fragment(
        &self,
        parent: ContextId,
        tx: TransactionId,
        home: &str,
        id: &str,
        options: LoadOptions,
    ) -> Result<LoadOutcome> {
        let request = ResourceRequest::new(home, id, options.kinds);
        let base = request.base();

        let resolved = {
            let state = self.inner.state.lock();
            if !state.is_current(tx, Some(parent)) {
                debug!(%tx, base = %base, "Load skipped for stale transaction");
                return Ok(LoadOutcome::Stale);
            }
            self.resolve_placement(&state, parent, &base, &options)?
        };
        let placement = match resolved {
            Resolved::Existing(view) if !options.reload => {
                debug!(%tx, base = %base, container = %view, "Sibling container already present");
                return Ok(LoadOutcome::AlreadyCurrent {
                    context: self.sibling_rendered_in(parent, &view),
                });
            }
            Resolved::Existing(view) => Placement {
                target: Target::View(view),
                sibling: true,
            },
            Resolved::Place(placement) => placement,
        };

        {
            let mut state = self.inner.state.lock();
            if state.transactions.is_current(tx) {
                state.phase = NavigationPhase::Loading;
            }
        }
        debug!(engine_id = %self.inner.id, %tx, base = %base, kinds = ?request.kinds, "Loading fragment");
        let resources = match self.inner.loader.load(&request).await {
            Ok(resources) => resources,
            Err(e) if !self.is_current(tx, Some(parent)) => {
                debug!(%tx, base = %base, error = %e, "Discarding failed load of stale transaction");
                return Ok(LoadOutcome::Stale);
            }
            Err(e) => {
                warn!(%tx, base = %base, error = %e, "Resource resolution failed");
                return Err(CascadeError::resolution(base.as_str(), e));
            }
        };

        let mut effects = Effects::new(tx);
        let committed = {
            let mut state = self.inner.state.lock();
            if !state.is_current(tx, Some(parent)) {
                debug!(%tx, base = %base, "Discarding stale fragment");
                return Ok(LoadOutcome::Stale);
            }
            self.commit_locked(&mut state, parent, tx, &request, placement, resources, &options, &mut effects)
        };
        effects.dispatch(&self.inner);
        let committed = committed?;

        self.initialize_context(committed.context, tx, committed.behavior, &options.parameters)
            .await;
        Ok(LoadOutcome::Loaded {
            context: committed.context,
            sibling: committed.sibling,
        })
    }

    /// Loads a partial view into `target` beneath `context`.
    ///
    /// Partials use the context's path and transaction and always attach as
    /// siblings.
    pub async fn load_partial(
        &self,
        context: ContextId,
        target: ViewHandle,
        id: &str,
        kinds: ResourceKinds,
    ) -> Result<LoadOutcome> {
        let (home, tx) = {
            let state = self.inner.state.lock();
            let node = state.tree.node(context)?;
            (node.path.clone(), node.transaction)
        };
        let options = LoadOptions::new().with_kinds(kinds).with_container(target);
        self.load_fragment(context, tx, &home, id, options).await
    }

    fn resolve_placement(
        &self,
        state: &EngineState,
        parent: ContextId,
        base: &str,
        options: &LoadOptions,
    ) -> Result<Resolved> {
        if let Some(container) = &options.container {
            return Ok(Resolved::Place(Placement {
                target: Target::View(container.clone()),
                sibling: options.hierarchy_index.is_none(),
            }));
        }

        let parent_view = state.tree.node(parent)?.view.as_ref();
        if let (Some(level), Some(view)) = (options.hierarchy_index, parent_view) {
            if let Some(container) = self.inner.view_host.find_container(view, level) {
                return Ok(Resolved::Place(Placement {
                    target: Target::View(container),
                    sibling: false,
                }));
            }
        }

        let container_id = format!("{}{base}", self.inner.config.sibling_container_prefix);
        Ok(match self.inner.view_host.find_by_id(&container_id) {
            Some(view) => Resolved::Existing(view),
            None => Resolved::Place(Placement {
                target: Target::Create(container_id),
                sibling: true,
            }),
        })
    }

    fn sibling_rendered_in(&self, owner: ContextId, view: &ViewHandle) -> Option<ContextId> {
        let state = self.inner.state.lock();
        let siblings = &state.tree.get(owner)?.siblings;
        siblings
            .iter()
            .copied()
            .find(|id| state.tree.get(*id).is_some_and(|node| node.view.as_ref() == Some(view)))
    }

    #[allow(clippy::too_many_arguments)]
    fn commit_locked(
        &self,
        state: &mut EngineState,
        parent: ContextId,
        tx: TransactionId,
        request: &ResourceRequest,
        placement: Placement,
        resources: LoadedResources,
        options: &LoadOptions,
        effects: &mut Effects,
    ) -> Result<Committed> {
        let view_host = &self.inner.view_host;
        let sibling = placement.sibling;
        let parent_node = state.tree.node(parent)?;
        let parent_level = parent_node.hierarchy_index;
        let parent_view = parent_node.view.clone();

        let behavior = resources.behavior;
        let mut node = ContextNode::new(if sibling { parent_level } else { parent_level + 1 });
        node.fragment = options.fragment.clone().filter(|fragment| !fragment.is_empty());
        node.home_fragment = behavior.as_ref().and_then(|b| b.home_fragment());
        node.is_final = behavior.as_ref().is_some_and(|b| b.is_final());
        node.path = request.home.clone();
        node.url = visible_url(&request.home);
        node.parameters = options.parameters.clone();
        node.data = options.data.clone();
        node.transaction = tx;
        node.page = sibling.then(|| parent_node.page.unwrap_or(parent));
        node.main = if parent_level == 0 { None } else { parent_node.main };
        node.session = state.session.clone();
        node.behavior = behavior.clone();
        node.template = resources.template;
        node.resources = Some(request.handles());

        let context = state.tree.insert(node);
        let attached = if sibling {
            state.tree.attach_sibling(parent, context)
        } else {
            state.tree.attach_child(parent, context)
        };
        if let Err(e) = attached {
            state.tree.discard(context);
            return Err(e);
        }
        if parent_level == 0 {
            state.tree.node_mut(context)?.main = Some(context);
        }
        state.tree.propagate_transaction(context, tx);

        let view = match placement.target {
            Target::View(view) => view,
            Target::Create(container_id) => match view_host.find_by_id(&container_id) {
                Some(view) => view,
                None => {
                    let parent_view = parent_view.ok_or_else(|| {
                        CascadeError::Internal(format!("context {parent} has no view to host {container_id}"))
                    })?;
                    view_host.create_container(&parent_view, &container_id)
                }
            },
        };
        if options.reload {
            view_host.clear(&view);
        }
        state.tree.node_mut(context)?.view = Some(view.clone());

        build_messages(
            &mut state.tree,
            context,
            resources.messages.unwrap_or_else(empty_messages),
        )?;
        state.latest = Some(context);

        let node = state.tree.node(context)?;
        if !sibling {
            if let Some(title) = node.messages.get("title").and_then(Value::as_str) {
                view_host.set_title(title);
            }
        }
        let info = node.info();
        let scope = RenderScope {
            messages: &node.messages,
            context: &info,
            transaction: tx,
        };
        let template = node.template.as_deref();
        let content = match &options.view_builder {
            Some(builder) => builder(&scope, template),
            None => default_view_builder(&scope, template),
        };
        view_host.render(&view, &content);

        effects.trigger(format!("fragment-{}", request.id), None, state.tree.info(parent));
        effects.emit(EngineEventKind::FragmentLoaded {
            id: request.id.clone(),
            context,
            sibling,
        });
        info!(%tx, %context, %parent, base = %request.base(), sibling, "Fragment loaded");

        Ok(Committed {
            context,
            sibling,
            behavior,
        })
    }

    /// Runs the behavior's `initialize` once the engine is ready, unless the
    /// load went stale meanwhile.
    async fn initialize_context(
        &self,
        context: ContextId,
        tx: TransactionId,
        behavior: Option<Arc<dyn Behavior>>,
        parameters: &str,
    ) {
        let Some(behavior) = behavior else {
            return;
        };
        self.inner.ready.wait().await;

        let info = {
            let mut state = self.inner.state.lock();
            if !state.is_current(tx, Some(context)) {
                debug!(%tx, %context, "Skipping initialization of stale context");
                return;
            }
            let Some(node) = state.tree.get_mut(context) else {
                return;
            };
            node.initialized = Some(tx);
            node.info()
        };
        guarded("initialize", context, || behavior.initialize(&info, parameters));
    }
}

/// Visible url of a base path: its segments after the first, under `#/`.
pub(crate) fn visible_url(home: &str) -> String {
    let rest = home.split_once('/').map_or("", |(_, rest)| rest);
    format!("#/{rest}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_visible_url() {
        assert_eq!(visible_url("main"), "#/");
        assert_eq!(visible_url("main/users"), "#/users");
        assert_eq!(visible_url("main/users/edit"), "#/users/edit");
    }

    #[test]
    fn test_load_options_builder() {
        let options = LoadOptions::new()
            .with_hierarchy_index(2)
            .with_fragment("users")
            .with_parameters("42")
            .with_reload(true);

        assert_eq!(options.hierarchy_index, Some(2));
        assert_eq!(options.fragment.as_deref(), Some("users"));
        assert_eq!(options.parameters, "42");
        assert!(options.reload);
        assert_eq!(options.kinds, ResourceKinds::markup_only());
    }

    #[test]
    fn test_outcome_context() {
        let id = ContextId::new(4);
        assert_eq!(LoadOutcome::Loaded { context: id, sibling: false }.context(), Some(id));
        assert_eq!(LoadOutcome::AlreadyCurrent { context: None }.context(), None);
        assert_eq!(LoadOutcome::Stale.context(), None);
    }
}
