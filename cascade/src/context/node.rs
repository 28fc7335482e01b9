//! Context nodes and their read-only snapshots.

use crate::ports::{Behavior, ResourceHandles, Template, ViewHandle};
use crate::transaction::TransactionId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Typed index of a context inside one [`ContextTree`](super::ContextTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(usize);

impl ContextId {
    /// The root context, created with the tree.
    pub const ROOT: Self = Self(0);

    /// Wraps a raw index.
    #[must_use]
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    /// Returns the raw index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One loaded module instance. Owned exclusively by the tree.
pub(crate) struct ContextNode {
    pub(crate) id: ContextId,
    pub(crate) hierarchy_index: usize,
    /// `None` marks a structural placeholder.
    pub(crate) fragment: Option<String>,
    pub(crate) home_fragment: Option<String>,
    pub(crate) path: String,
    pub(crate) url: String,
    pub(crate) parameters: String,
    pub(crate) own_messages: serde_json::Value,
    pub(crate) merged_messages: serde_json::Value,
    /// Exposed set: merged messages plus keys pushed up by descendants.
    pub(crate) messages: serde_json::Value,
    pub(crate) data: Option<serde_json::Value>,
    pub(crate) transaction: TransactionId,
    pub(crate) initialized: Option<TransactionId>,
    pub(crate) view: Option<ViewHandle>,
    pub(crate) is_final: bool,
    pub(crate) parent: Option<ContextId>,
    pub(crate) child: Option<ContextId>,
    pub(crate) siblings: Vec<ContextId>,
    pub(crate) page: Option<ContextId>,
    pub(crate) main: Option<ContextId>,
    pub(crate) session: Option<Arc<serde_json::Value>>,
    pub(crate) unloaded: bool,
    pub(crate) behavior: Option<Arc<dyn Behavior>>,
    pub(crate) template: Option<Arc<dyn Template>>,
    pub(crate) resources: Option<ResourceHandles>,
}

impl ContextNode {
    pub(crate) fn new(hierarchy_index: usize) -> Self {
        Self {
            id: ContextId::ROOT,
            hierarchy_index,
            fragment: None,
            home_fragment: None,
            path: String::new(),
            url: String::new(),
            parameters: String::new(),
            own_messages: empty_messages(),
            merged_messages: empty_messages(),
            messages: empty_messages(),
            data: None,
            transaction: TransactionId::NONE,
            initialized: None,
            view: None,
            is_final: false,
            parent: None,
            child: None,
            siblings: Vec::new(),
            page: None,
            main: None,
            session: None,
            unloaded: false,
            behavior: None,
            template: None,
            resources: None,
        }
    }

    /// Root context bound to the whole surface.
    pub(crate) fn root(view: ViewHandle, path: impl Into<String>, url: impl Into<String>) -> Self {
        let mut node = Self::new(0);
        node.view = Some(view);
        node.path = path.into();
        node.url = url.into();
        node
    }

    /// Home fragment of this context, or `default` when unset or empty.
    pub(crate) fn home_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.home_fragment
            .as_deref()
            .filter(|home| !home.is_empty())
            .unwrap_or(default)
    }

    pub(crate) fn info(&self) -> ContextInfo {
        ContextInfo {
            id: self.id,
            hierarchy_index: self.hierarchy_index,
            fragment: self.fragment.clone(),
            home_fragment: self.home_fragment.clone(),
            path: self.path.clone(),
            url: self.url.clone(),
            parameters: self.parameters.clone(),
            messages: self.messages.clone(),
            data: self.data.clone(),
            transaction: self.transaction,
            initialized: self.initialized,
            view: self.view.clone(),
            is_final: self.is_final,
            parent: self.parent,
            child: self.child,
            siblings: self.siblings.clone(),
            page: self.page,
            main: self.main,
            session: self.session.clone(),
            unloaded: self.unloaded,
        }
    }
}

impl fmt::Debug for ContextNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextNode")
            .field("id", &self.id)
            .field("hierarchy_index", &self.hierarchy_index)
            .field("fragment", &self.fragment)
            .field("path", &self.path)
            .field("transaction", &self.transaction)
            .field("parent", &self.parent)
            .field("child", &self.child)
            .field("siblings", &self.siblings)
            .field("unloaded", &self.unloaded)
            .field("has_behavior", &self.behavior.is_some())
            .finish_non_exhaustive()
    }
}

pub(crate) fn empty_messages() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Read-only snapshot of a context, handed to hooks and callers.
#[derive(Debug, Clone)]
pub struct ContextInfo {
    /// Id inside the owning tree.
    pub id: ContextId,
    /// Depth in the main chain; siblings share their owner's depth.
    pub hierarchy_index: usize,
    /// Path segment the context was loaded for; `None` for placeholders.
    pub fragment: Option<String>,
    /// Default segment loaded beneath this context.
    pub home_fragment: Option<String>,
    /// Base resource path.
    pub path: String,
    /// Externally visible path.
    pub url: String,
    /// Unconsumed trailing segments.
    pub parameters: String,
    /// Exposed messages.
    pub messages: serde_json::Value,
    /// Payload given at load time.
    pub data: Option<serde_json::Value>,
    /// Last transaction that validated this context.
    pub transaction: TransactionId,
    /// Transaction in which the behavior was initialized.
    pub initialized: Option<TransactionId>,
    /// Rendered region.
    pub view: Option<ViewHandle>,
    /// Explicit terminal flag.
    pub is_final: bool,
    /// Parent context.
    pub parent: Option<ContextId>,
    /// Child in the main chain.
    pub child: Option<ContextId>,
    /// Contexts attached beside this one.
    pub siblings: Vec<ContextId>,
    /// Owning page of a sibling.
    pub page: Option<ContextId>,
    /// Context at the first real level of the chain.
    pub main: Option<ContextId>,
    /// Shared session state.
    pub session: Option<Arc<serde_json::Value>>,
    /// Whether the context has been unloaded.
    pub unloaded: bool,
}

impl ContextInfo {
    /// Snapshot of an empty context that belongs to no tree.
    #[must_use]
    pub fn detached() -> Self {
        ContextNode::new(0).info()
    }

    /// Returns true for structural placeholders.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.fragment.is_none()
    }
}
