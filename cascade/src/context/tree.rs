//! The context tree: a single main chain with sibling attachments.

use super::node::{ContextId, ContextInfo, ContextNode};
use crate::errors::{CascadeError, Result, StructuralConflictError};
use crate::ports::{Behavior, ResourceHandles};
use crate::transaction::TransactionId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

/// An unload hook to run once the engine lock is released.
#[derive(Clone)]
pub struct UnloadHook {
    /// The page or parent owning the departing context.
    pub owner: ContextId,
    /// The owner's behavior.
    pub behavior: Arc<dyn Behavior>,
    /// Snapshot of the departing context.
    pub departing: ContextInfo,
}

impl fmt::Debug for UnloadHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnloadHook")
            .field("owner", &self.owner)
            .field("departing", &self.departing.id)
            .finish()
    }
}

/// Everything an unload produced, in visiting order.
#[derive(Debug, Default)]
pub struct UnloadReport {
    /// Parent of the unloaded context, where the walk re-roots.
    pub parent: Option<ContextId>,
    /// Unloaded contexts, descendants before their owners.
    pub visited: Vec<ContextId>,
    /// Hooks to invoke, in order.
    pub hooks: Vec<UnloadHook>,
    /// Resource handles to release.
    pub released: Vec<ResourceHandles>,
}

/// Owns every context node of one engine.
///
/// Nodes are addressed by [`ContextId`]; ids are never reused, and unloaded
/// nodes are dropped from the tree once their unload completes.
#[derive(Debug)]
pub struct ContextTree {
    nodes: HashMap<ContextId, ContextNode>,
    next_id: usize,
}

impl ContextTree {
    pub(crate) fn new(mut root: ContextNode) -> Self {
        root.id = ContextId::ROOT;
        let mut nodes = HashMap::new();
        nodes.insert(ContextId::ROOT, root);
        Self { nodes, next_id: 1 }
    }

    /// Returns the root context id.
    #[must_use]
    pub fn root(&self) -> ContextId {
        ContextId::ROOT
    }

    /// Number of live contexts, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the root lives as long as the tree.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns a snapshot of a live context.
    #[must_use]
    pub fn info(&self, id: ContextId) -> Option<ContextInfo> {
        self.nodes.get(&id).map(ContextNode::info)
    }

    /// Returns true if the context is unloaded or no longer in the tree.
    #[must_use]
    pub fn is_unloaded(&self, id: ContextId) -> bool {
        self.nodes.get(&id).map_or(true, |node| node.unloaded)
    }

    pub(crate) fn get(&self, id: ContextId) -> Option<&ContextNode> {
        self.nodes.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: ContextId) -> Option<&mut ContextNode> {
        self.nodes.get_mut(&id)
    }

    pub(crate) fn node(&self, id: ContextId) -> Result<&ContextNode> {
        self.nodes.get(&id).ok_or(CascadeError::UnknownContext(id))
    }

    pub(crate) fn node_mut(&mut self, id: ContextId) -> Result<&mut ContextNode> {
        self.nodes.get_mut(&id).ok_or(CascadeError::UnknownContext(id))
    }

    /// Adds a detached node and returns its id.
    pub(crate) fn insert(&mut self, mut node: ContextNode) -> ContextId {
        let id = ContextId::new(self.next_id);
        self.next_id += 1;
        node.id = id;
        self.nodes.insert(id, node);
        id
    }

    /// Drops a node that never got attached.
    pub(crate) fn discard(&mut self, id: ContextId) {
        if id != ContextId::ROOT {
            self.nodes.remove(&id);
        }
    }

    /// Attaches `context` as the child of `parent`.
    ///
    /// # Errors
    ///
    /// Returns a structural conflict if `parent` still owns a live child.
    pub fn attach_child(&mut self, parent: ContextId, context: ContextId) -> Result<()> {
        self.node(context)?;
        let existing = self.node(parent)?.child;
        if let Some(existing) = existing.filter(|child| !self.is_unloaded(*child)) {
            let err = StructuralConflictError::new(parent, existing, context);
            error!(%parent, %existing, attempted = %context, "Refusing to replace a live child");
            return Err(err.into());
        }

        self.node_mut(parent)?.child = Some(context);
        self.node_mut(context)?.parent = Some(parent);
        Ok(())
    }

    /// Attaches `context` beside the main chain, owned by `owner`.
    pub fn attach_sibling(&mut self, owner: ContextId, context: ContextId) -> Result<()> {
        self.node(context)?;
        self.node_mut(owner)?.siblings.push(context);
        self.node_mut(context)?.parent = Some(owner);
        Ok(())
    }

    /// Unloads `id` and everything beneath it.
    ///
    /// Siblings are unloaded first, in attachment order, then the child, then
    /// the node itself: its page's and parent's unload hooks are collected,
    /// it is marked unloaded and its resource handles are queued for
    /// release. The node is detached from its parent and dropped.
    ///
    /// The root itself is never dropped: unloading it unloads everything it
    /// owns and leaves an empty chain.
    pub fn unload(&mut self, id: ContextId) -> Result<UnloadReport> {
        if id == ContextId::ROOT {
            return self.unload_beneath_root();
        }
        let parent = self.node(id)?.parent;
        let mut report = UnloadReport {
            parent,
            ..UnloadReport::default()
        };

        // (context, descendants already scheduled)
        let mut stack = vec![(id, false)];
        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                self.finish_unload(current, &mut report);
                continue;
            }
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            if node.unloaded {
                continue;
            }
            stack.push((current, true));
            if let Some(child) = node.child {
                stack.push((child, false));
            }
            stack.extend(node.siblings.iter().rev().map(|sibling| (*sibling, false)));
        }

        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            if parent.child == Some(id) {
                parent.child = None;
            }
            parent.siblings.retain(|sibling| *sibling != id);
        }
        for visited in &report.visited {
            self.nodes.remove(visited);
        }

        debug!(context = %id, unloaded = report.visited.len(), "Unloaded context subtree");
        Ok(report)
    }

    fn unload_beneath_root(&mut self) -> Result<UnloadReport> {
        let root = self.node(ContextId::ROOT)?;
        let owned: Vec<ContextId> = root.siblings.iter().copied().chain(root.child).collect();

        let mut report = UnloadReport::default();
        for id in owned {
            if !self.nodes.contains_key(&id) {
                continue;
            }
            let subtree = self.unload(id)?;
            report.visited.extend(subtree.visited);
            report.hooks.extend(subtree.hooks);
            report.released.extend(subtree.released);
        }
        Ok(report)
    }

    fn finish_unload(&mut self, id: ContextId, report: &mut UnloadReport) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let departing = node.info();
        let mut owners = Vec::with_capacity(2);
        for owner in [node.page, node.parent].into_iter().flatten() {
            if !owners.contains(&owner) {
                owners.push(owner);
            }
        }
        for owner in owners {
            if let Some(behavior) = self.nodes.get(&owner).and_then(|o| o.behavior.clone()) {
                report.hooks.push(UnloadHook {
                    owner,
                    behavior,
                    departing: departing.clone(),
                });
            }
        }

        if let Some(node) = self.nodes.get_mut(&id) {
            node.unloaded = true;
            node.child = None;
            node.siblings.clear();
            if let Some(handles) = node.resources.take() {
                report.released.push(handles);
            }
        }
        report.visited.push(id);
    }

    /// Ancestor chain from the root down to `id`.
    #[must_use]
    pub fn hierarchy(&self, id: ContextId) -> Vec<ContextId> {
        let mut chain = Vec::new();
        let mut cursor = self.nodes.get(&id).map(|node| node.id);
        while let Some(current) = cursor {
            chain.push(current);
            cursor = self.nodes.get(&current).and_then(|node| node.parent);
        }
        chain.reverse();
        chain
    }

    /// The live main chain, following child pointers from the root.
    #[must_use]
    pub fn chain(&self) -> Vec<ContextId> {
        let mut chain = vec![ContextId::ROOT];
        let mut cursor = self.nodes.get(&ContextId::ROOT).and_then(|node| node.child);
        while let Some(current) = cursor.filter(|id| !self.is_unloaded(*id)) {
            chain.push(current);
            cursor = self.nodes.get(&current).and_then(|node| node.child);
        }
        chain
    }

    /// Deepest context of the main chain.
    #[must_use]
    pub fn current(&self) -> ContextId {
        self.chain().last().copied().unwrap_or(ContextId::ROOT)
    }

    /// Stamps `tx` onto `id` and every ancestor.
    ///
    /// Stamps never move backwards.
    pub fn propagate_transaction(&mut self, id: ContextId, tx: TransactionId) {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(node) = self.nodes.get_mut(&current) else {
                break;
            };
            node.transaction = node.transaction.max(tx);
            cursor = node.parent;
        }
    }
}
