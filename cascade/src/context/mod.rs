//! The context tree.
//!
//! This module provides:
//! - Context nodes, one per loaded module, addressed by [`ContextId`]
//! - Read-only [`ContextInfo`] snapshots for hooks and callers
//! - The [`ContextTree`] owning the main chain and its siblings

#[cfg(test)]
mod context_tests;
mod node;
mod tree;

pub(crate) use node::{empty_messages, ContextNode};
pub use node::{ContextId, ContextInfo};
pub use tree::{ContextTree, UnloadHook, UnloadReport};
