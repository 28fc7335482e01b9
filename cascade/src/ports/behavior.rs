//! Per-module behavior hooks.

use crate::context::ContextInfo;

/// Hooks a loaded module may provide.
///
/// Every member is optional. Hooks run outside the engine lock and receive
/// read-only snapshots, so they may call back into the engine.
pub trait Behavior: Send + Sync {
    /// Segment loaded beneath this module when the path names none.
    fn home_fragment(&self) -> Option<String> {
        None
    }

    /// Forces terminal treatment regardless of the rendered view.
    fn is_final(&self) -> bool {
        false
    }

    /// Runs once per successful load, after the readiness barrier.
    fn initialize(&self, _context: &ContextInfo, _parameters: &str) {}

    /// Called on the owning page and parent when `departing` is unloaded.
    fn unload(&self, _departing: &ContextInfo) {}

    /// Called when the parameters of an already initialized terminal
    /// context change in a later navigation.
    fn on_hash_change(&self, _context: &ContextInfo, _parameters: &str) {}
}

/// A behavior with every hook left at its default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBehavior;

impl Behavior for NoBehavior {}
