//! Collaborator calls deferred until the engine lock is released.

use super::engine::EngineInner;
use crate::context::{ContextId, ContextInfo, UnloadReport};
use crate::events::{EngineEvent, EngineEventKind, EventData};
use crate::ports::{Behavior, ResourceHandles};
use crate::transaction::TransactionId;
use std::sync::Arc;
use tracing::warn;

enum Effect {
    Unload {
        behavior: Arc<dyn Behavior>,
        departing: ContextInfo,
    },
    Release(ResourceHandles),
    HashChange {
        behavior: Arc<dyn Behavior>,
        context: ContextInfo,
        parameters: String,
    },
    Trigger {
        event: String,
        data: Option<EventData>,
        context: Option<ContextInfo>,
    },
    Emit(EngineEventKind),
}

/// Ordered queue of hooks, events and releases produced under the lock.
pub(crate) struct Effects {
    transaction: TransactionId,
    queue: Vec<Effect>,
}

impl Effects {
    pub(crate) const fn new(transaction: TransactionId) -> Self {
        Self {
            transaction,
            queue: Vec::new(),
        }
    }

    pub(crate) fn unloaded(&mut self, report: UnloadReport) {
        for hook in report.hooks {
            self.queue.push(Effect::Unload {
                behavior: hook.behavior,
                departing: hook.departing,
            });
        }
        for handles in report.released {
            self.queue.push(Effect::Release(handles));
        }
        for context in report.visited {
            self.emit(EngineEventKind::ContextUnloaded { context });
        }
    }

    pub(crate) fn hash_change(&mut self, behavior: Arc<dyn Behavior>, context: ContextInfo, parameters: &str) {
        self.queue.push(Effect::HashChange {
            behavior,
            context,
            parameters: parameters.to_string(),
        });
    }

    pub(crate) fn trigger(&mut self, event: impl Into<String>, data: Option<EventData>, context: Option<ContextInfo>) {
        self.queue.push(Effect::Trigger {
            event: event.into(),
            data,
            context,
        });
    }

    pub(crate) fn emit(&mut self, kind: EngineEventKind) {
        self.queue.push(Effect::Emit(kind));
    }

    /// Runs every queued effect in order. Must be called without the lock held.
    pub(crate) fn dispatch(self, inner: &EngineInner) {
        let transaction = self.transaction;
        for effect in self.queue {
            match effect {
                Effect::Unload { behavior, departing } => {
                    guarded("unload", departing.id, || behavior.unload(&departing));
                }
                Effect::Release(handles) => inner.loader.release(&handles),
                Effect::HashChange {
                    behavior,
                    context,
                    parameters,
                } => {
                    guarded("on_hash_change", context.id, || {
                        behavior.on_hash_change(&context, &parameters);
                    });
                }
                Effect::Trigger { event, data, context } => {
                    inner.bus.trigger(&event, data, context.as_ref());
                }
                Effect::Emit(kind) => {
                    inner.sink.emit(&EngineEvent::new(inner.id, transaction, kind));
                }
            }
        }
    }
}

/// Calls a behavior hook, logging instead of unwinding through the engine.
pub(crate) fn guarded(hook: &str, context: ContextId, call: impl FnOnce()) {
    if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(call)) {
        warn!(hook, %context, "Behavior hook panicked: {:?}", e);
    }
}
