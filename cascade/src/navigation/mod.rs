//! The navigation engine.
//!
//! This module provides:
//! - [`Engine`]: one instance owning a transaction counter and context tree
//! - Fragment reconciliation of a requested path against the live chain
//! - [`Engine::load_fragment`] and [`Engine::load_partial`] for module loads
//! - [`EngineConfig`] and the [`ReadyBarrier`] gating behavior initialization
//!
//! Every mutation checks that its transaction is still current. Behavior
//! hooks, event listeners and resource releases run after the engine lock is
//! released, in the order they were produced.

mod config;
mod effects;
mod engine;
mod orchestrator;
mod ready;
mod reconcile;


pub use config::EngineConfig;
pub use engine::{Engine, EngineBuilder, NavigationOutcome, NavigationPhase};
pub use orchestrator::{LoadOptions, LoadOutcome};
pub use ready::ReadyBarrier;
