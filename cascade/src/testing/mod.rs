//! Testing utilities for cascade engines.
//!
//! This module provides:
//! - In-memory resource loader, view host and error reporter
//! - A recording behavior writing to a shared call log
//! - A harness wiring them to an engine, plus chain assertions

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{assert_chain, assert_completed, assert_superseded, chain_fragments};
pub use fixtures::{module_base, TestHarness};
pub use mocks::{
    hierarchy_marker, BehaviorCall, CallLog, MockModule, MockResourceLoader, MockViewHost,
    RecordingBehavior, RecordingErrorReporter,
};
