//! Observability utilities.
//!
//! This module provides:
//! - Span attributes describing a navigation
//! - A timing helper used for duration logging
//! - Subscriber setup driven by `CASCADE_LOG`

mod tracing;

pub use tracing::{init_tracing, NavigationSpanAttributes, SpanTimer, LOG_ENV_VAR};
