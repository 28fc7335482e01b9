//! Span attributes, timing, and subscriber setup for navigations.

use crate::errors::{CascadeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable consulted by [`init_tracing`] before the fallback level.
pub const LOG_ENV_VAR: &str = "CASCADE_LOG";

/// Span attributes for one navigation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavigationSpanAttributes {
    /// Engine instance id.
    pub engine_id: Option<String>,
    /// Requested path.
    pub url: Option<String>,
    /// Transaction of the navigation.
    pub transaction: Option<String>,
    /// Outcome label (`completed`, `superseded`, `failed`, `denied`).
    pub outcome: Option<String>,
    /// Duration in milliseconds.
    pub duration_ms: Option<f64>,
    /// Error code if the navigation failed.
    pub error_code: Option<String>,
}

impl NavigationSpanAttributes {
    /// Creates attributes for a requested path.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Sets the engine id.
    #[must_use]
    pub fn with_engine_id(mut self, id: impl Into<String>) -> Self {
        self.engine_id = Some(id.into());
        self
    }

    /// Sets the transaction.
    #[must_use]
    pub fn with_transaction(mut self, transaction: impl ToString) -> Self {
        self.transaction = Some(transaction.to_string());
        self
    }

    /// Sets the outcome label.
    #[must_use]
    pub fn with_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.outcome = Some(outcome.into());
        self
    }

    /// Sets the duration.
    #[must_use]
    pub const fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Sets the error code.
    #[must_use]
    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    /// Converts to OpenTelemetry-style attributes.
    #[must_use]
    pub fn to_otel_attributes(&self) -> HashMap<String, String> {
        let mut attrs = HashMap::new();

        if let Some(ref v) = self.engine_id {
            attrs.insert("cascade.engine_id".to_string(), v.clone());
        }
        if let Some(ref v) = self.url {
            attrs.insert("navigation.url".to_string(), v.clone());
        }
        if let Some(ref v) = self.transaction {
            attrs.insert("navigation.transaction".to_string(), v.clone());
        }
        if let Some(ref v) = self.outcome {
            attrs.insert("navigation.outcome".to_string(), v.clone());
        }
        if let Some(v) = self.duration_ms {
            attrs.insert("navigation.duration_ms".to_string(), v.to_string());
        }
        if let Some(ref v) = self.error_code {
            attrs.insert("navigation.error_code".to_string(), v.clone());
        }

        attrs
    }
}

/// Simple span timing helper.
#[derive(Debug)]
pub struct SpanTimer {
    start: Instant,
    name: String,
}

impl SpanTimer {
    /// Starts a new span timer.
    #[must_use]
    pub fn start(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Returns the elapsed time in milliseconds.
    #[must_use]
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Returns the span name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Finishes the span and returns the duration.
    #[must_use]
    pub fn finish(self) -> f64 {
        self.elapsed_ms()
    }
}

/// Installs a global `fmt` subscriber.
///
/// The filter comes from `CASCADE_LOG` when set, else from `default_level`
/// (e.g. `"info"` or `"cascade=debug"`). Returns an error when a subscriber
/// is already installed or the directive does not parse.
pub fn init_tracing(default_level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_env(LOG_ENV_VAR) {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level)
            .map_err(|e| CascadeError::Config(format!("Invalid log directive: {e}")))?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .map_err(|e| CascadeError::Config(format!("Failed to install subscriber: {e}")))
}
