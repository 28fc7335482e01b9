//! Error types for the cascade navigation engine.
//!
//! Staleness is deliberately absent from this taxonomy: a superseded
//! navigation is reported through [`NavigationOutcome::Superseded`] and
//! [`LoadOutcome::Stale`], never as an error.
//!
//! [`NavigationOutcome::Superseded`]: crate::navigation::NavigationOutcome::Superseded
//! [`LoadOutcome::Stale`]: crate::navigation::LoadOutcome::Stale

use crate::context::ContextId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, CascadeError>;

/// The main error type for cascade operations.
#[derive(Debug, Error)]
pub enum CascadeError {
    /// Navigation was rejected by the access policy before any tree mutation.
    #[error("Access denied for '{url}'")]
    AccessDenied {
        /// The rejected navigation path.
        url: String,
    },

    /// The resource loader failed to resolve one of the requested kinds.
    #[error("Failed to resolve resources for '{base}': {source}")]
    ResourceResolution {
        /// The base resource path (`home/id`).
        base: String,
        /// The loader's error.
        #[source]
        source: anyhow::Error,
    },

    /// A child was attached where a live one already exists.
    #[error("{0}")]
    StructuralConflict(#[from] StructuralConflictError),

    /// A context id does not belong to this engine's tree.
    #[error("Unknown context: {0}")]
    UnknownContext(ContextId),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The engine reached a state its invariants rule out.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CascadeError {
    /// Wraps a loader failure for the given base path.
    pub fn resolution(base: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::ResourceResolution {
            base: base.into(),
            source: source.into(),
        }
    }

    /// Returns the stable error code used in logs and events.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::AccessDenied { .. } => "CASCADE-ACCESS-DENIED",
            Self::ResourceResolution { .. } => "CASCADE-RESOLUTION",
            Self::StructuralConflict(err) => err.error_info.code_static(),
            Self::UnknownContext(_) => "CASCADE-UNKNOWN-CONTEXT",
            Self::Config(_) => "CASCADE-CONFIG",
            Self::Internal(_) => "CASCADE-INTERNAL",
            Self::Serialization(_) => "CASCADE-SERIALIZATION",
            Self::Io(_) => "CASCADE-IO",
        }
    }
}

/// Diagnostic metadata attached to contract violations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContractErrorInfo {
    /// Error code (e.g., "CASCADE-CHILD-CONFLICT").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ContractErrorInfo {
    /// Creates a new contract error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    fn code_static(&self) -> &'static str {
        match self.code.as_str() {
            CHILD_CONFLICT_CODE => CHILD_CONFLICT_CODE,
            _ => "CASCADE-CONTRACT",
        }
    }
}

const CHILD_CONFLICT_CODE: &str = "CASCADE-CHILD-CONFLICT";

/// Raised when a child is attached to a context that still owns a live child.
#[derive(Debug, Clone, Error)]
#[error("Context {parent} already has live child {existing}; unload it before attaching {attempted}")]
pub struct StructuralConflictError {
    /// The context receiving the child.
    pub parent: ContextId,
    /// The live child currently attached.
    pub existing: ContextId,
    /// The context that could not be attached.
    pub attempted: ContextId,
    /// Contract error info.
    pub error_info: ContractErrorInfo,
}

impl StructuralConflictError {
    /// Creates a new structural conflict error.
    #[must_use]
    pub fn new(parent: ContextId, existing: ContextId, attempted: ContextId) -> Self {
        let info = ContractErrorInfo::new(
            CHILD_CONFLICT_CODE,
            format!("Context {parent} already owns child {existing}"),
        )
        .with_fix_hint("Unload the previous subtree before attaching a new child.")
        .with_context_entry("parent", parent.to_string())
        .with_context_entry("existing", existing.to_string());

        Self {
            parent,
            existing,
            attempted,
            error_info: info,
        }
    }
}
