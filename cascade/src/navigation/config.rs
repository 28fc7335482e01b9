//! Engine configuration.

use crate::errors::{CascadeError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for a navigation [`Engine`](super::Engine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// View handle of the root context.
    #[serde(default = "default_root_view")]
    pub root_view: String,
    /// Base resource path of the root context.
    #[serde(default)]
    pub root_path: String,
    /// Visible url of the root context.
    #[serde(default = "default_root_url")]
    pub root_url: String,
    /// Home fragment used when a context declares none.
    #[serde(default = "default_home")]
    pub default_home: String,
    /// Synthetic segment standing for the root level.
    #[serde(default = "default_root_segment")]
    pub root_segment: String,
    /// Synthetic segment standing for the first real level.
    #[serde(default = "default_main_segment")]
    pub main_segment: String,
    /// Zone prepared before level 1 is reconciled.
    #[serde(default = "default_protected_zone")]
    pub protected_zone: String,
    /// Zone prepared after level 1 is loaded.
    #[serde(default = "default_private_zone")]
    pub private_zone: String,
    /// Prefix of sibling container ids.
    #[serde(default = "default_sibling_prefix")]
    pub sibling_container_prefix: String,
    /// When set, behaviors are initialized only after [`Engine::mark_ready`](super::Engine::mark_ready).
    #[serde(default)]
    pub manual_ready: bool,
}

fn default_root_view() -> String {
    "body".to_string()
}

fn default_root_url() -> String {
    "#/".to_string()
}

fn default_home() -> String {
    "home".to_string()
}

fn default_root_segment() -> String {
    "root".to_string()
}

fn default_main_segment() -> String {
    "main".to_string()
}

fn default_protected_zone() -> String {
    "zone-protected".to_string()
}

fn default_private_zone() -> String {
    "zone-private".to_string()
}

fn default_sibling_prefix() -> String {
    "_module-".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            root_view: default_root_view(),
            root_path: String::new(),
            root_url: default_root_url(),
            default_home: default_home(),
            root_segment: default_root_segment(),
            main_segment: default_main_segment(),
            protected_zone: default_protected_zone(),
            private_zone: default_private_zone(),
            sibling_container_prefix: default_sibling_prefix(),
            manual_ready: false,
        }
    }
}

impl EngineConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Sets the root view handle.
    #[must_use]
    pub fn with_root_view(mut self, view: impl Into<String>) -> Self {
        self.root_view = view.into();
        self
    }

    /// Sets the default home fragment.
    #[must_use]
    pub fn with_default_home(mut self, home: impl Into<String>) -> Self {
        self.default_home = home.into();
        self
    }

    /// Sets the zone names.
    #[must_use]
    pub fn with_zones(mut self, protected: impl Into<String>, private: impl Into<String>) -> Self {
        self.protected_zone = protected.into();
        self.private_zone = private.into();
        self
    }

    /// Sets the sibling container prefix.
    #[must_use]
    pub fn with_sibling_container_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.sibling_container_prefix = prefix.into();
        self
    }

    /// Holds behavior initialization until the engine is marked ready.
    #[must_use]
    pub fn with_manual_ready(mut self, manual: bool) -> Self {
        self.manual_ready = manual;
        self
    }

    /// Checks that every segment-like field is a single non-empty segment.
    pub fn validate(&self) -> Result<()> {
        let segments = [
            ("default_home", &self.default_home),
            ("root_segment", &self.root_segment),
            ("main_segment", &self.main_segment),
        ];
        for (field, value) in segments {
            if value.is_empty() {
                return Err(CascadeError::Config(format!("{field} must not be empty")));
            }
            if value.contains('/') {
                return Err(CascadeError::Config(format!(
                    "{field} must be a single path segment, got '{value}'"
                )));
            }
        }
        if self.root_view.is_empty() {
            return Err(CascadeError::Config("root_view must not be empty".to_string()));
        }
        Ok(())
    }
}
