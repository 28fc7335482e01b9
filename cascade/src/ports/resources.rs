//! Resource loading port.

use super::{Behavior, Template};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Which resource kinds a load requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceKinds {
    /// Markup compiled into a [`Template`].
    pub markup: bool,
    /// Localized message bundle.
    pub messages: bool,
    /// Behavior module.
    pub behavior: bool,
    /// Stylesheet, installed by the loader itself.
    pub stylesheet: bool,
}

impl Default for ResourceKinds {
    fn default() -> Self {
        Self::markup_only()
    }
}

impl ResourceKinds {
    /// Every resource kind, as requested by navigation loads.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            markup: true,
            messages: true,
            behavior: true,
            stylesheet: true,
        }
    }

    /// Markup only, the default for partial loads.
    #[must_use]
    pub const fn markup_only() -> Self {
        Self {
            markup: true,
            messages: false,
            behavior: false,
            stylesheet: false,
        }
    }

    /// Parses a comma separated list of `html`, `i18n`, `js` and `css`.
    ///
    /// Unknown entries are ignored. An empty list means markup only.
    #[must_use]
    pub fn parse_list(list: &str) -> Self {
        let entries: Vec<&str> = list
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .collect();
        if entries.is_empty() {
            return Self::markup_only();
        }

        Self {
            markup: entries.contains(&"html"),
            messages: entries.contains(&"i18n"),
            behavior: entries.contains(&"js"),
            stylesheet: entries.contains(&"css"),
        }
    }

    /// Returns true if nothing is requested.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !(self.markup || self.messages || self.behavior || self.stylesheet)
    }
}

/// Identifiers of the resources loaded for one context.
///
/// The loader receives them back on unload so it can forget whatever it
/// registered for the module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHandles {
    /// Message bundle, shared by every module under the same home.
    pub messages: String,
    /// Markup file.
    pub markup: String,
    /// Stylesheet file.
    pub stylesheet: String,
    /// Behavior module.
    pub behavior: String,
}

/// One load request: the module `id` living under `home`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    /// Module home, without trailing slash.
    pub home: String,
    /// Module identifier, used as the base file name.
    pub id: String,
    /// Requested kinds.
    pub kinds: ResourceKinds,
}

impl ResourceRequest {
    /// Creates a request, trimming a trailing slash from `home`.
    #[must_use]
    pub fn new(home: impl Into<String>, id: impl Into<String>, kinds: ResourceKinds) -> Self {
        let home = home.into();
        Self {
            home: home.trim_end_matches('/').to_string(),
            id: id.into(),
            kinds,
        }
    }

    /// Base path of the module files: `home/id`.
    #[must_use]
    pub fn base(&self) -> String {
        format!("{}/{}", self.home, self.id)
    }

    /// Handles of every resource this module may own.
    #[must_use]
    pub fn handles(&self) -> ResourceHandles {
        let base = self.base();
        ResourceHandles {
            messages: format!("{}/nls/messages", self.home),
            markup: format!("{base}.html"),
            stylesheet: format!("{base}.css"),
            behavior: base,
        }
    }
}

impl fmt::Display for ResourceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base())
    }
}

/// Resolved resources. Kinds that were not requested stay `None`.
#[derive(Clone, Default)]
pub struct LoadedResources {
    /// Compiled markup.
    pub template: Option<Arc<dyn Template>>,
    /// Message bundle, a JSON object.
    pub messages: Option<serde_json::Value>,
    /// Behavior hooks.
    pub behavior: Option<Arc<dyn Behavior>>,
}

impl fmt::Debug for LoadedResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedResources")
            .field("has_template", &self.template.is_some())
            .field("messages", &self.messages)
            .field("has_behavior", &self.behavior.is_some())
            .finish()
    }
}

/// Fetches and compiles module resources.
///
/// Failures surface as errors and are propagated to the navigation caller;
/// the engine attaches nothing until every requested kind has resolved.
#[async_trait]
pub trait ResourceLoader: Send + Sync {
    /// Resolves the requested kinds for `request`.
    async fn load(&self, request: &ResourceRequest) -> anyhow::Result<LoadedResources>;

    /// Makes a top-level zone available before its levels load.
    async fn prepare_zone(&self, _zone: &str) -> anyhow::Result<()> {
        Ok(())
    }

    /// Forgets the resources of an unloaded context.
    fn release(&self, _handles: &ResourceHandles) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        let kinds = ResourceKinds::parse_list("html, js,css");
        assert!(kinds.markup);
        assert!(kinds.behavior);
        assert!(kinds.stylesheet);
        assert!(!kinds.messages);
    }

    #[test]
    fn test_parse_empty_list_defaults_to_markup() {
        assert_eq!(ResourceKinds::parse_list(""), ResourceKinds::markup_only());
        assert_eq!(ResourceKinds::parse_list(" , "), ResourceKinds::markup_only());
    }

    #[test]
    fn test_parse_unknown_only() {
        let kinds = ResourceKinds::parse_list("svg");
        assert!(kinds.is_empty());
    }

    #[test]
    fn test_request_paths() {
        let request = ResourceRequest::new("main/admin/", "users", ResourceKinds::all());
        assert_eq!(request.home, "main/admin");
        assert_eq!(request.base(), "main/admin/users");

        let handles = request.handles();
        assert_eq!(handles.messages, "main/admin/nls/messages");
        assert_eq!(handles.markup, "main/admin/users.html");
        assert_eq!(handles.stylesheet, "main/admin/users.css");
        assert_eq!(handles.behavior, "main/admin/users");
    }
}
