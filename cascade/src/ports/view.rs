//! Rendering port: view handles, hosts and templates.

use crate::context::ContextInfo;
use crate::transaction::TransactionId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Opaque reference to a rendered region owned by the [`ViewHost`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewHandle(String);

impl ViewHandle {
    /// Wraps a host-specific region identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the region identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ViewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The visible surface the engine renders into.
///
/// Calls happen while the engine holds its state lock; implementations must
/// not call back into the engine.
pub trait ViewHost: Send + Sync {
    /// Finds the first container marked for `hierarchy_index` inside `view`.
    fn find_container(&self, view: &ViewHandle, hierarchy_index: usize) -> Option<ViewHandle>;

    /// Finds a region by its unique identifier.
    fn find_by_id(&self, id: &str) -> Option<ViewHandle>;

    /// Appends a new region with identifier `id` inside `parent`.
    fn create_container(&self, parent: &ViewHandle, id: &str) -> ViewHandle;

    /// Removes every piece of content from `view`.
    fn clear(&self, view: &ViewHandle);

    /// Replaces the content of `view`.
    fn render(&self, view: &ViewHandle, content: &str);

    /// Updates the surface title.
    fn set_title(&self, _title: &str) {}
}

/// What a template or view builder sees while rendering one context.
#[derive(Debug, Clone, Copy)]
pub struct RenderScope<'a> {
    /// Exposed messages of the context being rendered.
    pub messages: &'a serde_json::Value,
    /// The context being rendered.
    pub context: &'a ContextInfo,
    /// The transaction rendering it.
    pub transaction: TransactionId,
}

impl RenderScope<'_> {
    /// Resolves a dotted message key to a string.
    #[must_use]
    pub fn message(&self, key: &str) -> Option<&str> {
        key.split('.')
            .try_fold(self.messages, |value, segment| value.get(segment))
            .and_then(serde_json::Value::as_str)
    }
}

/// Compiled markup.
pub trait Template: Send + Sync {
    /// Produces the view content for `scope`.
    fn render(&self, scope: &RenderScope<'_>) -> String;
}

impl<F> Template for F
where
    F: Fn(&RenderScope<'_>) -> String + Send + Sync,
{
    fn render(&self, scope: &RenderScope<'_>) -> String {
        self(scope)
    }
}

/// Markup without any substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticTemplate(String);

impl StaticTemplate {
    /// Creates a template that always renders `markup`.
    #[must_use]
    pub fn new(markup: impl Into<String>) -> Self {
        Self(markup.into())
    }
}

impl Template for StaticTemplate {
    fn render(&self, _scope: &RenderScope<'_>) -> String {
        self.0.clone()
    }
}

/// Builds the view content of a context, replacing template rendering.
pub type ViewBuilder = Arc<dyn Fn(&RenderScope<'_>, Option<&dyn Template>) -> String + Send + Sync>;

/// Renders the template with the scope, or nothing without a template.
#[must_use]
pub fn default_view_builder(scope: &RenderScope<'_>, template: Option<&dyn Template>) -> String {
    template.map(|t| t.render(scope)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextInfo;
    use serde_json::json;

    #[test]
    fn test_scope_message_lookup() {
        let messages = json!({"title": "Home", "menu": {"users": "Users"}, "count": 3});
        let context = ContextInfo::detached();
        let scope = RenderScope {
            messages: &messages,
            context: &context,
            transaction: TransactionId::NONE,
        };

        assert_eq!(scope.message("title"), Some("Home"));
        assert_eq!(scope.message("menu.users"), Some("Users"));
        assert_eq!(scope.message("count"), None);
        assert_eq!(scope.message("missing.key"), None);
    }

    #[test]
    fn test_default_view_builder() {
        let messages = json!({"title": "Hello"});
        let context = ContextInfo::detached();
        let scope = RenderScope {
            messages: &messages,
            context: &context,
            transaction: TransactionId::NONE,
        };

        let template = |scope: &RenderScope<'_>| format!("<h1>{}</h1>", scope.message("title").unwrap_or(""));
        assert_eq!(default_view_builder(&scope, Some(&template)), "<h1>Hello</h1>");
        assert_eq!(default_view_builder(&scope, None), "");
        assert_eq!(
            default_view_builder(&scope, Some(&StaticTemplate::new("<p></p>"))),
            "<p></p>"
        );
    }
}
