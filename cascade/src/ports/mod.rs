//! Ports: the collaborators the engine consumes.
//!
//! The engine never touches a document, a module system or a network. It
//! drives these traits instead:
//! - [`ResourceLoader`] fetches markup, messages, behavior and stylesheets
//! - [`ViewHost`] finds, creates, clears and fills rendered regions
//! - [`Behavior`] is the per-module hook set
//! - [`AccessPolicy`] and [`ErrorReporter`] gate navigations

mod access;
mod behavior;
mod resources;
mod view;

pub use access::{AccessPolicy, AllowAll, ErrorReporter, LoggingErrorReporter};
#[cfg(test)]
pub use access::MockAccessPolicy;
pub use behavior::{Behavior, NoBehavior};
pub use resources::{LoadedResources, ResourceHandles, ResourceKinds, ResourceLoader, ResourceRequest};
pub use view::{
    default_view_builder, RenderScope, StaticTemplate, Template, ViewBuilder, ViewHandle, ViewHost,
};
