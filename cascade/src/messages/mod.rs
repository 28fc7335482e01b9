//! Hierarchical message merging.
//!
//! Every context keeps three message sets:
//! - own: the bundle loaded with the module
//! - merged: the nearest ancestor's merged set overlaid with own
//! - exposed: merged, plus keys pushed up by descendants loaded later
//!
//! Descendant keys reach ancestors only through the exposed set, so content
//! rendered higher in the chain can resolve strings a deeper module defines
//! while every merged set stays a pure function of the chain's own bundles.

mod merge;

pub use merge::{build_messages, deep_merge, merged_messages, recompute_merged};
