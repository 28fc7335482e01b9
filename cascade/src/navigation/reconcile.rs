//! Fragment reconciliation: walking the live chain against requested segments.

use super::effects::Effects;
use super::engine::{Engine, EngineState, NavigationPhase};
use super::orchestrator::{LoadOptions, LoadOutcome};
use crate::context::ContextId;
use crate::errors::{CascadeError, Result};
use crate::events::{EngineEventKind, EventData};
use crate::ports::ResourceKinds;
use crate::transaction::TransactionId;
use tracing::debug;

/// How a reconcile walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Walk {
    /// A terminal context was finalized, or the level resolved to a sibling.
    Completed,
    /// The transaction stopped being current.
    Superseded,
    /// The requested stop level was loaded.
    LoadedLevel,
}

struct LevelLoad {
    parent: ContextId,
    home: String,
    id: String,
    level: usize,
    parameters: String,
}

enum Step {
    Stale,
    Finalized,
    Load(LevelLoad),
}

impl Engine {
    /// Walks from `start` until a terminal context, a supersession, or the
    /// load of level `stop_after`.
    ///
    /// With `reload`, every level holding a fragment is evicted and fetched
    /// again even when it matches; placeholders are kept.
    pub(crate) async fn reconcile(
        &self,
        tx: TransactionId,
        fragments: &mut Vec<String>,
        start: usize,
        reload: bool,
        stop_after: Option<usize>,
    ) -> Result<Walk> {
        let mut cursor = start;
        loop {
            let load = match self.reconcile_step(tx, fragments, cursor, reload)? {
                Step::Stale => return Ok(Walk::Superseded),
                Step::Finalized => return Ok(Walk::Completed),
                Step::Load(load) => load,
            };

            let options = LoadOptions::new()
                .with_kinds(ResourceKinds::all())
                .with_hierarchy_index(load.level)
                .with_fragment(load.id.clone())
                .with_parameters(load.parameters)
                .with_reload(reload);

            match self.load_fragment(load.parent, tx, &load.home, &load.id, options).await? {
                LoadOutcome::Stale => return Ok(Walk::Superseded),
                LoadOutcome::Loaded { sibling: false, .. } => {
                    if stop_after == Some(load.level) {
                        return Ok(Walk::LoadedLevel);
                    }
                    cursor = load.level + 1;
                }
                LoadOutcome::Loaded { sibling: true, .. } | LoadOutcome::AlreadyCurrent { .. } => {
                    debug!(%tx, level = load.level, id = %load.id, "Level has no hierarchy container; walk ends");
                    return Ok(Walk::Completed);
                }
            }
        }
    }

    /// Runs the synchronous part of the walk under the lock.
    fn reconcile_step(
        &self,
        tx: TransactionId,
        fragments: &mut Vec<String>,
        cursor: usize,
        reload: bool,
    ) -> Result<Step> {
        let mut effects = Effects::new(tx);
        let step = {
            let mut state = self.inner.state.lock();
            if !state.transactions.is_current(tx) {
                return Ok(Step::Stale);
            }
            self.walk_locked(&mut state, tx, fragments, cursor, reload, &mut effects)
        };
        effects.dispatch(&self.inner);
        step
    }

    fn walk_locked(
        &self,
        state: &mut EngineState,
        tx: TransactionId,
        fragments: &mut Vec<String>,
        mut cursor: usize,
        reload: bool,
        effects: &mut Effects,
    ) -> Result<Step> {
        let default_home = self.inner.config.default_home.as_str();
        loop {
            state.phase = NavigationPhase::Reconciling;
            let chain = state.tree.chain();
            let parent = cursor
                .checked_sub(1)
                .and_then(|index| chain.get(index).copied())
                .ok_or_else(|| CascadeError::Internal(format!("reconcile level {cursor} is past the chain")))?;
            let parent_home = state.tree.node(parent)?.home_or(default_home).to_string();

            if let Some(&shared) = chain.get(cursor) {
                let stored = state.tree.node(shared)?.fragment.clone();
                let desired = fragments.get(cursor).map(String::as_str);

                if (reload && stored.is_some()) || is_mismatch(stored.as_deref(), desired, &parent_home) {
                    debug!(%tx, context = %shared, level = cursor, ?stored, ?desired, reload, "Evicting context");
                    state.phase = NavigationPhase::Unloading;
                    let report = state.tree.unload(shared)?;
                    effects.unloaded(report);
                    continue;
                }

                if fragments.len() <= cursor {
                    fragments.push(stored.unwrap_or_default());
                }
                cursor += 1;
                continue;
            }

            let parameters = join_from(fragments, cursor);
            state.phase = NavigationPhase::Finalizing;
            if self.finalize_locked(state, parent, &parameters, tx, effects)? {
                return Ok(Step::Finalized);
            }
            if cursor >= fragments.len() {
                fragments.push(parent_home);
            }

            let id = fragments
                .get(cursor)
                .cloned()
                .ok_or_else(|| CascadeError::Internal(format!("no segment for level {cursor}")))?;
            state.phase = NavigationPhase::Loading;
            return Ok(Step::Load(LevelLoad {
                parent,
                home: child_path(&state.tree.node(parent)?.path, &id),
                id,
                level: cursor,
                parameters: join_from(fragments, cursor + 1),
            }));
        }
    }

    /// Commits `parameters` to `context` if it is terminal.
    pub(crate) fn finalize_locked(
        &self,
        state: &mut EngineState,
        context: ContextId,
        parameters: &str,
        tx: TransactionId,
        effects: &mut Effects,
    ) -> Result<bool> {
        let node = state.tree.node(context)?;
        let terminal = node.is_final
            || node.view.as_ref().map_or(true, |view| {
                self.inner
                    .view_host
                    .find_container(view, node.hierarchy_index + 1)
                    .is_none()
            });
        if !terminal {
            return Ok(false);
        }

        state.tree.propagate_transaction(context, tx);
        let node = state.tree.node_mut(context)?;
        if node.parameters != parameters {
            debug!(%tx, %context, parameters, "Parameters changed");
            node.parameters = parameters.to_string();
            let info = node.info();

            if let Some(behavior) = node.behavior.clone() {
                if node.initialized.is_some_and(|initialized| initialized != tx) {
                    effects.hash_change(behavior, info.clone(), parameters);
                }
            }
            let url = url_with_parameters(&node.url, parameters);
            effects.trigger("hash", Some(EventData::Url(url)), Some(info));
            effects.emit(EngineEventKind::ParametersChanged {
                context,
                parameters: parameters.to_string(),
            });
        }
        Ok(true)
    }
}

/// A stored fragment is evicted when it differs from the desired segment,
/// unless no segment was requested and it is the parent's home.
fn is_mismatch(stored: Option<&str>, desired: Option<&str>, parent_home: &str) -> bool {
    stored.is_some_and(|stored| desired != Some(stored) && (desired.is_some() || stored != parent_home))
}

fn join_from(fragments: &[String], from: usize) -> String {
    fragments.get(from..).map(|rest| rest.join("/")).unwrap_or_default()
}

/// Base path of a child: `parent/id`, without a leading slash.
pub(crate) fn child_path(parent_path: &str, id: &str) -> String {
    let prefix = format!("{parent_path}/");
    format!("{}{id}", prefix.strip_prefix('/').unwrap_or(&prefix))
}

fn url_with_parameters(url: &str, parameters: &str) -> String {
    if parameters.is_empty() {
        url.to_string()
    } else if url.ends_with('/') {
        format!("{url}{parameters}")
    } else {
        format!("{url}/{parameters}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mismatch_on_explicit_segment() {
        assert!(is_mismatch(Some("b"), Some("c"), "home"));
        assert!(!is_mismatch(Some("b"), Some("b"), "home"));
    }

    #[test]
    fn test_home_survives_undefined_segment() {
        assert!(!is_mismatch(Some("home"), None, "home"));
        assert!(is_mismatch(Some("users"), None, "home"));
        assert!(is_mismatch(Some("home"), Some("users"), "home"));
        assert!(!is_mismatch(Some("dashboard"), None, "dashboard"));
    }

    #[test]
    fn test_placeholder_never_mismatches() {
        assert!(!is_mismatch(None, Some("anything"), "home"));
        assert!(!is_mismatch(None, None, "home"));
    }

    #[test]
    fn test_child_path() {
        assert_eq!(child_path("", "main"), "main");
        assert_eq!(child_path("main", "users"), "main/users");
        assert_eq!(child_path("/main", "users"), "main/users");
    }

    #[test]
    fn test_join_from() {
        let fragments: Vec<String> = ["root", "main", "users", "42", "edit"]
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(join_from(&fragments, 3), "42/edit");
        assert_eq!(join_from(&fragments, 5), "");
        assert_eq!(join_from(&fragments, 9), "");
    }

    #[test]
    fn test_url_with_parameters() {
        assert_eq!(url_with_parameters("#/users", ""), "#/users");
        assert_eq!(url_with_parameters("#/users", "43"), "#/users/43");
        assert_eq!(url_with_parameters("#/", "43"), "#/43");
    }
}
