//! Test assertions for engine state.

use crate::navigation::{Engine, NavigationOutcome};

/// Fragments of the live main chain below the root.
#[must_use]
pub fn chain_fragments(engine: &Engine) -> Vec<String> {
    engine
        .chain()
        .into_iter()
        .skip(1)
        .filter_map(|id| engine.context(id))
        .map(|info| info.fragment.unwrap_or_default())
        .collect()
}

/// Asserts that the main chain below the root carries `expected` fragments.
pub fn assert_chain(engine: &Engine, expected: &[&str]) {
    let actual = chain_fragments(engine);
    assert_eq!(
        actual, expected,
        "Expected chain {expected:?}, got {actual:?}"
    );
}

/// Asserts that a navigation completed.
pub fn assert_completed(outcome: &NavigationOutcome) {
    assert!(
        outcome.is_completed(),
        "Expected a completed navigation, got {outcome:?}"
    );
}

/// Asserts that a navigation was superseded.
pub fn assert_superseded(outcome: &NavigationOutcome) {
    assert!(
        matches!(outcome, NavigationOutcome::Superseded { .. }),
        "Expected a superseded navigation, got {outcome:?}"
    );
}
