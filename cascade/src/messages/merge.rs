//! Deep merge and per-context message building.

use crate::context::{empty_messages, ContextId, ContextTree};
use crate::errors::Result;
use serde_json::Value;

/// Overlays `overlay` onto `target`.
///
/// Objects merge key by key, recursively; any other value replaces the
/// target value.
pub fn deep_merge(target: &mut Value, overlay: &Value) {
    match (target, overlay) {
        (Value::Object(target), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let nested = value.is_object() && target.get(key).is_some_and(Value::is_object);
                if nested {
                    if let Some(existing) = target.get_mut(key) {
                        deep_merge(existing, value);
                    }
                } else {
                    target.insert(key.clone(), value.clone());
                }
            }
        }
        (target, overlay) => {
            *target = overlay.clone();
        }
    }
}

/// Installs `own` as the message bundle of `id`.
///
/// The merged set becomes the parent's merged set overlaid with `own`, the
/// exposed set starts as a copy of it, and `own` is pushed into the exposed
/// set of every strict ancestor.
pub fn build_messages(tree: &mut ContextTree, id: ContextId, own: Value) -> Result<()> {
    let own = if own.is_object() { own } else { empty_messages() };
    let parent = tree.node(id)?.parent;

    let mut merged = empty_messages();
    if let Some(parent) = parent {
        if let Some(parent_node) = tree.get(parent) {
            deep_merge(&mut merged, &parent_node.merged_messages);
        }
        propagate(tree, parent, &own);
    }
    deep_merge(&mut merged, &own);

    let node = tree.node_mut(id)?;
    node.own_messages = own;
    node.messages = merged.clone();
    node.merged_messages = merged;
    Ok(())
}

fn propagate(tree: &mut ContextTree, from: ContextId, own: &Value) {
    let mut cursor = Some(from);
    while let Some(current) = cursor {
        let Some(node) = tree.get_mut(current) else {
            break;
        };
        deep_merge(&mut node.messages, own);
        cursor = node.parent;
    }
}

/// Returns the merged set of a context.
pub fn merged_messages(tree: &ContextTree, id: ContextId) -> Result<Value> {
    Ok(tree.node(id)?.merged_messages.clone())
}

/// Recomputes the merged set of `id` from its chain's own bundles.
///
/// Used to check that stored merged sets have not drifted.
pub fn recompute_merged(tree: &ContextTree, id: ContextId) -> Result<Value> {
    let mut merged = empty_messages();
    for ancestor in tree.hierarchy(id) {
        deep_merge(&mut merged, &tree.node(ancestor)?.own_messages);
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextNode;
    use crate::ports::ViewHandle;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn tree() -> ContextTree {
        ContextTree::new(ContextNode::root(ViewHandle::new("body"), "", "#/"))
    }

    fn attach(tree: &mut ContextTree, parent: ContextId, messages: Value) -> ContextId {
        let id = tree.insert(ContextNode::new(tree.info(parent).unwrap().hierarchy_index + 1));
        tree.attach_child(parent, id).unwrap();
        build_messages(tree, id, messages).unwrap();
        id
    }

    #[test]
    fn test_deep_merge_nested() {
        let mut target = json!({"menu": {"home": "Home", "users": "Users"}, "title": "App"});
        deep_merge(&mut target, &json!({"menu": {"users": "People"}, "footer": "(c)"}));

        assert_eq!(
            target,
            json!({"menu": {"home": "Home", "users": "People"}, "title": "App", "footer": "(c)"})
        );
    }

    #[test]
    fn test_deep_merge_replaces_non_objects() {
        let mut target = json!({"items": [1, 2, 3], "label": {"short": "a"}});
        deep_merge(&mut target, &json!({"items": [4], "label": "flat"}));
        assert_eq!(target, json!({"items": [4], "label": "flat"}));
    }

    #[test]
    fn test_own_keys_win_over_ancestors() {
        let mut tree = tree();
        let main = attach(&mut tree, ContextId::ROOT, json!({"title": "Main", "save": "Save"}));
        let users = attach(&mut tree, main, json!({"title": "Users"}));

        let merged = merged_messages(&tree, users).unwrap();
        assert_eq!(merged, json!({"title": "Users", "save": "Save"}));
    }

    #[test]
    fn test_descendant_keys_reach_ancestor_exposed_set() {
        let mut tree = tree();
        let main = attach(&mut tree, ContextId::ROOT, json!({"title": "Main", "save": "Save"}));
        attach(&mut tree, main, json!({"title": "Users", "user.name": "Name"}));

        let exposed = tree.info(main).unwrap().messages;
        assert_eq!(exposed["title"], json!("Users"));
        assert_eq!(exposed["user.name"], json!("Name"));
        assert_eq!(exposed["save"], json!("Save"));

        // merged set of the ancestor is untouched
        assert_eq!(
            merged_messages(&tree, main).unwrap(),
            json!({"title": "Main", "save": "Save"})
        );
    }

    #[test]
    fn test_merge_property_after_loads_and_unloads() {
        let mut tree = tree();
        let main = attach(&mut tree, ContextId::ROOT, json!({"a": 1, "nested": {"x": 1}}));
        let first = attach(&mut tree, main, json!({"b": 2, "nested": {"y": 2}}));
        attach(&mut tree, first, json!({"a": 3, "nested": {"x": 3}}));

        tree.unload(first).unwrap();
        let second = attach(&mut tree, main, json!({"c": 4}));
        let leaf = attach(&mut tree, second, json!({"nested": {"z": 5}}));

        for id in tree.chain() {
            let stored = merged_messages(&tree, id).unwrap();
            let parent_merged = tree
                .info(id)
                .unwrap()
                .parent
                .map_or_else(empty_messages, |p| merged_messages(&tree, p).unwrap());
            let mut expected = parent_merged;
            deep_merge(&mut expected, &tree.get(id).unwrap().own_messages);

            assert_eq!(stored, expected);
            assert_eq!(stored, recompute_merged(&tree, id).unwrap());
        }
        assert_eq!(
            merged_messages(&tree, leaf).unwrap(),
            json!({"a": 1, "c": 4, "nested": {"x": 1, "z": 5}})
        );
    }

    #[test]
    fn test_non_object_bundle_is_ignored() {
        let mut tree = tree();
        let main = attach(&mut tree, ContextId::ROOT, json!("not a bundle"));
        assert_eq!(merged_messages(&tree, main).unwrap(), json!({}));
    }
}
