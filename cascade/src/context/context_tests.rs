//! Tests for the context tree.

#[cfg(test)]
mod tests {
    use crate::context::{ContextId, ContextInfo, ContextNode, ContextTree};
    use crate::errors::CascadeError;
    use crate::ports::{Behavior, ResourceHandles, ViewHandle};
    use crate::transaction::TransactionId;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[derive(Default)]
    struct UnloadLog {
        entries: Mutex<Vec<(String, ContextId)>>,
    }

    struct Owner {
        name: &'static str,
        log: Arc<UnloadLog>,
    }

    impl Behavior for Owner {
        fn unload(&self, departing: &ContextInfo) {
            self.log.entries.lock().push((self.name.to_string(), departing.id));
        }
    }

    fn tree() -> ContextTree {
        ContextTree::new(ContextNode::root(ViewHandle::new("body"), "", "#/"))
    }

    fn level(tree: &mut ContextTree, parent: ContextId, fragment: &str) -> ContextId {
        let hierarchy_index = tree.info(parent).map_or(0, |p| p.hierarchy_index + 1);
        let mut node = ContextNode::new(hierarchy_index);
        node.fragment = Some(fragment.to_string());
        let id = tree.insert(node);
        tree.attach_child(parent, id).unwrap();
        id
    }

    fn sibling(tree: &mut ContextTree, owner: ContextId) -> ContextId {
        let hierarchy_index = tree.info(owner).map_or(0, |o| o.hierarchy_index);
        let id = tree.insert(ContextNode::new(hierarchy_index));
        tree.attach_sibling(owner, id).unwrap();
        id
    }

    #[test]
    fn test_root_is_current_on_empty_tree() {
        let tree = tree();
        assert_eq!(tree.chain(), vec![ContextId::ROOT]);
        assert_eq!(tree.current(), ContextId::ROOT);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_attach_child_builds_chain() {
        let mut tree = tree();
        let main = level(&mut tree, ContextId::ROOT, "main");
        let a = level(&mut tree, main, "a");

        assert_eq!(tree.chain(), vec![ContextId::ROOT, main, a]);
        assert_eq!(tree.current(), a);
        assert_eq!(tree.hierarchy(a), vec![ContextId::ROOT, main, a]);
        assert_eq!(tree.info(a).unwrap().parent, Some(main));
    }

    #[test]
    fn test_attach_child_conflict() {
        let mut tree = tree();
        let main = level(&mut tree, ContextId::ROOT, "main");
        let other = tree.insert(ContextNode::new(1));

        let err = tree.attach_child(ContextId::ROOT, other).unwrap_err();
        match err {
            CascadeError::StructuralConflict(conflict) => {
                assert_eq!(conflict.parent, ContextId::ROOT);
                assert_eq!(conflict.existing, main);
                assert_eq!(conflict.attempted, other);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_attach_child_after_unload() {
        let mut tree = tree();
        let main = level(&mut tree, ContextId::ROOT, "main");
        tree.unload(main).unwrap();

        let replacement = level(&mut tree, ContextId::ROOT, "main");
        assert_eq!(tree.current(), replacement);
    }

    #[test]
    fn test_unknown_context() {
        let mut tree = tree();
        let err = tree.unload(ContextId::new(42)).unwrap_err();
        assert!(matches!(err, CascadeError::UnknownContext(id) if id == ContextId::new(42)));
    }

    #[test]
    fn test_unload_is_depth_first_siblings_then_child() {
        let mut tree = tree();
        let main = level(&mut tree, ContextId::ROOT, "main");
        let a = level(&mut tree, main, "a");
        let s1 = sibling(&mut tree, a);
        let s2 = sibling(&mut tree, a);
        let b = level(&mut tree, a, "b");
        let b_sibling = sibling(&mut tree, b);

        let report = tree.unload(a).unwrap();

        assert_eq!(report.parent, Some(main));
        assert_eq!(report.visited, vec![s1, s2, b_sibling, b, a]);
        assert_eq!(tree.chain(), vec![ContextId::ROOT, main]);
        assert!(tree.info(main).unwrap().child.is_none());
        for id in [a, b, s1, s2, b_sibling] {
            assert!(tree.is_unloaded(id));
            assert!(tree.info(id).is_none());
        }
    }

    #[test]
    fn test_unload_visits_each_node_once() {
        let mut tree = tree();
        let main = level(&mut tree, ContextId::ROOT, "main");
        let a = level(&mut tree, main, "a");
        sibling(&mut tree, a);
        level(&mut tree, a, "b");

        let report = tree.unload(main).unwrap();
        let mut visited = report.visited.clone();
        visited.sort();
        visited.dedup();
        assert_eq!(visited.len(), report.visited.len());
        assert_eq!(report.visited.len(), 4);
    }

    #[test]
    fn test_unload_collects_page_and_parent_hooks() {
        let log = Arc::new(UnloadLog::default());
        let mut tree = tree();
        let main = level(&mut tree, ContextId::ROOT, "main");
        let a = level(&mut tree, main, "a");
        tree.get_mut(main).unwrap().behavior = Some(Arc::new(Owner { name: "main", log: log.clone() }));
        tree.get_mut(a).unwrap().behavior = Some(Arc::new(Owner { name: "a", log: log.clone() }));

        let partial = sibling(&mut tree, a);
        tree.get_mut(partial).unwrap().page = Some(main);

        let report = tree.unload(a).unwrap();
        for hook in &report.hooks {
            hook.behavior.unload(&hook.departing);
        }

        let entries = log.entries.lock().clone();
        assert_eq!(
            entries,
            vec![
                ("main".to_string(), partial),
                ("a".to_string(), partial),
                ("main".to_string(), a),
            ]
        );
    }

    #[test]
    fn test_unload_hooks_deduplicate_page_equal_to_parent() {
        let log = Arc::new(UnloadLog::default());
        let mut tree = tree();
        let main = level(&mut tree, ContextId::ROOT, "main");
        tree.get_mut(main).unwrap().behavior = Some(Arc::new(Owner { name: "main", log: log.clone() }));
        let partial = sibling(&mut tree, main);
        tree.get_mut(partial).unwrap().page = Some(main);

        let report = tree.unload(partial).unwrap();
        assert_eq!(report.hooks.len(), 1);
        assert!(tree.info(main).unwrap().siblings.is_empty());
    }

    #[test]
    fn test_unload_releases_resources() {
        let mut tree = tree();
        let main = level(&mut tree, ContextId::ROOT, "main");
        let handles = ResourceHandles {
            messages: "main/nls/messages".to_string(),
            markup: "main/main.html".to_string(),
            stylesheet: "main/main.css".to_string(),
            behavior: "main/main".to_string(),
        };
        tree.get_mut(main).unwrap().resources = Some(handles.clone());

        let report = tree.unload(main).unwrap();
        assert_eq!(report.released, vec![handles]);
    }

    #[test]
    fn test_unload_root_keeps_root() {
        let mut tree = tree();
        let main = level(&mut tree, ContextId::ROOT, "main");
        let a = level(&mut tree, main, "a");
        let overlay = sibling(&mut tree, ContextId::ROOT);

        let report = tree.unload(ContextId::ROOT).unwrap();

        assert_eq!(report.parent, None);
        assert_eq!(report.visited, vec![overlay, a, main]);
        assert_eq!(tree.chain(), vec![ContextId::ROOT]);
        assert_eq!(tree.len(), 1);
        assert!(!tree.is_unloaded(ContextId::ROOT));

        let again = level(&mut tree, ContextId::ROOT, "main");
        assert_eq!(tree.chain(), vec![ContextId::ROOT, again]);
    }

    #[test]
    fn test_propagate_transaction_stamps_ancestors() {
        let mut tree = tree();
        let main = level(&mut tree, ContextId::ROOT, "main");
        let a = level(&mut tree, main, "a");
        let partial = sibling(&mut tree, a);

        tree.propagate_transaction(a, TransactionId::new(3));
        assert_eq!(tree.info(a).unwrap().transaction, TransactionId::new(3));
        assert_eq!(tree.info(main).unwrap().transaction, TransactionId::new(3));
        assert_eq!(tree.info(ContextId::ROOT).unwrap().transaction, TransactionId::new(3));
        assert_eq!(tree.info(partial).unwrap().transaction, TransactionId::NONE);

        // idempotent, and never moves backwards
        tree.propagate_transaction(a, TransactionId::new(3));
        tree.propagate_transaction(main, TransactionId::new(2));
        assert_eq!(tree.info(main).unwrap().transaction, TransactionId::new(3));
    }

    #[test]
    fn test_home_fallback() {
        let mut node = ContextNode::new(1);
        assert_eq!(node.home_or("home"), "home");
        node.home_fragment = Some(String::new());
        assert_eq!(node.home_or("home"), "home");
        node.home_fragment = Some("dashboard".to_string());
        assert_eq!(node.home_or("home"), "dashboard");
    }
}
