mod common;

use common::{CHILD_KEY, KEY, chain_records, payload, repeated_key_records, wide_records};
use edgetree::TreeError;
use edgetree::model::{Node, NodeId, Tree, TreeRegistry};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::collections::HashSet;

fn keys(nodes: &[&Node]) -> Vec<String> {
    nodes.iter().map(|node| node.key().to_string()).collect()
}

fn registered(records: Vec<edgetree::model::Record>) -> (TreeRegistry, edgetree::model::TreeId) {
    let mut registry = TreeRegistry::new();
    let id = registry.build_tree(records, KEY, CHILD_KEY).unwrap();
    (registry, id)
}

// ============= Flags Tests =============
#[test]
fn test_flags() {
    let tree = Tree::new(chain_records(), KEY, CHILD_KEY).unwrap();

    let root = tree.root();
    assert!(root.is_root());
    assert!(!root.has_parent());
    assert!(root.has_children());
    assert!(!root.is_leaf());

    let leaf = tree.find_or_error(|node| node.level() == 3).unwrap();
    assert!(leaf.is_leaf());
    assert!(leaf.has_parent());
    assert!(!leaf.is_root());
    assert!(!leaf.has_children());
}

#[test]
fn test_ancestor_paths() {
    let tree = Tree::new(repeated_key_records(), KEY, CHILD_KEY).unwrap();
    let paths: Vec<&str> = tree.iter().map(Node::ancestor_path).collect();

    assert_eq!(
        paths,
        vec!["root", "root/a", "root/a/shared", "root/a/shared/leaf", "root/b", "root/b/shared", "root/b/shared/leaf"]
    );
}

// ============= Traversal Tests =============
#[test]
fn test_traverse_visits_pre_order() {
    let tree = Tree::new(chain_records(), KEY, CHILD_KEY).unwrap();
    let mut visited = Vec::new();
    let completed = tree.root().traverse(&mut |node| {
        visited.push(node.key().to_string());
        true
    });

    assert!(completed);
    assert_eq!(visited, vec!["root", "child0", "child1", "child2", "child3"]);
}

#[test]
fn test_traverse_stop_skips_siblings() {
    let tree = Tree::new(wide_records(), KEY, CHILD_KEY).unwrap();
    let mut visited = Vec::new();
    let completed = tree.root().traverse(&mut |node| {
        visited.push(node.key().to_string());
        node.key() != "grandChild1"
    });

    assert!(!completed);
    assert_eq!(visited, vec!["root", "child1", "child2", "grandChild1"]);
}

#[test]
fn test_traverse_stop_still_walks_own_subtree() {
    let tree = Tree::new(wide_records(), KEY, CHILD_KEY).unwrap();
    let mut visited = Vec::new();
    let completed = tree.root().traverse(&mut |node| {
        visited.push(node.key().to_string());
        node.key() != "child2"
    });

    // child2's children are walked before the stop takes effect
    assert!(!completed);
    assert_eq!(visited, vec!["root", "child1", "child2", "grandChild1", "grandChild2", "grandChild3"]);
}

#[test]
fn test_traverse_is_restartable() {
    let tree = Tree::new(chain_records(), KEY, CHILD_KEY).unwrap();
    let mut count = 0;
    tree.root().traverse(&mut |_| {
        count += 1;
        false
    });
    let first = count;
    tree.root().traverse(&mut |_| {
        count += 1;
        false
    });

    assert_eq!(count, 2 * first);
}

#[test]
fn test_find_descendants_excludes_self() {
    let tree = Tree::new(chain_records(), KEY, CHILD_KEY).unwrap();
    let root = tree.root();

    assert_eq!(keys(&root.find_descendants(|node| node.level() == 3)), vec!["child3"]);
    assert_eq!(
        keys(&root.find_descendants(|_| true)),
        vec!["child0", "child1", "child2", "child3"]
    );
    assert!(root.find_descendants(|node| node.is_root()).is_empty());
}

// ============= Ancestry Tests =============
#[test]
fn test_parent() {
    let (registry, id) = registered(chain_records());
    let tree = registry.resolve(id).unwrap();

    let child2 = tree.find_or_error(|node| node.key() == "child2").unwrap();
    let parent = child2.parent(&registry).unwrap().unwrap();
    assert_eq!(parent.key(), "child1");
    assert!(tree.root().parent(&registry).unwrap().is_none());
}

#[test]
fn test_parent_disambiguates_repeated_keys() {
    let tree = Tree::new(repeated_key_records(), KEY, CHILD_KEY).unwrap();

    for leaf in tree.find_all(|node| node.key() == "leaf") {
        let shared = leaf.parent_in(&tree).unwrap();
        let branch = shared.parent_in(&tree).unwrap();
        assert_eq!(shared.key(), "shared");
        assert!(leaf.ancestor_path().starts_with(branch.ancestor_path()));
        assert_eq!(leaf.path_in(&tree, KEY), format!("root/{}/shared/leaf", branch.key()));
    }
}

#[test]
fn test_parent_of_duplicate_sibling_keys() {
    let mut tree = Tree::new(chain_records(), KEY, CHILD_KEY).unwrap();
    let added = tree.root_mut().add_child(payload("child1")).unwrap();
    let added_id = added.id();
    let x_id = added.add_child(payload("x")).unwrap().id();

    let x = tree.find_or_error(|node| node.id() == x_id).unwrap();
    let parent = x.parent_in(&tree).unwrap();
    assert_eq!(parent.id(), added_id);
    assert!(parent.children().iter().any(|child| std::ptr::eq(child, x)));

    let child3 = tree.find_or_error(|node| node.key() == "child3").unwrap();
    assert_eq!(child3.path_in(&tree, KEY), "root/child1/child2/child3");
}

#[test]
fn test_node_ids_are_unique() {
    let first = Tree::new(repeated_key_records(), KEY, CHILD_KEY).unwrap();
    let second = Tree::new(repeated_key_records(), KEY, CHILD_KEY).unwrap();

    let ids: HashSet<NodeId> = first.iter().chain(second.iter()).map(Node::id).collect();
    assert_eq!(ids.len(), first.num_nodes() + second.num_nodes());
    assert_eq!(first.root().parent_id(), None);
}

#[test]
fn test_ancestors() {
    let (registry, id) = registered(chain_records());
    let tree = registry.resolve(id).unwrap();
    let leaf = tree.find_or_error(|node| node.level() == 3).unwrap();

    let ancestors = leaf.ancestors(&registry).unwrap();
    assert_eq!(keys(&ancestors), vec!["root", "child1", "child2"]);
    assert!(tree.root().ancestors(&registry).unwrap().is_empty());
}

#[test]
fn test_find_ancestors() {
    let (registry, id) = registered(chain_records());
    let tree = registry.resolve(id).unwrap();
    let leaf = tree.find_or_error(|node| node.level() == 3).unwrap();

    let found = leaf.find_ancestors(&registry, |node| node.level() == 1).unwrap();
    assert_eq!(keys(&found), vec!["child1"]);

    let found = leaf.find_ancestors(&registry, |node| node.level() != 1).unwrap();
    assert_eq!(keys(&found), vec!["root", "child2"]);
}

#[test]
fn test_path() {
    let (registry, id) = registered(chain_records());
    let tree = registry.resolve(id).unwrap();
    let leaf = tree.find_or_error(|node| node.level() == 3).unwrap();

    assert_eq!(leaf.path(&registry, "nodeKey").unwrap(), "root/child1/child2/child3");
    assert_eq!(tree.root().path(&registry, "nodeKey").unwrap(), "root");
}

#[test]
fn test_path_of_other_fields() {
    let tree = Tree::new(chain_records(), KEY, CHILD_KEY).unwrap();
    let leaf = tree.find_or_error(|node| node.level() == 3).unwrap();

    assert_eq!(leaf.path_in(&tree, "missing"), "///");
    assert_eq!(leaf.path_in(&tree, "someProperty"), r#"{"someKey":0}/{"someKey":1}/{"someKey":2}/{"someKey":3}"#);
}

#[test]
fn test_levels_match_ancestor_count() {
    let (registry, id) = registered(wide_records());
    let tree = registry.resolve(id).unwrap();

    for node in tree.flatten() {
        assert_eq!(node.level(), node.ancestors(&registry).unwrap().len());
    }
}

#[test]
fn test_unregistered_tree() {
    let registry = TreeRegistry::new();
    let tree = Tree::new(chain_records(), KEY, CHILD_KEY).unwrap();
    let leaf = tree.find_or_error(|node| node.level() == 3).unwrap();

    assert_eq!(leaf.parent(&registry).unwrap_err(), TreeError::UnregisteredTree(tree.id()));
    assert!(leaf.ancestors(&registry).is_err());
    assert!(leaf.path(&registry, KEY).is_err());
    assert!(leaf.tree(&registry).is_err());

    // explicit tree still works
    assert_eq!(leaf.ancestors_in(&tree).len(), 3);
}

// ============= Mutation Tests =============
#[test]
fn test_add_child() {
    let mut tree = Tree::new(chain_records(), KEY, CHILD_KEY).unwrap();
    let root = tree.root_mut();
    let before = root.children().len();

    let child = root.add_child(payload("child4")).unwrap();
    assert_eq!(child.level(), 1);
    assert_eq!(child.key(), "child4");
    assert_eq!(child.parent_key(), Some("root"));
    assert_eq!(child.ancestor_path(), "root/child4");
    assert!(child.is_leaf());
    assert_eq!(child.get("someProperty"), Some(&json!({"someKey": 42})));

    assert_eq!(tree.root().children().len(), before + 1);
    let added = tree.find_or_error(|node| node.key() == "child4").unwrap();
    assert_eq!(added.tree_id(), tree.id());
    assert_eq!(added.parent_in(&tree).unwrap().key(), "root");
    assert!(tree.is_valid());
}

#[test]
fn test_add_grandchild_path() {
    let mut registry = TreeRegistry::new();
    let id = registry.build_tree(chain_records(), KEY, CHILD_KEY).unwrap();

    let tree = registry.resolve_mut(id).unwrap();
    let child0 = tree.find_mut(|node| node.key() == "child0").unwrap();
    let new_child = child0.add_child(payload("x")).unwrap();
    new_child.add_child(payload("y")).unwrap();

    let tree = registry.resolve(id).unwrap();
    let y = tree.find_or_error(|node| node.key() == "y").unwrap();
    assert_eq!(y.level(), 3);
    assert_eq!(y.path(&registry, KEY).unwrap(), "root/child0/x/y");
}

#[test]
fn test_add_child_strips_child_key() {
    let mut tree = Tree::new(chain_records(), KEY, CHILD_KEY).unwrap();
    let mut data = payload("child4");
    data.insert(CHILD_KEY.to_string(), json!("whatever"));

    let child = tree.root_mut().add_child(data).unwrap();
    assert!(child.get(CHILD_KEY).is_none());
}

#[test]
fn test_add_child_requires_key() {
    let mut tree = Tree::new(chain_records(), KEY, CHILD_KEY).unwrap();
    let mut data = payload("child4");
    data.remove(KEY);

    assert!(matches!(
        tree.root_mut().add_child(data),
        Err(TreeError::InvalidKey { level: 1, .. })
    ));
    assert_eq!(tree.root().children().len(), 2);
}

#[test]
fn test_locator() {
    let tree = Tree::new(chain_records(), KEY, CHILD_KEY).unwrap();
    let child2 = tree.find_or_error(|node| node.key() == "child2").unwrap();
    let locator = child2.locator();

    assert_eq!(locator.tree_id(), tree.id());
    assert_eq!(locator.level(), 2);
    assert_eq!(locator.key(), "child2");
    assert_eq!(locator.parent_key(), Some("child1"));
    assert_eq!(locator.parent_path(), Some("root/child1"));
    assert_eq!(locator.node_id(), child2.id());
    assert_eq!(locator.parent_id(), child2.parent_id());
    assert_eq!(tree.root().locator().parent_path(), None);
}
