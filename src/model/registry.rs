//! Lookup table from [TreeId] to [Tree].
//!
//! Nodes do not reference their tree. A [TreeRegistry] lets a node find it
//! (and through it, its parent) by the tree id the node carries. Registration
//! is opt-in: trees that are never registered work, but registry-based
//! ancestry queries on their nodes fail with [TreeError::UnregisteredTree].
//!
//! The registry is an explicit instance, not a global. Entries stay until
//! they are removed with [`TreeRegistry::unregister`] or
//! [`TreeRegistry::clear`].
//!
//! # Concurrency
//! [`TreeRegistry::shared`] wraps a registry in a [SharedRegistry], a single
//! read-write lock: lookups and searches may run concurrently, while
//! registration, removal and structural mutation take the write lock.

use crate::error::TreeError;
use crate::model::node::{Node, NodeLocator};
use crate::model::record::Record;
use crate::model::tree::{Tree, TreeId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tracing::debug;

/// Registry behind a single lock, for use from several threads.
pub type SharedRegistry = Arc<RwLock<TreeRegistry>>;

// =#========================================================================#=
// TREE REGISTRY
// =#========================================================================#=
/// Owns registered trees, keyed by their [TreeId].
///
/// # Example
/// ```
/// use edgetree::model::{Record, TreeRegistry};
/// use serde_json::json;
///
/// let records = vec![
///     Record::from_value(0, json!({"id": "root", "child": "a"})).unwrap(),
///     Record::from_value(1, json!({"id": "a", "child": null})).unwrap(),
/// ];
///
/// let mut registry = TreeRegistry::new();
/// let id = registry.build_tree(records, "id", "child")?;
///
/// let tree = registry.resolve(id).unwrap();
/// let leaf = tree.find_or_error(|node| node.key() == "a")?;
/// assert_eq!(leaf.parent(&registry)?.map(|parent| parent.key()), Some("root"));
/// # Ok::<(), edgetree::TreeError>(())
/// ```
#[derive(Debug, Default)]
pub struct TreeRegistry {
    trees: HashMap<TreeId, Tree>,
}

impl TreeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        TreeRegistry::default()
    }

    /// Creates an empty registry behind a lock.
    pub fn shared() -> SharedRegistry {
        Arc::new(RwLock::new(TreeRegistry::new()))
    }

    /// Registers `tree` unless a tree with the same id is already present,
    /// in which case the registered tree is kept and `tree` is dropped.
    ///
    /// # Returns
    /// The id under which the tree can be resolved.
    pub fn register(&mut self, tree: Tree) -> TreeId {
        let id = tree.id();
        match self.trees.entry(id) {
            Entry::Occupied(_) => debug!(tree = %id, "tree already registered"),
            Entry::Vacant(slot) => {
                slot.insert(tree);
                debug!(tree = %id, num_trees = self.trees.len(), "registered tree");
            }
        }
        id
    }

    /// Builds a tree from `records` and registers it.
    ///
    /// # Errors
    /// Any construction error of [TreeBuilder](crate::model::TreeBuilder).
    pub fn build_tree<I>(&mut self, records: I, key_field: &str, child_key_field: &str) -> Result<TreeId, TreeError>
    where
        I: IntoIterator<Item = Record>,
    {
        let tree = Tree::new(records, key_field, child_key_field)?;
        Ok(self.register(tree))
    }

    /// Returns the tree registered under `id`.
    pub fn resolve(&self, id: TreeId) -> Option<&Tree> {
        self.trees.get(&id)
    }

    /// Returns the tree registered under `id`, mutably.
    pub fn resolve_mut(&mut self, id: TreeId) -> Option<&mut Tree> {
        self.trees.get_mut(&id)
    }

    /// Removes the tree registered under `id` and hands it back.
    pub fn unregister(&mut self, id: TreeId) -> Option<Tree> {
        let removed = self.trees.remove(&id);
        if removed.is_some() {
            debug!(tree = %id, "unregistered tree");
        }
        removed
    }

    /// Returns whether a tree is registered under `id`.
    pub fn contains(&self, id: TreeId) -> bool {
        self.trees.contains_key(&id)
    }

    /// Returns the ids of all registered trees, in no particular order.
    pub fn tree_ids(&self) -> impl Iterator<Item = TreeId> + '_ {
        self.trees.keys().copied()
    }

    /// Returns the number of registered trees.
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Returns `true` if no tree is registered.
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Removes all trees.
    pub fn clear(&mut self) {
        debug!(num_trees = self.trees.len(), "clearing tree registry");
        self.trees.clear();
    }

    /// Detaches the node addressed by `locator` from its registered tree.
    ///
    /// See [`Tree::detach`]; the root is never detached.
    ///
    /// # Errors
    /// [TreeError::UnregisteredTree] if the locator's tree is not registered.
    pub fn detach(&mut self, locator: &NodeLocator) -> Result<Option<Node>, TreeError> {
        let tree = self
            .resolve_mut(locator.tree_id())
            .ok_or(TreeError::UnregisteredTree(locator.tree_id()))?;
        Ok(tree.detach(locator))
    }
}
