//! Tree owning a root [Node] under a process-unique identifier.
//!
//! Provides:
//! * [Tree] - owns the root and offers whole-tree search and removal
//! * [TreeId] - opaque identifier assigned at construction, never reused
//!
//! Predicate searches run through [`Node::traverse`] and stop as soon as possible.

use crate::error::TreeError;
use crate::model::node::{Node, NodeLocator, PreOrderIter};
use crate::model::record::{KeyFields, Record};
use crate::model::tree_builder::{NodeSkeleton, TreeBuilder};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

// =#========================================================================#=
// TREE ID
// =#========================================================================#=
/// Process-unique, opaque identifier of a [Tree].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TreeId(Uuid);

impl TreeId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        TreeId(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TreeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =#========================================================================#=
// TREE
// =#========================================================================#=
/// A rooted tree reconstructed from edge-list records.
///
/// # Structure
/// - The root [Node] is owned by the tree, each node owns its children.
/// - Every node carries the tree's [TreeId]; parents are found by lookup.
/// - Nodes sharing a key are told apart by their [NodeId](crate::model::NodeId).
///
/// # Example
/// ```
/// use edgetree::model::{Record, Tree};
/// use serde_json::json;
///
/// let records = vec![
///     Record::from_value(0, json!({"id": "root", "child": "a"})).unwrap(),
///     Record::from_value(1, json!({"id": "a", "child": "b"})).unwrap(),
///     Record::from_value(2, json!({"id": "b", "child": null})).unwrap(),
/// ];
///
/// let tree = Tree::new(records, "id", "child")?;
/// let leaf = tree.find_or_error(|node| node.level() == 2)?;
/// assert_eq!(leaf.path_in(&tree, "id"), "root/a/b");
/// assert_eq!(tree.flatten().len(), 3);
/// # Ok::<(), edgetree::TreeError>(())
/// ```
#[derive(Debug)]
pub struct Tree {
    /// Identifier of this tree, assigned before the nodes are built
    id: TreeId,

    /// Field names shared by all nodes
    fields: Arc<KeyFields>,

    /// Root of this tree (level 0)
    root: Node,
}

// ============================================================================
// New, Getters (pub)
// ============================================================================
impl Tree {
    /// Builds a tree from `records`, reading node keys from `key_field` and
    /// child keys from `child_key_field`.
    ///
    /// See [TreeBuilder] for the reconstruction rules and errors.
    pub fn new<I>(records: I, key_field: &str, child_key_field: &str) -> Result<Self, TreeError>
    where
        I: IntoIterator<Item = Record>,
    {
        TreeBuilder::new(key_field, child_key_field)?.build(records)
    }

    /// Wraps a skeleton into linked nodes under a freshly generated id.
    pub(crate) fn from_skeleton(skeleton: NodeSkeleton, fields: KeyFields) -> Self {
        let id = TreeId::generate();
        let fields = Arc::new(fields);
        let root = Node::from_skeleton(skeleton, id, &fields);
        debug!(tree = %id, root = %root.key(), "created tree");

        Tree { id, fields, root }
    }

    /// Returns the identifier of this tree.
    pub fn id(&self) -> TreeId {
        self.id
    }

    /// Returns the root node.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Returns a mutable reference to the root node.
    pub fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    /// Returns the node-key and child-key field names.
    pub fn key_fields(&self) -> &KeyFields {
        &self.fields
    }

    /// Returns the number of nodes in this tree.
    pub fn num_nodes(&self) -> usize {
        self.root.num_nodes()
    }

    /// Returns the largest level of any node.
    pub fn height(&self) -> usize {
        self.iter().map(Node::level).max().unwrap_or(0)
    }

    /// Returns an iterator over the tree in pre-order (parents before children).
    pub fn iter(&self) -> PreOrderIter<'_> {
        self.root.pre_order_iter()
    }
}

// ============================================================================
// Search (pub)
// ============================================================================
impl Tree {
    /// Returns the first node in pre-order satisfying `predicate`.
    ///
    /// `predicate` is not called again once a match is found.
    pub fn find<'a, P>(&'a self, mut predicate: P) -> Option<&'a Node>
    where
        P: FnMut(&Node) -> bool,
    {
        let mut found = None;
        self.root.traverse(&mut |node: &'a Node| {
            if found.is_some() {
                return false;
            }
            if predicate(node) {
                found = Some(node);
                return false;
            }
            true
        });
        found
    }

    /// Like [`Tree::find`], but absence is an error.
    ///
    /// # Errors
    /// [TreeError::NodeNotFound] if no node satisfies `predicate`.
    pub fn find_or_error<P>(&self, predicate: P) -> Result<&Node, TreeError>
    where
        P: FnMut(&Node) -> bool,
    {
        self.find(predicate).ok_or(TreeError::NodeNotFound)
    }

    /// Returns all nodes satisfying `predicate` in pre-order.
    pub fn find_all<'a, P>(&'a self, mut predicate: P) -> Vec<&'a Node>
    where
        P: FnMut(&Node) -> bool,
    {
        let mut found = Vec::new();
        self.root.traverse(&mut |node: &'a Node| {
            if predicate(node) {
                found.push(node);
            }
            true
        });
        found
    }

    /// Returns every node in pre-order.
    pub fn flatten(&self) -> Vec<&Node> {
        self.find_all(|_| true)
    }

    /// Returns the first node in pre-order satisfying `predicate`, mutably.
    pub fn find_mut<P>(&mut self, mut predicate: P) -> Option<&mut Node>
    where
        P: FnMut(&Node) -> bool,
    {
        let mut stack = vec![&mut self.root];
        while let Some(node) = stack.pop() {
            if predicate(&*node) {
                return Some(node);
            }
            stack.extend(node.children_mut().iter_mut().rev());
        }
        None
    }
}

// ============================================================================
// Mutation (pub)
// ============================================================================
impl Tree {
    /// Removes the node addressed by `locator` from its parent and returns
    /// the detached subtree.
    ///
    /// The node is matched by identity, so a sibling sharing its key is never
    /// removed in its place. Returns `None` without changes if `locator`
    /// addresses the root, a node of another tree, or a node no longer present.
    pub fn detach(&mut self, locator: &NodeLocator) -> Option<Node> {
        if locator.tree_id() != self.id {
            debug!(tree = %self.id, other = %locator.tree_id(), "locator belongs to another tree");
            return None;
        }
        let parent_id = locator.parent_id()?;
        let parent_path = locator.parent_path()?;

        let parent = self.root.find_on_path_mut(parent_path, parent_id)?;
        let detached = parent.remove_child(locator.node_id());

        if detached.is_some() {
            debug!(tree = %self.id, path = %locator.ancestor_path(), "detached node");
        }
        detached
    }
}

// ============================================================================
// Validation (pub)
// ============================================================================
impl Tree {
    /// Validates the tree structure.
    ///
    /// Checks:
    /// - Root has level 0, no parent and its key as ancestor path
    /// - Every node carries this tree's id
    /// - Every payload holds the node's key and no child-key field
    /// - Children are exactly one level deeper, name their parent's id and key,
    ///   and extend its ancestor path
    ///
    /// # Returns
    /// `true` if tree is valid, `false` otherwise
    pub fn is_valid(&self) -> bool {
        let root = &self.root;
        if root.level() != 0 || root.parent_key().is_some() || root.parent_id().is_some() || root.ancestor_path() != root.key() {
            return false;
        }

        for node in self.iter() {
            if node.tree_id() != self.id {
                return false;
            }

            // Payload consistency
            match self.fields.node_key_of(node.data(), node.level()) {
                Ok(key) if key == node.key() => {}
                _ => return false,
            }
            if node.data().contains_key(self.fields.child_key()) {
                return false;
            }

            // Links to children
            for child in node.children() {
                if child.level() != node.level() + 1
                    || child.parent_key() != Some(node.key())
                    || child.parent_id() != Some(node.id())
                {
                    return false;
                }
                if child.ancestor_path() != format!("{}/{}", node.ancestor_path(), child.key()) {
                    return false;
                }
            }
        }

        true
    }
}

// ============================================================================
// Printing
// ============================================================================
/// Renders an indented outline of the tree.
///
/// # Example Output
/// ```text
/// Tree 5f0c...e2 (5 nodes):
/// root (level 0)
/// ├─ child0 (level 1)
/// └─ child1 (level 1)
///    └─ child2 (level 2)
/// ```
impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tree {} ({} nodes):", self.id, self.num_nodes())?;
        writeln!(f, "{} (level {})", self.root.key(), self.root.level())?;

        fn push_children<'a>(stack: &mut Vec<(&'a Node, String, bool)>, node: &'a Node, prefix: &str) {
            let num_children = node.children().len();
            for (i, child) in node.children().iter().enumerate().rev() {
                stack.push((child, prefix.to_string(), i + 1 == num_children));
            }
        }

        // (node, prefix of its line, is last sibling)
        let mut stack: Vec<(&Node, String, bool)> = Vec::new();
        push_children(&mut stack, &self.root, "");

        while let Some((node, prefix, is_last)) = stack.pop() {
            let connector = if is_last { "└─ " } else { "├─ " };
            writeln!(f, "{prefix}{connector}{} (level {})", node.key(), node.level())?;

            let child_prefix = format!("{prefix}{}", if is_last { "   " } else { "│  " });
            push_children(&mut stack, node, &child_prefix);
        }
        Ok(())
    }
}
