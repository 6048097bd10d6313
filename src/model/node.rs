//! Tree element owning its subtree.
//!
//! A [Node] owns its children but holds no reference to its parent or its
//! tree. Both are discovered by lookup: the node stores its tree's [TreeId],
//! its parent's [NodeId] and key, and its ancestor path (`/`-joined keys
//! from the root). Lookups only descend into branches on that path.
//! Lookups either go through a [TreeRegistry] ([`Node::parent`],
//! [`Node::ancestors`], ...) or through an explicitly given [Tree]
//! ([`Node::parent_in`], [`Node::ancestors_in`], ...).
//!
//! Since a borrowed node cannot mutate the tree holding it, removal works on
//! a [NodeLocator], an owned address obtained with [`Node::locator`].

use crate::error::TreeError;
use crate::model::record::{KeyFields, Payload, segment_of};
use crate::model::registry::TreeRegistry;
use crate::model::tree::{Tree, TreeId};
use crate::model::tree_builder::NodeSkeleton;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NODE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

// =#========================================================================#=
// NODE ID
// =#========================================================================#=
/// Process-unique identity of a [Node].
///
/// Keys may repeat, even among siblings; ids never do. A clone keeps the id
/// of its original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        NodeId(NODE_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =#========================================================================#=
// NODE
// =#========================================================================#=
/// Mutable tree element.
///
/// # Invariants
/// - `level` is 0 for the root and increases by exactly 1 per generation
/// - `parent_key` and `parent_id` are `None` exactly for the root
/// - `ancestor_path` is the parent's path joined with `key` by `/`;
///   it is fixed at creation
/// - `data` keeps the node-key field but never the child-key field
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: NodeId,
    parent_id: Option<NodeId>,
    level: usize,
    key: String,
    parent_key: Option<String>,
    children: Vec<Node>,
    data: Payload,
    ancestor_path: String,
    tree_id: TreeId,
    fields: Arc<KeyFields>,
}

// ============================================================================
// Construction, Getters (pub)
// ============================================================================
impl Node {
    /// Turns a skeleton into linked nodes of tree `tree_id`.
    ///
    /// Skeletons are unpacked in pre-order into a flat list that remembers
    /// each entry's parent index; the list is then drained from the back,
    /// so every node is complete before it is pushed to its parent.
    pub(crate) fn from_skeleton(mut skeleton: NodeSkeleton, tree_id: TreeId, fields: &Arc<KeyFields>) -> Node {
        const ROOT: usize = usize::MAX;

        let mut stack: Vec<(NodeSkeleton, usize)> = std::mem::take(&mut skeleton.children)
            .into_iter()
            .rev()
            .map(|child| (child, ROOT))
            .collect();
        let root_path = skeleton.key.clone();
        let mut root = Node::unlinked(skeleton, root_path, None, tree_id, fields);

        let mut flat: Vec<(Node, usize)> = Vec::new();
        while let Some((mut skeleton, parent)) = stack.pop() {
            let parent_node = if parent == ROOT { &root } else { &flat[parent].0 };
            let ancestor_path = format!("{}/{}", parent_node.ancestor_path, skeleton.key);
            let parent_id = parent_node.id;

            let index = flat.len();
            stack.extend(
                std::mem::take(&mut skeleton.children)
                    .into_iter()
                    .rev()
                    .map(|child| (child, index)),
            );
            flat.push((Node::unlinked(skeleton, ancestor_path, Some(parent_id), tree_id, fields), parent));
        }

        // Siblings arrive last-first
        while let Some((mut node, parent)) = flat.pop() {
            node.children.reverse();
            let parent_node = if parent == ROOT { &mut root } else { &mut flat[parent].0 };
            parent_node.children.push(node);
        }
        root.children.reverse();
        root
    }

    /// A childless node carrying the skeleton's fields and a fresh id.
    fn unlinked(
        mut skeleton: NodeSkeleton,
        ancestor_path: String,
        parent_id: Option<NodeId>,
        tree_id: TreeId,
        fields: &Arc<KeyFields>,
    ) -> Node {
        Node {
            id: NodeId::next(),
            parent_id,
            level: skeleton.level,
            key: std::mem::take(&mut skeleton.key),
            parent_key: skeleton.parent_key.take(),
            children: Vec::new(),
            data: std::mem::take(&mut skeleton.data),
            ancestor_path,
            tree_id,
            fields: Arc::clone(fields),
        }
    }

    /// Returns the identity of this node.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Returns the identity of the parent, or `None` for the root.
    pub fn parent_id(&self) -> Option<NodeId> {
        self.parent_id
    }

    /// Returns the depth of this node (root = 0).
    pub fn level(&self) -> usize {
        self.level
    }

    /// Returns the node key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the key of the parent, or `None` for the root.
    pub fn parent_key(&self) -> Option<&str> {
        self.parent_key.as_deref()
    }

    /// Returns the children in insertion order.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Returns the payload.
    pub fn data(&self) -> &Payload {
        &self.data
    }

    /// Returns the payload value of `field`, if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    /// Returns the `/`-joined keys from the root down to this node.
    pub fn ancestor_path(&self) -> &str {
        &self.ancestor_path
    }

    /// Returns the identifier of the tree this node was created in.
    pub fn tree_id(&self) -> TreeId {
        self.tree_id
    }

    /// Returns the node-key and child-key field names.
    pub fn key_fields(&self) -> &KeyFields {
        &self.fields
    }

    /// Returns `true` if this node has no parent.
    pub fn is_root(&self) -> bool {
        self.parent_key.is_none()
    }

    /// Returns `true` if this node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns `true` if this node has a parent.
    pub fn has_parent(&self) -> bool {
        !self.is_root()
    }

    /// Returns `true` if this node has at least one child.
    pub fn has_children(&self) -> bool {
        !self.is_leaf()
    }

    /// Returns an owned address of this node for later removal.
    pub fn locator(&self) -> NodeLocator {
        NodeLocator {
            tree_id: self.tree_id,
            node_id: self.id,
            parent_id: self.parent_id,
            level: self.level,
            key: self.key.clone(),
            parent_key: self.parent_key.clone(),
            ancestor_path: self.ancestor_path.clone(),
        }
    }
}

// ============================================================================
// Traversal, Search (pub)
// ============================================================================
impl Node {
    /// Cancellable pre-order depth-first walk over this subtree.
    ///
    /// `visit` is called on this node first and returns whether to continue.
    /// The children are walked regardless; as soon as a child's walk returns
    /// `false`, the remaining siblings are skipped and `false` is returned.
    /// Otherwise the result of visiting this node is returned.
    ///
    /// So returning `false` once stops the walk after the current subtree,
    /// while a visitor that always returns `true` sees every node.
    pub fn traverse<'a, F>(&'a self, visit: &mut F) -> bool
    where
        F: FnMut(&'a Node) -> bool,
    {
        // (node, next child to walk, result of visiting the node)
        let mut frames: Vec<(&'a Node, usize, bool)> = vec![(self, 0, visit(self))];

        while let Some(frame) = frames.last_mut() {
            let (node, next_child, keep_going) = *frame;
            if let Some(child) = node.children.get(next_child) {
                frame.1 += 1;
                frames.push((child, 0, visit(child)));
                continue;
            }

            // Subtree done: a stop propagates through all ancestors at once
            frames.pop();
            if !keep_going {
                return false;
            }
        }

        true
    }

    /// Returns an iterator over this subtree in pre-order (parents before children).
    pub fn pre_order_iter(&self) -> PreOrderIter<'_> {
        PreOrderIter::new(self)
    }

    /// Collects all nodes strictly below this one satisfying `predicate`, in pre-order.
    pub fn find_descendants<'a, P>(&'a self, mut predicate: P) -> Vec<&'a Node>
    where
        P: FnMut(&Node) -> bool,
    {
        let mut found = Vec::new();
        for child in &self.children {
            child.traverse(&mut |node: &'a Node| {
                if predicate(node) {
                    found.push(node);
                }
                true
            });
        }
        found
    }

    /// Returns the number of nodes in this subtree, including itself.
    pub fn num_nodes(&self) -> usize {
        self.pre_order_iter().count()
    }
}

// ============================================================================
// Mutation (pub)
// ============================================================================
impl Node {
    /// Appends a new child with payload `data` and returns it.
    ///
    /// The child gets level `self.level() + 1`, this node's key as parent key,
    /// this node's tree id and an ancestor path extending this node's path.
    /// A child-key field in `data` is dropped.
    ///
    /// # Errors
    /// [TreeError::InvalidKey] if `data` lacks a scalar node key.
    pub fn add_child(&mut self, mut data: Payload) -> Result<&mut Node, TreeError> {
        let level = self.level + 1;
        let key = self.fields.node_key_of(&data, level)?;
        data.remove(self.fields.child_key());

        let child = Node {
            id: NodeId::next(),
            parent_id: Some(self.id),
            level,
            ancestor_path: format!("{}/{key}", self.ancestor_path),
            key,
            parent_key: Some(self.key.clone()),
            children: Vec::new(),
            data,
            tree_id: self.tree_id,
            fields: Arc::clone(&self.fields),
        };

        let index = self.children.len();
        self.children.push(child);
        Ok(&mut self.children[index])
    }

    /// Children for in-crate mutable search.
    pub(crate) fn children_mut(&mut self) -> &mut [Node] {
        &mut self.children
    }

    /// Removes the child with id `id` and returns it.
    pub(crate) fn remove_child(&mut self, id: NodeId) -> Option<Node> {
        let index = self.children.iter().position(|child| child.id == id)?;
        Some(self.children.remove(index))
    }

    /// Finds node `id` below (or at) this node, descending only into
    /// branches whose ancestor path leads to `path`.
    pub(crate) fn find_on_path(&self, path: &str, id: NodeId) -> Option<&Node> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.id == id {
                return Some(node);
            }
            stack.extend(node.children.iter().filter(|child| leads_to(&child.ancestor_path, path)));
        }
        None
    }

    /// Mutable variant of [`Node::find_on_path`].
    pub(crate) fn find_on_path_mut(&mut self, path: &str, id: NodeId) -> Option<&mut Node> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.id == id {
                return Some(node);
            }
            stack.extend(
                node.children
                    .iter_mut()
                    .filter(|child| leads_to(&child.ancestor_path, path)),
            );
        }
        None
    }

    /// Path of the parent, derived from this node's own path.
    fn parent_path(&self) -> Option<&str> {
        parent_path_of(&self.ancestor_path, &self.key)
    }
}

// ============================================================================
// Ancestry (pub)
// ============================================================================
impl Node {
    /// Resolves the owning tree through `registry`.
    ///
    /// # Errors
    /// [TreeError::UnregisteredTree] if the tree is not registered.
    pub fn tree<'r>(&self, registry: &'r TreeRegistry) -> Result<&'r Tree, TreeError> {
        registry
            .resolve(self.tree_id)
            .ok_or(TreeError::UnregisteredTree(self.tree_id))
    }

    /// Finds the parent of this node in `tree`.
    ///
    /// Only branches on the parent's ancestor path are searched.
    /// Returns `None` for the root and for nodes whose parent is no longer
    /// in `tree`.
    pub fn parent_in<'t>(&self, tree: &'t Tree) -> Option<&'t Node> {
        let parent_id = self.parent_id?;
        let parent_path = self.parent_path()?;
        tree.root().find_on_path(parent_path, parent_id)
    }

    /// Finds the parent of this node in its registered tree.
    ///
    /// # Errors
    /// [TreeError::UnregisteredTree] if the tree is not registered.
    pub fn parent<'r>(&self, registry: &'r TreeRegistry) -> Result<Option<&'r Node>, TreeError> {
        Ok(self.parent_in(self.tree(registry)?))
    }

    /// Walks from the parent up to the root collecting ancestors that satisfy
    /// `predicate`. The result is ordered root-first.
    pub fn find_ancestors_in<'t, P>(&self, tree: &'t Tree, mut predicate: P) -> Vec<&'t Node>
    where
        P: FnMut(&Node) -> bool,
    {
        let mut ancestors = Vec::with_capacity(self.level);
        let mut current = self.parent_in(tree);
        while let Some(ancestor) = current {
            if predicate(ancestor) {
                ancestors.push(ancestor);
            }
            current = ancestor.parent_in(tree);
        }

        ancestors.reverse();
        ancestors
    }

    /// Registry variant of [`Node::find_ancestors_in`].
    ///
    /// # Errors
    /// [TreeError::UnregisteredTree] if the tree is not registered.
    pub fn find_ancestors<'r, P>(&self, registry: &'r TreeRegistry, predicate: P) -> Result<Vec<&'r Node>, TreeError>
    where
        P: FnMut(&Node) -> bool,
    {
        Ok(self.find_ancestors_in(self.tree(registry)?, predicate))
    }

    /// Returns all ancestors, root-first, excluding this node.
    pub fn ancestors_in<'t>(&self, tree: &'t Tree) -> Vec<&'t Node> {
        self.find_ancestors_in(tree, |_| true)
    }

    /// Registry variant of [`Node::ancestors_in`].
    ///
    /// # Errors
    /// [TreeError::UnregisteredTree] if the tree is not registered.
    pub fn ancestors<'r>(&self, registry: &'r TreeRegistry) -> Result<Vec<&'r Node>, TreeError> {
        Ok(self.ancestors_in(self.tree(registry)?))
    }

    /// Joins the values of `field` from the root down to this node with `/`.
    ///
    /// String values are used verbatim, missing values as empty segments.
    pub fn path_in(&self, tree: &Tree, field: &str) -> String {
        let mut segments: Vec<String> = self
            .ancestors_in(tree)
            .iter()
            .map(|ancestor| segment_of(ancestor.get(field)))
            .collect();
        segments.push(segment_of(self.get(field)));
        segments.join("/")
    }

    /// Registry variant of [`Node::path_in`].
    ///
    /// # Errors
    /// [TreeError::UnregisteredTree] if the tree is not registered.
    pub fn path(&self, registry: &TreeRegistry, field: &str) -> Result<String, TreeError> {
        Ok(self.path_in(self.tree(registry)?, field))
    }
}

// =#========================================================================#=
// NODE LOCATOR
// =#========================================================================#=
/// Owned address of a node: tree, identity, parent and ancestor path.
///
/// Obtained from [`Node::locator`] and passed to
/// [`Tree::detach`] or [`TreeRegistry::detach`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeLocator {
    tree_id: TreeId,
    node_id: NodeId,
    parent_id: Option<NodeId>,
    level: usize,
    key: String,
    parent_key: Option<String>,
    ancestor_path: String,
}

impl NodeLocator {
    /// Returns the id of the tree the node belongs to.
    pub fn tree_id(&self) -> TreeId {
        self.tree_id
    }

    /// Returns the identity of the node.
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Returns the identity of the node's parent, `None` for a root.
    pub fn parent_id(&self) -> Option<NodeId> {
        self.parent_id
    }

    /// Returns the level of the node.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Returns the key of the node.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the key of the node's parent, `None` for a root.
    pub fn parent_key(&self) -> Option<&str> {
        self.parent_key.as_deref()
    }

    /// Returns the ancestor path of the node.
    pub fn ancestor_path(&self) -> &str {
        &self.ancestor_path
    }

    /// Returns the ancestor path of the node's parent, `None` for a root.
    pub fn parent_path(&self) -> Option<&str> {
        self.parent_key.as_ref()?;
        parent_path_of(&self.ancestor_path, &self.key)
    }
}

/// Strips `/key` from the end of `path`.
fn parent_path_of<'p>(path: &'p str, key: &str) -> Option<&'p str> {
    path.strip_suffix(key)?.strip_suffix('/')
}

/// Whether a node at `node_path` is `target` or one of its ancestors.
fn leads_to(node_path: &str, target: &str) -> bool {
    match target.strip_prefix(node_path) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

// Deep chains must not unwind the stack one level at a time
impl Drop for Node {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

// =#========================================================================#=
// ITERATOR
// =#========================================================================#=
/// Iterator for pre-order traversal (parents before children).
///
/// This iterator uses a stack-based approach to traverse the tree without recursion.
/// Each node is visited before any of its descendants, children in insertion order.
pub struct PreOrderIter<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> PreOrderIter<'a> {
    fn new(start: &'a Node) -> Self {
        PreOrderIter { stack: vec![start] }
    }
}

impl<'a> Iterator for PreOrderIter<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;

        // Push children in reverse, so first child is processed first
        self.stack.extend(node.children.iter().rev());

        Some(node)
    }
}
