//! Edgetree is a library to reconstruct trees from flat edge lists.
//!
//! Input records do not form an adjacency list: each record states
//! "node X (at level L) has one child Y", and a node with several children
//! is spread over several records sharing its key. This crate merges these
//! records into a rooted tree and offers a mutable tree/node abstraction
//! on top of it.
//! Core functionality provided:
//! - Reconstruction: [TreeBuilder](model::TreeBuilder) merges records,
//!   attaches children to the right parent even when keys repeat across
//!   branches, and strips the child-key field from payloads.
//! - Traversal and search: cancellable pre-order walks, `find`,
//!   `find_all`, descendant and ancestor queries, paths.
//! - Mutation: add children and detach subtrees.
//! - Registry: [TreeRegistry](model::TreeRegistry) maps tree ids to trees,
//!   so a node can find its tree and parent without holding a reference.
//!
//! Limitations:
//! - Only rooted trees (no cycles, no shared children)
//! - Children are kept in insertion order, no other ordering
//! - No persistence or export
//!
//! # Usage
//!
//! Build a tree directly:
//! ```
//! use edgetree::build_tree;
//! use edgetree::model::Record;
//! use serde_json::json;
//!
//! let records = vec![
//!     Record::from_value(0, json!({"nodeKey": "root", "childNodeKey": "child0"})).unwrap(),
//!     Record::from_value(0, json!({"nodeKey": "root", "childNodeKey": "child1"})).unwrap(),
//!     Record::from_value(1, json!({"nodeKey": "child0", "childNodeKey": null})).unwrap(),
//!     Record::from_value(1, json!({"nodeKey": "child1", "childNodeKey": null})).unwrap(),
//! ];
//!
//! let tree = build_tree(records, "nodeKey", "childNodeKey")?;
//! assert_eq!(tree.root().children().len(), 2);
//! assert_eq!(tree.find_all(|node| node.level() == 1).len(), 2);
//! # Ok::<(), edgetree::TreeError>(())
//! ```
//!
//! Or register it, so that nodes can resolve their ancestors:
//! ```
//! use edgetree::model::{Record, TreeRegistry};
//! use serde_json::json;
//!
//! let records = vec![
//!     Record::from_value(0, json!({"nodeKey": "root", "childNodeKey": "child1"})).unwrap(),
//!     Record::from_value(1, json!({"nodeKey": "child1", "childNodeKey": "child2"})).unwrap(),
//!     Record::from_value(2, json!({"nodeKey": "child2", "childNodeKey": null})).unwrap(),
//! ];
//!
//! let mut registry = TreeRegistry::new();
//! let id = registry.build_tree(records, "nodeKey", "childNodeKey")?;
//!
//! let tree = registry.resolve(id).unwrap();
//! let leaf = tree.find_or_error(|node| node.level() == 2)?;
//! assert_eq!(leaf.path(&registry, "nodeKey")?, "root/child1/child2");
//!
//! let locator = leaf.locator();
//! registry.detach(&locator)?;
//! assert!(registry.resolve(id).unwrap().find(|node| node.key() == "child2").is_none());
//! # Ok::<(), edgetree::TreeError>(())
//! ```

pub mod error;
pub mod model;

pub use crate::error::TreeError;

use crate::model::{Record, Tree};

// ============================================================================
// Quick API
// ============================================================================
/// Builds an unregistered [Tree] from `records`.
///
/// `key_field` names the payload field identifying a node, `child_key_field`
/// the field naming one of its children.
///
/// See [`TreeBuilder::build_skeleton`](model::TreeBuilder::build_skeleton)
/// for the reconstruction rules and errors.
pub fn build_tree<I>(records: I, key_field: &str, child_key_field: &str) -> Result<Tree, TreeError>
where
    I: IntoIterator<Item = Record>,
{
    Tree::new(records, key_field, child_key_field)
}
