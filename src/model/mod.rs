//! Data model for trees reconstructed from edge lists.
//!
//! # Tree representation
//! A [Tree] owns its root [Node], and every node owns its children. Nodes
//! hold no parent or tree reference: they carry the [TreeId] of their tree,
//! their parent's [NodeId] and key and their ancestor path, and resolve
//! parent and tree by lookup, either in a [TreeRegistry] or in an explicitly
//! given [Tree].
//!
//! # Building trees
//! [Record]s are turned into a [NodeSkeleton] by the [TreeBuilder], which
//! merges records of the same node and attaches children bottom-up.
//! [`Tree::new`] and [`TreeRegistry::build_tree`] run the builder and wrap
//! the skeleton into nodes.
//!
//! | Step | Type |
//! |------|------|
//! | Input | [Record] with [Payload] and [KeyFields] |
//! | Reconstruction | [TreeBuilder] → [NodeSkeleton] |
//! | Result | [Tree] of [Node]s, optionally registered in a [TreeRegistry] |

pub mod node;
pub mod record;
pub mod registry;
pub mod tree;
pub mod tree_builder;

// Nodes
pub use node::Node;
pub use node::NodeId;
pub use node::NodeLocator;
pub use node::PreOrderIter;
// Input
pub use record::KeyFields;
pub use record::Payload;
pub use record::Record;
// Trees
pub use registry::SharedRegistry;
pub use registry::TreeRegistry;
pub use tree::Tree;
pub use tree::TreeId;
pub use tree_builder::NodeSkeleton;
pub use tree_builder::OrphanPolicy;
pub use tree_builder::TreeBuilder;
