//! Error type for tree construction, lookup and registry access.
//!
//! This module provides [TreeError]. Construction errors
//! ([MissingRoot](TreeError::MissingRoot),
//! [DanglingEdge](TreeError::DanglingEdge), ...) describe problems in the
//! input records and are never transient. Lookup errors are only produced
//! by explicitly failing variants such as
//! [`Tree::find_or_error`](crate::model::Tree::find_or_error); plain
//! searches report absence with `None`.

use crate::model::TreeId;

// =#========================================================================#=
// TREE ERROR
// =#========================================================================#=
/// Errors raised while building, querying or resolving trees.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// No record at level 0.
    #[error("Level 0 root record not found")]
    MissingRoot,

    /// Level-0 records name different node keys.
    #[error("Conflicting root keys: '{first}' and '{second}'")]
    ConflictingRoots {
        /// Key of the first level-0 record
        first: String,
        /// First differing key found afterwards
        second: String,
    },

    /// A child key names no record at the level below its parent.
    #[error("Dangling edge: no node '{key}' at level {level}")]
    DanglingEdge {
        /// Child key that could not be resolved
        key: String,
        /// Level the child was expected at
        level: usize,
    },

    /// Every occurrence of a child was already attached to a parent.
    #[error("Node '{key}' at level {level} would get more than one parent")]
    MultipleParents {
        /// Key of the child being attached
        key: String,
        /// Level of the child
        level: usize,
    },

    /// A record at level > 0 is not reachable from any edge
    /// (only with [OrphanPolicy::Reject](crate::model::OrphanPolicy::Reject)).
    #[error("Orphan record: node '{key}' at level {level} has no parent edge")]
    OrphanRecord {
        /// Key of the unreachable record
        key: String,
        /// Level of the unreachable record
        level: usize,
    },

    /// A key field holds something other than a scalar, or the node key is missing.
    #[error("Invalid key in field '{field}' at level {level}: {reason}")]
    InvalidKey {
        /// Name of the offending field
        field: String,
        /// Level of the record or node
        level: usize,
        /// What was wrong with it
        reason: String,
    },

    /// The node-key/child-key field names are unusable.
    #[error("Invalid key fields - {0}")]
    InvalidKeyFields(String),

    /// A query that must produce a node found nothing.
    #[error("Target node not found")]
    NodeNotFound,

    /// Parent or tree resolution on a tree that is not in the registry.
    #[error("Tree {0} is not registered")]
    UnregisteredTree(TreeId),
}
