//! Reconstruction of a nested tree from a flat edge list.
//!
//! The [`TreeBuilder`] turns a sequence of [Record]s into a single
//! [NodeSkeleton] root with all descendants attached. It is pure: no
//! identifiers are generated and nothing is registered. [`TreeBuilder::build`]
//! additionally wraps the skeleton into a [Tree].
//!
//! # Occurrences
//! A node key is not globally unique: the same key may appear under several
//! parents, and a node with several children is spread over several records.
//! The builder therefore distinguishes *occurrences* of a `(level, key)` pair:
//! - Level 0 has exactly one occurrence, the root.
//! - On level `L > 0`, there is one occurrence per edge record on level
//!   `L - 1` naming the key.
//!
//! Records of a `(level, key)` pair are handed, in input order, to the first
//! occurrence that has not already claimed the record's child key. A record
//! whose child key every occurrence has already claimed repeats an edge and
//! is ignored.
//!
//! # Linking
//! Occurrences live in an arena and refer to each other by index. Edges are
//! linked bottom-up (deepest level first): each edge record attaches the
//! first occurrence of its child that has no parent yet.
//!
//! ```text
//! Records ──→ group by level ──→ assign to occurrences ──→ link bottom-up ──→ NodeSkeleton
//! ```

use crate::error::TreeError;
use crate::model::record::{KeyFields, Payload, Record};
use crate::model::tree::Tree;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace, warn};

/// Index of an occurrence in the builder arena.
type SlotIndex = usize;

/// During construction, occurrences might not have a parent set yet.
const NO_PARENT_SET: SlotIndex = usize::MAX;

// =#========================================================================#=
// ORPHAN POLICY
// =#========================================================================#=
/// How records that no edge reaches are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrphanPolicy {
    /// Leave them out of the tree and log a warning
    #[default]
    Skip,
    /// Fail with [TreeError::OrphanRecord]
    Reject,
}

// =#========================================================================#=
// NODE SKELETON
// =#========================================================================#=
/// Intermediate, parent-linked tree produced by the [TreeBuilder].
///
/// The child-key field has already been stripped from `data`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSkeleton {
    /// Depth of this node, root = 0
    pub level: usize,
    /// Node key of this node
    pub key: String,
    /// Node key of the parent, `None` for the root
    pub parent_key: Option<String>,
    /// Payload without the child-key field
    pub data: Payload,
    /// Children in edge-record order
    pub children: Vec<NodeSkeleton>,
}

impl NodeSkeleton {
    /// Returns the number of skeletons in this subtree, including itself.
    pub fn num_nodes(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(skeleton) = stack.pop() {
            count += 1;
            stack.extend(skeleton.children.iter());
        }
        count
    }
}

// Deep chains must not unwind the stack one level at a time
impl Drop for NodeSkeleton {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut skeleton) = stack.pop() {
            stack.append(&mut skeleton.children);
        }
    }
}

// =#========================================================================#=
// TREE BUILDER
// =#========================================================================#=
/// Builds trees from flat edge-list records.
///
/// # Example
/// ```
/// use edgetree::model::{Record, TreeBuilder};
/// use serde_json::json;
///
/// let records = vec![
///     Record::from_value(0, json!({"id": "root", "child": "a"})).unwrap(),
///     Record::from_value(0, json!({"id": "root", "child": "b"})).unwrap(),
///     Record::from_value(1, json!({"id": "a", "child": null})).unwrap(),
///     Record::from_value(1, json!({"id": "b", "child": null})).unwrap(),
/// ];
///
/// let skeleton = TreeBuilder::new("id", "child")?.build_skeleton(records)?;
/// assert_eq!(skeleton.children.len(), 2);
/// assert_eq!(skeleton.num_nodes(), 3);
/// # Ok::<(), edgetree::TreeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    fields: KeyFields,
    orphan_policy: OrphanPolicy,
}

impl TreeBuilder {
    /// Creates a builder reading node keys from `key_field` and child keys
    /// from `child_key_field`.
    ///
    /// # Errors
    /// [TreeError::InvalidKeyFields] if the field names are empty or equal.
    pub fn new(key_field: &str, child_key_field: &str) -> Result<Self, TreeError> {
        Ok(Self::from_fields(KeyFields::new(key_field, child_key_field)?))
    }

    /// Creates a builder for already validated field names.
    pub fn from_fields(fields: KeyFields) -> Self {
        TreeBuilder {
            fields,
            orphan_policy: OrphanPolicy::default(),
        }
    }

    /// Sets how unreachable records are handled.
    pub fn with_orphan_policy(mut self, orphan_policy: OrphanPolicy) -> Self {
        self.orphan_policy = orphan_policy;
        self
    }

    /// Returns the field names used by this builder.
    pub fn fields(&self) -> &KeyFields {
        &self.fields
    }

    /// Builds a [Tree] with a freshly generated identifier.
    ///
    /// The tree is not registered anywhere.
    pub fn build<I>(&self, records: I) -> Result<Tree, TreeError>
    where
        I: IntoIterator<Item = Record>,
    {
        let skeleton = self.build_skeleton(records)?;
        Ok(Tree::from_skeleton(skeleton, self.fields.clone()))
    }

    /// Reconstructs the nested skeleton from `records`.
    ///
    /// The root payload merges all level-0 records in input order, later
    /// values overwriting earlier ones. Other nodes take the payload of the
    /// first record assigned to them.
    ///
    /// # Errors
    /// * [TreeError::MissingRoot] - no record at level 0
    /// * [TreeError::ConflictingRoots] - level-0 records with different keys
    /// * [TreeError::InvalidKey] - missing node key or non-scalar key
    /// * [TreeError::DanglingEdge] - child key without record one level down
    /// * [TreeError::MultipleParents] - child occurrence claimed twice
    /// * [TreeError::OrphanRecord] - unreachable record under [OrphanPolicy::Reject]
    pub fn build_skeleton<I>(&self, records: I) -> Result<NodeSkeleton, TreeError>
    where
        I: IntoIterator<Item = Record>,
    {
        // Group by level, keeping input order within each level
        let mut levels: BTreeMap<usize, Vec<Entry>> = BTreeMap::new();
        let mut num_records = 0;
        for record in records {
            let entry = self.entry_of(record)?;
            levels.entry(entry.level).or_default().push(entry);
            num_records += 1;
        }

        let Some(roots) = levels.get(&0).filter(|roots| !roots.is_empty()) else {
            return Err(TreeError::MissingRoot);
        };
        let root_key = roots[0].key.clone();
        if let Some(conflict) = roots.iter().find(|entry| entry.key != root_key) {
            return Err(TreeError::ConflictingRoots {
                first: root_key,
                second: conflict.key.clone(),
            });
        }
        let root_data = roots.iter().fold(Payload::new(), |mut merged, entry| {
            merged.extend(entry.data.clone());
            merged
        });

        // Number of occurrences per (level, key); known for level L once level L-1 is assigned
        let mut incoming: HashMap<(usize, String), usize> = HashMap::new();
        incoming.insert((0, root_key.clone()), 1);

        let mut arena = SkeletonArena::default();
        let mut edges: Vec<Edge> = Vec::new();

        for (level, entries) in levels {
            for entry in entries {
                let Some(&count) = incoming.get(&(level, entry.key.clone())) else {
                    match self.orphan_policy {
                        OrphanPolicy::Skip => {
                            warn!(key = %entry.key, level, "skipping record without parent edge");
                            continue;
                        }
                        OrphanPolicy::Reject => {
                            return Err(TreeError::OrphanRecord {
                                key: entry.key,
                                level,
                            });
                        }
                    }
                };

                let occurrences = arena.occurrences_or_insert(level, &entry.key, count);
                let target = match &entry.child {
                    Some(child) => occurrences
                        .iter()
                        .copied()
                        .find(|&index| !arena.slots[index].claimed.contains(child)),
                    None => occurrences
                        .iter()
                        .copied()
                        .find(|&index| arena.slots[index].data.is_none())
                        .or(occurrences.first().copied()),
                };
                let Some(target) = target else {
                    trace!(key = %entry.key, level, child = ?entry.child, "ignoring repeated edge record");
                    continue;
                };

                let slot = &mut arena.slots[target];
                if slot.data.is_none() {
                    slot.data = Some(entry.data);
                }
                if let Some(child) = entry.child {
                    slot.claimed.push(child.clone());
                    *incoming.entry((level + 1, child.clone())).or_insert(0) += 1;
                    edges.push(Edge {
                        parent: target,
                        level,
                        child,
                    });
                }
            }
        }

        // Occurrences without a record of their own share the first payload
        for indices in arena.occurrences.values() {
            let template = indices.iter().find_map(|&index| arena.slots[index].data.clone());
            for &index in indices {
                if arena.slots[index].data.is_none() {
                    arena.slots[index].data = template.clone();
                }
            }
        }

        // Link bottom-up; stable sort keeps edge order within a level
        edges.sort_by(|a, b| b.level.cmp(&a.level));
        for edge in &edges {
            let child_level = edge.level + 1;
            let occurrences = arena
                .occurrences
                .get(&(child_level, edge.child.clone()))
                .ok_or_else(|| TreeError::DanglingEdge {
                    key: edge.child.clone(),
                    level: child_level,
                })?;
            let child = occurrences
                .iter()
                .copied()
                .find(|&index| arena.slots[index].parent == NO_PARENT_SET)
                .ok_or_else(|| TreeError::MultipleParents {
                    key: edge.child.clone(),
                    level: child_level,
                })?;

            arena.slots[child].parent = edge.parent;
            arena.slots[edge.parent].children.push(child);
        }

        let root_index = arena.occurrences[&(0, root_key)][0];
        arena.slots[root_index].data = Some(root_data);
        debug!(
            records = num_records,
            nodes = arena.slots.len(),
            edges = edges.len(),
            "built tree skeleton"
        );

        Ok(arena.into_skeleton(root_index))
    }

    /// Extracts keys from a record and strips the child-key field.
    fn entry_of(&self, record: Record) -> Result<Entry, TreeError> {
        let Record { level, mut data } = record;
        let key = self.fields.node_key_of(&data, level)?;
        let child = self.fields.child_key_of(&data, level)?;
        data.remove(self.fields.child_key());

        Ok(Entry {
            level,
            key,
            child,
            data,
        })
    }
}

// =#========================================================================#=
// ARENA (private)
// =#========================================================================#=
/// A record with its keys extracted.
struct Entry {
    level: usize,
    key: String,
    child: Option<String>,
    data: Payload,
}

/// A parent-to-child edge stated by one record.
struct Edge {
    parent: SlotIndex,
    level: usize,
    child: String,
}

/// One occurrence of a `(level, key)` pair.
struct Slot {
    level: usize,
    key: String,
    data: Option<Payload>,
    parent: SlotIndex,
    children: Vec<SlotIndex>,
    /// Child keys this occurrence already has an edge to
    claimed: Vec<String>,
}

#[derive(Default)]
struct SkeletonArena {
    slots: Vec<Slot>,
    occurrences: HashMap<(usize, String), Vec<SlotIndex>>,
}

impl SkeletonArena {
    /// Returns the occurrences of `(level, key)`, creating `count` of them on first use.
    fn occurrences_or_insert(&mut self, level: usize, key: &str, count: usize) -> Vec<SlotIndex> {
        let lookup = (level, key.to_string());
        if let Some(existing) = self.occurrences.get(&lookup) {
            return existing.clone();
        }

        let mut indices = Vec::with_capacity(count);
        for _ in 0..count {
            indices.push(self.slots.len());
            self.slots.push(Slot {
                level,
                key: key.to_string(),
                data: None,
                parent: NO_PARENT_SET,
                children: Vec::new(),
                claimed: Vec::new(),
            });
        }
        self.occurrences.insert(lookup, indices.clone());
        indices
    }

    /// Moves the subtree below `root` out of the arena.
    ///
    /// Skeletons are assembled bottom-up in reverse pre-order, so every
    /// child is complete before its parent takes it.
    fn into_skeleton(mut self, root: SlotIndex) -> NodeSkeleton {
        let mut order = Vec::with_capacity(self.slots.len());
        let mut stack = vec![root];
        while let Some(index) = stack.pop() {
            order.push(index);
            stack.extend(self.slots[index].children.iter().rev().copied());
        }

        let mut built: HashMap<SlotIndex, NodeSkeleton> = HashMap::with_capacity(order.len());
        for &index in order.iter().skip(1).rev() {
            let skeleton = self.take_skeleton(index, &mut built);
            built.insert(index, skeleton);
        }
        self.take_skeleton(root, &mut built)
    }

    /// Builds the skeleton of slot `index` from its already built children.
    fn take_skeleton(&mut self, index: SlotIndex, built: &mut HashMap<SlotIndex, NodeSkeleton>) -> NodeSkeleton {
        let parent_key = match self.slots[index].parent {
            NO_PARENT_SET => None,
            parent => Some(self.slots[parent].key.clone()),
        };

        // Children are taken before their parent, so the key can move out
        let slot = &mut self.slots[index];
        let children = slot.children.iter().filter_map(|child| built.remove(child)).collect();
        NodeSkeleton {
            level: slot.level,
            key: std::mem::take(&mut slot.key),
            parent_key,
            data: slot.data.take().unwrap_or_default(),
            children,
        }
    }
}
