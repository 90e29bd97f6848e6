//! Forest nodes and the arena that owns them.
//!
//! Nodes are addressed by [`NodeId`] into a dense arena owned by the forest.
//! Children are owned through the arena; the parent link is a plain id used
//! only for upward traversal. Nothing is ever removed, so a node stays
//! reachable by coordinate long after it has been merged out of the live
//! root list.

use bincode::{Decode, Encode};
use grovedb_costs::{CostResult, CostsExt, OperationCost};

use crate::{
    Error, Result,
    hash::{Hash, content_hash, content_hash_cost, merge_hash, merge_hash_cost},
};

/// Rough per-pointer footprint used by [`NodeArena::footprint`].
const POINTER_SIZE_IN_BYTES: usize = 8;

/// Handle to a node stored in a [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Coordinate of a node in the complete binary tree of the forest's maximum
/// depth. Leaves have depth 0; `shift` counts nodes from the left at that
/// depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIndex {
    /// Height above the leaves.
    pub depth: u8,
    /// Position from the left among nodes of this depth.
    pub shift: u64,
}

impl NodeIndex {
    /// Coordinate of the left child.
    pub fn left_child(&self) -> NodeIndex {
        NodeIndex {
            depth: self.depth - 1,
            shift: self.shift * 2,
        }
    }

    /// Coordinate of the right child.
    pub fn right_child(&self) -> NodeIndex {
        NodeIndex {
            depth: self.depth - 1,
            shift: self.shift * 2 + 1,
        }
    }
}

/// Sibling record carried by a consistency proof.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Sibling {
    /// Digest of the sibling node.
    pub hash: Hash,
    /// Accumulator bytes of the sibling node (placeholder).
    pub accumulator: Vec<u8>,
}

/// Kind-specific payload of a [`MerkleNode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A forest leaf.
    Leaf {
        /// `H(accumulator || le32(index))`, set on completion.
        content_hash: Option<Hash>,
    },
    /// An inner node with lazily created children.
    Internal {
        /// Left child, once created.
        left: Option<NodeId>,
        /// Right child, once created.
        right: Option<NodeId>,
    },
}

/// A node of the forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleNode {
    hash: Option<Hash>,
    accumulator: Vec<u8>,
    parent: Option<NodeId>,
    is_right: bool,
    index: NodeIndex,
    kind: NodeKind,
}

impl MerkleNode {
    fn new(parent: Option<NodeId>, is_right: bool, index: NodeIndex) -> Self {
        let kind = if index.depth == 0 {
            NodeKind::Leaf { content_hash: None }
        } else {
            NodeKind::Internal {
                left: None,
                right: None,
            }
        };
        MerkleNode {
            hash: None,
            accumulator: Vec::new(),
            parent,
            is_right,
            index,
            kind,
        }
    }

    /// The node digest, once completed.
    pub fn hash(&self) -> Option<Hash> {
        self.hash
    }

    /// Accumulator bytes: the reduced accumulator for leaves, empty for
    /// internal nodes.
    pub fn accumulator(&self) -> &[u8] {
        &self.accumulator
    }

    /// Whether the digest has been finalised.
    pub fn is_complete(&self) -> bool {
        self.hash.is_some()
    }

    /// Whether this node is its parent's right child.
    pub fn is_right_child(&self) -> bool {
        self.is_right
    }

    /// Parent handle; `None` for the absolute root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Coordinate of this node.
    pub fn index(&self) -> NodeIndex {
        self.index
    }

    /// Height above the leaves.
    pub fn depth(&self) -> u8 {
        self.index.depth
    }

    /// Returns `true` for leaves.
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    /// Kind-specific payload.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Content digest of a completed leaf; `None` for internal nodes.
    pub fn content_hash(&self) -> Option<Hash> {
        match self.kind {
            NodeKind::Leaf { content_hash } => content_hash,
            NodeKind::Internal { .. } => None,
        }
    }

    /// Left child handle, if created.
    pub fn left_child(&self) -> Option<NodeId> {
        match self.kind {
            NodeKind::Internal { left, .. } => left,
            NodeKind::Leaf { .. } => None,
        }
    }

    /// Right child handle, if created.
    pub fn right_child(&self) -> Option<NodeId> {
        match self.kind {
            NodeKind::Internal { right, .. } => right,
            NodeKind::Leaf { .. } => None,
        }
    }

    // Advisory size of this node alone.
    fn own_footprint(&self) -> usize {
        let pointers = match self.kind {
            NodeKind::Leaf { content_hash } => 1 + content_hash.map_or(0, |h| h.len()),
            NodeKind::Internal { .. } => 3 * POINTER_SIZE_IN_BYTES,
        };
        let hash = self.hash.map_or(0, |h| h.len());
        // parent pointer, flags, coordinate
        POINTER_SIZE_IN_BYTES + pointers + hash + self.accumulator.len() + 2 + 1 + 8
    }
}

/// Dense arena owning every node of a forest.
#[derive(Debug, Clone, Default)]
pub struct NodeArena {
    nodes: Vec<MerkleNode>,
}

impl NodeArena {
    /// Number of materialised nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no node has been created.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Borrow a node.
    pub fn get(&self, id: NodeId) -> Result<&MerkleNode> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| Error::StructuralError(format!("unknown node id {}", id.0)))
    }

    fn get_mut(&mut self, id: NodeId) -> Result<&mut MerkleNode> {
        self.nodes
            .get_mut(id.0)
            .ok_or_else(|| Error::StructuralError(format!("unknown node id {}", id.0)))
    }

    fn push(&mut self, node: MerkleNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Create the parentless root of a tree of the given depth.
    pub fn create_root(&mut self, depth: u8) -> NodeId {
        self.push(MerkleNode::new(None, false, NodeIndex { depth, shift: 0 }))
    }

    /// Create the left child of `id`, or return it if it already exists.
    ///
    /// Leaves have no children: the call is a no-op returning `None`.
    pub fn create_left_child(&mut self, id: NodeId) -> Result<Option<NodeId>> {
        self.create_child(id, false)
    }

    /// Create the right child of `id`, or return it if it already exists.
    ///
    /// Leaves have no children: the call is a no-op returning `None`.
    pub fn create_right_child(&mut self, id: NodeId) -> Result<Option<NodeId>> {
        self.create_child(id, true)
    }

    fn create_child(&mut self, id: NodeId, is_right: bool) -> Result<Option<NodeId>> {
        let node = self.get(id)?;
        let (left, right) = match node.kind {
            NodeKind::Leaf { .. } => return Ok(None),
            NodeKind::Internal { left, right } => (left, right),
        };
        let existing = if is_right { right } else { left };
        if existing.is_some() {
            return Ok(existing);
        }
        let index = if is_right {
            node.index.right_child()
        } else {
            node.index.left_child()
        };
        let child = self.push(MerkleNode::new(Some(id), is_right, index));
        if let NodeKind::Internal { left, right } = &mut self.get_mut(id)?.kind {
            if is_right {
                *right = Some(child);
            } else {
                *left = Some(child);
            }
        }
        Ok(Some(child))
    }

    /// Complete a leaf with the reduced accumulator and its insertion index.
    pub fn complete_leaf(
        &mut self,
        id: NodeId,
        accumulator: Vec<u8>,
        leaf_index: u32,
    ) -> CostResult<Hash, Error> {
        let cost = content_hash_cost(accumulator.len());
        let node = match self.get_mut(id) {
            Ok(node) => node,
            Err(e) => return Err(e).wrap_with_cost(OperationCost::default()),
        };
        let NodeKind::Leaf { content_hash: slot } = &mut node.kind else {
            return Err(Error::StructuralError(format!(
                "node at {:?} is not a leaf",
                node.index
            )))
            .wrap_with_cost(OperationCost::default());
        };
        if node.hash.is_some() {
            return Err(Error::StructuralError(format!(
                "leaf at {:?} is already complete",
                node.index
            )))
            .wrap_with_cost(OperationCost::default());
        }
        let hash = content_hash(&accumulator, leaf_index);
        *slot = Some(hash);
        node.hash = Some(hash);
        node.accumulator = accumulator;
        Ok(hash).wrap_with_cost(cost)
    }

    /// Complete an internal node from its two completed children.
    pub fn complete_internal(&mut self, id: NodeId) -> CostResult<Hash, Error> {
        let no_cost = OperationCost::default();
        let (left, right) = match self.children_hashes(id) {
            Ok(hashes) => hashes,
            Err(e) => return Err(e).wrap_with_cost(no_cost),
        };
        let hash = merge_hash(&left, &right);
        match self.get_mut(id) {
            Ok(node) => {
                node.hash = Some(hash);
                node.accumulator = Vec::new();
            }
            Err(e) => return Err(e).wrap_with_cost(no_cost),
        }
        Ok(hash).wrap_with_cost(merge_hash_cost())
    }

    fn children_hashes(&self, id: NodeId) -> Result<(Hash, Hash)> {
        let node = self.get(id)?;
        let (Some(left), Some(right)) = (node.left_child(), node.right_child()) else {
            return Err(Error::StructuralError(format!(
                "cannot complete {:?}: missing child",
                node.index
            )));
        };
        let left = self.completed_hash(left)?;
        let right = self.completed_hash(right)?;
        Ok((left, right))
    }

    pub(crate) fn completed_hash(&self, id: NodeId) -> Result<Hash> {
        let node = self.get(id)?;
        node.hash.ok_or_else(|| {
            Error::StructuralError(format!("node at {:?} is not complete", node.index))
        })
    }

    /// Digest and accumulator of the sibling of `id` relative to its parent.
    pub fn get_sibling(&self, id: NodeId) -> Result<Sibling> {
        let node = self.get(id)?;
        let parent = node.parent.ok_or_else(|| {
            Error::StructuralError(format!("node at {:?} has no parent", node.index))
        })?;
        let parent = self.get(parent)?;
        let sibling = if node.is_right {
            parent.left_child()
        } else {
            parent.right_child()
        }
        .ok_or_else(|| {
            Error::StructuralError(format!("node at {:?} has no sibling", node.index))
        })?;
        let sibling = self.get(sibling)?;
        let hash = sibling.hash.ok_or_else(|| {
            Error::StructuralError(format!("sibling at {:?} is not complete", sibling.index))
        })?;
        Ok(Sibling {
            hash,
            accumulator: sibling.accumulator.clone(),
        })
    }

    /// Advisory memory footprint of `id` and everything materialised below
    /// it. Not used for correctness.
    ///
    /// Ids unknown to this arena contribute nothing, so an unknown `id`
    /// yields 0.
    pub fn footprint(&self, id: NodeId) -> usize {
        let mut total = 0;
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let Ok(node) = self.get(id) else { continue };
            total += node.own_footprint();
            stack.extend(node.left_child());
            stack.extend(node.right_child());
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn arena_with_pair() -> (NodeArena, NodeId, NodeId, NodeId) {
        let mut arena = NodeArena::default();
        let root = arena.create_root(1);
        let left = arena.create_left_child(root).expect("ok").expect("internal");
        let right = arena.create_right_child(root).expect("ok").expect("internal");
        (arena, root, left, right)
    }

    #[test]
    fn test_child_coordinates() {
        let mut arena = NodeArena::default();
        let root = arena.create_root(3);
        let right = arena.create_right_child(root).expect("ok").expect("child");
        let right_left = arena.create_left_child(right).expect("ok").expect("child");
        let node = arena.get(right_left).expect("node");
        assert_eq!(node.index(), NodeIndex { depth: 1, shift: 2 });
        assert!(!node.is_right_child());
        assert_eq!(node.parent(), Some(right));
        let leaf = arena
            .create_right_child(right_left)
            .expect("ok")
            .expect("child");
        let leaf = arena.get(leaf).expect("node");
        assert!(leaf.is_leaf());
        assert_eq!(leaf.index(), NodeIndex { depth: 0, shift: 5 });
    }

    #[test]
    fn test_create_child_on_leaf_is_noop() {
        let (mut arena, _, left, _) = arena_with_pair();
        let before = arena.len();
        assert_eq!(arena.create_left_child(left), Ok(None));
        assert_eq!(arena.create_right_child(left), Ok(None));
        assert_eq!(arena.len(), before);
    }

    #[test]
    fn test_create_child_is_idempotent() {
        let (mut arena, root, left, _) = arena_with_pair();
        assert_eq!(arena.create_left_child(root), Ok(Some(left)));
        assert_eq!(arena.len(), 3);
    }

    #[test]
    fn test_internal_completes_from_children() {
        let (mut arena, root, left, right) = arena_with_pair();
        assert_matches!(
            arena.complete_internal(root).unwrap(),
            Err(Error::StructuralError(_))
        );

        let left_hash = arena
            .complete_leaf(left, b"a".to_vec(), 0)
            .unwrap()
            .expect("leaf");
        assert_eq!(left_hash, content_hash(b"a", 0));
        assert_matches!(
            arena.complete_internal(root).unwrap(),
            Err(Error::StructuralError(_))
        );

        let right_hash = arena
            .complete_leaf(right, b"b".to_vec(), 1)
            .unwrap()
            .expect("leaf");
        let ctx = arena.complete_internal(root);
        assert_eq!(ctx.cost.hash_node_calls, 1);
        let root_hash = ctx.value.expect("both children complete");
        assert_eq!(root_hash, merge_hash(&left_hash, &right_hash));

        let root = arena.get(root).expect("node");
        assert!(root.is_complete());
        assert!(root.accumulator().is_empty());
        assert_eq!(root.content_hash(), None);
    }

    #[test]
    fn test_leaf_completes_once() {
        let (mut arena, _, left, _) = arena_with_pair();
        arena
            .complete_leaf(left, vec![1], 0)
            .unwrap()
            .expect("first completion");
        assert_matches!(
            arena.complete_leaf(left, vec![1], 0).unwrap(),
            Err(Error::StructuralError(_))
        );
        let leaf = arena.get(left).expect("node");
        assert_eq!(leaf.content_hash(), leaf.hash());
        assert_eq!(leaf.accumulator(), &[1]);
    }

    #[test]
    fn test_get_sibling() {
        let (mut arena, root, left, right) = arena_with_pair();
        assert_matches!(arena.get_sibling(root), Err(Error::StructuralError(_)));
        // sibling exists but is not complete yet
        assert_matches!(arena.get_sibling(left), Err(Error::StructuralError(_)));

        arena.complete_leaf(left, vec![7], 0).unwrap().expect("leaf");
        arena.complete_leaf(right, vec![8], 1).unwrap().expect("leaf");
        let sibling = arena.get_sibling(left).expect("sibling");
        assert_eq!(sibling.hash, content_hash(&[8], 1));
        assert_eq!(sibling.accumulator, vec![8]);
        let sibling = arena.get_sibling(right).expect("sibling");
        assert_eq!(sibling.hash, content_hash(&[7], 0));
    }

    #[test]
    fn test_footprint_grows_with_subtree() {
        let (mut arena, root, left, _) = arena_with_pair();
        let before = arena.footprint(root);
        assert!(before > arena.footprint(left));
        arena
            .complete_leaf(left, vec![0; 16], 0)
            .unwrap()
            .expect("leaf");
        assert!(arena.footprint(root) > before);
    }

    #[test]
    fn test_footprint_of_unknown_id_is_zero() {
        let (arena, root, ..) = arena_with_pair();
        let total = arena.footprint(root);
        assert_eq!(arena.footprint(NodeId(arena.len())), 0);
        assert_eq!(arena.footprint(root), total);
    }
}
