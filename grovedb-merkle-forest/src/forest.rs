//! Append-only Merkle forest.

use grovedb_costs::{
    CostResult, CostsExt, OperationCost, cost_return_on_error, cost_return_on_error_no_add,
};
use tracing::{debug, trace};

use crate::{
    AccumulatorParams, Error, Result,
    hash::Hash,
    helper::{MAX_FOREST_DEPTH, capacity_for_depth, is_right_of},
    node::{MerkleNode, NodeArena, NodeId, NodeIndex},
    proof::{ConsistencyProof, Digest},
};

/// A forest of perfect binary Merkle trees over an append-only sequence.
///
/// Leaves are materialised lazily along the frontier inside one conceptual
/// complete tree of depth `max_depth`. The live roots are the completed
/// subtrees whose sizes are the set bits of `size`, oldest first.
#[derive(Debug, Clone)]
pub struct MerkleForest {
    depth: u8,
    size: u64,
    arena: NodeArena,
    root: NodeId,
    roots: Vec<NodeId>,
    next: Option<NodeId>,
    root_accumulators: Vec<u8>,
}

impl MerkleForest {
    /// Create an empty forest holding up to `2^max_depth` leaves.
    ///
    /// `max_depth` must be between 1 and [`MAX_FOREST_DEPTH`].
    pub fn new(max_depth: u8) -> Result<Self> {
        if !(1..=MAX_FOREST_DEPTH).contains(&max_depth) {
            return Err(Error::ConfigurationError(format!(
                "forest depth must be between 1 and {}, got {}",
                MAX_FOREST_DEPTH, max_depth
            )));
        }
        let mut arena = NodeArena::default();
        let root = arena.create_root(max_depth);
        let next = descend_leftmost(&mut arena, root)?;
        Ok(MerkleForest {
            depth: max_depth,
            size: 0,
            arena,
            root,
            roots: Vec::new(),
            next: Some(next),
            root_accumulators: Vec::new(),
        })
    }

    /// Number of appended leaves.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Configured maximum depth.
    pub fn max_depth(&self) -> u8 {
        self.depth
    }

    /// Maximum number of leaves, `2^max_depth`.
    pub fn capacity(&self) -> u64 {
        capacity_for_depth(self.depth)
    }

    /// Returns `true` once `capacity()` leaves have been appended.
    pub fn is_full(&self) -> bool {
        self.size == self.capacity()
    }

    /// Returns `true` if nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Concatenated accumulator bytes of every root ever pushed, in push
    /// order.
    pub fn root_accumulator_trailer(&self) -> &[u8] {
        &self.root_accumulators
    }

    /// Digests of the live roots, oldest first.
    pub fn root_hashes(&self) -> Result<Vec<Hash>> {
        self.roots
            .iter()
            .map(|id| self.arena.completed_hash(*id))
            .collect()
    }

    /// Borrow a node by handle.
    pub fn node(&self, id: NodeId) -> Result<&MerkleNode> {
        self.arena.get(id)
    }

    /// The leaf at insertion index `index`, if it has been materialised.
    pub fn leaf(&self, index: u64) -> Option<&MerkleNode> {
        let id = self.find_node(NodeIndex {
            depth: 0,
            shift: index,
        })?;
        self.arena.get(id).ok()
    }

    /// Number of materialised nodes.
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    /// Advisory memory footprint of the whole forest.
    pub fn footprint(&self) -> usize {
        self.arena.footprint(self.root) + self.root_accumulators.len()
    }

    /// Append a leaf whose accumulator is a `branch_factor`-ary tree of
    /// `kary_depth` levels holding markers `0..markers`.
    pub fn append(
        &mut self,
        branch_factor: u32,
        kary_depth: u32,
        markers: u32,
    ) -> CostResult<(), Error> {
        self.append_with(AccumulatorParams {
            branch_factor,
            depth: kary_depth,
            markers,
        })
    }

    /// Append a leaf built from `params`.
    ///
    /// Fails with [`Error::CapacityExceeded`] once the forest is full. Neither
    /// that nor an accumulator error mutates the forest.
    pub fn append_with(&mut self, params: AccumulatorParams) -> CostResult<(), Error> {
        let mut cost = OperationCost::default();
        if self.is_full() {
            return Err(Error::CapacityExceeded {
                capacity: self.capacity(),
                count: self.size,
            })
            .wrap_with_cost(cost);
        }
        let accumulator = cost_return_on_error_no_add!(&cost, params.digest());
        let leaf = cost_return_on_error_no_add!(
            &cost,
            self.next
                .ok_or_else(|| Error::StructuralError("forest has no frontier leaf".into()))
        );

        // `size < capacity <= 2^32`, so the index fits the 4-byte encoding.
        let leaf_index = self.size as u32;
        cost_return_on_error!(
            &mut cost,
            self.arena.complete_leaf(leaf, accumulator, leaf_index)
        );
        self.size += 1;

        let mut p = leaf;
        loop {
            let node = cost_return_on_error_no_add!(&cost, self.arena.get(p));
            if !node.is_right_child() {
                break;
            }
            p = cost_return_on_error_no_add!(&cost, self.parent_of(p));
            cost_return_on_error!(&mut cost, self.arena.complete_internal(p));
            let merged = cost_return_on_error_no_add!(
                &cost,
                self.roots.pop().ok_or_else(|| {
                    Error::StructuralError("carry merge with an empty root list".into())
                })
            );
            trace!(?merged, into = ?p, "carry merge");
        }
        self.roots.push(p);
        let root = cost_return_on_error_no_add!(&cost, self.arena.get(p));
        self.root_accumulators.extend_from_slice(root.accumulator());

        if self.is_full() {
            self.next = None;
            debug!(size = self.size, "forest is full");
            return Ok(()).wrap_with_cost(cost);
        }

        let before = self.arena.len();
        let parent = cost_return_on_error_no_add!(&cost, self.parent_of(p));
        let next = cost_return_on_error_no_add!(&cost, self.descend_right_spine(parent));
        self.next = Some(next);
        cost += OperationCost::with_nodes_created((self.arena.len() - before) as u32);

        debug!(
            size = self.size,
            roots = self.roots.len(),
            hashes = cost.hash_node_calls,
            "appended forest leaf"
        );
        Ok(()).wrap_with_cost(cost)
    }

    fn parent_of(&self, id: NodeId) -> Result<NodeId> {
        let node = self.arena.get(id)?;
        node.parent().ok_or_else(|| {
            Error::StructuralError(format!("node at {:?} has no parent", node.index()))
        })
    }

    // Create `parent`'s right child and walk its leftmost spine to a leaf.
    fn descend_right_spine(&mut self, parent: NodeId) -> Result<NodeId> {
        let right = self.arena.create_right_child(parent)?.ok_or_else(|| {
            Error::StructuralError("frontier parent is a leaf".into())
        })?;
        descend_leftmost(&mut self.arena, right)
    }

    /// Handles of the roots the forest had when it held `size` leaves.
    ///
    /// The set bits of `size`, scanned from `max_depth` down, give the depth
    /// of each root; the leaves already covered by older roots give its
    /// shift.
    pub fn get_old_roots(&self, size: u64) -> Result<Vec<NodeId>> {
        self.check_size(size)?;
        let mut roots = Vec::with_capacity(size.count_ones() as usize);
        let mut accounted = 0u64;
        for bit in (0..=self.depth).rev() {
            let mask = 1u64 << bit;
            if size & mask == 0 {
                continue;
            }
            roots.push(self.get_node_from_index(NodeIndex {
                depth: bit,
                shift: accounted >> bit,
            })?);
            accounted += mask;
        }
        Ok(roots)
    }

    /// Locate the node at `index` by descending from the absolute root.
    ///
    /// Asking for a node that was never materialised is a
    /// [`Error::StructuralError`].
    pub fn get_node_from_index(&self, index: NodeIndex) -> Result<NodeId> {
        self.find_node(index).ok_or_else(|| {
            Error::StructuralError(format!("no node materialised at {:?}", index))
        })
    }

    fn find_node(&self, index: NodeIndex) -> Option<NodeId> {
        if index.depth > self.depth || index.shift >= capacity_for_depth(self.depth - index.depth)
        {
            return None;
        }
        let mut id = self.root;
        loop {
            let node = self.arena.get(id).ok()?;
            if node.depth() == index.depth {
                return Some(id);
            }
            id = if is_right_of(node.depth(), node.index().shift, index.depth, index.shift) {
                node.right_child()?
            } else {
                node.left_child()?
            };
        }
    }

    fn check_size(&self, requested: u64) -> Result<()> {
        if requested > self.size {
            return Err(Error::RangeError {
                requested,
                size: self.size,
            });
        }
        Ok(())
    }

    /// Commitment to the forest as it was at `size` leaves.
    pub fn get_digest(&self, size: u64) -> Result<Digest> {
        let roots = self.get_old_roots(size)?;
        let mut hashes = Vec::with_capacity(roots.len());
        let mut accumulator = Vec::new();
        for id in roots {
            let node = self.arena.get(id)?;
            hashes.push(self.arena.completed_hash(id)?);
            accumulator.extend_from_slice(node.accumulator());
        }
        Ok(Digest {
            roots: hashes,
            accumulator,
            size,
        })
    }

    /// Prove that the forest at `old_size` is a prefix of the forest at
    /// `new_size`.
    ///
    /// Roots shared by both sizes need no proof. From the newest old root the
    /// proof climbs to the first new root that differs, recording the right
    /// sibling wherever the path is a left child; where it is a right child
    /// the verifier already knows the left sibling as an older old root.
    pub fn generate_consistency_proof(
        &self,
        old_size: u64,
        new_size: u64,
    ) -> Result<ConsistencyProof> {
        self.check_size(new_size)?;
        if old_size > new_size {
            return Err(Error::RangeError {
                requested: old_size,
                size: new_size,
            });
        }
        let new_roots = self.get_old_roots(new_size)?;
        let old_roots = self.get_old_roots(old_size)?;

        let mut siblings = Vec::new();
        for (i, old_root) in old_roots.iter().enumerate() {
            let new_root = *new_roots.get(i).ok_or_else(|| {
                Error::StructuralError(format!(
                    "forest at {} has fewer roots than at {}",
                    new_size, old_size
                ))
            })?;
            if self.arena.completed_hash(*old_root)? == self.arena.completed_hash(new_root)? {
                continue;
            }

            let target_depth = self.arena.get(new_root)?.depth();
            let mut id = *old_roots.last().unwrap_or(old_root);
            loop {
                let node = self.arena.get(id)?;
                if node.depth() >= target_depth {
                    break;
                }
                if !node.is_right_child() {
                    let sibling = self.arena.get_sibling(id)?;
                    trace!(at = ?node.index(), "recording proof sibling");
                    siblings.push(sibling);
                }
                id = self.parent_of(id)?;
            }
            break;
        }

        debug!(
            old_size,
            new_size,
            siblings = siblings.len(),
            "generated consistency proof"
        );
        Ok(ConsistencyProof { siblings })
    }
}

// Walk the leftmost spine below `from` down to a leaf, creating nodes on
// demand.
fn descend_leftmost(arena: &mut NodeArena, from: NodeId) -> Result<NodeId> {
    let mut id = from;
    while arena.get(id)?.depth() > 0 {
        id = arena
            .create_left_child(id)?
            .ok_or_else(|| Error::StructuralError("internal node without children".into()))?;
    }
    Ok(id)
}
