//! Fixed-depth K-ary accumulator tree.
//!
//! Each forest leaf commits to a small auxiliary tree whose depth-D slots hold
//! positional markers. Reduction is plain byte concatenation in child order;
//! the forest hashes the result once when completing the leaf.

use crate::{Error, Result};

/// Deepest accumulator tree accepted. Beyond it `K^D` saturates `u64` for
/// any `K >= 2`, and a unary tree gains nothing from extra levels.
pub const MAX_ACCUMULATOR_DEPTH: u32 = 64;

/// Shape of the accumulator tree built for every appended forest leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccumulatorParams {
    /// Children per node (K).
    pub branch_factor: u32,
    /// Number of levels below the root that hold markers (D).
    pub depth: u32,
    /// Number of positional markers `0..markers` inserted.
    pub markers: u32,
}

impl Default for AccumulatorParams {
    fn default() -> Self {
        AccumulatorParams {
            branch_factor: 3,
            depth: 3,
            markers: 27,
        }
    }
}

impl AccumulatorParams {
    /// Check the tree shape.
    ///
    /// The depth must lie in `1..=`[`MAX_ACCUMULATOR_DEPTH`]. The marker
    /// count is not checked here; overflowing it surfaces as
    /// [`Error::CapacityExceeded`] while inserting.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_ACCUMULATOR_DEPTH).contains(&self.depth) {
            return Err(Error::ConfigurationError(format!(
                "accumulator depth must be between 1 and {}, got {}",
                MAX_ACCUMULATOR_DEPTH, self.depth
            )));
        }
        if self.branch_factor < 1 {
            return Err(Error::ConfigurationError(
                "accumulator branch factor must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Build the accumulator for these parameters and reduce it.
    pub fn digest(&self) -> Result<Vec<u8>> {
        let mut tree = KaryAccumulator::new(self.branch_factor, self.depth)?;
        for position in 0..self.markers {
            tree.add_leaf(position)?;
        }
        Ok(tree.compute_digest())
    }
}

#[derive(Debug, Default)]
struct KaryNode {
    children: Vec<KaryNode>,
    digest: Vec<u8>,
}

/// A K-ary tree of fixed depth filled left to right with 4-byte markers.
#[derive(Debug)]
pub struct KaryAccumulator {
    root: KaryNode,
    branch_factor: u32,
    depth: u32,
    count: u64,
}

impl KaryAccumulator {
    /// Create an empty tree with branching factor `branch_factor` and
    /// `depth` marker levels.
    pub fn new(branch_factor: u32, depth: u32) -> Result<Self> {
        AccumulatorParams {
            branch_factor,
            depth,
            markers: 0,
        }
        .validate()?;
        Ok(KaryAccumulator {
            root: KaryNode::default(),
            branch_factor,
            depth,
            count: 0,
        })
    }

    /// Number of marker slots, `K^D`, saturating at `u64::MAX`.
    pub fn capacity(&self) -> u64 {
        (self.branch_factor as u64).saturating_pow(self.depth)
    }

    /// Number of markers inserted so far.
    pub fn len(&self) -> u64 {
        self.count
    }

    /// Returns `true` if no marker has been inserted.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Insert `position` (little-endian) into the leftmost free depth-D slot.
    pub fn add_leaf(&mut self, position: u32) -> Result<()> {
        let leaf = KaryNode {
            children: Vec::new(),
            digest: position.to_le_bytes().to_vec(),
        };
        let k = self.branch_factor as usize;
        if !insert_leftmost(&mut self.root, leaf, 1, self.depth, k) {
            return Err(Error::CapacityExceeded {
                capacity: self.capacity(),
                count: self.count,
            });
        }
        self.count += 1;
        Ok(())
    }

    /// Reduce the tree to the digest of its root.
    pub fn compute_digest(&mut self) -> Vec<u8> {
        reduce(&mut self.root);
        self.root.digest.clone()
    }
}

// Slots fill strictly left to right, so every child but the last is full and
// only the last one can take the leaf.
fn insert_leftmost(node: &mut KaryNode, leaf: KaryNode, level: u32, depth: u32, k: usize) -> bool {
    if level == depth {
        if node.children.len() < k {
            node.children.push(leaf);
            return true;
        }
        return false;
    }
    if let Some(last) = node.children.last_mut() {
        if has_room(last, level + 1, depth, k) {
            return insert_leftmost(last, leaf, level + 1, depth, k);
        }
    }
    if node.children.len() < k {
        let mut fresh = KaryNode::default();
        if insert_leftmost(&mut fresh, leaf, level + 1, depth, k) {
            node.children.push(fresh);
            return true;
        }
    }
    false
}

fn has_room(node: &KaryNode, level: u32, depth: u32, k: usize) -> bool {
    if node.children.len() < k {
        return true;
    }
    if level == depth {
        return false;
    }
    node.children
        .last()
        .is_some_and(|last| has_room(last, level + 1, depth, k))
}

fn reduce(node: &mut KaryNode) {
    if node.children.is_empty() {
        return;
    }
    let mut digest = Vec::new();
    for child in node.children.iter_mut() {
        reduce(child);
        digest.extend_from_slice(&child.digest);
    }
    node.digest = digest;
}
