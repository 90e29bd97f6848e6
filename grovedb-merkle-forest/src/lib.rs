//! Merkle forest: an append-only forest of perfect binary Merkle trees with
//! consistency proofs between any two historical sizes.
//!
//! Every appended leaf commits to a fixed-depth K-ary accumulator tree built
//! over positional markers; the reduced accumulator and the leaf's insertion
//! index are hashed with Blake3 into the leaf's content digest.
//!
//! # Core types
//!
//! - [`MerkleForest`]: appends, historical digests and proof generation.
//! - [`Digest`]: commitment to the forest at one size.
//! - [`ConsistencyProof`]: prefix proof between two sizes, checked by
//!   [`verify_extension_proof`].
//! - [`KaryAccumulator`] / [`AccumulatorParams`]: per-leaf accumulator tree.
//! - [`MerkleNode`] / [`NodeArena`]: node lifecycle and storage.

#![warn(missing_docs)]

mod error;
mod forest;
/// Hash boundary (Blake3 over raw concatenations).
pub mod hash;
/// Bit arithmetic recovering historical root sets from sizes.
pub mod helper;
mod kary;
mod node;
mod proof;
#[cfg(test)]
mod tests;

pub use error::{Error, Result};
pub use forest::MerkleForest;
pub use grovedb_costs::{CostResult, CostsExt, OperationCost};
pub use hash::{Hash, content_hash, hash_parts, merge_hash};
pub use kary::{AccumulatorParams, KaryAccumulator, MAX_ACCUMULATOR_DEPTH};
pub use node::{MerkleNode, NodeArena, NodeId, NodeIndex, NodeKind, Sibling};
pub use proof::{ConsistencyProof, Digest, verify_extension_proof};
