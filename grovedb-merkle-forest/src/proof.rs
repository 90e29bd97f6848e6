//! Forest digests and consistency proofs.
//!
//! A [`Digest`] commits to the forest at one size. A [`ConsistencyProof`]
//! shows that the forest at an older size is a prefix of the forest at a
//! newer one; [`verify_extension_proof`] checks it from the two digests and
//! the proof bytes alone.

use bincode::{Decode, Encode};
use tracing::{trace, warn};

use crate::{
    Error, Result,
    hash::{Hash, merge_hash},
    helper::{is_right_at, peak_depths, root_depth, root_index},
    node::Sibling,
};

/// Upper bound on decoded digest/proof sizes.
const MAX_DECODE_BYTES: usize = 100 * 1024 * 1024;

/// Public commitment to the forest at a given size.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Digest {
    /// Root digests, oldest first; one per set bit of `size`.
    pub roots: Vec<Hash>,
    /// Accumulator placeholder: the roots' accumulator bytes concatenated.
    pub accumulator: Vec<u8>,
    /// Number of leaves committed to.
    pub size: u64,
}

/// Sibling digests needed to extend an old digest to a newer one, bottom-up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Encode, Decode)]
pub struct ConsistencyProof {
    /// Siblings in the order the verifier consumes them.
    pub siblings: Vec<Sibling>,
}

fn bincode_config() -> impl bincode::config::Config {
    bincode::config::standard()
        .with_big_endian()
        .with_limit::<MAX_DECODE_BYTES>()
}

impl Digest {
    /// Serialize this digest to bytes using bincode.
    pub fn encode_to_vec(&self) -> Result<Vec<u8>> {
        bincode::encode_to_vec(self, bincode_config())
            .map_err(|e| Error::InvalidData(format!("failed to encode Digest: {}", e)))
    }

    /// Deserialize a digest from bytes.
    pub fn decode_from_slice(bytes: &[u8]) -> Result<Self> {
        let (digest, _) = bincode::decode_from_slice(bytes, bincode_config())
            .map_err(|e| Error::InvalidData(format!("failed to decode Digest: {}", e)))?;
        Ok(digest)
    }

    fn check_shape(&self, label: &str) -> Result<()> {
        let expected = self.size.count_ones() as usize;
        if self.roots.len() != expected {
            return Err(Error::InvalidProof(format!(
                "{} digest of size {} has {} roots, expected {}",
                label,
                self.size,
                self.roots.len(),
                expected
            )));
        }
        Ok(())
    }
}

impl ConsistencyProof {
    /// Number of sibling records.
    pub fn len(&self) -> usize {
        self.siblings.len()
    }

    /// Returns `true` if the proof carries no siblings.
    pub fn is_empty(&self) -> bool {
        self.siblings.is_empty()
    }

    /// Serialize this proof to bytes using bincode.
    pub fn encode_to_vec(&self) -> Result<Vec<u8>> {
        bincode::encode_to_vec(self, bincode_config()).map_err(|e| {
            Error::InvalidData(format!("failed to encode ConsistencyProof: {}", e))
        })
    }

    /// Deserialize a proof from bytes.
    pub fn decode_from_slice(bytes: &[u8]) -> Result<Self> {
        let (proof, _) = bincode::decode_from_slice(bytes, bincode_config()).map_err(|e| {
            Error::InvalidData(format!("failed to decode ConsistencyProof: {}", e))
        })?;
        Ok(proof)
    }
}

/// Verify that `old_digest` commits to a prefix of what `new_digest` commits
/// to.
///
/// Returns `Ok(false)` when the recomputed root does not match. Malformed
/// input (digests inconsistent with their sizes, an old size above the new
/// one, too few or too many siblings) is an [`Error::InvalidProof`].
pub fn verify_extension_proof(
    old_digest: &Digest,
    new_digest: &Digest,
    proof: &ConsistencyProof,
) -> Result<bool> {
    replay_extension(old_digest, new_digest, proof)
        .inspect_err(|e| warn!(error = %e, "rejecting malformed consistency proof input"))
}

fn replay_extension(
    old_digest: &Digest,
    new_digest: &Digest,
    proof: &ConsistencyProof,
) -> Result<bool> {
    check_digests(old_digest, new_digest)?;

    let old_depths = peak_depths(old_digest.size);
    let new_depths = peak_depths(new_digest.size);
    let diverging = old_digest
        .roots
        .iter()
        .zip(&new_digest.roots)
        .position(|(old, new)| old != new);

    // Roots both digests share must sit at the same depths.
    let shared = diverging.unwrap_or(old_depths.len());
    if shared > new_depths.len() || old_depths[..shared] != new_depths[..shared] {
        return Ok(false);
    }

    let Some(diverging) = diverging else {
        // every old root is still a root: nothing was extended
        if !proof.is_empty() {
            return Err(Error::InvalidProof(format!(
                "expected no siblings, got {}",
                proof.len()
            )));
        }
        return Ok(true);
    };

    // A root diverged, so the old digest is non-empty.
    let last_pos = old_digest.size - 1;
    let last_root_depth = root_depth(last_pos, old_digest.size)
        .ok_or_else(|| Error::InvalidProof("old digest has no roots".into()))?;
    let new_root_depth = root_depth(last_pos, new_digest.size)
        .ok_or_else(|| Error::InvalidProof("new digest does not cover the old leaves".into()))?;
    if root_index(last_pos, new_digest.size) != Some(diverging) {
        return Ok(false);
    }

    let mut older = old_digest.roots.len() - 1;
    let mut hash = old_digest.roots[older];
    let mut siblings = proof.siblings.iter();
    for level in last_root_depth..new_root_depth {
        if is_right_at(last_pos, level) {
            older = older.checked_sub(1).ok_or_else(|| {
                Error::InvalidProof(format!("no older root to absorb at level {}", level))
            })?;
            hash = merge_hash(&old_digest.roots[older], &hash);
            trace!(level, root = older, "absorbed older root");
        } else {
            let sibling = siblings.next().ok_or_else(|| {
                Error::InvalidProof(format!("proof ran out of siblings at level {}", level))
            })?;
            hash = merge_hash(&hash, &sibling.hash);
            trace!(level, "consumed proof sibling");
        }
    }
    let leftover = siblings.count();
    if leftover > 0 {
        return Err(Error::InvalidProof(format!(
            "{} unused siblings in proof",
            leftover
        )));
    }

    Ok(older == diverging && hash == new_digest.roots[diverging])
}

fn check_digests(old_digest: &Digest, new_digest: &Digest) -> Result<()> {
    if old_digest.size > new_digest.size {
        return Err(Error::InvalidProof(format!(
            "old size {} exceeds new size {}",
            old_digest.size, new_digest.size
        )));
    }
    old_digest.check_shape("old")?;
    new_digest.check_shape("new")
}
