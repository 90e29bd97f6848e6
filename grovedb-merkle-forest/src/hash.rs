//! Hash boundary of the forest.
//!
//! Every digest is Blake3 over the raw, ordered concatenation of its inputs.
//! There are no domain tags: digests and proofs are consumed by verifiers
//! that replay the same concatenations from bytes alone.

use grovedb_costs::OperationCost;

/// A 32-byte node digest.
pub type Hash = [u8; 32];

/// Hash the ordered concatenation of `parts`.
pub fn hash_parts(parts: &[&[u8]]) -> Hash {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// Content digest of a forest leaf: `H(accumulator || le32(index))`.
pub fn content_hash(accumulator: &[u8], index: u32) -> Hash {
    hash_parts(&[accumulator, &index.to_le_bytes()])
}

/// Digest of an internal node: `H(left || right)`.
pub fn merge_hash(left: &Hash, right: &Hash) -> Hash {
    hash_parts(&[&left[..], &right[..]])
}

/// Cost of one [`content_hash`] call over an accumulator of `acc_len` bytes.
pub(crate) fn content_hash_cost(acc_len: usize) -> OperationCost {
    OperationCost::with_hash(acc_len + 4)
}

/// Cost of one [`merge_hash`] call.
pub(crate) fn merge_hash_cost() -> OperationCost {
    OperationCost::with_hash(64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_parts_is_plain_concatenation() {
        let split = hash_parts(&[b"ab".as_slice(), b"cd"]);
        let joined = hash_parts(&[b"abcd".as_slice()]);
        assert_eq!(split, joined);
        assert_eq!(joined, *blake3::hash(b"abcd").as_bytes());
    }

    #[test]
    fn test_merge_is_order_sensitive() {
        let a = [0xAAu8; 32];
        let b = [0xBBu8; 32];
        assert_ne!(merge_hash(&a, &b), merge_hash(&b, &a));
    }

    #[test]
    fn test_content_hash_uses_little_endian_index() {
        let acc = b"acc";
        let mut input = acc.to_vec();
        input.extend_from_slice(&[1, 0, 0, 0]);
        assert_eq!(content_hash(acc, 1), *blake3::hash(&input).as_bytes());
    }
}
