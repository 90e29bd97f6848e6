//! Bit arithmetic over forest sizes.
//!
//! A forest of `size` leaves has one perfect tree per set bit of `size`, the
//! tree for bit `d` holding `2^d` leaves. Trees are ordered from the highest
//! bit (oldest, leftmost) to the lowest (newest, rightmost), so every
//! historical root set can be recovered from the size alone.

/// Largest supported forest depth. Leaf indices are hashed as 4-byte
/// little-endian integers, so a forest may hold at most `2^32` leaves.
pub const MAX_FOREST_DEPTH: u8 = 32;

/// Number of leaves a forest of the given depth holds when full.
pub fn capacity_for_depth(depth: u8) -> u64 {
    1u64 << depth
}

/// Depth of the tree that contains leaf `pos` in a forest of `size` leaves.
///
/// This is the highest bit where `pos` and `size` differ: above it both
/// share the already-closed trees, and at it `size` has the tree that `pos`
/// falls into. Returns `None` when `pos >= size`.
pub fn root_depth(pos: u64, size: u64) -> Option<u32> {
    if pos >= size {
        return None;
    }
    Some(63 - (pos ^ size).leading_zeros())
}

/// Position (0 = oldest) of the root whose tree contains leaf `pos` in a
/// forest of `size` leaves. Returns `None` when `pos >= size`.
pub fn root_index(pos: u64, size: u64) -> Option<usize> {
    let depth = root_depth(pos, size)?;
    let older = size.checked_shr(depth + 1).unwrap_or(0);
    Some(older.count_ones() as usize)
}

/// Depths of the roots of a forest of `size` leaves, oldest first.
pub fn peak_depths(size: u64) -> Vec<u32> {
    (0..u64::BITS)
        .rev()
        .filter(|bit| size & (1u64 << bit) != 0)
        .collect()
}

/// Whether the node at `level` on the path from leaf `pos` is a right child.
pub fn is_right_at(pos: u64, level: u32) -> bool {
    (pos >> level) & 1 == 1
}

/// Whether the node at `(target_depth, target_shift)` lies in the right half
/// of the node at `(depth, shift)`. `target_depth` must be below `depth`.
pub fn is_right_of(depth: u8, shift: u64, target_depth: u8, target_shift: u64) -> bool {
    debug_assert!(target_depth < depth);
    let relative_width = 1u64 << (depth - target_depth);
    let start = relative_width * shift;
    target_shift >= start + (relative_width >> 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_depth_at_power_of_two_boundaries() {
        for k in 1..20u32 {
            let full = 1u64 << k;
            // a full power-of-two forest is a single tree
            assert_eq!(root_depth(full - 1, full), Some(k));
            assert_eq!(root_depth(0, full), Some(k));
            // one leaf past it opens a fresh depth-0 tree
            assert_eq!(root_depth(full, full + 1), Some(0));
            assert_eq!(root_index(full, full + 1), Some(1));
        }
        // 2^k - 1 leaves: trees of depth k-1, k-2, ..., 0
        for k in 1..20u32 {
            let size = (1u64 << k) - 1;
            assert_eq!(root_depth(size - 1, size), Some(0));
            assert_eq!(root_index(size - 1, size), Some(k as usize - 1));
            assert_eq!(root_depth(0, size), Some(k - 1));
            assert_eq!(root_index(0, size), Some(0));
        }
    }

    #[test]
    fn test_root_depth_matches_brute_force() {
        for size in 1..300u64 {
            let depths = peak_depths(size);
            let mut start = 0u64;
            for (index, depth) in depths.iter().enumerate() {
                let end = start + (1u64 << depth);
                for pos in start..end {
                    assert_eq!(root_depth(pos, size), Some(*depth), "pos {pos} size {size}");
                    assert_eq!(root_index(pos, size), Some(index), "pos {pos} size {size}");
                }
                start = end;
            }
            assert_eq!(start, size);
            assert_eq!(root_depth(size, size), None);
        }
    }

    #[test]
    fn test_peak_depths() {
        assert!(peak_depths(0).is_empty());
        assert_eq!(peak_depths(7), vec![2, 1, 0]);
        assert_eq!(peak_depths(8), vec![3]);
        assert_eq!(peak_depths(11), vec![3, 1, 0]);
        assert_eq!(peak_depths(1u64 << 32), vec![32]);
    }

    #[test]
    fn test_is_right_of() {
        // root of a depth-3 tree, leaves 0..8
        assert!(!is_right_of(3, 0, 0, 3));
        assert!(is_right_of(3, 0, 0, 4));
        assert!(is_right_of(3, 0, 2, 1));
        assert!(!is_right_of(3, 0, 2, 0));
        // node (2, 1) covers leaves 4..8
        assert!(!is_right_of(2, 1, 0, 5));
        assert!(is_right_of(2, 1, 0, 6));
        assert!(is_right_of(2, 1, 1, 3));
    }

    #[test]
    fn test_capacity_for_depth() {
        assert_eq!(capacity_for_depth(3), 8);
        assert_eq!(capacity_for_depth(MAX_FOREST_DEPTH), 1u64 << 32);
    }
}
