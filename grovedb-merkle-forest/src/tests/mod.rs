
use crate::{AccumulatorParams, MerkleForest};

/// Small accumulator shape keeping large forests cheap to build in tests.
pub(crate) const SMALL_PARAMS: AccumulatorParams = AccumulatorParams {
    branch_factor: 2,
    depth: 1,
    markers: 2,
};

/// Build a forest of `max_depth` holding `count` leaves built from `params`.
pub(crate) fn forest_with(max_depth: u8, count: u64, params: AccumulatorParams) -> MerkleForest {
    let mut forest = MerkleForest::new(max_depth).expect("valid depth");
    for _ in 0..count {
        forest.append_with(params).unwrap().expect("append");
    }
    forest
}
