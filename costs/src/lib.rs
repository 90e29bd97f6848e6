#![deny(missing_docs)]
//! Cost accounting for Merkle forest operations.
//!
//! Mutating forest operations return their value wrapped in a
//! [`CostContext`] carrying the hashing and node materialisation they
//! performed.

mod context;

use std::ops::{Add, AddAssign};

pub use context::{CostContext, CostResult, CostsExt};

/// Resources consumed by a forest operation.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub struct OperationCost {
    /// How many 32-byte node digests were produced (leaf content hashes and
    /// internal merges).
    pub hash_node_calls: u32,
    /// How many input bytes were fed to the hash function.
    pub hash_byte_calls: u64,
    /// How many tree nodes were materialised.
    pub nodes_created: u32,
}

impl OperationCost {
    /// Cost of a single hash over `input_len` bytes.
    pub fn with_hash(input_len: usize) -> Self {
        OperationCost {
            hash_node_calls: 1,
            hash_byte_calls: input_len as u64,
            ..Default::default()
        }
    }

    /// Cost of materialising `nodes_created` nodes.
    pub fn with_nodes_created(nodes_created: u32) -> Self {
        OperationCost {
            nodes_created,
            ..Default::default()
        }
    }

    /// Returns `true` if no resources were consumed.
    pub fn is_nothing(&self) -> bool {
        *self == Self::default()
    }
}

impl Add for OperationCost {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        OperationCost {
            hash_node_calls: self.hash_node_calls + rhs.hash_node_calls,
            hash_byte_calls: self.hash_byte_calls + rhs.hash_byte_calls,
            nodes_created: self.nodes_created + rhs.nodes_created,
        }
    }
}

impl AddAssign for OperationCost {
    fn add_assign(&mut self, rhs: Self) {
        self.hash_node_calls += rhs.hash_node_calls;
        self.hash_byte_calls += rhs.hash_byte_calls;
        self.nodes_created += rhs.nodes_created;
    }
}

/// Like `?` for functions returning [`CostResult`]: unwraps a
/// `CostResult` into the external accumulator and returns early on error,
/// keeping whatever cost was already accumulated.
#[macro_export]
macro_rules! cost_return_on_error {
    ( &mut $cost:ident, $($body:tt)+ ) => {
        {
            use $crate::CostsExt;
            let result_with_cost = { $($body)+ };
            let result = result_with_cost.unwrap_add_cost(&mut $cost);
            match result {
                Ok(x) => x,
                Err(e) => return Err(e).wrap_with_cost($cost),
            }
        }
    };
}

/// Like [`cost_return_on_error`] but for a plain `Result`; only the cost
/// accumulated so far is returned on error.
#[macro_export]
macro_rules! cost_return_on_error_no_add {
    ( &$cost:ident, $($body:tt)+ ) => {
        {
            use $crate::CostsExt;
            let result = { $($body)+ };
            match result {
                Ok(x) => x,
                Err(e) => return Err(e).wrap_with_cost($cost),
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_cost_adds_up() {
        let mut cost = OperationCost::with_hash(36);
        cost += OperationCost::with_hash(64);
        cost += OperationCost::with_nodes_created(3);
        assert_eq!(
            cost,
            OperationCost {
                hash_node_calls: 2,
                hash_byte_calls: 100,
                nodes_created: 3,
            }
        );
        assert!(!cost.is_nothing());
        assert!(OperationCost::default().is_nothing());
    }

    fn failing_after_hash() -> CostResult<u32, &'static str> {
        let mut cost = OperationCost::default();
        let x = cost_return_on_error!(
            &mut cost,
            Ok::<u32, &'static str>(1).wrap_with_cost(OperationCost::with_hash(10))
        );
        cost_return_on_error_no_add!(&cost, if x > 0 { Err("boom") } else { Ok(x) });
        Ok(x).wrap_with_cost(cost)
    }

    #[test]
    fn test_early_return_keeps_accumulated_cost() {
        let ctx = failing_after_hash();
        assert_eq!(ctx.value, Err("boom"));
        assert_eq!(ctx.cost.hash_node_calls, 1);
        assert_eq!(ctx.cost.hash_byte_calls, 10);
    }
}
