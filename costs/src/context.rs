use crate::OperationCost;

/// Operation result paired with the cost of producing it.
#[must_use]
#[derive(Debug, Eq, PartialEq)]
pub struct CostContext<T> {
    /// Wrapped operation's return value.
    pub value: T,
    /// Cost of the operation.
    pub cost: OperationCost,
}

impl<T> CostContext<T> {
    /// Take the value out, adding its cost to `acc_cost`.
    pub fn unwrap_add_cost(self, acc_cost: &mut OperationCost) -> T {
        *acc_cost += self.cost;
        self.value
    }

    /// Take the value out, dropping the cost.
    pub fn unwrap(self) -> T {
        self.value
    }

    /// Borrow the cost.
    pub fn cost(&self) -> &OperationCost {
        &self.cost
    }

    /// Borrow the value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Map the value, keeping the cost.
    pub fn map<B>(self, f: impl FnOnce(T) -> B) -> CostContext<B> {
        CostContext {
            value: f(self.value),
            cost: self.cost,
        }
    }
}

/// `Result` wrapped into a [`CostContext`].
pub type CostResult<T, E> = CostContext<Result<T, E>>;

impl<T, E> CostResult<T, E> {
    /// Map the `Ok` value, keeping the cost.
    pub fn map_ok<B>(self, f: impl FnOnce(T) -> B) -> CostResult<B, E> {
        self.map(|result| result.map(f))
    }

    /// Map the `Err` value, keeping the cost.
    pub fn map_err<B>(self, f: impl FnOnce(E) -> B) -> CostResult<T, B> {
        self.map(|result| result.map_err(f))
    }
}

/// Extension trait wrapping any value into a [`CostContext`].
pub trait CostsExt {
    /// Wrap `self` with the provided cost.
    fn wrap_with_cost(self, cost: OperationCost) -> CostContext<Self>
    where
        Self: Sized,
    {
        CostContext { value: self, cost }
    }
}

impl<T> CostsExt for T {}
