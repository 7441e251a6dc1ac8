use alloy_primitives::B256;
use cow_operator_types::{FixedPointError, TaskId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MatchingError {
    #[error("task {task_id} has no pool quote")]
    MissingQuote { task_id: TaskId },

    #[error("price is zero")]
    ZeroPrice,

    #[error("batch of {count} tasks exceeds the partition limit of {max}")]
    BatchTooLarge { count: usize, max: usize },

    #[error("task for pool {found} in a batch for pool {expected}")]
    MixedPools { expected: B256, found: B256 },

    #[error("fixed point arithmetic failed: {0}")]
    FixedPoint(#[from] FixedPointError),
}
