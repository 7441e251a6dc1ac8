use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A batch is identified by the block height at which it opened
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BatchId(pub u64);

impl BatchId {
    pub fn opened_at(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a batch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchStatus {
    /// Accepting new tasks
    Open,
    /// Handed to the pipeline, no longer mutated
    Closing { task_count: usize },
    /// Every slice was submitted
    Settled { tx_hashes: Vec<B256> },
    /// Closed with no tasks
    Empty,
    /// Had tasks but no partition could be settled
    Unmatched { task_count: usize },
    /// Aborted before any slice was submitted
    Failed { reason: String },
    /// Aborted after the slices in `tx_hashes` were already submitted
    PartiallySettled { tx_hashes: Vec<B256>, reason: String },
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Open => "open",
            BatchStatus::Closing { .. } => "closing",
            BatchStatus::Settled { .. } => "settled",
            BatchStatus::Empty => "empty",
            BatchStatus::Unmatched { .. } => "unmatched",
            BatchStatus::Failed { .. } => "failed",
            BatchStatus::PartiallySettled { .. } => "partially_settled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, BatchStatus::Open | BatchStatus::Closing { .. })
    }
}
