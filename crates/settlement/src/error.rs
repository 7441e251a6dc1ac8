use alloy_primitives::{Address, U256};
use cow_operator_types::{FixedPointError, TaskId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("task {task_id} would receive {transfer}, less than its pool quote {quoted}")]
    NegativeSurplus {
        task_id: TaskId,
        transfer: U256,
        quoted: U256,
    },

    #[error("transfers of {currency} total {paid}, exceeding the declared output {declared}")]
    Overdrawn {
        currency: Address,
        paid: U256,
        declared: U256,
    },

    #[error("quoted inputs of {currency} sum to {quoted}, matching declares {declared}")]
    InputMismatch {
        currency: Address,
        quoted: U256,
        declared: U256,
    },

    #[error("chosen result contains an infeasible matching")]
    InfeasibleMatching,

    #[error("task {task_id} has no pool quote")]
    MissingQuote { task_id: TaskId },

    #[error(transparent)]
    FixedPoint(#[from] FixedPointError),
}
