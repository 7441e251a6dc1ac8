use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::{FixedDecimal, Task, TaskId};

/// How a group of tasks can be executed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feasibility {
    /// No split of the group's liquidity satisfies every price bound
    None,
    /// Both directions net fully at the spot price
    Ideal,
    /// Zero-for-one side gets spot execution, one-for-zero side gets all token0
    IdealZeroForOne,
    /// One-for-zero side gets spot execution, zero-for-one side gets all token1
    IdealOneForZero,
    /// A lone task routed through the pool
    SwapEachTask,
}

impl Feasibility {
    pub fn description(&self) -> &'static str {
        match self {
            Feasibility::None => {
                "Token0 output > available token 0, token1 output > available token 1"
            }
            Feasibility::Ideal => "Ideal for everyone involved",
            Feasibility::IdealZeroForOne => "Ideal for zeroForOne, Feasible for oneForZero",
            Feasibility::IdealOneForZero => "Ideal for oneForZero, Feasible for zeroForOne",
            Feasibility::SwapEachTask => "Feasible to swap using the pool",
        }
    }

    /// True for the classifications settled by direct transfers
    pub fn is_netted(&self) -> bool {
        matches!(
            self,
            Feasibility::Ideal | Feasibility::IdealZeroForOne | Feasibility::IdealOneForZero
        )
    }
}

/// Token totals on both sides of a trade
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTotals {
    pub token0_input: U256,
    pub token1_input: U256,
    pub token0_output: U256,
    pub token1_output: U256,
}

impl TokenTotals {
    pub fn accumulate(&mut self, other: &TokenTotals) {
        self.token0_input += other.token0_input;
        self.token1_input += other.token1_input;
        self.token0_output += other.token0_output;
        self.token1_output += other.token1_output;
    }
}

/// One group of tasks considered together for netting
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matching {
    pub tasks: Vec<Task>,
    pub feasibility: Feasibility,
    pub totals: TokenTotals,
}

impl Matching {
    pub fn task_ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(|t| t.task_id).collect()
    }
}

/// Outcome of evaluating one partition of a batch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PossibleResult {
    pub matchings: Vec<Matching>,

    /// Spot price of the pool (token1 per token0)
    pub pool_spot_price: FixedDecimal,

    /// Totals if every task swapped through the pool on its own
    pub pool_totals: TokenTotals,
    pub pool_average_price: FixedDecimal,

    /// Totals achieved by this partition's netting
    pub totals: TokenTotals,
    pub matching_average_price: FixedDecimal,

    /// True iff no matching is classified [`Feasibility::None`]
    pub feasible: bool,
}

impl PossibleResult {
    pub fn task_count(&self) -> usize {
        self.matchings.iter().map(|m| m.tasks.len()).sum()
    }

    /// Number of matchings settled by direct transfers
    pub fn netted_count(&self) -> usize {
        self.matchings
            .iter()
            .filter(|m| m.feasibility.is_netted())
            .count()
    }
}
