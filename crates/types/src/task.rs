use alloy_primitives::{Address, B256, I256, U256};
use serde::{Deserialize, Serialize};

/// Identifier assigned to a task by the service manager
pub type TaskId = u32;

/// Identifies a pool: the currency pair, its fee tier and the hook contract
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolKey {
    pub currency0: Address,
    pub currency1: Address,
    pub fee: u32,
    pub tick_spacing: i32,
    pub hooks: Address,
}

/// Swap intent exactly as carried by the task-created event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTask {
    pub task_id: TaskId,
    pub zero_for_one: bool,
    /// Negative for exact-input swaps
    pub amount_specified: I256,
    pub sqrt_price_limit_x96: U256,
    pub sender: Address,
    pub pool_id: B256,
    pub task_created_block: u32,
}

/// A swap intent waiting in a batch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    // ═══════════════════════════════════════════════════════════════════════════
    // INTENT
    // ═══════════════════════════════════════════════════════════════════════════

    pub task_id: TaskId,

    /// True when selling currency0 for currency1
    pub zero_for_one: bool,

    /// Signed amount in the pool's convention (negative = exact input)
    pub amount_specified: I256,

    /// Worst acceptable price, as sqrt(price) * 2^96
    pub sqrt_price_limit_x96: U256,

    /// Owner of the intent, recipient of any CoW payout
    pub sender: Address,

    pub pool_id: B256,
    pub pool_key: PoolKey,
    pub task_created_block: u32,

    // ═══════════════════════════════════════════════════════════════════════════
    // QUOTE (populated when the batch closes)
    // ═══════════════════════════════════════════════════════════════════════════

    /// What the pool alone would take from the owner
    pub pool_input_amount: Option<U256>,

    /// What the pool alone would pay the owner
    pub pool_output_amount: Option<U256>,
}

impl Task {
    pub fn from_raw(raw: RawTask, pool_key: PoolKey) -> Self {
        Self {
            task_id: raw.task_id,
            zero_for_one: raw.zero_for_one,
            amount_specified: raw.amount_specified,
            sqrt_price_limit_x96: raw.sqrt_price_limit_x96,
            sender: raw.sender,
            pool_id: raw.pool_id,
            pool_key,
            task_created_block: raw.task_created_block,
            pool_input_amount: None,
            pool_output_amount: None,
        }
    }

    pub fn is_exact_input(&self) -> bool {
        self.amount_specified.is_negative()
    }

    /// Magnitude of the specified amount
    pub fn specified_magnitude(&self) -> U256 {
        self.amount_specified.unsigned_abs()
    }

    /// Currency the owner gives up
    pub fn input_currency(&self) -> Address {
        if self.zero_for_one {
            self.pool_key.currency0
        } else {
            self.pool_key.currency1
        }
    }

    /// Currency the owner receives
    pub fn output_currency(&self) -> Address {
        if self.zero_for_one {
            self.pool_key.currency1
        } else {
            self.pool_key.currency0
        }
    }

    /// Record a quote given as the pool's signed (amount0, amount1) deltas
    pub fn apply_quote(&mut self, amount0: I256, amount1: I256) {
        let (input, output) = if self.zero_for_one {
            (amount0.unsigned_abs(), amount1.unsigned_abs())
        } else {
            (amount1.unsigned_abs(), amount0.unsigned_abs())
        };
        self.pool_input_amount = Some(input);
        self.pool_output_amount = Some(output);
    }

    /// Quoted (input, output) magnitudes, if the task has been enriched
    pub fn quoted_amounts(&self) -> Option<(U256, U256)> {
        self.pool_input_amount.zip(self.pool_output_amount)
    }

    pub fn is_quoted(&self) -> bool {
        self.quoted_amounts().is_some()
    }
}
