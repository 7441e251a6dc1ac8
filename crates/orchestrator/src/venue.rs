use alloy_primitives::{Address, Bytes, B256, I256, U256};
use async_trait::async_trait;
use cow_operator_types::{PoolKey, RawTask, SwapBalance, Task, TaskId, TransferBalance};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Events the operator consumes from the chain.
///
/// Task deliveries are at-least-once; block heights never decrease.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChainEvent {
    TaskCreated(RawTask),
    NewBlock(u64),
}

/// Signed pool deltas for a simulated swap, in the pool's sign convention
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuote {
    pub amount0: I256,
    pub amount1: I256,
}

/// Everything `respondToBatch` takes for one settled slice
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSubmission {
    pub pool_id: B256,
    pub tasks: Vec<Task>,
    pub task_ids: Vec<TaskId>,
    pub transfers: Vec<TransferBalance>,
    pub swaps: Vec<SwapBalance>,
    pub signature: Bytes,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: B256,
}

#[derive(Debug, Error)]
pub enum VenueError {
    #[error("unknown pool {0}")]
    UnknownPool(B256),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("quote reverted: {0}")]
    QuoteReverted(String),

    #[error("transaction failed: {0}")]
    Transaction(String),

    #[error("invalid operator key: {0}")]
    InvalidKey(String),

    #[error("signing failed: {0}")]
    Signing(String),
}

// ═══════════════════════════════════════════════════════════════════════════
// COLLABORATORS
// ═══════════════════════════════════════════════════════════════════════════

/// Read access to pool state
#[async_trait]
pub trait PoolStateProvider: Send + Sync {
    async fn pool_key(&self, pool_id: B256) -> Result<PoolKey, VenueError>;

    /// Current sqrt(price) * 2^96 of the pool
    async fn sqrt_price_x96(&self, pool_id: B256) -> Result<U256, VenueError>;
}

/// Simulates single-pool swaps without executing them
#[async_trait]
pub trait SwapQuoter: Send + Sync {
    /// Quote an exact-input swap with no price limit
    async fn quote_exact_input(
        &self,
        pool_key: &PoolKey,
        zero_for_one: bool,
        exact_amount: U256,
    ) -> Result<SwapQuote, VenueError>;
}

/// The service manager contract that accepts batch responses
#[async_trait]
pub trait SettlementSubmitter: Send + Sync {
    /// Digest the operator signs for a response
    async fn message_hash(
        &self,
        pool_id: B256,
        transfers: &[TransferBalance],
        swaps: &[SwapBalance],
    ) -> Result<B256, VenueError>;

    async fn respond_to_batch(&self, submission: BatchSubmission) -> Result<TxReceipt, VenueError>;
}

/// Produces the operator signature over a message hash
#[async_trait]
pub trait OperatorSigner: Send + Sync {
    /// 65-byte `r || s || v` signature
    async fn sign_hash(&self, hash: B256) -> Result<Bytes, VenueError>;

    fn address(&self) -> Address;
}
