use alloy_primitives::{keccak256, Address, B256, I256, U256};
use async_trait::async_trait;
use cow_operator_config::{validate_config, ConfigLoader};
use cow_operator_matching_engine::{price_from_sqrt_x96, sqrt_price_x96_from_price};
use cow_operator_metrics::MetricsCollector;
use cow_operator_orchestrator::{
    BatchSubmission, BatchWindowManager, ChainEvent, Collaborators, LocalSigner, ManagerConfig,
    OperatorSigner, OrchestratorError, PoolStateProvider, SettlementSubmitter, SwapQuote,
    SwapQuoter, TxReceipt, VenueError,
};
use cow_operator_types::{
    BatchId, BatchStatus, FixedDecimal, PoolKey, RawTask, SwapBalance, TaskId, TransferBalance,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

// ═══════════════════════════════════════════════════════════════════════════
// MOCK IMPLEMENTATIONS FOR TESTING
// ═══════════════════════════════════════════════════════════════════════════

/// Spot price, token1 per token0
const PRICE: u64 = 2500;

/// Pool fee in hundredths of a bip
const FEE_PIPS: u64 = 3000;

fn one() -> U256 {
    U256::from(10u64).pow(U256::from(18u64))
}

fn pool_id() -> B256 {
    B256::repeat_byte(0x77)
}

fn pool_key() -> PoolKey {
    PoolKey {
        currency0: Address::repeat_byte(0x01),
        currency1: Address::repeat_byte(0x02),
        fee: FEE_PIPS as u32,
        tick_spacing: 60,
        hooks: Address::repeat_byte(0x0f),
    }
}

/// `sqrtPriceX96` for a whole-number price
fn sqrt_x96(price: u64) -> U256 {
    sqrt_price_x96_from_price(&FixedDecimal::from_integer(price)).unwrap()
}

/// In-memory pool at a fixed price
struct MockPool {
    sqrt_price_x96: U256,
}

#[async_trait]
impl PoolStateProvider for MockPool {
    async fn pool_key(&self, id: B256) -> Result<PoolKey, VenueError> {
        if id != pool_id() {
            return Err(VenueError::UnknownPool(id));
        }
        Ok(pool_key())
    }

    async fn sqrt_price_x96(&self, _pool_id: B256) -> Result<U256, VenueError> {
        Ok(self.sqrt_price_x96)
    }
}

#[async_trait]
impl SwapQuoter for MockPool {
    async fn quote_exact_input(
        &self,
        _pool_key: &PoolKey,
        zero_for_one: bool,
        exact_amount: U256,
    ) -> Result<SwapQuote, VenueError> {
        let after_fee =
            exact_amount * U256::from(1_000_000 - FEE_PIPS) / U256::from(1_000_000u64);
        let price = U256::from(PRICE);
        let paid = -I256::try_from(exact_amount).unwrap();

        Ok(if zero_for_one {
            SwapQuote {
                amount0: paid,
                amount1: I256::try_from(after_fee * price).unwrap(),
            }
        } else {
            SwapQuote {
                amount0: I256::try_from(after_fee / price).unwrap(),
                amount1: paid,
            }
        })
    }
}

/// Quoter whose node is unreachable
struct DownQuoter;

#[async_trait]
impl SwapQuoter for DownQuoter {
    async fn quote_exact_input(
        &self,
        _pool_key: &PoolKey,
        _zero_for_one: bool,
        _exact_amount: U256,
    ) -> Result<SwapQuote, VenueError> {
        Err(VenueError::Rpc("connection refused".to_string()))
    }
}

/// Service manager that records every response it accepts
#[derive(Default)]
struct MockServiceManager {
    responses: Mutex<Vec<BatchSubmission>>,
}

impl MockServiceManager {
    fn responses(&self) -> Vec<BatchSubmission> {
        self.responses.lock().unwrap().clone()
    }
}

#[async_trait]
impl SettlementSubmitter for MockServiceManager {
    async fn message_hash(
        &self,
        pool_id: B256,
        transfers: &[TransferBalance],
        swaps: &[SwapBalance],
    ) -> Result<B256, VenueError> {
        let mut preimage = pool_id.to_vec();
        for transfer in transfers {
            preimage.extend_from_slice(&transfer.amount.to_be_bytes::<32>());
            preimage.extend_from_slice(transfer.currency.as_slice());
            preimage.extend_from_slice(transfer.recipient.as_slice());
        }
        preimage.push(swaps.len() as u8);
        Ok(keccak256(preimage))
    }

    async fn respond_to_batch(&self, submission: BatchSubmission) -> Result<TxReceipt, VenueError> {
        let tx_hash = keccak256(&submission.signature);
        self.responses.lock().unwrap().push(submission);
        Ok(TxReceipt { tx_hash })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════

struct TestOperator {
    manager: Arc<BatchWindowManager>,
    service_manager: Arc<MockServiceManager>,
    signer: Arc<LocalSigner>,
    metrics: Arc<MetricsCollector>,
}

fn operator_with(quoter: Arc<dyn SwapQuoter>, config: ManagerConfig) -> TestOperator {
    let pool = Arc::new(MockPool {
        sqrt_price_x96: sqrt_x96(PRICE),
    });
    let service_manager = Arc::new(MockServiceManager::default());
    let signer = Arc::new(
        LocalSigner::from_hex("ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80")
            .unwrap(),
    );
    let metrics = Arc::new(MetricsCollector::new());

    let manager = Arc::new(BatchWindowManager::new(
        Collaborators {
            pool_state: pool,
            quoter,
            submitter: service_manager.clone(),
            signer: signer.clone(),
        },
        config,
        metrics.clone(),
    ));

    TestOperator {
        manager,
        service_manager,
        signer,
        metrics,
    }
}

fn operator() -> TestOperator {
    let quoter = Arc::new(MockPool {
        sqrt_price_x96: sqrt_x96(PRICE),
    });
    operator_with(quoter, ManagerConfig::default())
}

fn task(task_id: TaskId, zero_for_one: bool, amount: U256, limit_price: u64) -> RawTask {
    RawTask {
        task_id,
        zero_for_one,
        amount_specified: -I256::try_from(amount).unwrap(),
        sqrt_price_limit_x96: sqrt_x96(limit_price),
        sender: Address::repeat_byte(0xa0 + task_id as u8),
        pool_id: pool_id(),
        task_created_block: 100,
    }
}

/// Seller of 1 token0 and buyer with 2500 token1, both limits around spot
fn crossing_pair() -> (RawTask, RawTask) {
    (
        task(1, true, one(), PRICE - 5),
        task(2, false, one() * U256::from(PRICE), PRICE + 5),
    )
}

async fn run_events(manager: &Arc<BatchWindowManager>, events: Vec<ChainEvent>) {
    let (tx, rx) = mpsc::channel(events.len().max(1));
    for event in events {
        tx.send(event).await.unwrap();
    }
    drop(tx);
    manager.clone().run(rx).await.unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════
// END-TO-END TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_sqrt_price_helper_round_trips() {
    let price = price_from_sqrt_x96(sqrt_x96(PRICE));
    assert_eq!(price, FixedDecimal::from_integer(PRICE));
}

#[tokio::test]
async fn test_crossing_pair_is_netted_and_submitted() {
    let op = operator();
    let (seller, buyer) = crossing_pair();

    run_events(
        &op.manager,
        vec![
            ChainEvent::NewBlock(100),
            ChainEvent::TaskCreated(seller.clone()),
            ChainEvent::TaskCreated(buyer.clone()),
            ChainEvent::NewBlock(110),
        ],
    )
    .await;

    let responses = op.service_manager.responses();
    assert_eq!(responses.len(), 1);
    let response = &responses[0];
    assert_eq!(response.task_ids, vec![1, 2]);
    assert!(response.swaps.is_empty());

    // Each side receives the other's full input at spot, beating the pool quote
    let key = pool_key();
    let seller_paid = response
        .transfers
        .iter()
        .find(|t| t.recipient == seller.sender)
        .unwrap();
    assert_eq!(seller_paid.currency, key.currency1);
    assert_eq!(seller_paid.amount, one() * U256::from(PRICE));

    let buyer_paid = response
        .transfers
        .iter()
        .find(|t| t.recipient == buyer.sender)
        .unwrap();
    assert_eq!(buyer_paid.currency, key.currency0);
    assert_eq!(buyer_paid.amount, one());

    match op.manager.status(BatchId(100)).await {
        Some(BatchStatus::Settled { tx_hashes }) => {
            assert_eq!(tx_hashes, vec![keccak256(&response.signature)]);
        }
        other => panic!("expected settled batch, got {other:?}"),
    }
}

#[tokio::test]
async fn test_report_carries_analysis() {
    let op = operator();
    let (seller, buyer) = crossing_pair();

    op.manager.handle_block(100).await;
    op.manager.handle_task(seller).await.unwrap();
    op.manager.handle_task(buyer).await.unwrap();
    let closed = op.manager.handle_block(110).await.unwrap();

    let report = op.manager.process_batch(closed).await.unwrap();
    assert_eq!(report.plans.len(), 1);

    let analysis = &report.plans[0].settlement.analysis;
    assert_eq!(analysis.len(), 2);
    assert!(analysis[&1].contains("2500"));
    assert!(analysis[&1].contains("7.5 tokens more"));
    assert!(analysis[&2].contains("0.003 tokens more"));
    assert_eq!(report.stats.partitions_generated, 2);
}

#[tokio::test]
async fn test_empty_batch_reported_empty() {
    let op = operator();

    run_events(
        &op.manager,
        vec![ChainEvent::NewBlock(100), ChainEvent::NewBlock(110)],
    )
    .await;

    assert_eq!(op.manager.status(BatchId(100)).await, Some(BatchStatus::Empty));
    assert!(op.service_manager.responses().is_empty());
}

#[tokio::test]
async fn test_quote_failure_aborts_batch() {
    let op = operator_with(Arc::new(DownQuoter), ManagerConfig::default());
    let (seller, buyer) = crossing_pair();

    op.manager.handle_block(100).await;
    op.manager.handle_task(seller).await.unwrap();
    op.manager.handle_task(buyer).await.unwrap();
    let closed = op.manager.handle_block(110).await.unwrap();

    let err = op.manager.process_batch(closed).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::QuoteFailed { .. }));
    assert!(err.to_string().contains("connection refused"));

    assert!(matches!(
        op.manager.status(BatchId(100)).await,
        Some(BatchStatus::Failed { .. })
    ));
    assert!(op.service_manager.responses().is_empty());
}

#[tokio::test]
async fn test_tasks_after_rollover_join_next_batch() {
    let op = operator();
    let (seller, buyer) = crossing_pair();
    let late = task(3, true, one(), PRICE - 5);

    run_events(
        &op.manager,
        vec![
            ChainEvent::NewBlock(100),
            ChainEvent::TaskCreated(seller),
            ChainEvent::NewBlock(110),
            ChainEvent::TaskCreated(buyer),
            ChainEvent::TaskCreated(late),
        ],
    )
    .await;

    // The first batch only had the seller, so it went through the pool
    let responses = op.service_manager.responses();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].task_ids, vec![1]);
    assert_eq!(responses[0].swaps.len(), 1);

    assert_eq!(op.manager.current_batch().await, Some(BatchId(110)));
    assert_eq!(op.manager.open_task_ids().await, vec![2, 3]);
}

#[tokio::test]
async fn test_redelivered_task_counted_once() {
    let op = operator();
    let (seller, buyer) = crossing_pair();

    run_events(
        &op.manager,
        vec![
            ChainEvent::NewBlock(100),
            ChainEvent::TaskCreated(seller.clone()),
            ChainEvent::TaskCreated(seller),
            ChainEvent::TaskCreated(buyer),
            ChainEvent::NewBlock(110),
        ],
    )
    .await;

    let responses = op.service_manager.responses();
    assert_eq!(responses[0].task_ids, vec![1, 2]);
    assert_eq!(responses[0].tasks.len(), 2);
}

#[tokio::test]
async fn test_unknown_pool_does_not_stop_operator() {
    let op = operator();
    let mut stray = task(9, true, one(), PRICE);
    stray.pool_id = B256::repeat_byte(0x99);
    let (seller, buyer) = crossing_pair();

    run_events(
        &op.manager,
        vec![
            ChainEvent::NewBlock(100),
            ChainEvent::TaskCreated(stray),
            ChainEvent::TaskCreated(seller),
            ChainEvent::TaskCreated(buyer),
            ChainEvent::NewBlock(110),
        ],
    )
    .await;

    assert_eq!(op.service_manager.responses()[0].task_ids, vec![1, 2]);
}

#[tokio::test]
async fn test_submission_signed_by_operator() {
    let op = operator();
    let (seller, buyer) = crossing_pair();

    run_events(
        &op.manager,
        vec![
            ChainEvent::NewBlock(100),
            ChainEvent::TaskCreated(seller),
            ChainEvent::TaskCreated(buyer),
            ChainEvent::NewBlock(110),
        ],
    )
    .await;

    let response = &op.service_manager.responses()[0];
    let hash = op
        .service_manager
        .message_hash(response.pool_id, &response.transfers, &response.swaps)
        .await
        .unwrap();
    let expected = op.signer.sign_hash(hash).await.unwrap();
    assert_eq!(response.signature, expected);
    assert_eq!(
        op.signer.address(),
        "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
            .parse::<Address>()
            .unwrap()
    );
}

#[tokio::test]
async fn test_manager_from_shipped_config() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/local.toml");
    let config = ConfigLoader::from_file(&path).unwrap();
    validate_config(&config).unwrap();

    let pool = Arc::new(MockPool {
        sqrt_price_x96: sqrt_x96(PRICE),
    });
    let manager = BatchWindowManager::from_config(
        &config,
        Collaborators {
            pool_state: pool.clone(),
            quoter: pool,
            submitter: Arc::new(MockServiceManager::default()),
            signer: Arc::new(LocalSigner::from_hex(&format!("{:064x}", 7)).unwrap()),
        },
        Arc::new(MetricsCollector::new()),
    );

    assert_eq!(
        manager.config().max_blocks_per_batch,
        config.batching.max_blocks_per_batch
    );
    assert_eq!(
        manager.config().max_tasks_per_batch,
        config.batching.max_tasks_per_batch
    );
}

#[tokio::test]
async fn test_metrics_exported_after_run() {
    let op = operator();
    let (seller, buyer) = crossing_pair();

    run_events(
        &op.manager,
        vec![
            ChainEvent::NewBlock(100),
            ChainEvent::TaskCreated(seller),
            ChainEvent::TaskCreated(buyer),
            ChainEvent::NewBlock(110),
        ],
    )
    .await;

    let exported = op.metrics.export_metrics().unwrap();
    assert!(exported.contains("cow_operator_tasks_received_total"));
    assert!(exported.contains("cow_operator_settlements_submitted_total"));
    assert!(exported.contains("cow_operator_partitions_evaluated_total"));
}
