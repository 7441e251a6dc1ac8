use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use alloy_primitives::B256;
use cow_operator_config::{AppConfig, BatchingConfig};
use cow_operator_matching_engine::{MatchingEngine, MatchingError, SolveStats};
use cow_operator_metrics::{BatchSpan, ErrorContext, MetricsCollector};
use cow_operator_settlement::{compute_settlement, SettlementError};
use cow_operator_types::{BatchId, BatchStatus, RawTask, Settlement, Task, TaskId};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{error, info, warn, Instrument};

use crate::enrichment::enrich_quotes;
use crate::venue::{
    BatchSubmission, ChainEvent, OperatorSigner, PoolStateProvider, SettlementSubmitter,
    SwapQuoter, TxReceipt,
};
use crate::window::{BatchWindow, BlockOutcome, ClosedBatch, PushOutcome};

/// Batch window and pipeline limits
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Blocks a batch stays open
    pub max_blocks_per_batch: u64,

    /// Largest slice handed to the matching engine at once
    pub max_tasks_per_batch: usize,

    /// Batch statuses kept in memory
    pub status_history: usize,

    /// Accepted task ids remembered for redelivery checks
    pub seen_task_capacity: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self::from(&BatchingConfig::default())
    }
}

impl From<&BatchingConfig> for ManagerConfig {
    fn from(batching: &BatchingConfig) -> Self {
        Self {
            max_blocks_per_batch: batching.max_blocks_per_batch,
            max_tasks_per_batch: batching.max_tasks_per_batch,
            status_history: batching.status_history,
            seen_task_capacity: batching.seen_task_capacity,
        }
    }
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("quote failed for task {task_id}: {reason}")]
    QuoteFailed { task_id: TaskId, reason: String },

    #[error("task {task_id} is not an exact-input swap")]
    NotExactInput { task_id: TaskId },

    #[error("pool state unavailable for {pool_id}: {reason}")]
    PoolState { pool_id: B256, reason: String },

    #[error("matching failed: {0}")]
    Matching(#[from] MatchingError),

    #[error("settlement failed: {0}")]
    Settlement(#[from] SettlementError),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("submission failed: {0}")]
    Submission(String),

    #[error("batch worker stopped: {0}")]
    WorkerStopped(String),
}

/// External services the manager drives
#[derive(Clone)]
pub struct Collaborators {
    pub pool_state: Arc<dyn PoolStateProvider>,
    pub quoter: Arc<dyn SwapQuoter>,
    pub submitter: Arc<dyn SettlementSubmitter>,
    pub signer: Arc<dyn OperatorSigner>,
}

/// One pool slice whose settlement was computed
#[derive(Clone, Debug, Serialize)]
pub struct SettlementPlan {
    pub pool_id: B256,
    pub tasks: Vec<Task>,
    pub settlement: Settlement,
}

/// Outcome of processing one closed batch
#[derive(Clone, Debug, Serialize)]
pub struct BatchReport {
    pub batch_id: BatchId,
    pub status: BatchStatus,
    pub stats: SolveStats,
    pub plans: Vec<SettlementPlan>,
    pub receipts: Vec<TxReceipt>,
}

impl BatchReport {
    fn without_plans(batch_id: BatchId, status: BatchStatus, stats: SolveStats) -> Self {
        Self {
            batch_id,
            status,
            stats,
            plans: Vec::new(),
            receipts: Vec::new(),
        }
    }
}

/// Groups incoming tasks into block-height batches and drives each closed
/// batch through quote, solve, settle and submit.
pub struct BatchWindowManager {
    collaborators: Collaborators,
    engine: MatchingEngine,
    config: ManagerConfig,
    window: Mutex<BatchWindow>,
    statuses: RwLock<BTreeMap<BatchId, BatchStatus>>,
    metrics: Arc<MetricsCollector>,
}

impl BatchWindowManager {
    pub fn new(
        collaborators: Collaborators,
        config: ManagerConfig,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            collaborators,
            engine: MatchingEngine::with_max_tasks(config.max_tasks_per_batch.max(1)),
            window: Mutex::new(BatchWindow::new(
                config.max_blocks_per_batch,
                config.seen_task_capacity,
            )),
            statuses: RwLock::new(BTreeMap::new()),
            config,
            metrics,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        collaborators: Collaborators,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self::new(collaborators, ManagerConfig::from(&config.batching), metrics)
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EVENT PATH
    // ═══════════════════════════════════════════════════════════════════════════

    /// Apply one chain event, returning a batch that closed because of it
    pub async fn handle_event(
        &self,
        event: ChainEvent,
    ) -> Result<Option<ClosedBatch>, OrchestratorError> {
        match event {
            ChainEvent::TaskCreated(raw) => {
                self.handle_task(raw).await?;
                Ok(None)
            }
            ChainEvent::NewBlock(height) => Ok(self.handle_block(height).await),
        }
    }

    /// Resolve the task's pool and append it to the open batch
    pub async fn handle_task(&self, raw: RawTask) -> Result<PushOutcome, OrchestratorError> {
        let pool_id = raw.pool_id;
        let task_id = raw.task_id;
        let pool_key = self
            .collaborators
            .pool_state
            .pool_key(pool_id)
            .await
            .map_err(|e| OrchestratorError::PoolState {
                pool_id,
                reason: e.to_string(),
            })?;

        let outcome = self
            .window
            .lock()
            .await
            .push_task(Task::from_raw(raw, pool_key));

        match outcome {
            PushOutcome::Added(batch_id) => {
                self.metrics.record_task_received();
                info!(batch_id = %batch_id, task_id, pool_id = %pool_id, "Task added to batch");
            }
            PushOutcome::OpenedWith(batch_id) => {
                self.set_status(batch_id, BatchStatus::Open).await;
                self.metrics.record_batch_opened();
                self.metrics.record_task_received();
                info!(batch_id = %batch_id, task_id, pool_id = %pool_id, "Batch opened by task");
            }
            PushOutcome::Duplicate(batch_id) => {
                self.metrics.record_duplicate_task();
                warn!(batch_id = %batch_id, task_id, "Ignoring duplicate task");
            }
        }

        Ok(outcome)
    }

    /// Advance the window to `height`, closing the open batch when it is due
    pub async fn handle_block(&self, height: u64) -> Option<ClosedBatch> {
        let outcome = self.window.lock().await.on_block(height);

        match outcome {
            BlockOutcome::Opened(batch_id) => {
                self.set_status(batch_id, BatchStatus::Open).await;
                self.metrics.record_batch_opened();
                info!(batch_id = %batch_id, "Batch opened");
                None
            }
            BlockOutcome::Rolled { closed, opened } => {
                let closing = BatchStatus::Closing {
                    task_count: closed.tasks.len(),
                };
                self.metrics.record_batch_status(&closing);
                self.set_status(closed.batch_id, closing).await;
                self.set_status(opened, BatchStatus::Open).await;
                self.metrics.record_batch_opened();
                info!(
                    closed = %closed.batch_id,
                    opened = %opened,
                    height,
                    task_count = closed.tasks.len(),
                    "Batch closed"
                );
                Some(closed)
            }
            BlockOutcome::Unchanged => None,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // BATCH PIPELINE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Take a closed batch to a terminal status.
    ///
    /// The terminal status is recorded before returning, including on error.
    /// A failure after some slices were submitted records `PartiallySettled`
    /// with their transaction hashes.
    pub async fn process_batch(
        &self,
        closed: ClosedBatch,
    ) -> Result<BatchReport, OrchestratorError> {
        let span = BatchSpan::new(closed.batch_id, closed.tasks.len()).span();
        self.process_batch_inner(closed).instrument(span).await
    }

    async fn process_batch_inner(
        &self,
        closed: ClosedBatch,
    ) -> Result<BatchReport, OrchestratorError> {
        let started = Instant::now();
        let batch_id = closed.batch_id;

        if closed.tasks.is_empty() {
            info!("Batch closed with no tasks");
            self.finish(batch_id, BatchStatus::Empty, started).await;
            return Ok(BatchReport::without_plans(
                batch_id,
                BatchStatus::Empty,
                SolveStats::default(),
            ));
        }

        let task_count = closed.tasks.len();
        let (plans, stats) = match self.plan(batch_id, closed.tasks).await {
            Ok(planned) => planned,
            Err(e) => return Err(self.fail(batch_id, e, &[], started).await),
        };

        if plans.is_empty() {
            warn!(task_count, "No feasible settlement for batch");
            let status = BatchStatus::Unmatched { task_count };
            self.finish(batch_id, status.clone(), started).await;
            return Ok(BatchReport::without_plans(batch_id, status, stats));
        }

        let mut receipts = Vec::with_capacity(plans.len());
        for plan in &plans {
            match self.submit(batch_id, plan).await {
                Ok(receipt) => receipts.push(receipt),
                Err(e) => return Err(self.fail(batch_id, e, &receipts, started).await),
            }
        }

        let status = BatchStatus::Settled {
            tx_hashes: receipts.iter().map(|r| r.tx_hash).collect(),
        };
        info!(
            task_count,
            submissions = receipts.len(),
            partitions = stats.partitions_generated,
            "Batch settled"
        );
        self.finish(batch_id, status.clone(), started).await;

        Ok(BatchReport {
            batch_id,
            status,
            stats,
            plans,
            receipts,
        })
    }

    /// Quote every task and compute the settlement of every pool slice
    async fn plan(
        &self,
        batch_id: BatchId,
        tasks: Vec<Task>,
    ) -> Result<(Vec<SettlementPlan>, SolveStats), OrchestratorError> {
        let tasks = enrich_quotes(self.collaborators.quoter.as_ref(), tasks)
            .await
            .inspect_err(|_| self.metrics.record_quote_failure())
            .with_batch_id(batch_id, "quote")?;

        let mut stats = SolveStats::default();
        let mut plans = Vec::new();
        for (pool_id, pool_tasks) in group_by_pool(tasks) {
            for slice in pool_tasks.chunks(self.engine.max_tasks()) {
                let plan = self
                    .plan_slice(batch_id, pool_id, slice, &mut stats)
                    .await?;
                plans.extend(plan);
            }
        }
        Ok((plans, stats))
    }

    /// Record the terminal status of a batch that stopped on `error`
    async fn fail(
        &self,
        batch_id: BatchId,
        error: OrchestratorError,
        submitted: &[TxReceipt],
        started: Instant,
    ) -> OrchestratorError {
        let reason = error.to_string();
        let status = if submitted.is_empty() {
            BatchStatus::Failed { reason }
        } else {
            warn!(
                submitted = submitted.len(),
                "Batch stopped after some slices were submitted"
            );
            BatchStatus::PartiallySettled {
                tx_hashes: submitted.iter().map(|r| r.tx_hash).collect(),
                reason,
            }
        };
        self.finish(batch_id, status, started).await;
        error
    }

    /// Solve one pool slice and compute its settlement
    async fn plan_slice(
        &self,
        batch_id: BatchId,
        pool_id: B256,
        slice: &[Task],
        stats: &mut SolveStats,
    ) -> Result<Option<SettlementPlan>, OrchestratorError> {
        let sqrt_price_x96 = self
            .collaborators
            .pool_state
            .sqrt_price_x96(pool_id)
            .await
            .map_err(|e| OrchestratorError::PoolState {
                pool_id,
                reason: e.to_string(),
            })
            .with_batch_id(batch_id, "pool_state")?;

        let solution = self
            .engine
            .solve(slice, sqrt_price_x96)
            .with_batch_id(batch_id, "matching")?;

        let slice_stats = solution.stats;
        self.metrics.record_partition_search(
            slice_stats.partitions_generated,
            slice_stats.partitions_filtered,
            slice_stats.partitions_evaluated,
            slice_stats.feasible_results,
        );
        accumulate(stats, &slice_stats);

        let Some(best) = solution.best else {
            warn!(pool_id = %pool_id, tasks = slice.len(), "No feasible partition for slice");
            return Ok(None);
        };

        let settlement = compute_settlement(&best).with_batch_id(batch_id, "settlement")?;
        info!(
            pool_id = %pool_id,
            tasks = best.task_count(),
            netted = best.netted_count(),
            transfers = settlement.transfers.len(),
            swaps = settlement.swaps.len(),
            "Slice settled"
        );

        Ok(Some(SettlementPlan {
            pool_id,
            tasks: slice.to_vec(),
            settlement,
        }))
    }

    /// Hash, sign and send one settlement
    async fn submit(
        &self,
        batch_id: BatchId,
        plan: &SettlementPlan,
    ) -> Result<TxReceipt, OrchestratorError> {
        let settlement = &plan.settlement;
        let submitter = &self.collaborators.submitter;

        let hash = submitter
            .message_hash(plan.pool_id, &settlement.transfers, &settlement.swaps)
            .await
            .map_err(|e| OrchestratorError::Submission(e.to_string()))
            .with_batch_id(batch_id, "submission")?;

        let signature = self
            .collaborators
            .signer
            .sign_hash(hash)
            .await
            .map_err(|e| OrchestratorError::Signing(e.to_string()))
            .with_batch_id(batch_id, "signing")?;

        let receipt = submitter
            .respond_to_batch(BatchSubmission {
                pool_id: plan.pool_id,
                tasks: plan.tasks.clone(),
                task_ids: plan.tasks.iter().map(|t| t.task_id).collect(),
                transfers: settlement.transfers.clone(),
                swaps: settlement.swaps.clone(),
                signature,
            })
            .await
            .map_err(|e| OrchestratorError::Submission(e.to_string()))
            .with_batch_id(batch_id, "submission")?;

        self.metrics
            .record_settlement_submitted(settlement.transfers.len(), settlement.swaps.len());
        info!(
            pool_id = %plan.pool_id,
            tx_hash = %receipt.tx_hash,
            signer = %self.collaborators.signer.address(),
            "Batch response submitted"
        );
        Ok(receipt)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // RUN LOOP
    // ═══════════════════════════════════════════════════════════════════════════

    /// Consume chain events until the channel closes.
    ///
    /// Closed batches go to a single worker and are processed one at a time in
    /// close order while events keep flowing. Returns once the worker has
    /// drained every closed batch.
    pub async fn run(
        self: Arc<Self>,
        mut events: mpsc::Receiver<ChainEvent>,
    ) -> Result<(), OrchestratorError> {
        let (closed_tx, mut closed_rx) = mpsc::unbounded_channel::<ClosedBatch>();

        let worker = {
            let manager = Arc::clone(&self);
            tokio::spawn(async move {
                while let Some(closed) = closed_rx.recv().await {
                    // Failures are already logged and recorded as batch status
                    let _ = manager.process_batch(closed).await;
                }
            })
        };

        while let Some(event) = events.recv().await {
            match self.handle_event(event).await {
                Ok(Some(closed)) => {
                    if closed_tx.send(closed).is_err() {
                        error!(error_type = "worker", "Batch worker is gone");
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    error!(error_type = "event", error = %e, "Failed to handle chain event");
                }
            }
        }

        drop(closed_tx);
        worker
            .await
            .map_err(|e| OrchestratorError::WorkerStopped(e.to_string()))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // STATUS
    // ═══════════════════════════════════════════════════════════════════════════

    pub async fn status(&self, batch_id: BatchId) -> Option<BatchStatus> {
        self.statuses.read().await.get(&batch_id).cloned()
    }

    /// Known batches, oldest first
    pub async fn statuses(&self) -> Vec<(BatchId, BatchStatus)> {
        self.statuses
            .read()
            .await
            .iter()
            .map(|(id, status)| (*id, status.clone()))
            .collect()
    }

    pub async fn current_batch(&self) -> Option<BatchId> {
        self.window.lock().await.current()
    }

    pub async fn open_task_ids(&self) -> Vec<TaskId> {
        self.window
            .lock()
            .await
            .open_tasks()
            .iter()
            .map(|t| t.task_id)
            .collect()
    }

    async fn finish(&self, batch_id: BatchId, status: BatchStatus, started: Instant) {
        self.metrics.record_batch_status(&status);
        self.metrics.record_batch_duration(started.elapsed());
        self.set_status(batch_id, status).await;
    }

    async fn set_status(&self, batch_id: BatchId, status: BatchStatus) {
        let mut statuses = self.statuses.write().await;
        statuses.insert(batch_id, status);
        while statuses.len() > self.config.status_history.max(1) {
            statuses.pop_first();
        }
    }
}

/// Split tasks by pool, pools in order of first appearance, tasks in arrival order
fn group_by_pool(tasks: Vec<Task>) -> Vec<(B256, Vec<Task>)> {
    let mut groups: Vec<(B256, Vec<Task>)> = Vec::new();
    for task in tasks {
        match groups.iter_mut().find(|(pool_id, _)| *pool_id == task.pool_id) {
            Some((_, group)) => group.push(task),
            None => groups.push((task.pool_id, vec![task])),
        }
    }
    groups
}

fn accumulate(total: &mut SolveStats, slice: &SolveStats) {
    total.partitions_generated += slice.partitions_generated;
    total.partitions_filtered += slice.partitions_filtered;
    total.partitions_evaluated += slice.partitions_evaluated;
    total.feasible_results += slice.feasible_results;
}
