use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

lazy_static! {
    // ═══════════════════════════════════════════════════════════════════════════
    // TASK METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Total number of tasks accepted into a batch
    pub static ref TASKS_RECEIVED: IntCounter = register_int_counter!(
        "cow_operator_tasks_received_total",
        "Total number of tasks accepted into a batch"
    )
    .unwrap();

    /// Redelivered tasks dropped because their id was already in the batch
    pub static ref TASKS_DUPLICATE: IntCounter = register_int_counter!(
        "cow_operator_tasks_duplicate_total",
        "Total number of duplicate task deliveries ignored"
    )
    .unwrap();

    /// Failed quote enrichments
    pub static ref QUOTE_FAILURES: IntCounter = register_int_counter!(
        "cow_operator_quote_failures_total",
        "Total number of failed pool quotes"
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // BATCH METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Total number of batch windows opened
    pub static ref BATCHES_OPENED: IntCounter = register_int_counter!(
        "cow_operator_batches_opened_total",
        "Total number of batch windows opened"
    )
    .unwrap();

    /// Batch counter by status
    pub static ref BATCH_STATUS_COUNT: IntCounterVec = register_int_counter_vec!(
        "cow_operator_batch_status_total",
        "Total batches by status",
        &["status"]
    )
    .unwrap();

    /// Tasks waiting in the open batch
    pub static ref OPEN_BATCH_TASKS: IntGauge = register_int_gauge!(
        "cow_operator_open_batch_tasks",
        "Number of tasks in the currently open batch"
    )
    .unwrap();

    /// Time from batch close to terminal status (in milliseconds)
    pub static ref BATCH_PROCESSING_DURATION: Histogram = register_histogram!(
        "cow_operator_batch_processing_duration_ms",
        "Batch processing duration in milliseconds",
        vec![10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0, 30000.0]
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // MATCHING METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Partitions enumerated by the search
    pub static ref PARTITIONS_GENERATED: IntCounter = register_int_counter!(
        "cow_operator_partitions_generated_total",
        "Total number of partitions enumerated"
    )
    .unwrap();

    /// Partitions rejected by the direction pre-filter
    pub static ref PARTITIONS_FILTERED: IntCounter = register_int_counter!(
        "cow_operator_partitions_filtered_total",
        "Total number of partitions rejected before evaluation"
    )
    .unwrap();

    /// Partitions run through full feasibility evaluation
    pub static ref PARTITIONS_EVALUATED: IntCounter = register_int_counter!(
        "cow_operator_partitions_evaluated_total",
        "Total number of partitions evaluated"
    )
    .unwrap();

    /// Evaluated partitions found feasible
    pub static ref PARTITIONS_FEASIBLE: IntCounter = register_int_counter!(
        "cow_operator_partitions_feasible_total",
        "Total number of feasible partitions"
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // SETTLEMENT METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Batch responses submitted on chain
    pub static ref SETTLEMENTS_SUBMITTED: IntCounter = register_int_counter!(
        "cow_operator_settlements_submitted_total",
        "Total number of batch responses submitted"
    )
    .unwrap();

    /// Direct transfers included in submitted settlements
    pub static ref SETTLEMENT_TRANSFERS: IntCounter = register_int_counter!(
        "cow_operator_settlement_transfers_total",
        "Total number of direct transfers submitted"
    )
    .unwrap();

    /// Residual pool swaps included in submitted settlements
    pub static ref SETTLEMENT_SWAPS: IntCounter = register_int_counter!(
        "cow_operator_settlement_swaps_total",
        "Total number of residual pool swaps submitted"
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // LOG METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Error-level log events by error type
    pub static ref ERROR_EVENTS: IntCounterVec = register_int_counter_vec!(
        "cow_operator_error_events_total",
        "Total error log events by error type",
        &["error_type"]
    )
    .unwrap();
}
