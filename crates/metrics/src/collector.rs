use std::time::Duration;

use cow_operator_types::BatchStatus;
use prometheus::{Encoder, TextEncoder};

use crate::metrics::*;

/// Metrics collector for the CoW matching operator
#[derive(Debug, Default)]
pub struct MetricsCollector;

impl MetricsCollector {
    pub fn new() -> Self {
        Self
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TASK METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Record a task accepted into the open batch
    pub fn record_task_received(&self) {
        TASKS_RECEIVED.inc();
        OPEN_BATCH_TASKS.inc();
    }

    /// Record a redelivered task that was ignored
    pub fn record_duplicate_task(&self) {
        TASKS_DUPLICATE.inc();
    }

    pub fn record_quote_failure(&self) {
        QUOTE_FAILURES.inc();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // BATCH METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Record a new batch window, which always opens empty
    pub fn record_batch_opened(&self) {
        BATCHES_OPENED.inc();
        OPEN_BATCH_TASKS.set(0);
    }

    /// Record a batch status transition
    pub fn record_batch_status(&self, status: &BatchStatus) {
        BATCH_STATUS_COUNT
            .with_label_values(&[status.as_str()])
            .inc();
    }

    /// Record how long a closed batch took to reach a terminal status
    pub fn record_batch_duration(&self, duration: Duration) {
        BATCH_PROCESSING_DURATION.observe(duration.as_millis() as f64);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MATCHING METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Record the counters of one partition search
    pub fn record_partition_search(
        &self,
        generated: usize,
        filtered: usize,
        evaluated: usize,
        feasible: usize,
    ) {
        PARTITIONS_GENERATED.inc_by(generated as u64);
        PARTITIONS_FILTERED.inc_by(filtered as u64);
        PARTITIONS_EVALUATED.inc_by(evaluated as u64);
        PARTITIONS_FEASIBLE.inc_by(feasible as u64);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SETTLEMENT METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Record a submitted batch response
    pub fn record_settlement_submitted(&self, transfers: usize, swaps: usize) {
        SETTLEMENTS_SUBMITTED.inc();
        SETTLEMENT_TRANSFERS.inc_by(transfers as u64);
        SETTLEMENT_SWAPS.inc_by(swaps as u64);
    }

    pub fn record_error_event(&self, error_type: &str) {
        ERROR_EVENTS.with_label_values(&[error_type]).inc();
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EXPORT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Export metrics in Prometheus text format
    pub fn export_metrics(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = prometheus::gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| MetricsError::EncodingError(e.to_string()))?;

        String::from_utf8(buffer).map_err(|e| MetricsError::EncodingError(e.to_string()))
    }
}

/// Metrics error types
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("encoding error: {0}")]
    EncodingError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new();
        assert!(collector.export_metrics().is_ok());
    }

    #[test]
    fn test_record_task_metrics() {
        let collector = MetricsCollector::new();

        collector.record_task_received();
        collector.record_duplicate_task();
        collector.record_quote_failure();

        let metrics = collector.export_metrics().unwrap();
        assert!(metrics.contains("cow_operator_tasks_received_total"));
        assert!(metrics.contains("cow_operator_tasks_duplicate_total"));
        assert!(metrics.contains("cow_operator_quote_failures_total"));
    }

    #[test]
    fn test_record_batch_metrics() {
        let collector = MetricsCollector::new();

        collector.record_batch_opened();
        collector.record_batch_status(&BatchStatus::Empty);
        collector.record_batch_status(&BatchStatus::Failed {
            reason: "quote failed".to_string(),
        });
        collector.record_batch_duration(Duration::from_millis(120));

        let metrics = collector.export_metrics().unwrap();
        assert!(metrics.contains("cow_operator_batches_opened_total"));
        assert!(metrics.contains("cow_operator_batch_status_total"));
        assert!(metrics.contains("failed"));
        assert!(metrics.contains("cow_operator_batch_processing_duration_ms"));
    }

    #[test]
    fn test_record_matching_metrics() {
        let collector = MetricsCollector::new();
        let before = PARTITIONS_GENERATED.get();

        collector.record_partition_search(15, 4, 11, 3);

        assert!(PARTITIONS_GENERATED.get() >= before + 15);
        let metrics = collector.export_metrics().unwrap();
        assert!(metrics.contains("cow_operator_partitions_feasible_total"));
    }

    #[test]
    fn test_record_settlement_metrics() {
        let collector = MetricsCollector::new();

        collector.record_settlement_submitted(2, 1);

        let metrics = collector.export_metrics().unwrap();
        assert!(metrics.contains("cow_operator_settlements_submitted_total"));
        assert!(metrics.contains("cow_operator_settlement_transfers_total"));
        assert!(metrics.contains("cow_operator_settlement_swaps_total"));
    }
}
