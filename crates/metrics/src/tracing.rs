use std::sync::Arc;

use cow_operator_types::BatchId;
use tracing::{field::Visit, Event, Level, Subscriber};
use tracing_subscriber::{
    fmt,
    layer::{Context, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::collector::MetricsCollector;

/// Initialize tracing with metrics integration.
///
/// `RUST_LOG` wins over `log_level` when set. `json` switches the output to
/// one JSON object per line.
pub fn init_tracing(
    log_level: &str,
    json: bool,
    collector: Arc<MetricsCollector>,
) -> Result<(), TracingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| TracingError::InitError(e.to_string()))?;

    let (json_layer, plain_layer) = if json {
        (
            Some(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_level(true)
                    .json(),
            ),
            None,
        )
    } else {
        (None, Some(fmt::layer().with_target(true).with_level(true)))
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(plain_layer)
        .with(MetricsLayer::new(collector))
        .try_init()
        .map_err(|e| TracingError::InitError(e.to_string()))?;

    Ok(())
}

/// Tracing layer that counts error events by their `error_type` field
pub struct MetricsLayer {
    collector: Arc<MetricsCollector>,
}

impl MetricsLayer {
    pub fn new(collector: Arc<MetricsCollector>) -> Self {
        Self { collector }
    }
}

impl<S> Layer<S> for MetricsLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::ERROR {
            return;
        }
        let mut visitor = ErrorTypeVisitor::default();
        event.record(&mut visitor);
        self.collector
            .record_error_event(visitor.error_type.as_deref().unwrap_or("unknown"));
    }
}

/// Visitor to extract the error type from events
#[derive(Default)]
struct ErrorTypeVisitor {
    error_type: Option<String>,
}

impl Visit for ErrorTypeVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "error_type" {
            self.error_type = Some(format!("{value:?}").trim_matches('"').to_string());
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "error_type" {
            self.error_type = Some(value.to_string());
        }
    }
}

/// Span context for one batch as it moves through the pipeline
#[derive(Debug, Clone, Copy)]
pub struct BatchSpan {
    pub batch_id: BatchId,
    pub task_count: usize,
}

impl BatchSpan {
    pub fn new(batch_id: BatchId, task_count: usize) -> Self {
        Self {
            batch_id,
            task_count,
        }
    }

    /// Build the tracing span for this batch
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "batch",
            batch_id = %self.batch_id,
            task_count = self.task_count,
        )
    }
}

/// Error enrichment for adding batch context to errors
pub trait ErrorContext {
    /// Log the error against the batch it happened in
    fn with_batch_id(self, batch_id: BatchId, error_type: &'static str) -> Self;
}

impl<T, E> ErrorContext for Result<T, E>
where
    E: std::fmt::Display,
{
    fn with_batch_id(self, batch_id: BatchId, error_type: &'static str) -> Self {
        self.map_err(|e| {
            tracing::error!(
                batch_id = %batch_id,
                error_type = error_type,
                error = %e,
                "batch processing failed"
            );
            e
        })
    }
}

/// Tracing error types
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("tracing initialization error: {0}")]
    InitError(String),
}
