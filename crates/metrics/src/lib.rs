//! Metrics and monitoring for the CoW matching operator
//!
//! This crate tracks tasks, batch windows, the partition search and settlement
//! submissions, and sets up structured logging.
//!
//! # Features
//!
//! - Prometheus metrics exposition
//! - JSON or plain log output filtered by `RUST_LOG` or the configured level
//! - Batch-scoped spans and error context
//!
//! # Example
//!
//! ```no_run
//! use cow_operator_metrics::{init_tracing, MetricsCollector};
//! use std::sync::Arc;
//!
//! let collector = Arc::new(MetricsCollector::new());
//! init_tracing("info", true, collector.clone()).unwrap();
//!
//! collector.record_task_received();
//! println!("{}", collector.export_metrics().unwrap());
//! ```

pub mod collector;
pub mod metrics;
pub mod tracing;

pub use collector::{MetricsCollector, MetricsError};
pub use self::tracing::{init_tracing, BatchSpan, ErrorContext, TracingError};
