//! # Metrics
//!
//! Prometheus metrics for sync runs.
//!
//! ## Metrics Exposed
//!
//! - `gateway_sync_runs_total` - Total number of sync runs by mode
//! - `gateway_sync_run_errors_total` - Total number of failed sync runs by mode
//! - `gateway_sync_run_duration_seconds` - Duration of sync runs by mode
//! - `gateway_sync_resource_operations_total` - Resources created, updated or
//!   deleted, by kind and operation

use crate::constants::RUN_DURATION_BUCKETS;
use crate::controller::types::{Operation, SyncMode};
use crate::resource::ResourceKind;
use anyhow::Result;
use prometheus::{Encoder, HistogramVec, IntCounterVec, Registry, TextEncoder};
use std::sync::LazyLock;

pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RUNS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new("gateway_sync_runs_total", "Total number of sync runs"),
        &["mode"],
    )
    .expect("Failed to create RUNS_TOTAL metric - this should never happen")
});

static RUN_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "gateway_sync_run_errors_total",
            "Total number of sync runs that ended in an error",
        ),
        &["mode"],
    )
    .expect("Failed to create RUN_ERRORS_TOTAL metric - this should never happen")
});

static RUN_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "gateway_sync_run_duration_seconds",
            "Duration of sync runs in seconds",
        )
        .buckets(RUN_DURATION_BUCKETS.to_vec()),
        &["mode"],
    )
    .expect("Failed to create RUN_DURATION metric - this should never happen")
});

static RESOURCE_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "gateway_sync_resource_operations_total",
            "Total number of resources written to a target by kind and operation",
        ),
        &["kind", "operation"],
    )
    .expect("Failed to create RESOURCE_OPERATIONS_TOTAL metric - this should never happen")
});

#[allow(
    clippy::missing_errors_doc,
    reason = "Fails only when a metric is registered twice"
)]
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RUNS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RUN_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RUN_DURATION.clone()))?;
    REGISTRY.register(Box::new(RESOURCE_OPERATIONS_TOTAL.clone()))?;

    Ok(())
}

/// Text exposition of the crate registry, for callers serving a scrape endpoint
pub fn encode_text() -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record one finished run
pub fn record_run(mode: SyncMode, duration: f64, succeeded: bool) {
    let mode = mode.as_str();
    RUNS_TOTAL.with_label_values(&[mode]).inc();
    RUN_DURATION.with_label_values(&[mode]).observe(duration);
    if !succeeded {
        RUN_ERRORS_TOTAL.with_label_values(&[mode]).inc();
    }
}

/// Count resources written for one kind and operation
pub fn record_operations(kind: ResourceKind, operation: Operation, count: usize) {
    if count == 0 {
        return;
    }
    RESOURCE_OPERATIONS_TOTAL
        .with_label_values(&[kind.as_str(), operation.as_str()])
        .inc_by(count as u64);
}
