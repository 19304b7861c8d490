//! # Metrics
//!
//! Prometheus metrics for provisioning runs.
//!
//! ## Metrics Exposed
//!
//! - `ou_provisioner_runs_total` - Total number of provisioning runs
//! - `ou_provisioner_run_aborts_total` - Runs aborted by a lost connection
//! - `ou_provisioner_run_duration_seconds` - Duration of provisioning runs
//! - `ou_provisioner_containers_total{outcome}` - Containers by outcome
//!   (`created`, `already_exists`, `failed`)
//! - `ou_provisioner_directory_operations_total{operation}` - Directory calls
//! - `ou_provisioner_directory_operation_duration_seconds{operation}` - Directory call latency
//! - `ou_provisioner_directory_operation_errors_total{operation}` - Failed directory calls
//!
//! The CLI is short-lived, so metrics are written once per run in text
//! exposition format (see [`write_metrics_file`]) for a node_exporter
//! textfile collector to pick up.

use anyhow::{Context, Result};
use prometheus::{Encoder, Histogram, HistogramVec, IntCounter, IntCounterVec, Registry, TextEncoder};
use std::path::Path;
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RUNS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "ou_provisioner_runs_total",
        "Total number of provisioning runs",
    )
    .expect("Failed to create RUNS_TOTAL metric - this should never happen")
});

static RUN_ABORTS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "ou_provisioner_run_aborts_total",
        "Total number of provisioning runs aborted by a lost directory connection",
    )
    .expect("Failed to create RUN_ABORTS_TOTAL metric - this should never happen")
});

static RUN_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "ou_provisioner_run_duration_seconds",
            "Duration of provisioning runs in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create RUN_DURATION metric - this should never happen")
});

static CONTAINERS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "ou_provisioner_containers_total",
            "Total number of containers processed by outcome",
        ),
        &["outcome"],
    )
    .expect("Failed to create CONTAINERS_TOTAL metric - this should never happen")
});

static DIRECTORY_OPERATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "ou_provisioner_directory_operations_total",
            "Total number of directory operations by operation type",
        ),
        &["operation"],
    )
    .expect("Failed to create DIRECTORY_OPERATIONS_TOTAL metric - this should never happen")
});

static DIRECTORY_OPERATION_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "ou_provisioner_directory_operation_duration_seconds",
            "Duration of directory operations in seconds by operation type",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        &["operation"],
    )
    .expect("Failed to create DIRECTORY_OPERATION_DURATION metric - this should never happen")
});

static DIRECTORY_OPERATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "ou_provisioner_directory_operation_errors_total",
            "Total number of failed directory operations by operation type",
        ),
        &["operation"],
    )
    .expect("Failed to create DIRECTORY_OPERATION_ERRORS_TOTAL metric - this should never happen")
});

/// Register all metrics with the crate registry
///
/// Safe to call more than once; later calls are no-ops.
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn register_metrics() -> Result<()> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(RUNS_TOTAL.clone()),
        Box::new(RUN_ABORTS_TOTAL.clone()),
        Box::new(RUN_DURATION.clone()),
        Box::new(CONTAINERS_TOTAL.clone()),
        Box::new(DIRECTORY_OPERATIONS_TOTAL.clone()),
        Box::new(DIRECTORY_OPERATION_DURATION.clone()),
        Box::new(DIRECTORY_OPERATION_ERRORS_TOTAL.clone()),
    ];

    for collector in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e).context("Failed to register metric"),
        }
    }
    Ok(())
}

pub fn increment_runs() {
    RUNS_TOTAL.inc();
}

pub fn increment_run_aborts() {
    RUN_ABORTS_TOTAL.inc();
}

pub fn observe_run_duration(duration: f64) {
    RUN_DURATION.observe(duration);
}

pub fn record_container_outcome(outcome: &str) {
    CONTAINERS_TOTAL.with_label_values(&[outcome]).inc();
}

fn record_directory_operation(operation: &str, duration: f64) {
    DIRECTORY_OPERATIONS_TOTAL
        .with_label_values(&[operation])
        .inc();
    DIRECTORY_OPERATION_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

fn increment_directory_operation_errors(operation: &str) {
    DIRECTORY_OPERATION_ERRORS_TOTAL
        .with_label_values(&[operation])
        .inc();
}

/// Count a finished directory call, and its failure if it failed
///
/// Failed calls are counted in both totals, so errors never exceed calls.
pub fn record_directory_outcome(operation: &str, duration: f64, failed: bool) {
    record_directory_operation(operation, duration);
    if failed {
        increment_directory_operation_errors(operation);
    }
}

/// Render every registered metric in Prometheus text format
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn render_metrics() -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&REGISTRY.gather(), &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics output is not valid UTF-8")
}

/// Write rendered metrics to `path`, replacing it atomically
#[allow(
    clippy::missing_errors_doc,
    reason = "Error documentation is provided in doc comments"
)]
pub fn write_metrics_file(path: &Path) -> Result<()> {
    let rendered = render_metrics()?;
    let tmp = path.with_extension("prom.tmp");
    std::fs::write(&tmp, rendered)
        .with_context(|| format!("Failed to write metrics to {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move metrics into place at {}", path.display()))?;
    Ok(())
}
