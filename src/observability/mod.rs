//! # Observability
//!
//! - `metrics`: Prometheus metrics collection
//! - [`init_tracing`]: `tracing` subscriber setup for the CLI

pub mod metrics;

// Re-export for convenience
pub use metrics::*;

/// Install the global `tracing` subscriber
///
/// `RUST_LOG` wins when set; otherwise `default_filter` applies. Logs go to
/// stderr so that stdout stays clean for reports.
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
