//! # Signing Telemetry
//!
//! Logging and metrics for the record-signing pipeline.
//!
//! ## Components
//!
//! - **Logs**: `tracing-subscriber` registry, env filter, text or JSON lines
//! - **Metrics**: Prometheus counters and histograms, exposed by [`gather`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use signing_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let _guard = init_telemetry(&TelemetryConfig::from_env())?;
//!     // pipeline runs here
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SG_SERVICE_NAME` | `record-signing` | Service name in logs |
//! | `SG_LOG_LEVEL` / `RUST_LOG` | `info` | Log filter |
//! | `SG_JSON_LOGS` | `false` | JSON log lines |
//! | `SG_CONSOLE_OUTPUT` | `true` | Write logs to stdout |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    content_type, gather, register_metrics, MetricsHandle, BATCHES_CLAIMED, BATCHES_SIGNED,
    KEY_RELEASE_FAILURES, LEASE_ATTEMPTS, LEASE_WAIT, MESSAGES_ABANDONED, MESSAGES_ACKNOWLEDGED,
    MESSAGES_DEAD_LETTERED, RECORDS_CLAIMED, SIGNATURES_RECORDED,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Install logging and register metrics.
///
/// Hold the returned guard for the lifetime of the process.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics = register_metrics()?;
    init_logging(config)?;

    Ok(TelemetryGuard {
        service_name: config.service_name.clone(),
        _metrics: metrics,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service_name: String,
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry");
    }
}
