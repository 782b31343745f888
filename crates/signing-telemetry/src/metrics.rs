//! Prometheus metrics for the signing pipeline.
//!
//! All metrics follow the naming convention: `sg_<stage>_<metric>_<unit>`
//!
//! Metrics live in a crate-local [`REGISTRY`], registered once on first use
//! of [`register_metrics`] or [`gather`].

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Histogram, HistogramOpts, Opts, Registry,
    TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Pipeline metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // ALLOCATOR METRICS
    // =========================================================================

    /// Batches claimed and published
    pub static ref BATCHES_CLAIMED: Counter = Counter::new(
        "sg_allocator_batches_claimed_total",
        "Total number of batches claimed and published as unsigned batches"
    ).expect("metric creation failed");

    /// Records claimed into batches
    pub static ref RECORDS_CLAIMED: Counter = Counter::new(
        "sg_allocator_records_claimed_total",
        "Total number of records stamped with a batch id"
    ).expect("metric creation failed");

    // =========================================================================
    // SIGNER METRICS
    // =========================================================================

    /// Batches signed and published
    pub static ref BATCHES_SIGNED: Counter = Counter::new(
        "sg_signer_batches_signed_total",
        "Total number of signed batches published"
    ).expect("metric creation failed");

    /// Calls made to the key registry while leasing
    pub static ref LEASE_ATTEMPTS: Counter = Counter::new(
        "sg_signer_lease_attempts_total",
        "Total key lease attempts, successful or not"
    ).expect("metric creation failed");

    /// Time from first lease attempt to holding a key
    pub static ref LEASE_WAIT: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "sg_signer_lease_wait_seconds",
            "Time spent waiting for a signing key"
        ).buckets(exponential_buckets(0.001, 2.0, 15).expect("bucket layout"))
    ).expect("metric creation failed");

    /// Keys left leased because release failed after publish
    pub static ref KEY_RELEASE_FAILURES: Counter = Counter::new(
        "sg_signer_key_release_failures_total",
        "Signed batches whose key could not be released"
    ).expect("metric creation failed");

    // =========================================================================
    // RECORD KEEPER METRICS
    // =========================================================================

    /// Signature rows written
    pub static ref SIGNATURES_RECORDED: Counter = Counter::new(
        "sg_keeper_signatures_recorded_total",
        "Total signatures persisted"
    ).expect("metric creation failed");

    // =========================================================================
    // MESSAGE METRICS
    // =========================================================================

    /// Deliveries acknowledged
    pub static ref MESSAGES_ACKNOWLEDGED: CounterVec = CounterVec::new(
        Opts::new("sg_messages_acknowledged_total", "Deliveries acknowledged"),
        &["queue"]
    ).expect("metric creation failed");

    /// Deliveries routed to the dead-letter queue
    pub static ref MESSAGES_DEAD_LETTERED: CounterVec = CounterVec::new(
        Opts::new("sg_messages_dead_lettered_total", "Deliveries rejected to the dead-letter queue"),
        &["queue"]
    ).expect("metric creation failed");

    /// Deliveries left unacknowledged for redelivery
    pub static ref MESSAGES_ABANDONED: CounterVec = CounterVec::new(
        Opts::new("sg_messages_abandoned_total", "Deliveries left unacknowledged for redelivery"),
        &["queue"]
    ).expect("metric creation failed");

    static ref REGISTRATION: Result<(), String> = register_all();
}

/// Proof that the pipeline metrics are registered.
#[derive(Debug, Clone, Copy)]
pub struct MetricsHandle {
    _private: (),
}

fn register_all() -> Result<(), String> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Allocator
        Box::new(BATCHES_CLAIMED.clone()),
        Box::new(RECORDS_CLAIMED.clone()),
        // Signer
        Box::new(BATCHES_SIGNED.clone()),
        Box::new(LEASE_ATTEMPTS.clone()),
        Box::new(LEASE_WAIT.clone()),
        Box::new(KEY_RELEASE_FAILURES.clone()),
        // Keeper
        Box::new(SIGNATURES_RECORDED.clone()),
        // Messages
        Box::new(MESSAGES_ACKNOWLEDGED.clone()),
        Box::new(MESSAGES_DEAD_LETTERED.clone()),
        Box::new(MESSAGES_ABANDONED.clone()),
    ];

    for metric in metrics {
        REGISTRY.register(metric).map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Register all metrics with the pipeline registry. Safe to call repeatedly.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    REGISTRATION
        .clone()
        .map_err(TelemetryError::MetricsInit)?;
    Ok(MetricsHandle { _private: () })
}

/// Encode all metrics in the Prometheus text exposition format.
pub fn gather() -> Result<String, TelemetryError> {
    register_metrics()?;
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Content type of [`gather`]'s output.
pub fn content_type() -> String {
    TextEncoder::new().format_type().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        assert!(register_metrics().is_ok());
        assert!(register_metrics().is_ok());
    }

    #[test]
    fn test_counter_increment() {
        BATCHES_CLAIMED.inc();
        assert!(BATCHES_CLAIMED.get() >= 1.0);
    }

    #[test]
    fn test_gather_exposes_pipeline_metrics() {
        LEASE_WAIT.observe(0.25);
        MESSAGES_DEAD_LETTERED
            .with_label_values(&["signed-batches"])
            .inc();

        let text = gather().unwrap();

        assert!(text.contains("sg_signer_lease_wait_seconds_bucket"));
        assert!(text.contains("sg_messages_dead_lettered_total{queue=\"signed-batches\"}"));
        assert!(text.contains("sg_allocator_records_claimed_total"));
    }
}
