//! # Stage Handlers
//!
//! Binds each stage's bus handler to the consumer loop and records its
//! reports as pipeline metrics.

use crate::handlers::consumer::StageHandler;
use async_trait::async_trait;
use rs_02_batch_allocator::{BatchAllocatorApi, ControlMessageHandler};
use rs_04_signer::{SignerApi, UnsignedBatchHandler};
use rs_05_record_keeper::{RecordKeeperApi, SignedBatchHandler};
use shared_bus::{Delivery, Disposition};
use signing_telemetry::{
    BATCHES_CLAIMED, BATCHES_SIGNED, KEY_RELEASE_FAILURES, LEASE_ATTEMPTS, LEASE_WAIT,
    RECORDS_CLAIMED, SIGNATURES_RECORDED,
};
use tokio_util::sync::CancellationToken;

#[async_trait]
impl<A: BatchAllocatorApi> StageHandler for ControlMessageHandler<A> {
    fn stage(&self) -> &'static str {
        "allocator"
    }

    async fn process(&self, delivery: &Delivery, cancel: &CancellationToken) -> Disposition {
        let (disposition, report) = self.handle(delivery, cancel).await;
        if let Some(report) = report {
            BATCHES_CLAIMED.inc_by(report.batches() as f64);
            RECORDS_CLAIMED.inc_by(report.claimed as f64);
        }
        disposition
    }
}

#[async_trait]
impl<A: SignerApi> StageHandler for UnsignedBatchHandler<A> {
    fn stage(&self) -> &'static str {
        "signer"
    }

    async fn process(&self, delivery: &Delivery, cancel: &CancellationToken) -> Disposition {
        let (disposition, report) = self.handle(delivery, cancel).await;
        // Empty batches never lease a key and publish nothing.
        if let Some(report) = report.filter(|r| r.key_identity.is_some()) {
            BATCHES_SIGNED.inc();
            LEASE_ATTEMPTS.inc_by(f64::from(report.lease_attempts));
            LEASE_WAIT.observe(report.lease_wait.as_secs_f64());
            if report.release_failed {
                KEY_RELEASE_FAILURES.inc();
            }
        }
        disposition
    }
}

#[async_trait]
impl<A: RecordKeeperApi> StageHandler for SignedBatchHandler<A> {
    fn stage(&self) -> &'static str {
        "keeper"
    }

    async fn process(&self, delivery: &Delivery, _cancel: &CancellationToken) -> Disposition {
        let (disposition, report) = self.handle(delivery).await;
        if let Some(report) = report {
            SIGNATURES_RECORDED.inc_by(report.recorded as f64);
        }
        disposition
    }
}
