//! # Message Bus Adapter
//!
//! ```text
//! [batch-requests] ──BatchRequest──→ [Allocator] ──UnsignedBatch──→ [unsigned-batches]
//!                                         │
//!                                 malformed request
//!                                         ↓
//!                                   [dead-letter]
//! ```

use crate::domain::entities::AllocationReport;
use crate::domain::errors::AllocatorError;
use crate::ports::inbound::BatchAllocatorApi;
use crate::ports::outbound::BatchPublisher;
use async_trait::async_trait;
use shared_bus::{
    publish_payload, BusError, Delivery, Disposition, MessageProperties, MessagePublisher,
    PipelineQueue,
};
use shared_types::{BatchRequest, UnsignedBatch, WirePayload};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Publishes unsigned batches on the pipeline exchange.
pub struct BusBatchPublisher<P: MessagePublisher> {
    bus: P,
}

impl<P: MessagePublisher> BusBatchPublisher<P> {
    pub fn new(bus: P) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl<P: MessagePublisher> BatchPublisher for BusBatchPublisher<P> {
    async fn publish_unsigned(&self, batch: &UnsignedBatch) -> Result<(), BusError> {
        publish_payload(
            &self.bus,
            PipelineQueue::UnsignedBatches.routing_key(),
            batch,
            MessageProperties::persistent_json(),
        )
        .await?;
        debug!(batch_id = %batch.batch_id, records = batch.len(), "Unsigned batch published");
        Ok(())
    }
}

/// Turns control-queue deliveries into allocation runs.
pub struct ControlMessageHandler<A: BatchAllocatorApi> {
    allocator: A,
}

impl<A: BatchAllocatorApi> ControlMessageHandler<A> {
    pub fn new(allocator: A) -> Self {
        Self { allocator }
    }

    /// Run the allocation a delivery asks for and decide its fate.
    ///
    /// Once a run has claimed records the message is acknowledged, even if
    /// the run was then interrupted or failed. The report is returned
    /// alongside so callers can record it.
    pub async fn handle(
        &self,
        delivery: &Delivery,
        cancel: &CancellationToken,
    ) -> (Disposition, Option<AllocationReport>) {
        let request = match BatchRequest::decode(&delivery.body) {
            Ok(request) => request,
            Err(e) => {
                warn!(delivery_tag = delivery.delivery_tag, error = %e, "Malformed batch request");
                return (Disposition::dead_letter(e.to_string()), None);
            }
        };

        match self.allocator.run_allocation(request, cancel).await {
            Ok(report) if report.cancelled && report.claimed == 0 => (
                Disposition::abandon("allocation run interrupted by shutdown"),
                Some(report),
            ),
            Ok(report) if report.cancelled => {
                warn!(
                    requested = report.requested,
                    claimed = report.claimed,
                    "Allocation run interrupted; acknowledging the records already claimed"
                );
                (Disposition::Ack, Some(report))
            }
            Ok(report) => (Disposition::Ack, Some(report)),
            Err(e @ AllocatorError::Partial { .. }) => {
                error!(error = %e, "Allocation run failed part way; request will not be retried");
                (Disposition::Ack, None)
            }
            Err(e) if e.is_transient() => {
                warn!(error = %e, "Allocation run failed, request will be redelivered");
                (Disposition::abandon(e.to_string()), None)
            }
            Err(e) => {
                error!(error = %e, "Allocation run failed permanently");
                (Disposition::dead_letter(e.to_string()), None)
            }
        }
    }
}
