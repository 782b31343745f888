//! # Message Bus Adapter
//!
//! ```text
//! [unsigned-batches] ──UnsignedBatch──→ [Signer] ──SignedBatch──→ [signed-batches]
//!                                           │
//!                                 malformed or unclaimed
//!                                           ↓
//!                                     [dead-letter]
//! ```

use crate::domain::entities::SigningReport;
use crate::ports::inbound::SignerApi;
use crate::ports::outbound::SignedBatchPublisher;
use async_trait::async_trait;
use shared_bus::{
    publish_payload, BusError, Delivery, Disposition, MessageProperties, MessagePublisher,
    PipelineQueue,
};
use shared_types::{SignedBatch, UnsignedBatch, WirePayload};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Publishes signed batches on the pipeline exchange.
pub struct BusSignedBatchPublisher<P: MessagePublisher> {
    bus: P,
}

impl<P: MessagePublisher> BusSignedBatchPublisher<P> {
    pub fn new(bus: P) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl<P: MessagePublisher> SignedBatchPublisher for BusSignedBatchPublisher<P> {
    async fn publish_signed(&self, batch: &SignedBatch) -> Result<(), BusError> {
        publish_payload(
            &self.bus,
            PipelineQueue::SignedBatches.routing_key(),
            batch,
            MessageProperties::persistent_json(),
        )
        .await?;
        debug!(batch_id = %batch.batch_id, records = batch.len(), "Signed batch published");
        Ok(())
    }
}

/// Turns unsigned-batch deliveries into signing runs.
pub struct UnsignedBatchHandler<A: SignerApi> {
    signer: A,
}

impl<A: SignerApi> UnsignedBatchHandler<A> {
    pub fn new(signer: A) -> Self {
        Self { signer }
    }

    pub async fn handle(
        &self,
        delivery: &Delivery,
        cancel: &CancellationToken,
    ) -> (Disposition, Option<SigningReport>) {
        let batch = match UnsignedBatch::decode(&delivery.body) {
            Ok(batch) => batch,
            Err(e) => {
                warn!(delivery_tag = delivery.delivery_tag, error = %e, "Malformed unsigned batch");
                return (Disposition::dead_letter(e.to_string()), None);
            }
        };
        if delivery.redelivered {
            debug!(batch_id = %batch.batch_id, "Unsigned batch redelivered");
        }

        match self.signer.sign_batch(&batch, cancel).await {
            Ok(report) => (Disposition::Ack, Some(report)),
            Err(e) if e.is_cancelled() => (
                Disposition::abandon("signing interrupted by shutdown"),
                None,
            ),
            Err(e) if e.is_transient() => {
                warn!(batch_id = %batch.batch_id, error = %e, "Signing failed, batch will be redelivered");
                (Disposition::abandon(e.to_string()), None)
            }
            Err(e) => {
                error!(batch_id = %batch.batch_id, error = %e, "Unsigned batch rejected");
                (Disposition::dead_letter(e.to_string()), None)
            }
        }
    }
}
