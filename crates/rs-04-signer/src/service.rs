//! # Signer Service
//!
//! Application service implementing `SignerApi` over a key lease, a signed
//! batch publisher and a clock.

use crate::domain::entities::SigningReport;
use crate::domain::errors::SignerError;
use crate::domain::signing::sign_batch;
use crate::domain::stage::SigningStage;
use crate::ports::inbound::SignerApi;
use crate::ports::outbound::{KeyLeaseGateway, SignedBatchPublisher};
use async_trait::async_trait;
use rs_03_key_registry::TimeSource;
use shared_types::{BatchId, UnsignedBatch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub struct SignerService<K: KeyLeaseGateway, P: SignedBatchPublisher, T: TimeSource> {
    leases: K,
    publisher: P,
    clock: T,
}

impl<K: KeyLeaseGateway, P: SignedBatchPublisher, T: TimeSource> SignerService<K, P, T> {
    pub fn new(leases: K, publisher: P, clock: T) -> Self {
        Self {
            leases,
            publisher,
            clock,
        }
    }
}

fn advance(batch_id: BatchId, stage: &mut SigningStage, next: SigningStage) {
    debug_assert!(stage.can_advance_to(next), "{stage} -> {next}");
    debug!(batch_id = %batch_id, from = %stage, to = %next, "Signer stage transition");
    *stage = next;
}

#[async_trait]
impl<K, P, T> SignerApi for SignerService<K, P, T>
where
    K: KeyLeaseGateway,
    P: SignedBatchPublisher,
    T: TimeSource,
{
    async fn sign_batch(
        &self,
        batch: &UnsignedBatch,
        cancel: &CancellationToken,
    ) -> Result<SigningReport, SignerError> {
        let batch_id = batch.batch_id;
        let mut stage = SigningStage::Received;
        debug!(batch_id = %batch_id, records = batch.len(), stage = %stage, "Unsigned batch received");

        if let Err(e) = batch.validate() {
            advance(batch_id, &mut stage, SigningStage::Failed);
            return Err(e.into());
        }
        if batch.is_empty() {
            debug!(batch_id = %batch_id, "Empty batch, nothing to sign");
            return Ok(SigningReport::empty(batch_id));
        }

        let lease = match self.leases.acquire(cancel).await {
            Ok(lease) => lease,
            Err(e) => {
                advance(batch_id, &mut stage, SigningStage::Failed);
                return Err(e.into());
            }
        };
        advance(batch_id, &mut stage, SigningStage::KeyLeased);
        let identity = lease.key.identity.clone();

        let signed = sign_batch(batch, &lease.key, self.clock.now());
        advance(batch_id, &mut stage, SigningStage::Signed);

        let published = self.publisher.publish_signed(&signed).await;
        let released = self.leases.release(&lease.key).await;

        if let Err(source) = published {
            if let Err(e) = &released {
                warn!(batch_id = %batch_id, identity = %identity, error = %e, "Key release failed");
            }
            advance(batch_id, &mut stage, SigningStage::Failed);
            error!(batch_id = %batch_id, error = %source, "Signed batch not published");
            return Err(SignerError::Publish { batch_id, source });
        }
        advance(batch_id, &mut stage, SigningStage::Published);

        let release_failed = match released {
            Ok(()) => false,
            Err(e) => {
                warn!(
                    batch_id = %batch_id,
                    identity = %identity,
                    error = %e,
                    "Key release failed after publish; key stays leased"
                );
                true
            }
        };

        info!(
            batch_id = %batch_id,
            records = signed.len(),
            identity = %identity,
            lease_attempts = lease.attempts,
            "Batch signed and published"
        );
        Ok(SigningReport {
            batch_id,
            records: signed.len(),
            stage,
            key_identity: Some(identity),
            lease_attempts: lease.attempts,
            lease_wait: lease.waited,
            release_failed,
        })
    }
}
