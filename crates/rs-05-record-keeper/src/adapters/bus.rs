//! # Message Bus Adapter
//!
//! ```text
//! [signed-batches] ──SignedBatch──→ [Record Keeper] ──→ record store
//!                                         │
//!                        malformed, invalid or duplicate
//!                                         ↓
//!                                   [dead-letter]
//! ```

use crate::domain::entities::RecordingReport;
use crate::ports::inbound::RecordKeeperApi;
use shared_bus::{Delivery, Disposition};
use shared_types::{SignedBatch, WirePayload};
use tracing::{error, warn};

/// Turns signed-batch deliveries into store writes.
pub struct SignedBatchHandler<A: RecordKeeperApi> {
    keeper: A,
}

impl<A: RecordKeeperApi> SignedBatchHandler<A> {
    pub fn new(keeper: A) -> Self {
        Self { keeper }
    }

    pub async fn handle(&self, delivery: &Delivery) -> (Disposition, Option<RecordingReport>) {
        let batch = match SignedBatch::decode(&delivery.body) {
            Ok(batch) => batch,
            Err(e) => {
                warn!(delivery_tag = delivery.delivery_tag, error = %e, "Malformed signed batch");
                return (Disposition::dead_letter(e.to_string()), None);
            }
        };

        match self.keeper.record_batch(&batch).await {
            Ok(report) => (Disposition::Ack, Some(report)),
            Err(e) if e.is_transient() => {
                warn!(batch_id = %batch.batch_id, error = %e, "Recording failed, batch will be redelivered");
                (Disposition::abandon(e.to_string()), None)
            }
            Err(e) => {
                error!(
                    batch_id = %batch.batch_id,
                    redelivered = delivery.redelivered,
                    error = %e,
                    "Signed batch rejected"
                );
                (Disposition::dead_letter(e.to_string()), None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::RecordKeeperService;
    use async_trait::async_trait;
    use chrono::Utc;
    use rs_01_record_store::{ClaimedBatch, InMemoryRecordStore, RecordStore, StoreError};
    use shared_bus::{MessageProperties, PipelineQueue};
    use shared_crypto::Ed25519KeyPair;
    use shared_types::{BatchId, KeyIdentity, Record, RecordId, RecordSignature};
    use std::sync::Arc;

    fn delivery(body: Vec<u8>) -> Delivery {
        Delivery {
            delivery_tag: 7,
            redelivered: false,
            queue: PipelineQueue::SignedBatches.queue_name().to_string(),
            routing_key: PipelineQueue::SignedBatches.routing_key().to_string(),
            properties: MessageProperties::persistent_json(),
            body,
        }
    }

    fn signed(batch: &ClaimedBatch) -> SignedBatch {
        let keypair = Ed25519KeyPair::generate();
        SignedBatch {
            batch_id: batch.batch_id,
            records: batch
                .records
                .iter()
                .map(|r| RecordSignature {
                    record_id: r.id,
                    batch_id: batch.batch_id,
                    key_identity: KeyIdentity::new("key-a"),
                    signature: keypair.sign(r.payload.as_bytes()).into_string(),
                    timestamp: Utc::now(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_signed_batch_recorded_and_acked() {
        let store = Arc::new(InMemoryRecordStore::with_records(["a", "b", "c"]));
        let claimed = store.claim_batch(3).await.unwrap().unwrap();
        let handler = SignedBatchHandler::new(RecordKeeperService::new(store.clone()));

        let (disposition, report) = handler
            .handle(&delivery(signed(&claimed).encode().unwrap()))
            .await;

        assert_eq!(disposition, Disposition::Ack);
        assert_eq!(report.unwrap().recorded, 3);
        assert_eq!(store.signature_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_duplicate_redelivery_is_dead_lettered() {
        let store = Arc::new(InMemoryRecordStore::with_records(["a", "b"]));
        let claimed = store.claim_batch(2).await.unwrap().unwrap();
        let handler = SignedBatchHandler::new(RecordKeeperService::new(store.clone()));
        let body = signed(&claimed).encode().unwrap();

        let (first, _) = handler.handle(&delivery(body.clone())).await;
        let (second, report) = handler.handle(&delivery(body)).await;

        assert_eq!(first, Disposition::Ack);
        assert!(matches!(second, Disposition::DeadLetter { .. }));
        assert!(report.is_none());
        assert_eq!(store.signature_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_malformed_body_is_dead_lettered() {
        let handler = SignedBatchHandler::new(RecordKeeperService::new(InMemoryRecordStore::new()));

        let (disposition, _) = handler.handle(&delivery(b"[1, 2, 3]".to_vec())).await;

        assert!(matches!(disposition, Disposition::DeadLetter { .. }));
    }

    /// Store whose writes always fail as if the backend were down.
    struct UnavailableStore;

    #[async_trait]
    impl RecordStore for UnavailableStore {
        async fn insert_records(&self, _: Vec<String>) -> Result<Vec<RecordId>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn claim_batch(&self, _: usize) -> Result<Option<ClaimedBatch>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn record_signatures(
            &self,
            _: BatchId,
            _: &[RecordSignature],
        ) -> Result<usize, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn get_record(&self, _: RecordId) -> Result<Option<Record>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn records_in_batch(&self, _: BatchId) -> Result<Vec<Record>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn signatures_for_batch(
            &self,
            _: BatchId,
        ) -> Result<Vec<RecordSignature>, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn signature_count(&self) -> Result<usize, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
        async fn unclaimed_count(&self) -> Result<usize, StoreError> {
            Err(StoreError::Unavailable("down".into()))
        }
    }

    #[tokio::test]
    async fn test_store_outage_abandons() {
        let handler = SignedBatchHandler::new(RecordKeeperService::new(UnavailableStore));
        let claimed = ClaimedBatch {
            batch_id: BatchId(1),
            records: vec![Record {
                batch_id: BatchId(1),
                ..Record::new(1, "a")
            }],
        };

        let (disposition, _) = handler
            .handle(&delivery(signed(&claimed).encode().unwrap()))
            .await;

        assert!(matches!(disposition, Disposition::Abandon { .. }));
    }
}
