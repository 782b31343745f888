//! # Record Keeper Service

use crate::domain::entities::RecordingReport;
use crate::domain::errors::KeeperError;
use crate::domain::validation::validate_signed_batch;
use crate::ports::inbound::RecordKeeperApi;
use async_trait::async_trait;
use rs_01_record_store::RecordStore;
use shared_types::SignedBatch;
use tracing::{debug, error, info};

pub struct RecordKeeperService<S: RecordStore> {
    store: S,
}

impl<S: RecordStore> RecordKeeperService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[async_trait]
impl<S: RecordStore> RecordKeeperApi for RecordKeeperService<S> {
    async fn record_batch(&self, batch: &SignedBatch) -> Result<RecordingReport, KeeperError> {
        validate_signed_batch(batch)?;
        if batch.is_empty() {
            debug!(batch_id = %batch.batch_id, "Empty signed batch, nothing to record");
            return Ok(RecordingReport {
                batch_id: batch.batch_id,
                recorded: 0,
            });
        }

        let recorded = self
            .store
            .record_signatures(batch.batch_id, &batch.records)
            .await
            .map_err(|e| {
                if let rs_01_record_store::StoreError::DuplicateSignature { record_id } = &e {
                    error!(
                        batch_id = %batch.batch_id,
                        record_id,
                        "Signature already recorded; batch rejected without writes"
                    );
                }
                KeeperError::from(e)
            })?;

        info!(batch_id = %batch.batch_id, recorded, "Signed batch recorded");
        Ok(RecordingReport {
            batch_id: batch.batch_id,
            recorded,
        })
    }
}
