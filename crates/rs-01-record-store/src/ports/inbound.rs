//! # Record Store API
//!
//! The port the allocator and the record keeper drive. Implementations must
//! make `claim_batch` and `record_signatures` atomic with respect to every
//! other caller, including other processes sharing the same backend.

use crate::domain::entities::ClaimedBatch;
use crate::domain::errors::StoreError;
use async_trait::async_trait;
use shared_types::{BatchId, Record, RecordId, RecordSignature};
use std::sync::Arc;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Ingest new unclaimed records.
    async fn insert_records(&self, payloads: Vec<String>) -> Result<Vec<RecordId>, StoreError>;

    /// Atomically claim up to `max_size` unclaimed records, lowest ids
    /// first, under a batch id greater than any issued before.
    ///
    /// `Ok(None)` when nothing is claimable. A claim that loses a race to
    /// another claimer returns fewer records (or none), never an error.
    async fn claim_batch(&self, max_size: usize) -> Result<Option<ClaimedBatch>, StoreError>;

    /// Atomically store one signature per entry and mark each of those
    /// records signed. Fails as a whole if any record already has a
    /// signature.
    async fn record_signatures(
        &self,
        batch_id: BatchId,
        signatures: &[RecordSignature],
    ) -> Result<usize, StoreError>;

    async fn get_record(&self, id: RecordId) -> Result<Option<Record>, StoreError>;

    async fn records_in_batch(&self, batch_id: BatchId) -> Result<Vec<Record>, StoreError>;

    async fn signatures_for_batch(
        &self,
        batch_id: BatchId,
    ) -> Result<Vec<RecordSignature>, StoreError>;

    async fn signature_count(&self) -> Result<usize, StoreError>;

    async fn unclaimed_count(&self) -> Result<usize, StoreError>;
}

#[async_trait]
impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    async fn insert_records(&self, payloads: Vec<String>) -> Result<Vec<RecordId>, StoreError> {
        (**self).insert_records(payloads).await
    }

    async fn claim_batch(&self, max_size: usize) -> Result<Option<ClaimedBatch>, StoreError> {
        (**self).claim_batch(max_size).await
    }

    async fn record_signatures(
        &self,
        batch_id: BatchId,
        signatures: &[RecordSignature],
    ) -> Result<usize, StoreError> {
        (**self).record_signatures(batch_id, signatures).await
    }

    async fn get_record(&self, id: RecordId) -> Result<Option<Record>, StoreError> {
        (**self).get_record(id).await
    }

    async fn records_in_batch(&self, batch_id: BatchId) -> Result<Vec<Record>, StoreError> {
        (**self).records_in_batch(batch_id).await
    }

    async fn signatures_for_batch(
        &self,
        batch_id: BatchId,
    ) -> Result<Vec<RecordSignature>, StoreError> {
        (**self).signatures_for_batch(batch_id).await
    }

    async fn signature_count(&self) -> Result<usize, StoreError> {
        (**self).signature_count().await
    }

    async fn unclaimed_count(&self) -> Result<usize, StoreError> {
        (**self).unclaimed_count().await
    }
}
