//! # Inbound Ports (Driving Ports / API)

use crate::domain::entities::AllocationReport;
use crate::domain::errors::AllocatorError;
use async_trait::async_trait;
use rs_01_record_store::ClaimedBatch;
use shared_types::BatchRequest;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait BatchAllocatorApi: Send + Sync {
    /// Claim one batch of at most `max_size` records without publishing it.
    async fn claim_batch(&self, max_size: usize) -> Result<Option<ClaimedBatch>, AllocatorError>;

    /// Claim and publish batches until the request is satisfied, the store
    /// has nothing left, or `cancel` fires.
    ///
    /// Waits for any run already in progress to finish first.
    async fn run_allocation(
        &self,
        request: BatchRequest,
        cancel: &CancellationToken,
    ) -> Result<AllocationReport, AllocatorError>;
}

#[async_trait]
impl<T: BatchAllocatorApi + ?Sized> BatchAllocatorApi for Arc<T> {
    async fn claim_batch(&self, max_size: usize) -> Result<Option<ClaimedBatch>, AllocatorError> {
        (**self).claim_batch(max_size).await
    }

    async fn run_allocation(
        &self,
        request: BatchRequest,
        cancel: &CancellationToken,
    ) -> Result<AllocationReport, AllocatorError> {
        (**self).run_allocation(request, cancel).await
    }
}
