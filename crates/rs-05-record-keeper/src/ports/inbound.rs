//! # Inbound Ports (Driving Ports / API)

use crate::domain::entities::RecordingReport;
use crate::domain::errors::KeeperError;
use async_trait::async_trait;
use shared_types::SignedBatch;
use std::sync::Arc;

#[async_trait]
pub trait RecordKeeperApi: Send + Sync {
    /// Persist one signature per entry and mark those records signed, as a
    /// single unit. An empty batch records nothing and succeeds.
    ///
    /// A record that already has a signature fails the whole batch; nothing
    /// is overwritten.
    async fn record_batch(&self, batch: &SignedBatch) -> Result<RecordingReport, KeeperError>;
}

#[async_trait]
impl<T: RecordKeeperApi + ?Sized> RecordKeeperApi for Arc<T> {
    async fn record_batch(&self, batch: &SignedBatch) -> Result<RecordingReport, KeeperError> {
        (**self).record_batch(batch).await
    }
}
