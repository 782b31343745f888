//! # Inbound Ports (Driving Ports / API)

use crate::domain::entities::SigningReport;
use crate::domain::errors::SignerError;
use async_trait::async_trait;
use shared_types::UnsignedBatch;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait SignerApi: Send + Sync {
    /// Lease a key, sign every record, publish the signed batch and return
    /// the key.
    ///
    /// The key is released whether or not publishing succeeds. An `Ok`
    /// result means the batch may be acknowledged, including when the batch
    /// was published but the release failed.
    async fn sign_batch(
        &self,
        batch: &UnsignedBatch,
        cancel: &CancellationToken,
    ) -> Result<SigningReport, SignerError>;
}

#[async_trait]
impl<T: SignerApi + ?Sized> SignerApi for Arc<T> {
    async fn sign_batch(
        &self,
        batch: &UnsignedBatch,
        cancel: &CancellationToken,
    ) -> Result<SigningReport, SignerError> {
        (**self).sign_batch(batch, cancel).await
    }
}
