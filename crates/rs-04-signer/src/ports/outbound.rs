//! # Outbound Ports (Driven Ports / SPI)
//!
//! The signer depends on a key lease, a destination for signed batches and
//! a clock (`rs_03_key_registry::TimeSource`).

use async_trait::async_trait;
use rs_03_key_registry::{Lease, LeaseError, LeasedKey};
use shared_bus::BusError;
use shared_types::SignedBatch;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Exclusive access to one signing key at a time.
#[async_trait]
pub trait KeyLeaseGateway: Send + Sync {
    /// Wait until a key is leased or `cancel` fires.
    async fn acquire(&self, cancel: &CancellationToken) -> Result<Lease, LeaseError>;

    /// Return the key under the lease it was granted with.
    async fn release(&self, key: &LeasedKey) -> Result<(), LeaseError>;
}

#[async_trait]
impl<T: KeyLeaseGateway + ?Sized> KeyLeaseGateway for Arc<T> {
    async fn acquire(&self, cancel: &CancellationToken) -> Result<Lease, LeaseError> {
        (**self).acquire(cancel).await
    }

    async fn release(&self, key: &LeasedKey) -> Result<(), LeaseError> {
        (**self).release(key).await
    }
}

/// Destination for signed batches.
#[async_trait]
pub trait SignedBatchPublisher: Send + Sync {
    async fn publish_signed(&self, batch: &SignedBatch) -> Result<(), BusError>;
}

#[async_trait]
impl<T: SignedBatchPublisher + ?Sized> SignedBatchPublisher for Arc<T> {
    async fn publish_signed(&self, batch: &SignedBatch) -> Result<(), BusError> {
        (**self).publish_signed(batch).await
    }
}
