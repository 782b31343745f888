//! Signer error types.

use rs_03_key_registry::LeaseError;
use shared_bus::BusError;
use shared_types::{BatchId, PayloadError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignerError {
    /// The batch can never be signed as delivered.
    #[error("Invalid unsigned batch: {0}")]
    InvalidBatch(#[from] PayloadError),

    #[error("Key lease failed: {0}")]
    Lease(#[from] LeaseError),

    /// Signatures were produced but never reached the bus.
    #[error("Failed to publish signed batch {batch_id}: {source}")]
    Publish {
        batch_id: BatchId,
        #[source]
        source: BusError,
    },
}

impl SignerError {
    /// Whether redelivering the batch may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::InvalidBatch(_) => false,
            Self::Lease(e) => e.is_transient(),
            Self::Publish { source, .. } => source.is_transient(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Lease(LeaseError::Cancelled))
    }
}
