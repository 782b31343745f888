//! Record keeper error types.

use rs_01_record_store::StoreError;
use shared_types::PayloadError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeeperError {
    /// The batch is structurally unusable and will never be recorded.
    #[error("Invalid signed batch: {0}")]
    InvalidBatch(#[from] PayloadError),

    #[error("Record store error: {0}")]
    Store(#[from] StoreError),
}

impl KeeperError {
    /// Whether redelivering the batch may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::InvalidBatch(_) => false,
            Self::Store(e) => e.is_transient(),
        }
    }

    /// A record of the batch already carries a signature.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Store(StoreError::DuplicateSignature { .. }))
    }
}
