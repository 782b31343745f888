//! Record store error types.

use shared_types::{BatchId, RecordId};
use thiserror::Error;

/// Errors from claiming records or persisting signatures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached or failed mid-operation.
    #[error("Record store unavailable: {0}")]
    Unavailable(String),

    /// Claim size must be at least one.
    #[error("Invalid claim size: {0}")]
    InvalidClaimSize(usize),

    /// No record with this id exists.
    #[error("Record not found: {0}")]
    RecordNotFound(RecordId),

    /// A signature for this record was already stored.
    #[error("Record {record_id} already signed")]
    DuplicateSignature { record_id: RecordId },

    /// The signature names a batch the record was not claimed by.
    #[error("Record {record_id} belongs to batch {actual}, not {expected}")]
    BatchMismatch {
        record_id: RecordId,
        expected: BatchId,
        actual: BatchId,
    },
}

impl StoreError {
    /// Whether the same operation may succeed if retried later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}
