//! Allocator error types.

use rs_01_record_store::StoreError;
use shared_bus::BusError;
use shared_types::BatchId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AllocatorError {
    /// `max_batch_size` must be at least one.
    #[error("Invalid allocator configuration: {0}")]
    InvalidConfig(String),

    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    /// A batch was claimed but its message never reached the bus. Its
    /// records keep the batch id and will not be claimed again.
    #[error("Failed to publish claimed batch {batch_id}: {source}")]
    Publish {
        batch_id: BatchId,
        #[source]
        source: BusError,
    },

    /// The run failed after claiming `claimed` records (an orphaned batch
    /// included). Those records cannot be un-claimed, so the control message
    /// must not run again.
    #[error("Allocation run failed after claiming {claimed} records: {source}")]
    Partial {
        claimed: usize,
        #[source]
        source: Box<AllocatorError>,
    },
}

impl AllocatorError {
    /// Whether redelivering the control message may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::InvalidConfig(_) => false,
            Self::Store(e) => e.is_transient(),
            Self::Publish { .. } => true,
            Self::Partial { .. } => false,
        }
    }

    /// Wrap `self` as a partial failure when the run already claimed records.
    pub(crate) fn after_claiming(self, claimed: usize) -> Self {
        if claimed == 0 {
            self
        } else {
            Self::Partial {
                claimed,
                source: Box::new(self),
            }
        }
    }
}
