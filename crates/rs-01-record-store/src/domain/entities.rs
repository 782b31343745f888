use shared_types::{BatchId, Record, RecordSnapshot, UnsignedBatch};

/// Records stamped with one freshly issued batch id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedBatch {
    pub batch_id: BatchId,
    /// Ascending record id order.
    pub records: Vec<Record>,
}

impl ClaimedBatch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The message the allocator publishes for this claim.
    pub fn to_unsigned(&self) -> UnsignedBatch {
        UnsignedBatch {
            batch_id: self.batch_id,
            records: self
                .records
                .iter()
                .map(|r| RecordSnapshot {
                    record_id: r.id,
                    payload: r.payload.clone(),
                })
                .collect(),
        }
    }
}
