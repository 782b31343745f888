use shared_types::BatchId;

/// Outcome of persisting one signed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingReport {
    pub batch_id: BatchId,
    /// Signatures written, which is also the number of records now signed.
    pub recorded: usize,
}
