use rs_01_record_store::ClaimedBatch;
use shared_types::BatchId;

/// Claim size cap used when none is configured.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatorConfig {
    /// Upper bound on records per claim (and so per unsigned batch).
    pub max_batch_size: usize,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

/// Outcome of one allocation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationReport {
    /// Records the control message asked for.
    pub requested: usize,
    /// Records actually claimed and published.
    pub claimed: usize,
    /// Published batches, in claim order.
    pub batch_ids: Vec<BatchId>,
    /// Shutdown interrupted the run before `requested` was satisfied or the
    /// store ran dry.
    pub cancelled: bool,
}

impl AllocationReport {
    pub fn new(requested: usize) -> Self {
        Self {
            requested,
            ..Self::default()
        }
    }

    pub(crate) fn record(&mut self, batch: &ClaimedBatch) {
        self.claimed += batch.len();
        self.batch_ids.push(batch.batch_id);
    }

    pub fn batches(&self) -> usize {
        self.batch_ids.len()
    }
}
