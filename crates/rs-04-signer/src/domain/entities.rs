use crate::domain::stage::SigningStage;
use shared_types::{BatchId, KeyIdentity};
use std::time::Duration;

/// What happened to one unsigned batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningReport {
    pub batch_id: BatchId,
    pub records: usize,
    pub stage: SigningStage,
    /// `None` for empty batches, which never lease a key.
    pub key_identity: Option<KeyIdentity>,
    pub lease_attempts: u32,
    pub lease_wait: Duration,
    /// The signed batch was published but the key could not be returned.
    pub release_failed: bool,
}

impl SigningReport {
    pub fn empty(batch_id: BatchId) -> Self {
        Self {
            batch_id,
            records: 0,
            stage: SigningStage::Acknowledged,
            key_identity: None,
            lease_attempts: 0,
            lease_wait: Duration::ZERO,
            release_failed: false,
        }
    }
}
