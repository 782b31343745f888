use crate::domain::entities::ClaimedBatch;
use crate::domain::errors::StoreError;
use crate::domain::ledger::RecordLedger;
use crate::ports::inbound::RecordStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{BatchId, Record, RecordId, RecordSignature};
use tracing::{debug, info};

/// In-process record store.
///
/// Each operation runs under a single mutex, which makes claim and
/// signature writes atomic for every task sharing this instance.
#[derive(Default)]
pub struct InMemoryRecordStore {
    ledger: Mutex<RecordLedger>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `payloads`.
    pub fn with_records<I, P>(payloads: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let mut ledger = RecordLedger::new();
        ledger.insert(payloads);
        Self {
            ledger: Mutex::new(ledger),
        }
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn insert_records(&self, payloads: Vec<String>) -> Result<Vec<RecordId>, StoreError> {
        let ids = self.ledger.lock().insert(payloads);
        debug!(count = ids.len(), "Records ingested");
        Ok(ids)
    }

    async fn claim_batch(&self, max_size: usize) -> Result<Option<ClaimedBatch>, StoreError> {
        let claimed = self.ledger.lock().claim(max_size)?;
        match &claimed {
            Some(batch) => info!(
                batch_id = %batch.batch_id,
                records = batch.len(),
                "Batch claimed"
            ),
            None => debug!(max_size, "No claimable records"),
        }
        Ok(claimed)
    }

    async fn record_signatures(
        &self,
        batch_id: BatchId,
        signatures: &[RecordSignature],
    ) -> Result<usize, StoreError> {
        self.ledger.lock().record_signatures(batch_id, signatures)
    }

    async fn get_record(&self, id: RecordId) -> Result<Option<Record>, StoreError> {
        Ok(self.ledger.lock().get(id).cloned())
    }

    async fn records_in_batch(&self, batch_id: BatchId) -> Result<Vec<Record>, StoreError> {
        Ok(self.ledger.lock().records_in_batch(batch_id))
    }

    async fn signatures_for_batch(
        &self,
        batch_id: BatchId,
    ) -> Result<Vec<RecordSignature>, StoreError> {
        Ok(self.ledger.lock().signatures_for_batch(batch_id))
    }

    async fn signature_count(&self) -> Result<usize, StoreError> {
        Ok(self.ledger.lock().signature_count())
    }

    async fn unclaimed_count(&self) -> Result<usize, StoreError> {
        Ok(self.ledger.lock().unclaimed_count())
    }
}
