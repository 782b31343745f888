//! # Record Ledger
//!
//! The record and signature tables plus the rules for changing them. The
//! ledger itself is not synchronized; adapters wrap each call in whatever
//! atomic unit their backend offers (a mutex, a transaction).

use crate::domain::entities::ClaimedBatch;
use crate::domain::errors::StoreError;
use shared_types::{BatchId, Record, RecordId, RecordSignature};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

#[derive(Debug, Default)]
pub struct RecordLedger {
    records: BTreeMap<RecordId, Record>,
    /// Ids with `batch_id == 0 && !signed`, ascending.
    unclaimed: BTreeSet<RecordId>,
    signatures: HashMap<RecordId, RecordSignature>,
    /// Largest batch id ever stamped on a record.
    high_water: BatchId,
    last_record_id: RecordId,
}

impl RecordLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append new unclaimed records, returning their ids in input order.
    pub fn insert<I, P>(&mut self, payloads: I) -> Vec<RecordId>
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        payloads
            .into_iter()
            .map(|payload| {
                self.last_record_id += 1;
                let id = self.last_record_id;
                self.records.insert(id, Record::new(id, payload));
                self.unclaimed.insert(id);
                id
            })
            .collect()
    }

    /// Claim up to `max_size` unclaimed records under a new batch id.
    ///
    /// Returns `None` when nothing is claimable; no batch id is consumed in
    /// that case.
    pub fn claim(&mut self, max_size: usize) -> Result<Option<ClaimedBatch>, StoreError> {
        if max_size == 0 {
            return Err(StoreError::InvalidClaimSize(max_size));
        }
        let ids: Vec<RecordId> = self.unclaimed.iter().take(max_size).copied().collect();
        if ids.is_empty() {
            return Ok(None);
        }

        let batch_id = self.high_water.next();
        self.high_water = batch_id;

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            self.unclaimed.remove(&id);
            if let Some(record) = self.records.get_mut(&id) {
                record.batch_id = batch_id;
                records.push(record.clone());
            }
        }
        Ok(Some(ClaimedBatch { batch_id, records }))
    }

    /// Store one signature per entry and mark those records signed.
    ///
    /// Every entry is validated before anything is written, so a rejected
    /// call leaves the ledger untouched.
    pub fn record_signatures(
        &mut self,
        batch_id: BatchId,
        signatures: &[RecordSignature],
    ) -> Result<usize, StoreError> {
        let mut seen = HashSet::with_capacity(signatures.len());
        for signature in signatures {
            let record_id = signature.record_id;
            let record = self
                .records
                .get(&record_id)
                .ok_or(StoreError::RecordNotFound(record_id))?;

            if signature.batch_id != batch_id || record.batch_id != batch_id {
                return Err(StoreError::BatchMismatch {
                    record_id,
                    expected: batch_id,
                    actual: record.batch_id,
                });
            }
            if self.signatures.contains_key(&record_id) || !seen.insert(record_id) {
                return Err(StoreError::DuplicateSignature { record_id });
            }
        }

        for signature in signatures {
            self.signatures
                .insert(signature.record_id, signature.clone());
            if let Some(record) = self.records.get_mut(&signature.record_id) {
                record.signed = true;
            }
        }
        Ok(signatures.len())
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.get(&id)
    }

    pub fn records_in_batch(&self, batch_id: BatchId) -> Vec<Record> {
        self.records
            .values()
            .filter(|r| r.batch_id == batch_id)
            .cloned()
            .collect()
    }

    /// Signatures of a batch in record id order.
    pub fn signatures_for_batch(&self, batch_id: BatchId) -> Vec<RecordSignature> {
        let mut found: Vec<RecordSignature> = self
            .signatures
            .values()
            .filter(|s| s.batch_id == batch_id)
            .cloned()
            .collect();
        found.sort_by_key(|s| s.record_id);
        found
    }

    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    pub fn unclaimed_count(&self) -> usize {
        self.unclaimed.len()
    }

    pub fn high_water(&self) -> BatchId {
        self.high_water
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use shared_types::KeyIdentity;

    fn signature(record_id: RecordId, batch_id: BatchId) -> RecordSignature {
        RecordSignature {
            record_id,
            batch_id,
            key_identity: KeyIdentity::new("key-a"),
            signature: "c2ln".into(),
            timestamp: Utc::now(),
        }
    }

    fn ledger_with(n: usize) -> RecordLedger {
        let mut ledger = RecordLedger::new();
        ledger.insert((0..n).map(|i| format!("payload-{i}")));
        ledger
    }

    #[test]
    fn test_claim_takes_lowest_ids_first() {
        let mut ledger = ledger_with(5);

        let batch = ledger.claim(3).unwrap().unwrap();

        assert_eq!(batch.batch_id, BatchId(1));
        let ids: Vec<_> = batch.records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(batch.records.iter().all(|r| r.batch_id == BatchId(1)));
        assert_eq!(ledger.unclaimed_count(), 2);
    }

    #[test]
    fn test_claim_on_empty_returns_none_without_consuming_id() {
        let mut ledger = RecordLedger::new();

        assert!(ledger.claim(10).unwrap().is_none());
        assert_eq!(ledger.high_water(), BatchId::UNCLAIMED);

        ledger.insert(["x"]);
        assert_eq!(ledger.claim(10).unwrap().unwrap().batch_id, BatchId(1));
    }

    #[test]
    fn test_claim_size_zero_rejected() {
        let mut ledger = ledger_with(1);
        assert_eq!(ledger.claim(0), Err(StoreError::InvalidClaimSize(0)));
    }

    #[test]
    fn test_successive_claims_increase_batch_id() {
        let mut ledger = ledger_with(4);

        let first = ledger.claim(2).unwrap().unwrap();
        let second = ledger.claim(2).unwrap().unwrap();

        assert!(second.batch_id > first.batch_id);
        assert!(ledger.claim(2).unwrap().is_none());
    }

    #[test]
    fn test_record_signatures_marks_signed() {
        let mut ledger = ledger_with(2);
        let batch = ledger.claim(2).unwrap().unwrap();

        let written = ledger
            .record_signatures(batch.batch_id, &[signature(1, batch.batch_id), signature(2, batch.batch_id)])
            .unwrap();

        assert_eq!(written, 2);
        assert!(ledger.get(1).unwrap().signed);
        assert!(ledger.get(2).unwrap().signed);
        assert_eq!(ledger.signatures_for_batch(batch.batch_id).len(), 2);
    }

    #[test]
    fn test_duplicate_signature_rejects_whole_batch() {
        let mut ledger = ledger_with(3);
        let batch = ledger.claim(3).unwrap().unwrap();
        let id = batch.batch_id;
        ledger.record_signatures(id, &[signature(2, id)]).unwrap();

        let err = ledger
            .record_signatures(id, &[signature(1, id), signature(2, id), signature(3, id)])
            .unwrap_err();

        assert_eq!(err, StoreError::DuplicateSignature { record_id: 2 });
        assert_eq!(ledger.signature_count(), 1);
        assert!(!ledger.get(1).unwrap().signed);
        assert!(!ledger.get(3).unwrap().signed);
    }

    #[test]
    fn test_duplicate_within_one_call_rejected() {
        let mut ledger = ledger_with(1);
        let id = ledger.claim(1).unwrap().unwrap().batch_id;

        let err = ledger
            .record_signatures(id, &[signature(1, id), signature(1, id)])
            .unwrap_err();

        assert_eq!(err, StoreError::DuplicateSignature { record_id: 1 });
        assert_eq!(ledger.signature_count(), 0);
    }

    #[test]
    fn test_signature_for_foreign_batch_rejected() {
        let mut ledger = ledger_with(2);
        let first = ledger.claim(1).unwrap().unwrap().batch_id;
        let second = ledger.claim(1).unwrap().unwrap().batch_id;

        let err = ledger
            .record_signatures(first, &[signature(2, first)])
            .unwrap_err();

        assert_eq!(
            err,
            StoreError::BatchMismatch {
                record_id: 2,
                expected: first,
                actual: second
            }
        );
    }

    #[test]
    fn test_unknown_record_rejected() {
        let mut ledger = ledger_with(1);
        let id = ledger.claim(1).unwrap().unwrap().batch_id;

        assert_eq!(
            ledger.record_signatures(id, &[signature(99, id)]),
            Err(StoreError::RecordNotFound(99))
        );
    }

    #[test]
    fn test_unclaimed_record_cannot_be_signed() {
        let mut ledger = ledger_with(1);

        let err = ledger
            .record_signatures(BatchId(1), &[signature(1, BatchId(1))])
            .unwrap_err();
        assert!(matches!(err, StoreError::BatchMismatch { .. }));
    }

    proptest! {
        #[test]
        fn prop_claims_partition_records(
            total in 0usize..60,
            sizes in proptest::collection::vec(1usize..12, 1..20),
        ) {
            let mut ledger = ledger_with(total);
            let mut claimed = HashSet::new();
            let mut last = BatchId::UNCLAIMED;

            for size in sizes {
                match ledger.claim(size).unwrap() {
                    Some(batch) => {
                        prop_assert!(batch.batch_id > last);
                        prop_assert!(batch.len() <= size);
                        last = batch.batch_id;
                        for record in batch.records {
                            prop_assert!(claimed.insert(record.id));
                        }
                    }
                    None => prop_assert_eq!(ledger.unclaimed_count(), 0),
                }
            }
            prop_assert_eq!(claimed.len() + ledger.unclaimed_count(), total);
        }
    }
}
