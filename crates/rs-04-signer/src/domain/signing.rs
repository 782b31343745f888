//! Batch signing.
//!
//! Each record's payload bytes are signed with the leased key. Ed25519 is
//! deterministic, so re-signing a redelivered batch with the same key
//! yields the same signature bytes.

use rs_03_key_registry::LeasedKey;
use shared_types::{RecordSignature, SignedBatch, Timestamp, UnsignedBatch};

/// Sign every record of `batch`, preserving order. All entries share `now`.
pub fn sign_batch(batch: &UnsignedBatch, key: &LeasedKey, now: Timestamp) -> SignedBatch {
    let keypair = key.material.keypair();

    let records = batch
        .records
        .iter()
        .map(|record| RecordSignature {
            record_id: record.record_id,
            batch_id: batch.batch_id,
            key_identity: key.identity.clone(),
            signature: keypair.sign(record.payload.as_bytes()).into_string(),
            timestamp: now,
        })
        .collect();

    SignedBatch {
        batch_id: batch.batch_id,
        records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rs_03_key_registry::KeyEntry;
    use shared_crypto::EncodedSignature;
    use shared_types::{BatchId, RecordSnapshot};

    fn batch() -> UnsignedBatch {
        UnsignedBatch {
            batch_id: BatchId(7),
            records: vec![
                RecordSnapshot {
                    record_id: 3,
                    payload: "gamma".into(),
                },
                RecordSnapshot {
                    record_id: 1,
                    payload: "alpha".into(),
                },
            ],
        }
    }

    fn key() -> LeasedKey {
        KeyEntry::generate(Utc::now()).into()
    }

    #[test]
    fn test_order_and_envelope_preserved() {
        let key = key();
        let now = Utc::now();

        let signed = sign_batch(&batch(), &key, now);

        assert_eq!(signed.batch_id, BatchId(7));
        assert_eq!(signed.record_ids(), vec![3, 1]);
        assert!(signed.records.iter().all(|r| r.batch_id == BatchId(7)
            && r.key_identity == key.identity
            && r.timestamp == now
            && !r.signature.is_empty()));
    }

    #[test]
    fn test_signatures_verify_with_matching_key_only() {
        let key = key();
        let other = self::key();
        let signed = sign_batch(&batch(), &key, Utc::now());

        let first = EncodedSignature::new(signed.records[0].signature.clone());
        assert!(key.material.public_key().verify(b"gamma", &first).is_ok());
        assert!(key.material.public_key().verify(b"alpha", &first).is_err());
        assert!(other.material.public_key().verify(b"gamma", &first).is_err());
    }

    #[test]
    fn test_resigning_is_deterministic() {
        let key = key();

        let first = sign_batch(&batch(), &key, Utc::now());
        let second = sign_batch(&batch(), &key, Utc::now());

        let sigs = |b: &SignedBatch| b.records.iter().map(|r| r.signature.clone()).collect::<Vec<_>>();
        assert_eq!(sigs(&first), sigs(&second));
    }

    #[test]
    fn test_empty_batch_signs_nothing() {
        let empty = UnsignedBatch {
            batch_id: BatchId(2),
            records: Vec::new(),
        };
        assert!(sign_batch(&empty, &key(), Utc::now()).is_empty());
    }
}
