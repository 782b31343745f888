//! Structural checks applied to a signed batch before the store sees it.

use shared_crypto::EncodedSignature;
use shared_types::{PayloadError, SignedBatch, WirePayload};
use std::collections::HashSet;

/// Reject batches that could never be recorded, whatever the store holds.
///
/// - a non-empty batch carries a claimed batch id
/// - every entry names the envelope's batch id
/// - no record id repeats
/// - every signature is 64 bytes of standard base64
pub fn validate_signed_batch(batch: &SignedBatch) -> Result<(), PayloadError> {
    let kind = SignedBatch::KIND;
    if batch.is_empty() {
        return Ok(());
    }
    if !batch.batch_id.is_claimed() {
        return Err(PayloadError::invalid(
            kind,
            "non-empty batch carries the unclaimed batch id",
        ));
    }

    let mut seen = HashSet::with_capacity(batch.len());
    for entry in &batch.records {
        if entry.batch_id != batch.batch_id {
            return Err(PayloadError::invalid(
                kind,
                format!(
                    "record {} names batch {}, envelope is batch {}",
                    entry.record_id, entry.batch_id, batch.batch_id
                ),
            ));
        }
        if !seen.insert(entry.record_id) {
            return Err(PayloadError::invalid(
                kind,
                format!("record {} appears more than once", entry.record_id),
            ));
        }
        if let Err(e) = EncodedSignature::new(entry.signature.as_str()).decode() {
            return Err(PayloadError::invalid(
                kind,
                format!("record {} has an unusable signature: {e}", entry.record_id),
            ));
        }
    }
    Ok(())
}
