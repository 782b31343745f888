//! # Queue Message Payloads
//!
//! The JSON bodies carried by the three pipeline queues.
//!
//! | Queue | Payload |
//! |-------|---------|
//! | control | [`BatchRequest`] |
//! | unsigned batches | [`UnsignedBatch`] |
//! | signed batches | [`SignedBatch`] |
//!
//! Record order inside a batch is significant and preserved end to end.

use crate::entities::{BatchId, RecordId, RecordSignature};
use crate::errors::PayloadError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// JSON encoding shared by every queue payload.
pub trait WirePayload: Serialize + DeserializeOwned {
    /// Human-readable payload name used in errors and logs.
    const KIND: &'static str;

    fn encode(&self) -> Result<Vec<u8>, PayloadError> {
        serde_json::to_vec(self).map_err(|source| PayloadError::Encode {
            kind: Self::KIND,
            source,
        })
    }

    fn decode(body: &[u8]) -> Result<Self, PayloadError> {
        serde_json::from_slice(body).map_err(|source| PayloadError::Malformed {
            kind: Self::KIND,
            source,
        })
    }
}

/// Control message asking the allocator to claim up to `requested_count`
/// records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    /// Signed on the wire; non-positive counts are a no-op.
    #[serde(rename = "requestedCount")]
    pub requested_count: i64,
}

impl BatchRequest {
    pub fn new(requested_count: i64) -> Self {
        Self { requested_count }
    }

    /// Number of records to claim, zero for non-positive requests.
    pub fn effective_count(&self) -> usize {
        usize::try_from(self.requested_count.max(0)).unwrap_or(usize::MAX)
    }
}

impl WirePayload for BatchRequest {
    const KIND: &'static str = "batch request";
}

/// One record as carried inside an [`UnsignedBatch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    pub record_id: RecordId,
    pub payload: String,
}

/// Records claimed together, awaiting signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedBatch {
    pub batch_id: BatchId,
    #[serde(default)]
    pub records: Vec<RecordSnapshot>,
}

impl UnsignedBatch {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Structural checks a signer applies before leasing a key.
    pub fn validate(&self) -> Result<(), PayloadError> {
        if !self.is_empty() && !self.batch_id.is_claimed() {
            return Err(PayloadError::invalid(
                Self::KIND,
                "non-empty batch carries the unclaimed batch id",
            ));
        }
        ensure_unique(self.records.iter().map(|r| r.record_id), Self::KIND)
    }
}

impl WirePayload for UnsignedBatch {
    const KIND: &'static str = "unsigned batch";
}

/// Signatures for every record of one batch, in the batch's order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedBatch {
    pub batch_id: BatchId,
    #[serde(default)]
    pub records: Vec<RecordSignature>,
}

impl SignedBatch {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn record_ids(&self) -> Vec<RecordId> {
        self.records.iter().map(|r| r.record_id).collect()
    }
}

impl WirePayload for SignedBatch {
    const KIND: &'static str = "signed batch";
}

fn ensure_unique(
    ids: impl Iterator<Item = RecordId>,
    kind: &'static str,
) -> Result<(), PayloadError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(PayloadError::invalid(
                kind,
                format!("record {id} appears more than once"),
            ));
        }
    }
    Ok(())
}
