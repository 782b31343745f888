//! # Core Domain Entities
//!
//! - **Records**: [`Record`], [`RecordId`], [`BatchId`]
//! - **Signatures**: [`RecordSignature`]
//! - **Keys**: [`KeyIdentity`]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned record identifier, ascending from 1.
pub type RecordId = u64;

/// Point in time carried on signatures and key entries.
pub type Timestamp = DateTime<Utc>;

/// Identifier of a claimed batch.
///
/// Zero is reserved for "not yet claimed". Issued ids are strictly
/// increasing across the lifetime of a record store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BatchId(pub u64);

impl BatchId {
    /// Marker carried by records that no batch has claimed.
    pub const UNCLAIMED: BatchId = BatchId(0);

    pub fn is_claimed(self) -> bool {
        self.0 != 0
    }

    /// The id that follows `self`.
    pub fn next(self) -> BatchId {
        BatchId(self.0.saturating_add(1))
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unit of data awaiting signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    /// [`BatchId::UNCLAIMED`] until an allocator claims the record.
    pub batch_id: BatchId,
    pub payload: String,
    /// Set only after a signature for this record is durably stored.
    pub signed: bool,
}

impl Record {
    /// A freshly ingested, unclaimed record.
    pub fn new(id: RecordId, payload: impl Into<String>) -> Self {
        Self {
            id,
            batch_id: BatchId::UNCLAIMED,
            payload: payload.into(),
            signed: false,
        }
    }

    /// True when an allocator may still claim this record.
    pub fn is_claimable(&self) -> bool {
        !self.batch_id.is_claimed() && !self.signed
    }
}

/// Name of a key in the registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyIdentity(pub String);

impl KeyIdentity {
    pub fn new(identity: impl Into<String>) -> Self {
        Self(identity.into())
    }

    /// A fresh random identity for a newly generated key.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The signature produced for exactly one record.
///
/// Serves both as the persisted signature row and as an entry of a signed
/// batch on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSignature {
    pub record_id: RecordId,
    pub batch_id: BatchId,
    pub key_identity: KeyIdentity,
    /// Standard base64 of the raw signature bytes.
    pub signature: String,
    pub timestamp: Timestamp,
}
