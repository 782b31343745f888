use serde::{Deserialize, Serialize};
use shared_crypto::KeyMaterial;
use shared_types::{KeyIdentity, Timestamp};
use std::time::Duration;

/// A signing key as stored in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEntry {
    pub identity: KeyIdentity,
    pub material: KeyMaterial,
    pub in_use: bool,
    /// Refreshed on every lease and release; drives LRU selection.
    pub last_used: Timestamp,
}

impl KeyEntry {
    /// A freshly generated, free key.
    pub fn generate(now: Timestamp) -> Self {
        Self {
            identity: KeyIdentity::generate(),
            material: KeyMaterial::generate(),
            in_use: false,
            last_used: now,
        }
    }

    pub fn status(&self) -> KeyStatus {
        KeyStatus {
            identity: self.identity.clone(),
            in_use: self.in_use,
            last_used: self.last_used,
        }
    }
}

/// Operator view of a key, without its material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyStatus {
    pub identity: KeyIdentity,
    pub in_use: bool,
    pub last_used: Timestamp,
}

/// A key currently leased to the holder of this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeasedKey {
    pub identity: KeyIdentity,
    pub material: KeyMaterial,
    pub leased_at: Timestamp,
}

impl From<KeyEntry> for LeasedKey {
    fn from(entry: KeyEntry) -> Self {
        Self {
            identity: entry.identity,
            material: entry.material,
            leased_at: entry.last_used,
        }
    }
}

/// Lease rules applied by the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeasePolicy {
    /// Leases older than this may be taken over by `lease_next`. `None`
    /// keeps a lease until it is explicitly released.
    pub lease_ttl: Option<Duration>,
}

impl LeasePolicy {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            lease_ttl: Some(ttl),
        }
    }

    /// Leases taken before the returned instant count as abandoned.
    pub fn stale_before(&self, now: Timestamp) -> Option<Timestamp> {
        let ttl = chrono::Duration::from_std(self.lease_ttl?).ok()?;
        now.checked_sub_signed(ttl)
    }
}
