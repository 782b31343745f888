//! # Key Registry Service
//!
//! Application service implementing `KeyRegistryApi` over a key store and
//! a clock.

use crate::domain::entities::{KeyEntry, KeyStatus, LeasePolicy};
use crate::domain::errors::KeyRegistryError;
use crate::ports::inbound::KeyRegistryApi;
use crate::ports::outbound::{KeyStore, TimeSource};
use async_trait::async_trait;
use shared_types::{KeyIdentity, Timestamp};
use tracing::{debug, info, warn};

pub struct KeyRegistryService<S: KeyStore, T: TimeSource> {
    store: S,
    clock: T,
    policy: LeasePolicy,
}

impl<S: KeyStore, T: TimeSource> KeyRegistryService<S, T> {
    pub fn new(store: S, clock: T, policy: LeasePolicy) -> Self {
        if let Some(ttl) = policy.lease_ttl {
            info!(ttl_secs = ttl.as_secs(), "Stale lease reclaim enabled");
        }
        Self {
            store,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &LeasePolicy {
        &self.policy
    }
}

#[async_trait]
impl<S: KeyStore, T: TimeSource> KeyRegistryApi for KeyRegistryService<S, T> {
    async fn generate_keys(&self, count: usize) -> Result<Vec<KeyStatus>, KeyRegistryError> {
        if count == 0 {
            return Err(KeyRegistryError::InvalidCount(count));
        }
        let now = self.clock.now();
        let entries: Vec<KeyEntry> = (0..count).map(|_| KeyEntry::generate(now)).collect();
        let statuses = entries.iter().map(KeyEntry::status).collect();

        let purged = self.store.replace_all(entries)?;
        info!(generated = count, purged, "Key registry regenerated");
        Ok(statuses)
    }

    async fn lease_next(&self) -> Result<Option<KeyEntry>, KeyRegistryError> {
        let now = self.clock.now();
        let stale_before = self.policy.stale_before(now);
        let leased = self.store.lease_next(now, stale_before)?;

        match &leased {
            Some(entry) => debug!(identity = %entry.identity, "Key leased"),
            None => debug!("No key available for lease"),
        }
        Ok(leased)
    }

    async fn release(&self, identity: &KeyIdentity) -> Result<KeyStatus, KeyRegistryError> {
        let entry = self.store.set_in_use(identity, false, self.clock.now())?;
        debug!(identity = %identity, "Key released");
        Ok(entry.status())
    }

    async fn release_lease(
        &self,
        identity: &KeyIdentity,
        leased_at: Timestamp,
    ) -> Result<KeyStatus, KeyRegistryError> {
        if let Some(entry) = self.store.release_lease(identity, leased_at, self.clock.now())? {
            debug!(identity = %identity, "Key released");
            return Ok(entry.status());
        }
        let current = self
            .store
            .get(identity)?
            .ok_or_else(|| KeyRegistryError::NotFound(identity.clone()))?;
        if current.in_use {
            warn!(
                identity = %identity,
                %leased_at,
                "Stale release ignored; key is held under a newer lease"
            );
        }
        Ok(current.status())
    }

    async fn set_in_use(
        &self,
        identity: &KeyIdentity,
        in_use: bool,
    ) -> Result<KeyStatus, KeyRegistryError> {
        let entry = self.store.set_in_use(identity, in_use, self.clock.now())?;
        info!(identity = %identity, in_use, "Key re-marked");
        Ok(entry.status())
    }

    async fn purge_all(&self) -> Result<usize, KeyRegistryError> {
        let leased = self
            .store
            .list()?
            .iter()
            .filter(|e| e.in_use)
            .count();
        if leased > 0 {
            warn!(leased, "Purging registry while keys are leased");
        }
        let purged = self.store.purge_all()?;
        info!(purged, "Key registry purged");
        Ok(purged)
    }

    async fn list_keys(&self) -> Result<Vec<KeyStatus>, KeyRegistryError> {
        Ok(self.store.list()?.iter().map(KeyEntry::status).collect())
    }
}
