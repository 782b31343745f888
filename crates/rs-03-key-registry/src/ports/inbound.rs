//! # Inbound Ports (Driving Ports / API)

use crate::domain::entities::{KeyEntry, KeyStatus};
use crate::domain::errors::KeyRegistryError;
use async_trait::async_trait;
use shared_types::{KeyIdentity, Timestamp};
use std::sync::Arc;

#[async_trait]
pub trait KeyRegistryApi: Send + Sync {
    /// Replace the registry with `count` freshly generated free keys.
    async fn generate_keys(&self, count: usize) -> Result<Vec<KeyStatus>, KeyRegistryError>;

    /// Lease the least recently used free key. `Ok(None)` when every key is
    /// leased; callers retry later.
    async fn lease_next(&self) -> Result<Option<KeyEntry>, KeyRegistryError>;

    /// Return a leased key to the pool. Releasing a free key is a no-op
    /// apart from refreshing its last use.
    async fn release(&self, identity: &KeyIdentity) -> Result<KeyStatus, KeyRegistryError>;

    /// Release the lease the caller was granted at `leased_at`.
    ///
    /// A stale stamp means the key has since been released or reclaimed and
    /// leased to someone else; the call then changes nothing and returns the
    /// key's current status.
    async fn release_lease(
        &self,
        identity: &KeyIdentity,
        leased_at: Timestamp,
    ) -> Result<KeyStatus, KeyRegistryError>;

    /// Administrative re-mark of a key's in-use flag.
    async fn set_in_use(
        &self,
        identity: &KeyIdentity,
        in_use: bool,
    ) -> Result<KeyStatus, KeyRegistryError>;

    /// Delete every key. The caller ensures no lease is outstanding.
    async fn purge_all(&self) -> Result<usize, KeyRegistryError>;

    async fn list_keys(&self) -> Result<Vec<KeyStatus>, KeyRegistryError>;
}

#[async_trait]
impl<T: KeyRegistryApi + ?Sized> KeyRegistryApi for Arc<T> {
    async fn generate_keys(&self, count: usize) -> Result<Vec<KeyStatus>, KeyRegistryError> {
        (**self).generate_keys(count).await
    }

    async fn lease_next(&self) -> Result<Option<KeyEntry>, KeyRegistryError> {
        (**self).lease_next().await
    }

    async fn release(&self, identity: &KeyIdentity) -> Result<KeyStatus, KeyRegistryError> {
        (**self).release(identity).await
    }

    async fn release_lease(
        &self,
        identity: &KeyIdentity,
        leased_at: Timestamp,
    ) -> Result<KeyStatus, KeyRegistryError> {
        (**self).release_lease(identity, leased_at).await
    }

    async fn set_in_use(
        &self,
        identity: &KeyIdentity,
        in_use: bool,
    ) -> Result<KeyStatus, KeyRegistryError> {
        (**self).set_in_use(identity, in_use).await
    }

    async fn purge_all(&self) -> Result<usize, KeyRegistryError> {
        (**self).purge_all().await
    }

    async fn list_keys(&self) -> Result<Vec<KeyStatus>, KeyRegistryError> {
        (**self).list_keys().await
    }
}
