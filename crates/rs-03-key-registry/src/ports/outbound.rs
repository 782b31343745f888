//! # Outbound Ports (Driven Ports / SPI)
//!
//! Traits for the registry's persistence and clock.

use crate::domain::entities::KeyEntry;
use crate::domain::errors::KeyRegistryError;
use chrono::{TimeZone, Utc};
use shared_types::{KeyIdentity, Timestamp};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Persistence for key entries.
///
/// `lease_next` must select and mark in one atomic step so two concurrent
/// callers can never receive the same key.
pub trait KeyStore: Send + Sync {
    /// Delete every entry and insert `entries`. Returns how many were
    /// deleted.
    fn replace_all(&self, entries: Vec<KeyEntry>) -> Result<usize, KeyRegistryError>;

    /// Atomically pick the least recently used leasable key, mark it in use
    /// and stamp `now` as its last use.
    ///
    /// Keys leased before `stale_before` count as leasable.
    fn lease_next(
        &self,
        now: Timestamp,
        stale_before: Option<Timestamp>,
    ) -> Result<Option<KeyEntry>, KeyRegistryError>;

    /// Set the in-use flag and stamp `now` as last use.
    fn set_in_use(
        &self,
        identity: &KeyIdentity,
        in_use: bool,
        now: Timestamp,
    ) -> Result<KeyEntry, KeyRegistryError>;

    /// Free the key only if it is still held under the lease stamped
    /// `leased_at`. Returns the released entry, or `None` when the lease was
    /// already released or reclaimed by another holder.
    fn release_lease(
        &self,
        identity: &KeyIdentity,
        leased_at: Timestamp,
        now: Timestamp,
    ) -> Result<Option<KeyEntry>, KeyRegistryError>;

    /// Delete every entry, returning how many there were.
    fn purge_all(&self) -> Result<usize, KeyRegistryError>;

    fn get(&self, identity: &KeyIdentity) -> Result<Option<KeyEntry>, KeyRegistryError>;

    /// All entries, ordered by identity.
    fn list(&self) -> Result<Vec<KeyEntry>, KeyRegistryError>;
}

impl<T: KeyStore + ?Sized> KeyStore for Arc<T> {
    fn replace_all(&self, entries: Vec<KeyEntry>) -> Result<usize, KeyRegistryError> {
        (**self).replace_all(entries)
    }

    fn lease_next(
        &self,
        now: Timestamp,
        stale_before: Option<Timestamp>,
    ) -> Result<Option<KeyEntry>, KeyRegistryError> {
        (**self).lease_next(now, stale_before)
    }

    fn set_in_use(
        &self,
        identity: &KeyIdentity,
        in_use: bool,
        now: Timestamp,
    ) -> Result<KeyEntry, KeyRegistryError> {
        (**self).set_in_use(identity, in_use, now)
    }

    fn release_lease(
        &self,
        identity: &KeyIdentity,
        leased_at: Timestamp,
        now: Timestamp,
    ) -> Result<Option<KeyEntry>, KeyRegistryError> {
        (**self).release_lease(identity, leased_at, now)
    }

    fn purge_all(&self) -> Result<usize, KeyRegistryError> {
        (**self).purge_all()
    }

    fn get(&self, identity: &KeyIdentity) -> Result<Option<KeyEntry>, KeyRegistryError> {
        (**self).get(identity)
    }

    fn list(&self) -> Result<Vec<KeyEntry>, KeyRegistryError> {
        (**self).list()
    }
}

/// Time source abstraction for testability.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualTimeSource {
    millis: AtomicI64,
}

impl ManualTimeSource {
    pub fn new(start: Timestamp) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let ms = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Default for ManualTimeSource {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Timestamp {
        let ms = self.millis.load(Ordering::SeqCst);
        Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
