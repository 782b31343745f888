use crate::domain::entities::KeyEntry;
use crate::domain::errors::KeyRegistryError;
use crate::domain::lease::select_candidate;
use crate::ports::outbound::KeyStore;
use parking_lot::Mutex;
use shared_types::{KeyIdentity, Timestamp};
use std::collections::BTreeMap;

/// In-process key store.
///
/// One mutex guards the whole table, so lease selection and marking are a
/// single atomic step.
#[derive(Default)]
pub struct InMemoryKeyStore {
    keys: Mutex<BTreeMap<KeyIdentity, KeyEntry>>,
}

impl InMemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for InMemoryKeyStore {
    fn replace_all(&self, entries: Vec<KeyEntry>) -> Result<usize, KeyRegistryError> {
        let mut keys = self.keys.lock();
        let purged = keys.len();
        *keys = entries
            .into_iter()
            .map(|e| (e.identity.clone(), e))
            .collect();
        Ok(purged)
    }

    fn lease_next(
        &self,
        now: Timestamp,
        stale_before: Option<Timestamp>,
    ) -> Result<Option<KeyEntry>, KeyRegistryError> {
        let mut keys = self.keys.lock();
        let Some(identity) = select_candidate(keys.values(), stale_before).map(|e| e.identity.clone())
        else {
            return Ok(None);
        };
        let Some(entry) = keys.get_mut(&identity) else {
            return Ok(None);
        };
        entry.in_use = true;
        entry.last_used = now;
        Ok(Some(entry.clone()))
    }

    fn set_in_use(
        &self,
        identity: &KeyIdentity,
        in_use: bool,
        now: Timestamp,
    ) -> Result<KeyEntry, KeyRegistryError> {
        let mut keys = self.keys.lock();
        let entry = keys
            .get_mut(identity)
            .ok_or_else(|| KeyRegistryError::NotFound(identity.clone()))?;
        entry.in_use = in_use;
        entry.last_used = now;
        Ok(entry.clone())
    }

    fn release_lease(
        &self,
        identity: &KeyIdentity,
        leased_at: Timestamp,
        now: Timestamp,
    ) -> Result<Option<KeyEntry>, KeyRegistryError> {
        let mut keys = self.keys.lock();
        let entry = keys
            .get_mut(identity)
            .ok_or_else(|| KeyRegistryError::NotFound(identity.clone()))?;
        if !entry.in_use || entry.last_used != leased_at {
            return Ok(None);
        }
        entry.in_use = false;
        entry.last_used = now;
        Ok(Some(entry.clone()))
    }

    fn purge_all(&self) -> Result<usize, KeyRegistryError> {
        let mut keys = self.keys.lock();
        let count = keys.len();
        keys.clear();
        Ok(count)
    }

    fn get(&self, identity: &KeyIdentity) -> Result<Option<KeyEntry>, KeyRegistryError> {
        Ok(self.keys.lock().get(identity).cloned())
    }

    fn list(&self) -> Result<Vec<KeyEntry>, KeyRegistryError> {
        Ok(self.keys.lock().values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_lease_marks_and_excludes() {
        let store = InMemoryKeyStore::new();
        let now = Utc::now();
        store
            .replace_all(vec![KeyEntry::generate(now), KeyEntry::generate(now)])
            .unwrap();

        let first = store.lease_next(now, None).unwrap().unwrap();
        let second = store.lease_next(now, None).unwrap().unwrap();

        assert!(first.in_use && second.in_use);
        assert_ne!(first.identity, second.identity);
        assert!(store.lease_next(now, None).unwrap().is_none());
    }

    #[test]
    fn test_replace_reports_purged() {
        let store = InMemoryKeyStore::new();
        let now = Utc::now();
        store.replace_all(vec![KeyEntry::generate(now)]).unwrap();

        let purged = store
            .replace_all(vec![KeyEntry::generate(now), KeyEntry::generate(now)])
            .unwrap();

        assert_eq!(purged, 1);
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn test_set_in_use_unknown_key() {
        let store = InMemoryKeyStore::new();
        let missing = KeyIdentity::new("missing");

        assert_eq!(
            store.set_in_use(&missing, false, Utc::now()),
            Err(KeyRegistryError::NotFound(missing))
        );
    }

    #[test]
    fn test_release_lease_checks_stamp() {
        let store = InMemoryKeyStore::new();
        let now = Utc::now();
        store.replace_all(vec![KeyEntry::generate(now)]).unwrap();
        let leased = store.lease_next(now, None).unwrap().unwrap();
        let later = now + chrono::Duration::seconds(1);

        let wrong_stamp = store
            .release_lease(&leased.identity, later, later)
            .unwrap();
        assert!(wrong_stamp.is_none());
        assert!(store.get(&leased.identity).unwrap().unwrap().in_use);

        let released = store
            .release_lease(&leased.identity, leased.last_used, later)
            .unwrap()
            .unwrap();
        assert!(!released.in_use);
        assert_eq!(released.last_used, later);

        // a repeat by the same holder finds the key free and changes nothing
        assert!(store
            .release_lease(&leased.identity, leased.last_used, later)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_purge_all() {
        let store = InMemoryKeyStore::new();
        store
            .replace_all(vec![KeyEntry::generate(Utc::now())])
            .unwrap();

        assert_eq!(store.purge_all().unwrap(), 1);
        assert_eq!(store.purge_all().unwrap(), 0);
    }
}
