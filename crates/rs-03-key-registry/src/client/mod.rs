//! # Key Lease Client
//!
//! Blocking-until-leased acquisition on top of a [`LeaseSource`].
//!
//! ```text
//! acquire ──try_lease──→ Some(key) ──→ Lease
//!    ↑          │
//!    │     None / Err
//!    │          ↓
//!    └── sleep(delay_for(n)) ←── cancelled? ──→ LeaseError::Cancelled
//! ```
//!
//! "Not available" and transport errors are both retried; the registry being
//! briefly unreachable looks the same to a signer as every key being busy.

pub mod policy;
pub mod source;

pub use policy::LeasePollPolicy;
pub use source::{HttpLeaseSource, LeaseError, LeaseSource, LocalLeaseSource};

use crate::domain::entities::LeasedKey;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A leased key plus what it took to get it.
#[derive(Debug, Clone)]
pub struct Lease {
    pub key: LeasedKey,
    /// Calls made to the source, including the successful one.
    pub attempts: u32,
    pub waited: Duration,
}

pub struct KeyLeaseClient<S: LeaseSource> {
    source: S,
    policy: LeasePollPolicy,
}

impl<S: LeaseSource> KeyLeaseClient<S> {
    pub fn new(source: S, policy: LeasePollPolicy) -> Self {
        Self { source, policy }
    }

    pub fn policy(&self) -> &LeasePollPolicy {
        &self.policy
    }

    /// Poll the source until a key is leased, the token is cancelled or the
    /// attempt limit is reached.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<Lease, LeaseError> {
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(LeaseError::Cancelled);
            }

            let outcome = self.source.try_lease().await;
            attempts = attempts.saturating_add(1);

            match outcome {
                Ok(Some(key)) => {
                    debug!(identity = %key.identity, attempts, "Key lease acquired");
                    return Ok(Lease {
                        key,
                        attempts,
                        waited: started.elapsed(),
                    });
                }
                Ok(None) => debug!(attempts, "No key available, retrying"),
                Err(e) if e.is_transient() => {
                    warn!(attempts, error = %e, "Key lease attempt failed, retrying")
                }
                Err(e) => return Err(e),
            }

            if !self.policy.allows(attempts) {
                warn!(attempts, "Key lease attempts exhausted");
                return Err(LeaseError::Exhausted { attempts });
            }

            let delay = self.policy.delay_for(attempts - 1);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(LeaseError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Return a leased key to the registry. Not retried; the caller decides
    /// what a failed release means for its message.
    ///
    /// Only this lease is released: if the registry has since reclaimed the
    /// key for another holder, the key stays with them.
    pub async fn release(&self, key: &LeasedKey) -> Result<(), LeaseError> {
        self.source.release(key).await?;
        debug!(identity = %key.identity, "Key lease released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryKeyStore;
    use crate::domain::entities::LeasePolicy;
    use crate::domain::errors::KeyRegistryError;
    use crate::ports::inbound::KeyRegistryApi;
    use crate::ports::outbound::SystemTimeSource;
    use crate::service::KeyRegistryService;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Source that replays scripted outcomes and then reports "not available".
    #[derive(Default)]
    struct ScriptedSource {
        script: Mutex<VecDeque<Result<Option<LeasedKey>, LeaseError>>>,
        calls: Mutex<Vec<Instant>>,
    }

    impl ScriptedSource {
        fn push(&self, outcome: Result<Option<LeasedKey>, LeaseError>) {
            self.script.lock().push_back(outcome);
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl LeaseSource for ScriptedSource {
        async fn try_lease(&self) -> Result<Option<LeasedKey>, LeaseError> {
            self.calls.lock().push(Instant::now());
            self.script.lock().pop_front().unwrap_or(Ok(None))
        }

        async fn release(&self, _key: &LeasedKey) -> Result<(), LeaseError> {
            Ok(())
        }
    }

    fn leased_key() -> LeasedKey {
        crate::domain::entities::KeyEntry::generate(chrono::Utc::now()).into()
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_unavailable_and_transport_errors() {
        let source = Arc::new(ScriptedSource::default());
        source.push(Ok(None));
        source.push(Err(LeaseError::Transport("connection refused".into())));
        let key = leased_key();
        source.push(Ok(Some(key.clone())));

        let client = KeyLeaseClient::new(source.clone(), LeasePollPolicy::default());
        let lease = client.acquire(&CancellationToken::new()).await.unwrap();

        assert_eq!(lease.key.identity, key.identity);
        assert_eq!(lease.attempts, 3);
        assert!(lease.waited >= Duration::from_millis(180 + 360));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let source = Arc::new(ScriptedSource::default());
        source.push(Err(LeaseError::Protocol("418".into())));

        let client = KeyLeaseClient::new(source.clone(), LeasePollPolicy::default());
        let err = client.acquire(&CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, LeaseError::Protocol(_)));
        assert_eq!(source.call_times().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_limit_exhausts() {
        let source = Arc::new(ScriptedSource::default());
        let client = KeyLeaseClient::new(
            source.clone(),
            LeasePollPolicy::default().with_max_attempts(4),
        );

        let err = client.acquire(&CancellationToken::new()).await.unwrap_err();

        assert!(matches!(err, LeaseError::Exhausted { attempts: 4 }));
        assert_eq!(source.call_times().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_is_capped() {
        let source = Arc::new(ScriptedSource::default());
        let policy = LeasePollPolicy {
            max_delay: Duration::from_millis(800),
            ..LeasePollPolicy::default()
        }
        .with_max_attempts(8);
        let client = KeyLeaseClient::new(source.clone(), policy);

        let _ = client.acquire(&CancellationToken::new()).await;

        let times = source.call_times();
        let gaps: Vec<Duration> = times.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(gaps.len(), 7);
        assert!(gaps.iter().all(|g| *g <= Duration::from_millis(800)));
        // later gaps sit at the cap, minus jitter
        assert!(gaps[6] >= Duration::from_millis(720));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_ends_polling() {
        let source = Arc::new(ScriptedSource::default());
        let client = KeyLeaseClient::new(source.clone(), LeasePollPolicy::default());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = client.acquire(&cancel).await.unwrap_err();

        assert!(matches!(err, LeaseError::Cancelled));
        // woken by the token, not by the next scheduled poll
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_already_cancelled_never_polls() {
        let source = Arc::new(ScriptedSource::default());
        let client = KeyLeaseClient::new(source.clone(), LeasePollPolicy::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(matches!(
            client.acquire(&cancel).await,
            Err(LeaseError::Cancelled)
        ));
        assert!(source.call_times().is_empty());
    }

    #[tokio::test]
    async fn test_waiter_gets_key_after_release() {
        let registry = Arc::new(KeyRegistryService::new(
            InMemoryKeyStore::new(),
            SystemTimeSource,
            LeasePolicy::default(),
        ));
        registry.generate_keys(1).await.unwrap();
        let policy = LeasePollPolicy {
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(20),
            ..LeasePollPolicy::default()
        };
        let client = Arc::new(KeyLeaseClient::new(
            LocalLeaseSource::new(registry.clone()),
            policy,
        ));
        let cancel = CancellationToken::new();

        let held = client.acquire(&cancel).await.unwrap();
        let waiter = {
            let client = client.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { client.acquire(&cancel).await })
        };

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!waiter.is_finished());
        client.release(&held.key).await.unwrap();

        let second = tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(second.key.identity, held.key.identity);
        assert!(second.attempts > 1);
    }

    #[tokio::test]
    async fn test_release_unknown_key_surfaces() {
        let registry = Arc::new(KeyRegistryService::new(
            InMemoryKeyStore::new(),
            SystemTimeSource,
            LeasePolicy::default(),
        ));
        let client = KeyLeaseClient::new(LocalLeaseSource::new(registry), LeasePollPolicy::default());

        let err = client.release(&leased_key()).await.unwrap_err();
        assert!(matches!(
            err,
            LeaseError::Registry(KeyRegistryError::NotFound(_))
        ));
    }
}
