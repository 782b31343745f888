//! Lease sources: the transports the lease client polls.

use crate::adapters::http::{KEYS_PATH, NEXT_AVAILABLE_PATH};
use crate::domain::entities::{KeyEntry, LeasedKey};
use crate::domain::errors::KeyRegistryError;
use crate::ports::inbound::KeyRegistryApi;
use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum LeaseError {
    /// Shutdown was requested while waiting for a key.
    #[error("Lease acquisition cancelled")]
    Cancelled,

    /// The poll policy's attempt limit was reached.
    #[error("No key leased after {attempts} attempts")]
    Exhausted { attempts: u32 },

    /// The registry could not be reached.
    #[error("Registry transport error: {0}")]
    Transport(String),

    /// The registry answered with something other than a key entry.
    #[error("Unexpected registry response: {0}")]
    Protocol(String),

    #[error(transparent)]
    Registry(#[from] KeyRegistryError),
}

impl LeaseError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Exhausted { .. } | Self::Cancelled => true,
            Self::Registry(e) => e.is_transient(),
            Self::Protocol(_) => false,
        }
    }
}

impl From<reqwest::Error> for LeaseError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Protocol(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// One lease attempt against a registry.
#[async_trait]
pub trait LeaseSource: Send + Sync {
    /// `Ok(None)` means every key is currently leased.
    async fn try_lease(&self) -> Result<Option<LeasedKey>, LeaseError>;

    /// Release `key` under the lease it was granted with.
    async fn release(&self, key: &LeasedKey) -> Result<(), LeaseError>;
}

#[async_trait]
impl<T: LeaseSource + ?Sized> LeaseSource for Arc<T> {
    async fn try_lease(&self) -> Result<Option<LeasedKey>, LeaseError> {
        (**self).try_lease().await
    }

    async fn release(&self, key: &LeasedKey) -> Result<(), LeaseError> {
        (**self).release(key).await
    }
}

/// Leases over the registry's HTTP control plane.
pub struct HttpLeaseSource {
    client: Client,
    base_url: String,
}

impl HttpLeaseSource {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

    pub fn new(base_url: impl Into<String>) -> Result<Self, LeaseError> {
        let client = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .connect_timeout(Self::CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl LeaseSource for HttpLeaseSource {
    async fn try_lease(&self) -> Result<Option<LeasedKey>, LeaseError> {
        let response = self.client.get(self.url(NEXT_AVAILABLE_PATH)).send().await?;

        // Anything but 200 or 404 is retried: a key may already be marked
        // leased on the registry side, so the batch must not be dropped.
        match response.status() {
            StatusCode::OK => {
                let body = response.bytes().await?;
                serde_json::from_slice::<KeyEntry>(&body)
                    .map(|entry| Some(entry.into()))
                    .map_err(|e| {
                        let identity = serde_json::from_slice::<serde_json::Value>(&body)
                            .ok()
                            .and_then(|v| v.get("identity")?.as_str().map(str::to_string));
                        error!(
                            identity = identity.as_deref().unwrap_or("unknown"),
                            error = %e,
                            "Leased key could not be decoded; the lease is leaked"
                        );
                        LeaseError::Transport(format!("undecodable lease response: {e}"))
                    })
            }
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(LeaseError::Transport(format!("registry returned {status}"))),
        }
    }

    async fn release(&self, key: &LeasedKey) -> Result<(), LeaseError> {
        let leased_at = key.leased_at.to_rfc3339_opts(SecondsFormat::Nanos, true);
        let response = self
            .client
            .put(self.url(KEYS_PATH))
            .query(&[
                ("id", key.identity.as_str()),
                ("inUse", "false"),
                ("leasedAt", leased_at.as_str()),
            ])
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(KeyRegistryError::NotFound(key.identity.clone()).into()),
            status if status.is_server_error() => {
                Err(LeaseError::Transport(format!("registry returned {status}")))
            }
            status => Err(LeaseError::Protocol(format!("registry returned {status}"))),
        }
    }
}

/// Leases from a registry in the same process.
pub struct LocalLeaseSource<A: KeyRegistryApi> {
    registry: A,
}

impl<A: KeyRegistryApi> LocalLeaseSource<A> {
    pub fn new(registry: A) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl<A: KeyRegistryApi> LeaseSource for LocalLeaseSource<A> {
    async fn try_lease(&self) -> Result<Option<LeasedKey>, LeaseError> {
        Ok(self.registry.lease_next().await?.map(LeasedKey::from))
    }

    async fn release(&self, key: &LeasedKey) -> Result<(), LeaseError> {
        self.registry
            .release_lease(&key.identity, key.leased_at)
            .await?;
        Ok(())
    }
}
