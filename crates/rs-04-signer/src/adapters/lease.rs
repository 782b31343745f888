//! Key lease gateway backed by the registry's lease client.

use crate::ports::outbound::KeyLeaseGateway;
use async_trait::async_trait;
use rs_03_key_registry::{KeyLeaseClient, Lease, LeaseError, LeaseSource, LeasedKey};
use tokio_util::sync::CancellationToken;

#[async_trait]
impl<S: LeaseSource> KeyLeaseGateway for KeyLeaseClient<S> {
    async fn acquire(&self, cancel: &CancellationToken) -> Result<Lease, LeaseError> {
        KeyLeaseClient::acquire(self, cancel).await
    }

    async fn release(&self, key: &LeasedKey) -> Result<(), LeaseError> {
        KeyLeaseClient::release(self, key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rs_03_key_registry::{
        InMemoryKeyStore, KeyRegistryApi, KeyRegistryService, LeasePolicy, LeasePollPolicy,
        LocalLeaseSource, SystemTimeSource,
    };
    use std::sync::Arc;

    #[tokio::test]
    async fn test_gateway_leases_from_registry() {
        let registry = Arc::new(KeyRegistryService::new(
            InMemoryKeyStore::new(),
            SystemTimeSource,
            LeasePolicy::default(),
        ));
        registry.generate_keys(1).await.unwrap();
        let gateway: Arc<dyn KeyLeaseGateway> = Arc::new(KeyLeaseClient::new(
            LocalLeaseSource::new(registry.clone()),
            LeasePollPolicy::default(),
        ));

        let lease = gateway.acquire(&CancellationToken::new()).await.unwrap();
        assert!(registry.list_keys().await.unwrap()[0].in_use);

        gateway.release(&lease.key).await.unwrap();
        assert!(!registry.list_keys().await.unwrap()[0].in_use);
    }
}
