//! # Pipeline Container
//!
//! Holds one instance of every stage, wired in dependency order:
//!
//! ```text
//! bus, record store, key registry      (no dependencies)
//!   → allocator (store, bus)
//!   → signer    (lease client → registry, bus)
//!   → keeper    (store)
//! ```
//!
//! The signer reaches the registry through a [`KeyLeaseClient`]: in-process
//! by default, over HTTP when a remote registry URL is configured.

use crate::container::config::RuntimeConfig;
use crate::RuntimeError;
use rs_01_record_store::{InMemoryRecordStore, RecordStore};
use rs_02_batch_allocator::{BatchAllocatorService, BusBatchPublisher};
use rs_03_key_registry::{
    HttpLeaseSource, InMemoryKeyStore, KeyLeaseClient, KeyRegistryApi, KeyRegistryService,
    LocalLeaseSource, SystemTimeSource,
};
use rs_04_signer::{BusSignedBatchPublisher, KeyLeaseGateway, SignerService};
use rs_05_record_keeper::RecordKeeperService;
use shared_bus::{
    publish_payload, InMemoryMessageBus, MessageProperties, PipelineQueue,
};
use shared_types::{BatchRequest, RecordId};
use std::sync::Arc;
use tracing::info;

/// Key registry served by this process.
pub type LocalRegistry = KeyRegistryService<InMemoryKeyStore, SystemTimeSource>;

pub type Allocator =
    BatchAllocatorService<Arc<InMemoryRecordStore>, BusBatchPublisher<InMemoryMessageBus>>;

pub type Signer = SignerService<
    Arc<dyn KeyLeaseGateway>,
    BusSignedBatchPublisher<InMemoryMessageBus>,
    SystemTimeSource,
>;

pub type Keeper = RecordKeeperService<Arc<InMemoryRecordStore>>;

/// Every stage of the pipeline, sharing one bus and one record store.
pub struct PipelineContainer {
    pub config: RuntimeConfig,
    pub bus: InMemoryMessageBus,
    pub records: Arc<InMemoryRecordStore>,
    pub registry: Arc<LocalRegistry>,
    pub allocator: Arc<Allocator>,
    pub signer: Arc<Signer>,
    pub keeper: Arc<Keeper>,
}

impl PipelineContainer {
    /// Build the pipeline over an empty record store.
    pub fn new(config: RuntimeConfig) -> Result<Self, RuntimeError> {
        Self::with_records(config, Arc::new(InMemoryRecordStore::new()))
    }

    /// Build the pipeline over an existing record store.
    pub fn with_records(
        config: RuntimeConfig,
        records: Arc<InMemoryRecordStore>,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;

        let bus = InMemoryMessageBus::with_pipeline_topology(config.bus.clone());

        let registry = Arc::new(KeyRegistryService::new(
            InMemoryKeyStore::new(),
            SystemTimeSource,
            config.registry.lease_policy(),
        ));

        let allocator = Arc::new(BatchAllocatorService::new(
            Arc::clone(&records),
            BusBatchPublisher::new(bus.clone()),
            config.allocator.clone(),
        )?);

        let leases: Arc<dyn KeyLeaseGateway> = match &config.registry.remote_url {
            Some(url) => {
                info!(registry = %url, "Signer leases keys over HTTP");
                Arc::new(KeyLeaseClient::new(
                    HttpLeaseSource::new(url.as_str())?,
                    config.lease.clone(),
                ))
            }
            None => Arc::new(KeyLeaseClient::new(
                LocalLeaseSource::new(Arc::clone(&registry)),
                config.lease.clone(),
            )),
        };
        let signer = Arc::new(SignerService::new(
            leases,
            BusSignedBatchPublisher::new(bus.clone()),
            SystemTimeSource,
        ));

        let keeper = Arc::new(RecordKeeperService::new(Arc::clone(&records)));

        info!(
            exchange = %config.bus.exchange,
            max_batch_size = config.allocator.max_batch_size,
            "Pipeline container built"
        );

        Ok(Self {
            config,
            bus,
            records,
            registry,
            allocator,
            signer,
            keeper,
        })
    }

    /// Generate the configured number of keys in the local registry.
    ///
    /// Skipped when the signer leases from a remote registry.
    pub async fn seed_keys(&self) -> Result<usize, RuntimeError> {
        let count = self.config.registry.seed_keys;
        if count == 0 || self.config.registry.remote_url.is_some() {
            return Ok(0);
        }
        let keys = self.registry.generate_keys(count).await?;
        info!(keys = keys.len(), "Signing keys generated");
        Ok(keys.len())
    }

    /// Add unclaimed records to the store.
    pub async fn ingest(&self, payloads: Vec<String>) -> Result<Vec<RecordId>, RuntimeError> {
        Ok(self.records.insert_records(payloads).await?)
    }

    /// Publish a control message asking for `count` records to be batched.
    pub async fn request_batches(&self, count: i64) -> Result<(), RuntimeError> {
        publish_payload(
            &self.bus,
            PipelineQueue::BatchRequests.routing_key(),
            &BatchRequest::new(count),
            MessageProperties::persistent_json(),
        )
        .await?;
        Ok(())
    }
}
