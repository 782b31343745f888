//! # Signing Runtime Library
//!
//! Wiring for the record-signing pipeline. The `signing-runtime` binary is a
//! thin shell over [`SigningRuntime`]; integration tests drive the same
//! type.
//!
//! ## Flow
//!
//! ```text
//! PUT /api/batches/N
//!        │
//!        ↓
//! [batch-requests] ──→ Allocator(2) ──→ [unsigned-batches] ──→ Signer(4) ──→ [signed-batches] ──→ Keeper(5)
//!                          │                                     │  ↑                                │
//!                     RecordStore(1) ←───────────────────────────┼──┼────────────────────────────────┘
//!                                                                ↓  │
//!                                                         KeyRegistry(3) (lease / release)
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Load configuration from `SG_*` variables and validate it
//! 2. Initialize logging and metrics
//! 3. Build the container (bus, stores, stages) and seed signing keys
//! 4. Spawn one consumer loop per stage
//! 5. Serve the control plane until Ctrl-C / SIGTERM
//!
//! ## Shutdown
//!
//! One cancellation token stops the consumer loops and the control plane.
//! A delivery being handled finishes or is abandoned unacknowledged; the
//! bus redelivers it to the next consumer.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod container;
pub mod error;
pub mod handlers;
pub mod http;

pub use container::{ConfigError, PipelineContainer, RuntimeConfig};
pub use error::RuntimeError;
pub use handlers::{run_consumer, ConsumerStats, StageHandler};

use axum::Router;
use rs_02_batch_allocator::ControlMessageHandler;
use rs_04_signer::UnsignedBatchHandler;
use rs_05_record_keeper::SignedBatchHandler;
use shared_bus::PipelineQueue;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long shutdown waits for each consumer loop before aborting it.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Running pipeline: the container plus one consumer task per stage.
pub struct SigningRuntime {
    container: Arc<PipelineContainer>,
    cancel: CancellationToken,
    consumers: Vec<(&'static str, JoinHandle<ConsumerStats>)>,
}

impl SigningRuntime {
    pub fn new(container: Arc<PipelineContainer>) -> Self {
        Self {
            container,
            cancel: CancellationToken::new(),
            consumers: Vec::new(),
        }
    }

    pub fn container(&self) -> &Arc<PipelineContainer> {
        &self.container
    }

    /// Token that stops the runtime; hand it to anything that should stop
    /// with the pipeline.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Control-plane router over this runtime's container.
    pub fn control_plane(&self) -> Router {
        http::control_plane(Arc::clone(&self.container))
    }

    /// Attach a consumer to each stage queue and spawn its loop.
    pub fn start(&mut self) -> Result<(), RuntimeError> {
        if !self.consumers.is_empty() {
            return Err(RuntimeError::AlreadyStarted);
        }
        let container = &self.container;
        let bus = &container.bus;

        let allocator = bus.consume(PipelineQueue::BatchRequests.queue_name())?;
        let signer = bus.consume(PipelineQueue::UnsignedBatches.queue_name())?;
        let keeper = bus.consume(PipelineQueue::SignedBatches.queue_name())?;

        self.consumers.push((
            "allocator",
            tokio::spawn(run_consumer(
                allocator,
                ControlMessageHandler::new(Arc::clone(&container.allocator)),
                self.cancel.clone(),
            )),
        ));
        self.consumers.push((
            "signer",
            tokio::spawn(run_consumer(
                signer,
                UnsignedBatchHandler::new(Arc::clone(&container.signer)),
                self.cancel.clone(),
            )),
        ));
        self.consumers.push((
            "keeper",
            tokio::spawn(run_consumer(
                keeper,
                SignedBatchHandler::new(Arc::clone(&container.keeper)),
                self.cancel.clone(),
            )),
        ));

        info!(stages = self.consumers.len(), "Pipeline started");
        Ok(())
    }

    /// Cancel every stage and wait for its loop to end.
    pub async fn shutdown(self) -> Vec<(&'static str, ConsumerStats)> {
        info!("Pipeline shutting down");
        self.cancel.cancel();

        let mut stats = Vec::with_capacity(self.consumers.len());
        for (stage, mut handle) in self.consumers {
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await {
                Ok(Ok(consumer)) => stats.push((stage, consumer)),
                Ok(Err(e)) => warn!(stage, error = %e, "Consumer task failed"),
                Err(_) => {
                    warn!(stage, "Consumer did not stop in time, aborting");
                    handle.abort();
                }
            }
        }
        info!("Pipeline stopped");
        stats
    }
}
