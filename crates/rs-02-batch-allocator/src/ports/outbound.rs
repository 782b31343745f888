//! # Outbound Ports (Driven Ports / SPI)
//!
//! The record store is reached through `rs_01_record_store::RecordStore`;
//! the only other dependency is the channel unsigned batches leave on.

use async_trait::async_trait;
use shared_bus::BusError;
use shared_types::UnsignedBatch;

/// Destination for claimed batches.
#[async_trait]
pub trait BatchPublisher: Send + Sync {
    /// Publish one unsigned batch durably.
    async fn publish_unsigned(&self, batch: &UnsignedBatch) -> Result<(), BusError>;
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records published batches; optionally fails from the n-th publish on.
    #[derive(Default)]
    pub struct RecordingPublisher {
        pub published: Mutex<Vec<UnsignedBatch>>,
        fail_from: Option<usize>,
        attempts: AtomicUsize,
    }

    impl RecordingPublisher {
        pub fn failing_from(attempt: usize) -> Self {
            Self {
                fail_from: Some(attempt),
                ..Self::default()
            }
        }

        pub fn batches(&self) -> Vec<UnsignedBatch> {
            self.published.lock().clone()
        }
    }

    #[async_trait]
    impl BatchPublisher for RecordingPublisher {
        async fn publish_unsigned(&self, batch: &UnsignedBatch) -> Result<(), BusError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.fail_from.is_some_and(|n| attempt >= n) {
                return Err(BusError::Closed);
            }
            self.published.lock().push(batch.clone());
            Ok(())
        }
    }
}
