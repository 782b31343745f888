//! # Batch Allocator Service
//!
//! Application service implementing `BatchAllocatorApi` over a record store
//! and a batch publisher.

use crate::domain::entities::{AllocationReport, AllocatorConfig};
use crate::domain::errors::AllocatorError;
use crate::ports::inbound::BatchAllocatorApi;
use crate::ports::outbound::BatchPublisher;
use async_trait::async_trait;
use rs_01_record_store::{ClaimedBatch, RecordStore};
use shared_types::BatchRequest;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub struct BatchAllocatorService<S: RecordStore, P: BatchPublisher> {
    store: S,
    publisher: P,
    config: AllocatorConfig,
    /// Held for the duration of a run.
    run_lock: Mutex<()>,
}

impl<S: RecordStore, P: BatchPublisher> BatchAllocatorService<S, P> {
    pub fn new(store: S, publisher: P, config: AllocatorConfig) -> Result<Self, AllocatorError> {
        if config.max_batch_size == 0 {
            return Err(AllocatorError::InvalidConfig(
                "max_batch_size must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            store,
            publisher,
            config,
            run_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    async fn publish(&self, batch: &ClaimedBatch) -> Result<(), AllocatorError> {
        self.publisher
            .publish_unsigned(&batch.to_unsigned())
            .await
            .map_err(|source| {
                error!(
                    batch_id = %batch.batch_id,
                    records = batch.len(),
                    error = %source,
                    "Claimed batch not published; its records remain claimed"
                );
                AllocatorError::Publish {
                    batch_id: batch.batch_id,
                    source,
                }
            })
    }
}

#[async_trait]
impl<S: RecordStore, P: BatchPublisher> BatchAllocatorApi for BatchAllocatorService<S, P> {
    async fn claim_batch(&self, max_size: usize) -> Result<Option<ClaimedBatch>, AllocatorError> {
        Ok(self.store.claim_batch(max_size).await?)
    }

    async fn run_allocation(
        &self,
        request: BatchRequest,
        cancel: &CancellationToken,
    ) -> Result<AllocationReport, AllocatorError> {
        let mut report = AllocationReport::new(request.effective_count());

        let _run = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                report.cancelled = true;
                return Ok(report);
            }
            guard = self.run_lock.lock() => guard,
        };

        let mut remaining = report.requested;
        while remaining > 0 {
            if cancel.is_cancelled() {
                warn!(
                    claimed = report.claimed,
                    remaining,
                    "Allocation run interrupted by shutdown"
                );
                report.cancelled = true;
                break;
            }

            let size = remaining.min(self.config.max_batch_size);
            let batch = match self.store.claim_batch(size).await {
                Ok(Some(batch)) => batch,
                Ok(None) => {
                    debug!(remaining, "Record store has no more claimable records");
                    break;
                }
                Err(e) => return Err(AllocatorError::from(e).after_claiming(report.claimed)),
            };

            if let Err(e) = self.publish(&batch).await {
                return Err(e.after_claiming(report.claimed + batch.len()));
            }
            remaining = remaining.saturating_sub(batch.len());
            report.record(&batch);
        }

        info!(
            requested = report.requested,
            claimed = report.claimed,
            batches = report.batches(),
            "Allocation run finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::outbound::mocks::RecordingPublisher;
    use rs_01_record_store::InMemoryRecordStore;
    use shared_bus::BusError;
    use shared_types::{BatchId, UnsignedBatch};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn service(
        records: usize,
        max_batch_size: usize,
    ) -> BatchAllocatorService<Arc<InMemoryRecordStore>, RecordingPublisher> {
        let store = Arc::new(InMemoryRecordStore::with_records(
            (0..records).map(|i| format!("r{i}")),
        ));
        BatchAllocatorService::new(
            store,
            RecordingPublisher::default(),
            AllocatorConfig { max_batch_size },
        )
        .unwrap()
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let result = BatchAllocatorService::new(
            Arc::new(InMemoryRecordStore::new()),
            RecordingPublisher::default(),
            AllocatorConfig { max_batch_size: 0 },
        );
        assert!(matches!(result, Err(AllocatorError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_single_batch_when_request_fits() {
        let service = service(5, 100);

        let report = service
            .run_allocation(BatchRequest::new(5), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.claimed, 5);
        assert_eq!(report.batch_ids, vec![BatchId(1)]);
        let published = service.publisher.batches();
        assert_eq!(published.len(), 1);
        let ids: Vec<_> = published[0].records.iter().map(|r| r.record_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_request_split_by_max_batch_size() {
        let service = service(10, 4);

        let report = service
            .run_allocation(BatchRequest::new(10), &CancellationToken::new())
            .await
            .unwrap();

        let sizes: Vec<_> = service.publisher.batches().iter().map(UnsignedBatch::len).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
        assert_eq!(report.batch_ids, vec![BatchId(1), BatchId(2), BatchId(3)]);
    }

    #[tokio::test]
    async fn test_run_stops_when_store_runs_dry() {
        let service = service(3, 2);

        let report = service
            .run_allocation(BatchRequest::new(50), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.requested, 50);
        assert_eq!(report.claimed, 3);
        assert!(!report.cancelled);
    }

    #[tokio::test]
    async fn test_request_smaller_than_available() {
        let service = service(10, 100);

        let report = service
            .run_allocation(BatchRequest::new(4), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.claimed, 4);
        assert_eq!(service.store.unclaimed_count().await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_empty_store_publishes_nothing() {
        let service = service(0, 10);

        let report = service
            .run_allocation(BatchRequest::new(5), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.claimed, 0);
        assert!(service.publisher.batches().is_empty());
    }

    #[tokio::test]
    async fn test_non_positive_request_is_noop() {
        let service = service(5, 10);

        let report = service
            .run_allocation(BatchRequest::new(-1), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report, AllocationReport::new(0));
        assert_eq!(service.store.unclaimed_count().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_publish_failure_aborts_run() {
        let store = Arc::new(InMemoryRecordStore::with_records(["a", "b", "c", "d"]));
        let service = BatchAllocatorService::new(
            store.clone(),
            RecordingPublisher::failing_from(1),
            AllocatorConfig { max_batch_size: 2 },
        )
        .unwrap();

        let err = service
            .run_allocation(BatchRequest::new(4), &CancellationToken::new())
            .await
            .unwrap_err();

        let AllocatorError::Partial { claimed, source } = &err else {
            panic!("expected a partial failure, got {err:?}");
        };
        assert_eq!(*claimed, 4);
        assert!(matches!(**source, AllocatorError::Publish { batch_id: BatchId(2), .. }));
        assert!(!err.is_transient());
        // the orphaned batch keeps its claim
        assert_eq!(store.records_in_batch(BatchId(2)).await.unwrap().len(), 2);
        assert_eq!(store.unclaimed_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_publish_failure_claims_the_orphaned_batch() {
        let store = Arc::new(InMemoryRecordStore::with_records(["a", "b", "c"]));
        let service = BatchAllocatorService::new(
            store.clone(),
            RecordingPublisher::failing_from(0),
            AllocatorConfig { max_batch_size: 2 },
        )
        .unwrap();

        let err = service
            .run_allocation(BatchRequest::new(3), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AllocatorError::Partial { claimed: 2, .. }));
        assert_eq!(store.unclaimed_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let service = service(5, 10);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = service
            .run_allocation(BatchRequest::new(5), &cancel)
            .await
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(report.claimed, 0);
        assert_eq!(service.store.unclaimed_count().await.unwrap(), 5);
    }

    /// Publisher that fails the test if two runs publish at once.
    #[derive(Default)]
    struct OverlapDetector {
        in_flight: AtomicUsize,
        max_seen: AtomicUsize,
    }

    #[async_trait]
    impl BatchPublisher for OverlapDetector {
        async fn publish_unsigned(&self, _batch: &UnsignedBatch) -> Result<(), BusError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_runs_are_serialized() {
        let store = Arc::new(InMemoryRecordStore::with_records((0..40).map(|i| i.to_string())));
        let service = Arc::new(
            BatchAllocatorService::new(
                store.clone(),
                OverlapDetector::default(),
                AllocatorConfig { max_batch_size: 2 },
            )
            .unwrap(),
        );

        let mut handles = Vec::new();
        for _ in 0..4 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service
                    .run_allocation(BatchRequest::new(10), &CancellationToken::new())
                    .await
                    .unwrap()
            }));
        }

        let mut total = 0;
        for handle in handles {
            total += handle.await.unwrap().claimed;
        }
        assert_eq!(total, 40);
        assert_eq!(service.publisher.max_seen.load(Ordering::SeqCst), 1);
    }
}
