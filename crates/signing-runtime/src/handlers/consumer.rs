//! # Consumer Loop
//!
//! One loop per stage: receive a delivery, hand it to the stage, settle the
//! delivery according to the returned [`Disposition`].
//!
//! | Disposition | Settlement |
//! |-------------|------------|
//! | `Ack` | `ack` |
//! | `DeadLetter` | `reject` (routed to the dead-letter queue) |
//! | `Abandon` | none; redelivered after the ack timeout or when the consumer detaches |
//!
//! Deliveries are handled one at a time. Cancellation is checked between
//! deliveries; a delivery already being handled sees the same token.

use async_trait::async_trait;
use shared_bus::{Delivery, Disposition, MessageConsumer};
use signing_telemetry::{MESSAGES_ABANDONED, MESSAGES_ACKNOWLEDGED, MESSAGES_DEAD_LETTERED};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A pipeline stage that can be driven by [`run_consumer`].
#[async_trait]
pub trait StageHandler: Send + Sync {
    /// Stage name for logs.
    fn stage(&self) -> &'static str;

    /// Handle one delivery and decide how it is settled.
    async fn process(&self, delivery: &Delivery, cancel: &CancellationToken) -> Disposition;
}

/// Settlement counts for one consumer loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    pub acknowledged: u64,
    pub dead_lettered: u64,
    pub abandoned: u64,
}

impl ConsumerStats {
    pub fn handled(&self) -> u64 {
        self.acknowledged + self.dead_lettered + self.abandoned
    }
}

/// Drive `handler` from `consumer` until `cancel` fires or the bus closes.
pub async fn run_consumer<C, H>(mut consumer: C, handler: H, cancel: CancellationToken) -> ConsumerStats
where
    C: MessageConsumer,
    H: StageHandler,
{
    let queue = consumer.queue_name().to_string();
    let stage = handler.stage();
    let mut stats = ConsumerStats::default();
    info!(stage, queue = %queue, "Consumer started");

    loop {
        let delivery = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = consumer.recv() => match next {
                Some(delivery) => delivery,
                None => {
                    info!(stage, queue = %queue, "Bus closed");
                    break;
                }
            },
        };

        let disposition = handler.process(&delivery, &cancel).await;
        settle(&consumer, &queue, &delivery, &disposition).await;
        match disposition {
            Disposition::Ack => stats.acknowledged += 1,
            Disposition::DeadLetter { .. } => stats.dead_lettered += 1,
            Disposition::Abandon { .. } => stats.abandoned += 1,
        }
    }

    info!(
        stage,
        queue = %queue,
        acknowledged = stats.acknowledged,
        dead_lettered = stats.dead_lettered,
        abandoned = stats.abandoned,
        "Consumer stopped"
    );
    stats
}

async fn settle<C: MessageConsumer>(
    consumer: &C,
    queue: &str,
    delivery: &Delivery,
    disposition: &Disposition,
) {
    let tag = delivery.delivery_tag;
    match disposition {
        Disposition::Ack => {
            if let Err(e) = consumer.ack(tag).await {
                warn!(queue, delivery_tag = tag, error = %e, "Ack failed, message will be redelivered");
                return;
            }
            MESSAGES_ACKNOWLEDGED.with_label_values(&[queue]).inc();
            debug!(queue, delivery_tag = tag, "Delivery acknowledged");
        }
        Disposition::DeadLetter { reason } => {
            if let Err(e) = consumer.reject(tag, reason).await {
                warn!(queue, delivery_tag = tag, error = %e, "Reject failed, message will be redelivered");
                return;
            }
            MESSAGES_DEAD_LETTERED.with_label_values(&[queue]).inc();
            warn!(queue, delivery_tag = tag, reason = %reason, "Delivery dead-lettered");
        }
        Disposition::Abandon { reason } => {
            MESSAGES_ABANDONED.with_label_values(&[queue]).inc();
            warn!(queue, delivery_tag = tag, reason = %reason, "Delivery left unacknowledged");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_bus::{InMemoryMessageBus, MessageProperties, MessagePublisher, PipelineQueue};
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Settles by body: `ack`, `dead` or anything else abandoned.
    struct ByBody {
        seen: mpsc::UnboundedSender<Vec<u8>>,
    }

    #[async_trait]
    impl StageHandler for ByBody {
        fn stage(&self) -> &'static str {
            "test"
        }

        async fn process(&self, delivery: &Delivery, _cancel: &CancellationToken) -> Disposition {
            let _ = self.seen.send(delivery.body.clone());
            match delivery.body.as_slice() {
                b"ack" => Disposition::Ack,
                b"dead" => Disposition::dead_letter("unreadable"),
                _ => Disposition::abandon("try later"),
            }
        }
    }

    async fn publish(bus: &InMemoryMessageBus, body: &[u8]) {
        bus.publish(
            PipelineQueue::BatchRequests.routing_key(),
            body.to_vec(),
            MessageProperties::persistent_json(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_dispositions_are_settled() {
        let bus = InMemoryMessageBus::default();
        for body in [b"ack".as_slice(), b"dead", b"later"] {
            publish(&bus, body).await;
        }
        let consumer = bus.consume(PipelineQueue::BatchRequests.queue_name()).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_consumer(consumer, ByBody { seen: tx }, cancel.clone()));
        for _ in 0..3 {
            tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
        }
        cancel.cancel();
        let stats = task.await.unwrap();

        assert_eq!(
            stats,
            ConsumerStats {
                acknowledged: 1,
                dead_lettered: 1,
                abandoned: 1,
            }
        );
        assert_eq!(bus.stats(PipelineQueue::DeadLetter.queue_name()).unwrap().ready, 1);
        // The abandoned delivery went back to the queue when the consumer detached.
        let requests = bus.stats(PipelineQueue::BatchRequests.queue_name()).unwrap();
        assert_eq!(requests.ready, 1);
        assert_eq!(requests.unacked, 0);
    }

    #[tokio::test]
    async fn test_cancel_stops_idle_consumer() {
        let bus = InMemoryMessageBus::default();
        let consumer = bus.consume(PipelineQueue::SignedBatches.queue_name()).unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_consumer(consumer, ByBody { seen: tx }, cancel.clone()));
        cancel.cancel();
        let stats = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats.handled(), 0);
    }

    #[tokio::test]
    async fn test_bus_close_stops_consumer() {
        let bus = InMemoryMessageBus::default();
        let consumer = bus.consume(PipelineQueue::UnsignedBatches.queue_name()).unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run_consumer(consumer, ByBody { seen: tx }, CancellationToken::new()));
        bus.close();
        let stats = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats, ConsumerStats::default());
    }
}
