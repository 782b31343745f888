//! # Message Publisher
//!
//! The publishing side of the bus and the in-memory broker behind it.

use crate::message::{DeadLetterInfo, MessageProperties};
use crate::subscriber::QueueConsumer;
use crate::topology::{topic_matches, PipelineQueue};
use crate::{BusError, DEAD_LETTER_QUEUE, DEFAULT_ACK_TIMEOUT_MS, DEFAULT_EXCHANGE};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use shared_types::WirePayload;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Trait for publishing messages to the bus.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Route `body` to every queue bound for `routing_key`.
    ///
    /// Returns the number of queues the message was stored in.
    async fn publish(
        &self,
        routing_key: &str,
        body: Vec<u8>,
        properties: MessageProperties,
    ) -> Result<usize, BusError>;

    /// Total publish attempts.
    fn messages_published(&self) -> u64;
}

/// Encode `payload` as JSON and publish it.
pub async fn publish_payload<P, T>(
    publisher: &P,
    routing_key: &str,
    payload: &T,
    properties: MessageProperties,
) -> Result<usize, BusError>
where
    P: MessagePublisher + ?Sized,
    T: WirePayload + Sync,
{
    let body = payload.encode()?;
    publisher.publish(routing_key, body, properties).await
}

/// Broker settings.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Exchange name, used in logs.
    pub exchange: String,
    /// Unacknowledged deliveries older than this are redelivered.
    /// `None` keeps them outstanding until the consumer goes away.
    pub ack_timeout: Option<Duration>,
    /// Queue receiving rejected deliveries; `None` discards them.
    pub dead_letter_queue: Option<String>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            exchange: DEFAULT_EXCHANGE.to_string(),
            ack_timeout: Some(Duration::from_millis(DEFAULT_ACK_TIMEOUT_MS)),
            dead_letter_queue: Some(DEAD_LETTER_QUEUE.to_string()),
        }
    }
}

/// Queue depth snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    pub ready: usize,
    pub unacked: usize,
    pub consumers: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct StoredMessage {
    pub routing_key: String,
    pub properties: MessageProperties,
    pub body: Vec<u8>,
    pub redelivered: bool,
}

#[derive(Debug)]
pub(crate) struct Outstanding {
    pub message: StoredMessage,
    pub consumer_id: u64,
    pub deadline: Option<Instant>,
}

#[derive(Debug, Default)]
pub(crate) struct QueueState {
    pub ready: VecDeque<StoredMessage>,
    pub unacked: HashMap<u64, Outstanding>,
    pub consumers: usize,
}

impl QueueState {
    /// Put outstanding deliveries matching `filter` back at the head of the
    /// queue, oldest first.
    pub fn requeue_where(&mut self, filter: impl Fn(&Outstanding) -> bool) -> usize {
        let mut tags: Vec<u64> = self
            .unacked
            .iter()
            .filter(|(_, o)| filter(o))
            .map(|(tag, _)| *tag)
            .collect();
        tags.sort_unstable_by(|a, b| b.cmp(a));

        let count = tags.len();
        for tag in tags {
            if let Some(outstanding) = self.unacked.remove(&tag) {
                let mut message = outstanding.message;
                message.redelivered = true;
                self.ready.push_front(message);
            }
        }
        count
    }

    pub fn expire(&mut self, now: Instant) -> usize {
        self.requeue_where(|o| o.deadline.is_some_and(|d| d <= now))
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.unacked.values().filter_map(|o| o.deadline).min()
    }
}

pub(crate) struct Queue {
    pub name: String,
    pub state: Mutex<QueueState>,
    pub notify: Notify,
}

impl Queue {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
        }
    }

    pub fn push(&self, message: StoredMessage) {
        self.state.lock().ready.push_back(message);
        self.notify.notify_waiters();
    }
}

pub(crate) struct BusCore {
    pub config: BusConfig,
    queues: RwLock<HashMap<String, Arc<Queue>>>,
    bindings: RwLock<Vec<(String, String)>>,
    next_tag: AtomicU64,
    next_consumer: AtomicU64,
    closed: AtomicBool,
    published: AtomicU64,
}

impl BusCore {
    pub fn queue(&self, name: &str) -> Result<Arc<Queue>, BusError> {
        self.queues
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| BusError::UnknownQueue(name.to_string()))
    }

    pub fn next_tag(&self) -> u64 {
        self.next_tag.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Move a rejected message to the dead-letter queue, or drop it if
    /// there is none (or it came from there).
    pub fn dead_letter(&self, from: &Queue, mut message: StoredMessage, reason: &str) {
        let target = self
            .config
            .dead_letter_queue
            .as_deref()
            .filter(|dlq| *dlq != from.name)
            .and_then(|dlq| self.queue(dlq).ok());

        let Some(target) = target else {
            warn!(
                queue = %from.name,
                routing_key = %message.routing_key,
                reason,
                "Rejected message discarded (no dead-letter queue)"
            );
            return;
        };

        message.properties.death = Some(DeadLetterInfo {
            queue: from.name.clone(),
            routing_key: message.routing_key.clone(),
            reason: reason.to_string(),
        });
        message.redelivered = false;
        warn!(
            queue = %from.name,
            message_id = %message.properties.message_id,
            reason,
            "Message dead-lettered"
        );
        target.push(message);
    }
}

/// In-memory broker with durable-queue semantics.
///
/// Suitable for single-process deployments and tests; a networked broker
/// would implement [`MessagePublisher`] and [`crate::MessageConsumer`]
/// instead.
#[derive(Clone)]
pub struct InMemoryMessageBus {
    core: Arc<BusCore>,
}

impl InMemoryMessageBus {
    #[must_use]
    pub fn new(config: BusConfig) -> Self {
        let bus = Self {
            core: Arc::new(BusCore {
                config,
                queues: RwLock::new(HashMap::new()),
                bindings: RwLock::new(Vec::new()),
                next_tag: AtomicU64::new(0),
                next_consumer: AtomicU64::new(0),
                closed: AtomicBool::new(false),
                published: AtomicU64::new(0),
            }),
        };
        if let Some(dlq) = bus.core.config.dead_letter_queue.clone() {
            bus.declare_queue(&dlq);
        }
        bus
    }

    /// A bus with every [`PipelineQueue`] declared and bound.
    #[must_use]
    pub fn with_pipeline_topology(config: BusConfig) -> Self {
        let bus = Self::new(config);
        for queue in PipelineQueue::ALL {
            bus.declare_queue(queue.queue_name());
            bus.bind(queue.queue_name(), queue.routing_key());
        }
        info!(exchange = %bus.core.config.exchange, "Pipeline topology declared");
        bus
    }

    /// Declare a queue. Redeclaring is a no-op.
    pub fn declare_queue(&self, name: &str) {
        self.core
            .queues
            .write()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Queue::new(name)));
    }

    /// Bind `queue` to a routing-key pattern.
    pub fn bind(&self, queue: &str, pattern: &str) {
        let mut bindings = self.core.bindings.write();
        let binding = (pattern.to_string(), queue.to_string());
        if !bindings.contains(&binding) {
            debug!(queue, pattern, "Queue bound");
            bindings.push(binding);
        }
    }

    /// Start consuming from a declared queue.
    pub fn consume(&self, queue: &str) -> Result<QueueConsumer, BusError> {
        if self.core.is_closed() {
            return Err(BusError::Closed);
        }
        let queue = self.core.queue(queue)?;
        queue.state.lock().consumers += 1;
        let consumer_id = self.core.next_consumer.fetch_add(1, Ordering::Relaxed);
        debug!(queue = %queue.name, consumer_id, "Consumer attached");
        Ok(QueueConsumer::new(self.core.clone(), queue, consumer_id))
    }

    /// Redeliver every outstanding delivery on `queue` now.
    pub fn recover(&self, queue: &str) -> Result<usize, BusError> {
        let queue = self.core.queue(queue)?;
        let count = queue.state.lock().requeue_where(|_| true);
        if count > 0 {
            queue.notify.notify_waiters();
            info!(queue = %queue.name, count, "Outstanding deliveries recovered");
        }
        Ok(count)
    }

    pub fn stats(&self, queue: &str) -> Result<QueueStats, BusError> {
        let queue = self.core.queue(queue)?;
        let state = queue.state.lock();
        Ok(QueueStats {
            ready: state.ready.len(),
            unacked: state.unacked.len(),
            consumers: state.consumers,
        })
    }

    /// Stop accepting publishes and wake every waiting consumer.
    pub fn close(&self) {
        self.core.closed.store(true, Ordering::Release);
        for queue in self.core.queues.read().values() {
            queue.notify.notify_waiters();
        }
        info!(exchange = %self.core.config.exchange, "Message bus closed");
    }

    pub fn is_closed(&self) -> bool {
        self.core.is_closed()
    }

    fn route(&self, routing_key: &str) -> Vec<Arc<Queue>> {
        let names: Vec<String> = {
            let bindings = self.core.bindings.read();
            let mut names: Vec<String> = bindings
                .iter()
                .filter(|(pattern, _)| topic_matches(pattern, routing_key))
                .map(|(_, queue)| queue.clone())
                .collect();
            names.sort();
            names.dedup();
            names
        };
        names
            .iter()
            .filter_map(|name| self.core.queue(name).ok())
            .collect()
    }
}

impl Default for InMemoryMessageBus {
    fn default() -> Self {
        Self::with_pipeline_topology(BusConfig::default())
    }
}

#[async_trait]
impl MessagePublisher for InMemoryMessageBus {
    async fn publish(
        &self,
        routing_key: &str,
        body: Vec<u8>,
        properties: MessageProperties,
    ) -> Result<usize, BusError> {
        if self.core.is_closed() {
            return Err(BusError::Closed);
        }
        // Always increment counter (publish was attempted)
        self.core.published.fetch_add(1, Ordering::Relaxed);

        let targets = self.route(routing_key);
        if targets.is_empty() {
            warn!(
                routing_key,
                mandatory = properties.mandatory,
                "Message matched no queue"
            );
            return if properties.mandatory {
                Err(BusError::Unroutable(routing_key.to_string()))
            } else {
                Ok(0)
            };
        }

        let message = StoredMessage {
            routing_key: routing_key.to_string(),
            properties,
            body,
            redelivered: false,
        };
        for queue in &targets {
            queue.push(message.clone());
        }
        debug!(
            routing_key,
            message_id = %message.properties.message_id,
            queues = targets.len(),
            "Message published"
        );
        Ok(targets.len())
    }

    fn messages_published(&self) -> u64 {
        self.core.published.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::BatchRequest;

    #[tokio::test]
    async fn test_publish_routes_to_bound_queue() {
        let bus = InMemoryMessageBus::default();

        let stored = publish_payload(
            &bus,
            "batch.requested",
            &BatchRequest::new(5),
            MessageProperties::persistent_json(),
        )
        .await
        .unwrap();

        assert_eq!(stored, 1);
        assert_eq!(bus.stats("batch-requests").unwrap().ready, 1);
        assert_eq!(bus.stats("unsigned-batches").unwrap().ready, 0);
        assert_eq!(bus.messages_published(), 1);
    }

    #[tokio::test]
    async fn test_mandatory_unroutable_fails() {
        let bus = InMemoryMessageBus::default();

        let result = bus
            .publish("nobody.listens", b"{}".to_vec(), MessageProperties::persistent_json())
            .await;

        assert!(matches!(result, Err(BusError::Unroutable(_))));
    }

    #[tokio::test]
    async fn test_optional_unroutable_is_dropped() {
        let bus = InMemoryMessageBus::default();
        let mut properties = MessageProperties::persistent_json();
        properties.mandatory = false;

        let stored = bus.publish("nobody.listens", vec![], properties).await.unwrap();
        assert_eq!(stored, 0);
    }

    #[tokio::test]
    async fn test_wildcard_binding_fans_out() {
        let bus = InMemoryMessageBus::default();
        bus.declare_queue("audit");
        bus.bind("audit", "batch.#");

        let stored = bus
            .publish("batch.signed", vec![1], MessageProperties::persistent_json())
            .await
            .unwrap();

        assert_eq!(stored, 2);
        assert_eq!(bus.stats("audit").unwrap().ready, 1);
        assert_eq!(bus.stats("signed-batches").unwrap().ready, 1);
    }

    #[tokio::test]
    async fn test_publish_after_close_fails() {
        let bus = InMemoryMessageBus::default();
        bus.close();

        let result = bus
            .publish("batch.signed", vec![], MessageProperties::persistent_json())
            .await;
        assert!(matches!(result, Err(BusError::Closed)));
    }

    #[test]
    fn test_unknown_queue() {
        let bus = InMemoryMessageBus::default();
        assert!(matches!(bus.stats("missing"), Err(BusError::UnknownQueue(_))));
        assert!(matches!(bus.consume("missing"), Err(BusError::UnknownQueue(_))));
    }

    #[test]
    fn test_redeclare_is_noop() {
        let bus = InMemoryMessageBus::default();
        bus.declare_queue("signed-batches");
        bus.bind("signed-batches", "batch.signed");
        assert_eq!(bus.stats("signed-batches").unwrap(), QueueStats::default());
    }
}
