//! # Message Consumer
//!
//! The consuming side of the bus. A consumer owns the deliveries it has
//! received until it acknowledges, rejects or requeues them; dropping the
//! consumer returns every outstanding delivery to its queue.

use crate::message::Delivery;
use crate::publisher::{BusCore, Outstanding, Queue, QueueState, StoredMessage};
use crate::BusError;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;

/// Trait for receiving and settling deliveries from one queue.
#[async_trait]
pub trait MessageConsumer: Send {
    /// Wait for the next delivery. `None` once the bus is closed.
    async fn recv(&mut self) -> Option<Delivery>;

    /// The delivery was handled; remove it.
    async fn ack(&self, delivery_tag: u64) -> Result<(), BusError>;

    /// The delivery can never be handled; dead-letter it.
    async fn reject(&self, delivery_tag: u64, reason: &str) -> Result<(), BusError>;

    /// Return the delivery to the head of its queue immediately.
    async fn requeue(&self, delivery_tag: u64) -> Result<(), BusError>;

    /// Queue this consumer is attached to.
    fn queue_name(&self) -> &str;
}

enum Next {
    Ready(Delivery),
    Wait(Option<Instant>),
}

/// Consumer handle for an [`crate::InMemoryMessageBus`] queue.
pub struct QueueConsumer {
    core: Arc<BusCore>,
    queue: Arc<Queue>,
    consumer_id: u64,
}

impl QueueConsumer {
    pub(crate) fn new(core: Arc<BusCore>, queue: Arc<Queue>, consumer_id: u64) -> Self {
        Self {
            core,
            queue,
            consumer_id,
        }
    }

    /// Take the next delivery without waiting.
    pub fn try_recv(&mut self) -> Result<Option<Delivery>, BusError> {
        if self.core.is_closed() {
            return Err(BusError::Closed);
        }
        match self.next(Instant::now()) {
            Next::Ready(delivery) => Ok(Some(delivery)),
            Next::Wait(_) => Ok(None),
        }
    }

    fn next(&self, now: Instant) -> Next {
        let mut state = self.queue.state.lock();
        let expired = state.expire(now);
        if expired > 0 {
            debug!(queue = %self.queue.name, expired, "Ack timeout elapsed, redelivering");
        }
        match state.ready.pop_front() {
            Some(message) => Next::Ready(self.hand_out(&mut state, message, now)),
            None => Next::Wait(state.next_deadline()),
        }
    }

    fn hand_out(&self, state: &mut QueueState, message: StoredMessage, now: Instant) -> Delivery {
        let delivery_tag = self.core.next_tag();
        let delivery = Delivery {
            delivery_tag,
            redelivered: message.redelivered,
            queue: self.queue.name.clone(),
            routing_key: message.routing_key.clone(),
            properties: message.properties.clone(),
            body: message.body.clone(),
        };
        state.unacked.insert(
            delivery_tag,
            Outstanding {
                message,
                consumer_id: self.consumer_id,
                deadline: self.core.config.ack_timeout.map(|timeout| now + timeout),
            },
        );
        delivery
    }

    fn settle(&self, delivery_tag: u64) -> Result<StoredMessage, BusError> {
        let mut state = self.queue.state.lock();
        match state.unacked.get(&delivery_tag) {
            Some(o) if o.consumer_id == self.consumer_id => {}
            _ => return Err(BusError::UnknownDeliveryTag(delivery_tag)),
        }
        state
            .unacked
            .remove(&delivery_tag)
            .map(|o| o.message)
            .ok_or(BusError::UnknownDeliveryTag(delivery_tag))
    }
}

#[async_trait]
impl MessageConsumer for QueueConsumer {
    async fn recv(&mut self) -> Option<Delivery> {
        loop {
            let notified = self.queue.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.core.is_closed() {
                return None;
            }
            match self.next(Instant::now()) {
                Next::Ready(delivery) => return Some(delivery),
                Next::Wait(Some(deadline)) => {
                    tokio::select! {
                        _ = &mut notified => {}
                        _ = tokio::time::sleep_until(deadline) => {}
                    }
                }
                Next::Wait(None) => notified.await,
            }
        }
    }

    async fn ack(&self, delivery_tag: u64) -> Result<(), BusError> {
        self.settle(delivery_tag)?;
        debug!(queue = %self.queue.name, delivery_tag, "Delivery acknowledged");
        Ok(())
    }

    async fn reject(&self, delivery_tag: u64, reason: &str) -> Result<(), BusError> {
        let message = self.settle(delivery_tag)?;
        self.core.dead_letter(&self.queue, message, reason);
        Ok(())
    }

    async fn requeue(&self, delivery_tag: u64) -> Result<(), BusError> {
        let mut message = self.settle(delivery_tag)?;
        message.redelivered = true;
        self.queue.state.lock().ready.push_front(message);
        self.queue.notify.notify_waiters();
        Ok(())
    }

    fn queue_name(&self) -> &str {
        &self.queue.name
    }
}

impl Drop for QueueConsumer {
    fn drop(&mut self) {
        let returned = {
            let mut state = self.queue.state.lock();
            state.consumers = state.consumers.saturating_sub(1);
            state.requeue_where(|o| o.consumer_id == self.consumer_id)
        };
        if returned > 0 {
            self.queue.notify.notify_waiters();
        }
        debug!(queue = %self.queue.name, returned, "Consumer detached");
    }
}
