//! # Shared Bus - Message Bus for the Signing Pipeline
//!
//! A durable exchange with named queues bound by routing key. Every stage of
//! the pipeline talks to the next one through this bus only.
//!
//! ```text
//! ┌───────────┐ batch.unsigned ┌──────────┐ batch.signed ┌─────────────┐
//! │ Allocator │ ─────────────▶ │  Signer  │ ───────────▶ │ Record      │
//! │           │                │          │              │ Keeper      │
//! └───────────┘                └──────────┘              └─────────────┘
//!       ▲ batch.requested
//! ```
//!
//! ## Delivery Semantics
//!
//! - **Exactly one consumer per message per queue**: competing consumers never
//!   see the same delivery.
//! - **At-least-once**: a delivery stays unacknowledged until the consumer
//!   acks it; it is redelivered (flagged `redelivered`) after the ack timeout,
//!   when its consumer is dropped, or on [`InMemoryMessageBus::recover`].
//! - **Dead Letter Queue**: a rejected delivery is moved to the dead-letter
//!   queue for investigation instead of being retried.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod errors;
pub mod message;
pub mod publisher;
pub mod subscriber;
pub mod topology;

// Re-export main types
pub use errors::BusError;
pub use message::{DeadLetterInfo, Delivery, Disposition, MessageProperties};
pub use publisher::{publish_payload, BusConfig, InMemoryMessageBus, MessagePublisher, QueueStats};
pub use subscriber::{MessageConsumer, QueueConsumer};
pub use topology::{topic_matches, PipelineQueue};

/// Default exchange all pipeline queues are bound to.
pub const DEFAULT_EXCHANGE: &str = "record-signing";

/// Queue that receives rejected deliveries.
pub const DEAD_LETTER_QUEUE: &str = "dead-letter";

/// Redelivery timeout applied when no other is configured.
pub const DEFAULT_ACK_TIMEOUT_MS: u64 = 30_000;
