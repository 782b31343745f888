//! # Messages and Deliveries
//!
//! A published message is a body plus [`MessageProperties`]; a consumer
//! receives it wrapped in a [`Delivery`] carrying the delivery tag it must
//! acknowledge.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// JSON content type used by every pipeline payload.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Metadata travelling with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageProperties {
    /// Unique per publish; redeliveries keep the same id.
    pub message_id: Uuid,
    /// Links a message to the one that caused it (e.g. a signed batch to
    /// its unsigned batch).
    pub correlation_id: Option<Uuid>,
    pub content_type: String,
    pub timestamp: DateTime<Utc>,
    /// Survives a broker restart.
    pub persistent: bool,
    /// Publishing fails if no queue is bound for the routing key.
    pub mandatory: bool,
    /// Set when the message was moved to the dead-letter queue.
    pub death: Option<DeadLetterInfo>,
}

impl MessageProperties {
    /// Durable JSON message that must be routable.
    pub fn persistent_json() -> Self {
        Self {
            message_id: Uuid::new_v4(),
            correlation_id: None,
            content_type: CONTENT_TYPE_JSON.to_string(),
            timestamp: Utc::now(),
            persistent: true,
            mandatory: true,
            death: None,
        }
    }

    #[must_use]
    pub fn with_correlation(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }
}

impl Default for MessageProperties {
    fn default() -> Self {
        Self::persistent_json()
    }
}

/// Why and where a message was dead-lettered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetterInfo {
    pub queue: String,
    pub routing_key: String,
    pub reason: String,
}

/// A message handed to exactly one consumer.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Acknowledgment handle, unique per delivery attempt.
    pub delivery_tag: u64,
    /// True if an earlier attempt was not acknowledged.
    pub redelivered: bool,
    pub queue: String,
    pub routing_key: String,
    pub properties: MessageProperties,
    pub body: Vec<u8>,
}

/// What a consumer decided to do with a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Work is done; remove the message.
    Ack,
    /// Permanently unprocessable; move it to the dead-letter queue.
    DeadLetter { reason: String },
    /// Transient failure; leave it unacknowledged so it is redelivered.
    Abandon { reason: String },
}

impl Disposition {
    pub fn dead_letter(reason: impl Into<String>) -> Self {
        Self::DeadLetter {
            reason: reason.into(),
        }
    }

    pub fn abandon(reason: impl Into<String>) -> Self {
        Self::Abandon {
            reason: reason.into(),
        }
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ack => "ack",
            Self::DeadLetter { .. } => "dead_letter",
            Self::Abandon { .. } => "abandon",
        }
    }
}
