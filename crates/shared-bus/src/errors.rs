//! Bus error types.

use shared_types::PayloadError;
use thiserror::Error;

/// Errors from publishing, consuming or acknowledging messages.
#[derive(Debug, Error)]
pub enum BusError {
    /// The bus was shut down.
    #[error("Message bus closed")]
    Closed,

    /// No queue is declared under this name.
    #[error("Unknown queue: {0}")]
    UnknownQueue(String),

    /// A mandatory message matched no bound queue.
    #[error("Unroutable message: no queue bound for routing key {0}")]
    Unroutable(String),

    /// The delivery tag is not outstanding on this consumer (already
    /// acknowledged, or redelivered after the ack timeout).
    #[error("Unknown delivery tag: {0}")]
    UnknownDeliveryTag(u64),

    /// The payload could not be encoded.
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

impl BusError {
    /// Whether retrying the same operation later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Closed | Self::Unroutable(_))
    }
}
