//! # Pipeline Topology
//!
//! The queues of the signing pipeline and the routing keys bound to them.
//! Bindings use topic-exchange patterns: `*` matches exactly one
//! dot-separated word, `#` matches zero or more.

use crate::DEAD_LETTER_QUEUE;

/// The queues every pipeline deployment declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineQueue {
    /// Control messages asking the allocator for N records.
    BatchRequests,
    /// Claimed batches awaiting signature.
    UnsignedBatches,
    /// Signed batches awaiting persistence.
    SignedBatches,
    /// Rejected deliveries.
    DeadLetter,
}

impl PipelineQueue {
    pub const ALL: [PipelineQueue; 4] = [
        PipelineQueue::BatchRequests,
        PipelineQueue::UnsignedBatches,
        PipelineQueue::SignedBatches,
        PipelineQueue::DeadLetter,
    ];

    pub fn queue_name(self) -> &'static str {
        match self {
            Self::BatchRequests => "batch-requests",
            Self::UnsignedBatches => "unsigned-batches",
            Self::SignedBatches => "signed-batches",
            Self::DeadLetter => DEAD_LETTER_QUEUE,
        }
    }

    /// Routing key producers publish with. The dead-letter queue is mostly
    /// fed by rejection, but operators may also route to it directly.
    pub fn routing_key(self) -> &'static str {
        match self {
            Self::BatchRequests => "batch.requested",
            Self::UnsignedBatches => "batch.unsigned",
            Self::SignedBatches => "batch.signed",
            Self::DeadLetter => "dead.letter",
        }
    }
}

/// Topic-exchange pattern match.
pub fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();
    matches_words(&pattern, &key)
}

fn matches_words(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => (0..=key.len()).any(|skip| matches_words(rest, &key[skip..])),
        Some((&word, rest)) => match key.split_first() {
            Some((&head, tail)) => (word == "*" || word == head) && matches_words(rest, tail),
            None => false,
        },
    }
}
