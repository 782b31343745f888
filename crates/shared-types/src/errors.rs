//! # Error Types
//!
//! Errors raised while encoding or decoding pipeline messages.

use thiserror::Error;

/// A queue body could not be turned into (or produced from) a payload.
///
/// Decoding failures are permanent: redelivering the same bytes can never
/// succeed, so consumers dead-letter the message instead of retrying.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Body is not valid JSON for the expected payload.
    #[error("Malformed {kind} payload: {source}")]
    Malformed {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Body decoded but violates a structural rule.
    #[error("Invalid {kind} payload: {reason}")]
    Invalid { kind: &'static str, reason: String },

    /// Payload could not be serialized.
    #[error("Failed to encode {kind} payload: {source}")]
    Encode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl PayloadError {
    pub fn invalid(kind: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            kind,
            reason: reason.into(),
        }
    }
}
