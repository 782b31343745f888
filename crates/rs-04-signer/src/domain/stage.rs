//! Per-batch signer progress.
//!
//! ```text
//! Received ──→ KeyLeased ──→ Signed ──→ Published ──→ Acknowledged
//!    │             │            │
//!    └─────────────┴────────────┴──→ Failed (not acknowledged)
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningStage {
    Received,
    KeyLeased,
    Signed,
    Published,
    Acknowledged,
    Failed,
}

impl SigningStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::KeyLeased => "key-leased",
            Self::Signed => "signed",
            Self::Published => "published",
            Self::Acknowledged => "acknowledged",
            Self::Failed => "failed",
        }
    }

    /// Whether `next` is a legal successor of this stage.
    pub fn can_advance_to(self, next: SigningStage) -> bool {
        use SigningStage::*;
        matches!(
            (self, next),
            (Received, KeyLeased)
                | (Received, Acknowledged)
                | (KeyLeased, Signed)
                | (Signed, Published)
                | (Published, Acknowledged)
                | (Received | KeyLeased | Signed, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Acknowledged | Self::Failed)
    }
}

impl fmt::Display for SigningStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
