//! Key registry error types.

use shared_types::KeyIdentity;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyRegistryError {
    /// No key with this identity is registered.
    #[error("Key not found: {0}")]
    NotFound(KeyIdentity),

    /// Key generation needs a positive count.
    #[error("Invalid key count: {0}")]
    InvalidCount(usize),

    /// The backing store failed.
    #[error("Key store error: {0}")]
    Storage(String),
}

impl KeyRegistryError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}
