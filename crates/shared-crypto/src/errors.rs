//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Key material blob has the wrong length
    #[error("Invalid key material length: expected {expected}, got {actual}")]
    InvalidMaterialLength {
        /// Expected blob length in bytes
        expected: usize,
        /// Actual blob length in bytes
        actual: usize,
    },

    /// Key material was written by an unknown format version
    #[error("Unsupported key material version: {0}")]
    UnsupportedVersion(u8),

    /// Key material names an algorithm this build cannot use
    #[error("Unsupported key algorithm tag: {0}")]
    UnsupportedAlgorithm(u8),

    /// Text was not valid standard base64
    #[error("Invalid base64 encoding: {0}")]
    InvalidEncoding(String),

    /// Invalid signature format
    #[error("Invalid signature format: expected {expected} bytes, got {actual}")]
    InvalidSignatureFormat {
        /// Expected signature length in bytes
        expected: usize,
        /// Actual signature length in bytes
        actual: usize,
    },

    /// Invalid public key
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,
}
