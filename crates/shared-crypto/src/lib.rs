//! # Shared Crypto - Record Signing Primitives
//!
//! ## Components
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `material` | Opaque, versioned private-key blob stored in the key registry |
//! | `signatures` | Ed25519 keypairs, base64 signature encoding, verification |
//!
//! ## Security Properties
//!
//! - **Ed25519**: deterministic nonces, so re-signing the same payload with
//!   the same key yields identical bytes
//! - **Key material**: zeroized on drop, never printed by `Debug`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod material;
pub mod signatures;

// Re-exports
pub use errors::CryptoError;
pub use material::{KeyAlgorithm, KeyMaterial};
pub use signatures::{EncodedSignature, Ed25519KeyPair, Ed25519PublicKey};
