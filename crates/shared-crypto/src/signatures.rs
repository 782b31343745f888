//! # Ed25519 Record Signatures
//!
//! Signs the UTF-8 bytes of a record payload. Signatures travel as
//! standard base64 of the 64 raw bytes.

use crate::CryptoError;
use base64::{engine::general_purpose::STANDARD, Engine};
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};

const SIGNATURE_LEN: usize = 64;

/// Ed25519 public key (32 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ed25519PublicKey([u8; 32]);

impl Ed25519PublicKey {
    /// Create from bytes, rejecting points off the curve.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        VerifyingKey::from_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Verify a base64 signature over `message`.
    pub fn verify(&self, message: &[u8], signature: &EncodedSignature) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;
        let raw = signature.decode()?;
        let sig = ed25519_dalek::Signature::from_bytes(&raw);

        verifying_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

/// A signature in its wire form (standard base64).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EncodedSignature(String);

impl EncodedSignature {
    /// Wrap text received from the wire. Checked lazily by [`Self::decode`].
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// Encode raw signature bytes.
    pub fn from_raw(raw: &[u8; SIGNATURE_LEN]) -> Self {
        Self(STANDARD.encode(raw))
    }

    /// Decode and length-check.
    pub fn decode(&self) -> Result<[u8; SIGNATURE_LEN], CryptoError> {
        let bytes = STANDARD
            .decode(&self.0)
            .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;
        <[u8; SIGNATURE_LEN]>::try_from(bytes.as_slice()).map_err(|_| {
            CryptoError::InvalidSignatureFormat {
                expected: SIGNATURE_LEN,
                actual: bytes.len(),
            }
        })
    }

    /// Borrow the base64 text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Take the base64 text.
    pub fn into_string(self) -> String {
        self.0
    }
}

/// Ed25519 keypair. The secret half is zeroized on drop by `ed25519-dalek`.
pub struct Ed25519KeyPair {
    signing_key: SigningKey,
}

impl Ed25519KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret seed (32 bytes).
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        Self { signing_key }
    }

    /// Get public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message and encode the result for the wire.
    pub fn sign(&self, message: &[u8]) -> EncodedSignature {
        let sig = self.signing_key.sign(message);
        EncodedSignature::from_raw(&sig.to_bytes())
    }

    /// Get secret seed (for serialization into key material).
    pub fn to_seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}
