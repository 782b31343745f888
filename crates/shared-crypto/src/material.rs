//! # Key Material
//!
//! The registry stores private keys as an opaque blob; only this module
//! knows its layout.
//!
//! ```text
//! [ version: u8 = 1 ][ algorithm: u8 ][ secret: 32 bytes ]
//! ```
//!
//! On the wire and in JSON the blob is standard base64.

use crate::signatures::{Ed25519KeyPair, Ed25519PublicKey};
use crate::CryptoError;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

const FORMAT_VERSION: u8 = 1;
const SECRET_LEN: usize = 32;
const BLOB_LEN: usize = 2 + SECRET_LEN;

/// Signature algorithm a blob was generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum KeyAlgorithm {
    /// Ed25519 (RFC 8032)
    Ed25519 = 1,
}

impl TryFrom<u8> for KeyAlgorithm {
    type Error = CryptoError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            1 => Ok(KeyAlgorithm::Ed25519),
            other => Err(CryptoError::UnsupportedAlgorithm(other)),
        }
    }
}

/// Private keypair blob held by the key registry.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial(Vec<u8>);

impl KeyMaterial {
    /// Generate a fresh Ed25519 keypair.
    pub fn generate() -> Self {
        let keypair = Ed25519KeyPair::generate();
        Self::from_keypair(&keypair)
    }

    /// Wrap an existing keypair.
    pub fn from_keypair(keypair: &Ed25519KeyPair) -> Self {
        let mut blob = Vec::with_capacity(BLOB_LEN);
        blob.push(FORMAT_VERSION);
        blob.push(KeyAlgorithm::Ed25519 as u8);
        let mut seed = keypair.to_seed();
        blob.extend_from_slice(&seed);
        seed.zeroize();
        Self(blob)
    }

    /// Parse and validate a raw blob.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        if bytes.len() != BLOB_LEN {
            return Err(CryptoError::InvalidMaterialLength {
                expected: BLOB_LEN,
                actual: bytes.len(),
            });
        }
        if bytes[0] != FORMAT_VERSION {
            return Err(CryptoError::UnsupportedVersion(bytes[0]));
        }
        KeyAlgorithm::try_from(bytes[1])?;
        Ok(Self(bytes.to_vec()))
    }

    /// Decode from standard base64.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let mut bytes = STANDARD
            .decode(encoded)
            .map_err(|e| CryptoError::InvalidEncoding(e.to_string()))?;
        let material = Self::from_bytes(&bytes);
        bytes.zeroize();
        material
    }

    /// Encode as standard base64.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    /// Algorithm recorded in the blob header.
    pub fn algorithm(&self) -> KeyAlgorithm {
        // Validated on construction.
        KeyAlgorithm::Ed25519
    }

    /// Reconstruct the signing keypair.
    pub fn keypair(&self) -> Ed25519KeyPair {
        let mut seed = [0u8; SECRET_LEN];
        seed.copy_from_slice(&self.0[2..]);
        let keypair = Ed25519KeyPair::from_seed(seed);
        seed.zeroize();
        keypair
    }

    /// Public half, for verifying signatures made with this material.
    pub fn public_key(&self) -> Ed25519PublicKey {
        self.keypair().public_key()
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("algorithm", &self.algorithm())
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Serialize for KeyMaterial {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for KeyMaterial {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        KeyMaterial::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_roundtrip_preserves_key() {
        let material = KeyMaterial::generate();
        let restored = KeyMaterial::from_base64(&material.to_base64()).unwrap();

        assert_eq!(material, restored);
        assert_eq!(material.public_key(), restored.public_key());
    }

    #[test]
    fn test_rejects_wrong_length() {
        let err = KeyMaterial::from_bytes(&[1, 1, 0, 0]).unwrap_err();
        assert_eq!(
            err,
            CryptoError::InvalidMaterialLength {
                expected: BLOB_LEN,
                actual: 4
            }
        );
    }

    #[test]
    fn test_rejects_unknown_version_and_algorithm() {
        let mut blob = KeyMaterial::generate().0.clone();
        blob[0] = 9;
        assert_eq!(
            KeyMaterial::from_bytes(&blob).unwrap_err(),
            CryptoError::UnsupportedVersion(9)
        );

        blob[0] = FORMAT_VERSION;
        blob[1] = 7;
        assert_eq!(
            KeyMaterial::from_bytes(&blob).unwrap_err(),
            CryptoError::UnsupportedAlgorithm(7)
        );
    }

    #[test]
    fn test_rejects_invalid_base64() {
        assert!(matches!(
            KeyMaterial::from_base64("***"),
            Err(CryptoError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let material = KeyMaterial::generate();
        let printed = format!("{material:?}");

        assert!(printed.contains("redacted"));
        assert!(!printed.contains(&material.to_base64()));
    }

    #[test]
    fn test_serde_uses_base64_string() {
        let material = KeyMaterial::generate();
        let json = serde_json::to_string(&material).unwrap();

        assert_eq!(json, format!("\"{}\"", material.to_base64()));
        let back: KeyMaterial = serde_json::from_str(&json).unwrap();
        assert_eq!(back, material);
    }
}
