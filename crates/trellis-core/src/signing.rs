//! Operation signing.
//!
//! Signatures are always computed over the exact bytes handed in. The
//! algorithm sits behind [`SignatureScheme`]; the free functions use
//! Ed25519.

use crate::error::CoordError;
use crate::hash::ContentId;
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const SECRET_KEY_LEN: usize = 32;
pub const PUBLIC_KEY_LEN: usize = 32;
pub const SIGNATURE_LEN: usize = 64;

/// A keypair held in memory only.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningKeypair {
    #[serde(with = "hex_bytes")]
    pub public_key: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub secret_key: Vec<u8>,
    pub key_id: String,
}

impl fmt::Debug for SigningKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeypair")
            .field("key_id", &self.key_id)
            .field("public_key", &hex::encode(&self.public_key))
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Short fingerprint of a public key.
pub fn key_id(public_key: &[u8]) -> String {
    ContentId::digest(public_key).short().to_string()
}

pub trait SignatureScheme: Send + Sync {
    fn generate(&self) -> SigningKeypair;

    fn sign(&self, message: &[u8], secret_key: &[u8]) -> Result<Vec<u8>, CoordError>;

    /// `true` only for a signature made by the matching secret key over
    /// exactly `message`. Malformed inputs are simply not valid.
    fn verify(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519;

impl SignatureScheme for Ed25519 {
    fn generate(&self) -> SigningKeypair {
        let signing_key = SigningKey::generate(&mut OsRng);
        let public_key = signing_key.verifying_key().to_bytes().to_vec();
        SigningKeypair {
            key_id: key_id(&public_key),
            public_key,
            secret_key: signing_key.to_bytes().to_vec(),
        }
    }

    fn sign(&self, message: &[u8], secret_key: &[u8]) -> Result<Vec<u8>, CoordError> {
        let seed: [u8; SECRET_KEY_LEN] = secret_key.try_into().map_err(|_| {
            CoordError::InvalidKey(format!(
                "secret key must be {} bytes, got {}",
                SECRET_KEY_LEN,
                secret_key.len()
            ))
        })?;
        let signing_key = SigningKey::from_bytes(&seed);
        Ok(signing_key.sign(message).to_bytes().to_vec())
    }

    fn verify(&self, message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        let Ok(public_key) = <[u8; PUBLIC_KEY_LEN]>::try_from(public_key) else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(&public_key) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        verifying_key.verify_strict(message, &signature).is_ok()
    }
}

pub fn generate_signing_keypair() -> SigningKeypair {
    Ed25519.generate()
}

pub fn sign_message(message: &[u8], secret_key: &[u8]) -> Result<Vec<u8>, CoordError> {
    Ed25519.sign(message, secret_key)
}

pub fn verify_signature(message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
    Ed25519.verify(message, signature, public_key)
}

/// Decode a hex key or signature, as passed on the command line.
pub fn decode_hex(label: &str, value: &str) -> Result<Vec<u8>, CoordError> {
    hex::decode(value.trim())
        .map_err(|e| CoordError::InvalidKey(format!("{} is not valid hex: {}", label, e)))
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(d)?;
        hex::decode(text).map_err(serde::de::Error::custom)
    }
}
