use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A SHA-256 digest, displayed and stored as 64 lowercase hex chars.
///
/// Used to fingerprint operation payloads and public keys.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ContentId(String);

impl ContentId {
    pub fn digest(data: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(data)))
    }

    pub fn hex(&self) -> &str {
        &self.0
    }

    /// First 16 chars; long enough to tell keys apart in logs and listings.
    pub fn short(&self) -> &str {
        &self.0[..16]
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.short())
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short())
    }
}
