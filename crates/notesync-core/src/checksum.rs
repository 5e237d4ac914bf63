//! Content checksums for change detection.
//!
//! A checksum is computed over the full content of a note or file and compared
//! against the value recorded at last sync to answer "has this side changed
//! since we last looked" without storing the prior content.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A content digest (SHA-256, hex-encoded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    /// Compute the checksum of a piece of content.
    pub fn of(content: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
