//! Digest collaborators.
//!
//! The search only needs a function from bytes to a fixed-length lowercase hex
//! string. Both bundled algorithms digest the encoded buffer directly in memory.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::Sha512;
use sha3::{Digest, Sha3_512};

use crate::error::{Result, SpoofError};

/// Bytes to lowercase hex digest.
///
/// Implementations must be pure: the same input always yields the same output.
pub trait Digester: Send + Sync {
    /// Digest `bytes` into a lowercase hex string of [`hex_len`](Self::hex_len) characters.
    fn digest_hex(&self, bytes: &[u8]) -> Result<String>;

    /// Length of every digest in hex characters.
    fn hex_len(&self) -> usize;

    /// Human-readable algorithm name.
    fn name(&self) -> &'static str;
}

/// Bundled digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    /// SHA-512 (FIPS 180-4).
    #[default]
    #[serde(rename = "sha512")]
    Sha512,
    /// SHA3-512 (FIPS 202).
    #[serde(rename = "sha3-512")]
    Sha3_512,
}

impl Digester for DigestAlgorithm {
    fn digest_hex(&self, bytes: &[u8]) -> Result<String> {
        let hex = match self {
            Self::Sha512 => hex::encode(Sha512::digest(bytes)),
            Self::Sha3_512 => hex::encode(Sha3_512::digest(bytes)),
        };
        Ok(hex)
    }

    fn hex_len(&self) -> usize {
        128
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Sha512 => "sha512",
            Self::Sha3_512 => "sha3-512",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = SpoofError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha512" | "sha-512" => Ok(Self::Sha512),
            "sha3-512" | "sha3_512" => Ok(Self::Sha3_512),
            other => Err(SpoofError::InvalidConfig(format!(
                "unknown digest algorithm: {other}"
            ))),
        }
    }
}
