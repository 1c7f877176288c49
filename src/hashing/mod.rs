//! BLAKE3 content fingerprints and composite cache keys.
//!
//! A [`Fingerprint`] depends only on file bytes, never on names or paths, so a renamed but
//! unchanged file keeps its cache entries and an edited file misses them.

use std::fmt;

use blake3::Hasher;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 256-bit BLAKE3 hash of a presentation file's bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Hashes raw file bytes.
    #[inline]
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }

    /// Parses the 64-character lowercase hex form.
    pub fn from_hex(hex: &str) -> Option<Self> {
        blake3::Hash::from_hex(hex)
            .ok()
            .map(|hash| Self(*hash.as_bytes()))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }

    /// First 12 hex characters, for log lines.
    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(12);
        hex
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).ok_or_else(|| D::Error::custom(format!("invalid fingerprint '{hex}'")))
    }
}

/// Hashes `(fingerprint, rubric version, problem statement)` into a file-name-safe digest.
///
/// The separator keeps `("ab", "c")`-style splits from colliding. The problem statement is
/// length-prefixed, and a missing one hashes the same as before it existed.
#[inline]
pub fn hash_score_key(
    fingerprint: &Fingerprint,
    rubric_version: &str,
    problem_statement: Option<&str>,
) -> [u8; 32] {
    let mut hasher = Hasher::new();
    hasher.update(fingerprint.as_bytes());
    hasher.update(b"|");
    hasher.update(rubric_version.as_bytes());
    if let Some(statement) = problem_statement {
        hasher.update(b"|problem|");
        hasher.update(&(statement.len() as u64).to_le_bytes());
        hasher.update(statement.as_bytes());
    }
    *hasher.finalize().as_bytes()
}

/// Computes a 64-bit hash of the input data using BLAKE3, truncated from 256 bits.
///
/// Only used for cheap identifiers such as prompt digests in log fields; cache keys use
/// the full 256-bit [`Fingerprint`].
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[0..8]);
    u64::from_le_bytes(bytes)
}
