//! Content fingerprinting for parse-cache invalidation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A 256-bit content fingerprint computed with SHA-256.
///
/// Two inputs with the same `Fingerprint` are treated as identical content.
/// The cache keys re-scan decisions on fingerprint equality alone, so the
/// digest must be collision-resistant, not merely checksum-grade.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Computes a fingerprint over a byte slice.
    pub fn of_bytes(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        Self(digest.into())
    }

    /// Computes a fingerprint over a string's UTF-8 bytes.
    pub fn of_str(content: &str) -> Self {
        Self::of_bytes(content.as_bytes())
    }

    /// Computes a fingerprint over source content supplied as lines.
    ///
    /// Lines are joined with `\n` before hashing, so content supplied as a
    /// line list fingerprints identically to the equivalent joined string.
    pub fn of_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut hasher = Sha256::new();
        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                hasher.update(b"\n");
            }
            hasher.update(line.as_ref().as_bytes());
        }
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}
