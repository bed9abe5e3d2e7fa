// crates/venture-sim-core/src/core/hashing.rs
// ============================================================================
// Module: Venture Sim Canonical Hashing
// Description: RFC 8785 canonical JSON hashing for states, entries, and bundles.
// Purpose: Provide deterministic digests independent of key order and formatting.
// Dependencies: serde, serde_jcs, serde_json, sha2
// ============================================================================

//! ## Overview
//! Everything hashed or signed in Venture Sim goes through RFC 8785 canonical
//! JSON: sorted object keys, normalized numbers, UTF-8 bytes. Non-finite
//! floats are rejected rather than coerced so digests never silently diverge.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fmt::Write;

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Hash Algorithm
// ============================================================================

/// Default hash algorithm for canonical digests.
pub const DEFAULT_HASH_ALGORITHM: HashAlgorithm = HashAlgorithm::Sha256;

/// Supported hash algorithms.
///
/// # Invariants
/// - Variants are stable for serialization and bundle verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// SHA-256.
    Sha256,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha256 => f.write_str("sha256"),
        }
    }
}

// ============================================================================
// SECTION: Hash Digest
// ============================================================================

/// Hash digest with its producing algorithm.
///
/// # Invariants
/// - `value` is lowercase hex of the raw digest bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashDigest {
    /// Algorithm that produced the digest.
    pub algorithm: HashAlgorithm,
    /// Lowercase hex digest value.
    pub value: String,
}

impl HashDigest {
    /// Creates a digest record from raw digest bytes.
    #[must_use]
    pub fn new(algorithm: HashAlgorithm, bytes: &[u8]) -> Self {
        Self {
            algorithm,
            value: encode_hex(bytes),
        }
    }
}

impl fmt::Display for HashDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.value)
    }
}

/// Encodes bytes as lowercase hex.
#[must_use]
pub fn encode_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        // Writing into a String cannot fail.
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Decodes a lowercase or uppercase hex string into bytes.
///
/// # Errors
///
/// Returns [`HashError::InvalidHex`] on odd length or non-hex characters.
pub fn decode_hex(text: &str) -> Result<Vec<u8>, HashError> {
    if !text.len().is_multiple_of(2) {
        return Err(HashError::InvalidHex {
            detail: "odd number of hex characters".to_string(),
        });
    }
    let mut out = Vec::with_capacity(text.len() / 2);
    let bytes = text.as_bytes();
    for pair in bytes.chunks_exact(2) {
        let hi = hex_value(pair[0])?;
        let lo = hex_value(pair[1])?;
        out.push((hi << 4) | lo);
    }
    Ok(out)
}

/// Returns the numeric value of one hex character.
fn hex_value(ch: u8) -> Result<u8, HashError> {
    match ch {
        b'0'..=b'9' => Ok(ch - b'0'),
        b'a'..=b'f' => Ok(ch - b'a' + 10),
        b'A'..=b'F' => Ok(ch - b'A' + 10),
        other => Err(HashError::InvalidHex {
            detail: format!("invalid hex character {:?}", char::from(other)),
        }),
    }
}

// ============================================================================
// SECTION: Canonical Hashing
// ============================================================================

/// Serializes a value into RFC 8785 canonical JSON bytes.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when the value cannot be
/// canonicalized (non-finite floats, non-string map keys).
pub fn canonical_json_bytes<T>(value: &T) -> Result<Vec<u8>, HashError>
where
    T: Serialize + ?Sized,
{
    serde_jcs::to_vec(value).map_err(|err| HashError::Canonicalization(err.to_string()))
}

/// Hashes raw bytes with the given algorithm.
#[must_use]
pub fn hash_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> HashDigest {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let digest = Sha256::digest(bytes);
            HashDigest::new(algorithm, &digest)
        }
    }
}

/// Hashes the canonical JSON form of a value.
///
/// # Errors
///
/// Returns [`HashError::Canonicalization`] when canonicalization fails.
pub fn hash_canonical_json<T>(algorithm: HashAlgorithm, value: &T) -> Result<HashDigest, HashError>
where
    T: Serialize + ?Sized,
{
    let bytes = canonical_json_bytes(value)?;
    Ok(hash_bytes(algorithm, &bytes))
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised by canonical hashing.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashError {
    /// Canonical JSON serialization failed.
    #[error("canonicalization failed: {0}")]
    Canonicalization(String),
    /// Hex decoding failed.
    #[error("invalid hex: {detail}")]
    InvalidHex {
        /// Decoder detail message.
        detail: String,
    },
}
