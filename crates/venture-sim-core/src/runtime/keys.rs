// crates/venture-sim-core/src/runtime/keys.rs
// ============================================================================
// Module: Venture Sim Run Keys
// Description: Per-run derivation of the time-lock and ledger signing keys.
// Purpose: Make key material a deterministic function of (seed, run_id) so
//          replays reproduce ciphertexts and signatures bit for bit.
// Dependencies: ed25519-dalek, sha2
// ============================================================================

//! ## Overview
//! Each run owns two secrets: a ChaCha20-Poly1305 key sealing future events
//! and an Ed25519 signing key chaining the audit ledger. Both derive from the
//! run seed and run id through domain-separated SHA-256, which is what makes
//! two constructions from identical inputs byte-identical end to end. Key
//! material is persisted only inside checkpoints; it never reaches audit
//! entries or exported bundles.

// ============================================================================
// SECTION: Imports
// ============================================================================

use ed25519_dalek::SigningKey;
use sha2::Digest;
use sha2::Sha256;

use crate::core::RunId;

// ============================================================================
// SECTION: Domains
// ============================================================================

/// Domain separator for the time-lock key.
const TIMELOCK_DOMAIN: &[u8] = b"venture-sim/timelock/v1";

/// Domain separator for the ledger signing key.
const SIGNING_DOMAIN: &[u8] = b"venture-sim/ledger/v1";

// ============================================================================
// SECTION: Run Keys
// ============================================================================

/// Per-run secret material.
///
/// # Invariants
/// - Derivation is a pure function of `(seed, run_id)`.
/// - Neither key is ever serialized outside checkpoint payloads.
#[derive(Clone)]
pub struct RunKeys {
    /// 256-bit time-lock key for sealing future events.
    pub timelock_key: [u8; 32],
    /// Ed25519 signing key chaining the audit ledger.
    pub signing_key: SigningKey,
}

impl std::fmt::Debug for RunKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunKeys").finish_non_exhaustive()
    }
}

impl RunKeys {
    /// Derives the run's key material from the seed and run id.
    #[must_use]
    pub fn derive(seed: u64, run_id: &RunId) -> Self {
        let timelock_key = derive_key(TIMELOCK_DOMAIN, seed, run_id);
        let signing_seed = derive_key(SIGNING_DOMAIN, seed, run_id);
        Self {
            timelock_key,
            signing_key: SigningKey::from_bytes(&signing_seed),
        }
    }

    /// Rebuilds run keys around an externally persisted time-lock key.
    ///
    /// Used when resuming from a checkpoint: the signing key re-derives from
    /// `(seed, run_id)` while the time-lock key comes from the checkpoint so
    /// previously sealed events stay decipherable.
    #[must_use]
    pub fn with_timelock_key(seed: u64, run_id: &RunId, timelock_key: [u8; 32]) -> Self {
        let signing_seed = derive_key(SIGNING_DOMAIN, seed, run_id);
        Self {
            timelock_key,
            signing_key: SigningKey::from_bytes(&signing_seed),
        }
    }
}

/// Domain-separated SHA-256 over the seed and run id.
fn derive_key(domain: &[u8], seed: u64, run_id: &RunId) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(seed.to_le_bytes());
    hasher.update(run_id.as_str().as_bytes());
    hasher.finalize().into()
}
